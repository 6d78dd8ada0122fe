//! Stop visit frequency within a weekday and time-of-day window.
//!
//! A stop row counts once when its journey runs on the requested day, it is
//! not a passing point, and either its published arrival or its published
//! departure falls inside the closed window `[start, end]`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::assembler::StopRow;
use super::error::CifError;
use super::layouts::FamilyColumns;
use super::records::{Day, Family, FieldValue, SecondsPastMidnight};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "I")]
    Inbound,
    #[serde(alias = "O")]
    Outbound,
}

impl Direction {
    /// Value of the journey header's direction field.
    pub fn code(&self) -> &'static str {
        match self {
            Direction::Inbound => "I",
            Direction::Outbound => "O",
        }
    }
}

/// One frequency request over a stop table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FrequencyQuery {
    pub day: Day,
    pub start: SecondsPastMidnight,
    pub end: SecondsPastMidnight,
    /// Break counts down by route as well as location.
    #[serde(default)]
    pub group_by_route: bool,
    /// Attach the distinct routes serving each location.
    #[serde(default)]
    pub collect_routes: bool,
    /// Count only journeys heading this way. Bus/coach only.
    #[serde(default)]
    pub direction: Option<Direction>,
    /// Produce total, inbound and outbound columns side by side.
    #[serde(default)]
    pub directional: bool,
}

impl FrequencyQuery {
    pub fn new(day: Day, start: SecondsPastMidnight, end: SecondsPastMidnight) -> Self {
        FrequencyQuery {
            day,
            start,
            end,
            group_by_route: false,
            collect_routes: false,
            direction: None,
            directional: false,
        }
    }

    pub fn validate(&self) -> Result<(), CifError> {
        if self.start > self.end {
            return Err(CifError::InvalidTimeWindow {
                start: self.start.to_string(),
                end: self.end.to_string(),
            });
        }
        Ok(())
    }

    /// File name suffix describing this query, e.g. `tuesday_0800_to_0900`.
    pub fn output_stem(&self) -> String {
        let mut stem = format!(
            "{}_{}_to_{}",
            self.day,
            self.start.to_hhmm(),
            self.end.to_hhmm()
        );
        if let Some(direction) = self.direction {
            stem.push_str(&format!("_{}", direction.code().to_lowercase()));
        }
        if self.directional {
            stem.push_str("_directional");
        } else if self.group_by_route {
            stem.push_str("_route_frequency");
        }
        stem
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrequencyRow {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub total_frequency: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<String>>,
}

/// Distinct routes observed at a location within the window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StopServices {
    pub location: String,
    pub routes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    pub rows: Vec<FrequencyRow>,
    pub services: Vec<StopServices>,
}

impl FrequencyTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self, query: &FrequencyQuery) -> (Vec<&'static str>, Vec<Vec<String>>) {
        let mut header = vec!["location"];
        if query.group_by_route {
            header.push("route");
        }
        header.push("total_frequency");
        if query.collect_routes {
            header.push("total_routes");
        }
        let records = self
            .rows
            .iter()
            .map(|row| {
                let mut record = vec![row.location.clone()];
                if query.group_by_route {
                    record.push(row.route.clone().unwrap_or_default());
                }
                record.push(row.total_frequency.to_string());
                if query.collect_routes {
                    record.push(row.routes.as_deref().unwrap_or_default().join(";"));
                }
                record
            })
            .collect();
        (header, records)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectionalFrequencyRow {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub frequency: u32,
    pub inbound_frequency: Option<u32>,
    pub outbound_frequency: Option<u32>,
}

pub fn directional_records(
    rows: &[DirectionalFrequencyRow],
    query: &FrequencyQuery,
) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let mut header = vec!["location"];
    if query.group_by_route {
        header.push("route");
    }
    header.extend(["frequency", "inbound_frequency", "outbound_frequency"]);
    let optional = |count: Option<u32>| count.map(|c| c.to_string()).unwrap_or_default();
    let records = rows
        .iter()
        .map(|row| {
            let mut record = vec![row.location.clone()];
            if query.group_by_route {
                record.push(row.route.clone().unwrap_or_default());
            }
            record.push(row.frequency.to_string());
            record.push(optional(row.inbound_frequency));
            record.push(optional(row.outbound_frequency));
            record
        })
        .collect();
    (header, records)
}

type GroupKey = (String, Option<String>);

/// Counts stop visits per location, or per location and route.
///
/// An empty or inverted window is not an error; it yields an empty table.
pub fn aggregate(
    rows: &[StopRow],
    family: Family,
    query: &FrequencyQuery,
) -> Result<FrequencyTable, CifError> {
    let columns = family.columns();
    if query.direction.is_some() && columns.direction.is_none() {
        return Err(CifError::DirectionUnsupported(family));
    }

    let visits = window_visits(rows, columns, query, query.direction);
    let counts = count_by_group(&visits, columns, query);
    let services = if query.collect_routes {
        stop_services(&visits, columns)
    } else {
        BTreeMap::new()
    };

    let prefix = columns.gazetteer_prefix;
    let mut frequency_rows: Vec<FrequencyRow> = counts
        .into_iter()
        .map(|((location, route), total_frequency)| FrequencyRow {
            routes: query
                .collect_routes
                .then(|| services.get(&location).map(|r| r.iter().cloned().collect()))
                .flatten(),
            location: format!("{prefix}{location}"),
            route,
            total_frequency,
        })
        .collect();
    frequency_rows.sort_by(|a, b| b.total_frequency.cmp(&a.total_frequency));

    let services = services
        .into_iter()
        .map(|(location, routes)| StopServices {
            location: format!("{prefix}{location}"),
            routes: routes.into_iter().collect(),
        })
        .collect();

    Ok(FrequencyTable {
        rows: frequency_rows,
        services,
    })
}

/// Total, inbound-only and outbound-only counts joined on the group key.
///
/// Locations never visited in one direction carry no value for it.
pub fn aggregate_directional(
    rows: &[StopRow],
    family: Family,
    query: &FrequencyQuery,
) -> Result<Vec<DirectionalFrequencyRow>, CifError> {
    let columns = family.columns();
    if columns.direction.is_none() {
        return Err(CifError::DirectionUnsupported(family));
    }

    let count = |direction: Option<Direction>| {
        count_by_group(&window_visits(rows, columns, query, direction), columns, query)
    };
    let total = count(None);
    let inbound = count(Some(Direction::Inbound));
    let outbound = count(Some(Direction::Outbound));

    let prefix = columns.gazetteer_prefix;
    let mut joined: Vec<DirectionalFrequencyRow> = total
        .into_iter()
        .map(|(key, frequency)| DirectionalFrequencyRow {
            inbound_frequency: inbound.get(&key).copied(),
            outbound_frequency: outbound.get(&key).copied(),
            location: format!("{prefix}{}", key.0),
            route: key.1,
            frequency,
        })
        .collect();
    joined.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    Ok(joined)
}

fn window_visits<'a>(
    rows: &'a [StopRow],
    columns: &FamilyColumns,
    query: &FrequencyQuery,
    direction: Option<Direction>,
) -> Vec<&'a StopRow> {
    let flag = query.day.flag_field();
    let within = |row: &StopRow, field: &str| {
        row.get(field)
            .and_then(FieldValue::as_time)
            .is_some_and(|time| query.start <= time && time <= query.end)
    };

    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| row.get(flag).is_some_and(|value| value.as_flag() == 1))
        .filter(|row| {
            columns
                .scheduled_pass
                .is_none_or(|pass| row.get(pass).is_none_or(FieldValue::is_empty))
        })
        .filter(|row| match (direction, columns.direction) {
            (Some(direction), Some(field)) => {
                row.get(field).and_then(FieldValue::as_text) == Some(direction.code())
            }
            _ => true,
        })
        .filter(|row| within(*row, columns.arrival) || within(*row, columns.departure))
        .filter(|row| seen.insert(natural_key(*row, columns, flag)))
        .collect()
}

/// Identity of a visit; rows sharing it are counted once.
fn natural_key<'a>(
    row: &'a StopRow,
    columns: &FamilyColumns,
    flag: &'static str,
) -> Vec<Option<&'a FieldValue>> {
    let mut fields = vec!["location", columns.route, flag];
    fields.extend(columns.scheduled_arrival);
    fields.extend(columns.scheduled_departure);
    fields.extend([columns.arrival, columns.departure]);
    fields.extend(columns.scheduled_pass);
    fields.into_iter().map(|field| row.get(field)).collect()
}

fn route_of(row: &StopRow, columns: &FamilyColumns) -> String {
    row.value(columns.route).to_string()
}

fn count_by_group(
    visits: &[&StopRow],
    columns: &FamilyColumns,
    query: &FrequencyQuery,
) -> BTreeMap<GroupKey, u32> {
    let flag = query.day.flag_field();
    let mut counts: BTreeMap<GroupKey, u32> = BTreeMap::new();
    for row in visits {
        let route = query.group_by_route.then(|| route_of(row, columns));
        *counts
            .entry((row.location().to_string(), route))
            .or_insert(0) += row.value(flag).as_flag() as u32;
    }
    counts
}

fn stop_services(
    visits: &[&StopRow],
    columns: &FamilyColumns,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut services: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for row in visits {
        services
            .entry(row.location())
            .or_default()
            .insert(route_of(row, columns));
    }
    services
        .into_iter()
        .map(|(location, routes)| (location.to_string(), routes))
        .collect()
}
