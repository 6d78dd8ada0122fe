use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::ProgressIterator;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use super::assembler::{StopRow, assemble};
use super::error::CifError;
use super::layouts::LayoutRegistry;
use super::public_transport_mode::vehicle_type_label;
use super::records::{DecodedRecord, Family, FieldValue, decode};
use super::segmenter::segment;
use super::utils::progress_bar_for_count;

#[derive(Clone, Debug, Default)]
pub struct TimetableOptions {
    /// Keep only journeys whose first date of operation is before this date.
    pub first_date_before: Option<NaiveDate>,
}

/// All stop rows reconstructed from one CIF file.
#[derive(Debug)]
pub struct Timetable {
    pub family: Family,
    pub rows: Vec<StopRow>,
    /// Exact repeats of an earlier row, removed from `rows`.
    pub duplicates: Vec<StopRow>,
    pub journey_count: usize,
    pub file_header: Option<DecodedRecord>,
}

pub fn read_file(file_path: &Path) -> Result<String> {
    fs_err::read_to_string(file_path)
        .with_context(|| format!("reading CIF file {}", file_path.display()))
}

/// Lines carrying one of the family's journey tags, in file order.
pub fn approved_lines(raw_cif_text: &str, family: Family) -> Vec<&str> {
    let approved = family.approved_tags();
    raw_cif_text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.get(0..2).is_some_and(|tag| approved.contains(&tag)))
        .collect()
}

/// Decodes a whole file into its stop table.
///
/// Fails on the first record without a layout, a malformed bus time, or a
/// journey with fewer than two stops.
pub fn build(
    raw_cif_text: &str,
    family: Family,
    options: &TimetableOptions,
) -> Result<Timetable, CifError> {
    let registry = LayoutRegistry::for_family(family);
    let file_header = match raw_cif_text.lines().next() {
        Some(first) if family == Family::Rail && first.starts_with("HD") => {
            Some(decode(&registry, first.trim_end_matches('\r'))?)
        }
        _ => None,
    };
    if let Some(header) = &file_header {
        info!(
            "File header: {} extracted {} {}",
            header.text("file_identity").unwrap_or_default(),
            header.get("date_of_extract").cloned().unwrap_or(FieldValue::Empty),
            header.get("time_of_extract").cloned().unwrap_or(FieldValue::Empty),
        );
    }

    let lines = approved_lines(raw_cif_text, family);
    debug!("{} approved {} records", lines.len(), family);
    let journeys = segment(&lines, family)?;

    let mut rows = Vec::with_capacity(lines.len());
    let progress = progress_bar_for_count(journeys.len());
    for journey in journeys.iter().progress_with(progress) {
        let journey_rows = assemble(&registry, &lines, journey)?;
        if let Some(first) = journey_rows.first() {
            debug!(
                "Journey {} with {} stops",
                first.journey.unique_identifier(),
                journey_rows.len()
            );
        }
        rows.extend(journey_rows);
    }

    let (mut rows, duplicates) = remove_duplicate_rows(rows);
    if !duplicates.is_empty() {
        warn!("Removed {} duplicate stop rows", duplicates.len());
    }

    if let Some(cutoff) = options.first_date_before {
        let first_date = family.columns().first_date;
        let before = rows.len();
        rows.retain(|row| match row.get(first_date) {
            Some(FieldValue::Date(date)) => *date < cutoff,
            _ => true,
        });
        info!(
            "Dropped {} rows operating from {} or later",
            before - rows.len(),
            cutoff
        );
    }

    info!("{} journeys analysed, {} stop rows", journeys.len(), rows.len());
    Ok(Timetable {
        family,
        rows,
        duplicates,
        journey_count: journeys.len(),
        file_header,
    })
}

/// Splits rows into first occurrences and exact repeats, preserving order.
fn remove_duplicate_rows(rows: Vec<StopRow>) -> (Vec<StopRow>, Vec<StopRow>) {
    let first_seen: Vec<bool> = {
        let mut seen = HashSet::with_capacity(rows.len());
        rows.iter().map(|row| seen.insert(row)).collect()
    };
    let mut kept = Vec::with_capacity(rows.len());
    let mut duplicates = Vec::new();
    for (row, first) in rows.into_iter().zip(first_seen) {
        if first {
            kept.push(row);
        } else {
            duplicates.push(row);
        }
    }
    (kept, duplicates)
}

impl Timetable {
    /// Rows grouped by output label of their journey's vehicle type.
    pub fn by_vehicle_type(&self) -> BTreeMap<String, Vec<&StopRow>> {
        let mut groups: BTreeMap<String, Vec<&StopRow>> = BTreeMap::new();
        for row in &self.rows {
            let vehicle_type = row.value("vehicle_type").to_string();
            groups
                .entry(vehicle_type_label(&vehicle_type))
                .or_default()
                .push(row);
        }
        groups
    }

    /// Header and rendered values in the family's presentation order.
    pub fn records<'a>(
        &self,
        rows: impl IntoIterator<Item = &'a StopRow>,
    ) -> (Vec<&'static str>, Vec<Vec<String>>) {
        let columns = self.family.columns().presentation;
        let records = rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.value(column).to_string())
                    .collect()
            })
            .collect();
        (columns.to_vec(), records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::*;

    fn bus_file() -> String {
        [
            "ATCO-CIF0500Sample bus timetable".to_string(),
            "QLNSTOPA       Main Street".to_string(),
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            "QNNote line ignored".to_string(),
            qo("STOPA", "0800"),
            qi("STOPB", "0805", "0806"),
            qt("STOPC", "0820"),
            qs("ABC", "000002", "0000011", "12", 'I', "COACH"),
            qo("STOPC", "0900"),
            qt("STOPA", "0920"),
        ]
        .join("\r\n")
    }

    #[test]
    fn test_approved_lines_filters_and_strips() {
        let text = bus_file();
        let lines = approved_lines(&text, Family::Bus);
        assert_eq!(lines.len(), 7);
        assert!(lines.iter().all(|line| !line.ends_with('\r')));
        assert!(approved_lines(&text, Family::Rail).is_empty());
    }

    #[test]
    fn test_build_bus_timetable() {
        let timetable = build(&bus_file(), Family::Bus, &TimetableOptions::default()).unwrap();
        assert_eq!(timetable.journey_count, 2);
        assert_eq!(timetable.rows.len(), 5);
        assert!(timetable.duplicates.is_empty());
        assert!(timetable.file_header.is_none());

        let groups = timetable.by_vehicle_type();
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["Bus", "Coach"]);
        assert_eq!(groups["Bus"].len(), 3);
    }

    #[test]
    fn test_duplicate_journeys_are_removed() {
        let journey = [
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
            qt("STOPB", "0810"),
        ];
        let text = [journey.clone(), journey].concat().join("\n");
        let timetable = build(&text, Family::Bus, &TimetableOptions::default()).unwrap();
        assert_eq!(timetable.journey_count, 2);
        assert_eq!(timetable.rows.len(), 2);
        assert_eq!(timetable.duplicates.len(), 2);
    }

    #[test]
    fn test_first_date_filter() {
        let options = TimetableOptions {
            first_date_before: NaiveDate::from_ymd_opt(2020, 1, 6),
        };
        let timetable = build(&bus_file(), Family::Bus, &options).unwrap();
        assert!(timetable.rows.is_empty());

        let options = TimetableOptions {
            first_date_before: NaiveDate::from_ymd_opt(2020, 1, 7),
        };
        let timetable = build(&bus_file(), Family::Bus, &options).unwrap();
        assert_eq!(timetable.rows.len(), 5);
    }

    #[test]
    fn test_build_rail_timetable_with_file_header() {
        let text = [
            fixed(&[(1, "HD"), (3, "TPS.UDFROC1.PD200515"), (23, "150520"), (29, "2142")]),
            "TIGLGC   00GLASGOW CENTRAL".to_string(),
            bs("C12345", "1111100", "P", "OO", "1A23", "B"),
            "BX         SRY".to_string(),
            lo("GLGC", "0800", "0800"),
            lt("PSLY", "0812", "0812"),
            "ZZ".to_string(),
        ]
        .join("\n");
        let timetable = build(&text, Family::Rail, &TimetableOptions::default()).unwrap();
        assert_eq!(timetable.rows.len(), 2);

        let header = timetable.file_header.unwrap();
        assert_eq!(header.text("file_identity"), Some("TPS.UDFROC1.PD200515"));
        assert_eq!(
            header.get("date_of_extract"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2020, 5, 15).unwrap()))
        );
    }

    #[test]
    fn test_malformed_bus_time_aborts_file() {
        let text = [
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "8am"),
            qt("STOPB", "0810"),
        ]
        .join("\n");
        assert!(matches!(
            build(&text, Family::Bus, &TimetableOptions::default()),
            Err(CifError::MalformedTime { .. })
        ));
    }

    #[test]
    fn test_presentation_records() {
        let timetable = build(&bus_file(), Family::Bus, &TimetableOptions::default()).unwrap();
        let (header, records) = timetable.records(&timetable.rows);
        assert_eq!(header[0], "record_identity");
        assert_eq!(records.len(), 5);
        let location = header.iter().position(|c| *c == "location").unwrap();
        let next = header.iter().position(|c| *c == "next_stop_id").unwrap();
        let arrival = header
            .iter()
            .position(|c| *c == "next_stop_arrival_time")
            .unwrap();
        assert_eq!(records[0][location], "STOPA");
        assert_eq!(records[0][next], "STOPB");
        assert_eq!(records[0][arrival], "08:05:00");
        assert_eq!(records[2][next], "");
    }
}
