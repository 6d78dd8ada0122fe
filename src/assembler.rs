use std::collections::HashSet;
use std::sync::Arc;

use super::error::CifError;
use super::layouts::LayoutRegistry;
use super::records::{DecodedRecord, Day, FieldValue, SecondsPastMidnight, decode};
use super::segmenter::JourneyRange;

/// Journey header fields merged onto every stop, without the record identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JourneyAttributes(pub Vec<(&'static str, FieldValue)>);

impl JourneyAttributes {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn unique_identifier(&self) -> &str {
        self.get("unique_identifier")
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
    }
}

/// One visit of a journey to a location.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StopRow {
    pub stop: DecodedRecord,
    pub next_stop_id: Option<String>,
    pub next_stop_arrival_time: Option<SecondsPastMidnight>,
    pub has_duplicated_stops: bool,
    pub journey: Arc<JourneyAttributes>,
}

impl StopRow {
    pub fn location(&self) -> &str {
        self.stop.text("location").unwrap_or_default()
    }

    /// Looks a field up on the stop, then on its journey header.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.stop.get(name).or_else(|| self.journey.get(name))
    }

    /// Any field by name, including the derived successor columns.
    pub fn value(&self, name: &str) -> FieldValue {
        match name {
            "next_stop_id" => self
                .next_stop_id
                .clone()
                .map_or(FieldValue::Empty, FieldValue::Text),
            "next_stop_arrival_time" => self
                .next_stop_arrival_time
                .map_or(FieldValue::Empty, FieldValue::Time),
            "has_duplicated_stops" => FieldValue::Flag(self.has_duplicated_stops as u8),
            _ => self.get(name).cloned().unwrap_or(FieldValue::Empty),
        }
    }
}

/// Flattens one journey into stop rows: origin, intermediates, destination.
pub fn assemble<S: AsRef<str>>(
    registry: &LayoutRegistry,
    lines: &[S],
    journey: &JourneyRange,
) -> Result<Vec<StopRow>, CifError> {
    let header = decode(registry, lines[journey.header].as_ref())?;
    if journey.stop_count() < 2 {
        return Err(CifError::IllFormedJourney {
            unique_identifier: header.unique_identifier().to_string(),
            stop_lines: journey.stop_count(),
        });
    }
    let attributes = Arc::new(journey_attributes(registry, header));

    let stops = lines[journey.stops.clone()]
        .iter()
        .map(|line| decode(registry, line.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let has_duplicated_stops = {
        let mut seen = HashSet::with_capacity(stops.len());
        !stops
            .iter()
            .all(|stop| seen.insert(stop.get("location")))
    };

    let successor_arrival = registry.family.columns().successor_arrival;
    let successors = stops.iter().skip(1).map(Some).chain(std::iter::once(None));
    let rows = stops
        .iter()
        .zip(successors)
        .map(|(stop, next)| StopRow {
            stop: stop.clone(),
            next_stop_id: next.map(|next| next.text("location").unwrap_or_default().to_string()),
            next_stop_arrival_time: next.and_then(|next| next.time(successor_arrival)),
            has_duplicated_stops,
            journey: Arc::clone(&attributes),
        })
        .collect();
    Ok(rows)
}

fn journey_attributes(registry: &LayoutRegistry, header: DecodedRecord) -> JourneyAttributes {
    let columns = registry.family.columns();
    let mut attributes: Vec<(&'static str, FieldValue)> = header
        .fields
        .into_iter()
        .filter(|(name, _)| *name != "record_identity")
        .collect();

    if let Some(days_run) = columns.days_run {
        let mask = attributes
            .iter()
            .find(|(name, _)| *name == days_run)
            .and_then(|(_, value)| value.as_text())
            .unwrap_or_default()
            .to_string();
        for (index, day) in Day::ALL.iter().enumerate() {
            let flag = match mask.as_bytes().get(index) {
                Some(b'1') => 1,
                _ => 0,
            };
            attributes.push((day.flag_field(), FieldValue::Flag(flag)));
        }
    }

    if let Some(unknown) = columns.unknown_route {
        let identifier = attributes
            .iter()
            .find(|(name, _)| *name == "unique_identifier")
            .map(|(_, value)| value.clone());
        if let Some(identifier) = identifier {
            for (name, value) in attributes.iter_mut() {
                if *name == columns.route && value.as_text() == Some(unknown) {
                    *value = identifier.clone();
                }
            }
        }
    }
    JourneyAttributes(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Family;
    use crate::segmenter::segment;
    use crate::test_fixtures::*;

    fn bus() -> LayoutRegistry {
        LayoutRegistry::for_family(Family::Bus)
    }

    fn assemble_all(registry: &LayoutRegistry, lines: &[String]) -> Vec<StopRow> {
        segment(lines, registry.family)
            .unwrap()
            .iter()
            .flat_map(|journey| assemble(registry, lines, journey).unwrap())
            .collect()
    }

    #[test]
    fn test_two_stop_journey() {
        let lines = vec![
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
            qt("STOPB", "0810"),
        ];
        let rows = assemble_all(&bus(), &lines);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].location(), "STOPA");
        assert_eq!(rows[0].next_stop_id.as_deref(), Some("STOPB"));
        assert_eq!(
            rows[0].next_stop_arrival_time,
            Some(SecondsPastMidnight::from_hm(8, 10))
        );
        assert_eq!(rows[1].next_stop_id, None);
        assert_eq!(rows[1].next_stop_arrival_time, None);
        assert!(!rows[0].has_duplicated_stops);
    }

    #[test]
    fn test_successor_chain() {
        let lines = vec![
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
            qi("STOPB", "0805", "0806"),
            qi("STOPC", "0810", "0811"),
            qt("STOPD", "0820"),
        ];
        let rows = assemble_all(&bus(), &lines);

        assert_eq!(rows.len(), 4);
        for pair in rows.windows(2) {
            assert_eq!(pair[0].next_stop_id.as_deref(), Some(pair[1].location()));
            assert_eq!(
                pair[0].next_stop_arrival_time,
                pair[1].stop.time("published_arrival_time")
            );
        }
        assert_eq!(rows.iter().filter(|row| row.next_stop_id.is_none()).count(), 1);
        assert!(rows[3].next_stop_id.is_none());
    }

    #[test]
    fn test_duplicate_flag_is_journey_scoped() {
        let lines = vec![
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
            qi("STOPB", "0805", "0806"),
            qt("STOPA", "0820"),
            qs("ABC", "000002", "1111100", "12", 'I', "BUS"),
            qo("STOPA", "0900"),
            qt("STOPB", "0910"),
        ];
        let rows = assemble_all(&bus(), &lines);

        assert!(rows[..3].iter().all(|row| row.has_duplicated_stops));
        assert!(rows[3..].iter().all(|row| !row.has_duplicated_stops));
        assert_eq!(rows[0].value("has_duplicated_stops"), FieldValue::Flag(1));
    }

    #[test]
    fn test_header_attributes_merged() {
        let lines = vec![
            qs("ABC", "000001", "0110000", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
            qt("STOPB", "0810"),
        ];
        let rows = assemble_all(&bus(), &lines);

        for row in &rows {
            assert_eq!(row.journey.unique_identifier(), "ABC000001");
            assert_eq!(row.get("operator"), Some(&FieldValue::Text("ABC".to_string())));
            assert_eq!(row.get("operates_on_tuesdays"), Some(&FieldValue::Flag(1)));
            assert!(row.journey.get("record_identity").is_none());
        }
        assert_eq!(rows[0].value("record_identity"), FieldValue::Text("QO".to_string()));
        assert_eq!(rows[1].value("record_identity"), FieldValue::Text("QT".to_string()));
    }

    #[test]
    fn test_unknown_route_replaced_by_journey_identifier() {
        let lines = vec![
            qs("ABC", "000001", "1111100", "UNKN", 'O', "BUS"),
            qo("STOPA", "0800"),
            qt("STOPB", "0810"),
        ];
        let rows = assemble_all(&bus(), &lines);
        assert_eq!(
            rows[0].value("route_number_(identifier)"),
            FieldValue::Text("ABC000001".to_string())
        );
    }

    #[test]
    fn test_rail_days_run_and_scheduled_successor() {
        let registry = LayoutRegistry::for_family(Family::Rail);
        let lines = vec![
            bs("C12345", "0100001", "P", "OO", "1A23", "B"),
            lo("GLGC", "0800", "0800"),
            li("PSLY", "0812H", "0813", "", "0812", "0813"),
            li("JHST", "", "", "0818", "", ""),
            lt("GRK", "0830", "0830"),
        ];
        let rows = assemble_all(&registry, &lines);

        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0].next_stop_arrival_time,
            Some(SecondsPastMidnight::from_hm(8, 12))
        );
        // A passing point has no scheduled arrival to chain.
        assert_eq!(rows[1].next_stop_id.as_deref(), Some("JHST"));
        assert_eq!(rows[1].next_stop_arrival_time, None);
        assert_eq!(rows[2].next_stop_id.as_deref(), Some("GRK"));

        assert_eq!(rows[0].value("operates_on_mondays"), FieldValue::Flag(0));
        assert_eq!(rows[0].value("operates_on_tuesdays"), FieldValue::Flag(1));
        assert_eq!(rows[0].value("operates_on_sundays"), FieldValue::Flag(1));
        assert_eq!(
            rows[3].value("unique_identifier"),
            FieldValue::Text("C12345_P_OO_1A23_B".to_string())
        );
    }

    #[test]
    fn test_short_journey_is_rejected() {
        let lines = vec![
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
        ];
        let journeys = segment(&lines, Family::Bus).unwrap();
        assert_eq!(
            assemble(&bus(), &lines, &journeys[0]),
            Err(CifError::IllFormedJourney {
                unique_identifier: "ABC000001".to_string(),
                stop_lines: 1,
            })
        );
    }

    #[test]
    fn test_unknown_record_in_journey_aborts() {
        let lines = vec![
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
            "QXSTOPB".to_string(),
            qt("STOPC", "0810"),
        ];
        let journeys = segment(&lines, Family::Bus).unwrap();
        assert!(matches!(
            assemble(&bus(), &lines, &journeys[0]),
            Err(CifError::UnknownRecordLayout { .. })
        ));
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let lines = vec![
            qs("ABC", "000001", "1111100", "12", 'O', "BUS"),
            qo("STOPA", "0800"),
            qi("STOPB", "0805", "0806"),
            qt("STOPC", "0820"),
        ];
        assert_eq!(assemble_all(&bus(), &lines), assemble_all(&bus(), &lines));
    }
}
