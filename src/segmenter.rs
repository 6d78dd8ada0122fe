use std::ops::Range;

use super::error::CifError;
use super::records::Family;

/// Indices of one journey within the approved line sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JourneyRange {
    pub header: usize,
    /// Stop lines in file order, up to the next header or end of input.
    pub stops: Range<usize>,
}

impl JourneyRange {
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }
}

/// Partitions approved lines into journeys delimited by header records.
///
/// A single linear pass; the stop order of each journey is its file order.
pub fn segment<S: AsRef<str>>(lines: &[S], family: Family) -> Result<Vec<JourneyRange>, CifError> {
    let header_tag = family.header_tag();
    let mut journeys: Vec<JourneyRange> = Vec::new();
    let mut open: Option<usize> = None;

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line.starts_with(header_tag) {
            if let Some(header) = open.replace(index) {
                journeys.push(JourneyRange {
                    header,
                    stops: header + 1..index,
                });
            }
        } else if open.is_none() {
            return Err(CifError::NoHeader {
                line: line.to_string(),
            });
        }
    }

    if let Some(header) = open {
        journeys.push(JourneyRange {
            header,
            stops: header + 1..lines.len(),
        });
    }
    Ok(journeys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_two_journeys() {
        let lines = ["QS1", "QO", "QI", "QT", "QS2", "QO", "QT"];
        let journeys = segment(&lines, Family::Bus).unwrap();
        assert_eq!(
            journeys,
            vec![
                JourneyRange {
                    header: 0,
                    stops: 1..4
                },
                JourneyRange {
                    header: 4,
                    stops: 5..7
                },
            ]
        );
        assert_eq!(journeys[0].stop_count(), 3);
    }

    #[test]
    fn test_header_tag_follows_family() {
        let lines = ["BS", "LO", "LT", "BS", "LO", "LI", "LI", "LT"];
        let journeys = segment(&lines, Family::Rail).unwrap();
        assert_eq!(journeys.len(), 2);
        assert_eq!(journeys[1].stops, 4..8);
    }

    #[test]
    fn test_trailing_header_has_no_stops() {
        let lines = ["QS1", "QO", "QT", "QS2"];
        let journeys = segment(&lines, Family::Bus).unwrap();
        assert_eq!(journeys.len(), 2);
        assert!(journeys[1].stops.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let lines: [&str; 0] = [];
        assert!(segment(&lines, Family::Rail).unwrap().is_empty());
    }

    #[test]
    fn test_stop_before_header() {
        let lines = ["QO", "QS", "QT"];
        assert_eq!(
            segment(&lines, Family::Bus),
            Err(CifError::NoHeader {
                line: "QO".to_string()
            })
        );
    }

    #[test]
    fn test_segmentation_is_repeatable() {
        let lines = ["QS1", "QO", "QI", "QT", "QS2", "QO", "QT"];
        assert_eq!(
            segment(&lines, Family::Bus).unwrap(),
            segment(&lines, Family::Bus).unwrap()
        );
    }
}
