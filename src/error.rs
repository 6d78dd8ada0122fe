use thiserror::Error;

use super::records::Family;

/// Failures raised while decoding a CIF file or evaluating a frequency query.
///
/// Any of these aborts the file being processed; no partial output is
/// produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CifError {
    /// The first two characters of a line have no registered layout.
    #[error("no {family} record layout for line: {line:?}")]
    UnknownRecordLayout { family: Family, line: String },

    /// A bus/coach time field that is not a valid `HHMM` value.
    #[error("malformed time {value:?} in field {field} of line: {line:?}")]
    MalformedTime {
        field: &'static str,
        value: String,
        line: String,
    },

    /// A journey header followed by fewer than two stop lines.
    #[error("journey {unique_identifier} has {stop_lines} stop line(s), at least 2 are required")]
    IllFormedJourney {
        unique_identifier: String,
        stop_lines: usize,
    },

    /// A stop line appeared before any journey header.
    #[error("stop record appears before any journey header: {line:?}")]
    NoHeader { line: String },

    #[error("time window start {start} is after end {end}")]
    InvalidTimeWindow { start: String, end: String },

    /// Route direction is only carried by the bus/coach family.
    #[error("{0} timetables carry no route direction")]
    DirectionUnsupported(Family),
}
