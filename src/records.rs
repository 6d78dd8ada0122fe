use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use super::error::CifError;
use super::layouts::{BUS_COLUMNS, Coercion, FamilyColumns, LayoutRegistry, RAIL_COLUMNS};

/// The two CIF dialects understood by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// ATCO-CIF bus and coach timetables (`QS/QO/QI/QT`).
    Bus,
    /// Network Rail CIF schedules (`BS/LO/LI/LT`).
    Rail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeParsing {
    /// Any malformed time aborts the file.
    Strict,
    /// Malformed or blank times decode as empty.
    Lenient,
}

impl Family {
    pub fn approved_tags(&self) -> [&'static str; 4] {
        match self {
            Family::Bus => ["QS", "QO", "QI", "QT"],
            Family::Rail => ["BS", "LO", "LI", "LT"],
        }
    }

    pub fn header_tag(&self) -> &'static str {
        self.approved_tags()[0]
    }

    pub fn time_parsing(&self) -> TimeParsing {
        match self {
            Family::Bus => TimeParsing::Strict,
            // Rail times carry a trailing half-minute marker and spare bytes.
            Family::Rail => TimeParsing::Lenient,
        }
    }

    pub fn columns(&self) -> &'static FamilyColumns {
        match self {
            Family::Bus => &BUS_COLUMNS,
            Family::Rail => &RAIL_COLUMNS,
        }
    }

    /// Guesses the family from the first line carrying an approved tag.
    pub fn detect<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<Family> {
        lines.into_iter().find_map(|line| {
            let tag = line.get(0..2)?;
            [Family::Bus, Family::Rail]
                .into_iter()
                .find(|family| family.approved_tags().contains(&tag))
        })
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Family::Bus => write!(f, "bus"),
            Family::Rail => write!(f, "rail"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordIdentifier {
    HD, // Header Record
    QS, // Journey Header
    QO, // Journey Origin
    QI, // Journey Intermediate
    QT, // Journey Destination
    BS, // Basic Schedule Record
    LO, // Location Origin
    LI, // Location Intermediate
    LT, // Location Terminate
    Other,
}

impl FromStr for RecordIdentifier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HD" => Ok(RecordIdentifier::HD),
            "QS" => Ok(RecordIdentifier::QS),
            "QO" => Ok(RecordIdentifier::QO),
            "QI" => Ok(RecordIdentifier::QI),
            "QT" => Ok(RecordIdentifier::QT),
            "BS" => Ok(RecordIdentifier::BS),
            "LO" => Ok(RecordIdentifier::LO),
            "LI" => Ok(RecordIdentifier::LI),
            "LT" => Ok(RecordIdentifier::LT),
            _ => Ok(RecordIdentifier::Other),
        }
    }
}

impl RecordIdentifier {
    fn from_line(line: &str) -> Self {
        line.get(0..2)
            .and_then(|tag| RecordIdentifier::from_str(tag).ok())
            .unwrap_or(RecordIdentifier::Other)
    }

    /// Header records open a journey and hold dates, not times.
    pub fn is_journey_header(&self) -> bool {
        matches!(self, RecordIdentifier::QS | RecordIdentifier::BS)
    }
}

/// A value for time past midnight in seconds.
/// For example 8am is 28800 seconds past midnight.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct SecondsPastMidnight(pub usize);

impl SecondsPastMidnight {
    pub fn from_hm(hours: usize, minutes: usize) -> Self {
        SecondsPastMidnight(hours * 3600 + minutes * 60)
    }

    pub fn hours(&self) -> usize {
        self.0 / 3600
    }

    pub fn minutes(&self) -> usize {
        (self.0 % 3600) / 60
    }

    /// Compact `HHMM` form used in output file names.
    pub fn to_hhmm(&self) -> String {
        format!("{:02}{:02}", self.hours(), self.minutes())
    }
}

pub trait TimeConversion: Sized {
    fn from_24hr_str(s: &str) -> Option<Self>;
}

impl TimeConversion for SecondsPastMidnight {
    /// Parses exactly four ASCII digits as `HHMM` on a 24 hour clock.
    fn from_24hr_str(s: &str) -> Option<Self> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hours = s[0..2].parse::<usize>().ok()?;
        let minutes = s[2..].parse::<usize>().ok()?;
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(SecondsPastMidnight::from_hm(hours, minutes))
    }
}

impl fmt::Display for SecondsPastMidnight {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}:{:02}:00", self.hours(), self.minutes())
    }
}

impl FromStr for SecondsPastMidnight {
    type Err = String;

    /// Accepts `HH:MM`, `HH:MM:SS` or `HHMM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let compact: String = trimmed.split(':').take(2).collect();
        SecondsPastMidnight::from_24hr_str(&compact)
            .ok_or_else(|| format!("Invalid time of day: {}", s))
    }
}

impl Serialize for SecondsPastMidnight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SecondsPastMidnight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SecondsPastMidnight::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Name of the 0/1 operating flag carried on every stop row.
    pub fn flag_field(&self) -> &'static str {
        match self {
            Day::Monday => "operates_on_mondays",
            Day::Tuesday => "operates_on_tuesdays",
            Day::Wednesday => "operates_on_wednesdays",
            Day::Thursday => "operates_on_thursdays",
            Day::Friday => "operates_on_fridays",
            Day::Saturday => "operates_on_saturdays",
            Day::Sunday => "operates_on_sundays",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        };
        write!(f, "{name}")
    }
}

/// A decoded field. Blank text and lenient time failures are `Empty`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldValue {
    Empty,
    Text(String),
    Flag(u8),
    Time(SecondsPastMidnight),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<SecondsPastMidnight> {
        match self {
            FieldValue::Time(time) => Some(*time),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> u8 {
        match self {
            FieldValue::Flag(flag) => *flag,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(text) => write!(f, "{text}"),
            FieldValue::Flag(flag) => write!(f, "{flag}"),
            FieldValue::Time(time) => write!(f, "{time}"),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// One fixed-width line decoded into named fields, in layout order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecodedRecord {
    pub tag: RecordIdentifier,
    pub fields: Vec<(&'static str, FieldValue)>,
}

impl DecodedRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn time(&self, name: &str) -> Option<SecondsPastMidnight> {
        self.get(name).and_then(FieldValue::as_time)
    }

    /// Journey join key, present on decoded header records only.
    pub fn unique_identifier(&self) -> &str {
        self.text("unique_identifier").unwrap_or_default()
    }
}

/// Decodes one raw line with the layout registered for its tag.
pub fn decode(registry: &LayoutRegistry, line: &str) -> Result<DecodedRecord, CifError> {
    let family = registry.family;
    let layout = line
        .get(0..2)
        .and_then(|tag| registry.layout(tag))
        .ok_or_else(|| CifError::UnknownRecordLayout {
            family,
            line: line.to_string(),
        })?;
    let tag = RecordIdentifier::from_line(line);

    let mut fields = Vec::with_capacity(layout.len() + 1);
    for field_spec in layout {
        let raw = slice_field(line, field_spec.start, field_spec.length);
        let value = if raw.is_empty() {
            FieldValue::Empty
        } else {
            match field_spec.coercion {
                Coercion::Text => FieldValue::Text(raw.to_string()),
                Coercion::Flag => match raw {
                    "0" => FieldValue::Flag(0),
                    "1" => FieldValue::Flag(1),
                    _ => FieldValue::Text(raw.to_string()),
                },
                Coercion::Date(format) => NaiveDate::parse_from_str(raw, format)
                    .map(FieldValue::Date)
                    .unwrap_or_else(|_| FieldValue::Text(raw.to_string())),
                // Header records store dates in time-like fields; they stay as text.
                Coercion::Time if tag.is_journey_header() => FieldValue::Text(raw.to_string()),
                Coercion::Time => coerce_time(family, field_spec.name, raw, line)?,
            }
        };
        fields.push((field_spec.name, value));
    }

    let mut record = DecodedRecord { tag, fields };
    if let Some(identifier) = journey_identifier(&record) {
        record
            .fields
            .push(("unique_identifier", FieldValue::Text(identifier)));
    }
    Ok(record)
}

/// Trimmed text at a 1-indexed column range; columns past the end are blank.
pub fn slice_field(line: &str, start: usize, length: usize) -> &str {
    let begin = start.saturating_sub(1).min(line.len());
    let end = (begin + length).min(line.len());
    line.get(begin..end).unwrap_or_default().trim()
}

fn coerce_time(
    family: Family,
    field: &'static str,
    raw: &str,
    line: &str,
) -> Result<FieldValue, CifError> {
    match family.time_parsing() {
        TimeParsing::Strict => SecondsPastMidnight::from_24hr_str(raw)
            .map(FieldValue::Time)
            .ok_or_else(|| CifError::MalformedTime {
                field,
                value: raw.to_string(),
                line: line.to_string(),
            }),
        TimeParsing::Lenient => Ok(raw
            .get(0..4)
            .and_then(SecondsPastMidnight::from_24hr_str)
            .map(FieldValue::Time)
            .unwrap_or(FieldValue::Empty)),
    }
}

fn journey_identifier(record: &DecodedRecord) -> Option<String> {
    let part = |name: &str| record.text(name).unwrap_or_default().to_string();
    match record.tag {
        RecordIdentifier::QS => Some(format!(
            "{}{}",
            part("operator"),
            part("unique_journey_identifier")
        )),
        RecordIdentifier::BS => Some(
            [
                "train_uid",
                "train_status",
                "train_category",
                "train_identity",
                "train_class",
            ]
            .map(part)
            .join("_"),
        ),
        _ => None,
    }
}
