//! Fixed-width record layouts.
//!
//! Each layout is plain data: an ordered list of fields with their length,
//! 1-indexed start column and the coercion applied to the trimmed text.
//! The decoder in `records` is the only interpreter of these tables.

use super::records::Family;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coercion {
    Text,
    /// `0`/`1` operating indicator.
    Flag,
    /// `HHMM` time of day. Never applied to journey header records.
    Time,
    /// Calendar date in the given `chrono` format.
    Date(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub length: usize,
    /// 1-indexed start column.
    pub start: usize,
    pub coercion: Coercion,
}

const fn field(name: &'static str, length: usize, start: usize, coercion: Coercion) -> FieldSpec {
    FieldSpec {
        name,
        length,
        start,
        coercion,
    }
}

use Coercion::{Date, Flag, Text, Time};

/// Journey header.
pub const QS: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("transaction_type", 1, 3, Text),
    field("operator", 4, 4, Text),
    field("unique_journey_identifier", 6, 8, Text),
    field("first_date_of_operation", 8, 14, Date("%Y%m%d")),
    field("last_date_of_operation", 8, 22, Date("%Y%m%d")),
    field("operates_on_mondays", 1, 30, Flag),
    field("operates_on_tuesdays", 1, 31, Flag),
    field("operates_on_wednesdays", 1, 32, Flag),
    field("operates_on_thursdays", 1, 33, Flag),
    field("operates_on_fridays", 1, 34, Flag),
    field("operates_on_saturdays", 1, 35, Flag),
    field("operates_on_sundays", 1, 36, Flag),
    field("school_term_time", 1, 37, Text),
    field("bank_holidays", 1, 38, Text),
    field("route_number_(identifier)", 4, 39, Text),
    field("running_board", 6, 43, Text),
    field("vehicle_type", 8, 49, Text),
    field("registration_number", 8, 57, Text),
    field("route_direction", 1, 65, Text),
    field("unique_id", 13, 1, Text),
];

/// Journey origin.
pub const QO: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("location", 12, 3, Text),
    field("published_departure_time", 4, 15, Time),
    field("bay_number", 3, 19, Text),
    field("timing_point_indicator", 2, 22, Text),
    field("fare_stage_indicator", 2, 24, Text),
];

/// Journey intermediate.
pub const QI: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("location", 12, 3, Text),
    field("published_arrival_time", 4, 15, Time),
    field("published_departure_time", 4, 19, Time),
    field("activity_flag", 1, 23, Text),
    field("bay_number", 3, 24, Text),
    field("timing_point_indicator", 2, 27, Text),
    field("fare_stage_indicator", 2, 29, Text),
];

/// Journey destination.
pub const QT: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("location", 12, 3, Text),
    field("published_arrival_time", 4, 15, Time),
    field("bay_number", 3, 19, Text),
    field("timing_point_indicator", 2, 22, Text),
    field("fare_stage_indicator", 2, 24, Text),
];

/// Rail file header. Not part of any journey.
pub const HD: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("file_identity", 20, 3, Text),
    field("date_of_extract", 6, 23, Date("%d%m%y")),
    field("time_of_extract", 4, 29, Time),
    field("current_file_reference", 7, 33, Text),
    // Published HD offsets: one column right of a commonly copied table.
    field("last_file_reference", 7, 40, Text),
    field("update_indicator", 1, 47, Text),
    field("version", 1, 48, Text),
    field("extract_start_date", 6, 49, Date("%d%m%y")),
    field("extract_end_date", 6, 55, Date("%d%m%y")),
    field("spare", 20, 61, Text),
];

/// Basic schedule.
pub const BS: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("transaction_type", 1, 3, Text),
    field("train_uid", 6, 4, Text),
    field("date_runs_from", 6, 10, Date("%y%m%d")),
    field("date_runs_to", 6, 16, Date("%y%m%d")),
    field("days_run", 7, 22, Text),
    field("bank_holiday_running", 1, 29, Text),
    field("train_status", 1, 30, Text),
    field("train_category", 2, 31, Text),
    field("train_identity", 4, 33, Text),
    field("headcode", 4, 37, Text),
    field("course_indicator", 1, 41, Text),
    field("profit_centre_code", 8, 42, Text),
    field("business_sector", 1, 50, Text),
    field("power_type", 3, 51, Text),
    field("timing_load", 4, 54, Text),
    field("speed", 3, 58, Text),
    field("operating_chars", 6, 61, Text),
    field("train_class", 1, 67, Text),
    field("sleepers", 1, 68, Text),
    field("reservations", 1, 69, Text),
    field("connect_indicator", 1, 70, Text),
    field("catering_code", 4, 71, Text),
    field("service_branding", 4, 75, Text),
    field("spare", 1, 79, Text),
    field("stp_indicator", 1, 80, Text),
];

/// Origin location.
pub const LO: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("location", 8, 3, Text),
    field("scheduled_departure_time", 5, 11, Time),
    field("public_departure_time", 4, 16, Time),
    field("platform", 3, 20, Text),
    field("line", 3, 23, Text),
    field("engineering_allowance", 2, 26, Text),
    field("pathing_allowance", 2, 28, Text),
    field("activity", 12, 30, Text),
    field("performance_allowance", 2, 42, Text),
    field("spare", 37, 44, Text),
];

/// Intermediate location.
pub const LI: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("location", 8, 3, Text),
    field("scheduled_arrival_time", 5, 11, Time),
    field("scheduled_departure_time", 5, 16, Time),
    field("scheduled_pass", 5, 21, Time),
    field("public_arrival_time", 4, 26, Time),
    field("public_departure_time", 4, 30, Time),
    // Three wide; a fourth column would overlap `line`.
    field("platform", 3, 34, Text),
    field("line", 3, 37, Text),
    field("path", 3, 40, Text),
    field("activity", 12, 43, Text),
    field("engineering_allowance", 2, 55, Text),
    field("pathing_allowance", 2, 57, Text),
    field("performance_allowance", 2, 59, Text),
    field("spare", 20, 61, Text),
];

/// Terminating location.
pub const LT: &[FieldSpec] = &[
    field("record_identity", 2, 1, Text),
    field("location", 8, 3, Text),
    field("scheduled_arrival_time", 5, 11, Time),
    field("public_arrival_time", 4, 16, Time),
    field("platform", 3, 20, Text),
    field("path", 3, 23, Text),
    field("activity", 12, 26, Text),
    // Follows `activity`; runs to column 80.
    field("spare", 43, 38, Text),
];

/// Which field plays which role for a format family.
#[derive(Debug)]
pub struct FamilyColumns {
    pub route: &'static str,
    pub arrival: &'static str,
    pub departure: &'static str,
    /// Field of the following stop copied into `next_stop_arrival_time`.
    pub successor_arrival: &'static str,
    pub scheduled_arrival: Option<&'static str>,
    pub scheduled_departure: Option<&'static str>,
    pub scheduled_pass: Option<&'static str>,
    pub direction: Option<&'static str>,
    pub first_date: &'static str,
    /// Route numbers equal to this are replaced by the journey identifier.
    pub unknown_route: Option<&'static str>,
    /// Header field holding a 7 character Monday..Sunday run mask.
    pub days_run: Option<&'static str>,
    pub gazetteer_prefix: &'static str,
    /// Column order for tabular timetable output.
    pub presentation: &'static [&'static str],
}

pub const BUS_COLUMNS: FamilyColumns = FamilyColumns {
    route: "route_number_(identifier)",
    arrival: "published_arrival_time",
    departure: "published_departure_time",
    successor_arrival: "published_arrival_time",
    scheduled_arrival: None,
    scheduled_departure: None,
    scheduled_pass: None,
    direction: Some("route_direction"),
    first_date: "first_date_of_operation",
    unknown_route: Some("UNKN"),
    days_run: None,
    gazetteer_prefix: "QLN",
    presentation: &[
        "record_identity",
        "operator",
        "unique_journey_identifier",
        "unique_identifier",
        "route_number_(identifier)",
        "route_direction",
        "has_duplicated_stops",
        "location",
        "published_arrival_time",
        "published_departure_time",
        "next_stop_id",
        "next_stop_arrival_time",
        "operates_on_mondays",
        "operates_on_tuesdays",
        "operates_on_wednesdays",
        "operates_on_thursdays",
        "operates_on_fridays",
        "operates_on_saturdays",
        "operates_on_sundays",
        "first_date_of_operation",
        "last_date_of_operation",
        "school_term_time",
        "activity_flag",
        "bank_holidays",
        "running_board",
        "vehicle_type",
        "registration_number",
        "bay_number",
        "fare_stage_indicator",
        "timing_point_indicator",
    ],
};

pub const RAIL_COLUMNS: FamilyColumns = FamilyColumns {
    route: "unique_identifier",
    arrival: "public_arrival_time",
    departure: "public_departure_time",
    successor_arrival: "scheduled_arrival_time",
    scheduled_arrival: Some("scheduled_arrival_time"),
    scheduled_departure: Some("scheduled_departure_time"),
    scheduled_pass: Some("scheduled_pass"),
    direction: None,
    first_date: "date_runs_from",
    unknown_route: None,
    days_run: Some("days_run"),
    gazetteer_prefix: "QLN9100",
    presentation: &[
        "record_identity",
        "train_uid",
        "train_status",
        "train_category",
        "train_identity",
        "train_class",
        "unique_identifier",
        "has_duplicated_stops",
        "location",
        "scheduled_arrival_time",
        "scheduled_departure_time",
        "public_arrival_time",
        "public_departure_time",
        "scheduled_pass",
        "next_stop_id",
        "next_stop_arrival_time",
        "operates_on_mondays",
        "operates_on_tuesdays",
        "operates_on_wednesdays",
        "operates_on_thursdays",
        "operates_on_fridays",
        "operates_on_saturdays",
        "operates_on_sundays",
        "date_runs_from",
        "date_runs_to",
        "bank_holiday_running",
        "platform",
        "line",
        "path",
        "engineering_allowance",
        "pathing_allowance",
        "activity",
        "performance_allowance",
        "transaction_type",
        "headcode",
        "course_indicator",
        "profit_centre_code",
        "business_sector",
        "power_type",
        "timing_load",
        "speed",
        "operating_chars",
        "sleepers",
        "reservations",
        "connect_indicator",
        "catering_code",
        "service_branding",
        "stp_indicator",
    ],
};

/// The layouts a family can decode, keyed by record tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutRegistry {
    pub family: Family,
}

impl LayoutRegistry {
    pub fn for_family(family: Family) -> Self {
        LayoutRegistry { family }
    }

    pub fn layout(&self, tag: &str) -> Option<&'static [FieldSpec]> {
        match (self.family, tag) {
            (Family::Bus, "QS") => Some(QS),
            (Family::Bus, "QO") => Some(QO),
            (Family::Bus, "QI") => Some(QI),
            (Family::Bus, "QT") => Some(QT),
            (Family::Rail, "HD") => Some(HD),
            (Family::Rail, "BS") => Some(BS),
            (Family::Rail, "LO") => Some(LO),
            (Family::Rail, "LI") => Some(LI),
            (Family::Rail, "LT") => Some(LT),
            _ => None,
        }
    }
}
