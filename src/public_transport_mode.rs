use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;

/// Mode named by a bus/coach journey header's `vehicle_type` field.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublicTransportMode {
    Bus,
    Coach,
    Ferry,
    LightRail,
    Metro,
    NationalRail,
    Tram,
    Tube,
}

impl PublicTransportMode {
    pub fn label(&self) -> &'static str {
        match self {
            PublicTransportMode::Bus => "Bus",
            PublicTransportMode::Coach => "Coach",
            PublicTransportMode::Ferry => "Ferry",
            PublicTransportMode::LightRail => "LightRail",
            PublicTransportMode::Metro => "Metro",
            PublicTransportMode::NationalRail => "NationalRail",
            PublicTransportMode::Tram => "Tram",
            PublicTransportMode::Tube => "Tube",
        }
    }
}

impl FromStr for PublicTransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bus" => Ok(PublicTransportMode::Bus),
            "coach" => Ok(PublicTransportMode::Coach),
            "ferry" => Ok(PublicTransportMode::Ferry),
            "light rail" => Ok(PublicTransportMode::LightRail),
            "metro" => Ok(PublicTransportMode::Metro),
            "national rail" => Ok(PublicTransportMode::NationalRail),
            "tram" => Ok(PublicTransportMode::Tram),
            "tube" => Ok(PublicTransportMode::Tube),
            // The vehicle type field is 8 characters wide, so longer names
            // arrive truncated.
            "lightrai" => Ok(PublicTransportMode::LightRail),
            "national" => Ok(PublicTransportMode::NationalRail),
            "subway" => Ok(PublicTransportMode::Tube),
            "rail" => Ok(PublicTransportMode::NationalRail),
            _ => Err(format!("Invalid public transport mode: {}", s)),
        }
    }
}

/// File-name safe label for a raw vehicle type.
///
/// Known modes use their canonical label; anything else keeps its
/// alphanumeric characters, or `Unknown` when none remain.
pub fn vehicle_type_label(vehicle_type: &str) -> String {
    if let Ok(mode) = PublicTransportMode::from_str(vehicle_type) {
        return mode.label().to_string();
    }
    let cleaned: String = vehicle_type
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}
