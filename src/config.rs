use anyhow::{Context, Result};
use fs_err::read_to_string;
use serde::Deserialize;
use std::path::Path;

use super::frequency::FrequencyQuery;

/// A batch of frequency queries, one `[[query]]` table each.
#[derive(Debug, Deserialize, PartialEq)]
struct QueryFile {
    #[serde(rename = "query", default)]
    queries: Vec<FrequencyQuery>,
}

/// Loads and validates the queries listed in a TOML file.
///
/// ```toml
/// [[query]]
/// day = "tuesday"
/// start = "08:00"
/// end = "09:00"
/// collect_routes = true
/// ```
pub fn read_queries(path: &Path) -> Result<Vec<FrequencyQuery>> {
    let file = read_to_string(path)?;
    parse_queries(&file).with_context(|| format!("reading queries from {}", path.display()))
}

pub fn parse_queries(text: &str) -> Result<Vec<FrequencyQuery>> {
    let file: QueryFile = toml::from_str(text)?;
    for query in &file.queries {
        query.validate()?;
    }
    Ok(file.queries)
}
