use crate::error::Result;
use crate::models::{ImplicitFeedback, Rating, TopKCase};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Reads a JSON array of records from `path`.
pub fn load_records<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let path = path.as_ref();
    let reader = BufReader::new(fs::File::open(path)?);
    let records: Vec<T> = serde_json::from_reader(reader)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

pub fn load_ratings<P: AsRef<Path>>(path: P) -> Result<Vec<Rating>> {
    load_records(path)
}

pub fn load_implicit_feedback<P: AsRef<Path>>(path: P) -> Result<Vec<ImplicitFeedback>> {
    load_records(path)
}

/// Accepts either grouped cases or flat `[user, top_item, distractor]` rows.
pub fn load_top_k_cases<P: AsRef<Path>>(path: P) -> Result<Vec<TopKCase>> {
    let path = path.as_ref();
    let value: serde_json::Value = serde_json::from_reader(BufReader::new(fs::File::open(path)?))?;
    let is_flat = value
        .as_array()
        .and_then(|rows| rows.first())
        .map_or(false, |row| row.is_array());

    let cases = if is_flat {
        let rows: Vec<(String, String, String)> = serde_json::from_value(value)?;
        TopKCase::group_rows(rows)
    } else {
        serde_json::from_value(value)?
    };
    info!("Loaded {} top-K cases from {}", cases.len(), path.display());
    Ok(cases)
}
