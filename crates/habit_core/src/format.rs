//! Import/export file boundary.
//!
//! Files are JSON arrays in one of two shapes: the compact `yearlyData`
//! bitmask form written today, or the older per-day `dates` map which must
//! stay importable.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::codec::{self, StoredHabit};
use crate::habit::Habit;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("import data is not an array")]
    NotAnArray,
    #[error("invalid habit at index {index}: {source}")]
    InvalidHabit {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("unrecognized file format")]
    UnrecognizedFormat,
}

/// A decoded file, resolved once into the shape it was written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitFile {
    Empty,
    Legacy(Vec<Habit>),
    Compact(Vec<StoredHabit>),
}

impl HabitFile {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ImportError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ImportError> {
        let Value::Array(items) = value else {
            return Err(ImportError::NotAnArray);
        };
        let Some(first) = items.first() else {
            return Ok(HabitFile::Empty);
        };

        if has_key(first, "yearlyData") {
            Ok(HabitFile::Compact(decode_all(items)?))
        } else if has_key(first, "dates") {
            Ok(HabitFile::Legacy(decode_all(items)?))
        } else {
            Err(ImportError::UnrecognizedFormat)
        }
    }

    pub fn into_habits(self) -> Vec<Habit> {
        match self {
            HabitFile::Empty => Vec::new(),
            HabitFile::Legacy(mut habits) => {
                habits.iter_mut().for_each(Habit::canonicalize_dates);
                habits
            }
            HabitFile::Compact(stored) => codec::decompress(&stored),
        }
    }
}

/// Compresses `habits` and renders the compact JSON array.
pub fn encode_habits(habits: &[Habit]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&codec::compress(habits))
}

pub fn decode_habits(bytes: &[u8]) -> Result<Vec<Habit>, ImportError> {
    Ok(HabitFile::from_slice(bytes)?.into_habits())
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("momentum_habits_{}.json", date.format("%Y-%m-%d"))
}

fn has_key(value: &Value, key: &str) -> bool {
    value.as_object().is_some_and(|object| object.contains_key(key))
}

fn decode_all<T: serde::de::DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, ImportError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|source| ImportError::InvalidHabit { index, source })
        })
        .collect()
}
