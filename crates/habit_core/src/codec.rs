//! Bitmask codec between the sparse per-day map and the yearly storage form.
//!
//! Every year is twelve signed 32-bit chunks. Chunk `i`, bit `b` stands for
//! day-of-year `32 * i + b + 1`, which leaves headroom past day 366.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::calendar;
use crate::habit::Habit;

pub const CHUNKS_PER_YEAR: usize = 12;
pub const BITS_PER_CHUNK: u32 = 32;
const MAX_ENCODABLE_DAY: u32 = 366;

/// Compact form written to storage and export files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredHabit {
    pub id: i64,
    pub name: String,
    #[serde(rename = "yearlyData", deserialize_with = "lenient_yearly_data")]
    pub yearly_data: BTreeMap<String, Vec<i32>>,
}

pub fn compress(habits: &[Habit]) -> Vec<StoredHabit> {
    habits.iter().map(compress_habit).collect()
}

pub fn decompress(stored: &[StoredHabit]) -> Vec<Habit> {
    stored.iter().map(decompress_habit).collect()
}

pub fn compress_habit(habit: &Habit) -> StoredHabit {
    let mut yearly_data: BTreeMap<String, Vec<i32>> = BTreeMap::new();
    for key in habit.completed_keys() {
        let Some(date) = calendar::parse_local_date(key) else {
            tracing::warn!(habit_id = habit.id, date = key, "skipping unparseable date");
            continue;
        };
        let day = calendar::day_of_year(date);
        if !(1..=MAX_ENCODABLE_DAY).contains(&day) {
            continue;
        }
        let chunk_index = ((day - 1) / BITS_PER_CHUNK) as usize;
        let bit_index = (day - 1) % BITS_PER_CHUNK;
        let chunks = yearly_data
            .entry(date.year().to_string())
            .or_insert_with(|| vec![0; CHUNKS_PER_YEAR]);
        chunks[chunk_index] |= 1i32 << bit_index;
    }
    StoredHabit {
        id: habit.id,
        name: habit.name.clone(),
        yearly_data,
    }
}

pub fn decompress_habit(stored: &StoredHabit) -> Habit {
    let mut dates = BTreeMap::new();
    for (year_key, chunks) in &stored.yearly_data {
        let Ok(year) = year_key.trim().parse::<i32>() else {
            tracing::warn!(habit_id = stored.id, year = %year_key, "skipping unparseable year");
            continue;
        };
        let last_day = u64::from(calendar::days_in_year(year));
        for (chunk_index, &chunk) in chunks.iter().enumerate() {
            for bit_index in 0..BITS_PER_CHUNK {
                if (chunk >> bit_index) & 1 == 0 {
                    continue;
                }
                let day = chunk_index as u64 * u64::from(BITS_PER_CHUNK) + u64::from(bit_index) + 1;
                if day > last_day {
                    tracing::trace!(habit_id = stored.id, year, day, "discarding out-of-range day");
                    continue;
                }
                match calendar::date_from_day_of_year(year, day as u32) {
                    Some(date) if date.year() == year => {
                        dates.insert(calendar::format_local_date(date), true);
                    }
                    _ => {
                        tracing::trace!(habit_id = stored.id, year, day, "discarding day outside year");
                    }
                }
            }
        }
    }
    Habit {
        id: stored.id,
        name: stored.name.clone(),
        dates,
    }
}

/// Reads `yearlyData` without letting one bad entry sink the whole habit.
///
/// Non-array years are dropped and non-numeric chunks read as zero so the
/// remaining chunks keep their positions.
fn lenient_yearly_data<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let Value::Object(years) = raw else {
        tracing::warn!("yearlyData is not an object; treating as empty");
        return Ok(BTreeMap::new());
    };

    let mut yearly_data = BTreeMap::new();
    for (year, value) in years {
        let Value::Array(items) = value else {
            tracing::warn!(%year, "skipping non-array yearlyData entry");
            continue;
        };
        let chunks = items
            .iter()
            .map(|item| {
                chunk_from_value(item).unwrap_or_else(|| {
                    tracing::warn!(%year, "non-numeric chunk read as zero");
                    0
                })
            })
            .collect();
        yearly_data.insert(year, chunks);
    }
    Ok(yearly_data)
}

/// Interprets a JSON number with 32-bit two's-complement wrapping, so an
/// unsigned `2147483648` and a signed `-2147483648` carry the same bits.
fn chunk_from_value(value: &Value) -> Option<i32> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(signed) = number.as_i64() {
        return Some(signed as i32);
    }
    if let Some(unsigned) = number.as_u64() {
        return Some(unsigned as i32);
    }
    let float = number.as_f64()?;
    if !float.is_finite() {
        return Some(0);
    }
    Some(float.trunc().rem_euclid(4_294_967_296.0) as u32 as i32)
}
