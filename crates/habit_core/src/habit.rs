use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar;

/// Working representation of a habit: one boolean per calendar day.
///
/// `dates` is keyed by `YYYY-MM-DD`. A missing key means "not completed".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub dates: BTreeMap<String, bool>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HabitError {
    #[error("habit name must not be empty")]
    EmptyName,
    #[error("`{0}` is not a YYYY-MM-DD date")]
    InvalidDate(String),
    #[error("no habit with id {0}")]
    UnknownHabit(i64),
}

pub const DEFAULT_HABIT_NAMES: [&str; 3] = [
    "Drink 8 glasses of water",
    "Move your body for 20 minutes",
    "Read for 15 minutes",
];

impl Habit {
    /// Creates an empty habit, trimming the name.
    pub fn new(id: i64, name: &str) -> Result<Self, HabitError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HabitError::EmptyName);
        }
        Ok(Self {
            id,
            name: name.to_string(),
            dates: BTreeMap::new(),
        })
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.dates
            .get(&calendar::format_local_date(date))
            .copied()
            .unwrap_or(false)
    }

    /// Flips completion for `date` and returns the new state.
    pub fn toggle(&mut self, date: &str) -> Result<bool, HabitError> {
        let parsed = calendar::parse_local_date(date)
            .ok_or_else(|| HabitError::InvalidDate(date.to_string()))?;
        let key = calendar::format_local_date(parsed);
        let entry = self.dates.entry(key).or_insert(false);
        *entry = !*entry;
        Ok(*entry)
    }

    /// Rewrites keys such as `2025-9-1` as `2025-09-01`.
    ///
    /// Spellings of the same day are merged, completed if any of them was.
    /// Keys that are not dates are kept untouched.
    pub fn canonicalize_dates(&mut self) {
        let mut dates = BTreeMap::new();
        for (key, done) in std::mem::take(&mut self.dates) {
            let key = match calendar::parse_local_date(&key) {
                Some(date) => calendar::format_local_date(date),
                None => key,
            };
            let entry = dates.entry(key).or_insert(false);
            *entry |= done;
        }
        self.dates = dates;
    }

    /// Keys marked `true`, in map order.
    pub fn completed_keys(&self) -> impl Iterator<Item = &str> {
        self.dates
            .iter()
            .filter(|(_, done)| **done)
            .map(|(key, _)| key.as_str())
    }
}

/// Timestamp-derived id not used by any habit in `existing`.
///
/// Normally greater than every existing id; once `i64::MAX` is taken the
/// lowest free positive id is used instead.
pub fn next_habit_id<'a>(existing: impl IntoIterator<Item = &'a Habit>) -> i64 {
    let ids: BTreeSet<i64> = existing.into_iter().map(|habit| habit.id).collect();
    let now = Utc::now().timestamp_millis();
    match ids.last() {
        Some(&max) if max >= now => max
            .checked_add(1)
            .unwrap_or_else(|| lowest_unused_id(&ids)),
        _ => now,
    }
}

fn lowest_unused_id(ids: &BTreeSet<i64>) -> i64 {
    (1..).find(|id| !ids.contains(id)).unwrap_or_default()
}

/// Starter habits offered when nothing has been stored yet.
pub fn default_habits() -> Vec<Habit> {
    let base = Utc::now().timestamp_millis();
    DEFAULT_HABIT_NAMES
        .iter()
        .zip(1..)
        .map(|(name, offset)| Habit {
            id: base + offset,
            name: (*name).to_string(),
            dates: BTreeMap::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_rejects_blank_names() {
        let habit = Habit::new(7, "  Stretch  ").unwrap();
        assert_eq!(habit.name, "Stretch");
        assert!(habit.dates.is_empty());
        assert_eq!(Habit::new(8, "   "), Err(HabitError::EmptyName));
    }

    #[test]
    fn toggle_flips_and_canonicalises_keys() {
        let mut habit = Habit::new(1, "Walk").unwrap();
        assert_eq!(habit.toggle("2025-9-1"), Ok(true));
        assert!(habit.dates.contains_key("2025-09-01"));
        assert_eq!(habit.toggle("2025-09-01"), Ok(false));
        assert_eq!(habit.dates.get("2025-09-01"), Some(&false));
        assert!(matches!(
            habit.toggle("not-a-date"),
            Err(HabitError::InvalidDate(_))
        ));
    }

    #[test]
    fn completed_keys_skip_false_entries() {
        let mut habit = Habit::new(1, "Walk").unwrap();
        habit.dates.insert("2025-01-02".into(), true);
        habit.dates.insert("2025-01-03".into(), false);
        habit.dates.insert("2025-01-01".into(), true);
        let keys: Vec<&str> = habit.completed_keys().collect();
        assert_eq!(keys, vec!["2025-01-01", "2025-01-02"]);
        assert!(habit.is_completed_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(!habit.is_completed_on(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()));
    }

    #[test]
    fn next_id_is_unique_even_for_future_ids() {
        let far_future = Habit::new(i64::MAX / 2, "Future").unwrap();
        assert_eq!(next_habit_id([&far_future]), i64::MAX / 2 + 1);
        assert!(next_habit_id(std::iter::empty()) > 0);
    }

    #[test]
    fn next_id_after_max_id_reuses_lowest_free_id() {
        let max = Habit::new(i64::MAX, "Max").unwrap();
        let one = Habit::new(1, "One").unwrap();
        assert_eq!(next_habit_id([&max, &one]), 2);
        assert_eq!(next_habit_id([&max]), 1);
    }

    #[test]
    fn canonicalize_merges_spellings_of_a_day() {
        let mut habit = Habit::new(1, "Walk").unwrap();
        habit.dates.insert("2025-9-1".into(), true);
        habit.dates.insert("2025-09-01".into(), false);
        habit.dates.insert("2025-09-02".into(), false);
        habit.dates.insert("someday".into(), true);
        habit.canonicalize_dates();
        assert_eq!(
            habit.dates,
            BTreeMap::from([
                ("2025-09-01".to_string(), true),
                ("2025-09-02".to_string(), false),
                ("someday".to_string(), true),
            ])
        );
        assert_eq!(habit.toggle("2025-09-01"), Ok(false));
        assert!(!habit.is_completed_on(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()));
    }

    #[test]
    fn default_habits_have_distinct_ids() {
        let habits = default_habits();
        assert_eq!(habits.len(), 3);
        assert_ne!(habits[0].id, habits[1].id);
        assert_ne!(habits[1].id, habits[2].id);
        assert_eq!(habits[2].name, "Read for 15 minutes");
    }
}
