use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::habit::Habit;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitStats {
    pub total: usize,
    pub current_streak: usize,
    pub longest_streak: usize,
}

/// Totals and streaks for one habit, measured against `today`.
///
/// The current streak only counts while the last completion is today or
/// yesterday; older runs have lapsed.
pub fn compute_stats(habit: &Habit, today: NaiveDate) -> HabitStats {
    let mut dates: Vec<NaiveDate> = habit
        .completed_keys()
        .filter_map(calendar::parse_local_date)
        .collect();
    if dates.is_empty() {
        return HabitStats::default();
    }
    dates.sort_unstable();
    dates.dedup();

    let mut longest_streak = 1;
    let mut run = 1;
    for pair in dates.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            run += 1;
        } else {
            longest_streak = longest_streak.max(run);
            run = 1;
        }
    }
    longest_streak = longest_streak.max(run);

    let last = dates[dates.len() - 1];
    let current_streak = if (today - last).num_days() > 1 { 0 } else { run };

    HabitStats {
        total: dates.len(),
        current_streak,
        longest_streak,
    }
}

pub fn compute_stats_now(habit: &Habit) -> HabitStats {
    compute_stats(habit, calendar::today())
}

pub fn current_streak(habit: &Habit, today: NaiveDate) -> usize {
    compute_stats(habit, today).current_streak
}

/// How many habits were completed on a given day.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl DailyProgress {
    pub fn message(&self) -> &'static str {
        match self.percentage {
            0 => "Let's get started!",
            1..=49 => "Good start, keep going!",
            50..=99 => "Almost there!",
            _ => "You're unstoppable!",
        }
    }
}

pub fn daily_progress(habits: &[Habit], day: NaiveDate) -> DailyProgress {
    let total = habits.len();
    let completed = habits
        .iter()
        .filter(|habit| habit.is_completed_on(day))
        .count();
    let percentage = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };
    DailyProgress {
        completed,
        total,
        percentage,
    }
}
