use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use habit_core::{calendar, store::FileStore, HabitService};
use tracing::info;

const DEFAULT_HISTORY_DAYS: usize = 7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) data_path: PathBuf,
    pub(crate) history_days: usize,
    pub(crate) seed_defaults: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("MOMENTUM_DATA_PATH") {
            if !path.trim().is_empty() {
                config.data_path = PathBuf::from(path);
            }
        }
        if let Ok(days) = std::env::var("MOMENTUM_HISTORY_DAYS") {
            if let Ok(value) = days.trim().parse::<usize>() {
                if value > 0 {
                    config.history_days = value;
                }
            }
        }
        if let Ok(seed) = std::env::var("MOMENTUM_SEED_DEFAULTS") {
            let seed = seed.trim();
            config.seed_defaults = !(seed == "0" || seed.eq_ignore_ascii_case("false"));
        }
        Ok(config)
    }

    /// Command-line flags take precedence over the environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.data_path {
            self.data_path = path.clone();
        }
        if let Some(days) = cli.history_days.filter(|days| *days > 0) {
            self.history_days = days;
        }
        if cli.no_defaults {
            self.seed_defaults = false;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            history_days: DEFAULT_HISTORY_DAYS,
            seed_defaults: true,
        }
    }
}

fn default_data_path() -> PathBuf {
    let base = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share")));
    match base {
        Some(dir) => dir.join("momentum").join("habits.json"),
        None => PathBuf::from("momentum_habits.json"),
    }
}

#[derive(Debug, Parser)]
#[command(name = "momentum", version, about = "Track daily habits and streaks")]
pub struct Cli {
    /// JSON file holding the habit list
    #[arg(long, global = true)]
    pub data_path: Option<PathBuf>,

    /// Number of days shown by `list`
    #[arg(long, global = true)]
    pub history_days: Option<usize>,

    /// Start with an empty list instead of the starter habits
    #[arg(long, global = true)]
    pub no_defaults: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show recent days for every habit and today's progress
    List,
    /// Create a habit
    Add { name: String },
    /// Flip completion for a day (defaults to today)
    Toggle { id: i64, date: Option<String> },
    /// Remove a habit
    Delete { id: i64 },
    /// Totals and streaks for one habit
    Stats { id: i64 },
    /// Write a compact export file into a directory
    Export { dir: Option<PathBuf> },
    /// Replace all habits with the contents of an export file
    Import { file: PathBuf },
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    info!(path = %config.data_path.display(), "opening habit store");
    let service = HabitService::builder()
        .with_store(FileStore::new(&config.data_path))
        .seed_defaults(config.seed_defaults)
        .build()
        .context("failed to open habit store")?;
    let output = execute(&service, &config, command, calendar::today())?;
    print!("{output}");
    Ok(())
}

/// Applies `command` and renders what the terminal should show.
pub fn execute(
    service: &HabitService,
    config: &AppConfig,
    command: Command,
    today: NaiveDate,
) -> Result<String> {
    match command {
        Command::List => Ok(render_list(service, config.history_days, today)),
        Command::Add { name } => {
            let habit = service.add_habit(&name)?;
            Ok(format!("Added \"{}\" ({})\n", habit.name, habit.id))
        }
        Command::Toggle { id, date } => {
            let date = date.unwrap_or_else(|| calendar::format_local_date(today));
            let done = service.toggle_date(id, &date)?;
            let state = if done { "done" } else { "not done" };
            Ok(format!("{date}: {state}\n"))
        }
        Command::Delete { id } => {
            let habit = service.habit(id)?;
            service.delete_habit(id)?;
            Ok(format!("Deleted \"{}\"\n", habit.name))
        }
        Command::Stats { id } => {
            let habit = service.habit(id)?;
            let stats = service.stats(id, today)?;
            Ok(format!(
                "{}\n  total completions: {}\n  current streak:    {}\n  longest streak:    {}\n",
                habit.name, stats.total, stats.current_streak, stats.longest_streak
            ))
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let path = service.export_to(&dir, today)?;
            Ok(format!("Exported to {}\n", path.display()))
        }
        Command::Import { file } => {
            let count = service.import_from(&file)?;
            Ok(format!("Imported {count} habits\n"))
        }
    }
}

fn render_list(service: &HabitService, history_days: usize, today: NaiveDate) -> String {
    let habits = service.habits();
    let days = calendar::past_dates(history_days, today);
    let mut out = String::new();

    if habits.is_empty() {
        out.push_str("No habits yet. Add one with `momentum add <name>`.\n");
    }
    let name_width = habits
        .iter()
        .map(|habit| habit.name.chars().count())
        .max()
        .unwrap_or(0);
    for habit in &habits {
        let marks: String = days
            .iter()
            .map(|day| if habit.is_completed_on(*day) { '#' } else { '.' })
            .collect();
        let _ = writeln!(
            out,
            "{:>15}  {:<width$}  {}",
            habit.id,
            habit.name,
            marks,
            width = name_width
        );
    }

    let progress = service.daily_progress(today);
    let _ = writeln!(
        out,
        "Today: {}/{} ({}%) {}",
        progress.completed,
        progress.total,
        progress.percentage,
        progress.message()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::store::MemoryStore;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn service() -> HabitService {
        HabitService::builder()
            .with_store(MemoryStore::new())
            .seed_defaults(false)
            .build()
            .unwrap()
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "momentum",
            "--data-path",
            "/tmp/h.json",
            "--history-days",
            "14",
            "--no-defaults",
            "stats",
            "3",
        ]);
        let mut config = AppConfig::default();
        config.apply_cli(&cli);
        assert_eq!(config.data_path, PathBuf::from("/tmp/h.json"));
        assert_eq!(config.history_days, 14);
        assert!(!config.seed_defaults);
        assert_eq!(cli.command, Some(Command::Stats { id: 3 }));
    }

    #[test]
    fn zero_history_days_is_ignored() {
        let cli = Cli::parse_from(["momentum", "--history-days", "0"]);
        let mut config = AppConfig::default();
        config.apply_cli(&cli);
        assert_eq!(config.history_days, DEFAULT_HISTORY_DAYS);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn toggle_defaults_to_today_and_list_shows_marks() {
        let service = service();
        let config = AppConfig {
            history_days: 3,
            ..AppConfig::default()
        };
        let today = ymd(2025, 9, 20);
        let habit = service.add_habit("Walk").unwrap();

        let out = execute(&service, &config, Command::Toggle { id: habit.id, date: None }, today)
            .unwrap();
        assert_eq!(out, "2025-09-20: done\n");
        service.toggle_date(habit.id, "2025-09-18").unwrap();

        let list = execute(&service, &config, Command::List, today).unwrap();
        assert!(list.contains("Walk  #.#"), "{list}");
        assert!(list.contains("Today: 1/1 (100%) You're unstoppable!"), "{list}");
    }

    #[test]
    fn stats_command_reports_streaks() {
        let service = service();
        let config = AppConfig::default();
        let habit = service.add_habit("Read").unwrap();
        for date in ["2025-09-18", "2025-09-19"] {
            service.toggle_date(habit.id, date).unwrap();
        }
        let out = execute(&service, &config, Command::Stats { id: habit.id }, ymd(2025, 9, 20))
            .unwrap();
        assert!(out.contains("total completions: 2"));
        assert!(out.contains("current streak:    2"));
    }

    #[test]
    fn export_and_import_through_commands() {
        let temp = tempfile::tempdir().unwrap();
        let service = service();
        let config = AppConfig::default();
        let today = ymd(2025, 9, 20);
        let habit = service.add_habit("Stretch").unwrap();
        service.toggle_date(habit.id, "2025-02-01").unwrap();

        let out = execute(
            &service,
            &config,
            Command::Export {
                dir: Some(temp.path().to_path_buf()),
            },
            today,
        )
        .unwrap();
        assert!(out.contains("momentum_habits_2025-09-20.json"));

        let target = self::service();
        let out = execute(
            &target,
            &config,
            Command::Import {
                file: temp.path().join("momentum_habits_2025-09-20.json"),
            },
            today,
        )
        .unwrap();
        assert_eq!(out, "Imported 1 habits\n");
        assert_eq!(target.habits(), service.habits());
    }

    #[test]
    fn empty_list_prompts_for_first_habit() {
        let out = execute(&service(), &AppConfig::default(), Command::List, ymd(2025, 1, 1))
            .unwrap();
        assert!(out.starts_with("No habits yet."));
        assert!(out.contains("Today: 0/0 (0%) Let's get started!"));
    }
}
