use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::instrument;

use crate::{
    format::{self, HabitFile},
    habit::{self, Habit, HabitError},
    stats::{self, DailyProgress, HabitStats},
    store::{HabitStore, MemoryStore},
};

pub struct HabitService {
    habits: RwLock<Vec<Habit>>,
    store: Box<dyn HabitStore>,
    /// Whether the store holds data, so an emptied list still gets written.
    has_saved: AtomicBool,
}

pub struct HabitServiceBuilder {
    store: Option<Box<dyn HabitStore>>,
    seed_defaults: bool,
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            seed_defaults: true,
        }
    }

    pub fn with_store(mut self, store: impl HabitStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn seed_defaults(mut self, enabled: bool) -> Self {
        self.seed_defaults = enabled;
        self
    }

    pub fn build(self) -> Result<HabitService> {
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryStore::new()));
        let (habits, has_saved, seeded) = match store.load().context("loading stored habits")? {
            Some(bytes) => {
                let habits = format::decode_habits(&bytes).context("decoding stored habits")?;
                tracing::debug!(count = habits.len(), "loaded habits from store");
                (habits, true, false)
            }
            None if self.seed_defaults => {
                tracing::info!("no stored habits; seeding defaults");
                (habit::default_habits(), false, true)
            }
            None => (Vec::new(), false, false),
        };
        let service = HabitService {
            habits: RwLock::new(habits),
            store,
            has_saved: AtomicBool::new(has_saved),
        };
        if seeded {
            service.persist(&service.habits.read())?;
        }
        Ok(service)
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }

    pub fn habit(&self, id: i64) -> Result<Habit> {
        self.habits
            .read()
            .iter()
            .find(|habit| habit.id == id)
            .cloned()
            .ok_or_else(|| HabitError::UnknownHabit(id).into())
    }

    pub fn add_habit(&self, name: &str) -> Result<Habit> {
        let created = self.update(|habits| {
            let created = Habit::new(habit::next_habit_id(habits.iter()), name)?;
            habits.push(created.clone());
            Ok(created)
        })?;
        tracing::debug!(id = created.id, name = %created.name, "added habit");
        Ok(created)
    }

    pub fn delete_habit(&self, id: i64) -> Result<()> {
        self.update(|habits| {
            let before = habits.len();
            habits.retain(|habit| habit.id != id);
            if habits.len() == before {
                return Err(HabitError::UnknownHabit(id).into());
            }
            Ok(())
        })?;
        tracing::debug!(id, "deleted habit");
        Ok(())
    }

    /// Flips completion of `date` for habit `id`, returning the new state.
    pub fn toggle_date(&self, id: i64, date: &str) -> Result<bool> {
        self.update(|habits| {
            let habit = habits
                .iter_mut()
                .find(|habit| habit.id == id)
                .ok_or(HabitError::UnknownHabit(id))?;
            Ok(habit.toggle(date)?)
        })
    }

    pub fn stats(&self, id: i64, today: NaiveDate) -> Result<HabitStats> {
        Ok(stats::compute_stats(&self.habit(id)?, today))
    }

    pub fn daily_progress(&self, day: NaiveDate) -> DailyProgress {
        stats::daily_progress(&self.habits.read(), day)
    }

    /// Compact JSON of the current habits, as written to an export file.
    pub fn export_bytes(&self) -> Result<Vec<u8>> {
        let habits = self.habits.read();
        if habits.is_empty() {
            bail!("there are no habits to export");
        }
        Ok(format::encode_habits(&habits)?)
    }

    #[instrument(skip(self))]
    pub fn export_to(&self, dir: &Path, today: NaiveDate) -> Result<PathBuf> {
        let bytes = self.export_bytes()?;
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format::export_file_name(today));
        fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "exported habits");
        Ok(path)
    }

    /// Replaces every habit with the contents of an import file.
    ///
    /// The file is decoded in full first; on any error the current habits
    /// are left as they were.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn import_bytes(&self, bytes: &[u8]) -> Result<usize> {
        let file = HabitFile::from_slice(bytes).context("reading import file")?;
        let kind = match &file {
            HabitFile::Empty => "empty",
            HabitFile::Legacy(_) => "legacy",
            HabitFile::Compact(_) => "compact",
        };
        let imported = file.into_habits();
        let count = imported.len();
        self.update(|habits| {
            *habits = imported;
            Ok(())
        })?;
        tracing::info!(count, kind, "imported habits");
        Ok(count)
    }

    pub fn import_from(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        self.import_bytes(&bytes)
            .with_context(|| format!("importing {}", path.display()))
    }

    /// Applies `change` to a copy of the list and saves it.
    ///
    /// The write lock is held until the save returns, and the copy only
    /// replaces the list once it is stored.
    fn update<T>(&self, change: impl FnOnce(&mut Vec<Habit>) -> Result<T>) -> Result<T> {
        let mut habits = self.habits.write();
        let mut next = habits.clone();
        let output = change(&mut next)?;
        self.persist(&next)?;
        *habits = next;
        Ok(output)
    }

    #[instrument(skip_all, fields(count = habits.len()))]
    fn persist(&self, habits: &[Habit]) -> Result<()> {
        if habits.is_empty() && !self.has_saved.load(Ordering::Acquire) {
            tracing::debug!("nothing stored yet; skipping save of empty list");
            return Ok(());
        }
        let bytes = format::encode_habits(habits)?;
        self.store.save(&bytes).context("saving habits")?;
        self.has_saved.store(true, Ordering::Release);
        Ok(())
    }
}
