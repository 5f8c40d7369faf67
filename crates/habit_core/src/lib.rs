pub mod calendar;
pub mod codec;
pub mod format;
pub mod habit;
pub mod service;
pub mod stats;
pub mod store;

pub use crate::service::{HabitService, HabitServiceBuilder};
