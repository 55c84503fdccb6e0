//! Shared value types for the playfield framework.

mod stats;
mod types;

pub use stats::{StatValue, Stats};
pub use types::{Color, Rect, splitmix64, unit_f64};

pub use glam::DVec2;
