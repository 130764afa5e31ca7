//! Integration configuration and validation.
//!
//! The configuration surface is owned by the host; this module consumes it
//! as validated input and normalizes the area specification.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use polisradar_core::{MatchMode, dedupe_areas, split_areas};

/// Default time window in hours.
pub const DEFAULT_HOURS: u32 = 24;

/// Default maximum events kept per area.
pub const DEFAULT_MAX_ITEMS: usize = 5;

/// Default minutes between refreshes.
pub const DEFAULT_UPDATE_INTERVAL_MINUTES: u64 = 5;

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The time window is outside 1–168 hours.
    #[error("hours must be between 1 and 168, got {0}")]
    InvalidHours(u32),

    /// The per-area cap is above 50.
    #[error("max_items must be at most 50, got {0}")]
    InvalidMaxItems(usize),

    /// The refresh interval is outside 1–60 minutes.
    #[error("update interval must be between 1 and 60 minutes, got {0}")]
    InvalidUpdateInterval(u64),
}

/// Configuration for one integration instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarConfig {
    /// Free-text area specification; several areas may be separated by
    /// `/ , ; |` or newlines. Empty means no area restriction.
    pub area_spec: String,
    /// How location names are compared against area filters.
    pub match_mode: MatchMode,
    /// Time window in hours (1–168).
    pub hours: u32,
    /// Maximum events kept per area (0–50); today's events are always kept.
    pub max_items: usize,
    /// Minutes between refreshes (1–60).
    pub update_interval_minutes: u64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            area_spec: String::new(),
            match_mode: MatchMode::default(),
            hours: DEFAULT_HOURS,
            max_items: DEFAULT_MAX_ITEMS,
            update_interval_minutes: DEFAULT_UPDATE_INTERVAL_MINUTES,
        }
    }
}

impl RadarConfig {
    /// Creates a configuration for the given area specification with
    /// defaults for everything else.
    pub fn new(area_spec: impl Into<String>) -> Self {
        Self {
            area_spec: area_spec.into(),
            ..Self::default()
        }
    }

    /// Builder: set the match mode.
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Builder: set the time window in hours.
    pub fn with_hours(mut self, hours: u32) -> Self {
        self.hours = hours;
        self
    }

    /// Builder: set the per-area cap.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Builder: set the refresh interval in minutes.
    pub fn with_update_interval_minutes(mut self, minutes: u64) -> Self {
        self.update_interval_minutes = minutes;
        self
    }

    /// Validates every bounded field.
    ///
    /// # Errors
    ///
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=168).contains(&self.hours) {
            return Err(ConfigError::InvalidHours(self.hours));
        }
        if self.max_items > 50 {
            return Err(ConfigError::InvalidMaxItems(self.max_items));
        }
        if !(1..=60).contains(&self.update_interval_minutes) {
            return Err(ConfigError::InvalidUpdateInterval(
                self.update_interval_minutes,
            ));
        }
        Ok(())
    }

    /// The configured areas, deduplicated case-insensitively in input
    /// order. With no areas configured the result is a single empty
    /// filter, which matches everything.
    pub fn areas(&self) -> Vec<String> {
        let areas = dedupe_areas(split_areas(&self.area_spec));
        if areas.is_empty() {
            vec![String::new()]
        } else {
            areas
        }
    }

    /// The time window as a chrono duration.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.hours))
    }

    /// The refresh interval as a std duration.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes * 60)
    }
}
