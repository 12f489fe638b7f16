//! Generator configuration.
//!
//! All inputs of a generation run live in [`GeneratorConfig`]. Files may be
//! RON or JSON; missing fields fall back to [`GeneratorConfig::default`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{ITERATION_BUDGET, MAX_GRID_CELLS};
use crate::error::ConfigError;

/// Inclusive `[min, max]` range sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    pub fn contains(&self, value: usize) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seed string; empty means time-derived.
    pub seed: String,
    pub width: i32,
    pub height: i32,
    /// Exact Manhattan distance between start and end.
    pub path_length: i32,
    pub min_horizontal_distance: i32,
    pub min_grass_tile_count: usize,
    pub max_grass_tile_count: usize,
    pub min_wood_count: usize,
    pub min_iron_count: usize,
    pub min_destructible_cluster_size: usize,
    /// Random-start attempts made by the resource placer.
    pub resource_attempts: usize,
    pub mountain_cluster_count: CountRange,
    pub mountain_cluster_size: CountRange,
    pub river_count: CountRange,
    /// `min` is the shortest accepted river, `max` the most cells one river may hold.
    pub river_length: CountRange,
    pub lateral_spread_probability: f64,
    pub iteration_budget: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: String::new(),
            width: 32,
            height: 20,
            path_length: 24,
            min_horizontal_distance: 16,
            min_grass_tile_count: 180,
            max_grass_tile_count: 420,
            min_wood_count: 12,
            min_iron_count: 8,
            min_destructible_cluster_size: 4,
            resource_attempts: 40,
            mountain_cluster_count: CountRange::new(3, 5),
            mountain_cluster_size: CountRange::new(8, 20),
            river_count: CountRange::new(2, 3),
            river_length: CountRange::new(12, 40),
            lateral_spread_probability: 0.35,
            iteration_budget: ITERATION_BUDGET,
        }
    }
}

impl GeneratorConfig {
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Number of cells, or `None` when the product overflows `usize`.
    pub fn cell_count(&self) -> Option<usize> {
        (self.width.max(0) as usize).checked_mul(self.height.max(0) as usize)
    }

    /// Reject configurations that are structurally impossible.
    ///
    /// Passing validation does not promise a successful run: an unreachable
    /// `path_length`, for example, still fails at the endpoint stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 5 || self.height < 5 {
            return Err(invalid(format!(
                "grid must be at least 5x5, got {}x{}",
                self.width, self.height
            )));
        }
        match self.cell_count() {
            Some(cells) if cells <= MAX_GRID_CELLS => {}
            _ => {
                return Err(invalid(format!(
                    "grid {}x{} exceeds the {MAX_GRID_CELLS}-cell limit",
                    self.width, self.height
                )))
            }
        }
        if self.path_length <= 0 {
            return Err(invalid("path_length must be positive"));
        }
        if self.min_horizontal_distance < 0 {
            return Err(invalid("min_horizontal_distance must not be negative"));
        }
        if self.min_grass_tile_count >= self.max_grass_tile_count {
            return Err(invalid(format!(
                "min_grass_tile_count ({}) must be below max_grass_tile_count ({})",
                self.min_grass_tile_count, self.max_grass_tile_count
            )));
        }
        if self.min_destructible_cluster_size == 0 {
            return Err(invalid("min_destructible_cluster_size must be at least 1"));
        }
        for (name, range) in [
            ("mountain_cluster_count", self.mountain_cluster_count),
            ("mountain_cluster_size", self.mountain_cluster_size),
            ("river_count", self.river_count),
            ("river_length", self.river_length),
        ] {
            if range.min > range.max {
                return Err(invalid(format!(
                    "{name}: min ({}) exceeds max ({})",
                    range.min, range.max
                )));
            }
        }
        if self.mountain_cluster_size.min == 0 || self.river_length.min == 0 {
            return Err(invalid("cluster and river sizes must be at least 1"));
        }
        if self.river_count.min < 2 || self.river_count.max > 3 {
            return Err(invalid(format!(
                "river_count must lie within 2..=3, got {}..={}",
                self.river_count.min, self.river_count.max
            )));
        }
        if !(0.0..=1.0).contains(&self.lateral_spread_probability) {
            return Err(invalid(format!(
                "lateral_spread_probability must be within [0, 1], got {}",
                self.lateral_spread_probability
            )));
        }
        if self.iteration_budget == 0 {
            return Err(invalid("iteration_budget must be positive"));
        }
        Ok(())
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.ron` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Self::from_ron_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
