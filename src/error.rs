//! Error types for configuration loading and generation runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Seed,
    Endpoints,
    PathCarve,
    Mountains,
    Rivers,
    Resources,
    Connectivity,
    Grouping,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Seed => "seed",
            Stage::Endpoints => "endpoints",
            Stage::PathCarve => "path_carve",
            Stage::Mountains => "mountains",
            Stage::Rivers => "rivers",
            Stage::Resources => "resources",
            Stage::Connectivity => "connectivity",
            Stage::Grouping => "grouping",
        }
    }

    pub fn all() -> &'static [Stage] {
        &[
            Stage::Seed,
            Stage::Endpoints,
            Stage::PathCarve,
            Stage::Mountains,
            Stage::Rivers,
            Stage::Resources,
            Stage::Connectivity,
            Stage::Grouping,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single fatal outcome of a generation run.
///
/// Raised when a bounded loop exceeds the iteration budget or a stage cannot
/// meet its structural precondition. There is no partial output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("generation failed during {stage}: {reason}")]
pub struct GenerationFailure {
    pub stage: Stage,
    pub reason: String,
}

impl GenerationFailure {
    pub fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

pub type GenResult<T> = Result<T, GenerationFailure>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}
