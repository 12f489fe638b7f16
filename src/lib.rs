//! Rail Map - Procedural Core Library
//!
//! Seeded generation of rectangular terrain grids for the rail map:
//! - Typed grid (grass, wood, iron, mountain, river) with start/end points
//! - Mountain, river and resource cluster growth
//! - Reachability sweep and cheapest-path repairs
//! - Total partition of the grid into cluster groups
//! - Invariant verification and parallel seed surveys
//!
//! A run is a pure function of its configuration and seed. It either returns
//! a finished [`GeneratedMap`] or a [`GenerationFailure`] naming the stage
//! that gave up.

pub mod config;
pub mod constants;
pub mod error;
pub mod generation;
pub mod logging;
pub mod survey;
pub mod verify;

pub use config::{CountRange, GeneratorConfig};
pub use error::{ConfigError, GenResult, GenerationFailure, Stage};
pub use generation::{
    generate, ClusterGroup, Coord, Direction, GeneratedMap, Grid, GroupId, MapStats, TileKind,
};
pub use survey::{generate_with_retries, run_survey, SurveyReport};
pub use verify::{verify, Violation};
