//! Centralized tuning constants for the rail map generator.
//!
//! Values that a level designer may want to tweak per map live in
//! [`GeneratorConfig`](crate::config::GeneratorConfig). The numbers here shape
//! the growth algorithms themselves and are shared across stages.

// =====================================================
// Safety
// =====================================================

/// Shared ceiling for every bounded loop (frontier growth, BFS, Dijkstra
/// construction, retry loops). Exceeding it fails the whole run.
pub const ITERATION_BUDGET: usize = 100_000;

/// Largest accepted grid, in cells. Larger configurations are rejected by
/// validation before any allocation.
pub const MAX_GRID_CELLS: usize = 1_000_000;

// =====================================================
// Endpoints
// =====================================================

/// Column of the start cell; the row is always `height / 2`.
pub const START_COLUMN: i32 = 1;

/// Chebyshev radius of the clear zone around each endpoint (5x5 square).
pub const ENDPOINT_CLEAR_RADIUS: i32 = 2;

// =====================================================
// Mountains
// =====================================================

/// Acceptance probability at size zero; decays linearly to 0 at target size.
pub const MOUNTAIN_ACCEPT_BASE: f64 = 0.7;

// =====================================================
// Rivers
// =====================================================

/// Probability that an elongated spine step follows the primary direction.
pub const RIVER_PRIMARY_BIAS: f64 = 0.7;

/// Per-neighbor acceptance probability while growing a rounded river blob.
pub const ROUNDED_RIVER_ACCEPT: f64 = 0.5;

/// Cluster expansion stays within `max_river_cells / RIVER_EXPANSION_DIVISOR`
/// Manhattan distance of the river seed.
pub const RIVER_EXPANSION_DIVISOR: usize = 4;

/// Widest lateral run an elongated river keeps after width limiting.
pub const MAX_RIVER_WIDTH: usize = 3;

/// Rivers left on the start-end path after the drying pass.
pub const MAX_PATH_RIVER_CELLS: usize = 2;

// =====================================================
// Resources
// =====================================================

/// Reachable wood cells required after the path-drying pass.
pub const MIN_REACHABLE_WOOD: usize = 2;

// =====================================================
// Grouping
// =====================================================

/// Grass groups of at least this many cells are split.
pub const GRASS_SPLIT_THRESHOLD: usize = 40;

/// Target cell count of each part of a split grass group.
pub const GRASS_SPLIT_PART_SIZE: usize = 20;
