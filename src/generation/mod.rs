//! Seeded map generation pipeline.
//!
//! Stages run strictly in order against one [`GenerationContext`]:
//! endpoints, path carve, mountains, rivers, resources, connectivity and
//! grouping. The first failing stage aborts the run and nothing partial is
//! returned.

pub mod budget;
pub mod clusters;
pub mod connectivity;
pub mod context;
pub mod endpoints;
pub mod grid;
pub mod grouping;
pub mod growth;
pub mod mountains;
pub mod path;
pub mod resources;
pub mod rivers;
pub mod seed;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

pub use clusters::{ClusterGroup, Direction, GroupId};
pub use context::GenerationContext;
pub use grid::{Coord, Grid, TileKind};

use crate::config::GeneratorConfig;
use crate::error::{GenResult, GenerationFailure, Stage};
use crate::logging::TimingSpan;

/// Finished map handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MapData")]
pub struct GeneratedMap {
    /// Seed string the run used; time-derived seeds are filled in.
    pub seed: String,
    pub seed_hash: u64,
    pub width: i32,
    pub height: i32,
    pub grid: Grid,
    pub start: Coord,
    pub end: Coord,
    pub groups: Vec<ClusterGroup>,
    /// Cell to position in `groups`; rebuilt on load.
    #[serde(skip)]
    owners: HashMap<Coord, usize>,
}

/// Serialized form of [`GeneratedMap`] without the owner index.
#[derive(Deserialize)]
struct MapData {
    seed: String,
    seed_hash: u64,
    width: i32,
    height: i32,
    grid: Grid,
    start: Coord,
    end: Coord,
    groups: Vec<ClusterGroup>,
}

impl From<MapData> for GeneratedMap {
    fn from(data: MapData) -> Self {
        Self {
            owners: index_owners(&data.groups),
            seed: data.seed,
            seed_hash: data.seed_hash,
            width: data.width,
            height: data.height,
            grid: data.grid,
            start: data.start,
            end: data.end,
            groups: data.groups,
        }
    }
}

fn index_owners(groups: &[ClusterGroup]) -> HashMap<Coord, usize> {
    let mut owners = HashMap::new();
    for (i, group) in groups.iter().enumerate() {
        for &c in group.members() {
            owners.insert(c, i);
        }
    }
    owners
}

/// Per-kind cell counts of a finished map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStats {
    pub grass: usize,
    pub wood: usize,
    pub iron: usize,
    pub mountain: usize,
    pub river: usize,
    pub groups: usize,
}

impl GeneratedMap {
    /// Group owning `c`, looked up through the owner index. Call
    /// [`GeneratedMap::reindex`] after editing `groups` directly.
    pub fn group_of(&self, c: Coord) -> Option<&ClusterGroup> {
        let group = self.groups.get(*self.owners.get(&c)?)?;
        group.contains(c).then_some(group)
    }

    pub fn reindex(&mut self) {
        self.owners = index_owners(&self.groups);
    }

    pub fn stats(&self) -> MapStats {
        MapStats {
            grass: self.grid.count(TileKind::Grass),
            wood: self.grid.count(TileKind::Wood),
            iron: self.grid.count(TileKind::Iron),
            mountain: self.grid.count(TileKind::Mountain),
            river: self.grid.count(TileKind::River),
            groups: self.groups.len(),
        }
    }

    fn from_context(ctx: GenerationContext<'_>, start: Coord, end: Coord) -> Self {
        let groups = ctx.registry.into_groups();
        Self {
            owners: index_owners(&groups),
            seed: ctx.seed.seed().to_string(),
            seed_hash: ctx.seed.hash(),
            width: ctx.grid.width(),
            height: ctx.grid.height(),
            grid: ctx.grid,
            start,
            end,
            groups,
        }
    }
}

impl fmt::Display for GeneratedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.grid.rows().enumerate() {
            let line: String = row
                .iter()
                .enumerate()
                .map(|(x, kind)| {
                    let c = Coord::new(x as i32, y as i32);
                    if c == self.start {
                        'S'
                    } else if c == self.end {
                        'E'
                    } else {
                        kind.glyph()
                    }
                })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Run the whole pipeline for `config`.
pub fn generate(config: &GeneratorConfig) -> GenResult<GeneratedMap> {
    if let Err(err) = config.validate() {
        return Err(GenerationFailure::new(Stage::Seed, err.to_string()));
    }
    let mut ctx = GenerationContext::new(config);
    match run_stages(&mut ctx) {
        Ok((start, end)) => {
            let map = GeneratedMap::from_context(ctx, start, end);
            info!(
                seed = %map.seed,
                groups = map.groups.len(),
                "map generated"
            );
            Ok(map)
        }
        Err(err) => {
            warn!(
                seed = ctx.seed.seed(),
                stage = %err.stage,
                reason = %err.reason,
                "generation failed"
            );
            Err(err)
        }
    }
}

fn run_stages(ctx: &mut GenerationContext<'_>) -> GenResult<(Coord, Coord)> {
    let (start, end) = timed(Stage::Endpoints, || endpoints::select_endpoints(ctx))?;
    timed(Stage::PathCarve, || path::carve_path(ctx))?;
    timed(Stage::Mountains, || mountains::grow_mountains(ctx))?;
    timed(Stage::Rivers, || rivers::grow_rivers(ctx))?;
    timed(Stage::Resources, || resources::place_resources(ctx))?;
    timed(Stage::Connectivity, || connectivity::enforce_connectivity(ctx))?;
    timed(Stage::Grouping, || grouping::build_groups(ctx))?;
    Ok((start, end))
}

fn timed<T>(stage: Stage, run: impl FnOnce() -> GenResult<T>) -> GenResult<T> {
    let _span = TimingSpan::new(stage.as_str());
    run()
}
