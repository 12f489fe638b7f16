//! River growth.
//!
//! Each map gets `river_count` rivers. The first is elongated (a biased walk
//! from an edge, widened laterally), the rest are rounded blobs. A candidate
//! is built on a scratch copy of the grid and only committed when its
//! largest 4-connected component has a length within `river_length`;
//! otherwise a new start and seed are drawn.

use rand::Rng;
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, trace};

use super::budget::IterationBudget;
use super::context::GenerationContext;
use super::grid::{Coord, Grid, TileKind};
use super::growth::flood_fill;
use super::seed::StageRng;
use crate::constants::{
    MAX_RIVER_WIDTH, RIVER_EXPANSION_DIVISOR, RIVER_PRIMARY_BIAS, ROUNDED_RIVER_ACCEPT,
};
use crate::error::{GenResult, GenerationFailure, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiverShape {
    Elongated,
    Rounded,
}

const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (1, -1), (1, 1), (-1, 1)];

/// Grow all rivers of the map. Returns the number of rivers committed.
pub fn grow_rivers(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    ctx.require_endpoints(Stage::Rivers)?;
    ensure_river_sources(ctx)?;
    let mut rng = ctx.rng();
    let count = ctx.config.river_count.sample(&mut rng);

    for i in 0..count {
        let shape = if i == 0 {
            RiverShape::Elongated
        } else {
            RiverShape::Rounded
        };
        let cells = find_river(ctx, shape)?;
        for &c in &cells {
            ctx.paint(c, TileKind::River);
        }
        debug!(river = i, ?shape, cells = cells.len(), "river committed");
        ctx.registry.create(TileKind::River, cells);
    }
    ctx.clear_endpoint_zones();
    Ok(count)
}

/// Retry candidates with fresh randomness until one fits the length range.
fn find_river(ctx: &mut GenerationContext<'_>, shape: RiverShape) -> GenResult<Vec<Coord>> {
    let range = ctx.config.river_length;
    let mut guard = ctx.budget.guard(Stage::Rivers, "river retries");
    loop {
        guard.tick()?;
        let rng = ctx.rng();
        let mut builder = RiverBuilder::new(ctx, rng);
        let cells = match shape {
            RiverShape::Elongated => builder.elongated()?,
            RiverShape::Rounded => builder.rounded()?,
        };
        if range.contains(cells.len()) {
            return Ok(cells);
        }
        trace!(?shape, len = cells.len(), attempt = guard.used(), "river candidate rejected");
    }
}

struct RiverBuilder<'c, 'a> {
    ctx: &'c GenerationContext<'a>,
    scratch: Grid,
    cells: BTreeSet<Coord>,
    rng: StageRng,
    budget: IterationBudget,
    max_cells: usize,
    spread: f64,
}

impl<'c, 'a> RiverBuilder<'c, 'a> {
    fn new(ctx: &'c GenerationContext<'a>, rng: StageRng) -> Self {
        Self {
            ctx,
            scratch: ctx.grid.clone(),
            cells: BTreeSet::new(),
            rng,
            budget: ctx.budget,
            max_cells: ctx.config.river_length.max,
            spread: ctx.config.lateral_spread_probability,
        }
    }

    fn placeable(&self, c: Coord) -> bool {
        self.scratch.is(c, TileKind::Grass) && !self.ctx.is_protected(c)
    }

    fn add(&mut self, c: Coord) {
        self.scratch.set(c, TileKind::River);
        self.cells.insert(c);
    }

    fn remove(&mut self, c: Coord) {
        // Only grass is ever turned into river on the scratch grid.
        self.scratch.set(c, TileKind::Grass);
        self.cells.remove(&c);
    }

    fn has_cardinal_river(&self, c: Coord) -> bool {
        self.scratch
            .neighbors4(c)
            .any(|n| self.cells.contains(&n))
    }

    /// Random edge cell plus the inward direction from that edge.
    fn edge_start(&mut self) -> (Coord, (i32, i32)) {
        let (w, h) = (self.scratch.width(), self.scratch.height());
        match self.rng.gen_range(0..4) {
            0 => (Coord::new(self.rng.gen_range(0..w), 0), (0, 1)),
            1 => (Coord::new(self.rng.gen_range(0..w), h - 1), (0, -1)),
            2 => (Coord::new(0, self.rng.gen_range(0..h)), (1, 0)),
            _ => (Coord::new(w - 1, self.rng.gen_range(0..h)), (-1, 0)),
        }
    }

    fn elongated(&mut self) -> GenResult<Vec<Coord>> {
        let (seed, dir) = self.edge_start();
        if !self.placeable(seed) {
            return Ok(Vec::new());
        }
        let desired = self.ctx.config.river_length.sample(&mut self.rng);
        let spine_len = (desired / 2).max(1);
        let lateral = (dir.1, dir.0);

        self.add(seed);
        let mut spine = vec![seed];
        let mut cursor = seed;
        let mut guard = self.budget.guard(Stage::Rivers, "river spine");
        while spine.len() < spine_len {
            guard.tick()?;
            let next = if self.rng.gen::<f64>() < RIVER_PRIMARY_BIAS {
                cursor.offset(dir.0, dir.1)
            } else {
                let side = if self.rng.gen::<bool>() { 1 } else { -1 };
                cursor.offset(dir.0 + lateral.0 * side, dir.1 + lateral.1 * side)
            };
            if !self.placeable(next) {
                break;
            }
            self.add(next);
            spine.push(next);
            cursor = next;
        }

        for &s in &spine {
            for side in [1, -1] {
                let n = s.offset(lateral.0 * side, lateral.1 * side);
                if self.placeable(n) && self.rng.gen::<f64>() < self.spread {
                    self.add(n);
                }
            }
        }

        self.expand(seed)?;
        self.connect_cardinally()?;
        self.limit_width(lateral)?;
        self.largest_component()
    }

    fn rounded(&mut self) -> GenResult<Vec<Coord>> {
        let (seed, _) = self.edge_start();
        if !self.placeable(seed) {
            return Ok(Vec::new());
        }
        let desired = self
            .ctx
            .config
            .river_length
            .sample(&mut self.rng)
            .min(self.max_cells);

        self.add(seed);
        let mut queue = VecDeque::from([seed]);
        let mut guard = self.budget.guard(Stage::Rivers, "river blob");
        'grow: while let Some(c) = queue.pop_front() {
            guard.tick()?;
            let neighbors: Vec<Coord> = self.scratch.neighbors8(c).collect();
            for n in neighbors {
                if self.cells.len() >= desired {
                    break 'grow;
                }
                if self.placeable(n) && self.rng.gen::<f64>() < ROUNDED_RIVER_ACCEPT {
                    self.add(n);
                    queue.push_back(n);
                }
            }
        }

        self.expand(seed)?;
        self.connect_cardinally()?;
        self.largest_component()
    }

    /// Thicken the river around its seed, staying within a Manhattan radius of
    /// a quarter of the maximum river size.
    fn expand(&mut self, seed: Coord) -> GenResult<()> {
        let radius = (self.max_cells / RIVER_EXPANSION_DIVISOR) as i32;
        let mut guard = self.budget.guard(Stage::Rivers, "river expansion");
        let mut seen = HashSet::from([seed]);
        let mut queue = VecDeque::from([seed]);
        while let Some(c) = queue.pop_front() {
            guard.tick()?;
            let neighbors: Vec<Coord> = self.scratch.neighbors8(c).collect();
            for n in neighbors {
                if self.cells.len() >= self.max_cells {
                    return Ok(());
                }
                if n.manhattan(seed) > radius || !seen.insert(n) {
                    continue;
                }
                if self.cells.contains(&n) {
                    queue.push_back(n);
                } else if self.placeable(n) && self.rng.gen::<f64>() < self.spread {
                    self.add(n);
                    queue.push_back(n);
                }
            }
        }
        Ok(())
    }

    /// Give every river cell a 4-connected river neighbor: bridge diagonal-only
    /// contacts through a grass cell, drop cells that cannot be bridged.
    fn connect_cardinally(&mut self) -> GenResult<()> {
        let mut guard = self.budget.guard(Stage::Rivers, "river connectivity");
        let snapshot: Vec<Coord> = self.cells.iter().copied().collect();
        for c in snapshot {
            guard.tick()?;
            if !self.cells.contains(&c) || self.has_cardinal_river(c) {
                continue;
            }
            let mut bridged = false;
            for (dx, dy) in DIAGONALS {
                if !self.cells.contains(&c.offset(dx, dy)) {
                    continue;
                }
                if let Some(link) = [c.offset(dx, 0), c.offset(0, dy)]
                    .into_iter()
                    .find(|&l| self.placeable(l))
                {
                    self.add(link);
                    bridged = true;
                    break;
                }
            }
            if !bridged {
                self.remove(c);
            }
        }
        Ok(())
    }

    /// Trim the outer cells of lateral runs wider than [`MAX_RIVER_WIDTH`]:
    /// a cell without river on both lateral sides is discarded from such runs.
    fn limit_width(&mut self, lateral: (i32, i32)) -> GenResult<()> {
        let mut guard = self.budget.guard(Stage::Rivers, "river width");
        loop {
            guard.tick()?;
            let trimmed: Vec<Coord> = self
                .cells
                .iter()
                .copied()
                .filter(|&c| {
                    // Runs of at most MAX_RIVER_WIDTH cells are kept whole, so
                    // one and two cell wide corridors survive.
                    let left = c.offset(-lateral.0, -lateral.1);
                    let right = c.offset(lateral.0, lateral.1);
                    let both = self.cells.contains(&left) && self.cells.contains(&right);
                    !both && self.lateral_run(c, lateral) > MAX_RIVER_WIDTH
                })
                .collect();
            if trimmed.is_empty() {
                return Ok(());
            }
            for c in trimmed {
                self.remove(c);
            }
        }
    }

    fn lateral_run(&self, c: Coord, lateral: (i32, i32)) -> usize {
        let mut run = 1;
        for side in [1, -1] {
            let mut n = c.offset(lateral.0 * side, lateral.1 * side);
            while self.cells.contains(&n) {
                run += 1;
                n = n.offset(lateral.0 * side, lateral.1 * side);
            }
        }
        run
    }

    /// Largest 4-connected component of the candidate, ties to the first found.
    fn largest_component(&self) -> GenResult<Vec<Coord>> {
        let mut guard = self.budget.guard(Stage::Rivers, "river components");
        let mut remaining = self.cells.clone();
        let mut best: Vec<Coord> = Vec::new();
        while let Some(&start) = remaining.iter().next() {
            let component = flood_fill(start, |c| self.cells.contains(&c), &mut guard)?;
            for c in &component {
                remaining.remove(c);
            }
            if component.len() > best.len() {
                best = component;
            }
        }
        best.sort();
        Ok(best)
    }
}

/// Fail fast when no grass edge cell exists at all; retries could never succeed.
pub fn ensure_river_sources(ctx: &GenerationContext<'_>) -> GenResult<()> {
    let any_edge = ctx
        .grid
        .coords()
        .any(|c| ctx.grid.is_edge(c) && ctx.grid.is(c, TileKind::Grass) && !ctx.is_protected(c));
    if any_edge {
        Ok(())
    } else {
        Err(GenerationFailure::new(
            Stage::Rivers,
            "no grass edge cell available as a river source",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CountRange, GeneratorConfig};
    use rand::SeedableRng;

    fn context(config: &GeneratorConfig) -> GenerationContext<'_> {
        let mut ctx = GenerationContext::new(config);
        ctx.endpoints = Some((Coord::new(1, 10), Coord::new(20, 10)));
        ctx
    }

    fn is_connected(cells: &[Coord]) -> bool {
        let set: BTreeSet<Coord> = cells.iter().copied().collect();
        let mut guard = IterationBudget::new(100_000).guard(Stage::Rivers, "test");
        let reached = flood_fill(cells[0], |c| set.contains(&c), &mut guard).unwrap();
        reached.len() == cells.len()
    }

    #[test]
    fn test_rivers_are_contiguous_and_sized() {
        let config = GeneratorConfig::default().with_seed("rivers");
        let mut ctx = context(&config);
        let count = grow_rivers(&mut ctx).unwrap();
        assert!(config.river_count.contains(count));
        let rivers: Vec<_> = ctx
            .registry
            .groups()
            .filter(|g| g.kind() == TileKind::River)
            .collect();
        assert_eq!(rivers.len(), count);
        for river in rivers {
            let cells: Vec<Coord> = river.members().iter().copied().collect();
            assert!(config.river_length.contains(cells.len()));
            assert!(is_connected(&cells));
        }
    }

    #[test]
    fn test_rivers_avoid_endpoint_zones() {
        let config = GeneratorConfig {
            river_count: CountRange::new(3, 3),
            river_length: CountRange::new(20, 60),
            lateral_spread_probability: 0.8,
            ..GeneratorConfig::default().with_seed("zones")
        };
        let mut ctx = context(&config);
        grow_rivers(&mut ctx).unwrap();
        for c in ctx.grid.coords_of(TileKind::River) {
            assert!(!ctx.is_protected(c), "river inside endpoint zone at {c}");
        }
    }

    #[test]
    fn test_rivers_only_replace_grass() {
        let config = GeneratorConfig::default().with_seed("mtn-first");
        let mut ctx = context(&config);
        for y in 0..20 {
            ctx.paint(Coord::new(10, y), TileKind::Mountain);
        }
        grow_rivers(&mut ctx).unwrap();
        assert_eq!(ctx.grid.count(TileKind::Mountain), 20);
    }

    #[test]
    fn test_impossible_length_exhausts_budget() {
        let config = GeneratorConfig {
            river_length: CountRange::new(5000, 6000),
            iteration_budget: 200,
            ..GeneratorConfig::default().with_seed("long")
        };
        let mut ctx = context(&config);
        let err = grow_rivers(&mut ctx).unwrap_err();
        assert_eq!(err.stage, Stage::Rivers);
    }

    #[test]
    fn test_limit_width_trims_wide_runs() {
        let config = GeneratorConfig::default().with_seed("width");
        let ctx = context(&config);
        let mut builder = RiverBuilder::new(&ctx, StageRng::seed_from_u64(1));
        for x in 8..15 {
            builder.add(Coord::new(x, 4));
        }
        builder.limit_width((1, 0)).unwrap();
        assert_eq!(builder.cells.len(), MAX_RIVER_WIDTH);
        assert!(builder.cells.contains(&Coord::new(11, 4)));
    }

    #[test]
    fn test_limit_width_keeps_narrow_corridors() {
        let config = GeneratorConfig::default().with_seed("narrow");
        let ctx = context(&config);
        let mut builder = RiverBuilder::new(&ctx, StageRng::seed_from_u64(2));
        // One cell wide column beside a two cell wide column.
        for y in 3..9 {
            builder.add(Coord::new(8, y));
            builder.add(Coord::new(12, y));
            builder.add(Coord::new(13, y));
        }
        builder.limit_width((1, 0)).unwrap();
        assert_eq!(builder.cells.len(), 18);
    }

    #[test]
    fn test_connect_cardinally_bridges_diagonals() {
        let config = GeneratorConfig::default().with_seed("bridge");
        let ctx = context(&config);
        let mut builder = RiverBuilder::new(&ctx, StageRng::seed_from_u64(1));
        builder.add(Coord::new(10, 5));
        builder.add(Coord::new(11, 6));
        builder.add(Coord::new(25, 15));
        builder.connect_cardinally().unwrap();
        assert!(builder.cells.contains(&Coord::new(10, 5)));
        assert!(builder.cells.contains(&Coord::new(11, 6)));
        assert!(!builder.cells.contains(&Coord::new(25, 15)));
        let cells = builder.largest_component().unwrap();
        assert_eq!(cells.len(), 3);
        assert!(is_connected(&cells));
    }

    #[test]
    fn test_requires_grass_edge() {
        let config = GeneratorConfig::default().with_seed("edge");
        let mut ctx = context(&config);
        assert!(ensure_river_sources(&ctx).is_ok());
        let edge: Vec<Coord> = ctx.grid.coords().filter(|&c| ctx.grid.is_edge(c)).collect();
        for c in edge {
            ctx.paint(c, TileKind::Mountain);
        }
        assert!(ensure_river_sources(&ctx).is_err());
    }
}
