//! Mountain growth.
//!
//! Both passes use the same region growth: a breadth-first frontier over
//! 8-connected grass neighbors where each candidate joins with probability
//! `0.7 * (1 - size / target)`, so clusters taper off near their target size.
//! The first pass seeds clusters on the map edge; the second keeps seeding
//! clusters on random grass cells until grass coverage falls below
//! `max_grass_tile_count`.

use rand::Rng;
use std::collections::VecDeque;
use tracing::debug;

use super::budget::BudgetGuard;
use super::context::GenerationContext;
use super::grid::{Coord, TileKind};
use super::seed::StageRng;
use crate::constants::MOUNTAIN_ACCEPT_BASE;
use crate::error::{GenResult, GenerationFailure, Stage};

pub fn grow_mountains(ctx: &mut GenerationContext<'_>) -> GenResult<()> {
    ctx.require_endpoints(Stage::Mountains)?;
    let edge_clusters = grow_edge_mountains(ctx)?;
    ctx.clear_endpoint_zones();
    let capping_clusters = cap_grass(ctx)?;
    ctx.clear_endpoint_zones();
    debug!(
        edge_clusters,
        capping_clusters,
        mountain = ctx.grid.count(TileKind::Mountain),
        grass = ctx.grid.count(TileKind::Grass),
        "mountains grown"
    );
    Ok(())
}

/// First pass: clusters seeded on random edge cells. Returns the cluster count.
pub fn grow_edge_mountains(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let mut rng = ctx.rng();
    let clusters = ctx.config.mountain_cluster_count.sample(&mut rng);
    let mut guard = ctx.budget.guard(Stage::Mountains, "edge mountain seeding");
    let mut frontier_guard = ctx.budget.guard(Stage::Mountains, "mountain frontier");
    let mut grown = 0;

    while grown < clusters {
        guard.tick()?;
        if ctx.grid.count(TileKind::Grass) <= ctx.config.min_grass_tile_count {
            break;
        }
        let start = random_edge_cell(ctx, &mut rng);
        if !accepts(ctx, start) {
            continue;
        }
        let target = ctx.config.mountain_cluster_size.sample(&mut rng);
        grow_region(ctx, start, target, &mut rng, &mut frontier_guard)?;
        grown += 1;
    }
    Ok(grown)
}

/// Second pass: convert grass into mountains until grass drops below the
/// ceiling. Returns the cluster count.
pub fn cap_grass(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let mut rng = ctx.rng();
    let mut guard = ctx.budget.guard(Stage::Mountains, "grass capping");
    let mut frontier_guard = ctx.budget.guard(Stage::Mountains, "mountain frontier");
    let mut grown = 0;

    while ctx.grid.count(TileKind::Grass) >= ctx.config.max_grass_tile_count {
        guard.tick()?;
        let candidates: Vec<Coord> = ctx
            .grid
            .coords()
            .filter(|&c| accepts(ctx, c))
            .collect();
        if candidates.is_empty() {
            return Err(GenerationFailure::new(
                Stage::Mountains,
                "no grass cell left outside the endpoint zones",
            ));
        }
        let start = candidates[rng.gen_range(0..candidates.len())];
        let target = ctx.config.mountain_cluster_size.sample(&mut rng);
        grow_region(ctx, start, target, &mut rng, &mut frontier_guard)?;
        grown += 1;
    }
    Ok(grown)
}

fn accepts(ctx: &GenerationContext<'_>, c: Coord) -> bool {
    ctx.grid.is(c, TileKind::Grass) && !ctx.is_endpoint(c) && !ctx.is_protected(c)
}

fn random_edge_cell(ctx: &GenerationContext<'_>, rng: &mut StageRng) -> Coord {
    let (w, h) = (ctx.grid.width(), ctx.grid.height());
    match rng.gen_range(0..4) {
        0 => Coord::new(rng.gen_range(0..w), 0),
        1 => Coord::new(rng.gen_range(0..w), h - 1),
        2 => Coord::new(0, rng.gen_range(0..h)),
        _ => Coord::new(w - 1, rng.gen_range(0..h)),
    }
}

/// Grow one mountain cluster from `start` and register it as a group.
fn grow_region(
    ctx: &mut GenerationContext<'_>,
    start: Coord,
    target: usize,
    rng: &mut StageRng,
    guard: &mut BudgetGuard,
) -> GenResult<Vec<Coord>> {
    let target = target.max(1);
    ctx.paint(start, TileKind::Mountain);
    let mut members = vec![start];
    let mut queue = VecDeque::from([start]);

    'grow: while let Some(c) = queue.pop_front() {
        guard.tick()?;
        let neighbors: Vec<Coord> = ctx.grid.neighbors8(c).collect();
        for n in neighbors {
            if members.len() >= target {
                break 'grow;
            }
            if !accepts(ctx, n) || ctx.grid.count(TileKind::Grass) <= ctx.config.min_grass_tile_count
            {
                continue;
            }
            let p = MOUNTAIN_ACCEPT_BASE * (1.0 - members.len() as f64 / target as f64);
            if rng.gen::<f64>() < p {
                ctx.paint(n, TileKind::Mountain);
                members.push(n);
                queue.push_back(n);
            }
        }
    }

    ctx.registry.create(TileKind::Mountain, members.iter().copied());
    Ok(members)
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

    #[test]
    fn test_region_growth_stays_within_target() {
        let config = GeneratorConfig::default().with_seed("mtn");
        let mut ctx = context(&config);
        let mut rng = StageRng::seed_from_u64(11);
        let mut guard = ctx.budget.guard(Stage::Mountains, "test");
        let members = grow_region(&mut ctx, Coord::new(15, 3), 12, &mut rng, &mut guard).unwrap();
        assert!(!members.is_empty() && members.len() <= 12);
        assert_eq!(ctx.grid.count(TileKind::Mountain), members.len());
        assert_eq!(ctx.registry.len(), 1);
    }

    #[test]
    fn test_capping_brings_grass_below_ceiling() {
        let config = GeneratorConfig {
            max_grass_tile_count: 400,
            min_grass_tile_count: 100,
            ..GeneratorConfig::default().with_seed("cap")
        };
        let mut ctx = context(&config);
        grow_mountains(&mut ctx).unwrap();
        assert!(ctx.grid.count(TileKind::Grass) < 400 + 50);
        assert!(ctx.grid.count(TileKind::Mountain) > 0);
    }

    #[test]
    fn test_endpoint_zones_stay_grass() {
        let config = GeneratorConfig {
            mountain_cluster_count: CountRange::new(6, 8),
            mountain_cluster_size: CountRange::new(20, 40),
            max_grass_tile_count: 300,
            min_grass_tile_count: 100,
            ..GeneratorConfig::default().with_seed("zones")
        };
        let mut ctx = context(&config);
        grow_mountains(&mut ctx).unwrap();
        let (start, end) = ctx.endpoints.unwrap();
        for c in ctx.grid.coords() {
            if c.chebyshev(start) <= 2 || c.chebyshev(end) <= 2 {
                assert_eq!(ctx.grid.kind(c), TileKind::Grass, "zone cell {c} not grass");
            }
        }
    }

    #[test]
    fn test_every_mountain_cell_is_grouped() {
        let config = GeneratorConfig::default().with_seed("grouped");
        let mut ctx = context(&config);
        grow_mountains(&mut ctx).unwrap();
        for c in ctx.grid.coords_of(TileKind::Mountain) {
            let owner = ctx.registry.owner(c).expect("mountain cell without group");
            assert_eq!(ctx.registry.group(owner).unwrap().kind(), TileKind::Mountain);
        }
    }

    #[test]
    fn test_grass_floor_is_respected() {
        let config = GeneratorConfig {
            min_grass_tile_count: 560,
            max_grass_tile_count: 700,
            mountain_cluster_count: CountRange::new(10, 10),
            mountain_cluster_size: CountRange::new(40, 40),
            ..GeneratorConfig::default().with_seed("floor")
        };
        let mut ctx = context(&config);
        grow_edge_mountains(&mut ctx).unwrap();
        assert!(ctx.grid.count(TileKind::Grass) >= 559);
    }
}
