//! Wood and iron placement.
//!
//! Resources are non-holey clusters. The placer seeds them on random grass
//! cells; the repair pass converts mountain clusters bordering walkable
//! terrain until both quotas are met.

use rand::Rng;
use std::collections::BTreeSet;
use tracing::debug;

use super::budget::BudgetGuard;
use super::context::GenerationContext;
use super::grid::{Coord, TileKind};
use super::growth::ClusterGrowth;
use super::seed::StageRng;
use crate::error::{GenResult, GenerationFailure, Stage};

/// Resource kind still below quota, wood first.
pub fn shortfall(ctx: &GenerationContext<'_>) -> Option<TileKind> {
    if ctx.grid.count(TileKind::Wood) < ctx.config.min_wood_count {
        Some(TileKind::Wood)
    } else if ctx.grid.count(TileKind::Iron) < ctx.config.min_iron_count {
        Some(TileKind::Iron)
    } else {
        None
    }
}

/// Seed resource clusters on random grass cells. Returns the number placed.
pub fn place_resources(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let mut rng = ctx.rng();
    let mut guard = ctx.budget.guard(Stage::Resources, "resource attempts");
    let mut growth_guard = ctx.budget.guard(Stage::Resources, "resource growth");
    let target = ctx.config.min_destructible_cluster_size;
    let mut prefer_wood = true;
    let mut placed = 0;

    for _ in 0..ctx.config.resource_attempts {
        guard.tick()?;
        let wood_short = ctx.grid.count(TileKind::Wood) < ctx.config.min_wood_count;
        let iron_short = ctx.grid.count(TileKind::Iron) < ctx.config.min_iron_count;
        let kind = match (wood_short, iron_short) {
            (true, true) if prefer_wood => TileKind::Wood,
            (true, true) => TileKind::Iron,
            (true, false) => TileKind::Wood,
            (false, true) => TileKind::Iron,
            (false, false) => break,
        };

        let cluster = {
            let view: &GenerationContext<'_> = ctx;
            let starts: Vec<Coord> = view
                .grid
                .coords()
                .filter(|&c| view.grid.is(c, TileKind::Grass) && !view.is_protected(c))
                .collect();
            if starts.is_empty() {
                break;
            }
            let start = starts[rng.gen_range(0..starts.len())];
            let growth = ClusterGrowth {
                grid: &view.grid,
                traverse: |c: Coord| view.grid.is(c, TileKind::Grass) && !view.is_protected(c),
                include: |_c: Coord| true,
                protected: |c: Coord| view.is_protected(c),
            };
            growth.grow(start, target, &mut rng, &mut growth_guard)?
        };

        let Some(cluster) = cluster.filter(|c| c.len() >= target) else {
            continue;
        };
        commit(ctx, kind, cluster);
        prefer_wood = !prefer_wood;
        placed += 1;
    }

    debug!(
        placed,
        wood = ctx.grid.count(TileKind::Wood),
        iron = ctx.grid.count(TileKind::Iron),
        "resources placed"
    );
    Ok(placed)
}

/// Convert mountain clusters next to walkable terrain into whichever resource
/// is short, until both quotas hold. Fails when no candidate is left.
pub fn ensure_minimum_resources(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let mut rng = ctx.rng();
    let mut guard = ctx.budget.guard(Stage::Resources, "resource repair");
    let mut growth_guard = ctx.budget.guard(Stage::Resources, "resource repair growth");
    let mut converted = 0;

    while let Some(kind) = shortfall(ctx) {
        guard.tick()?;
        let cluster = repair_cluster(ctx, kind, &mut rng, &mut growth_guard)?;
        if let Some(cluster) = cluster {
            commit(ctx, kind, cluster);
            converted += 1;
        }
    }
    if converted > 0 {
        debug!(converted, "resource quotas repaired from mountains");
    }
    Ok(converted)
}

fn repair_cluster(
    ctx: &GenerationContext<'_>,
    kind: TileKind,
    rng: &mut StageRng,
    guard: &mut BudgetGuard,
) -> GenResult<Option<BTreeSet<Coord>>> {
    let candidates: Vec<Coord> = ctx
        .grid
        .coords()
        .filter(|&c| ctx.grid.is(c, TileKind::Mountain) && !ctx.is_protected(c))
        .filter(|&c| ctx.grid.neighbors4(c).any(|n| ctx.grid.kind(n).is_walkable()))
        .collect();
    if candidates.is_empty() {
        return Err(GenerationFailure::new(
            Stage::Resources,
            format!(
                "{kind:?} below quota and no mountain borders walkable terrain (wood {}/{}, iron {}/{})",
                ctx.grid.count(TileKind::Wood),
                ctx.config.min_wood_count,
                ctx.grid.count(TileKind::Iron),
                ctx.config.min_iron_count
            ),
        ));
    }
    let start = candidates[rng.gen_range(0..candidates.len())];
    let growth = ClusterGrowth {
        grid: &ctx.grid,
        traverse: |c: Coord| ctx.grid.is(c, TileKind::Mountain) && !ctx.is_protected(c),
        include: |_c: Coord| true,
        protected: |c: Coord| ctx.is_protected(c),
    };
    growth.grow(start, ctx.config.min_destructible_cluster_size, rng, guard)
}

/// Final quota check once every terrain stage has run.
pub fn verify_quotas(ctx: &GenerationContext<'_>) -> GenResult<()> {
    match shortfall(ctx) {
        None => Ok(()),
        Some(kind) => Err(GenerationFailure::new(
            Stage::Resources,
            format!("{kind:?} count below quota after repairs"),
        )),
    }
}

fn commit(ctx: &mut GenerationContext<'_>, kind: TileKind, cluster: BTreeSet<Coord>) {
    for &c in &cluster {
        ctx.paint(c, kind);
    }
    ctx.registry.create(kind, cluster);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::generation::growth::enclosed_cells;

    fn context(config: &GeneratorConfig) -> GenerationContext<'_> {
        let mut ctx = GenerationContext::new(config);
        ctx.endpoints = Some((Coord::new(1, 10), Coord::new(20, 10)));
        ctx
    }

    #[test]
    fn test_placer_meets_quotas_on_open_map() {
        let config = GeneratorConfig::default().with_seed("res");
        let mut ctx = context(&config);
        let placed = place_resources(&mut ctx).unwrap();
        assert!(placed > 0);
        assert!(shortfall(&ctx).is_none());
    }

    #[test]
    fn test_resource_groups_have_no_holes() {
        let config = GeneratorConfig {
            min_destructible_cluster_size: 9,
            ..GeneratorConfig::default().with_seed("holes")
        };
        let mut ctx = context(&config);
        place_resources(&mut ctx).unwrap();
        for group in ctx.registry.groups() {
            assert!(group.kind().is_resource());
            assert!(enclosed_cells(group.members()).is_empty());
            assert!(group.len() >= 9);
        }
    }

    #[test]
    fn test_resources_avoid_endpoint_zones() {
        let config = GeneratorConfig {
            min_wood_count: 60,
            min_iron_count: 60,
            resource_attempts: 200,
            ..GeneratorConfig::default().with_seed("zone")
        };
        let mut ctx = context(&config);
        place_resources(&mut ctx).unwrap();
        for c in ctx.grid.coords() {
            if ctx.is_protected(c) {
                assert_eq!(ctx.grid.kind(c), TileKind::Grass);
            }
        }
    }

    #[test]
    fn test_repair_converts_bordering_mountains() {
        let config = GeneratorConfig::default().with_seed("repair");
        let mut ctx = context(&config);
        for y in 0..20 {
            for x in 26..32 {
                ctx.paint(Coord::new(x, y), TileKind::Mountain);
            }
        }
        let converted = ensure_minimum_resources(&mut ctx).unwrap();
        assert!(converted > 0);
        assert!(verify_quotas(&ctx).is_ok());
        for c in ctx.grid.coords() {
            if ctx.grid.kind(c).is_resource() {
                assert!(c.x >= 26, "resource outside converted mountain at {c}");
            }
        }
    }

    #[test]
    fn test_repair_without_mountains_fails() {
        let config = GeneratorConfig::default().with_seed("bare");
        let mut ctx = context(&config);
        let err = ensure_minimum_resources(&mut ctx).unwrap_err();
        assert_eq!(err.stage, Stage::Resources);
        assert!(verify_quotas(&ctx).is_err());
    }
}
