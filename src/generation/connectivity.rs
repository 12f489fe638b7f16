//! Reachability and path repair.
//!
//! Runs after every terrain stage. Unreachable pockets are sealed as
//! mountain, mountains on the cheapest start-to-end route are cleared, a wood
//! cell is made reachable and river crossings on the route are thinned out.
//! Cheapest routes come from a `petgraph` grid graph searched with A* under a
//! zero heuristic, which is plain Dijkstra.

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::debug;

use super::budget::BudgetGuard;
use super::context::GenerationContext;
use super::grid::{Coord, Grid, TileKind};
use super::growth::flood_fill;
use super::resources;
use crate::constants::{MAX_PATH_RIVER_CELLS, MIN_REACHABLE_WOOD};
use crate::error::{GenResult, GenerationFailure, Stage};

/// Run every repair in order and check the result.
pub fn enforce_connectivity(ctx: &mut GenerationContext<'_>) -> GenResult<()> {
    let (start, end) = ctx.require_endpoints(Stage::Connectivity)?;
    let sealed = seal_unreachable(ctx)?;
    let opened = repair_path(ctx)?;
    ctx.clear_endpoint_zones();
    let converted = resources::ensure_minimum_resources(ctx)?;
    let corridor = ensure_wood_access(ctx)?;
    let drained = minimize_river_crossings(ctx)?;

    let mut guard = ctx.budget.guard(Stage::Connectivity, "final reachability");
    let reached = reachable(&ctx.grid, start, |k| k != TileKind::Mountain, &mut guard)?;
    if !reached.contains(&end) {
        return Err(GenerationFailure::new(
            Stage::Connectivity,
            format!("end {end} unreachable from start {start} after repair"),
        ));
    }
    resources::verify_quotas(ctx)?;

    debug!(
        sealed,
        opened,
        converted,
        wood_corridor = corridor,
        drained,
        "connectivity enforced"
    );
    Ok(())
}

/// Cells reachable from `from` over 4-connected cells whose kind passes.
pub fn reachable(
    grid: &Grid,
    from: Coord,
    passable: impl Fn(TileKind) -> bool,
    guard: &mut BudgetGuard,
) -> GenResult<HashSet<Coord>> {
    let cells = flood_fill(from, |c| grid.get(c).is_some_and(&passable), guard)?;
    Ok(cells.into_iter().collect())
}

/// Cheapest 4-connected route from `from` to `to`. `cost` prices stepping
/// onto a cell of the given kind; `None` makes the kind impassable.
pub fn cheapest_path(
    grid: &Grid,
    from: Coord,
    to: Coord,
    cost: impl Fn(TileKind) -> Option<u32>,
    guard: &mut BudgetGuard,
) -> GenResult<Option<(u32, Vec<Coord>)>> {
    if !grid.in_bounds(from) || !grid.in_bounds(to) {
        return Ok(None);
    }
    let width = grid.width();
    let index = |c: Coord| NodeIndex::new((c.y * width + c.x) as usize);

    let mut graph: DiGraph<Coord, u32> = DiGraph::with_capacity(grid.len(), grid.len() * 4);
    for c in grid.coords() {
        guard.tick()?;
        graph.add_node(c);
    }
    for c in grid.coords() {
        guard.tick()?;
        if cost(grid.kind(c)).is_none() {
            continue;
        }
        for n in grid.neighbors4(c) {
            if let Some(weight) = cost(grid.kind(n)) {
                graph.add_edge(index(c), index(n), weight);
            }
        }
    }

    let goal = index(to);
    let found = astar(&graph, index(from), |n| n == goal, |e| *e.weight(), |_| 0);
    Ok(found.map(|(total, nodes)| (total, nodes.into_iter().map(|n| graph[n]).collect())))
}

/// Turn every cell the start cannot reach over non-mountain terrain into
/// mountain. Returns how many cells were sealed.
pub fn seal_unreachable(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let (start, _) = ctx.require_endpoints(Stage::Connectivity)?;
    let mut guard = ctx.budget.guard(Stage::Connectivity, "reachability sweep");
    let reached = reachable(&ctx.grid, start, |k| k != TileKind::Mountain, &mut guard)?;
    let pockets: Vec<Coord> = ctx
        .grid
        .coords()
        .filter(|c| !ctx.grid.is(*c, TileKind::Mountain) && !reached.contains(c))
        .collect();
    for &c in &pockets {
        ctx.paint(c, TileKind::Mountain);
    }
    Ok(pockets.len())
}

/// Clear the mountains on the route that crosses the fewest of them.
/// Returns how many cells were opened.
pub fn repair_path(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let (start, end) = ctx.require_endpoints(Stage::Connectivity)?;
    let mut guard = ctx.budget.guard(Stage::Connectivity, "path repair graph");
    let mountain_cost = |k: TileKind| Some(u32::from(k == TileKind::Mountain));
    let Some((_, route)) = cheapest_path(&ctx.grid, start, end, mountain_cost, &mut guard)? else {
        return Err(GenerationFailure::new(
            Stage::Connectivity,
            format!("no route between {start} and {end}"),
        ));
    };
    let blocked: Vec<Coord> = route
        .into_iter()
        .filter(|&c| ctx.grid.is(c, TileKind::Mountain))
        .collect();
    for &c in &blocked {
        ctx.paint(c, TileKind::Grass);
    }
    Ok(blocked.len())
}

/// Make sure a wood cell is reachable from the start without crossing
/// mountain or river. When none is, carve an L-shaped corridor to the wood
/// cell closest to the start. Returns whether a corridor was carved.
pub fn ensure_wood_access(ctx: &mut GenerationContext<'_>) -> GenResult<bool> {
    let (start, _) = ctx.require_endpoints(Stage::Connectivity)?;
    let mut guard = ctx.budget.guard(Stage::Connectivity, "wood search");
    let reached = reachable(&ctx.grid, start, dry_land, &mut guard)?;
    if reached.iter().any(|&c| ctx.grid.is(c, TileKind::Wood)) {
        return Ok(false);
    }

    let Some(target) = ctx
        .grid
        .coords_of(TileKind::Wood)
        .into_iter()
        .min_by_key(|&c| (c.manhattan(start), c))
    else {
        return Err(GenerationFailure::new(
            Stage::Connectivity,
            "no wood cell on the map",
        ));
    };

    let mut walk = ctx.budget.guard(Stage::Connectivity, "wood corridor");
    let mut cursor = start;
    while cursor != target {
        walk.tick()?;
        if matches!(ctx.grid.kind(cursor), TileKind::Mountain | TileKind::River) {
            ctx.paint(cursor, TileKind::Grass);
        }
        cursor = if cursor.x != target.x {
            cursor.offset((target.x - cursor.x).signum(), 0)
        } else {
            cursor.offset(0, (target.y - cursor.y).signum())
        };
    }
    debug!(%target, "carved corridor to wood");
    Ok(true)
}

/// When every dry route between the endpoints is blocked, drain river cells
/// on the route with the fewest crossings until at most
/// `MAX_PATH_RIVER_CELLS` remain. Drained cells become wood instead of grass
/// when reachable wood would otherwise drop below `MIN_REACHABLE_WOOD`.
/// Returns how many river cells were drained.
pub fn minimize_river_crossings(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let (start, end) = ctx.require_endpoints(Stage::Connectivity)?;
    let mut guard = ctx.budget.guard(Stage::Connectivity, "dry route search");
    if reachable(&ctx.grid, start, TileKind::is_walkable, &mut guard)?.contains(&end) {
        return Ok(0);
    }

    let mut graph_guard = ctx.budget.guard(Stage::Connectivity, "river route graph");
    let river_cost = |k: TileKind| match k {
        TileKind::Mountain => None,
        TileKind::River => Some(1),
        _ => Some(0),
    };
    let Some((_, route)) = cheapest_path(&ctx.grid, start, end, river_cost, &mut graph_guard)?
    else {
        return Err(GenerationFailure::new(
            Stage::Connectivity,
            format!("no route between {start} and {end} avoiding mountains"),
        ));
    };

    let mut crossings: Vec<Coord> = route
        .into_iter()
        .filter(|&c| ctx.grid.is(c, TileKind::River))
        .collect();
    let mut rng = ctx.rng();
    crossings.shuffle(&mut rng);

    let mut drained = Vec::new();
    while crossings.len() > MAX_PATH_RIVER_CELLS {
        if let Some(c) = crossings.pop() {
            ctx.paint(c, TileKind::Grass);
            drained.push(c);
        }
    }

    let mut wood_guard = ctx.budget.guard(Stage::Connectivity, "reachable wood");
    let wood = reachable(&ctx.grid, start, dry_land, &mut wood_guard)?
        .into_iter()
        .filter(|&c| ctx.grid.is(c, TileKind::Wood))
        .count();
    if wood < MIN_REACHABLE_WOOD {
        for &c in &drained {
            ctx.paint(c, TileKind::Wood);
        }
        debug!(cells = drained.len(), wood, "drained river cells turned to wood");
    }
    Ok(drained.len())
}

fn dry_land(kind: TileKind) -> bool {
    !matches!(kind, TileKind::Mountain | TileKind::River)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::generation::budget::IterationBudget;

    fn context(config: &GeneratorConfig) -> GenerationContext<'_> {
        let mut ctx = GenerationContext::new(config);
        ctx.endpoints = Some((Coord::new(1, 10), Coord::new(20, 10)));
        ctx
    }

    fn wall(ctx: &mut GenerationContext<'_>, x: i32, kind: TileKind) {
        for y in 0..ctx.grid.height() {
            ctx.paint(Coord::new(x, y), kind);
        }
    }

    #[test]
    fn test_cheapest_path_counts_mountains() {
        let mut grid = Grid::new(8, 3);
        for y in 0..3 {
            grid.set(Coord::new(4, y), TileKind::Mountain);
        }
        grid.set(Coord::new(5, 0), TileKind::Mountain);
        let mut guard = IterationBudget::new(1_000).guard(Stage::Connectivity, "test");
        let (cost, route) = cheapest_path(
            &grid,
            Coord::new(0, 1),
            Coord::new(7, 1),
            |k| Some(u32::from(k == TileKind::Mountain)),
            &mut guard,
        )
        .unwrap()
        .unwrap();
        assert_eq!(cost, 1);
        assert_eq!(route.first(), Some(&Coord::new(0, 1)));
        assert_eq!(route.last(), Some(&Coord::new(7, 1)));
        for pair in route.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1);
        }
    }

    #[test]
    fn test_cheapest_path_respects_impassable() {
        let mut grid = Grid::new(5, 3);
        for y in 0..3 {
            grid.set(Coord::new(2, y), TileKind::Mountain);
        }
        let mut guard = IterationBudget::new(1_000).guard(Stage::Connectivity, "test");
        let found = cheapest_path(
            &grid,
            Coord::new(0, 0),
            Coord::new(4, 0),
            |k| (k != TileKind::Mountain).then_some(0),
            &mut guard,
        )
        .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_graph_construction_uses_budget() {
        let grid = Grid::new(40, 40);
        let mut guard = IterationBudget::new(100).guard(Stage::Connectivity, "test");
        let err = cheapest_path(&grid, Coord::new(0, 0), Coord::new(39, 39), |_| Some(0), &mut guard)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Connectivity);
    }

    #[test]
    fn test_sealing_fills_pockets() {
        let config = GeneratorConfig::default().with_seed("seal");
        let mut ctx = context(&config);
        for c in [(9, 0), (10, 1), (11, 0)] {
            ctx.paint(Coord::new(c.0, c.1), TileKind::Mountain);
        }
        let sealed = seal_unreachable(&mut ctx).unwrap();
        assert_eq!(sealed, 1);
        assert!(ctx.grid.is(Coord::new(10, 0), TileKind::Mountain));
    }

    #[test]
    fn test_repair_opens_single_gap() {
        let config = GeneratorConfig::default().with_seed("wall");
        let mut ctx = context(&config);
        wall(&mut ctx, 10, TileKind::Mountain);
        wall(&mut ctx, 11, TileKind::Mountain);
        let opened = repair_path(&mut ctx).unwrap();
        assert_eq!(opened, 2);
        let mut guard = ctx.budget.guard(Stage::Connectivity, "check");
        let reached =
            reachable(&ctx.grid, Coord::new(1, 10), |k| k != TileKind::Mountain, &mut guard).unwrap();
        assert!(reached.contains(&Coord::new(20, 10)));
    }

    #[test]
    fn test_wood_corridor_through_river() {
        let config = GeneratorConfig::default().with_seed("wood");
        let mut ctx = context(&config);
        wall(&mut ctx, 6, TileKind::River);
        ctx.paint(Coord::new(8, 10), TileKind::Wood);
        assert!(ensure_wood_access(&mut ctx).unwrap());
        assert!(ctx.grid.is(Coord::new(6, 10), TileKind::Grass));
        assert!(ctx.grid.is(Coord::new(8, 10), TileKind::Wood));
        assert!(!ensure_wood_access(&mut ctx).unwrap());
    }

    #[test]
    fn test_wood_access_without_wood_fails() {
        let config = GeneratorConfig::default().with_seed("nowood");
        let mut ctx = context(&config);
        assert!(ensure_wood_access(&mut ctx).is_err());
    }

    #[test]
    fn test_wide_river_is_drained_to_limit() {
        let config = GeneratorConfig::default().with_seed("river");
        let mut ctx = context(&config);
        for x in 8..14 {
            wall(&mut ctx, x, TileKind::River);
        }
        for c in [(3, 3), (3, 4), (4, 3)] {
            ctx.paint(Coord::new(c.0, c.1), TileKind::Wood);
        }
        let drained = minimize_river_crossings(&mut ctx).unwrap();
        assert_eq!(drained, 6 - MAX_PATH_RIVER_CELLS);
        assert_eq!(ctx.grid.count(TileKind::River), 6 * 20 - drained);
        assert_eq!(ctx.grid.count(TileKind::Wood), 3);
    }

    #[test]
    fn test_drained_cells_become_wood_when_wood_is_scarce() {
        let config = GeneratorConfig::default().with_seed("scarce");
        let mut ctx = context(&config);
        for x in 8..14 {
            wall(&mut ctx, x, TileKind::River);
        }
        let drained = minimize_river_crossings(&mut ctx).unwrap();
        assert_eq!(ctx.grid.count(TileKind::Wood), drained);
    }

    #[test]
    fn test_dry_route_needs_no_draining() {
        let config = GeneratorConfig::default().with_seed("dry");
        let mut ctx = context(&config);
        for y in 0..19 {
            ctx.paint(Coord::new(10, y), TileKind::River);
        }
        assert_eq!(minimize_river_crossings(&mut ctx).unwrap(), 0);
    }
}
