//! Final partition of the grid into cluster groups.
//!
//! Terrain stages already registered their mountain, river and resource
//! clusters. What is left is the open grass, which is flood-filled into
//! groups with large areas split into smaller parts, and a catch-all pass
//! that groups every remaining cell with its same-kind neighbors.

use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

use super::budget::BudgetGuard;
use super::context::GenerationContext;
use super::grid::{Coord, TileKind, CARDINAL};
use super::growth::flood_fill;
use crate::constants::{GRASS_SPLIT_PART_SIZE, GRASS_SPLIT_THRESHOLD};
use crate::error::{GenResult, GenerationFailure, Stage};

/// Group every unowned cell. Afterwards each cell has exactly one owner.
pub fn build_groups(ctx: &mut GenerationContext<'_>) -> GenResult<()> {
    let grass_groups = group_grass(ctx)?;
    let stragglers = group_remaining(ctx)?;

    let cells = ctx.grid.len();
    if ctx.registry.owned_count() != cells {
        return Err(GenerationFailure::new(
            Stage::Grouping,
            format!(
                "{} of {cells} cells left without a group",
                cells - ctx.registry.owned_count()
            ),
        ));
    }
    debug!(
        grass_groups,
        stragglers,
        groups = ctx.registry.len(),
        "cluster groups built"
    );
    Ok(())
}

/// Flood-fill unowned grass into groups, splitting large areas.
/// Returns how many groups were created.
pub fn group_grass(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let mut guard = ctx.budget.guard(Stage::Grouping, "grass flood fill");
    let mut created = 0;
    for c in ctx.grid.coords().collect::<Vec<_>>() {
        if !ctx.grid.is(c, TileKind::Grass) || ctx.registry.is_owned(c) {
            continue;
        }
        let area = unowned_component(ctx, c, TileKind::Grass, &mut guard)?;
        if area.len() >= GRASS_SPLIT_THRESHOLD {
            for part in split_area(area, &mut guard)? {
                ctx.registry.create(TileKind::Grass, part);
                created += 1;
            }
        } else if ctx.registry.create(TileKind::Grass, area).is_some() {
            created += 1;
        }
    }
    Ok(created)
}

/// Group any cell still without an owner together with its unowned
/// same-kind neighbors. Returns how many groups were created.
pub fn group_remaining(ctx: &mut GenerationContext<'_>) -> GenResult<usize> {
    let mut guard = ctx.budget.guard(Stage::Grouping, "catch-all flood fill");
    let mut created = 0;
    for c in ctx.grid.coords().collect::<Vec<_>>() {
        if ctx.registry.is_owned(c) {
            continue;
        }
        let kind = ctx.grid.kind(c);
        let cells = unowned_component(ctx, c, kind, &mut guard)?;
        if ctx.registry.create(kind, cells).is_some() {
            created += 1;
        }
    }
    Ok(created)
}

fn unowned_component(
    ctx: &GenerationContext<'_>,
    start: Coord,
    kind: TileKind,
    guard: &mut BudgetGuard,
) -> GenResult<Vec<Coord>> {
    flood_fill(
        start,
        |c| ctx.grid.is(c, kind) && !ctx.registry.is_owned(c),
        guard,
    )
}

/// Split `area` into `ceil(len / GRASS_SPLIT_PART_SIZE)` parts grown by BFS
/// from the lowest remaining cell. Cells no part reached end up in extra
/// parts, one per connected leftover piece.
pub fn split_area(area: Vec<Coord>, guard: &mut BudgetGuard) -> GenResult<Vec<Vec<Coord>>> {
    let parts = area.len().div_ceil(GRASS_SPLIT_PART_SIZE).max(1);
    let share = area.len().div_ceil(parts);
    let mut pool: BTreeSet<Coord> = area.into_iter().collect();
    let mut out = Vec::with_capacity(parts);

    while out.len() < parts {
        let Some(&seed) = pool.iter().next() else {
            break;
        };
        out.push(take_connected(&mut pool, seed, share, guard)?);
    }
    while let Some(&seed) = pool.iter().next() {
        out.push(take_connected(&mut pool, seed, usize::MAX, guard)?);
    }
    Ok(out)
}

/// Remove up to `limit` cells connected to `seed` from `pool`, in BFS order.
fn take_connected(
    pool: &mut BTreeSet<Coord>,
    seed: Coord,
    limit: usize,
    guard: &mut BudgetGuard,
) -> GenResult<Vec<Coord>> {
    pool.remove(&seed);
    let mut part = vec![seed];
    let mut queue = VecDeque::from([seed]);
    'grow: while let Some(c) = queue.pop_front() {
        guard.tick()?;
        for (dx, dy) in CARDINAL {
            if part.len() >= limit {
                break 'grow;
            }
            let n = c.offset(dx, dy);
            if pool.remove(&n) {
                part.push(n);
                queue.push_back(n);
            }
        }
    }
    Ok(part)
}
