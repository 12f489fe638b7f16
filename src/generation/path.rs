//! L-shaped guaranteed corridor between the endpoints.

use tracing::debug;

use super::context::GenerationContext;
use super::grid::{Coord, TileKind};
use crate::error::{GenResult, Stage};

/// Walk from `start` to `end`, resolving x first and then y, painting every
/// visited cell grass and dropping its group ownership. Returns the corridor.
pub fn carve_path(ctx: &mut GenerationContext<'_>) -> GenResult<Vec<Coord>> {
    let (start, end) = ctx.require_endpoints(Stage::PathCarve)?;
    let mut guard = ctx.budget.guard(Stage::PathCarve, "path walk");
    let mut cursor = start;
    let mut corridor = vec![cursor];
    clear(ctx, cursor);

    while cursor != end {
        guard.tick()?;
        cursor = if cursor.x != end.x {
            cursor.offset((end.x - cursor.x).signum(), 0)
        } else {
            cursor.offset(0, (end.y - cursor.y).signum())
        };
        clear(ctx, cursor);
        corridor.push(cursor);
    }

    debug!(cells = corridor.len(), "path carved");
    Ok(corridor)
}

fn clear(ctx: &mut GenerationContext<'_>, c: Coord) {
    ctx.paint(c, TileKind::Grass);
    ctx.registry.release(c);
}
