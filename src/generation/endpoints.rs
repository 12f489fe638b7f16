//! Start/end selection.
//!
//! The start sits at column [`START_COLUMN`] on the middle row. The end is
//! drawn uniformly from every cell at exactly `path_length` Manhattan distance
//! whose horizontal offset is at least `min_horizontal_distance` and whose
//! clear zone lies fully inside the grid.

use rand::Rng;
use tracing::debug;

use super::context::GenerationContext;
use super::grid::Coord;
use crate::constants::{ENDPOINT_CLEAR_RADIUS, START_COLUMN};
use crate::error::{GenResult, GenerationFailure, Stage};

pub fn select_endpoints(ctx: &mut GenerationContext<'_>) -> GenResult<(Coord, Coord)> {
    let start = Coord::new(START_COLUMN, ctx.grid.height() / 2);
    if !ctx.grid.in_bounds(start) {
        return Err(GenerationFailure::new(
            Stage::Endpoints,
            format!("start {start} lies outside the grid"),
        ));
    }

    let candidates = end_candidates(ctx, start);
    if candidates.is_empty() {
        return Err(GenerationFailure::new(
            Stage::Endpoints,
            format!(
                "no end cell at distance {} with horizontal offset >= {}",
                ctx.config.path_length, ctx.config.min_horizontal_distance
            ),
        ));
    }

    let mut rng = ctx.rng();
    let end = candidates[rng.gen_range(0..candidates.len())];
    debug!(%start, %end, candidates = candidates.len(), "endpoints selected");
    ctx.endpoints = Some((start, end));
    Ok((start, end))
}

fn end_candidates(ctx: &GenerationContext<'_>, start: Coord) -> Vec<Coord> {
    let (w, h) = (ctx.grid.width(), ctx.grid.height());
    let r = ENDPOINT_CLEAR_RADIUS;
    ctx.grid
        .coords()
        .filter(|c| c.manhattan(start) == ctx.config.path_length)
        .filter(|c| (c.x - start.x).abs() >= ctx.config.min_horizontal_distance)
        .filter(|c| c.x >= r && c.y >= r && c.x < w - r && c.y < h - r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;

    fn config(path_length: i32, min_h: i32) -> GeneratorConfig {
        GeneratorConfig {
            seed: "abc".into(),
            width: 20,
            height: 20,
            path_length,
            min_horizontal_distance: min_h,
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoints_respect_distance() {
        let config = config(10, 5);
        let mut ctx = GenerationContext::new(&config);
        let (start, end) = select_endpoints(&mut ctx).unwrap();
        assert_eq!(start, Coord::new(1, 10));
        assert_eq!(start.manhattan(end), 10);
        assert!((end.x - start.x).abs() >= 5);
        assert_eq!(ctx.endpoints, Some((start, end)));
    }

    #[test]
    fn test_endpoints_deterministic() {
        let config = config(12, 6);
        let mut a = GenerationContext::new(&config);
        let mut b = GenerationContext::new(&config);
        assert_eq!(select_endpoints(&mut a).unwrap(), select_endpoints(&mut b).unwrap());
    }

    #[test]
    fn test_unreachable_horizontal_distance_fails() {
        let config = config(4, 5);
        let mut ctx = GenerationContext::new(&config);
        let err = select_endpoints(&mut ctx).unwrap_err();
        assert_eq!(err.stage, Stage::Endpoints);
    }

    #[test]
    fn test_path_longer_than_grid_fails() {
        let config = config(60, 5);
        let mut ctx = GenerationContext::new(&config);
        assert!(select_endpoints(&mut ctx).is_err());
    }
}
