//! Per-run generation state.
//!
//! Everything a run mutates lives here and is passed explicitly to each stage,
//! so independent runs never share state.

use super::budget::IterationBudget;
use super::clusters::ClusterRegistry;
use super::grid::{Coord, Grid, TileKind};
use super::seed::{SeedState, StageRng};
use crate::config::GeneratorConfig;
use crate::constants::ENDPOINT_CLEAR_RADIUS;
use crate::error::{GenResult, GenerationFailure, Stage};

pub struct GenerationContext<'a> {
    pub config: &'a GeneratorConfig,
    pub grid: Grid,
    pub registry: ClusterRegistry,
    pub seed: SeedState,
    pub budget: IterationBudget,
    /// Set by the endpoint stage; `None` before it runs.
    pub endpoints: Option<(Coord, Coord)>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            grid: Grid::new(config.width, config.height),
            registry: ClusterRegistry::new(config.height),
            seed: SeedState::new(&config.seed),
            budget: IterationBudget::new(config.iteration_budget),
            endpoints: None,
        }
    }

    pub fn rng(&mut self) -> StageRng {
        self.seed.fork()
    }

    pub fn is_endpoint(&self, c: Coord) -> bool {
        matches!(self.endpoints, Some((s, e)) if c == s || c == e)
    }

    /// Inside the 5x5 square around either endpoint.
    pub fn is_protected(&self, c: Coord) -> bool {
        match self.endpoints {
            Some((s, e)) => {
                c.chebyshev(s) <= ENDPOINT_CLEAR_RADIUS || c.chebyshev(e) <= ENDPOINT_CLEAR_RADIUS
            }
            None => false,
        }
    }

    /// Change the kind of `c`. Ownership is dropped when the cell no longer
    /// matches the kind of the group that owns it.
    pub fn paint(&mut self, c: Coord, kind: TileKind) {
        if self.grid.set(c, kind).is_none() {
            return;
        }
        if let Some(owner) = self.registry.owner(c) {
            let mismatched = self
                .registry
                .group(owner)
                .map(|g| g.kind() != kind)
                .unwrap_or(true);
            if mismatched {
                self.registry.release(c);
            }
        }
    }

    /// Force the endpoint zones back to grass. Returns how many cells changed.
    pub fn clear_endpoint_zones(&mut self) -> usize {
        let Some((start, end)) = self.endpoints else {
            return 0;
        };
        let mut changed = 0;
        for center in [start, end] {
            for dy in -ENDPOINT_CLEAR_RADIUS..=ENDPOINT_CLEAR_RADIUS {
                for dx in -ENDPOINT_CLEAR_RADIUS..=ENDPOINT_CLEAR_RADIUS {
                    let c = center.offset(dx, dy);
                    if self.grid.get(c).is_some_and(|k| k != TileKind::Grass) {
                        self.paint(c, TileKind::Grass);
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Endpoints, or a failure for stages that need them.
    pub fn require_endpoints(&self, stage: Stage) -> GenResult<(Coord, Coord)> {
        self.endpoints
            .ok_or_else(|| GenerationFailure::new(stage, "endpoints have not been selected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_releases_mismatched_owner() {
        let config = GeneratorConfig::default().with_seed("ctx");
        let mut ctx = GenerationContext::new(&config);
        let c = Coord::new(4, 4);
        ctx.paint(c, TileKind::Mountain);
        let id = ctx.registry.create(TileKind::Mountain, vec![c]).unwrap();
        ctx.paint(c, TileKind::Mountain);
        assert_eq!(ctx.registry.owner(c), Some(id));
        ctx.paint(c, TileKind::Grass);
        assert_eq!(ctx.registry.owner(c), None);
    }

    #[test]
    fn test_clear_endpoint_zones() {
        let config = GeneratorConfig::default().with_seed("ctx");
        let mut ctx = GenerationContext::new(&config);
        let start = Coord::new(1, 10);
        let end = Coord::new(20, 10);
        ctx.endpoints = Some((start, end));
        ctx.paint(Coord::new(3, 12), TileKind::Mountain);
        ctx.paint(Coord::new(22, 8), TileKind::River);
        ctx.paint(Coord::new(23, 10), TileKind::River);
        assert_eq!(ctx.clear_endpoint_zones(), 2);
        assert!(ctx.grid.is(Coord::new(23, 10), TileKind::River));
        assert!(ctx.is_protected(Coord::new(0, 8)));
        assert!(!ctx.is_protected(Coord::new(4, 10)));
    }
}
