//! Shared growth primitives: flood fill, non-holey cluster growth and hole
//! detection.

use rand::Rng;
use std::collections::{BTreeSet, HashSet, VecDeque};

use super::budget::BudgetGuard;
use super::grid::{Coord, Grid, CARDINAL};
use crate::error::GenResult;

/// 4-connected flood fill from `start` over cells accepted by `passable`.
/// Cells come back in visit order; `start` is included only if passable.
pub fn flood_fill(
    start: Coord,
    passable: impl Fn(Coord) -> bool,
    guard: &mut BudgetGuard,
) -> GenResult<Vec<Coord>> {
    if !passable(start) {
        return Ok(Vec::new());
    }
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut out = Vec::new();
    while let Some(c) = queue.pop_front() {
        guard.tick()?;
        out.push(c);
        for (dx, dy) in CARDINAL {
            let n = c.offset(dx, dy);
            if !seen.contains(&n) && passable(n) {
                seen.insert(n);
                queue.push_back(n);
            }
        }
    }
    Ok(out)
}

/// Non-member cells fully enclosed by `members`.
///
/// Floods the complement of the cluster from the border of its bounding box
/// (padded by one cell); whatever the flood cannot reach is a hole.
pub fn enclosed_cells(members: &BTreeSet<Coord>) -> Vec<Coord> {
    let Some(first) = members.iter().next() else {
        return Vec::new();
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for c in members {
        min_x = min_x.min(c.x);
        max_x = max_x.max(c.x);
        min_y = min_y.min(c.y);
        max_y = max_y.max(c.y);
    }
    let (x0, y0) = (min_x - 1, min_y - 1);
    let w = (max_x - min_x + 3) as usize;
    let h = (max_y - min_y + 3) as usize;
    let index = |c: Coord| (c.y - y0) as usize * w + (c.x - x0) as usize;
    let inside = |c: Coord| c.x >= x0 && c.y >= y0 && c.x < x0 + w as i32 && c.y < y0 + h as i32;

    let mut reached = vec![false; w * h];
    let mut queue = VecDeque::new();
    // Top-left corner is padding and therefore never a member; every other
    // padding cell is connected to it along the border.
    let corner = Coord::new(x0, y0);
    reached[index(corner)] = true;
    queue.push_back(corner);
    while let Some(c) = queue.pop_front() {
        for (dx, dy) in CARDINAL {
            let n = c.offset(dx, dy);
            if inside(n) && !reached[index(n)] && !members.contains(&n) {
                reached[index(n)] = true;
                queue.push_back(n);
            }
        }
    }

    let mut holes = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let c = Coord::new(x, y);
            if !members.contains(&c) && !reached[index(c)] {
                holes.push(c);
            }
        }
    }
    holes
}

/// Frontier growth that yields simply-connected clusters.
///
/// `traverse` gates what the frontier may walk through, `include` what may
/// join the cluster. Cells enclosed by the result are folded in; if one of
/// them is `protected` the cluster is rejected.
pub struct ClusterGrowth<'g, T, I, P> {
    pub grid: &'g Grid,
    pub traverse: T,
    pub include: I,
    pub protected: P,
}

impl<T, I, P> ClusterGrowth<'_, T, I, P>
where
    T: Fn(Coord) -> bool,
    I: Fn(Coord) -> bool,
    P: Fn(Coord) -> bool,
{
    pub fn grow<R: Rng>(
        &self,
        start: Coord,
        target: usize,
        rng: &mut R,
        guard: &mut BudgetGuard,
    ) -> GenResult<Option<BTreeSet<Coord>>> {
        if !self.grid.in_bounds(start) || !(self.traverse)(start) {
            return Ok(None);
        }
        let mut members = BTreeSet::new();
        let mut frontier = vec![start];
        let mut seen = HashSet::from([start]);

        while members.len() < target && !frontier.is_empty() {
            guard.tick()?;
            let c = frontier.swap_remove(rng.gen_range(0..frontier.len()));
            if !(self.traverse)(c) || !(self.include)(c) {
                continue;
            }
            members.insert(c);
            for n in self.grid.neighbors4(c) {
                if seen.insert(n) && (self.traverse)(n) {
                    frontier.push(n);
                }
            }
        }

        if members.is_empty() {
            return Ok(None);
        }
        let holes = enclosed_cells(&members);
        if holes.iter().any(|&h| (self.protected)(h)) {
            return Ok(None);
        }
        members.extend(holes);
        Ok(Some(members))
    }
}
