//! Invariant checks on finished maps.
//!
//! [`verify`] never mutates the map; it reports every violated invariant so
//! tests and the `--verify` flag can show all of them at once.

use serde::Serialize;
use std::collections::HashMap;

use crate::config::GeneratorConfig;
use crate::constants::ENDPOINT_CLEAR_RADIUS;
use crate::error::Stage;
use crate::generation::budget::IterationBudget;
use crate::generation::connectivity::reachable;
use crate::generation::{Coord, Direction, GeneratedMap, GroupId, TileKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum Violation {
    #[error("cell {0} belongs to no group")]
    Ungrouped(Coord),
    #[error("{0} lies outside the grid")]
    OutOfBounds(Coord),
    #[error("cell {cell} belongs to {owners} groups")]
    SharedCell { cell: Coord, owners: usize },
    #[error("group {group:?} of kind {expected:?} holds {cell} of kind {found:?}")]
    GroupKindMismatch {
        group: GroupId,
        cell: Coord,
        expected: TileKind,
        found: TileKind,
    },
    #[error("group {0:?} center is missing or not a member")]
    BadCenter(GroupId),
    #[error("group {0:?} direction does not match its center row")]
    BadDirection(GroupId),
    #[error("{which} endpoint {at} is {found:?}, not grass")]
    EndpointNotGrass {
        which: &'static str,
        at: Coord,
        found: TileKind,
    },
    #[error("endpoint distance {actual}, expected {expected}")]
    PathLength { expected: i32, actual: i32 },
    #[error("horizontal separation {actual} below {min}")]
    HorizontalDistance { min: i32, actual: i32 },
    #[error("{kind:?} at {at} inside an endpoint clear zone")]
    BlockedZone { at: Coord, kind: TileKind },
    #[error("end is not reachable from start over non-mountain cells")]
    Unreachable,
    #[error("{kind:?} count {count} below quota {min}")]
    QuotaUnmet {
        kind: TileKind,
        count: usize,
        min: usize,
    },
}

/// Check a finished map against the invariants every successful run holds.
pub fn verify(map: &GeneratedMap, config: &GeneratorConfig) -> Vec<Violation> {
    let mut out = Vec::new();
    check_partition(map, &mut out);
    check_group_metadata(map, &mut out);
    check_endpoints(map, config, &mut out);
    check_reachability(map, &mut out);
    check_quotas(map, config, &mut out);
    out
}

fn check_partition(map: &GeneratedMap, out: &mut Vec<Violation>) {
    let mut owners: HashMap<Coord, usize> = HashMap::new();
    for group in &map.groups {
        for &c in group.members() {
            let Some(found) = map.grid.get(c) else {
                out.push(Violation::OutOfBounds(c));
                continue;
            };
            *owners.entry(c).or_default() += 1;
            if found != group.kind() {
                out.push(Violation::GroupKindMismatch {
                    group: group.id(),
                    cell: c,
                    expected: group.kind(),
                    found,
                });
            }
        }
    }
    for c in map.grid.coords() {
        match owners.get(&c).copied().unwrap_or(0) {
            0 => out.push(Violation::Ungrouped(c)),
            1 => {}
            n => out.push(Violation::SharedCell { cell: c, owners: n }),
        }
    }
}

fn check_group_metadata(map: &GeneratedMap, out: &mut Vec<Violation>) {
    for group in &map.groups {
        match group.center() {
            Some(center) if group.contains(center) => {
                if group.direction() != Direction::for_row(center.y, map.height) {
                    out.push(Violation::BadDirection(group.id()));
                }
            }
            _ => out.push(Violation::BadCenter(group.id())),
        }
    }
}

fn check_endpoints(map: &GeneratedMap, config: &GeneratorConfig, out: &mut Vec<Violation>) {
    for (which, at) in [("start", map.start), ("end", map.end)] {
        let Some(found) = map.grid.get(at) else {
            out.push(Violation::OutOfBounds(at));
            continue;
        };
        if found != TileKind::Grass {
            out.push(Violation::EndpointNotGrass { which, at, found });
        }
        let r = ENDPOINT_CLEAR_RADIUS;
        for dy in -r..=r {
            for dx in -r..=r {
                let c = at.offset(dx, dy);
                if let Some(kind @ (TileKind::Mountain | TileKind::River)) = map.grid.get(c) {
                    out.push(Violation::BlockedZone { at: c, kind });
                }
            }
        }
    }
    let actual = map.start.manhattan(map.end);
    if actual != config.path_length {
        out.push(Violation::PathLength {
            expected: config.path_length,
            actual,
        });
    }
    let horizontal = (map.end.x - map.start.x).abs();
    if horizontal < config.min_horizontal_distance {
        out.push(Violation::HorizontalDistance {
            min: config.min_horizontal_distance,
            actual: horizontal,
        });
    }
}

fn check_reachability(map: &GeneratedMap, out: &mut Vec<Violation>) {
    // Each cell is visited at most once.
    let mut guard = IterationBudget::new(map.grid.len() + 1).guard(Stage::Connectivity, "verify");
    let reached = reachable(&map.grid, map.start, |k| k != TileKind::Mountain, &mut guard);
    if !reached.is_ok_and(|cells| cells.contains(&map.end)) {
        out.push(Violation::Unreachable);
    }
}

fn check_quotas(map: &GeneratedMap, config: &GeneratorConfig, out: &mut Vec<Violation>) {
    for (kind, min) in [
        (TileKind::Wood, config.min_wood_count),
        (TileKind::Iron, config.min_iron_count),
    ] {
        let count = map.grid.count(kind);
        if count < min {
            out.push(Violation::QuotaUnmet { kind, count, min });
        }
    }
}
