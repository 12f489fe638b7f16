//! Cluster groups and the tile→group ownership index.
//!
//! A coordinate belongs to at most one group. Moving a coordinate into a
//! group removes it from its previous owner; every group whose membership
//! changes gets its center and direction recomputed, and emptied groups are
//! dropped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::grid::{Coord, TileKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Which vertical half of the map a group's center lies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Upper,
    Under,
}

impl Direction {
    pub fn for_row(y: i32, map_height: i32) -> Self {
        // y < height / 2 without losing the half on odd heights
        if 2 * y < map_height {
            Direction::Upper
        } else {
            Direction::Under
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterGroup {
    id: GroupId,
    kind: TileKind,
    members: BTreeSet<Coord>,
    center: Option<Coord>,
    direction: Direction,
}

impl ClusterGroup {
    fn new(id: GroupId, kind: TileKind) -> Self {
        Self {
            id,
            kind,
            members: BTreeSet::new(),
            center: None,
            direction: Direction::Upper,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Terrain family the group was created for.
    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn members(&self) -> &BTreeSet<Coord> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, c: Coord) -> bool {
        self.members.contains(&c)
    }

    /// Member whose row is closest to the middle of the group's row span.
    pub fn center(&self) -> Option<Coord> {
        self.center
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn recompute(&mut self, map_height: i32) {
        let Some(first) = self.members.iter().next() else {
            self.center = None;
            self.direction = Direction::Upper;
            return;
        };
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for c in &self.members {
            min_x = min_x.min(c.x);
            max_x = max_x.max(c.x);
            min_y = min_y.min(c.y);
            max_y = max_y.max(c.y);
        }
        // Doubled coordinates keep the midpoint integral.
        let mid_y2 = min_y + max_y;
        let mid_x2 = min_x + max_x;
        self.center = self
            .members
            .iter()
            .min_by_key(|c| ((2 * c.y - mid_y2).abs(), (2 * c.x - mid_x2).abs()))
            .copied();
        if let Some(center) = self.center {
            self.direction = Direction::for_row(center.y, map_height);
        }
    }
}

/// Owns every group of a run plus the coordinate→owner index.
#[derive(Debug, Clone)]
pub struct ClusterRegistry {
    map_height: i32,
    next_id: u32,
    groups: BTreeMap<GroupId, ClusterGroup>,
    owners: HashMap<Coord, GroupId>,
}

impl ClusterRegistry {
    pub fn new(map_height: i32) -> Self {
        Self {
            map_height,
            next_id: 0,
            groups: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Create a group of `kind` from `cells`, taking them from previous owners.
    /// Returns `None` when `cells` is empty.
    pub fn create(
        &mut self,
        kind: TileKind,
        cells: impl IntoIterator<Item = Coord>,
    ) -> Option<GroupId> {
        let cells: Vec<Coord> = cells.into_iter().collect();
        if cells.is_empty() {
            return None;
        }
        let id = GroupId(self.next_id);
        self.next_id += 1;
        let mut group = ClusterGroup::new(id, kind);
        let mut touched = BTreeSet::new();
        for c in cells {
            if let Some(prev) = self.owners.insert(c, id) {
                if let Some(old) = self.groups.get_mut(&prev) {
                    old.members.remove(&c);
                    touched.insert(prev);
                }
            }
            group.members.insert(c);
        }
        group.recompute(self.map_height);
        self.groups.insert(id, group);
        for prev in touched {
            self.refresh(prev);
        }
        Some(id)
    }

    /// Move `c` into group `id`. Returns false if `id` does not exist.
    pub fn assign(&mut self, c: Coord, id: GroupId) -> bool {
        if !self.groups.contains_key(&id) {
            return false;
        }
        if let Some(prev) = self.owners.insert(c, id) {
            if prev == id {
                return true;
            }
            if let Some(old) = self.groups.get_mut(&prev) {
                old.members.remove(&c);
            }
            self.refresh(prev);
        }
        if let Some(group) = self.groups.get_mut(&id) {
            group.members.insert(c);
        }
        self.refresh(id);
        true
    }

    /// Drop ownership of `c`, returning the previous owner.
    pub fn release(&mut self, c: Coord) -> Option<GroupId> {
        let prev = self.owners.remove(&c)?;
        if let Some(group) = self.groups.get_mut(&prev) {
            group.members.remove(&c);
        }
        self.refresh(prev);
        Some(prev)
    }

    pub fn owner(&self, c: Coord) -> Option<GroupId> {
        self.owners.get(&c).copied()
    }

    pub fn is_owned(&self, c: Coord) -> bool {
        self.owners.contains_key(&c)
    }

    pub fn group(&self, id: GroupId) -> Option<&ClusterGroup> {
        self.groups.get(&id)
    }

    /// Groups in creation order.
    pub fn groups(&self) -> impl Iterator<Item = &ClusterGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn owned_count(&self) -> usize {
        self.owners.len()
    }

    pub fn into_groups(self) -> Vec<ClusterGroup> {
        self.groups.into_values().collect()
    }

    fn refresh(&mut self, id: GroupId) {
        let map_height = self.map_height;
        let emptied = match self.groups.get_mut(&id) {
            Some(group) => {
                group.recompute(map_height);
                group.is_empty()
            }
            None => false,
        };
        if emptied {
            self.groups.remove(&id);
        }
    }
}
