//! Typed terrain grid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terrain kind of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Grass,
    Wood,
    Iron,
    Mountain,
    River,
}

impl TileKind {
    pub const ALL: [TileKind; 5] = [
        TileKind::Grass,
        TileKind::Wood,
        TileKind::Iron,
        TileKind::Mountain,
        TileKind::River,
    ];

    fn slot(self) -> usize {
        match self {
            TileKind::Grass => 0,
            TileKind::Wood => 1,
            TileKind::Iron => 2,
            TileKind::Mountain => 3,
            TileKind::River => 4,
        }
    }

    /// Walkable without crossing water or rock.
    pub fn is_walkable(self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Wood | TileKind::Iron)
    }

    pub fn is_resource(self) -> bool {
        matches!(self, TileKind::Wood | TileKind::Iron)
    }

    pub fn glyph(self) -> char {
        match self {
            TileKind::Grass => '.',
            TileKind::Wood => 'W',
            TileKind::Iron => 'I',
            TileKind::Mountain => '^',
            TileKind::River => '~',
        }
    }
}

/// Cell coordinate. Ordering is column-major (`x`, then `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn chebyshev(self, other: Coord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

pub const CARDINAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

pub const OCTILE: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

/// `width x height` grid of [`TileKind`], stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridData", into = "GridData")]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<TileKind>,
    counts: [usize; 5],
}

/// Serialized form; per-kind counters are rebuilt on load and the cell
/// count must match the dimensions.
#[derive(Serialize, Deserialize)]
struct GridData {
    width: i32,
    height: i32,
    cells: Vec<TileKind>,
}

impl TryFrom<GridData> for Grid {
    type Error = String;

    fn try_from(data: GridData) -> Result<Self, Self::Error> {
        let expected = (data.width.max(0) as usize).checked_mul(data.height.max(0) as usize);
        if data.width < 0 || data.height < 0 || expected != Some(data.cells.len()) {
            return Err(format!(
                "grid {}x{} cannot hold {} cells",
                data.width,
                data.height,
                data.cells.len()
            ));
        }
        let mut grid = Grid {
            width: data.width,
            height: data.height,
            cells: data.cells,
            counts: [0; 5],
        };
        grid.recount();
        Ok(grid)
    }
}

impl From<Grid> for GridData {
    fn from(grid: Grid) -> Self {
        GridData {
            width: grid.width,
            height: grid.height,
            cells: grid.cells,
        }
    }
}

impl Grid {
    /// New all-grass grid. Dimensions whose cell count overflows `usize`
    /// yield an empty 0x0 grid.
    pub fn new(width: i32, height: i32) -> Self {
        let len = (width.max(0) as usize).checked_mul(height.max(0) as usize);
        let (width, height, len) = match len {
            Some(len) => (width, height, len),
            None => (0, 0, 0),
        };
        let mut counts = [0; 5];
        counts[TileKind::Grass.slot()] = len;
        Self {
            width,
            height,
            cells: vec![TileKind::Grass; len],
            counts,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    #[inline]
    fn idx(&self, c: Coord) -> usize {
        (c.y * self.width + c.x) as usize
    }

    /// Kind at `c`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, c: Coord) -> Option<TileKind> {
        if self.in_bounds(c) {
            Some(self.cells[self.idx(c)])
        } else {
            None
        }
    }

    /// Kind at an in-bounds coordinate.
    #[inline]
    pub fn kind(&self, c: Coord) -> TileKind {
        self.cells[self.idx(c)]
    }

    #[inline]
    pub fn is(&self, c: Coord, kind: TileKind) -> bool {
        self.get(c) == Some(kind)
    }

    /// Set `c` to `kind`, returning the previous kind. Out-of-bounds writes are ignored.
    pub fn set(&mut self, c: Coord, kind: TileKind) -> Option<TileKind> {
        if !self.in_bounds(c) {
            return None;
        }
        let i = self.idx(c);
        let old = self.cells[i];
        if old != kind {
            self.counts[old.slot()] -= 1;
            self.counts[kind.slot()] += 1;
            self.cells[i] = kind;
        }
        Some(old)
    }

    pub fn count(&self, kind: TileKind) -> usize {
        self.counts[kind.slot()]
    }

    /// Every coordinate in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Coord::new(x, y)))
    }

    pub fn coords_of(&self, kind: TileKind) -> Vec<Coord> {
        self.coords().filter(|&c| self.kind(c) == kind).collect()
    }

    pub fn neighbors4(&self, c: Coord) -> impl Iterator<Item = Coord> + '_ {
        CARDINAL
            .iter()
            .map(move |&(dx, dy)| c.offset(dx, dy))
            .filter(move |&n| self.in_bounds(n))
    }

    pub fn neighbors8(&self, c: Coord) -> impl Iterator<Item = Coord> + '_ {
        OCTILE
            .iter()
            .map(move |&(dx, dy)| c.offset(dx, dy))
            .filter(move |&n| self.in_bounds(n))
    }

    pub fn is_edge(&self, c: Coord) -> bool {
        c.x == 0 || c.y == 0 || c.x == self.width - 1 || c.y == self.height - 1
    }

    fn recount(&mut self) {
        self.counts = [0; 5];
        for &kind in &self.cells {
            self.counts[kind.slot()] += 1;
        }
    }

    /// Rows of kinds, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[TileKind]> {
        self.cells.chunks(self.width.max(1) as usize)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row.iter().map(|k| k.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_grass() {
        let grid = Grid::new(4, 3);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.count(TileKind::Grass), 12);
        assert!(grid.coords().all(|c| grid.kind(c) == TileKind::Grass));
    }

    #[test]
    fn test_set_tracks_counts() {
        let mut grid = Grid::new(5, 5);
        assert_eq!(grid.set(Coord::new(1, 1), TileKind::River), Some(TileKind::Grass));
        grid.set(Coord::new(2, 1), TileKind::River);
        grid.set(Coord::new(2, 1), TileKind::Mountain);
        assert_eq!(grid.count(TileKind::River), 1);
        assert_eq!(grid.count(TileKind::Mountain), 1);
        assert_eq!(grid.count(TileKind::Grass), 23);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = Grid::new(3, 3);
        assert_eq!(grid.get(Coord::new(-1, 0)), None);
        assert_eq!(grid.get(Coord::new(3, 0)), None);
        assert_eq!(grid.set(Coord::new(0, 3), TileKind::River), None);
        assert_eq!(grid.count(TileKind::Grass), 9);
    }

    #[test]
    fn test_deserialize_rejects_mismatched_cells() {
        let short = r#"{"width":3,"height":3,"cells":["Grass","Grass"]}"#;
        let err = serde_json::from_str::<Grid>(short).unwrap_err();
        assert!(err.to_string().contains("cannot hold 2 cells"));

        let negative = r#"{"width":-1,"height":0,"cells":[]}"#;
        assert!(serde_json::from_str::<Grid>(negative).is_err());

        let ok = r#"{"width":2,"height":1,"cells":["River","Grass"]}"#;
        let grid: Grid = serde_json::from_str(ok).unwrap();
        assert_eq!(grid.count(TileKind::River), 1);
    }

    #[test]
    fn test_neighbors_clip_at_corner() {
        let grid = Grid::new(3, 3);
        assert_eq!(grid.neighbors4(Coord::new(0, 0)).count(), 2);
        assert_eq!(grid.neighbors8(Coord::new(0, 0)).count(), 3);
        assert_eq!(grid.neighbors8(Coord::new(1, 1)).count(), 8);
    }

    #[test]
    fn test_counts_rebuilt_after_deserialize() {
        let mut grid = Grid::new(3, 2);
        grid.set(Coord::new(0, 0), TileKind::Wood);
        let json = serde_json::to_string(&grid).unwrap();
        let restored: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.count(TileKind::Wood), 1);
        assert_eq!(restored, grid);
    }

    #[test]
    fn test_display_renders_rows() {
        let mut grid = Grid::new(3, 2);
        grid.set(Coord::new(1, 0), TileKind::Mountain);
        grid.set(Coord::new(2, 1), TileKind::River);
        assert_eq!(grid.to_string(), ".^.\n..~\n");
    }
}
