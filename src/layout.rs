use crate::{
    extent::Extent,
    graph::{RoomGraph, RoomNode},
};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct LayoutSpec {
    /// World size of one tile.
    pub tile_size: f32,
    /// World distance between neighboring grid cells.
    pub corridor_gap: f32,
}

/// World size of a room's floor.
pub fn room_footprint_size(node: &RoomNode, tile_size: f32) -> Vec2 {
    Vec2::new(node.width as f32, node.height as f32) * tile_size
}

/// Start offset and extent of every occupied grid column (or row), keyed by grid coordinate.
#[derive(Clone, Debug, Default)]
pub struct AxisCells {
    cells: BTreeMap<i32, (f32, f32)>,
}

impl AxisCells {
    /// `extents` holds the largest room extent seen for each coordinate.
    fn from_extents(extents: BTreeMap<i32, f32>, gap: f32) -> Self {
        let mut cells = BTreeMap::new();
        let mut preceding = 0.0;
        for (k, (coord, extent)) in extents.into_iter().enumerate() {
            cells.insert(coord, (preceding + k as f32 * gap, extent));
            preceding += extent;
        }

        AxisCells { cells }
    }

    pub fn offset(&self, coord: i32) -> Option<f32> {
        self.cells.get(&coord).map(|c| c.0)
    }

    pub fn extent(&self, coord: i32) -> Option<f32> {
        self.cells.get(&coord).map(|c| c.1)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `(coord, offset, extent)` in grid order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, f32, f32)> + '_ {
        self.cells.iter().map(|(c, (o, e))| (*c, *o, *e))
    }
}

/// World placement of every room in a [`RoomGraph`], indexed like the graph.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub tile_size: f32,
    pub corridor_gap: f32,
    /// Minimum corner of each room's floor.
    pub positions: Vec<Vec2>,
    pub footprints: Vec<Extent>,
    pub columns: AxisCells,
    pub rows: AxisCells,
}

impl Layout {
    pub fn position(&self, room: usize) -> Vec2 {
        self.positions[room]
    }

    pub fn footprint(&self, room: usize) -> Extent {
        self.footprints[room]
    }

    /// The whole grid cell a room is centered in.
    pub fn cell(&self, node: &RoomNode) -> Option<Extent> {
        let x = self.columns.offset(node.coord.x)?;
        let y = self.rows.offset(node.coord.y)?;
        let w = self.columns.extent(node.coord.x)?;
        let h = self.rows.extent(node.coord.y)?;

        Some(Extent::from_min_and_size(Vec2::new(x, y), Vec2::new(w, h)))
    }
}

/// Packs rooms into grid cells sized by the widest room in each column and the tallest in each
/// row, with exactly `corridor_gap` between neighboring cells, then centers each room in its cell.
pub fn compute_layout(graph: &RoomGraph, spec: &LayoutSpec) -> Layout {
    let mut widths = BTreeMap::<i32, f32>::new();
    let mut heights = BTreeMap::<i32, f32>::new();
    for node in graph.rooms() {
        let size = room_footprint_size(node, spec.tile_size);
        let w = widths.entry(node.coord.x).or_insert(0.0);
        *w = w.max(size.x);
        let h = heights.entry(node.coord.y).or_insert(0.0);
        *h = h.max(size.y);
    }

    let columns = AxisCells::from_extents(widths, spec.corridor_gap);
    let rows = AxisCells::from_extents(heights, spec.corridor_gap);

    let mut positions = Vec::with_capacity(graph.len());
    let mut footprints = Vec::with_capacity(graph.len());
    for node in graph.rooms() {
        let size = room_footprint_size(node, spec.tile_size);
        let base = Vec2::new(
            columns.offset(node.coord.x).unwrap_or_default(),
            rows.offset(node.coord.y).unwrap_or_default(),
        );
        let cell = Vec2::new(
            columns.extent(node.coord.x).unwrap_or_default(),
            rows.extent(node.coord.y).unwrap_or_default(),
        );
        let position = base + (cell - size) / 2.0;
        positions.push(position);
        footprints.push(Extent::from_min_and_size(position, size));
    }
    log::debug!(
        "Laid out {} rooms in {} columns x {} rows",
        positions.len(),
        columns.len(),
        rows.len()
    );

    Layout {
        tile_size: spec.tile_size,
        corridor_gap: spec.corridor_gap,
        positions,
        footprints,
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extent::overlapping_pairs,
        graph::{grow_room_graph, RoomGraphSpec},
        sampling::small_rng,
    };

    const SPEC: LayoutSpec = LayoutSpec {
        tile_size: 5.0,
        corridor_gap: 5.0,
    };

    fn random_layout(seed: u64) -> (RoomGraph, Layout) {
        let mut rng = small_rng(seed);
        let graph = grow_room_graph(
            &RoomGraphSpec {
                num_rooms: 25,
                ..Default::default()
            },
            &mut rng,
        );
        let layout = compute_layout(&graph, &SPEC);

        (graph, layout)
    }

    #[test]
    fn test_room_footprints_never_overlap() {
        for seed in 0..20 {
            let (_, layout) = random_layout(seed);
            assert!(overlapping_pairs(&layout.footprints).is_empty());
        }
    }

    #[test]
    fn test_cell_gaps_equal_corridor_gap() {
        for seed in 0..20 {
            let (_, layout) = random_layout(seed);
            for axis in [&layout.columns, &layout.rows].iter() {
                let cells: Vec<_> = axis.iter().collect();
                for pair in cells.windows(2) {
                    let (c0, o0, e0) = pair[0];
                    let (c1, o1, _) = pair[1];
                    assert_eq!(c1, c0 + 1);
                    assert!((o1 - (o0 + e0) - SPEC.corridor_gap).abs() < 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_rooms_are_centered_in_their_cells() {
        let (graph, layout) = random_layout(3);
        for (i, node) in graph.rooms().enumerate() {
            let cell = layout.cell(node).unwrap();
            let footprint = layout.footprint(i);
            assert!(cell.contains_extent(&footprint));
            assert!((cell.center() - footprint.center()).length() < 1e-4);
        }
    }

    #[test]
    fn test_facing_doors_line_up() {
        let (graph, layout) = random_layout(8);
        for (a, b) in graph.edges() {
            let (fa, fb) = (layout.footprint(a), layout.footprint(b));
            let delta = graph.room(b).coord - graph.room(a).coord;
            if delta.x != 0 {
                assert!((fa.center().y - fb.center().y).abs() < 1e-4);
            } else {
                assert!((fa.center().x - fb.center().x).abs() < 1e-4);
            }
        }
    }
}
