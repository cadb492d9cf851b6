use crate::{
    extent::{Side, ALL_SIDES},
    sampling::{OddDimensionDist, ShapeDist, ShapeWeights},
};

use fnv::{FnvHashMap, FnvHashSet};
use glam::IVec2;
use petgraph::{
    algo::tarjan_scc,
    graph::NodeIndex,
    stable_graph::StableGraph,
    visit::{EdgeRef, IntoEdgeReferences},
    Undirected,
};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Only `Square` has geometry; `L` and `T` are recorded on the node and otherwise built square.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum RoomShape {
    Square,
    L,
    T,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Connections {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Connections {
    pub fn get(&self, side: Side) -> bool {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn set(&mut self, side: Side, value: bool) {
        match side {
            Side::Top => self.top = value,
            Side::Bottom => self.bottom = value,
            Side::Left => self.left = value,
            Side::Right => self.right = value,
        }
    }

    pub fn count(&self) -> usize {
        ALL_SIDES.iter().filter(|s| self.get(**s)).count()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomNode {
    pub coord: IVec2,
    pub shape: RoomShape,
    /// In tiles, always odd.
    pub width: u32,
    /// In tiles, always odd.
    pub height: u32,
    pub connections: Connections,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RoomGraphSpec {
    pub num_rooms: usize,
    pub shape_weights: ShapeWeights,
    pub min_room_dim: u32,
    pub max_room_dim: u32,
    /// When set, rooms only grow into cells with `|x|, |y| <= max_grid_extent`.
    pub max_grid_extent: Option<i32>,
}

impl Default for RoomGraphSpec {
    fn default() -> Self {
        RoomGraphSpec {
            num_rooms: 10,
            shape_weights: ShapeWeights::default(),
            min_room_dim: 3,
            max_room_dim: 7,
            max_grid_extent: None,
        }
    }
}

impl RoomGraphSpec {
    fn in_bounds(&self, coord: IVec2) -> bool {
        match self.max_grid_extent {
            Some(e) => coord.x.abs() <= e && coord.y.abs() <= e,
            None => true,
        }
    }
}

/// Rooms on an integer grid. Node indices are room indices; rooms are never removed.
#[derive(Clone, Debug, Default)]
pub struct RoomGraph {
    graph: StableGraph<RoomNode, (), Undirected>,
    by_coord: FnvHashMap<IVec2, NodeIndex>,
}

impl RoomGraph {
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn room(&self, index: usize) -> &RoomNode {
        &self.graph[NodeIndex::new(index)]
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomNode> + '_ {
        self.graph.node_indices().map(move |i| &self.graph[i])
    }

    pub fn room_at(&self, coord: IVec2) -> Option<usize> {
        self.by_coord.get(&coord).map(|n| n.index())
    }

    /// The room across `side` of room `index`, if one was placed there.
    pub fn neighbor(&self, index: usize, side: Side) -> Option<usize> {
        self.room_at(self.room(index).coord + side.grid_offset())
    }

    /// Every undirected edge once, as `(lower, higher)` room indices.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b))
            })
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        tarjan_scc(&self.graph).len() <= 1
    }

    fn add_room(&mut self, node: RoomNode) -> NodeIndex {
        let coord = node.coord;
        let index = self.graph.add_node(node);
        self.by_coord.insert(coord, index);

        index
    }

    fn connect(&mut self, a: NodeIndex, b: NodeIndex, side_of_a: Side) {
        self.graph[a].connections.set(side_of_a, true);
        self.graph[b].connections.set(side_of_a.negate(), true);
        self.graph.add_edge(a, b, ());
    }
}

/// Grid cells adjacent to a placed room that don't hold one yet.
#[derive(Default)]
struct Frontier {
    cells: Vec<IVec2>,
    members: FnvHashSet<IVec2>,
}

impl Frontier {
    fn pop_random(&mut self, rng: &mut impl Rng) -> Option<IVec2> {
        if self.cells.is_empty() {
            return None;
        }
        let i = rng.gen_range(0, self.cells.len());
        let coord = self.cells.swap_remove(i);
        self.members.remove(&coord);

        Some(coord)
    }

    fn expand_around(&mut self, coord: IVec2, graph: &RoomGraph, spec: &RoomGraphSpec) {
        for side in ALL_SIDES.iter() {
            let n = coord + side.grid_offset();
            if spec.in_bounds(n) && graph.room_at(n).is_none() && self.members.insert(n) {
                self.cells.push(n);
            }
        }
    }
}

fn sample_room(
    coord: IVec2,
    shapes: &ShapeDist,
    dims: &OddDimensionDist,
    rng: &mut impl Rng,
) -> RoomNode {
    let node = RoomNode {
        coord,
        shape: shapes.sample(rng),
        width: dims.sample(rng),
        height: dims.sample(rng),
        connections: Connections::default(),
    };
    if node.shape != RoomShape::Square {
        log::debug!(
            "Room at {} recorded as {:?}, building square geometry",
            coord,
            node.shape
        );
    }

    node
}

/// Grows a connected grid of rooms outward from the origin by attaching each new room to a random
/// placed neighbor. Returns fewer than `num_rooms` rooms if the frontier runs dry first.
pub fn grow_room_graph(spec: &RoomGraphSpec, rng: &mut impl Rng) -> RoomGraph {
    let mut graph = RoomGraph::default();
    if spec.num_rooms == 0 {
        return graph;
    }

    let shapes = spec.shape_weights.make();
    let dims = OddDimensionDist::new(spec.min_room_dim, spec.max_room_dim);
    let mut frontier = Frontier::default();
    graph.add_room(sample_room(IVec2::ZERO, &shapes, &dims, rng));
    frontier.expand_around(IVec2::ZERO, &graph, spec);

    while graph.len() < spec.num_rooms {
        let coord = if let Some(c) = frontier.pop_random(rng) {
            c
        } else {
            log::debug!(
                "Frontier starved at {} of {} rooms",
                graph.len(),
                spec.num_rooms
            );
            break;
        };

        let placed_neighbors: Vec<(Side, NodeIndex)> = ALL_SIDES
            .iter()
            .filter_map(|s| {
                graph
                    .by_coord
                    .get(&(coord + s.grid_offset()))
                    .map(|n| (*s, *n))
            })
            .collect();
        let (side, neighbor) = if let Some(choice) = placed_neighbors.choose(rng) {
            *choice
        } else {
            continue;
        };

        let index = graph.add_room(sample_room(coord, &shapes, &dims, rng));
        graph.connect(index, neighbor, side);
        frontier.expand_around(coord, &graph, spec);
    }
    log::debug!(
        "Grew {} rooms with {} connections",
        graph.len(),
        graph.graph.edge_count()
    );

    graph
}
