use crate::{
    arena::{EntityArena, EntityId},
    extent::{Extent, Rotation, Side, ALL_SIDES},
    graph::{Connections, RoomGraph},
    layout::Layout,
    room::{generate_room, ConnectedSide, RoomGeometry, RoomGeometrySpec, WallSpec},
    symmetric_map::SymmetricMap,
    PooledFactory,
};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const CORRIDOR_ROOT_TAG: &str = "Corridor";

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CorridorAxis {
    /// Joins a room to the one above or below it.
    Vertical,
    Horizontal,
}

impl CorridorAxis {
    fn of(side: Side) -> Self {
        if side.is_horizontal() {
            CorridorAxis::Vertical
        } else {
            CorridorAxis::Horizontal
        }
    }

    pub fn direction(self) -> Vec2 {
        match self {
            CorridorAxis::Vertical => Vec2::new(0.0, 1.0),
            CorridorAxis::Horizontal => Vec2::new(1.0, 0.0),
        }
    }
}

/// Long-axis tile count of a corridor bridging `door_gap`.
pub fn corridor_tile_count(door_gap: f32, tile_size: f32) -> u32 {
    ((2.0 * door_gap).max(tile_size) / tile_size).ceil().max(1.0) as u32
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct CorridorSpec {
    /// World position of the door midpoint on each room.
    pub doors: (Vec2, Vec2),
    pub axis: CorridorAxis,
    pub door_gap: f32,
    pub tile_count: u32,
}

impl CorridorSpec {
    /// `side` is the wall of the first room that faces the second.
    pub fn between_doors(door_a: Vec2, door_b: Vec2, side: Side, tile_size: f32) -> Self {
        let door_gap = door_a.distance(door_b);

        CorridorSpec {
            doors: (door_a, door_b),
            axis: CorridorAxis::of(side),
            door_gap,
            tile_count: corridor_tile_count(door_gap, tile_size),
        }
    }
}

/// A declared traversable span, consumed by the navigation bake.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct NavigationLink {
    /// Relative to the owning corridor's root, until moved with [`NavigationLink::to_world`].
    pub center: Vec2,
    pub rotation: Rotation,
    /// Offset of each end along the long axis.
    pub start: f32,
    pub end: f32,
    pub width: f32,
    pub bidirectional: bool,
}

impl NavigationLink {
    fn axis(&self) -> Vec2 {
        match self.rotation {
            Rotation::R0 | Rotation::R180 => Vec2::new(0.0, 1.0),
            Rotation::R90 | Rotation::R270 => Vec2::new(1.0, 0.0),
        }
    }

    pub fn to_world(&self, root_position: Vec2) -> NavigationLink {
        NavigationLink {
            center: self.center + root_position,
            ..*self
        }
    }

    pub fn endpoints(&self) -> (Vec2, Vec2) {
        (
            self.center + self.axis() * self.start,
            self.center + self.axis() * self.end,
        )
    }
}

#[derive(Clone, Debug)]
pub struct Corridor {
    pub rooms: (usize, usize),
    pub spec: CorridorSpec,
    pub root: EntityId,
    /// World position of the corridor floor's minimum corner.
    pub position: Vec2,
    pub geometry: RoomGeometry,
    pub link: NavigationLink,
}

impl Corridor {
    pub fn footprint(&self) -> Extent {
        self.geometry.bounds().translate(self.position)
    }

    pub fn world_link(&self) -> NavigationLink {
        self.link.to_world(self.position)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CorridorParams {
    pub tile_size: f32,
    pub corridor_gap: f32,
    pub walls: WallSpec,
}

/// World position of the door midpoint on `side` of room `index`.
fn door_position(layout: &Layout, index: usize, side: Side) -> Vec2 {
    let footprint = layout.footprint(index);
    let (min, max, center) = (footprint.min, footprint.max, footprint.center());
    match side {
        Side::Top => Vec2::new(center.x, max.y),
        Side::Bottom => Vec2::new(center.x, min.y),
        Side::Left => Vec2::new(min.x, center.y),
        Side::Right => Vec2::new(max.x, center.y),
    }
}

/// Builds the corridor between room `a` and the neighbor across its `side`.
pub fn build_corridor(
    layout: &Layout,
    (a, b): (usize, usize),
    side: Side,
    params: &CorridorParams,
    arena: &mut EntityArena,
    factory: &mut impl PooledFactory,
    rng: &mut impl Rng,
) -> Corridor {
    let door_a = door_position(layout, a, side);
    let door_b = door_position(layout, b, side.negate());
    let spec = CorridorSpec::between_doors(door_a, door_b, side, params.tile_size);

    let half_gap = params.corridor_gap / 2.0;
    let anchor_a = door_a + side.outward() * half_gap;
    let anchor_b = door_b + side.negate().outward() * half_gap;
    let center = (anchor_a + anchor_b) / 2.0;

    let segment = spec.door_gap / spec.tile_count as f32;
    let (width, height, tile, connections, rotation) = match spec.axis {
        CorridorAxis::Vertical => (
            1,
            spec.tile_count,
            Vec2::new(params.tile_size, segment),
            Connections {
                top: true,
                bottom: true,
                ..Default::default()
            },
            Rotation::R0,
        ),
        CorridorAxis::Horizontal => (
            spec.tile_count,
            1,
            Vec2::new(segment, params.tile_size),
            Connections {
                left: true,
                right: true,
                ..Default::default()
            },
            Rotation::R90,
        ),
    };
    let size = Vec2::new(width as f32 * tile.x, height as f32 * tile.y);
    let position = center - size / 2.0;

    let root = arena.spawn_root(CORRIDOR_ROOT_TAG, None, position);
    let geometry = generate_room(
        &RoomGeometrySpec {
            width,
            height,
            tile,
            connections,
            connected_side: ConnectedSide::Opening,
            walls: params.walls,
        },
        root,
        arena,
        factory,
        rng,
    );

    let reach = spec.door_gap / 2.0 + params.tile_size;
    let link = NavigationLink {
        center: size / 2.0,
        rotation,
        start: -reach,
        end: reach,
        width: params.corridor_gap,
        bidirectional: true,
    };

    Corridor {
        rooms: (a, b),
        spec,
        root,
        position,
        geometry,
        link,
    }
}

/// One corridor per undirected graph edge. The returned map gives the corridor index for a room
/// pair in either order.
pub fn connect_rooms(
    graph: &RoomGraph,
    layout: &Layout,
    params: &CorridorParams,
    arena: &mut EntityArena,
    factory: &mut impl PooledFactory,
    rng: &mut impl Rng,
) -> (Vec<Corridor>, SymmetricMap<usize>) {
    let mut corridors = Vec::new();
    let mut visited = SymmetricMap::new();
    for (a, node) in graph.rooms().enumerate() {
        for side in ALL_SIDES.iter().copied() {
            if !node.connections.get(side) {
                continue;
            }
            let b = match graph.neighbor(a, side) {
                Some(b) => b,
                None => continue,
            };
            if visited.contains(a, b) {
                continue;
            }

            let corridor = build_corridor(layout, (a, b), side, params, arena, factory, rng);
            log::trace!(
                "Corridor {} <-> {}: {} tiles across {:.2}",
                a,
                b,
                corridor.spec.tile_count,
                corridor.spec.door_gap
            );
            visited.insert(a, b, corridors.len());
            corridors.push(corridor);
        }
    }
    log::debug!("Connected rooms with {} corridors", corridors.len());

    (corridors, visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extent::overlapping_pairs,
        graph::{grow_room_graph, RoomGraphSpec},
        layout::{compute_layout, LayoutSpec},
        pool::ObjectPool,
        room::PerimeterKind,
        sampling::small_rng,
    };

    const PARAMS: CorridorParams = CorridorParams {
        tile_size: 5.0,
        corridor_gap: 5.0,
        walls: WallSpec {
            wall_thickness: 0.5,
            window_probability: 0.3,
        },
    };

    fn connected(seed: u64) -> (RoomGraph, Layout, Vec<Corridor>, SymmetricMap<usize>) {
        let mut rng = small_rng(seed);
        let graph = grow_room_graph(&RoomGraphSpec::default(), &mut rng);
        let layout = compute_layout(
            &graph,
            &LayoutSpec {
                tile_size: PARAMS.tile_size,
                corridor_gap: PARAMS.corridor_gap,
            },
        );
        let mut arena = EntityArena::default();
        let mut pool = ObjectPool::default();
        let (corridors, index) =
            connect_rooms(&graph, &layout, &PARAMS, &mut arena, &mut pool, &mut rng);

        (graph, layout, corridors, index)
    }

    #[test]
    fn test_ten_world_units_need_four_tiles() {
        assert_eq!(corridor_tile_count(10.0, 5.0), 4);
        assert_eq!(corridor_tile_count(5.0, 5.0), 2);
        assert_eq!(corridor_tile_count(1.0, 5.0), 1);
        assert_eq!(corridor_tile_count(11.0, 5.0), 5);
    }

    #[test]
    fn test_one_corridor_per_edge() {
        for seed in 0..10 {
            let (graph, _, corridors, index) = connected(seed);
            assert_eq!(corridors.len(), graph.edges().len());
            for (a, b) in graph.edges() {
                let i = *index.get(b, a).expect("Every edge has a corridor");
                let rooms = corridors[i].rooms;
                assert_eq!((rooms.0.min(rooms.1), rooms.0.max(rooms.1)), (a, b));
            }
        }
    }

    #[test]
    fn test_corridors_span_exactly_the_door_gap() {
        let (_, layout, corridors, _) = connected(4);
        let mut floors: Vec<Extent> = layout.footprints.clone();
        for c in corridors.iter() {
            let footprint = c.footprint();
            let (door_a, door_b) = c.spec.doors;
            assert!(footprint.contains_point(door_a));
            assert!(footprint.contains_point(door_b));
            let long = footprint.size().dot(c.spec.axis.direction());
            assert!((long - c.spec.door_gap).abs() < 1e-3);
            assert!(c.spec.door_gap >= PARAMS.corridor_gap - 1e-4);
            floors.push(footprint);
        }

        assert!(overlapping_pairs(&floors).is_empty());
    }

    #[test]
    fn test_corridor_ends_are_open() {
        let (_, _, corridors, _) = connected(2);
        for c in corridors.iter() {
            let g = &c.geometry;
            assert_eq!(g.count(PerimeterKind::Opening), 2);
            assert_eq!(g.count(PerimeterKind::Door), 0);
            assert_eq!(g.floor.len() as u32, c.spec.tile_count);
        }
    }

    #[test]
    fn test_links_reach_into_both_rooms() {
        let (_, layout, corridors, _) = connected(6);
        for c in corridors.iter() {
            let link = c.world_link();
            assert!(link.bidirectional);
            assert_eq!(link.width, PARAMS.corridor_gap);
            let span = c.spec.door_gap + 2.0 * PARAMS.tile_size;
            assert!((link.end - link.start - span).abs() < 1e-3);

            let (p, q) = link.endpoints();
            let (a, b) = c.rooms;
            let inside = |room: usize, point: Vec2| layout.footprint(room).contains_point(point);
            assert!((inside(a, p) && inside(b, q)) || (inside(a, q) && inside(b, p)));
        }
    }
}
