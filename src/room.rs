use crate::{
    arena::{EntityArena, EntityId},
    extent::{Extent, Rotation, Side, ALL_SIDES},
    graph::Connections,
    occupancy::{ColliderKind, Occupancy},
    PooledFactory,
};

use fnv::FnvHashSet;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const FLOOR_TAG: &str = "Floor";
pub const WALL_TAG: &str = "Wall";
pub const WINDOW_TAG: &str = "WindowWall";
pub const DOOR_TAG: &str = "Door";

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct WallSpec {
    /// Depth of the wall colliders, measured into the room from the floor edge.
    pub wall_thickness: f32,
    /// Chance that a plain wall tile is swapped for a window.
    pub window_probability: f64,
}

impl Default for WallSpec {
    fn default() -> Self {
        WallSpec {
            wall_thickness: 0.5,
            window_probability: 0.3,
        }
    }
}

/// How a connected side's midpoint tile is realized.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectedSide {
    Door,
    /// No instance at all; corridors use this for their open ends.
    Opening,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PerimeterKind {
    Wall,
    Window,
    Door,
    Opening,
}

impl PerimeterKind {
    fn tag(self) -> Option<&'static str> {
        match self {
            PerimeterKind::Wall => Some(WALL_TAG),
            PerimeterKind::Window => Some(WINDOW_TAG),
            PerimeterKind::Door => Some(DOOR_TAG),
            PerimeterKind::Opening => None,
        }
    }

    fn collider(self) -> Option<ColliderKind> {
        match self {
            PerimeterKind::Wall => Some(ColliderKind::Wall),
            PerimeterKind::Window => Some(ColliderKind::Window),
            PerimeterKind::Door => Some(ColliderKind::Door),
            PerimeterKind::Opening => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoomGeometrySpec {
    pub width: u32,
    pub height: u32,
    /// World size of one tile; corridors stretch theirs along the long axis.
    pub tile: Vec2,
    pub connections: Connections,
    pub connected_side: ConnectedSide,
    pub walls: WallSpec,
}

#[derive(Clone, Debug)]
pub struct PerimeterTile {
    pub side: Side,
    pub index: u32,
    pub kind: PerimeterKind,
    /// Room-local point on the floor edge at the middle of this tile.
    pub edge_center: Vec2,
    pub entity: Option<EntityId>,
    /// Strip just inside the floor edge. `None` for openings.
    pub collider: Option<Extent>,
}

/// The built shell of one room or corridor, in room-local space.
#[derive(Clone, Debug)]
pub struct RoomGeometry {
    pub root: EntityId,
    pub width: u32,
    pub height: u32,
    pub tile: Vec2,
    pub wall_thickness: f32,
    pub floor: Vec<EntityId>,
    pub perimeter: Vec<PerimeterTile>,
    /// `(side, index)` of every window, so wall displays can steer clear of them.
    pub windows: FnvHashSet<(Side, u32)>,
}

impl RoomGeometry {
    pub fn size(&self) -> Vec2 {
        room_size(self.width, self.height, self.tile)
    }

    pub fn bounds(&self) -> Extent {
        Extent::from_min_and_size(Vec2::ZERO, self.size())
    }

    pub fn side_len(&self, side: Side) -> u32 {
        side_len(self.width, self.height, side)
    }

    /// Floor-edge point at the middle of `side`.
    pub fn side_midpoint(&self, side: Side) -> Vec2 {
        edge_center(self.size(), self.tile, side, (self.side_len(side) - 1) / 2)
    }

    pub fn perimeter_tile(&self, side: Side, index: u32) -> Option<&PerimeterTile> {
        self.perimeter
            .iter()
            .find(|t| t.side == side && t.index == index)
    }

    pub fn count(&self, kind: PerimeterKind) -> usize {
        self.perimeter.iter().filter(|t| t.kind == kind).count()
    }

    /// Wall, window, and door colliders, ready to seed placement.
    pub fn occupancy(&self) -> Occupancy {
        let mut occupancy = Occupancy::default();
        for t in self.perimeter.iter() {
            if let (Some(extent), Some(kind)) = (t.collider, t.kind.collider()) {
                occupancy.insert(extent, kind);
            }
        }

        occupancy
    }
}

fn room_size(width: u32, height: u32, tile: Vec2) -> Vec2 {
    Vec2::new(width as f32 * tile.x, height as f32 * tile.y)
}

fn side_len(width: u32, height: u32, side: Side) -> u32 {
    if side.is_horizontal() {
        width
    } else {
        height
    }
}

fn edge_center(size: Vec2, tile: Vec2, side: Side, index: u32) -> Vec2 {
    let along = index as f32 + 0.5;
    match side {
        Side::Top => Vec2::new(along * tile.x, size.y),
        Side::Bottom => Vec2::new(along * tile.x, 0.0),
        Side::Left => Vec2::new(0.0, along * tile.y),
        Side::Right => Vec2::new(size.x, along * tile.y),
    }
}

/// The wall strip behind a perimeter tile, lying just inside the floor edge.
pub fn wall_strip(edge_center: Vec2, side: Side, tile: Vec2, thickness: f32) -> Extent {
    let size = if side.is_horizontal() {
        Vec2::new(tile.x, thickness)
    } else {
        Vec2::new(thickness, tile.y)
    };

    Extent::from_center_and_size(edge_center + side.inward() * (thickness / 2.0), size)
}

/// Builds one floor tile per cell and one perimeter tile per cell along each side. A connected
/// side gets a door (or an opening) on its center tile; every other perimeter tile is a wall, and
/// each wall independently rolls to become a window.
pub fn generate_room(
    spec: &RoomGeometrySpec,
    root: EntityId,
    arena: &mut EntityArena,
    factory: &mut impl PooledFactory,
    rng: &mut impl Rng,
) -> RoomGeometry {
    let size = room_size(spec.width, spec.height, spec.tile);

    let mut floor = Vec::with_capacity((spec.width * spec.height) as usize);
    for y in 0..spec.height {
        for x in 0..spec.width {
            let center = Vec2::new(
                (x as f32 + 0.5) * spec.tile.x,
                (y as f32 + 0.5) * spec.tile.y,
            );
            floor.push(arena.spawn(factory, FLOOR_TAG, Some(root), center, Rotation::R0));
        }
    }

    let mut perimeter = Vec::new();
    let mut windows = FnvHashSet::default();
    for side in ALL_SIDES.iter().copied() {
        let len = side_len(spec.width, spec.height, side);
        let midpoint = (len - 1) / 2;
        for index in 0..len {
            let kind = if index == midpoint && spec.connections.get(side) {
                match spec.connected_side {
                    ConnectedSide::Door => PerimeterKind::Door,
                    ConnectedSide::Opening => PerimeterKind::Opening,
                }
            } else if rng.gen_bool(spec.walls.window_probability) {
                windows.insert((side, index));
                PerimeterKind::Window
            } else {
                PerimeterKind::Wall
            };

            let center = edge_center(size, spec.tile, side, index);
            let rotation = if side.is_horizontal() {
                Rotation::R0
            } else {
                Rotation::R90
            };
            let entity = kind
                .tag()
                .map(|tag| arena.spawn(factory, tag, Some(root), center, rotation));
            let collider = kind
                .collider()
                .map(|_| wall_strip(center, side, spec.tile, spec.walls.wall_thickness));

            perimeter.push(PerimeterTile {
                side,
                index,
                kind,
                edge_center: center,
                entity,
                collider,
            });
        }
    }

    RoomGeometry {
        root,
        width: spec.width,
        height: spec.height,
        tile: spec.tile,
        wall_thickness: spec.walls.wall_thickness,
        floor,
        perimeter,
        windows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pool::ObjectPool, sampling::small_rng};

    fn build(
        width: u32,
        height: u32,
        connections: Connections,
        connected_side: ConnectedSide,
        window_probability: f64,
    ) -> (RoomGeometry, EntityArena, ObjectPool) {
        let mut arena = EntityArena::default();
        let mut pool = ObjectPool::default();
        let mut rng = small_rng(21);
        let root = arena.spawn_root("Room", None, Vec2::ZERO);
        let spec = RoomGeometrySpec {
            width,
            height,
            tile: Vec2::splat(5.0),
            connections,
            connected_side,
            walls: WallSpec {
                wall_thickness: 0.5,
                window_probability,
            },
        };
        let geometry = generate_room(&spec, root, &mut arena, &mut pool, &mut rng);

        (geometry, arena, pool)
    }

    #[test]
    fn test_closed_five_by_five_room() {
        let (geometry, _, pool) = build(5, 5, Connections::default(), ConnectedSide::Door, 0.3);

        assert_eq!(geometry.floor.len(), 25);
        assert_eq!(geometry.perimeter.len(), 20);
        assert_eq!(geometry.count(PerimeterKind::Door), 0);
        assert_eq!(
            geometry.count(PerimeterKind::Wall) + geometry.count(PerimeterKind::Window),
            20
        );
        assert_eq!(geometry.windows.len(), geometry.count(PerimeterKind::Window));
        assert_eq!(pool.live_count(FLOOR_TAG), 25);
    }

    #[test]
    fn test_doors_sit_on_side_midpoints() {
        let connections = Connections {
            top: true,
            left: true,
            ..Default::default()
        };
        let (geometry, _, pool) = build(5, 3, connections, ConnectedSide::Door, 0.0);

        assert_eq!(geometry.count(PerimeterKind::Door), 2);
        assert_eq!(geometry.perimeter_tile(Side::Top, 2).unwrap().kind, PerimeterKind::Door);
        assert_eq!(geometry.perimeter_tile(Side::Left, 1).unwrap().kind, PerimeterKind::Door);
        assert_eq!(
            geometry.perimeter_tile(Side::Top, 2).unwrap().edge_center,
            geometry.side_midpoint(Side::Top)
        );
        assert_eq!(geometry.side_midpoint(Side::Left), Vec2::new(0.0, 7.5));
        assert_eq!(pool.live_count(DOOR_TAG), 2);
        assert_eq!(pool.live_count(WALL_TAG), 14);
    }

    #[test]
    fn test_openings_have_no_instance_or_collider() {
        let connections = Connections {
            top: true,
            bottom: true,
            ..Default::default()
        };
        let (geometry, arena, _) = build(1, 4, connections, ConnectedSide::Opening, 0.0);

        assert_eq!(geometry.count(PerimeterKind::Opening), 2);
        assert_eq!(geometry.count(PerimeterKind::Door), 0);
        assert_eq!(geometry.occupancy().len(), 8);
        // Root, four floor tiles, eight side walls.
        assert_eq!(arena.len(), 13);
    }

    #[test]
    fn test_wall_strips_stay_inside_the_floor() {
        let (geometry, _, _) = build(3, 5, Connections::default(), ConnectedSide::Door, 0.5);
        let bounds = geometry.bounds();
        for t in geometry.perimeter.iter() {
            assert!(bounds.contains_extent(&t.collider.unwrap()));
        }
    }
}
