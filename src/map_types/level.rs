use crate::{
    arena::{EntityArena, EntityId},
    corridor::{connect_rooms, Corridor, CorridorParams},
    error::{ConfigError, GenerateError},
    extent::{overlapping_pairs, Extent},
    graph::{grow_room_graph, RoomGraph, RoomGraphSpec},
    layout::{compute_layout, Layout, LayoutSpec},
    manifest::SpawnManifest,
    nav::{NavigationBackend, SurfaceRegion},
    placement::{spawn_objects, ObjectRules, PlacementOutcome},
    room::{generate_room, ConnectedSide, RoomGeometry, RoomGeometrySpec, WallSpec},
    sampling::{has_odd_value, small_rng},
    symmetric_map::SymmetricMap,
    PooledFactory,
};

use glam::Vec2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

pub const MAX_GENERATE_TRIES: usize = 200;

pub const ROOM_ROOT_TAG: &str = "Room";

/// What the agent and camera systems get for each room of a finished level.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomHandoff {
    pub root: EntityId,
    /// World position of the floor's minimum corner.
    pub position: Vec2,
    pub width: u32,
    pub height: u32,
    pub manifest: SpawnManifest,
}

pub struct GeneratedRoom {
    pub handoff: RoomHandoff,
    pub geometry: RoomGeometry,
    pub placement: PlacementOutcome,
}

impl GeneratedRoom {
    pub fn footprint(&self) -> Extent {
        self.geometry.bounds().translate(self.handoff.position)
    }
}

/// A fully placed level. Its instances stay checked out of the factory until [`Level::release`].
pub struct Level {
    pub graph: RoomGraph,
    pub layout: Layout,
    pub rooms: Vec<GeneratedRoom>,
    pub corridors: Vec<Corridor>,
    pub arena: EntityArena,
    /// Levels thrown away before this one came out whole.
    pub rebuilds: usize,
    corridor_index: SymmetricMap<usize>,
}

impl Level {
    pub fn handoff(&self) -> Vec<RoomHandoff> {
        self.rooms.iter().map(|r| r.handoff.clone()).collect()
    }

    pub fn corridor_between(&self, a: usize, b: usize) -> Option<&Corridor> {
        self.corridor_index.get(a, b).map(|i| &self.corridors[*i])
    }

    /// World extents of every overlapping pair: objects against anything in their room, and room
    /// or corridor floors against each other.
    pub fn collider_overlaps(&self) -> Vec<(Extent, Extent)> {
        let mut overlaps = Vec::new();
        for room in self.rooms.iter() {
            let colliders: Vec<_> = room.placement.occupancy.iter().collect();
            for (i, j) in room.placement.occupancy.object_overlaps() {
                overlaps.push((
                    colliders[i].extent.translate(room.handoff.position),
                    colliders[j].extent.translate(room.handoff.position),
                ));
            }
        }

        let floors: Vec<Extent> = self
            .rooms
            .iter()
            .map(|r| r.footprint())
            .chain(self.corridors.iter().map(|c| c.footprint()))
            .collect();
        for (i, j) in overlapping_pairs(&floors) {
            overlaps.push((floors[i], floors[j]));
        }

        overlaps
    }

    /// Returns every instance to `factory`.
    pub fn release(mut self, factory: &mut impl PooledFactory) -> usize {
        self.arena.release_all(factory)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LevelSpec {
    pub seed: u64,
    pub room_graph: RoomGraphSpec,
    pub tile_size: f32,
    pub corridor_gap: f32,
    pub walls: WallSpec,
    pub objects: ObjectRules,
    /// One per room, matched by room index.
    pub manifests: Vec<SpawnManifest>,
    /// `None` keeps rebuilding until a level comes out whole.
    pub max_generate_tries: Option<usize>,
}

impl Default for LevelSpec {
    fn default() -> Self {
        LevelSpec {
            seed: 0,
            room_graph: RoomGraphSpec::default(),
            tile_size: 5.0,
            corridor_gap: 5.0,
            walls: WallSpec::default(),
            objects: ObjectRules::default(),
            manifests: Vec::new(),
            max_generate_tries: Some(MAX_GENERATE_TRIES),
        }
    }
}

impl LevelSpec {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let spec: LevelSpec =
            ron::de::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        spec.validate()?;

        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("tile_size", self.tile_size),
            ("corridor_gap", self.corridor_gap),
        ];
        for (field, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(ConfigError::NotPositive {
                    field: *field,
                    value: *value,
                });
            }
        }
        for (field, rule) in self.objects.all().iter() {
            let smallest = rule.size[0].min(rule.size[1]);
            if !(smallest > 0.0) {
                return Err(ConfigError::NotPositive {
                    field: *field,
                    value: smallest,
                });
            }
        }

        if self.max_generate_tries == Some(0) {
            return Err(ConfigError::NotPositive {
                field: "max_generate_tries",
                value: 0.0,
            });
        }

        let g = &self.room_graph;
        if g.min_room_dim == 0 {
            return Err(ConfigError::NotPositive {
                field: "min_room_dim",
                value: 0.0,
            });
        }
        if !has_odd_value(g.min_room_dim, g.max_room_dim) {
            return Err(ConfigError::NoOddDimension {
                min: g.min_room_dim,
                max: g.max_room_dim,
            });
        }
        g.shape_weights
            .try_make()
            .map_err(|e| ConfigError::ShapeWeights(e.to_string()))?;

        let p = self.walls.window_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::WindowProbability(p));
        }
        let thickness = self.walls.wall_thickness;
        if thickness < 0.0 || thickness >= self.tile_size / 2.0 {
            return Err(ConfigError::WallThickness {
                thickness,
                tile_size: self.tile_size,
            });
        }

        Ok(())
    }

    fn layout_spec(&self) -> LayoutSpec {
        LayoutSpec {
            tile_size: self.tile_size,
            corridor_gap: self.corridor_gap,
        }
    }

    fn corridor_params(&self) -> CorridorParams {
        CorridorParams {
            tile_size: self.tile_size,
            corridor_gap: self.corridor_gap,
            walls: self.walls,
        }
    }

    /// On success, returns `Some` with every instance of the level checked out of `factory` and
    /// navigation baked into `nav`. On failure everything acquired so far is released and `nav` is
    /// never touched.
    pub fn try_generate(
        &self,
        rng: &mut impl Rng,
        factory: &mut impl PooledFactory,
        nav: &mut impl NavigationBackend,
    ) -> Option<Level> {
        log::debug!("Generating level");

        let graph = grow_room_graph(&self.room_graph, rng);
        if self.manifests.len() > graph.len() {
            log::warn!(
                "{} manifests for {} rooms, ignoring the rest",
                self.manifests.len(),
                graph.len()
            );
        }
        let layout = compute_layout(&graph, &self.layout_spec());

        let mut arena = EntityArena::default();
        let mut rooms = Vec::with_capacity(graph.len());
        for (index, node) in graph.rooms().enumerate() {
            let position = layout.position(index);
            let root = arena.spawn_root(ROOM_ROOT_TAG, None, position);
            let geometry = generate_room(
                &RoomGeometrySpec {
                    width: node.width,
                    height: node.height,
                    tile: Vec2::splat(self.tile_size),
                    connections: node.connections,
                    connected_side: ConnectedSide::Door,
                    walls: self.walls,
                },
                root,
                &mut arena,
                factory,
                rng,
            );

            let manifest = self.manifests.get(index).cloned().unwrap_or_default();
            let placement =
                spawn_objects(&geometry, &manifest, &self.objects, &mut arena, factory, rng);
            if !placement.is_success() {
                log::debug!(
                    "Room {} failed placement, discarding {} entities",
                    index,
                    arena.len()
                );
                arena.release_all(factory);
                return None;
            }

            rooms.push(GeneratedRoom {
                handoff: RoomHandoff {
                    root,
                    position,
                    width: node.width,
                    height: node.height,
                    manifest,
                },
                geometry,
                placement,
            });
        }

        let (corridors, corridor_index) = connect_rooms(
            &graph,
            &layout,
            &self.corridor_params(),
            &mut arena,
            factory,
            rng,
        );

        bake_navigation(&rooms, &corridors, nav);

        Some(Level {
            graph,
            layout,
            rooms,
            corridors,
            arena,
            rebuilds: 0,
            corridor_index,
        })
    }

    /// Rebuilds from scratch until a level comes out whole, or `max_generate_tries` runs out.
    pub fn generate(
        &self,
        rng: &mut impl Rng,
        factory: &mut impl PooledFactory,
        nav: &mut impl NavigationBackend,
    ) -> Result<Level, GenerateError> {
        self.validate()?;

        let mut attempts = 0;
        loop {
            if let Some(max) = self.max_generate_tries {
                if attempts >= max {
                    return Err(GenerateError::TooManyTries { attempts });
                }
            }
            attempts += 1;

            if let Some(mut level) = self.try_generate(rng, factory, nav) {
                level.rebuilds = attempts - 1;
                log::debug!(
                    "Generated {} rooms and {} corridors after {} rebuilds",
                    level.rooms.len(),
                    level.corridors.len(),
                    level.rebuilds
                );
                return Ok(level);
            }
        }
    }

    /// [`LevelSpec::generate`] with an RNG seeded from `seed`.
    pub fn generate_seeded(
        &self,
        factory: &mut impl PooledFactory,
        nav: &mut impl NavigationBackend,
    ) -> Result<Level, GenerateError> {
        let mut rng = small_rng(self.seed);

        self.generate(&mut rng, factory, nav)
    }
}

fn bake_navigation(
    rooms: &[GeneratedRoom],
    corridors: &[Corridor],
    nav: &mut impl NavigationBackend,
) {
    for room in rooms.iter() {
        nav.build_surface(&SurfaceRegion {
            owner: room.handoff.root,
            extent: room.footprint(),
        });
    }
    for corridor in corridors.iter() {
        nav.build_surface(&SurfaceRegion {
            owner: corridor.root,
            extent: corridor.footprint(),
        });
        nav.add_link(&corridor.world_link());
    }
    nav.bake();
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nav::NavBake, pool::ObjectPool};

    fn furnished_spec(num_rooms: usize) -> LevelSpec {
        let manifest = SpawnManifest::default()
            .with("Crate", 1)
            .with("Computer", 1)
            .with("Container", 2)
            .with("WallDisplay", 2)
            .with("Agent", 2);

        LevelSpec {
            seed: 42,
            room_graph: RoomGraphSpec {
                num_rooms,
                ..Default::default()
            },
            tile_size: 5.0,
            corridor_gap: 5.0,
            manifests: vec![manifest; num_rooms],
            ..Default::default()
        }
    }

    #[test]
    fn test_ten_room_level_is_whole_and_overlap_free() {
        let spec = furnished_spec(10);
        let mut pool = ObjectPool::default();
        let mut nav = NavBake::default();
        let level = spec.generate_seeded(&mut pool, &mut nav).unwrap();

        assert_eq!(level.graph.len(), 10);
        assert_eq!(level.rooms.len(), 10);
        assert_eq!(level.corridors.len(), 9);
        assert!(level.collider_overlaps().is_empty());

        for (i, room) in level.rooms.iter().enumerate() {
            // Agents are left to the agent systems.
            assert_eq!(room.placement.placed.len(), 6);
            assert_eq!(room.handoff.manifest, spec.manifests[i]);
            assert_eq!(
                level.arena.world_position(room.handoff.root),
                Some(room.handoff.position)
            );
        }
        for (a, b) in level.graph.edges() {
            assert!(level.corridor_between(b, a).is_some());
        }
    }

    #[test]
    fn test_navigation_is_baked_once_for_the_finished_level() {
        let spec = furnished_spec(6);
        let mut pool = ObjectPool::default();
        let mut nav = NavBake::default();
        let level = spec.generate_seeded(&mut pool, &mut nav).unwrap();

        assert_eq!(nav.bakes, 1);
        assert_eq!(nav.surfaces.len(), level.rooms.len() + level.corridors.len());
        assert_eq!(nav.links.len(), level.corridors.len());
    }

    #[test]
    fn test_only_the_finished_level_holds_instances() {
        let spec = furnished_spec(8);
        let mut pool = ObjectPool::default();
        let mut nav = NavBake::default();
        let level = spec.generate_seeded(&mut pool, &mut nav).unwrap();

        let pooled = level.arena.iter().filter(|(_, e)| e.handle.is_some()).count();
        assert_eq!(pool.total_live(), pooled);
        assert_eq!(level.release(&mut pool), pooled);
        assert_eq!(pool.total_live(), 0);
    }

    #[test]
    fn test_unsatisfiable_manifest_gives_up_cleanly() {
        let mut spec = furnished_spec(4);
        spec.manifests = vec![SpawnManifest::default().with("Crate", 40); 4];
        spec.max_generate_tries = Some(3);
        let mut pool = ObjectPool::default();
        let mut nav = NavBake::default();

        assert_eq!(
            spec.generate_seeded(&mut pool, &mut nav).err(),
            Some(GenerateError::TooManyTries { attempts: 3 })
        );
        assert_eq!(pool.total_live(), 0);
        assert!(pool.created() > 0);
        assert_eq!(nav.bakes, 0);
        assert!(nav.surfaces.is_empty());
    }

    #[test]
    fn test_same_seed_same_level() {
        let spec = furnished_spec(7);
        let first = spec
            .generate_seeded(&mut ObjectPool::default(), &mut NavBake::default())
            .unwrap();
        let second = spec
            .generate_seeded(&mut ObjectPool::default(), &mut NavBake::default())
            .unwrap();

        assert_eq!(first.handoff(), second.handoff());
        assert_eq!(first.rebuilds, second.rebuilds);
    }

    #[test]
    fn test_missing_manifests_mean_empty_rooms() {
        let mut spec = furnished_spec(5);
        spec.manifests.truncate(2);
        let level = spec
            .generate_seeded(&mut ObjectPool::default(), &mut NavBake::default())
            .unwrap();

        let handoff = level.handoff();
        assert_eq!(handoff[1].manifest, spec.manifests[1]);
        for room in handoff[2..].iter() {
            assert_eq!(room.manifest, SpawnManifest::default());
        }
    }

    #[test]
    fn test_starved_graph_still_generates() {
        let mut spec = furnished_spec(10);
        spec.room_graph.max_grid_extent = Some(0);
        let level = spec
            .generate_seeded(&mut ObjectPool::default(), &mut NavBake::default())
            .unwrap();

        assert_eq!(level.rooms.len(), 1);
        assert!(level.corridors.is_empty());
    }

    #[test]
    fn test_spec_from_ron() {
        let spec = LevelSpec::from_ron_str(
            r#"(
                seed: 7,
                room_graph: (num_rooms: 4, min_room_dim: 3, max_room_dim: 5),
                corridor_gap: 6.0,
                manifests: [
                    (entries: [(tag: "Computer", count: 1), (tag: "Agent", count: 2)]),
                ],
                max_generate_tries: None,
            )"#,
        )
        .unwrap();

        assert_eq!(spec.seed, 7);
        assert_eq!(spec.room_graph.num_rooms, 4);
        assert_eq!(spec.tile_size, 5.0);
        assert_eq!(spec.corridor_gap, 6.0);
        assert_eq!(spec.manifests[0].placed_count(), 1);
        assert_eq!(spec.max_generate_tries, None);
    }

    #[test]
    fn test_small_tile_level_has_no_overlaps() {
        let mut spec = LevelSpec {
            tile_size: 3.0,
            corridor_gap: 3.0,
            manifests: vec![SpawnManifest::default().with("WallDisplay", 2); 10],
            ..Default::default()
        };
        spec.walls.window_probability = 0.0;
        spec.room_graph.min_room_dim = 5;
        for seed in 0..5 {
            spec.seed = seed;
            let level = spec
                .generate_seeded(&mut ObjectPool::default(), &mut NavBake::default())
                .unwrap();

            assert!(level.collider_overlaps().is_empty());
            for room in level.rooms.iter() {
                for o in room.placement.placed.iter() {
                    assert!(room.geometry.bounds().contains_extent(&o.footprint));
                }
            }
        }
    }

    #[test]
    fn test_zero_tries_is_rejected() {
        let mut spec = furnished_spec(3);
        spec.max_generate_tries = Some(0);
        let mut pool = ObjectPool::default();

        assert_eq!(
            spec.generate_seeded(&mut pool, &mut NavBake::default()).err(),
            Some(GenerateError::Config(ConfigError::NotPositive {
                field: "max_generate_tries",
                value: 0.0
            }))
        );
        assert_eq!(pool.created(), 0);
    }

    #[test]
    fn test_bad_specs_are_rejected() {
        assert!(matches!(
            LevelSpec::from_ron_str("(tile_size: \"big\")"),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            LevelSpec::from_ron_str("(room_graph: (min_room_dim: 4, max_room_dim: 4))").err(),
            Some(ConfigError::NoOddDimension { min: 4, max: 4 })
        );

        let mut spec = LevelSpec::default();
        spec.corridor_gap = 0.0;
        assert_eq!(
            spec.validate(),
            Err(ConfigError::NotPositive {
                field: "corridor_gap",
                value: 0.0
            })
        );

        let mut spec = LevelSpec::default();
        spec.walls.window_probability = 1.5;
        assert_eq!(
            spec.generate_seeded(&mut ObjectPool::default(), &mut NavBake::default())
                .err(),
            Some(GenerateError::Config(ConfigError::WindowProbability(1.5)))
        );
    }
}
