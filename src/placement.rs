use crate::{
    arena::{EntityArena, EntityId},
    extent::{Extent, Rotation, Side, ALL_SIDES},
    manifest::{SpawnCategory, SpawnManifest},
    occupancy::{ColliderKind, Occupancy},
    room::{PerimeterKind, RoomGeometry},
    sampling::{sample_point_in, sample_rotation},
    PooledFactory,
};

use glam::Vec2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use stats::OnlineStats;

/// Tries per instance before the instance, and so the room, is given up on.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 5;

/// Distance every interior object keeps from the floor edge.
pub const WALL_CLEARANCE: f32 = 1.0;

/// How far a wall-mounted anchor may sit from a wall midpoint and still count as on it.
pub const MIDPOINT_TOLERANCE: f32 = 0.01;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct CategoryRule {
    /// Footprint at `Rotation::R0`. For wall-mounted categories this is `[along wall, depth]`.
    pub size: [f32; 2],
    /// Extra inset of the safe area beyond `WALL_CLEARANCE`.
    pub margin: f32,
    /// Minimum distance to the committed positions this category is checked against.
    pub spacing: f32,
}

impl CategoryRule {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.size[0], self.size[1])
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ObjectRules {
    pub wall_display: CategoryRule,
    pub window_wall: CategoryRule,
    pub container: CategoryRule,
    pub computer: CategoryRule,
    pub generic: CategoryRule,
}

impl Default for ObjectRules {
    fn default() -> Self {
        ObjectRules {
            wall_display: CategoryRule {
                size: [3.0, 0.5],
                margin: 0.0,
                spacing: 0.0,
            },
            window_wall: CategoryRule {
                size: [4.0, 0.5],
                margin: 0.0,
                spacing: 0.0,
            },
            container: CategoryRule {
                size: [1.5, 1.5],
                margin: 1.0,
                spacing: 3.0,
            },
            computer: CategoryRule {
                size: [2.0, 1.0],
                margin: 1.0,
                spacing: 4.0,
            },
            generic: CategoryRule {
                size: [3.0, 3.0],
                margin: 1.5,
                spacing: 6.0,
            },
        }
    }
}

impl ObjectRules {
    pub fn rule(&self, category: SpawnCategory) -> Option<&CategoryRule> {
        match category {
            SpawnCategory::WallDisplay => Some(&self.wall_display),
            SpawnCategory::WindowWall => Some(&self.window_wall),
            SpawnCategory::Container => Some(&self.container),
            SpawnCategory::Computer => Some(&self.computer),
            SpawnCategory::Generic => Some(&self.generic),
            SpawnCategory::Agent | SpawnCategory::Wall => None,
        }
    }

    pub fn all(&self) -> [(&'static str, &CategoryRule); 5] {
        [
            ("wall_display", &self.wall_display),
            ("window_wall", &self.window_wall),
            ("container", &self.container),
            ("computer", &self.computer),
            ("generic", &self.generic),
        ]
    }
}

/// The part of a room where a category's objects may be centered.
pub fn safe_area(bounds: &Extent, rule: &CategoryRule) -> Extent {
    bounds.radial_grow(-(rule.margin + WALL_CLEARANCE))
}

/// Room-local positions committed so far, per spacing-checked category.
#[derive(Clone, Debug, Default)]
pub struct PlacementLedger {
    pub big_objects: Vec<Vec2>,
    pub computers: Vec<Vec2>,
    pub containers: Vec<Vec2>,
}

impl PlacementLedger {
    /// The ledgers a `category` candidate must keep its spacing from.
    fn spaced_against(&self, category: SpawnCategory) -> Vec<(SpawnCategory, &[Vec2])> {
        match category {
            SpawnCategory::Generic => vec![(SpawnCategory::Generic, &self.big_objects[..])],
            SpawnCategory::Computer => vec![
                (SpawnCategory::Computer, &self.computers[..]),
                (SpawnCategory::Generic, &self.big_objects[..]),
            ],
            SpawnCategory::Container => vec![
                (SpawnCategory::Container, &self.containers[..]),
                (SpawnCategory::Generic, &self.big_objects[..]),
                (SpawnCategory::Computer, &self.computers[..]),
            ],
            _ => Vec::new(),
        }
    }

    fn record(&mut self, category: SpawnCategory, position: Vec2) {
        match category {
            SpawnCategory::Generic => self.big_objects.push(position),
            SpawnCategory::Computer => self.computers.push(position),
            SpawnCategory::Container => self.containers.push(position),
            _ => {}
        }
    }
}

/// A pose under consideration, in room-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub position: Vec2,
    pub rotation: Rotation,
    pub footprint: Extent,
    /// Floor-edge point a wall-mounted candidate hangs from.
    pub anchor: Option<Vec2>,
}

/// Why a candidate was turned down.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rejection {
    NoCandidate,
    Overlap,
    WallClearance,
    OverWindow,
    OffMidpoint,
    OutsideRoom,
    OutsideSafeArea,
    TooClose(SpawnCategory),
}

#[derive(Clone, Copy, Debug)]
struct PoolEntry {
    position: Vec2,
    rotation: Option<Rotation>,
    anchor: Option<Vec2>,
}

#[derive(Clone, Debug, Default)]
struct CandidatePools {
    wall_display: Vec<PoolEntry>,
    window_wall: Vec<PoolEntry>,
    container: Vec<PoolEntry>,
    computer: Vec<PoolEntry>,
}

#[derive(Clone, Debug)]
pub struct PlacedObject {
    pub entity: EntityId,
    pub tag: String,
    pub category: SpawnCategory,
    pub position: Vec2,
    pub rotation: Rotation,
    pub footprint: Extent,
    pub attempts: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacementFailure {
    pub tag: String,
    /// Which instance of its manifest entry.
    pub instance: usize,
    pub attempts: usize,
    pub last_rejection: Rejection,
}

/// Result of placing one room's manifest. Failures accumulate rather than stopping placement.
pub struct PlacementOutcome {
    pub placed: Vec<PlacedObject>,
    pub failures: Vec<PlacementFailure>,
    pub ledger: PlacementLedger,
    /// Final colliders of the room, structural and placed.
    pub occupancy: Occupancy,
    /// Attempts used per instance, failed ones included.
    pub attempt_stats: OnlineStats,
}

impl PlacementOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Places manifest objects into one room, checking each candidate against the room's colliders,
/// the wall, and the positions already committed.
pub struct RoomPlacer<'a> {
    geometry: &'a RoomGeometry,
    rules: &'a ObjectRules,
    pools: CandidatePools,
    occupancy: Occupancy,
    ledger: PlacementLedger,
}

impl<'a> RoomPlacer<'a> {
    pub fn new(geometry: &'a RoomGeometry, rules: &'a ObjectRules) -> Self {
        let pools = build_pools(geometry, rules);

        RoomPlacer {
            geometry,
            rules,
            pools,
            occupancy: geometry.occupancy(),
            ledger: PlacementLedger::default(),
        }
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn ledger(&self) -> &PlacementLedger {
        &self.ledger
    }

    pub fn draw_candidate(
        &self,
        category: SpawnCategory,
        rng: &mut impl Rng,
    ) -> Option<Candidate> {
        let rule = self.rules.rule(category)?;
        let (position, rotation, anchor) = match category {
            SpawnCategory::Generic => {
                let area = safe_area(&self.geometry.bounds(), rule);
                (sample_point_in(&area, rng)?, sample_rotation(rng), None)
            }
            _ => {
                let pool = match category {
                    SpawnCategory::WallDisplay => &self.pools.wall_display,
                    SpawnCategory::WindowWall => &self.pools.window_wall,
                    SpawnCategory::Container => &self.pools.container,
                    _ => &self.pools.computer,
                };
                let entry = pool.choose(rng)?;
                let rotation = entry.rotation.unwrap_or_else(|| sample_rotation(rng));
                (entry.position, rotation, entry.anchor)
            }
        };

        Some(Candidate {
            position,
            rotation,
            footprint: Extent::from_center_and_size(position, rotation.rotate_extents(rule.size())),
            anchor,
        })
    }

    /// All constraints for `category`, each checked independently; the first one broken wins.
    pub fn validate(
        &self,
        category: SpawnCategory,
        candidate: &Candidate,
    ) -> Result<(), Rejection> {
        let rule = self.rules.rule(category).ok_or(Rejection::NoCandidate)?;
        let bounds = self.geometry.bounds();

        // Wall-mounted poses sit just past their own wall strip, so they only touch it.
        if self.occupancy.overlaps_any(&candidate.footprint, |_| true) {
            return Err(Rejection::Overlap);
        }
        if !bounds.contains_extent(&candidate.footprint) {
            return Err(Rejection::OutsideRoom);
        }

        match category {
            SpawnCategory::WallDisplay => {
                let reach = candidate.footprint.radial_grow(self.geometry.wall_thickness);
                if self
                    .occupancy
                    .overlaps_any(&reach, |k| k == ColliderKind::Window)
                {
                    return Err(Rejection::OverWindow);
                }
            }
            SpawnCategory::WindowWall => {
                let on_midpoint = candidate.anchor.map_or(false, |a| {
                    ALL_SIDES
                        .iter()
                        .any(|s| a.distance(self.geometry.side_midpoint(*s)) <= MIDPOINT_TOLERANCE)
                });
                if !on_midpoint {
                    return Err(Rejection::OffMidpoint);
                }
            }
            _ => {
                let clear = bounds.radial_grow(-WALL_CLEARANCE);
                if !clear.contains_extent(&candidate.footprint) {
                    return Err(Rejection::WallClearance);
                }
                if !safe_area(&bounds, rule).contains_point(candidate.position) {
                    return Err(Rejection::OutsideSafeArea);
                }
            }
        }

        for (other, positions) in self.ledger.spaced_against(category) {
            if positions
                .iter()
                .any(|p| p.distance(candidate.position) < rule.spacing)
            {
                return Err(Rejection::TooClose(other));
            }
        }

        Ok(())
    }

    fn commit(
        &mut self,
        tag: &str,
        category: SpawnCategory,
        candidate: &Candidate,
        attempts: usize,
        arena: &mut EntityArena,
        factory: &mut impl PooledFactory,
    ) -> PlacedObject {
        let entity = arena.spawn(
            factory,
            tag,
            Some(self.geometry.root),
            candidate.position,
            candidate.rotation,
        );
        let kind = if category == SpawnCategory::WindowWall {
            ColliderKind::Window
        } else {
            ColliderKind::Object
        };
        self.occupancy.insert(candidate.footprint, kind);
        self.ledger.record(category, candidate.position);

        PlacedObject {
            entity,
            tag: tag.to_string(),
            category,
            position: candidate.position,
            rotation: candidate.rotation,
            footprint: candidate.footprint,
            attempts,
        }
    }

    /// Draws and validates up to `MAX_PLACEMENT_ATTEMPTS` candidates for one instance.
    pub fn place_instance(
        &mut self,
        tag: &str,
        category: SpawnCategory,
        arena: &mut EntityArena,
        factory: &mut impl PooledFactory,
        rng: &mut impl Rng,
    ) -> Result<PlacedObject, (usize, Rejection)> {
        let mut last_rejection = Rejection::NoCandidate;
        for attempt in 1..=MAX_PLACEMENT_ATTEMPTS {
            let verdict = self
                .draw_candidate(category, rng)
                .ok_or(Rejection::NoCandidate)
                .and_then(|c| self.validate(category, &c).map(|_| c));
            match verdict {
                Ok(candidate) => {
                    return Ok(self.commit(tag, category, &candidate, attempt, arena, factory));
                }
                Err(rejection) => {
                    log::trace!("{} attempt {} rejected: {:?}", tag, attempt, rejection);
                    last_rejection = rejection;
                }
            }
        }

        Err((MAX_PLACEMENT_ATTEMPTS, last_rejection))
    }

    pub fn into_outcome(
        self,
        placed: Vec<PlacedObject>,
        failures: Vec<PlacementFailure>,
        attempt_stats: OnlineStats,
    ) -> PlacementOutcome {
        PlacementOutcome {
            placed,
            failures,
            ledger: self.ledger,
            occupancy: self.occupancy,
            attempt_stats,
        }
    }
}

fn build_pools(geometry: &RoomGeometry, rules: &ObjectRules) -> CandidatePools {
    let mut pools = CandidatePools::default();

    let bounds = geometry.bounds();
    let structure = geometry.occupancy();
    // Mounts that would poke into another side's wall, or out of the room, are never drawn.
    let wall_mount = |side: Side, edge_center: Vec2, rule: &CategoryRule| {
        let rotation = side.facing_rotation();
        let position =
            edge_center + side.inward() * (geometry.wall_thickness + rule.size[1] / 2.0);
        let footprint =
            Extent::from_center_and_size(position, rotation.rotate_extents(rule.size()));
        let fits =
            bounds.contains_extent(&footprint) && !structure.overlaps_any(&footprint, |_| true);

        if fits {
            Some(PoolEntry {
                position,
                rotation: Some(rotation),
                anchor: Some(edge_center),
            })
        } else {
            None
        }
    };

    for t in geometry.perimeter.iter() {
        let plain_wall = matches!(t.kind, PerimeterKind::Wall | PerimeterKind::Window)
            && !geometry.windows.contains(&(t.side, t.index));
        if plain_wall {
            pools
                .wall_display
                .extend(wall_mount(t.side, t.edge_center, &rules.wall_display));
        }
    }

    for side in ALL_SIDES.iter().copied() {
        let midpoint = (geometry.side_len(side) - 1) / 2;
        let open = geometry
            .perimeter_tile(side, midpoint)
            .map_or(false, |t| matches!(t.kind, PerimeterKind::Wall | PerimeterKind::Window));
        if open {
            pools
                .window_wall
                .extend(wall_mount(side, geometry.side_midpoint(side), &rules.window_wall));
        }
    }

    let cell_centers: Vec<Vec2> = (0..geometry.height)
        .flat_map(|y| (0..geometry.width).map(move |x| (x, y)))
        .map(|(x, y)| {
            Vec2::new(
                (x as f32 + 0.5) * geometry.tile.x,
                (y as f32 + 0.5) * geometry.tile.y,
            )
        })
        .collect();
    let interior = |rule: &CategoryRule| -> Vec<PoolEntry> {
        let area = safe_area(&bounds, rule);
        cell_centers
            .iter()
            .filter(|c| !area.is_empty() && area.contains_point(**c))
            .map(|c| PoolEntry {
                position: *c,
                rotation: None,
                anchor: None,
            })
            .collect()
    };
    pools.container = interior(&rules.container);
    pools.computer = interior(&rules.computer);

    pools
}

/// Places every instance the manifest asks for. Agent and Wall entries are skipped. An instance
/// that runs out of attempts is logged and recorded, and the rest of the manifest still runs.
pub fn spawn_objects(
    geometry: &RoomGeometry,
    manifest: &SpawnManifest,
    rules: &ObjectRules,
    arena: &mut EntityArena,
    factory: &mut impl PooledFactory,
    rng: &mut impl Rng,
) -> PlacementOutcome {
    let mut placer = RoomPlacer::new(geometry, rules);
    let mut placed = Vec::new();
    let mut failures = Vec::new();
    let mut attempt_stats = OnlineStats::new();

    for entry in manifest.entries.iter() {
        let category = entry.category();
        if !category.is_placed() {
            continue;
        }
        for instance in 0..entry.count {
            match placer.place_instance(&entry.tag, category, arena, factory, rng) {
                Ok(object) => {
                    attempt_stats.add(object.attempts);
                    placed.push(object);
                }
                Err((attempts, last_rejection)) => {
                    log::warn!(
                        "Could not place {} #{} after {} attempts ({:?})",
                        entry.tag,
                        instance,
                        attempts,
                        last_rejection
                    );
                    attempt_stats.add(attempts);
                    failures.push(PlacementFailure {
                        tag: entry.tag.clone(),
                        instance,
                        attempts,
                        last_rejection,
                    });
                }
            }
        }
    }
    log::debug!(
        "Placed {} objects, {} failures, {:.2} attempts per instance",
        placed.len(),
        failures.len(),
        attempt_stats.mean()
    );

    placer.into_outcome(placed, failures, attempt_stats)
}
