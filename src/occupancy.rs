use crate::extent::Extent;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ColliderKind {
    Wall,
    Window,
    Door,
    Object,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Collider {
    pub extent: Extent,
    pub kind: ColliderKind,
}

/// Committed footprints of one room, in room-local space. Stands in for physics overlap queries.
#[derive(Clone, Debug, Default)]
pub struct Occupancy {
    colliders: Vec<Collider>,
}

impl Occupancy {
    pub fn insert(&mut self, extent: Extent, kind: ColliderKind) {
        self.colliders.push(Collider { extent, kind });
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    /// True if `extent` overlaps any collider whose kind passes `filter`.
    pub fn overlaps_any(&self, extent: &Extent, filter: impl Fn(ColliderKind) -> bool) -> bool {
        self.colliders
            .iter()
            .any(|c| filter(c.kind) && c.extent.overlaps(extent))
    }

    /// Index pairs of overlapping colliders where at least one side is an object.
    pub fn object_overlaps(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..self.colliders.len() {
            for j in i + 1..self.colliders.len() {
                let (a, b) = (&self.colliders[i], &self.colliders[j]);
                let involves_object =
                    a.kind == ColliderKind::Object || b.kind == ColliderKind::Object;
                if involves_object && a.extent.overlaps(&b.extent) {
                    pairs.push((i, j));
                }
            }
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_overlap_filter_skips_other_kinds() {
        let mut occupancy = Occupancy::default();
        occupancy.insert(
            Extent::from_min_and_size(Vec2::ZERO, Vec2::new(5.0, 0.5)),
            ColliderKind::Wall,
        );
        let probe = Extent::from_center_and_size(Vec2::new(2.5, 0.5), Vec2::ONE);

        assert!(occupancy.overlaps_any(&probe, |_| true));
        assert!(!occupancy.overlaps_any(&probe, |k| k == ColliderKind::Object));
    }

    #[test]
    fn test_structural_overlaps_are_not_reported() {
        let mut occupancy = Occupancy::default();
        let strip = Extent::from_min_and_size(Vec2::ZERO, Vec2::new(5.0, 0.5));
        occupancy.insert(strip, ColliderKind::Wall);
        occupancy.insert(strip, ColliderKind::Window);
        assert!(occupancy.object_overlaps().is_empty());

        occupancy.insert(strip, ColliderKind::Object);
        assert_eq!(occupancy.object_overlaps(), vec![(0, 2), (1, 2)]);
    }
}
