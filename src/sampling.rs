use crate::{
    extent::{Extent, Rotation, ALL_ROTATIONS},
    graph::RoomShape,
};

use glam::Vec2;
use rand::{
    distributions::{WeightedError, WeightedIndex},
    prelude::*,
    rngs::SmallRng,
};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

pub fn small_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// Relative odds of each room shape.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ShapeWeights {
    pub square: f32,
    pub l_shape: f32,
    pub t_shape: f32,
}

impl Default for ShapeWeights {
    fn default() -> Self {
        ShapeWeights {
            square: 0.7,
            l_shape: 0.15,
            t_shape: 0.15,
        }
    }
}

impl ShapeWeights {
    pub fn try_make(&self) -> Result<ShapeDist, WeightedError> {
        let index = WeightedIndex::new(&[self.square, self.l_shape, self.t_shape])?;

        Ok(ShapeDist { index })
    }

    pub fn make(&self) -> ShapeDist {
        self.try_make().expect("Bad shape weights")
    }
}

pub struct ShapeDist {
    index: WeightedIndex<f32>,
}

impl Distribution<RoomShape> for ShapeDist {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RoomShape {
        match self.index.sample(rng) {
            0 => RoomShape::Square,
            1 => RoomShape::L,
            _ => RoomShape::T,
        }
    }
}

/// Snaps `value` to an odd neighbor inside `[min, max]`, preferring the larger one.
///
/// Odd dimensions give every wall a single center tile for its door.
pub fn round_to_odd(value: u32, min: u32, max: u32) -> u32 {
    if value % 2 == 1 {
        value
    } else if value < max {
        value + 1
    } else {
        debug_assert!(value > min, "No odd value in [{}, {}]", min, max);
        value - 1
    }
}

/// True iff `[min, max]` holds at least one odd integer.
pub fn has_odd_value(min: u32, max: u32) -> bool {
    min <= max && (min % 2 == 1 || min < max)
}

/// Uniform room dimensions, forced odd.
pub struct OddDimensionDist {
    range: Uniform<u32>,
    min: u32,
    max: u32,
}

impl OddDimensionDist {
    pub fn new(min: u32, max: u32) -> Self {
        OddDimensionDist {
            range: Uniform::new_inclusive(min, max),
            min,
            max,
        }
    }
}

impl Distribution<u32> for OddDimensionDist {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        round_to_odd(self.range.sample(rng), self.min, self.max)
    }
}

/// A uniform point strictly inside `extent`, or `None` when it has no interior.
pub fn sample_point_in(extent: &Extent, rng: &mut impl Rng) -> Option<Vec2> {
    if extent.is_empty() {
        return None;
    }

    Some(Vec2::new(
        rng.gen_range(extent.min.x, extent.max.x),
        rng.gen_range(extent.min.y, extent.max.y),
    ))
}

pub fn sample_rotation(rng: &mut impl Rng) -> Rotation {
    *ALL_ROTATIONS.choose(rng).expect("Rotations are never empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_odd_stays_in_range() {
        assert_eq!(round_to_odd(4, 3, 7), 5);
        assert_eq!(round_to_odd(5, 3, 7), 5);
        assert_eq!(round_to_odd(8, 3, 8), 7);
    }

    #[test]
    fn test_odd_dimensions_are_odd_and_bounded() {
        let mut rng = small_rng(7);
        let dist = OddDimensionDist::new(2, 8);
        for _ in 0..500 {
            let d = dist.sample(&mut rng);
            assert_eq!(d % 2, 1);
            assert!(d >= 2 && d <= 8);
        }
    }

    #[test]
    fn test_has_odd_value() {
        assert!(has_odd_value(3, 3));
        assert!(has_odd_value(4, 5));
        assert!(!has_odd_value(4, 4));
        assert!(!has_odd_value(5, 3));
    }

    #[test]
    fn test_shape_weights_reject_all_zero() {
        let weights = ShapeWeights {
            square: 0.0,
            l_shape: 0.0,
            t_shape: 0.0,
        };

        assert!(weights.try_make().is_err());
    }

    #[test]
    fn test_square_only_weights_only_yield_squares() {
        let mut rng = small_rng(3);
        let dist = ShapeWeights {
            square: 1.0,
            l_shape: 0.0,
            t_shape: 0.0,
        }
        .make();
        for _ in 0..100 {
            assert_eq!(dist.sample(&mut rng), RoomShape::Square);
        }
    }

    #[test]
    fn test_point_in_empty_extent_is_none() {
        let mut rng = small_rng(1);
        let empty = Extent::from_min_and_size(Vec2::ZERO, Vec2::new(0.0, 4.0));
        let full = Extent::from_min_and_size(Vec2::ZERO, Vec2::new(4.0, 4.0));

        assert_eq!(sample_point_in(&empty, &mut rng), None);
        let p = sample_point_in(&full, &mut rng).unwrap();
        assert!(full.contains_point(p));
    }
}
