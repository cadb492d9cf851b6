use fnv::FnvHashMap;

/// A map keyed by unordered index pairs, so `(a, b)` and `(b, a)` name the same entry.
#[derive(Clone, Debug, Default)]
pub struct SymmetricMap<T> {
    map: FnvHashMap<(usize, usize), T>,
}

impl<T> SymmetricMap<T> {
    pub fn new() -> Self {
        SymmetricMap {
            map: FnvHashMap::default(),
        }
    }

    fn order_indices(i1: usize, i2: usize) -> (usize, usize) {
        if i1 > i2 {
            (i2, i1)
        } else {
            (i1, i2)
        }
    }

    pub fn get(&self, i1: usize, i2: usize) -> Option<&T> {
        self.map.get(&Self::order_indices(i1, i2))
    }

    pub fn contains(&self, i1: usize, i2: usize) -> bool {
        self.map.contains_key(&Self::order_indices(i1, i2))
    }

    pub fn insert(&mut self, i1: usize, i2: usize, value: T) {
        self.map.insert(Self::order_indices(i1, i2), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_order_is_ignored() {
        let mut map = SymmetricMap::new();
        map.insert(3, 1, "corridor");

        assert!(map.contains(1, 3));
        assert_eq!(map.get(1, 3), Some(&"corridor"));
        assert_eq!(map.get(3, 2), None);
    }
}
