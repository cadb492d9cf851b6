use crate::{extent::Rotation, InstanceHandle, PooledFactory};

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct EntityId(pub u32);

#[derive(Clone, Debug)]
pub struct Entity {
    pub tag: String,
    /// `None` for pure transforms like room roots.
    pub handle: Option<InstanceHandle>,
    pub parent: Option<EntityId>,
    /// Relative to the parent, or world space for roots.
    pub local_position: Vec2,
    pub rotation: Rotation,
}

/// Everything instantiated for one level, owned by the generator until the level is handed off.
#[derive(Clone, Debug, Default)]
pub struct EntityArena {
    entities: Vec<Entity>,
}

impl EntityArena {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    pub fn children_of(&self, parent: EntityId) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.iter().filter(move |(_, e)| e.parent == Some(parent))
    }

    fn push(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(entity);

        id
    }

    /// Adds a transform with no pooled instance behind it.
    pub fn spawn_root(&mut self, tag: &str, parent: Option<EntityId>, position: Vec2) -> EntityId {
        self.push(Entity {
            tag: tag.to_string(),
            handle: None,
            parent,
            local_position: position,
            rotation: Rotation::R0,
        })
    }

    pub fn spawn(
        &mut self,
        factory: &mut impl PooledFactory,
        tag: &str,
        parent: Option<EntityId>,
        local_position: Vec2,
        rotation: Rotation,
    ) -> EntityId {
        let handle = factory.acquire(tag);
        self.push(Entity {
            tag: tag.to_string(),
            handle: Some(handle),
            parent,
            local_position,
            rotation,
        })
    }

    pub fn world_position(&self, id: EntityId) -> Option<Vec2> {
        let mut entity = self.get(id)?;
        let mut position = entity.local_position;
        while let Some(parent) = entity.parent {
            entity = self.get(parent)?;
            position += entity.local_position;
        }

        Some(position)
    }

    /// Hands every pooled instance back to `factory` and empties the arena. Returns how many
    /// instances were released.
    pub fn release_all(&mut self, factory: &mut impl PooledFactory) -> usize {
        let mut released = 0;
        for entity in self.entities.drain(..) {
            if let Some(handle) = entity.handle {
                factory.release(&entity.tag, handle);
                released += 1;
            }
        }

        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ObjectPool;

    #[test]
    fn test_world_position_accumulates_parents() {
        let mut pool = ObjectPool::default();
        let mut arena = EntityArena::default();
        let root = arena.spawn_root("Room", None, Vec2::new(10.0, 20.0));
        let tile = arena.spawn(&mut pool, "Floor", Some(root), Vec2::new(2.5, 2.5), Rotation::R0);

        assert_eq!(arena.world_position(tile), Some(Vec2::new(12.5, 22.5)));
        assert_eq!(arena.children_of(root).count(), 1);
    }

    #[test]
    fn test_release_all_returns_only_pooled_instances() {
        let mut pool = ObjectPool::default();
        let mut arena = EntityArena::default();
        let root = arena.spawn_root("Room", None, Vec2::ZERO);
        for _ in 0..3 {
            arena.spawn(&mut pool, "Wall", Some(root), Vec2::ZERO, Rotation::R90);
        }

        assert_eq!(pool.live_count("Wall"), 3);
        assert_eq!(arena.release_all(&mut pool), 3);
        assert!(arena.is_empty());
        assert_eq!(pool.total_live(), 0);
    }
}
