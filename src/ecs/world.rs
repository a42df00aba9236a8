//! Object storage backed by hecs
//!
//! The scene graph mostly needs single-entity access: spawn, despawn and
//! per-component reads and writes. Physics sync queries every body at once.
//! Missing components read as `Err` or `None` rather than panicking.

use hecs::Entity;

/// Storage for every object of a scene
#[derive(Default)]
pub struct World {
    entities: hecs::World,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.entities.spawn(components)
    }

    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.entities.despawn(entity)
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Number of live entities
    #[must_use]
    pub fn len(&self) -> u32 {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.entities.get::<&T>(entity)
    }

    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.entities.get::<&mut T>(entity)
    }

    /// Copy a component out, if present
    pub fn get_copied<T: hecs::Component + Copy>(&self, entity: Entity) -> Option<T> {
        self.entities.get::<&T>(entity).ok().map(|c| *c)
    }

    /// Attach or replace a single component
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.entities.insert_one(entity, component)
    }

    pub fn remove_one<T: hecs::Component>(&mut self, entity: Entity) -> Option<T> {
        self.entities.remove_one::<T>(entity).ok()
    }

    /// Every entity matching `Q`
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.entities.query::<Q>()
    }

    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.entities.query_mut::<Q>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove_one() {
        let mut world = World::new();
        let entity = world.spawn((1_u32,));

        assert_eq!(world.get_copied::<u32>(entity), Some(1));
        world.insert_one(entity, 2.5_f32).unwrap();
        assert_eq!(world.get_copied::<f32>(entity), Some(2.5));

        assert_eq!(world.remove_one::<u32>(entity), Some(1));
        assert!(world.get_copied::<u32>(entity).is_none());
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_query_matches_only_owners() {
        let mut world = World::new();
        let a = world.spawn((1_u32, 0.5_f32));
        world.spawn((0.25_f32,));

        for (_, value) in world.query_mut::<&mut u32>() {
            *value += 1;
        }
        let found: Vec<_> = world
            .query::<&u32>()
            .iter()
            .map(|(entity, value)| (entity, *value))
            .collect();
        assert_eq!(found, vec![(a, 2)]);
    }

    #[test]
    fn test_despawned_entity_is_gone() {
        let mut world = World::new();
        let entity = world.spawn((1_u32,));
        world.despawn(entity).unwrap();

        assert!(!world.contains(entity));
        assert!(world.is_empty());
        assert!(world.get::<u32>(entity).is_err());
        assert!(world.insert_one(entity, 3_u32).is_err());
    }
}
