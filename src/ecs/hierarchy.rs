//! Object hierarchy components
//!
//! Parent/child links between scene objects and the cached world-space
//! transform derived from them.

use glam::{Mat4, Quat, Vec3};
use hecs::Entity;
use smallvec::SmallVec;

/// Parent component - the object this one is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

impl Parent {
    #[must_use]
    pub const fn new(entity: Entity) -> Self {
        Self(entity)
    }

    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.0
    }
}

/// Children component - ordered child list, without duplicates
#[derive(Debug, Clone, Default)]
pub struct Children(pub SmallVec<[Entity; 8]>);

impl Children {
    #[must_use]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Append a child
    pub fn add(&mut self, child: Entity) {
        if !self.0.contains(&child) {
            self.0.push(child);
        }
    }

    /// Insert a child at `index`, clamped to the list length
    pub fn insert(&mut self, index: usize, child: Entity) {
        if self.0.contains(&child) {
            return;
        }
        let index = index.min(self.0.len());
        self.0.insert(index, child);
    }

    /// Remove a child
    pub fn remove(&mut self, child: Entity) -> bool {
        if let Some(pos) = self.position(child) {
            self.0.remove(pos);
            true
        } else {
            false
        }
    }

    /// Index of a child in the list
    #[must_use]
    pub fn position(&self, child: Entity) -> Option<usize> {
        self.0.iter().position(|&e| e == child)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Entity> {
        self.0.get(index).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.0
    }
}

/// Global transform - cached world-space matrix
#[derive(Debug, Clone, Copy)]
pub struct GlobalTransform {
    /// World-space transformation matrix
    pub matrix: Mat4,
}

impl GlobalTransform {
    #[must_use]
    pub const fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }

    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }

    /// World position (translation column)
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.matrix.col(3).truncate()
    }

    /// World rotation with scale removed from the basis
    #[must_use]
    pub fn rotation(&self) -> Quat {
        let (_, rotation, _) = self.matrix.to_scale_rotation_translation();
        rotation.normalize()
    }

    /// World scale, as basis column lengths
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        Vec3::new(
            self.matrix.col(0).truncate().length(),
            self.matrix.col(1).truncate().length(),
            self.matrix.col(2).truncate().length(),
        )
    }

    /// Inverse of the world matrix
    #[must_use]
    pub fn inverse(&self) -> Mat4 {
        self.matrix.inverse()
    }

    /// Transform a point from local to world space
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }

    /// Transform a direction vector (ignores translation)
    #[must_use]
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.matrix.transform_vector3(direction)
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_add_remove() {
        let mut world = hecs::World::new();
        let entity1 = world.spawn(());
        let entity2 = world.spawn(());

        let mut children = Children::new();

        children.add(entity1);
        children.add(entity2);
        assert_eq!(children.len(), 2);

        // No duplicates
        children.add(entity1);
        assert_eq!(children.len(), 2);

        assert!(children.remove(entity1));
        assert_eq!(children.len(), 1);
        assert!(!children.remove(entity1));
    }

    #[test]
    fn test_children_insert_keeps_order() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let c = world.spawn(());

        let mut children = Children::new();
        children.add(a);
        children.add(c);
        children.insert(1, b);
        assert_eq!(children.as_slice(), &[a, b, c]);

        // Out of range inserts append
        children.remove(b);
        children.insert(10, b);
        assert_eq!(children.position(b), Some(2));
    }

    #[test]
    fn test_global_transform_decomposition() {
        let rotation = Quat::from_rotation_z(0.5);
        let transform = GlobalTransform::new(Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 4.0),
            rotation,
            Vec3::new(1.0, 2.0, 3.0),
        ));

        assert!((transform.position() - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!((transform.scale() - Vec3::new(2.0, 3.0, 4.0)).length() < 1e-4);
        assert!(transform.rotation().angle_between(rotation) < 1e-4);

        let round_trip = transform.inverse() * transform.matrix;
        assert!(round_trip.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}
