//! Local transforms and cached global transforms

use glam::{Mat4, Quat, Vec3, Vec4};
use hecs::Entity;

use super::Scene;
use crate::ecs::{Children, GlobalTransform, ObjectFlags, Transform};

impl Scene {
    // ========================================================================
    // Local setters
    // ========================================================================

    fn modify_transform(&mut self, entity: Entity, f: impl FnOnce(&mut Transform)) -> &mut Self {
        let changed = match self.world.get_mut::<Transform>(entity) {
            Ok(mut transform) => {
                f(&mut transform);
                true
            }
            Err(_) => false,
        };
        if changed {
            self.mark_transform_dirty(entity);
        }
        self
    }

    pub fn set_position(&mut self, entity: Entity, position: Vec3) -> &mut Self {
        self.modify_transform(entity, |t| t.position = position)
    }

    pub fn set_rotation(&mut self, entity: Entity, rotation: Quat) -> &mut Self {
        self.modify_transform(entity, |t| t.rotation = rotation.normalize())
    }

    /// Set rotation from XYZ euler angles in radians
    pub fn set_rotation_euler(&mut self, entity: Entity, euler: Vec3) -> &mut Self {
        self.set_rotation(entity, Transform::euler_to_quat(euler))
    }

    pub fn set_scale(&mut self, entity: Entity, scale: Vec3) -> &mut Self {
        self.modify_transform(entity, |t| t.scale = scale)
    }

    pub fn set_uniform_scale(&mut self, entity: Entity, scale: f32) -> &mut Self {
        self.set_scale(entity, Vec3::splat(scale))
    }

    /// Add to the local position
    pub fn move_by(&mut self, entity: Entity, delta: Vec3) -> &mut Self {
        self.modify_transform(entity, |t| t.translate(delta))
    }

    /// Apply a rotation in local space
    pub fn rotate(&mut self, entity: Entity, delta: Quat) -> &mut Self {
        self.modify_transform(entity, |t| t.rotate(delta))
    }

    pub fn rotate_euler(&mut self, entity: Entity, euler: Vec3) -> &mut Self {
        self.rotate(entity, Transform::euler_to_quat(euler))
    }

    /// Multiply the local scale component-wise
    pub fn scale_by(&mut self, entity: Entity, factor: Vec3) -> &mut Self {
        self.modify_transform(entity, |t| t.scale *= factor)
    }

    /// Turn the object's front towards `point`, keeping it upright relative to `up`
    pub fn look_at(&mut self, entity: Entity, point: Vec3, up: Vec3) -> &mut Self {
        let Some(direction) = (point - self.global_position(entity)).try_normalize() else {
            return self;
        };

        let facing = Quat::from_rotation_arc(Transform::FRONT, direction);
        let Some(target_up) = direction.cross(up).cross(direction).try_normalize() else {
            return self.set_rotation(entity, facing);
        };

        let current_up = (facing * Transform::UP).normalize();
        let roll = Quat::from_rotation_arc(current_up, target_up);
        self.set_rotation(entity, roll * facing)
    }

    // ========================================================================
    // Local getters
    // ========================================================================

    #[must_use]
    pub fn local_transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get_copied::<Transform>(entity)
    }

    #[must_use]
    pub fn position(&self, entity: Entity) -> Vec3 {
        self.local_transform(entity).map_or(Vec3::ZERO, |t| t.position)
    }

    #[must_use]
    pub fn rotation(&self, entity: Entity) -> Quat {
        self.local_transform(entity).map_or(Quat::IDENTITY, |t| t.rotation)
    }

    #[must_use]
    pub fn scale(&self, entity: Entity) -> Vec3 {
        self.local_transform(entity).map_or(Vec3::ONE, |t| t.scale)
    }

    #[must_use]
    pub fn local_front(&self, entity: Entity) -> Vec3 {
        self.rotation(entity) * Transform::FRONT
    }

    #[must_use]
    pub fn local_right(&self, entity: Entity) -> Vec3 {
        self.rotation(entity) * Transform::RIGHT
    }

    #[must_use]
    pub fn local_up(&self, entity: Entity) -> Vec3 {
        self.rotation(entity) * Transform::UP
    }

    // ========================================================================
    // Global transforms
    // ========================================================================

    /// Mark an object and all of its descendants for recomputation
    pub fn mark_transform_dirty(&mut self, entity: Entity) {
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            self.update_flags(current, |f| f.insert(ObjectFlags::TRANSFORM_DIRTY));
            if let Ok(children) = self.world.get::<Children>(current) {
                stack.extend(children.iter().copied());
            }
        }
    }

    /// World matrix of an object, computed from its ancestors if stale
    #[must_use]
    pub fn global_matrix(&self, entity: Entity) -> Mat4 {
        if !self.flags(entity).contains(ObjectFlags::TRANSFORM_DIRTY)
            && let Some(global) = self.world.get_copied::<GlobalTransform>(entity)
        {
            return global.matrix;
        }
        self.compute_global(entity)
    }

    fn compute_global(&self, entity: Entity) -> Mat4 {
        let local = self.local_transform(entity).unwrap_or_default();
        let flags = self.flags(entity);

        let parent = match self.parent(entity) {
            Some(parent) if !flags.contains(ObjectFlags::IGNORE_PARENT) => parent,
            _ => return local.matrix(),
        };

        let mut parent_matrix = self.global_matrix(parent);
        let mut position = local.position;

        let scale_axes = [
            ObjectFlags::IGNORE_SCALE_X,
            ObjectFlags::IGNORE_SCALE_Y,
            ObjectFlags::IGNORE_SCALE_Z,
        ];
        for (axis, flag) in scale_axes.into_iter().enumerate() {
            if flags.contains(flag) {
                let column = parent_matrix.col(axis).truncate().normalize_or_zero();
                *parent_matrix.col_mut(axis) = column.extend(0.0);
            }
        }

        if flags.contains(ObjectFlags::IGNORE_ROTATION) {
            let (_, rotation, _) = parent_matrix.to_scale_rotation_translation();
            position = rotation * position;

            let lengths = Vec3::new(
                parent_matrix.x_axis.truncate().length(),
                parent_matrix.y_axis.truncate().length(),
                parent_matrix.z_axis.truncate().length(),
            );
            parent_matrix.x_axis = Vec4::new(lengths.x, 0.0, 0.0, 0.0);
            parent_matrix.y_axis = Vec4::new(0.0, lengths.y, 0.0, 0.0);
            parent_matrix.z_axis = Vec4::new(0.0, 0.0, lengths.z, 0.0);
        }

        let translation_axes = [
            ObjectFlags::IGNORE_TRANSLATION_X,
            ObjectFlags::IGNORE_TRANSLATION_Y,
            ObjectFlags::IGNORE_TRANSLATION_Z,
        ];
        for (axis, flag) in translation_axes.into_iter().enumerate() {
            if flags.contains(flag) {
                parent_matrix.w_axis[axis] = 0.0;
                position[axis] = local.position[axis];
            }
        }

        parent_matrix * Mat4::from_scale_rotation_translation(local.scale, local.rotation, position)
    }

    #[must_use]
    pub fn inverse_global_matrix(&self, entity: Entity) -> Mat4 {
        self.global_matrix(entity).inverse()
    }

    #[must_use]
    pub fn global_transform(&self, entity: Entity) -> GlobalTransform {
        GlobalTransform::new(self.global_matrix(entity))
    }

    #[must_use]
    pub fn global_position(&self, entity: Entity) -> Vec3 {
        self.global_transform(entity).position()
    }

    #[must_use]
    pub fn global_rotation(&self, entity: Entity) -> Quat {
        self.global_transform(entity).rotation()
    }

    #[must_use]
    pub fn global_scale(&self, entity: Entity) -> Vec3 {
        self.global_transform(entity).scale()
    }

    #[must_use]
    pub fn global_front(&self, entity: Entity) -> Vec3 {
        self.global_rotation(entity) * Transform::FRONT
    }

    #[must_use]
    pub fn global_right(&self, entity: Entity) -> Vec3 {
        self.global_rotation(entity) * Transform::RIGHT
    }

    #[must_use]
    pub fn global_up(&self, entity: Entity) -> Vec3 {
        self.global_rotation(entity) * Transform::UP
    }

    /// Recompute and cache every dirty global transform, parents first
    pub fn update_transform_tree(&mut self) {
        let mut stack = vec![self.root];
        while let Some(entity) = stack.pop() {
            if self.flags(entity).contains(ObjectFlags::TRANSFORM_DIRTY) {
                let matrix = self.compute_global(entity);
                if let Ok(mut global) = self.world.get_mut::<GlobalTransform>(entity) {
                    global.matrix = matrix;
                }
                self.update_flags(entity, |f| f.remove(ObjectFlags::TRANSFORM_DIRTY));
            }
            if let Ok(children) = self.world.get::<Children>(entity) {
                stack.extend(children.as_slice().iter().rev().copied());
            }
        }
    }

    // ========================================================================
    // Ignore rules
    // ========================================================================

    /// Detach the global transform from the parent entirely
    pub fn set_ignore_parent(&mut self, entity: Entity, ignore: bool) -> &mut Self {
        self.update_flags(entity, |f| f.set(ObjectFlags::IGNORE_PARENT, ignore));
        self.mark_transform_dirty(entity);
        self
    }

    #[must_use]
    pub fn ignores_parent(&self, entity: Entity) -> bool {
        self.flags(entity).contains(ObjectFlags::IGNORE_PARENT)
    }

    /// Replace the per-axis ignore bits
    pub fn set_ignore_transform(&mut self, entity: Entity, ignore: ObjectFlags) -> &mut Self {
        self.update_flags(entity, |f| {
            f.remove(ObjectFlags::IGNORE_MASK);
            f.insert(ignore.intersection(ObjectFlags::IGNORE_MASK));
        });
        self.mark_transform_dirty(entity);
        self
    }

    #[must_use]
    pub fn ignore_flags(&self, entity: Entity) -> ObjectFlags {
        self.flags(entity).intersection(ObjectFlags::IGNORE_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-5;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPS
    }

    fn parent_and_child() -> (Scene, Entity, Entity) {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let parent = scene.create_child(root, "parent").unwrap();
        let child = scene.create_child(parent, "child").unwrap();
        (scene, parent, child)
    }

    #[test]
    fn test_global_composes_parent() {
        let (mut scene, parent, child) = parent_and_child();
        scene
            .set_position(parent, Vec3::new(1.0, 0.0, 0.0))
            .set_uniform_scale(parent, 2.0)
            .set_position(child, Vec3::new(0.0, 1.0, 0.0));

        assert!(close(scene.global_position(child), Vec3::new(1.0, 2.0, 0.0)));
        assert!(close(scene.global_scale(child), Vec3::splat(2.0)));
    }

    #[test]
    fn test_global_never_stale() {
        let (mut scene, parent, child) = parent_and_child();
        scene.update_transform_tree();
        assert!(close(scene.global_position(child), Vec3::ZERO));

        // No tree update in between
        scene.move_by(parent, Vec3::new(0.0, 0.0, 4.0));
        assert!(close(scene.global_position(child), Vec3::new(0.0, 0.0, 4.0)));

        scene.update_transform_tree();
        assert!(!scene.flags(child).contains(ObjectFlags::TRANSFORM_DIRTY));
        assert!(close(scene.global_position(child), Vec3::new(0.0, 0.0, 4.0)));
    }

    #[test]
    fn test_ignore_parent() {
        let (mut scene, parent, child) = parent_and_child();
        scene.set_position(parent, Vec3::splat(10.0));
        scene.set_position(child, Vec3::X);
        scene.set_ignore_parent(child, true);

        assert!(scene.ignores_parent(child));
        assert!(close(scene.global_position(child), Vec3::X));
    }

    #[test]
    fn test_ignore_scale() {
        let (mut scene, parent, child) = parent_and_child();
        scene.set_uniform_scale(parent, 3.0).set_position(child, Vec3::X);
        scene.set_ignore_transform(child, ObjectFlags::IGNORE_SCALE);

        assert!(close(scene.global_position(child), Vec3::X));
        assert!(close(scene.global_scale(child), Vec3::ONE));
        assert_eq!(scene.ignore_flags(child), ObjectFlags::IGNORE_SCALE);
    }

    #[test]
    fn test_ignore_rotation() {
        let (mut scene, parent, child) = parent_and_child();
        scene
            .set_rotation(parent, Quat::from_rotation_y(FRAC_PI_2))
            .set_uniform_scale(parent, 2.0)
            .set_position(child, Vec3::X);
        scene.set_ignore_transform(child, ObjectFlags::IGNORE_ROTATION);

        assert!(close(scene.global_position(child), Vec3::new(0.0, 0.0, -2.0)));
        assert!(scene.global_rotation(child).angle_between(Quat::IDENTITY) < 1e-4);
    }

    #[test]
    fn test_ignore_translation_axis() {
        let (mut scene, parent, child) = parent_and_child();
        scene
            .set_position(parent, Vec3::new(1.0, 5.0, 0.0))
            .set_position(child, Vec3::Y);
        scene.set_ignore_transform(child, ObjectFlags::IGNORE_TRANSLATION_Y);

        assert!(close(scene.global_position(child), Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_set_ignore_transform_masks_other_bits() {
        let (mut scene, _, child) = parent_and_child();
        scene.set_ignore_transform(child, ObjectFlags::IGNORE_ROTATION | ObjectFlags::REMOVED);
        assert_eq!(scene.ignore_flags(child), ObjectFlags::IGNORE_ROTATION);
        assert!(!scene.is_removed(child));
    }

    #[test]
    fn test_local_setters() {
        let (mut scene, parent, _) = parent_and_child();
        scene
            .set_scale(parent, Vec3::new(1.0, 2.0, 3.0))
            .scale_by(parent, Vec3::splat(2.0))
            .rotate_euler(parent, Vec3::new(0.0, FRAC_PI_2, 0.0));

        assert!(close(scene.scale(parent), Vec3::new(2.0, 4.0, 6.0)));
        assert!(close(scene.local_front(parent), Vec3::NEG_X));
        assert!(close(scene.local_right(parent), Vec3::NEG_Z));
        assert!(close(scene.local_up(parent), Vec3::Y));
    }

    #[test]
    fn test_look_at() {
        let (mut scene, parent, _) = parent_and_child();
        scene.look_at(parent, Vec3::new(5.0, 0.0, 0.0), Vec3::Y);
        assert!(close(scene.global_front(parent), Vec3::X));
        assert!(close(scene.global_up(parent), Vec3::Y));

        // Degenerate target leaves the rotation alone
        let before = scene.rotation(parent);
        scene.look_at(parent, Vec3::ZERO, Vec3::Y);
        assert_eq!(scene.rotation(parent), before);
    }

    #[test]
    fn test_look_at_parallel_up() {
        let (mut scene, parent, _) = parent_and_child();
        scene.look_at(parent, Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
        assert!(close(scene.global_front(parent), Vec3::Y));
    }

    #[test]
    fn test_inverse_global_matrix() {
        let (mut scene, parent, child) = parent_and_child();
        scene.set_position(parent, Vec3::new(2.0, 3.0, 4.0)).set_position(child, Vec3::X);

        let world = scene.global_matrix(child);
        let product = world * scene.inverse_global_matrix(child);
        assert!(product.abs_diff_eq(Mat4::IDENTITY, EPS));
    }

    #[test]
    fn test_missing_entity_defaults() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let gone = scene.create_child(root, "gone").unwrap();
        scene.despawn_object(gone).unwrap();

        scene.set_position(gone, Vec3::ONE);
        assert_eq!(scene.position(gone), Vec3::ZERO);
        assert_eq!(scene.scale(gone), Vec3::ONE);
        assert!(scene.local_transform(gone).is_none());
    }
}
