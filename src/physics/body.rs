//! Rigid bodies bound to scene objects

use glam::Vec3;
use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::{ColliderHandle, RigidBodyHandle};
use crate::core::EngineEvent;
use crate::ecs::ObjectKey;
use crate::scene::{Scene, SceneError};

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves
    Static,
    /// Moved by forces and collisions
    Dynamic,
    /// Moved by its object's transform
    Kinematic,
    /// Static trigger volume without contact response
    StaticSensor,
    /// Kinematic trigger volume without contact response
    KinematicSensor,
}

impl BodyType {
    #[must_use]
    pub const fn is_sensor(self) -> bool {
        matches!(self, Self::StaticSensor | Self::KinematicSensor)
    }

    #[must_use]
    pub const fn is_kinematic(self) -> bool {
        matches!(self, Self::Kinematic | Self::KinematicSensor)
    }

    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

/// Collision geometry, in the body's local space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Capsule along Y
    Capsule { half_height: f32, radius: f32 },
    /// Cylinder along Y
    Cylinder { half_height: f32, radius: f32 },
    /// Cone along Y
    Cone { half_height: f32, radius: f32 },
    /// Half-space below a plane through the origin
    InfinitePlane { normal: Vec3 },
    ConvexHull { points: Vec<Vec3> },
}

/// Collider material and filtering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderDesc {
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Overlap reporting only, no contact response
    pub sensor: bool,
    /// Collision group bits this collider belongs to
    pub group: u32,
    /// Collision group bits this collider interacts with
    pub mask: u32,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        Self {
            mass: 1.0,
            friction: 0.5,
            restitution: 0.0,
            sensor: false,
            group: 1,
            mask: 1,
        }
    }
}

/// Everything needed to create a body for an object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyDesc {
    pub body_type: BodyType,
    /// Only used by dynamic bodies
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub gravity_scale: f32,
    pub group: u32,
    pub mask: u32,
}

impl RigidBodyDesc {
    #[must_use]
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            mass: 1.0,
            friction: 0.5,
            restitution: 0.0,
            gravity_scale: 1.0,
            group: 1,
            mask: 1,
        }
    }

    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    #[must_use]
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    #[must_use]
    pub fn with_groups(mut self, group: u32, mask: u32) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Collider settings implied by the body type. Non-dynamic bodies are massless.
    #[must_use]
    pub fn collider_desc(&self) -> ColliderDesc {
        ColliderDesc {
            mass: if self.body_type.is_dynamic() { self.mass } else { 0.0 },
            friction: self.friction,
            restitution: self.restitution,
            sensor: self.body_type.is_sensor(),
            group: self.group,
            mask: self.mask,
        }
    }
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self::new(BodyType::Dynamic)
    }
}

/// Physics body attached to a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigidBody {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub body_type: BodyType,
}

/// Raycast result resolved to a scene object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneRayHit {
    pub entity: Entity,
    pub point: Vec3,
    pub distance: f32,
}

impl Scene {
    /// Give an object a rigid body at its current global pose.
    ///
    /// Static and dynamic bodies take over the object's transform, so the
    /// object stops following its parent. An existing body is replaced.
    pub fn add_rigid_body(
        &mut self,
        entity: Entity,
        shape: &CollisionShape,
        desc: &RigidBodyDesc,
    ) -> Result<RigidBody, SceneError> {
        let key = self.object_key(entity).ok_or(SceneError::NoSuchObject)?;
        self.remove_rigid_body(entity);

        let position = self.global_position(entity);
        let rotation = self.global_rotation(entity);

        let physics = self.physics_mut();
        let body = physics.create_body(desc, position, rotation);
        physics.set_body_user_data(body, u128::from(key.0));
        let Some(collider) = physics.add_collider(body, shape, &desc.collider_desc()) else {
            physics.remove_body(body);
            return Err(SceneError::InvalidShape);
        };
        physics.update_queries();

        if matches!(desc.body_type, BodyType::Static | BodyType::Dynamic) {
            self.set_ignore_parent(entity, true)
                .set_position(entity, position)
                .set_rotation(entity, rotation);
        }

        let rigid_body = RigidBody {
            body,
            collider,
            body_type: desc.body_type,
        };
        self.world_mut()
            .insert_one(entity, rigid_body)
            .map_err(|_| SceneError::NoSuchObject)?;
        Ok(rigid_body)
    }

    #[must_use]
    pub fn rigid_body(&self, entity: Entity) -> Option<RigidBody> {
        self.world().get_copied::<RigidBody>(entity)
    }

    /// Drop an object's body, returns whether it had one
    pub fn remove_rigid_body(&mut self, entity: Entity) -> bool {
        match self.world_mut().remove_one::<RigidBody>(entity) {
            Some(rigid_body) => {
                self.physics_mut().remove_body(rigid_body.body);
                true
            }
            None => false,
        }
    }

    /// Object owning a body, via the key stored in the body's user data
    #[must_use]
    pub fn entity_of_body(&self, body: RigidBodyHandle) -> Option<Entity> {
        let data = self.physics().body_user_data(body)?;
        let key = ObjectKey(u64::try_from(data).ok()?);
        self.entity_by_key(key)
    }

    #[must_use]
    pub fn entity_of_collider(&self, collider: ColliderHandle) -> Option<Entity> {
        self.entity_of_body(self.physics().body_of_collider(collider)?)
    }

    /// Cast a ray through the scene's physics world
    #[must_use]
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<SceneRayHit> {
        let hit = self.physics().raycast(origin, direction, max_distance)?;
        Some(SceneRayHit {
            entity: self.entity_of_collider(hit.collider)?,
            point: hit.point,
            distance: hit.distance,
        })
    }

    fn bodies(&self) -> Vec<(Entity, RigidBody)> {
        self.world()
            .query::<&RigidBody>()
            .iter()
            .map(|(entity, body)| (entity, *body))
            .collect()
    }

    /// Move kinematic bodies to their objects' global poses
    pub(crate) fn push_kinematic_targets(&mut self) {
        for (entity, body) in self.bodies() {
            if body.body_type.is_kinematic() {
                let position = self.global_position(entity);
                let rotation = self.global_rotation(entity);
                self.physics_mut()
                    .set_kinematic_transform(body.body, position, rotation);
            }
        }
    }

    /// Copy simulated poses of dynamic bodies back into their objects
    pub(crate) fn pull_dynamic_poses(&mut self) {
        for (entity, body) in self.bodies() {
            if !body.body_type.is_dynamic() {
                continue;
            }
            let physics = self.physics();
            if let (Some(position), Some(rotation)) =
                (physics.get_position(body.body), physics.get_rotation(body.body))
            {
                self.set_position(entity, position)
                    .set_rotation(entity, rotation);
            }
        }
    }

    /// Turn newly touching collider pairs into collision events
    pub(crate) fn report_contacts(&mut self) {
        for (a, b) in self.physics_mut().begin_contacts() {
            let keys = (
                self.entity_of_collider(a).and_then(|e| self.object_key(e)),
                self.entity_of_collider(b).and_then(|e| self.object_key(e)),
            );
            if let (Some(a), Some(b)) = keys {
                let scene = self.id().to_string();
                self.push_event(EngineEvent::Collision { scene, a, b });
            }
        }
    }

    /// Keep a body's pose in sync after its object was moved by hand
    pub fn sync_body_to_object(&mut self, entity: Entity) {
        if let Some(body) = self.rigid_body(entity) {
            let position = self.global_position(entity);
            let rotation = self.global_rotation(entity);
            self.physics_mut().set_transform(body.body, position, rotation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 60.0;

    fn scene_with_ground() -> (Scene, Entity) {
        let mut scene = Scene::new("physics");
        let root = scene.root();
        let ground = scene.create_child(root, "ground").unwrap();
        scene
            .add_rigid_body(
                ground,
                &CollisionShape::Box { half_extents: Vec3::new(50.0, 0.5, 50.0) },
                &RigidBodyDesc::new(BodyType::Static),
            )
            .unwrap();
        (scene, ground)
    }

    #[test]
    fn test_dynamic_body_moves_object() {
        let (mut scene, _) = scene_with_ground();
        let root = scene.root();
        let crate_box = scene.create_child(root, "box").unwrap();
        scene.set_position(crate_box, Vec3::new(0.0, 5.0, 0.0));
        scene
            .add_rigid_body(
                crate_box,
                &CollisionShape::Box { half_extents: Vec3::splat(0.5) },
                &RigidBodyDesc::default(),
            )
            .unwrap();
        assert!(scene.ignores_parent(crate_box));

        for _ in 0..20 {
            scene.fixed_update(STEP);
        }
        assert!(scene.position(crate_box).y < 5.0);
    }

    #[test]
    fn test_body_keeps_global_pose() {
        let mut scene = Scene::new("physics");
        let root = scene.root();
        let parent = scene.create_child(root, "parent").unwrap();
        let child = scene.create_child(parent, "child").unwrap();
        scene.set_position(parent, Vec3::new(3.0, 0.0, 0.0));
        scene.set_position(child, Vec3::new(0.0, 1.0, 0.0));

        scene
            .add_rigid_body(child, &CollisionShape::Sphere { radius: 0.5 }, &RigidBodyDesc::default())
            .unwrap();
        assert!((scene.global_position(child) - Vec3::new(3.0, 1.0, 0.0)).length() < 1e-5);
        assert_eq!(scene.position(child), Vec3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn test_kinematic_follows_object() {
        let mut scene = Scene::new("physics");
        let root = scene.root();
        let platform = scene.create_child(root, "platform").unwrap();
        let body = scene
            .add_rigid_body(
                platform,
                &CollisionShape::Cylinder { half_height: 0.1, radius: 2.0 },
                &RigidBodyDesc::new(BodyType::Kinematic),
            )
            .unwrap();
        assert!(!scene.ignores_parent(platform));

        scene.set_position(platform, Vec3::new(0.0, 2.0, 0.0));
        scene.fixed_update(STEP);
        let position = scene.physics().get_position(body.body).unwrap();
        assert!((position - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_collision_events() {
        let (mut scene, ground) = scene_with_ground();
        let root = scene.root();
        let ball = scene.create_child(root, "ball").unwrap();
        scene.set_position(ball, Vec3::new(0.0, 0.9, 0.0));
        scene
            .add_rigid_body(ball, &CollisionShape::Sphere { radius: 0.5 }, &RigidBodyDesc::default())
            .unwrap();
        scene.drain_events();

        for _ in 0..10 {
            scene.fixed_update(STEP);
        }
        let ground_key = scene.object_key(ground).unwrap();
        let ball_key = scene.object_key(ball).unwrap();
        let collisions = scene
            .drain_events()
            .iter()
            .filter(|event| {
                matches!(event, EngineEvent::Collision { a, b, .. }
                    if (*a == ground_key && *b == ball_key) || (*a == ball_key && *b == ground_key))
            })
            .count();
        assert!(collisions >= 1);
    }

    #[test]
    fn test_raycast_resolves_object() {
        let (scene, ground) = scene_with_ground();
        let hit = scene
            .raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 100.0)
            .unwrap();
        assert_eq!(hit.entity, ground);
        assert!((hit.distance - 9.5).abs() < 1e-4);
    }

    #[test]
    fn test_despawn_removes_body() {
        let (mut scene, ground) = scene_with_ground();
        let body = scene.rigid_body(ground).unwrap();

        scene.despawn_object(ground).unwrap();
        assert!(!scene.physics().contains_body(body.body));
    }

    #[test]
    fn test_invalid_shape() {
        let mut scene = Scene::new("physics");
        let root = scene.root();
        let object = scene.create_child(root, "object").unwrap();
        let result = scene.add_rigid_body(
            object,
            &CollisionShape::ConvexHull { points: Vec::new() },
            &RigidBodyDesc::default(),
        );
        assert_eq!(result, Err(SceneError::InvalidShape));
        assert_eq!(scene.physics().body_count(), 0);
        assert!(scene.rigid_body(object).is_none());
    }

    #[test]
    fn test_sensor_desc() {
        let desc = RigidBodyDesc::new(BodyType::StaticSensor).with_mass(5.0);
        let collider = desc.collider_desc();
        assert!(collider.sensor);
        assert_eq!(collider.mass, 0.0);
        assert!(!RigidBodyDesc::default().collider_desc().sensor);
    }
}
