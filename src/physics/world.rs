//! Physics simulation using rapier3d

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, Unit, UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use rustc_hash::FxHashSet;

use super::body::{BodyType, ColliderDesc, CollisionShape, RigidBodyDesc};

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub rapier3d::dynamics::RigidBodyHandle);

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

/// Convert rapier3d UnitQuaternion to glam Quat
fn rapier_to_quat(uq: &UnitQuaternion<f32>) -> Quat {
    let q = uq.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

fn vec_to_rapier(v: Vec3) -> Vector3<f32> {
    vector![v.x, v.y, v.z]
}

fn rapier_to_vec(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn isometry(position: Vec3, rotation: Quat) -> Isometry<f32> {
    Isometry::from_parts(
        Translation3::new(position.x, position.y, position.z),
        quat_to_rapier(rotation),
    )
}

/// Physics world manager
pub struct Physics {
    /// Gravity vector
    pub gravity: Vec3,
    /// Physics pipeline
    pipeline: PhysicsPipeline,
    /// Island manager
    island_manager: IslandManager,
    /// Broad phase
    broad_phase: DefaultBroadPhase,
    /// Narrow phase
    narrow_phase: NarrowPhase,
    /// Rigid body set
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,
    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,
    /// CCD solver
    ccd_solver: CCDSolver,
    /// Query pipeline for raycasting
    query_pipeline: QueryPipeline,
    /// Integration parameters
    integration_parameters: IntegrationParameters,
    /// Pairs reported by the last `begin_contacts` call
    touching: FxHashSet<(ColliderHandle, ColliderHandle)>,
}

impl Physics {
    /// Create a new physics world with default gravity
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, -9.81, 0.0))
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            touching: FxHashSet::default(),
        }
    }

    /// Step the physics simulation
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &vec_to_rapier(self.gravity),
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Refresh the query pipeline without stepping, so raycasts see new colliders
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Number of rigid bodies
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    // ------------------------------------------------------------------------
    // Bodies and colliders
    // ------------------------------------------------------------------------

    /// Create a static rigid body (doesn't move)
    pub fn create_static_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .position(isometry(position, rotation))
            .build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a dynamic rigid body (affected by forces)
    pub fn create_dynamic_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .position(isometry(position, rotation))
            .build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a kinematic rigid body (controlled directly)
    pub fn create_kinematic_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let body = RigidBodyBuilder::kinematic_position_based()
            .position(isometry(position, rotation))
            .build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a body from a description
    pub fn create_body(
        &mut self,
        desc: &RigidBodyDesc,
        position: Vec3,
        rotation: Quat,
    ) -> RigidBodyHandle {
        let builder = match desc.body_type {
            BodyType::Static | BodyType::StaticSensor => RigidBodyBuilder::fixed(),
            BodyType::Dynamic => RigidBodyBuilder::dynamic(),
            BodyType::Kinematic | BodyType::KinematicSensor => {
                RigidBodyBuilder::kinematic_position_based()
            }
        };
        let body = builder
            .position(isometry(position, rotation))
            .gravity_scale(desc.gravity_scale)
            .build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    fn attach(&mut self, body: RigidBodyHandle, collider: Collider) -> ColliderHandle {
        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Add a box collider to a rigid body
    pub fn add_box_collider(
        &mut self,
        body: RigidBodyHandle,
        half_extents: Vec3,
        density: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(density)
            .build();
        self.attach(body, collider)
    }

    /// Add a sphere collider to a rigid body
    pub fn add_sphere_collider(
        &mut self,
        body: RigidBodyHandle,
        radius: f32,
        density: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius).density(density).build();
        self.attach(body, collider)
    }

    /// Add a capsule collider to a rigid body
    pub fn add_capsule_collider(
        &mut self,
        body: RigidBodyHandle,
        half_height: f32,
        radius: f32,
        density: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .density(density)
            .build();
        self.attach(body, collider)
    }

    /// Add a ground plane collider
    pub fn add_ground_plane(&mut self, body: RigidBodyHandle) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(100.0, 0.1, 100.0).build();
        self.attach(body, collider)
    }

    /// Add a collider of any shape. `None` if the shape is degenerate.
    pub fn add_collider(
        &mut self,
        body: RigidBodyHandle,
        shape: &CollisionShape,
        desc: &ColliderDesc,
    ) -> Option<ColliderHandle> {
        let builder = match shape {
            CollisionShape::Box { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            CollisionShape::Sphere { radius } => ColliderBuilder::ball(*radius),
            CollisionShape::Capsule {
                half_height,
                radius,
            } => ColliderBuilder::capsule_y(*half_height, *radius),
            CollisionShape::Cylinder {
                half_height,
                radius,
            } => ColliderBuilder::cylinder(*half_height, *radius),
            CollisionShape::Cone {
                half_height,
                radius,
            } => ColliderBuilder::cone(*half_height, *radius),
            CollisionShape::InfinitePlane { normal } => {
                let normal = Unit::try_new(vec_to_rapier(*normal), f32::EPSILON)?;
                ColliderBuilder::halfspace(normal)
            }
            CollisionShape::ConvexHull { points } => {
                if !spans_volume(points) {
                    return None;
                }
                let points: Vec<Point<f32>> =
                    points.iter().map(|p| point![p.x, p.y, p.z]).collect();
                ColliderBuilder::convex_hull(&points)?
            }
        };

        let groups = InteractionGroups::new(
            Group::from_bits_truncate(desc.group),
            Group::from_bits_truncate(desc.mask),
        );
        let collider = builder
            .mass(desc.mass)
            .friction(desc.friction)
            .restitution(desc.restitution)
            .sensor(desc.sensor)
            .collision_groups(groups)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();

        Some(self.attach(body, collider))
    }

    /// Remove a rigid body and its colliders
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    #[must_use]
    pub fn contains_body(&self, body: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(body.0)
    }

    // ------------------------------------------------------------------------
    // Pose
    // ------------------------------------------------------------------------

    /// Get the position of a rigid body
    pub fn get_position(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| rapier_to_vec(rb.translation()))
    }

    /// Get the rotation of a rigid body
    pub fn get_rotation(&self, body: RigidBodyHandle) -> Option<Quat> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| rapier_to_quat(rb.rotation()))
    }

    /// Set the position of a kinematic body
    pub fn set_kinematic_position(&mut self, body: RigidBodyHandle, position: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_next_kinematic_translation(vec_to_rapier(position));
        }
    }

    /// Set the target pose of a kinematic body for the next step
    pub fn set_kinematic_transform(&mut self, body: RigidBodyHandle, position: Vec3, rotation: Quat) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_next_kinematic_position(isometry(position, rotation));
        }
    }

    /// Teleport a body
    pub fn set_transform(&mut self, body: RigidBodyHandle, position: Vec3, rotation: Quat) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_position(isometry(position, rotation), true);
        }
    }

    // ------------------------------------------------------------------------
    // Forces
    // ------------------------------------------------------------------------

    /// Apply a force to a dynamic body
    pub fn apply_force(&mut self, body: RigidBodyHandle, force: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.add_force(vec_to_rapier(force), true);
        }
    }

    /// Apply a force at an offset from the center of mass
    pub fn apply_force_at_point(&mut self, body: RigidBodyHandle, force: Vec3, offset: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            let point = *rb.center_of_mass() + vec_to_rapier(offset);
            rb.add_force_at_point(vec_to_rapier(force), point, true);
        }
    }

    /// Apply a force through the center of mass
    pub fn apply_central_force(&mut self, body: RigidBodyHandle, force: Vec3) {
        self.apply_force(body, force);
    }

    /// Apply an impulse to a dynamic body
    pub fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.apply_impulse(vec_to_rapier(impulse), true);
        }
    }

    /// Apply an impulse at an offset from the center of mass
    pub fn apply_impulse_at_point(&mut self, body: RigidBodyHandle, impulse: Vec3, offset: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            let point = *rb.center_of_mass() + vec_to_rapier(offset);
            rb.apply_impulse_at_point(vec_to_rapier(impulse), point, true);
        }
    }

    /// Apply an impulse through the center of mass
    pub fn apply_central_impulse(&mut self, body: RigidBodyHandle, impulse: Vec3) {
        self.apply_impulse(body, impulse);
    }

    pub fn apply_torque(&mut self, body: RigidBodyHandle, torque: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.add_torque(vec_to_rapier(torque), true);
        }
    }

    pub fn apply_torque_impulse(&mut self, body: RigidBodyHandle, impulse: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.apply_torque_impulse(vec_to_rapier(impulse), true);
        }
    }

    /// Drop accumulated forces and torques
    pub fn clear_forces(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.reset_forces(true);
            rb.reset_torques(true);
        }
    }

    /// Accumulated user force on a body
    #[must_use]
    pub fn user_force(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| rapier_to_vec(&rb.user_force()))
    }

    // ------------------------------------------------------------------------
    // Velocities and body properties
    // ------------------------------------------------------------------------

    /// Set the linear velocity of a body
    pub fn set_linear_velocity(&mut self, body: RigidBodyHandle, velocity: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_linvel(vec_to_rapier(velocity), true);
        }
    }

    /// Get the linear velocity of a body
    pub fn linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| rapier_to_vec(rb.linvel()))
    }

    pub fn set_angular_velocity(&mut self, body: RigidBodyHandle, velocity: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_angvel(vec_to_rapier(velocity), true);
        }
    }

    pub fn angular_velocity(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| rapier_to_vec(rb.angvel()))
    }

    pub fn set_gravity_scale(&mut self, body: RigidBodyHandle, scale: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_gravity_scale(scale, true);
        }
    }

    /// Enable or lock translation per axis, a non-zero component enables the axis
    pub fn set_linear_factor(&mut self, body: RigidBodyHandle, factor: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_enabled_translations(factor.x != 0.0, factor.y != 0.0, factor.z != 0.0, true);
        }
    }

    /// Enable or lock rotation per axis, a non-zero component enables the axis
    pub fn set_angular_factor(&mut self, body: RigidBodyHandle, factor: Vec3) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_enabled_rotations(factor.x != 0.0, factor.y != 0.0, factor.z != 0.0, true);
        }
    }

    /// Take a body out of the simulation without removing it
    pub fn set_body_enabled(&mut self, body: RigidBodyHandle, enabled: bool) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_enabled(enabled);
        }
    }

    #[must_use]
    pub fn is_body_enabled(&self, body: RigidBodyHandle) -> bool {
        self.rigid_body_set.get(body.0).is_some_and(|rb| rb.is_enabled())
    }

    #[must_use]
    pub fn mass(&self, body: RigidBodyHandle) -> Option<f32> {
        self.rigid_body_set.get(body.0).map(|rb| rb.mass())
    }

    pub fn set_body_user_data(&mut self, body: RigidBodyHandle, data: u128) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.user_data = data;
        }
    }

    #[must_use]
    pub fn body_user_data(&self, body: RigidBodyHandle) -> Option<u128> {
        self.rigid_body_set.get(body.0).map(|rb| rb.user_data)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Body a collider is attached to
    #[must_use]
    pub fn body_of_collider(&self, collider: ColliderHandle) -> Option<RigidBodyHandle> {
        self.collider_set
            .get(collider.0)
            .and_then(|c| c.parent())
            .map(RigidBodyHandle)
    }

    /// Collider pairs touching (or overlapping, for sensors) after the last step
    #[must_use]
    pub fn contacts(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        let touching = self
            .narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .map(|pair| (ColliderHandle(pair.collider1), ColliderHandle(pair.collider2)));
        let overlapping = self
            .narrow_phase
            .intersection_pairs()
            .filter(|(_, _, intersecting)| *intersecting)
            .map(|(a, b, _)| (ColliderHandle(a), ColliderHandle(b)));
        touching.chain(overlapping).collect()
    }

    /// Pairs that started touching since the previous call
    pub fn begin_contacts(&mut self) -> Vec<(ColliderHandle, ColliderHandle)> {
        let current: FxHashSet<_> = self.contacts().into_iter().collect();
        let started = current
            .iter()
            .filter(|pair| !self.touching.contains(pair))
            .copied()
            .collect();
        self.touching = current;
        started
    }

    /// Cast a ray and return the first hit
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastHit> {
        let direction = direction.try_normalize()?;
        let ray = Ray::new(point![origin.x, origin.y, origin.z], vec_to_rapier(direction));

        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                QueryFilter::default(),
            )
            .map(|(handle, distance)| {
                let point = ray.point_at(distance);
                RaycastHit {
                    collider: ColliderHandle(handle),
                    point: Vec3::new(point.x, point.y, point.z),
                    distance,
                }
            })
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a raycast
#[derive(Debug, Clone)]
pub struct RaycastHit {
    /// The collider that was hit
    pub collider: ColliderHandle,
    /// The point of intersection
    pub point: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

/// Whether a point cloud has four points that are not coplanar
fn spans_volume(points: &[Vec3]) -> bool {
    const EPSILON: f32 = 1e-6;

    if points.len() < 4 || points.iter().any(|p| !p.is_finite()) {
        return false;
    }
    let origin = points[0];
    let Some(edge) = points.iter().map(|&p| p - origin).find(|e| e.length_squared() > EPSILON) else {
        return false;
    };
    let Some(normal) = points
        .iter()
        .map(|&p| edge.cross(p - origin))
        .find(|n| n.length_squared() > EPSILON)
    else {
        return false;
    };
    points.iter().any(|&p| normal.dot(p - origin).abs() > EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 60.0;

    #[test]
    fn test_dynamic_body_falls() {
        let mut physics = Physics::new();
        let body = physics.create_dynamic_body(Vec3::new(0.0, 10.0, 0.0), Quat::IDENTITY);
        physics.add_sphere_collider(body, 0.5, 1.0);

        for _ in 0..30 {
            physics.step(STEP);
        }
        let y = physics.get_position(body).unwrap().y;
        assert!(y < 10.0, "body should fall, y = {y}");
    }

    #[test]
    fn test_static_body_stays() {
        let mut physics = Physics::new();
        let body = physics.create_static_body(Vec3::ZERO, Quat::IDENTITY);
        physics.add_ground_plane(body);

        physics.step(STEP);
        assert_eq!(physics.get_position(body), Some(Vec3::ZERO));
    }

    #[test]
    fn test_convex_hull_needs_points() {
        let mut physics = Physics::new();
        let body = physics.create_dynamic_body(Vec3::ZERO, Quat::IDENTITY);

        let empty = CollisionShape::ConvexHull { points: Vec::new() };
        assert!(physics.add_collider(body, &empty, &ColliderDesc::default()).is_none());

        let flat = CollisionShape::ConvexHull {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::new(1.0, 0.0, 1.0)],
        };
        assert!(physics.add_collider(body, &flat, &ColliderDesc::default()).is_none());

        let line = CollisionShape::ConvexHull {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0, Vec3::X * 3.0, Vec3::X * 4.0],
        };
        assert!(physics.add_collider(body, &line, &ColliderDesc::default()).is_none());

        let tetrahedron = CollisionShape::ConvexHull {
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
        };
        assert!(physics.add_collider(body, &tetrahedron, &ColliderDesc::default()).is_some());

        let plane = CollisionShape::InfinitePlane { normal: Vec3::ZERO };
        assert!(physics.add_collider(body, &plane, &ColliderDesc::default()).is_none());

        let cone = CollisionShape::Cone { half_height: 1.0, radius: 0.5 };
        assert!(physics.add_collider(body, &cone, &ColliderDesc::default()).is_some());
    }

    #[test]
    fn test_contacts_reported_once_per_touch() {
        let mut physics = Physics::with_gravity(Vec3::ZERO);
        let zone = physics.create_static_body(Vec3::ZERO, Quat::IDENTITY);
        let sensor = ColliderDesc { sensor: true, ..ColliderDesc::default() };
        physics
            .add_collider(zone, &CollisionShape::Sphere { radius: 2.0 }, &sensor)
            .unwrap();
        let body = physics.create_dynamic_body(Vec3::ZERO, Quat::IDENTITY);
        physics
            .add_collider(body, &CollisionShape::Sphere { radius: 0.5 }, &ColliderDesc::default())
            .unwrap();

        physics.step(STEP);
        assert_eq!(physics.begin_contacts().len(), 1);
        physics.step(STEP);
        assert!(physics.begin_contacts().is_empty());
        assert_eq!(physics.contacts().len(), 1);

        physics.set_transform(body, Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY);
        physics.step(STEP);
        assert!(physics.begin_contacts().is_empty());

        physics.set_transform(body, Vec3::ZERO, Quat::IDENTITY);
        physics.step(STEP);
        assert_eq!(physics.begin_contacts().len(), 1);
    }

    #[test]
    fn test_velocities_and_impulses() {
        let mut physics = Physics::with_gravity(Vec3::ZERO);
        let body = physics.create_dynamic_body(Vec3::ZERO, Quat::IDENTITY);
        physics.add_box_collider(body, Vec3::splat(0.5), 1.0);

        physics.set_angular_velocity(body, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(physics.angular_velocity(body), Some(Vec3::new(0.0, 2.0, 0.0)));

        physics.apply_central_impulse(body, Vec3::X);
        let velocity = physics.linear_velocity(body).unwrap();
        assert!(velocity.x > 0.0);
    }

    #[test]
    fn test_forces_accumulate_and_clear() {
        let mut physics = Physics::with_gravity(Vec3::ZERO);
        let body = physics.create_dynamic_body(Vec3::ZERO, Quat::IDENTITY);
        physics.add_sphere_collider(body, 0.5, 1.0);

        physics.apply_force(body, Vec3::X);
        physics.apply_force_at_point(body, Vec3::X, Vec3::Y);
        assert_eq!(physics.user_force(body), Some(Vec3::new(2.0, 0.0, 0.0)));

        physics.clear_forces(body);
        assert_eq!(physics.user_force(body), Some(Vec3::ZERO));
    }

    #[test]
    fn test_locked_translation() {
        let mut physics = Physics::new();
        let body = physics.create_dynamic_body(Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY);
        physics.add_sphere_collider(body, 0.5, 1.0);
        physics.set_linear_factor(body, Vec3::new(1.0, 0.0, 1.0));

        for _ in 0..10 {
            physics.step(STEP);
        }
        let y = physics.get_position(body).unwrap().y;
        assert!((y - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_raycast_hits_collider() {
        let mut physics = Physics::new();
        let body = physics.create_static_body(Vec3::ZERO, Quat::IDENTITY);
        let collider = physics.add_box_collider(body, Vec3::ONE, 1.0);
        physics.update_queries();

        let hit = physics
            .raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, 100.0)
            .unwrap();
        assert_eq!(hit.collider, collider);
        assert!((hit.distance - 9.0).abs() < 1e-4);
        assert_eq!(physics.body_of_collider(collider), Some(body));
        assert!(physics.raycast(Vec3::ZERO, Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn test_remove_body() {
        let mut physics = Physics::new();
        let body = physics.create_dynamic_body(Vec3::ZERO, Quat::IDENTITY);
        physics.set_body_user_data(body, 7);
        assert_eq!(physics.body_user_data(body), Some(7));

        physics.remove_body(body);
        assert!(!physics.contains_body(body));
        assert_eq!(physics.body_user_data(body), None);
    }

    #[test]
    fn test_create_body_from_desc() {
        let mut physics = Physics::new();
        let desc = RigidBodyDesc::new(BodyType::Kinematic);
        let body = physics.create_body(&desc, Vec3::ONE, Quat::IDENTITY);
        physics.set_kinematic_transform(body, Vec3::new(2.0, 1.0, 1.0), Quat::IDENTITY);
        physics.step(STEP);
        assert_eq!(physics.get_position(body), Some(Vec3::new(2.0, 1.0, 1.0)));
    }
}
