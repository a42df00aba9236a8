//! Physics simulation module
//!
//! Built on top of rapier3d. Every scene owns a `Physics` world; objects get a
//! body through `Scene::add_rigid_body` and are kept in sync by
//! `Scene::fixed_update`.

mod body;
mod world;

pub use body::{BodyType, ColliderDesc, CollisionShape, RigidBody, RigidBodyDesc, SceneRayHit};
pub use world::{ColliderHandle, Physics, RaycastHit, RigidBodyHandle};
