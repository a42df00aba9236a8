//! Entity Component System module
//!
//! Scene objects are hecs entities carrying the components defined here.

mod components;
mod hierarchy;
mod world;

pub use components::{Name, ObjectFlags, ObjectKey, Tags, Transform};
pub use hecs::Entity;
pub use hierarchy::{Children, GlobalTransform, Parent};
pub use world::World;
