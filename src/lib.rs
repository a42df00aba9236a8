//! A scene-graph game engine core built in Rust
//!
//! This engine provides:
//! - Scene graphs of objects with transforms, tags and behaviour components
//! - An engine loop with pluggable subsystems and fixed-step physics
//! - Text messages routed to the engine, subsystems, scenes and objects
//! - JSON settings, resource caching and scene persistence
//! - Undoable editor commands
//! - Physics simulation with rapier3d
//! - Input handling with winit

pub mod core;
pub mod ecs;
pub mod editor;
pub mod input;
pub mod physics;
pub mod resources;
pub mod scene;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{
        DebugInfo, Engine, EngineConfig, EngineContext, EngineState, FrameStats, Game, Message,
        MessageResult, Subsystem,
    };
    pub use crate::ecs::{Name, ObjectKey, Transform, World};
    pub use crate::input::Input;
    pub use crate::physics::{ColliderHandle, Physics, RigidBodyHandle};
    pub use crate::scene::{Component, Scene};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}
