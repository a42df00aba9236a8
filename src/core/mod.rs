//! Core engine module
//!
//! The engine context and frame loop, subsystems, messaging, settings,
//! file access and frame timing.

mod debug;
mod engine;
mod events;
mod files;
mod handler;
mod message;
mod settings;
mod subsystem;
mod time;

pub use debug::{DebugInfo, FrameStats};
pub use engine::{Engine, EngineConfig, EngineContext, EngineState, Game, SHARED_SCENE_ID};
pub use events::{EngineEvent, EventQueue};
pub use files::{Directory, FileError, FileLoader};
pub use handler::{CommandError, CommandFn, CommandHandler};
pub use message::{ArgumentError, Arguments, Filter, IdMatch, Message, MessageResult};
pub use settings::{CallbackId, DEFAULT_ROOT, SettingManager, SettingValue};
pub use subsystem::{FrameContext, Subsystem, SubsystemInfo};
pub use time::Time;
