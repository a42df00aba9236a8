//! Scene editing with undo and redo
//!
//! Edits are `Command`s that know how to revert themselves. The
//! `CommandBuffer` subsystem records them and walks the history.

mod buffer;
mod command;

pub use buffer::{CommandBuffer, CommandSender, DEFAULT_MAX_SIZE, MAX_SIZE_SETTING};
pub use command::{
    ChangeObjectIdCommand, Command, CreateObjectCommand, CREATE_POSITION, EditorError,
    RemoveObjectCommand, SetActiveCommand, SetPositionCommand, SetRotationCommand,
    SetScaleCommand,
};
