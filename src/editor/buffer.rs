//! Undo/redo history for editor commands
//!
//! The buffer keeps applied and undone commands in one list with a cursor
//! between them: everything before the cursor can be undone, everything
//! after it can be redone. Applying a new command drops the redo tail.
//!
//! Other threads and message handlers queue work through a `CommandSender`.
//! Queued work runs at the start of the next frame against the current
//! scene, or the shared scene when there is none.
//!
//! # Example
//!
//! ```ignore
//! let buffer = ctx.create_subsystem(CommandBuffer::new(ctx.settings_mut()));
//! let sender = buffer.sender();
//! sender.push(Box::new(CreateObjectCommand::new(None, "box")));
//! sender.undo(1);
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use super::command::{Command, EditorError};
use crate::core::{
    Arguments, CommandError, CommandHandler, EngineEvent, Filter, FrameContext, Message,
    MessageResult, SettingManager, Subsystem, SubsystemInfo,
};
use crate::scene::Scene;

/// Setting holding the history capacity
pub const MAX_SIZE_SETTING: &str = "engine/Settings|uMaxCommandBufferSize";
pub const DEFAULT_MAX_SIZE: usize = 100;

#[derive(Debug)]
enum PendingOp {
    Apply(Box<dyn Command>),
    Undo(u32),
    Redo,
    Clear,
}

/// Queues operations for a `CommandBuffer` from anywhere
#[derive(Debug, Clone, Default)]
pub struct CommandSender {
    pending: Arc<Mutex<VecDeque<PendingOp>>>,
}

impl CommandSender {
    fn enqueue(&self, op: PendingOp) {
        match self.pending.lock() {
            Ok(mut pending) => pending.push_back(op),
            Err(poisoned) => poisoned.into_inner().push_back(op),
        }
    }

    pub fn push(&self, command: Box<dyn Command>) {
        self.enqueue(PendingOp::Apply(command));
    }

    pub fn undo(&self, steps: u32) {
        self.enqueue(PendingOp::Undo(steps));
    }

    pub fn redo(&self) {
        self.enqueue(PendingOp::Redo);
    }

    pub fn clear(&self) {
        self.enqueue(PendingOp::Clear);
    }
}

pub struct CommandBuffer {
    info: SubsystemInfo,
    history: VecDeque<Box<dyn Command>>,
    /// Number of applied commands at the front of `history`
    cursor: usize,
    max_size: usize,
    sender: CommandSender,
}

impl CommandBuffer {
    pub const ID: &'static str = "Command Buffer";

    /// Create a buffer sized from the settings
    pub fn new(settings: &mut SettingManager) -> Self {
        let max_size = settings.get(MAX_SIZE_SETTING, DEFAULT_MAX_SIZE as u32);
        Self::with_max_size(max_size as usize)
    }

    /// Create a buffer holding at most `max_size` commands (at least one)
    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            info: SubsystemInfo::new(Self::ID),
            history: VecDeque::new(),
            cursor: 0,
            max_size: max_size.max(1),
            sender: CommandSender::default(),
        }
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Execute a command and record it. A failed command is discarded.
    pub fn apply(&mut self, scene: &mut Scene, mut command: Box<dyn Command>) -> Result<(), EditorError> {
        command.execute(scene)?;
        log::debug!("Applied \"{}\"", command.name());

        self.history.truncate(self.cursor);
        self.history.push_back(command);
        self.cursor += 1;
        if self.history.len() > self.max_size {
            self.history.pop_front();
            self.cursor -= 1;
        }
        Ok(())
    }

    /// Undo the command before the cursor. Returns whether one was undone.
    pub fn undo_last(&mut self, scene: &mut Scene) -> Result<bool, EditorError> {
        let Some(command) = self
            .cursor
            .checked_sub(1)
            .and_then(|index| self.history.get_mut(index))
        else {
            return Ok(false);
        };
        command.undo(scene)?;
        log::debug!("Undid \"{}\"", command.name());
        self.cursor -= 1;
        Ok(true)
    }

    /// Undo up to `steps` commands. Returns how many were undone.
    pub fn undo(&mut self, scene: &mut Scene, steps: u32) -> Result<u32, EditorError> {
        let mut undone = 0;
        while undone < steps && self.undo_last(scene)? {
            undone += 1;
        }
        Ok(undone)
    }

    /// Re-execute the command after the cursor. Returns whether one was redone.
    pub fn redo_current(&mut self, scene: &mut Scene) -> Result<bool, EditorError> {
        let Some(command) = self.history.get_mut(self.cursor) else {
            return Ok(false);
        };
        command.execute(scene)?;
        log::debug!("Redid \"{}\"", command.name());
        self.cursor += 1;
        Ok(true)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.history.len() - self.cursor
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.cursor = 0;
    }

    /// Handle for queueing operations from outside the frame loop
    #[must_use]
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// Names of the applied commands, oldest first
    #[must_use]
    pub fn applied(&self) -> Vec<&'static str> {
        self.history.iter().take(self.cursor).map(|c| c.name()).collect()
    }

    fn run(&mut self, scene: &mut Scene, op: PendingOp, events: &mut Vec<EngineEvent>) -> Result<(), EditorError> {
        match op {
            PendingOp::Apply(command) => {
                let name = command.name();
                self.apply(scene, command)?;
                events.push(EngineEvent::CommandApplied { name });
            }
            PendingOp::Undo(steps) => {
                for _ in 0..steps {
                    let Some(name) = self.next_undo_name() else {
                        break;
                    };
                    if !self.undo_last(scene)? {
                        break;
                    }
                    events.push(EngineEvent::CommandUndone { name });
                }
            }
            PendingOp::Redo => {
                if let Some(name) = self.history.get(self.cursor).map(|c| c.name())
                    && self.redo_current(scene)?
                {
                    events.push(EngineEvent::CommandApplied { name });
                }
            }
            PendingOp::Clear => self.clear(),
        }
        Ok(())
    }

    fn next_undo_name(&self) -> Option<&'static str> {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.history.get(index))
            .map(|c| c.name())
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("info", &self.info)
            .field("undo_count", &self.undo_count())
            .field("redo_count", &self.redo_count())
            .field("max_size", &self.max_size)
            .finish()
    }
}

fn undo(buffer: &mut CommandBuffer, _: (), args: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
    let steps = if args.is_empty() { 1 } else { args.next_u32()? };
    buffer.sender.undo(steps);
    Ok(MessageResult::Continue)
}

fn redo(buffer: &mut CommandBuffer, _: (), _: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
    buffer.sender.redo();
    Ok(MessageResult::Continue)
}

fn clear(buffer: &mut CommandBuffer, _: (), _: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
    buffer.sender.clear();
    Ok(MessageResult::Continue)
}

fn commands() -> &'static CommandHandler<CommandBuffer> {
    static COMMANDS: OnceLock<CommandHandler<CommandBuffer>> = OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler = CommandHandler::new();
        handler.bind("undo", undo).bind("redo", redo).bind("clear", clear);
        handler
    })
}

impl Subsystem for CommandBuffer {
    fn info(&self) -> &SubsystemInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SubsystemInfo {
        &mut self.info
    }

    fn pre_update(&mut self, ctx: &mut FrameContext<'_>) {
        // Busy senders are picked up next frame
        let ops: Vec<PendingOp> = match self.sender.pending.try_lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        if ops.is_empty() {
            return;
        }

        let mut events = Vec::new();
        let scene = ctx.target_scene();
        for op in ops {
            if let Err(e) = self.run(scene, op, &mut events) {
                log::error!("Editor command failed: {e}");
            }
        }
        ctx.events.extend(events);
    }

    fn receive_message(&mut self, message: &Message) -> MessageResult {
        if message.pass_filter(Filter::COMMAND) {
            return commands().dispatch(self, (), message);
        }
        MessageResult::Continue
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
