//! Engine subsystems
//!
//! A subsystem is a long-lived service owned by the engine: the setting
//! manager, the resource manager, the editor command buffer. Each one gets a
//! hook before and after the scenes update, around every fixed step, and
//! once per frame to draw.

use std::any::Any;
use std::sync::OnceLock;

use super::events::EventQueue;
use super::handler::{CommandError, CommandHandler};
use super::message::{Arguments, Filter, Message, MessageResult};
use crate::scene::Scene;

/// Identity and activity shared by every subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemInfo {
    pub id: String,
    /// Inactive subsystems skip every hook but still receive messages
    pub active: bool,
}

impl SubsystemInfo {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: true,
        }
    }
}

/// What a subsystem hook can reach during a frame
pub struct FrameContext<'a> {
    /// Scaled frame time, or the fixed step inside fixed hooks
    pub delta: f32,
    pub scene: Option<&'a mut Scene>,
    pub shared_scene: &'a mut Scene,
    pub events: &'a mut EventQueue,
}

impl FrameContext<'_> {
    /// The current scene, or the shared scene when there is none
    pub fn target_scene(&mut self) -> &mut Scene {
        match self.scene.as_deref_mut() {
            Some(scene) => scene,
            None => &mut *self.shared_scene,
        }
    }
}

pub trait Subsystem: Any {
    fn info(&self) -> &SubsystemInfo;

    fn info_mut(&mut self) -> &mut SubsystemInfo;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn set_id(&mut self, id: String) {
        self.info_mut().id = id;
    }

    fn is_active(&self) -> bool {
        self.info().active
    }

    fn set_active(&mut self, active: bool) {
        self.info_mut().active = active;
    }

    /// Before the scenes update
    fn pre_update(&mut self, _ctx: &mut FrameContext<'_>) {}

    /// After the scenes update
    fn post_update(&mut self, _ctx: &mut FrameContext<'_>) {}

    /// Before each fixed step
    fn pre_fixed_update(&mut self, _ctx: &mut FrameContext<'_>) {}

    /// After each fixed step
    fn post_fixed_update(&mut self, _ctx: &mut FrameContext<'_>) {}

    /// Once per frame, after the update hooks
    fn draw(&mut self) {}

    /// Subsystem specific messages, after `setID`/`setActive`
    fn receive_message(&mut self, _message: &Message) -> MessageResult {
        MessageResult::Continue
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

fn set_id(
    subsystem: &mut dyn Subsystem,
    _: (),
    args: &mut Arguments<'_>,
) -> Result<MessageResult, CommandError> {
    subsystem.set_id(args.next_string()?);
    Ok(MessageResult::Continue)
}

fn set_active(
    subsystem: &mut dyn Subsystem,
    _: (),
    args: &mut Arguments<'_>,
) -> Result<MessageResult, CommandError> {
    subsystem.set_active(args.next_bool()?);
    Ok(MessageResult::Continue)
}

fn base_commands() -> &'static CommandHandler<dyn Subsystem> {
    static COMMANDS: OnceLock<CommandHandler<dyn Subsystem>> = OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler = CommandHandler::new();
        handler.bind("setID", set_id).bind("setActive", set_active);
        handler
    })
}

/// Deliver a message to one subsystem: base commands, then its own handling
pub(crate) fn deliver(subsystem: &mut dyn Subsystem, message: &Message) -> MessageResult {
    if !message.pass_filter(Filter::SUBSYSTEM) || !message.pass_id(subsystem.id()) {
        return MessageResult::Continue;
    }

    if message.pass_filter(Filter::COMMAND)
        && base_commands().dispatch(subsystem, (), message).is_escape()
    {
        return MessageResult::Escape;
    }

    if message.pass_filter(Filter::CUSTOM) {
        return subsystem.receive_message(message);
    }
    MessageResult::Continue
}
