//! Name-to-function command bindings
//!
//! A `CommandHandler` maps the first word of a message to a plain function
//! that reads its arguments and acts on a target. `C` carries extra context
//! that is not part of the target, such as the entity an object command
//! applies to.

use std::fmt;

use rustc_hash::FxHashMap;

use super::message::{ArgumentError, Arguments, Message, MessageResult};

/// Bound command signature
pub type CommandFn<T, C> =
    fn(&mut T, C, &mut Arguments<'_>) -> Result<MessageResult, CommandError>;

/// Errors raised while executing a bound command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Bad or missing arguments
    Argument {
        command: String,
        error: ArgumentError,
    },
    /// The command referred to something that does not exist
    NotFound(String),
    /// The command was understood but could not be carried out
    Failed(String),
}

impl CommandError {
    fn with_command(self, command: &str) -> Self {
        match self {
            Self::Argument { error, .. } => Self::Argument {
                command: command.to_string(),
                error,
            },
            other => other,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument { command, error } => write!(f, "{command}: {error}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Failed(reason) => write!(f, "command failed: {reason}"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ArgumentError> for CommandError {
    fn from(error: ArgumentError) -> Self {
        Self::Argument {
            command: String::new(),
            error,
        }
    }
}

/// Table of commands bound to a target type
pub struct CommandHandler<T: ?Sized, C = ()> {
    commands: FxHashMap<&'static str, CommandFn<T, C>>,
}

impl<T: ?Sized, C> CommandHandler<T, C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: FxHashMap::default(),
        }
    }

    /// Bind a command name, replacing any earlier binding
    pub fn bind(&mut self, name: &'static str, command: CommandFn<T, C>) -> &mut Self {
        self.commands.insert(name, command);
        self
    }

    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run the command named by the message's first word.
    ///
    /// Returns `Ok(None)` when no command with that name is bound.
    pub fn execute(
        &self,
        target: &mut T,
        context: C,
        message: &Message,
    ) -> Result<Option<MessageResult>, CommandError> {
        let name = message.command();
        let Some(command) = self.commands.get(name) else {
            return Ok(None);
        };

        let mut arguments = message.arguments();
        command(target, context, &mut arguments)
            .map(Some)
            .map_err(|e| e.with_command(name))
    }

    /// Like `execute`, but logs failures and maps them to `Continue`
    pub fn dispatch(&self, target: &mut T, context: C, message: &Message) -> MessageResult {
        match self.execute(target, context, message) {
            Ok(result) => result.unwrap_or_default(),
            Err(e) => {
                log::warn!("Message \"{message}\" failed: {e}");
                MessageResult::Continue
            }
        }
    }
}

impl<T: ?Sized, C> Default for CommandHandler<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized, C> fmt::Debug for CommandHandler<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("CommandHandler")
            .field("commands", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: f32,
    }

    fn add(counter: &mut Counter, _: (), args: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
        counter.value += args.next_f32()?;
        Ok(MessageResult::Continue)
    }

    fn stop(_: &mut Counter, _: (), _: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
        Ok(MessageResult::Escape)
    }

    fn handler() -> CommandHandler<Counter> {
        let mut handler = CommandHandler::new();
        handler.bind("add", add).bind("stop", stop);
        handler
    }

    #[test]
    fn test_execute_bound_command() {
        let handler = handler();
        let mut counter = Counter::default();

        let result = handler.execute(&mut counter, (), &Message::new("add 2.5"));
        assert_eq!(result, Ok(Some(MessageResult::Continue)));
        assert!((counter.value - 2.5).abs() < f32::EPSILON);

        let result = handler.execute(&mut counter, (), &Message::new("stop"));
        assert_eq!(result, Ok(Some(MessageResult::Escape)));
    }

    #[test]
    fn test_unbound_command_is_none() {
        let handler = handler();
        let mut counter = Counter::default();
        assert_eq!(
            handler.execute(&mut counter, (), &Message::new("multiply 2")),
            Ok(None)
        );
    }

    #[test]
    fn test_argument_error_names_command() {
        let handler = handler();
        let mut counter = Counter::default();

        let err = handler
            .execute(&mut counter, (), &Message::new("add"))
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::Argument {
                command: "add".to_string(),
                error: ArgumentError::Missing,
            }
        );
        assert_eq!(
            handler.dispatch(&mut counter, (), &Message::new("add")),
            MessageResult::Continue
        );
    }
}
