//! Text messages routed through the engine
//!
//! A message is a command line with an optional bracketed filter in front of
//! it. The filter decides which receivers see the message:
//!
//! ```text
//! [Ob#enemy=turret] setActive false
//! [Su-c] save
//! [Sc Ob*light] setDeltaScale 0.5
//! ```
//!
//! Filter grammar, in order, every part optional:
//!
//! - system symbols: `En` engine, `Su` subsystems, `Sh` shared scene,
//!   `Sc` scene, `Ob` objects, `Co` components
//! - `-c` drops custom handling, `-m` drops bound commands
//! - `#tag` requires an object tag
//! - `=id` requires an exact ID, `*id` an ID containing the text
//!
//! # Example
//!
//! ```ignore
//! let message = Message::new("[Ob=player] move 0 1 0");
//! assert!(message.pass_filter(Filter::OBJECT));
//! assert!(message.pass_id("player"));
//! ```

use std::fmt;

use crate::ecs::Tags;

// ============================================================================
// Filter bits
// ============================================================================

/// Receivers and handling kinds a message is allowed to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filter(pub u8);

impl Filter {
    pub const ENGINE: Self = Self(1 << 0);
    pub const SUBSYSTEM: Self = Self(1 << 1);
    pub const SHARED_SCENE: Self = Self(1 << 2);
    pub const SCENE: Self = Self(1 << 3);
    pub const OBJECT: Self = Self(1 << 4);
    pub const COMPONENT: Self = Self(1 << 5);
    /// Bound command handlers
    pub const COMMAND: Self = Self(1 << 6);
    /// Custom `receive_message` handling
    pub const CUSTOM: Self = Self(1 << 7);

    pub const SYSTEMS: Self = Self(0b0011_1111);
    pub const ALL: Self = Self(0xFF);

    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "En" => Some(Self::ENGINE),
            "Su" => Some(Self::SUBSYSTEM),
            "Sh" => Some(Self::SHARED_SCENE),
            "Sc" => Some(Self::SCENE),
            "Ob" => Some(Self::OBJECT),
            "Co" => Some(Self::COMPONENT),
            _ => None,
        }
    }
}

impl std::ops::BitOr for Filter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// ID requirement of a message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdMatch {
    /// Any receiver
    #[default]
    Any,
    /// Receiver ID must equal the text
    Exact(String),
    /// Receiver ID must contain the text
    Contains(String),
}

impl IdMatch {
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => id == expected,
            Self::Contains(part) => id.contains(part.as_str()),
        }
    }
}

/// Outcome of delivering a message to one receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageResult {
    /// Keep delivering to the remaining receivers
    #[default]
    Continue,
    /// Stop delivery
    Escape,
}

impl MessageResult {
    #[must_use]
    #[inline]
    pub fn is_escape(self) -> bool {
        self == Self::Escape
    }
}

// ============================================================================
// Message
// ============================================================================

/// A parsed message: filter plus command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    filter: Filter,
    id: IdMatch,
    tag: Option<String>,
    text: String,
}

impl Message {
    /// Parse a message with an optional `[...]` filter prefix
    pub fn new(text: impl AsRef<str>) -> Self {
        let text = text.as_ref().trim();

        let Some(rest) = text.strip_prefix('[') else {
            return Self::unfiltered(text);
        };

        let Some(end) = rest.find(']') else {
            log::warn!("Message filter not closed, treating \"{text}\" as a command");
            return Self::unfiltered(text);
        };

        let mut message = Self::unfiltered(rest[end + 1..].trim());
        message.parse_filter(rest[..end].trim());
        message
    }

    fn unfiltered(text: &str) -> Self {
        Self {
            filter: Filter::ALL,
            id: IdMatch::Any,
            tag: None,
            text: text.to_string(),
        }
    }

    fn parse_filter(&mut self, mut text: &str) {
        let mut systems = Filter(0);
        loop {
            text = text.trim_start();
            match text.get(..2).and_then(Filter::from_symbol) {
                Some(bits) => {
                    systems = systems | bits;
                    text = &text[2..];
                }
                None => break,
            }
        }
        if systems.0 != 0 {
            self.filter = Filter(systems.0 | Filter::COMMAND.0 | Filter::CUSTOM.0);
        }

        loop {
            text = text.trim_start();
            if let Some(rest) = text.strip_prefix("-c") {
                self.filter.remove(Filter::CUSTOM);
                text = rest;
            } else if let Some(rest) = text.strip_prefix("-m") {
                self.filter.remove(Filter::COMMAND);
                text = rest;
            } else {
                break;
            }
        }

        if let Some(rest) = text.strip_prefix('#') {
            let end = rest.find(['=', '*']).unwrap_or(rest.len());
            let tag = rest[..end].trim();
            if !tag.is_empty() {
                self.tag = Some(tag.to_string());
            }
            text = &rest[end..];
        }

        if let Some(id) = text.strip_prefix('=') {
            self.id = IdMatch::Exact(id.trim().to_string());
        } else if let Some(id) = text.strip_prefix('*') {
            self.id = IdMatch::Contains(id.trim().to_string());
        } else if !text.trim().is_empty() {
            log::warn!("Ignoring unrecognized message filter part \"{text}\"");
        }
    }

    /// Create a message with an explicit filter and command line
    #[must_use]
    pub fn with_filter(filter: Filter, id: IdMatch, text: impl Into<String>) -> Self {
        Self {
            filter,
            id,
            tag: None,
            text: text.into(),
        }
    }

    /// Require a tag on receiving objects
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Append an argument, quoting it if it contains whitespace
    pub fn push(&mut self, argument: impl fmt::Display) -> &mut Self {
        let argument = argument.to_string();
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        if argument.is_empty() || argument.contains(char::is_whitespace) {
            self.text.push('"');
            self.text.push_str(&argument);
            self.text.push('"');
        } else {
            self.text.push_str(&argument);
        }
        self
    }

    /// The command line (without the filter)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// First word of the command line
    #[must_use]
    pub fn command(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or("")
    }

    /// Everything after the command word
    #[must_use]
    pub fn arguments(&self) -> Arguments<'_> {
        let command = self.command();
        let start = self.text.find(command).map_or(0, |i| i + command.len());
        Arguments::new(&self.text[start..])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn filter(&self) -> Filter {
        self.filter
    }

    #[must_use]
    pub fn id_match(&self) -> &IdMatch {
        &self.id
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// True if every bit in `bits` is allowed
    #[must_use]
    pub fn pass_filter(&self, bits: Filter) -> bool {
        self.filter.contains(bits)
    }

    #[must_use]
    pub fn pass_id(&self, id: &str) -> bool {
        self.id.matches(id)
    }

    #[must_use]
    pub fn pass_tags(&self, tags: Option<&Tags>) -> bool {
        match (&self.tag, tags) {
            (None, _) => true,
            (Some(tag), Some(tags)) => tags.contains(tag),
            (Some(_), None) => false,
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Errors reading command arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// Fewer arguments than the command needs
    Missing,
    /// An argument could not be parsed
    Invalid {
        value: String,
        expected: &'static str,
    },
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing argument"),
            Self::Invalid { value, expected } => {
                write!(f, "invalid argument \"{value}\", expected {expected}")
            }
        }
    }
}

impl std::error::Error for ArgumentError {}

/// Tokenizer over a command's arguments. Double quotes group a token.
#[derive(Debug, Clone)]
pub struct Arguments<'a> {
    rest: &'a str,
}

impl<'a> Arguments<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    /// Next raw token
    pub fn next_str(&mut self) -> Result<&'a str, ArgumentError> {
        let text = self.rest.trim_start();

        if let Some(quoted) = text.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            self.rest = quoted.get(end + 1..).unwrap_or("");
            return Ok(&quoted[..end]);
        }

        if text.is_empty() {
            self.rest = text;
            return Err(ArgumentError::Missing);
        }

        let end = text.find(char::is_whitespace).unwrap_or(text.len());
        self.rest = &text[end..];
        Ok(&text[..end])
    }

    pub fn next_string(&mut self) -> Result<String, ArgumentError> {
        self.next_str().map(str::to_string)
    }

    pub fn next_f32(&mut self) -> Result<f32, ArgumentError> {
        let token = self.next_str()?;
        token.parse().map_err(|_| ArgumentError::Invalid {
            value: token.to_string(),
            expected: "a number",
        })
    }

    pub fn next_u32(&mut self) -> Result<u32, ArgumentError> {
        let token = self.next_str()?;
        token.parse().map_err(|_| ArgumentError::Invalid {
            value: token.to_string(),
            expected: "an unsigned integer",
        })
    }

    pub fn next_bool(&mut self) -> Result<bool, ArgumentError> {
        let token = self.next_str()?;
        match token {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ArgumentError::Invalid {
                value: token.to_string(),
                expected: "true or false",
            }),
        }
    }

    pub fn next_vec3(&mut self) -> Result<glam::Vec3, ArgumentError> {
        Ok(glam::Vec3::new(
            self.next_f32()?,
            self.next_f32()?,
            self.next_f32()?,
        ))
    }

    /// Unread remainder, trimmed
    #[must_use]
    pub fn remainder(&self) -> &'a str {
        self.rest.trim()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rest.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_message_passes_everything() {
        let message = Message::new("setActive false");
        assert!(message.pass_filter(Filter::ALL));
        assert!(message.pass_id("anything"));
        assert_eq!(message.command(), "setActive");
        assert_eq!(message.arguments().remainder(), "false");
    }

    #[test]
    fn test_filter_systems_and_exact_id() {
        let message = Message::new("[Ob=player] move 1 2 3");
        assert!(message.pass_filter(Filter::OBJECT | Filter::COMMAND));
        assert!(message.pass_filter(Filter::CUSTOM));
        assert!(!message.pass_filter(Filter::SCENE));
        assert!(message.pass_id("player"));
        assert!(!message.pass_id("player2"));

        let mut args = message.arguments();
        assert_eq!(args.next_vec3().unwrap(), glam::Vec3::new(1.0, 2.0, 3.0));
        assert!(args.is_empty());
    }

    #[test]
    fn test_filter_flags_tag_and_substring() {
        let message = Message::new("[ScOb -c #enemy *tur] removeSelf");
        assert!(message.pass_filter(Filter::SCENE | Filter::OBJECT | Filter::COMMAND));
        assert!(!message.pass_filter(Filter::CUSTOM));
        assert_eq!(message.tag(), Some("enemy"));
        assert!(message.pass_id("big-turret"));
        assert!(!message.pass_id("tank"));

        let mut tags = Tags::new();
        assert!(!message.pass_tags(Some(&tags)));
        tags.add("enemy");
        assert!(message.pass_tags(Some(&tags)));
    }

    #[test]
    fn test_filter_removes_command_bit() {
        let message = Message::new("[Su-m] custom");
        assert!(message.pass_filter(Filter::SUBSYSTEM | Filter::CUSTOM));
        assert!(!message.pass_filter(Filter::COMMAND));
    }

    #[test]
    fn test_unclosed_filter_is_command_text() {
        let message = Message::new("[Ob=x setActive");
        assert_eq!(message.command(), "[Ob=x");
        assert!(message.pass_filter(Filter::ALL));
    }

    #[test]
    fn test_push_quotes_whitespace() {
        let mut message = Message::new("setID");
        message.push("two words").push(3);
        assert_eq!(message.as_str(), "setID \"two words\" 3");

        let mut args = message.arguments();
        assert_eq!(args.next_str().unwrap(), "two words");
        assert_eq!(args.next_u32().unwrap(), 3);
        assert_eq!(args.next_str(), Err(ArgumentError::Missing));
    }

    #[test]
    fn test_argument_errors() {
        let mut args = Arguments::new("maybe x");
        assert!(matches!(
            args.next_bool(),
            Err(ArgumentError::Invalid { expected: "true or false", .. })
        ));
        assert!(matches!(args.next_f32(), Err(ArgumentError::Invalid { .. })));
        assert_eq!(args.next_f32(), Err(ArgumentError::Missing));
    }
}
