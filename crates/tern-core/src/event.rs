//! Event model for the Tern router.
//!
//! This module provides the inbound side of the router:
//!
//! - [`EventKind`] - protocol event classification (message, join, part, ...)
//! - [`EventFilter`] - what a handler subscribes to (one kind or the wildcard)
//! - [`InboundEvent`] - one received line, already parsed by the transport
//!
//! An [`InboundEvent`] is constructed once per received line and shared
//! (behind an `Arc`) by every handler invocation it triggers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Kind
// ============================================================================

/// Classification of inbound protocol events.
///
/// Parsing is case-insensitive and accepts both the wire command names
/// (`PRIVMSG`, `NICK`) and their descriptive aliases (`message`,
/// `nick-change`). Anything else is preserved verbatim as [`EventKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// A channel or private message (`PRIVMSG`).
    Message,
    /// A user joined a channel.
    Join,
    /// A user left a channel.
    Part,
    /// A user was kicked from a channel.
    Kick,
    /// A user changed nick.
    Nick,
    /// Any other protocol command, uppercased.
    Other(String),
}

impl EventKind {
    /// Returns the wire command name for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "PRIVMSG",
            Self::Join => "JOIN",
            Self::Part => "PART",
            Self::Kick => "KICK",
            Self::Nick => "NICK",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "PRIVMSG" | "MESSAGE" => Self::Message,
            "JOIN" => Self::Join,
            "PART" => Self::Part,
            "KICK" => Self::Kick,
            "NICK" | "NICK-CHANGE" => Self::Nick,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        let Ok(kind) = s.parse::<EventKind>();
        kind
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event Filter
// ============================================================================

/// The event type a handler is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventFilter {
    /// Matches every event kind (`*`).
    Any,
    /// Matches exactly one event kind.
    Kind(EventKind),
}

impl EventFilter {
    /// Returns `true` if an event of `kind` is eligible under this filter.
    pub fn accepts(&self, kind: &EventKind) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(k) => k == kind,
        }
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::Kind(EventKind::Message)
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<&str> for EventFilter {
    fn from(s: &str) -> Self {
        match s.trim() {
            "*" => Self::Any,
            other => {
                let Ok(kind) = other.parse::<EventKind>();
                Self::Kind(kind)
            }
        }
    }
}

impl From<String> for EventFilter {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<EventFilter> for String {
    fn from(filter: EventFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Kind(kind) => kind.fmt(f),
        }
    }
}

// ============================================================================
// Inbound Event
// ============================================================================

/// One received protocol line, already parsed by the transport.
///
/// `sender` is where replies go: the channel for channel traffic, or the
/// originating nick for private messages. `nick` is always the originating
/// user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Protocol event kind.
    pub kind: EventKind,
    /// Raw trailing text the rules are matched against.
    pub text: String,
    /// Nick of the originating user.
    pub nick: String,
    /// Channel or target the event was addressed to.
    pub sender: String,
    /// Protocol arguments, command name first.
    #[serde(default)]
    pub args: Vec<String>,
}

impl InboundEvent {
    /// Creates an event of the given kind.
    pub fn new(
        kind: EventKind,
        nick: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let sender = sender.into();
        let args = vec![kind.to_string(), sender.clone(), text.clone()];
        Self {
            kind,
            text,
            nick: nick.into(),
            sender,
            args,
        }
    }

    /// Creates a `PRIVMSG` event.
    pub fn message(
        nick: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::Message, nick, sender, text)
    }

    /// Returns `true` if the event was addressed to a channel.
    pub fn is_channel(&self) -> bool {
        self.sender.starts_with('#')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_aliases() {
        assert_eq!("privmsg".parse::<EventKind>().unwrap(), EventKind::Message);
        assert_eq!("message".parse::<EventKind>().unwrap(), EventKind::Message);
        assert_eq!("nick-change".parse::<EventKind>().unwrap(), EventKind::Nick);
        assert_eq!(
            "notice".parse::<EventKind>().unwrap(),
            EventKind::Other("NOTICE".to_string())
        );
    }

    #[test]
    fn test_filter_wildcard_accepts_everything() {
        let filter = EventFilter::from("*");
        assert!(filter.accepts(&EventKind::Join));
        assert!(filter.accepts(&EventKind::Other("TOPIC".into())));
    }

    #[test]
    fn test_filter_default_is_message() {
        let filter = EventFilter::default();
        assert!(filter.accepts(&EventKind::Message));
        assert!(!filter.accepts(&EventKind::Join));
    }

    #[test]
    fn test_private_message_is_not_channel() {
        let event = InboundEvent::message("alice", "alice", "hi");
        assert!(!event.is_channel());
        assert!(InboundEvent::message("alice", "#tern", "hi").is_channel());
    }
}
