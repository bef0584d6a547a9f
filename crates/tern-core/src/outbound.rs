//! Outbound transport boundary.
//!
//! The router never writes to the network itself. Every reply, say or
//! action produced by a handler becomes an [`OutboundMessage`] handed to an
//! [`Outbound`] implementation owned by the transport collaborator.
//!
//! Two implementations ship with the core:
//!
//! - [`ChannelOutbound`] forwards messages into a tokio `mpsc` channel that
//!   the transport drains.
//! - [`RecordingOutbound`] keeps every message in memory, for tests and
//!   demos.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{TransportError, TransportResult};

/// How an outbound message is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundKind {
    /// A plain message (`PRIVMSG`).
    Message,
    /// An emote (`CTCP ACTION`).
    Action,
}

/// A message produced by a handler, not yet rendered to a protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Channel or nick the message is sent to.
    pub target: String,
    /// Message body.
    pub text: String,
    /// Nick the message is addressed to inside `target`, if any.
    pub mention: Option<String>,
    /// Rendering kind.
    pub kind: OutboundKind,
}

impl OutboundMessage {
    /// Creates a plain message.
    pub fn message(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
            mention: None,
            kind: OutboundKind::Message,
        }
    }

    /// Creates an emote.
    pub fn action(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
            mention: None,
            kind: OutboundKind::Action,
        }
    }

    /// Addresses the message to `nick` inside its target.
    pub fn mentioning(mut self, nick: impl Into<String>) -> Self {
        self.mention = Some(nick.into());
        self
    }

    /// Returns the text as it should appear on the wire, including the
    /// `nick: ` address prefix when the message mentions someone.
    pub fn rendered_text(&self) -> String {
        match &self.mention {
            Some(nick) => format!("{nick}: {}", self.text),
            None => self.text.clone(),
        }
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OutboundKind::Message => {
                write!(f, "PRIVMSG {} :{}", self.target, self.rendered_text())
            }
            OutboundKind::Action => write!(
                f,
                "PRIVMSG {} :\u{1}ACTION {}\u{1}",
                self.target,
                self.rendered_text()
            ),
        }
    }
}

/// The sending half of the external transport.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Queues a message for delivery.
    async fn send(&self, message: OutboundMessage) -> TransportResult<()>;
}

/// Shared, type-erased outbound transport.
pub type BoxedOutbound = Arc<dyn Outbound>;

// =============================================================================
// ChannelOutbound
// =============================================================================

/// An [`Outbound`] that forwards every message into an `mpsc` channel.
#[derive(Debug, Clone)]
pub struct ChannelOutbound {
    tx: mpsc::Sender<OutboundMessage>,
}

impl ChannelOutbound {
    /// Creates the outbound handle and the receiver the transport drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Outbound for ChannelOutbound {
    async fn send(&self, message: OutboundMessage) -> TransportResult<()> {
        trace!(target_name = %message.target, "Queueing outbound message");
        self.tx
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

// =============================================================================
// RecordingOutbound
// =============================================================================

/// An [`Outbound`] that records every message it is given.
#[derive(Debug, Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingOutbound {
    /// Creates an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a copy of every message sent so far.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    /// Returns the messages whose target is `target`.
    pub fn sent_to(&self, target: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.target == target)
            .cloned()
            .collect()
    }

    /// Returns the number of messages sent so far.
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    /// Returns `true` if nothing has been sent.
    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    /// Forgets every recorded message.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send(&self, message: OutboundMessage) -> TransportResult<()> {
        self.sent.lock().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mention() {
        let msg = OutboundMessage::message("#tern", "pong").mentioning("alice");
        assert_eq!(msg.rendered_text(), "alice: pong");
        assert_eq!(msg.to_string(), "PRIVMSG #tern :alice: pong");
    }

    #[test]
    fn test_render_action() {
        let msg = OutboundMessage::action("#tern", "waves");
        assert_eq!(msg.to_string(), "PRIVMSG #tern :\u{1}ACTION waves\u{1}");
    }

    #[tokio::test]
    async fn test_channel_outbound_closed() {
        let (outbound, rx) = ChannelOutbound::channel(1);
        drop(rx);
        let err = outbound
            .send(OutboundMessage::message("#tern", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_recording_outbound() {
        let outbound = RecordingOutbound::new();
        outbound
            .send(OutboundMessage::message("#a", "one"))
            .await
            .unwrap();
        outbound
            .send(OutboundMessage::message("#b", "two"))
            .await
            .unwrap();
        assert_eq!(outbound.len(), 2);
        assert_eq!(outbound.sent_to("#b")[0].text, "two");
    }
}
