//! # Tern Core
//!
//! The boundary types of the Tern command router.
//!
//! Tern takes lines already parsed by a transport, decides which registered
//! handlers apply, and runs them. This crate holds what both sides of that
//! contract need to agree on:
//!
//! - **Inbound**: [`InboundEvent`], [`EventKind`] and [`EventFilter`]
//! - **Outbound**: the [`Outbound`] trait and [`OutboundMessage`]
//! - **Errors**: [`TransportError`]
//!
//! ```text
//! ┌───────────┐  InboundEvent   ┌──────────┐   invoke   ┌───────────┐
//! │ Transport │───────────────▶│  Router  │──────────▶│  Handler  │
//! │           │◀───────────────│          │◀──────────│           │
//! └───────────┘ OutboundMessage └──────────┘  reply/say └───────────┘
//! ```

pub mod error;
pub mod event;
pub mod outbound;

pub use error::{TransportError, TransportResult};
pub use event::{EventFilter, EventKind, InboundEvent};
pub use outbound::{
    BoxedOutbound, ChannelOutbound, Outbound, OutboundKind, OutboundMessage, RecordingOutbound,
};
