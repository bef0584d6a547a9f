//! # Tern
//!
//! An event-driven command router for line-based chat bots.
//!
//! ## Overview
//!
//! A transport parses protocol lines into [`InboundEvent`](core::InboundEvent)s.
//! Tern matches each one against the rules of every loaded module and runs
//! the handlers that apply, highest priority tier first. Handlers answer
//! through an [`Outbound`](core::Outbound) supplied by the transport.
//!
//! ```text
//! ┌───────────┐     ┌─────────────┐     ┌──────────────────────────────┐
//! │ Transport │────▶│ TernRuntime │────▶│ Dispatcher                   │
//! │           │     │  (channel)  │     │  high → medium → low tiers   │──▶ inline handlers
//! │           │◀────│             │     │  snapshot of handler table   │──▶ worker pool
//! └───────────┘     └─────────────┘     └──────────────────────────────┘
//!       ▲                                              │
//!       └──────────────── Outbound ◀───────────────────┘
//! ```
//!
//! - **Modules** are the unit of reloading. A module is rebuilt from its
//!   descriptor on every load, so a reload always starts clean.
//! - **Reloads** publish a whole new handler table at once. An event is
//!   dispatched against one table from start to end.
//! - **Failures** stay inside the invocation that caused them. A
//!   [`Grumble`](framework::Grumble) goes back to the caller; anything else
//!   is logged and reported to the admins.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tern::prelude::*;
//!
//! async fn ping(inv: Invocation) -> HandlerResult {
//!     inv.reply("pong").await?;
//!     Ok(())
//! }
//!
//! fn ping_module() -> ModuleDescriptor {
//!     ModuleDescriptor::new("ping", || {
//!         Module::new().handler(
//!             HandlerSpec::new("ping", ping)
//!                 .commands(["ping"])
//!                 .doc("Checks that the bot is alive.")
//!                 .example(".ping"),
//!         )
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (outbound, lines) = ChannelOutbound::channel(64);
//!     let (events, inbound) = tokio::sync::mpsc::channel(64);
//!     // hand `events` and `lines` to the transport
//!
//!     let runtime = TernRuntime::builder()
//!         .module(ping_module())
//!         .build(std::sync::Arc::new(outbound))
//!         .await?;
//!     runtime.run(inbound).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `builtin` *(default)*: the `admin` module with `reload` and `help`
//! - `toml-config` *(default)*: `tern.toml` configuration files
//! - `yaml-config`: `tern.yaml` configuration files
//! - `json-log`: JSON log output

pub use tern_core as core;
pub use tern_framework as framework;
pub use tern_runtime as runtime;

/// Everything needed to write modules and start a bot.
///
/// ```rust,ignore
/// use tern::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tern_runtime::{RuntimeBuilder, TernConfig, TernRuntime};

    // Modules and handlers
    pub use tern_framework::{
        Concurrency, Grumble, HandlerResult, HandlerSpec, Invocation, Module, ModuleDescriptor,
        ModuleSetup, Priority, RuleSpec,
    };

    // Embedding without the runtime
    pub use tern_framework::{Bot, BotContext, BotSettings};

    // Transport boundary
    pub use tern_core::{
        BoxedOutbound, ChannelOutbound, EventFilter, EventKind, InboundEvent, Outbound,
        OutboundMessage,
    };

    #[cfg(feature = "builtin")]
    pub use tern_framework::admin_module;
}
