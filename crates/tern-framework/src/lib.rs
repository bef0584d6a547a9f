//! # Tern Framework
//!
//! The routing layer of the Tern command router.
//!
//! This layer provides:
//! - Rule compilation with `$nick` / `$nickname` placeholders and
//!   prefix-command shapes ([`RuleCompiler`])
//! - Handler declarations with priority tiers, event filters and inline or
//!   threaded execution ([`HandlerSpec`])
//! - Reloadable modules with `setup` / `teardown` hooks ([`ModuleDescriptor`])
//! - A copy-on-write handler table swapped atomically on every lifecycle
//!   operation ([`Registry`])
//! - The dispatch engine, a bounded worker pool and per-handler statistics
//!   ([`Dispatcher`], [`WorkerPool`], [`StatsTable`])
//!
//! Transports feed [`InboundEvent`](tern_core::InboundEvent)s into a [`Bot`];
//! handlers answer through the [`Outbound`](tern_core::Outbound) it was built
//! with.

pub mod bot;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod manager;
pub mod module;
pub mod pool;
pub mod registry;
pub mod rule;
pub mod settings;
pub mod stats;
pub mod testing;
pub mod text;

#[cfg(feature = "builtin")]
pub mod builtin;

pub use bot::{Bot, BotBuilder};
pub use context::{BotContext, Invocation};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{Grumble, ModuleError, ModuleResult, RuleError};
pub use handler::{
    BoxFuture, BoxedHandler, Concurrency, ErasedHandler, HandlerDescriptor, HandlerResult,
    HandlerSpec, Priority, into_handler,
};
pub use manager::{HandlerDoc, LoadReport, ModuleManager, ModuleState};
pub use module::{HookFn, Module, ModuleDescriptor, ModuleSetup, TERN_MODULE_API_VERSION};
pub use pool::{Job, RejectReason, Rejected, WorkerPool, WorkerPoolMetrics};
pub use registry::{Binding, HandlerTable, Registry};
pub use rule::{Rule, RuleCompiler, RuleMatch, RuleSpec};
pub use settings::{BotSettings, DispatchSettings, ModuleSettings};
pub use stats::{StatsKey, StatsTable};
pub use text::{break_up, truncate};

#[cfg(feature = "builtin")]
pub use builtin::{ADMIN_MODULE, admin_module};
