//! Module system.
//!
//! A module is the unit of loading and reloading. It is represented by:
//!
//! - a [`ModuleDescriptor`]: a name plus a factory. The manager keeps these
//!   and calls the factory on every load, so each reload builds a fresh
//!   [`Module`].
//! - a [`Module`]: an ordered list of [`HandlerSpec`](crate::HandlerSpec)s and
//!   optional `setup` / `teardown` hooks receiving a [`ModuleSetup`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use tern::prelude::*;
//!
//! async fn ping(inv: Invocation) -> HandlerResult {
//!     inv.reply("pong").await?;
//!     Ok(())
//! }
//!
//! pub fn ping_module() -> ModuleDescriptor {
//!     ModuleDescriptor::new("ping", || {
//!         Module::new().handler(HandlerSpec::new("ping", ping).commands(["ping"]))
//!     })
//! }
//! ```
//!
//! # Configuration
//!
//! Each module may have a configuration section under `modules.config.<name>`.
//! Hooks read it with [`ModuleSetup::get_config`]; handlers with
//! [`Invocation::config`](crate::Invocation::config).

mod core;
mod descriptor;

pub use self::core::{HookFn, Module, ModuleSetup};
pub use self::descriptor::{ModuleDescriptor, TERN_MODULE_API_VERSION};
