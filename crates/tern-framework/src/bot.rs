//! The assembled router: modules, registry, worker pool and dispatcher.
//!
//! ```rust,ignore
//! let bot = Bot::builder(BotSettings::new("tern"), outbound)
//!     .module(ping_module())
//!     .build()
//!     .await?;
//! bot.start().await;
//! bot.dispatch(InboundEvent::message("alice", "#tern", ".ping")).await;
//! bot.shutdown().await;
//! ```

use std::sync::Arc;

use tern_core::{BoxedOutbound, InboundEvent};
use tracing::info;

use crate::context::BotContext;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::error::ModuleResult;
use crate::manager::{LoadReport, ModuleManager};
use crate::module::ModuleDescriptor;
use crate::pool::WorkerPool;
use crate::settings::{BotSettings, DispatchSettings, ModuleSettings};
use crate::stats::StatsTable;

/// A running command router.
#[derive(Debug)]
pub struct Bot {
    manager: Arc<ModuleManager>,
    dispatcher: Dispatcher,
}

impl Bot {
    /// Starts building a bot that sends through `outbound`.
    pub fn builder(settings: BotSettings, outbound: BoxedOutbound) -> BotBuilder {
        BotBuilder::new(settings, outbound)
    }

    /// Loads every selected module and publishes the first table.
    pub async fn start(&self) -> LoadReport {
        self.manager.load_all().await
    }

    /// Routes one inbound event.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchReport {
        self.dispatcher.dispatch(event).await
    }

    /// Reloads one module. Returns the generation it was loaded in.
    pub async fn reload(&self, name: &str) -> ModuleResult<u64> {
        self.manager.reload(name).await
    }

    /// Reloads every module as one atomic swap.
    pub async fn reload_all(&self) -> LoadReport {
        self.manager.reload_all().await
    }

    pub fn manager(&self) -> &Arc<ModuleManager> {
        &self.manager
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn context(&self) -> &Arc<BotContext> {
        self.manager.context()
    }

    pub fn stats(&self) -> &StatsTable {
        self.manager.context().stats()
    }

    /// Waits for queued invocations, then tears every module down.
    ///
    /// The worker pool is not restarted; after this, threaded handlers run
    /// inline on the dispatch task.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.manager.unload_all().await;
        info!("Bot stopped");
    }
}

/// Builder for [`Bot`].
#[must_use]
pub struct BotBuilder {
    settings: BotSettings,
    outbound: BoxedOutbound,
    modules: ModuleSettings,
    dispatch: DispatchSettings,
    descriptors: Vec<ModuleDescriptor>,
    builtin: bool,
}

impl BotBuilder {
    fn new(settings: BotSettings, outbound: BoxedOutbound) -> Self {
        Self {
            settings,
            outbound,
            modules: ModuleSettings::default(),
            dispatch: DispatchSettings::default(),
            descriptors: Vec::new(),
            builtin: cfg!(feature = "builtin"),
        }
    }

    /// Sets the enable/exclude lists and per-module configuration.
    pub fn module_settings(mut self, modules: ModuleSettings) -> Self {
        self.modules = modules;
        self
    }

    /// Sets the worker pool size.
    pub fn dispatch_settings(mut self, dispatch: DispatchSettings) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Adds a module. Modules are loaded in the order they are added.
    pub fn module(mut self, desc: ModuleDescriptor) -> Self {
        self.descriptors.push(desc);
        self
    }

    pub fn modules(mut self, descs: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        self.descriptors.extend(descs);
        self
    }

    /// Leaves out the built-in `admin` module.
    pub fn without_builtin(mut self) -> Self {
        self.builtin = false;
        self
    }

    /// Registers the modules and spawns the worker pool.
    ///
    /// Nothing is loaded until [`Bot::start`]. Must be called from within a
    /// Tokio runtime.
    pub async fn build(self) -> ModuleResult<Bot> {
        let manager = ModuleManager::new(self.settings, self.outbound, self.modules);

        #[cfg(feature = "builtin")]
        if self.builtin {
            manager.register(crate::builtin::admin_module()).await?;
        }
        for desc in self.descriptors {
            manager.register(desc).await?;
        }

        let dispatcher = Dispatcher::new(&manager, WorkerPool::new(self.dispatch));
        Ok(Bot {
            manager,
            dispatcher,
        })
    }
}
