//! Module lifecycle management.
//!
//! [`ModuleManager`] owns every registered module and the handler registry
//! they populate. It:
//!
//! - Accepts [`ModuleDescriptor`]s in registration order.
//! - Loads the selected modules (see [`ModuleSettings`]): builds a fresh
//!   [`Module`] from the descriptor, runs its `setup` hook, compiles its
//!   handler rules.
//! - Publishes one complete [`HandlerTable`] per lifecycle operation, so the
//!   dispatcher observes every load, reload or unload as a single step.
//! - Keeps the documentation index consumed by `help`.
//!
//! Lifecycle operations are serialized by an async lock; dispatch never takes
//! it.
//!
//! ```text
//! register() ──► Unloaded
//!   load_all() / reload() ──► Loading ──► Active        (setup ok)
//!                                     ──► FailedToLoad  (factory or setup failed)
//!   unload() / reload()   ──► Unloading ──► Unloaded    (teardown called)
//! ```

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use parking_lot::RwLock;
use tern_core::BoxedOutbound;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::context::BotContext;
use crate::error::{ModuleError, ModuleResult, panic_message};
use crate::module::{HookFn, Module, ModuleDescriptor, ModuleSetup, TERN_MODULE_API_VERSION};
use crate::registry::{Binding, HandlerTable, Registry};
use crate::rule::RuleCompiler;
use crate::settings::{BotSettings, ModuleSettings};

/// Load state of a registered module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Registered, no handlers bound.
    Unloaded,
    /// Being built and set up.
    Loading,
    /// Handlers bound and eligible for dispatch.
    Active,
    /// The factory or `setup` failed; no handlers bound.
    FailedToLoad,
    /// `teardown` in progress.
    Unloading,
}

/// Help text for one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDoc {
    pub module: String,
    pub doc: String,
    /// Usage example with `$nickname` already substituted.
    pub example: Option<String>,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Generation of the table published by this operation.
    pub generation: u64,
    /// Modules now active.
    pub loaded: Vec<String>,
    /// Modules that failed to load.
    pub failed: Vec<String>,
    /// Modules not selected by the enable/exclude lists.
    pub skipped: Vec<String>,
}

// =============================================================================
// Internal entries
// =============================================================================

/// One generation of a loaded module.
struct LoadedModule {
    generation: u64,
    module: Module,
    bindings: Vec<Binding>,
    docs: Vec<(String, HandlerDoc)>,
}

struct ModuleEntry {
    descriptor: ModuleDescriptor,
    state: ModuleState,
    loaded: Option<LoadedModule>,
}

// =============================================================================
// ModuleManager
// =============================================================================

/// Central owner of modules, the handler registry and the bot context.
pub struct ModuleManager {
    context: Arc<BotContext>,
    registry: Arc<Registry>,
    settings: ModuleSettings,
    entries: AsyncMutex<Vec<ModuleEntry>>,
    generation: AtomicU64,
    docs: RwLock<BTreeMap<String, HandlerDoc>>,
}

impl ModuleManager {
    /// Creates a manager together with the [`BotContext`] it hands to
    /// modules and handlers.
    pub fn new(
        bot: BotSettings,
        outbound: BoxedOutbound,
        modules: ModuleSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            context: Arc::new(BotContext::new(Arc::new(bot), outbound, weak.clone())),
            registry: Arc::new(Registry::new()),
            settings: modules,
            entries: AsyncMutex::new(Vec::new()),
            generation: AtomicU64::new(0),
            docs: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.context
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Generation of the currently published table.
    pub fn generation(&self) -> u64 {
        self.registry.generation()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ─── Registration ───────────────────────────────────────────────────────

    /// Registers a module. It is not loaded until [`load_all`](Self::load_all)
    /// or [`reload`](Self::reload).
    ///
    /// Logs a warning when the API version does not match, but continues.
    pub async fn register(&self, desc: ModuleDescriptor) -> ModuleResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|e| e.descriptor.name() == desc.name()) {
            return Err(ModuleError::Duplicate(desc.name().to_string()));
        }
        if !desc.is_compatible() {
            warn!(
                module = %desc.name(),
                descriptor_version = %format!("{}.{}", desc.api_version >> 16, desc.api_version & 0xFFFF),
                host_version = %format!(
                    "{}.{}",
                    TERN_MODULE_API_VERSION >> 16,
                    TERN_MODULE_API_VERSION & 0xFFFF
                ),
                "Module API version mismatch, registering anyway"
            );
        }
        debug!(module = %desc.name(), "Module registered");
        entries.push(ModuleEntry {
            descriptor: desc,
            state: ModuleState::Unloaded,
            loaded: None,
        });
        Ok(())
    }

    /// Names of every registered module, in registration order.
    pub async fn module_names(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|e| e.descriptor.name().to_string())
            .collect()
    }

    /// Load state of the named module.
    pub async fn state(&self, name: &str) -> Option<ModuleState> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.descriptor.name() == name)
            .map(|e| e.state)
    }

    /// Configuration section for `module`, or `Null`.
    pub fn module_config(&self, module: &str) -> serde_json::Value {
        self.settings.config_for(module)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Loads every selected module that is not already active, then
    /// publishes the table once.
    pub async fn load_all(&self) -> LoadReport {
        let mut entries = self.entries.lock().await;
        let generation = self.next_generation();
        let mut report = LoadReport {
            generation,
            ..LoadReport::default()
        };

        for entry in entries.iter_mut() {
            let name = entry.descriptor.name().to_string();
            if !self.settings.selects(&name) {
                report.skipped.push(name);
                continue;
            }
            if entry.state == ModuleState::Active {
                continue;
            }
            match self.load_entry(entry, generation).await {
                Ok(()) => report.loaded.push(name),
                Err(_) => report.failed.push(name),
            }
        }

        self.publish(&entries, generation);
        if report.loaded.is_empty() && report.failed.is_empty() {
            warn!("Couldn't find any modules to load");
        } else {
            info!(
                generation,
                loaded = %report.loaded.join(", "),
                failed = report.failed.len(),
                "Registered modules"
            );
        }
        report
    }

    /// Replaces one module with a freshly built generation.
    ///
    /// Calls the old instance's `teardown`, builds and sets up a new one,
    /// and publishes a table in which the old handlers are gone and the new
    /// ones present. Returns the new generation.
    pub async fn reload(&self, name: &str) -> ModuleResult<u64> {
        let mut entries = self.entries.lock().await;
        let Some(index) = entries.iter().position(|e| e.descriptor.name() == name) else {
            return Err(ModuleError::Unknown(name.to_string()));
        };

        let generation = self.next_generation();
        let entry = &mut entries[index];
        self.unload_entry(entry).await;
        let result = self.load_entry(entry, generation).await;
        self.publish(&entries, generation);

        match &result {
            Ok(()) => info!(module = %name, generation, "Module reloaded"),
            Err(e) => error!(module = %name, error = %e, "Module reload failed"),
        }
        result.map(|()| generation)
    }

    /// Tears down every active module and loads every selected module
    /// again, publishing the rebuilt table once.
    pub async fn reload_all(&self) -> LoadReport {
        let mut entries = self.entries.lock().await;
        for entry in entries.iter_mut().rev() {
            self.unload_entry(entry).await;
        }

        let generation = self.next_generation();
        let mut report = LoadReport {
            generation,
            ..LoadReport::default()
        };
        for entry in entries.iter_mut() {
            let name = entry.descriptor.name().to_string();
            if !self.settings.selects(&name) {
                report.skipped.push(name);
                continue;
            }
            match self.load_entry(entry, generation).await {
                Ok(()) => report.loaded.push(name),
                Err(_) => report.failed.push(name),
            }
        }

        self.publish(&entries, generation);
        info!(
            generation,
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Reloaded all modules"
        );
        report
    }

    /// Tears down one module and removes its handlers.
    pub async fn unload(&self, name: &str) -> ModuleResult<()> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.iter_mut().find(|e| e.descriptor.name() == name) else {
            return Err(ModuleError::Unknown(name.to_string()));
        };
        self.unload_entry(entry).await;
        let generation = self.next_generation();
        self.publish(&entries, generation);
        Ok(())
    }

    /// Tears down every active module in reverse registration order.
    pub async fn unload_all(&self) {
        let mut entries = self.entries.lock().await;
        for entry in entries.iter_mut().rev() {
            self.unload_entry(entry).await;
        }
        let generation = self.next_generation();
        self.publish(&entries, generation);
        info!("All modules unloaded");
    }

    // ─── Documentation ──────────────────────────────────────────────────────

    /// Help text of every documented handler, keyed by handler name.
    pub fn docs(&self) -> BTreeMap<String, HandlerDoc> {
        self.docs.read().clone()
    }

    /// Help text of one handler.
    pub fn doc(&self, handler: &str) -> Option<HandlerDoc> {
        self.docs.read().get(handler).cloned()
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn setup_context(&self, name: &str) -> ModuleSetup {
        ModuleSetup::new(
            name.to_string(),
            Arc::clone(&self.context),
            Arc::new(self.settings.config_for(name)),
        )
    }

    /// Builds, sets up and compiles one module in isolation.
    ///
    /// Nothing becomes visible to dispatch until the next [`publish`].
    async fn load_entry(&self, entry: &mut ModuleEntry, generation: u64) -> ModuleResult<()> {
        let name = entry.descriptor.name().to_string();
        entry.state = ModuleState::Loading;

        let descriptor = &entry.descriptor;
        let module = match std::panic::catch_unwind(AssertUnwindSafe(|| descriptor.instantiate())) {
            Ok(module) => module,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(module = %name, %reason, "Module factory panicked");
                entry.state = ModuleState::FailedToLoad;
                return Err(ModuleError::Build {
                    module: name,
                    reason,
                });
            }
        };

        if let Some(hook) = module.setup_hook()
            && let Err(reason) = run_hook(hook, self.setup_context(&name)).await
        {
            error!(module = %name, hook = "setup", %reason, "Error in module setup");
            entry.state = ModuleState::FailedToLoad;
            return Err(ModuleError::Hook {
                module: name,
                hook: "setup",
                reason,
            });
        }

        let compiler = RuleCompiler::new(self.context.settings());
        let mut bindings = Vec::new();
        let mut docs = Vec::new();
        for spec in module.handlers() {
            let (handler, rules) = match spec.compile(&name, generation, &compiler) {
                Ok(compiled) => compiled,
                Err(e) => {
                    error!(module = %name, handler = %spec.name(), error = %e, "Skipping handler");
                    continue;
                }
            };
            if let Some(doc) = &handler.doc {
                docs.push((
                    handler.name.clone(),
                    HandlerDoc {
                        module: name.clone(),
                        doc: doc.clone(),
                        example: handler.example.clone(),
                    },
                ));
            }
            bindings.extend(rules.into_iter().map(|rule| Binding {
                rule,
                handler: Arc::clone(&handler),
            }));
        }

        info!(module = %name, generation, bindings = bindings.len(), "Module loaded");
        entry.loaded = Some(LoadedModule {
            generation,
            module,
            bindings,
            docs,
        });
        entry.state = ModuleState::Active;
        Ok(())
    }

    /// Runs `teardown` for an active module and drops its bindings.
    async fn unload_entry(&self, entry: &mut ModuleEntry) {
        let Some(loaded) = entry.loaded.take() else {
            entry.state = ModuleState::Unloaded;
            return;
        };
        let name = entry.descriptor.name().to_string();
        entry.state = ModuleState::Unloading;
        if let Some(hook) = loaded.module.teardown_hook()
            && let Err(reason) = run_hook(hook, self.setup_context(&name)).await
        {
            error!(module = %name, hook = "teardown", %reason, "Error in module teardown");
        }
        debug!(module = %name, generation = loaded.generation, "Module unloaded");
        entry.state = ModuleState::Unloaded;
    }

    /// Builds a complete table from every active module and swaps it in.
    fn publish(&self, entries: &[ModuleEntry], generation: u64) {
        let mut table = HandlerTable::new(generation);
        let mut docs = BTreeMap::new();
        for loaded in entries.iter().filter_map(|e| e.loaded.as_ref()) {
            for binding in &loaded.bindings {
                table.push(binding.clone());
            }
            for (name, doc) in &loaded.docs {
                docs.insert(name.clone(), doc.clone());
            }
        }
        debug!(generation, bindings = table.len(), "Publishing handler table");
        *self.docs.write() = docs;
        self.registry.replace(table);
    }
}

impl std::fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleManager")
            .field("generation", &self.generation())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Runs a hook, containing errors and panics.
async fn run_hook(hook: &HookFn, ctx: ModuleSetup) -> Result<(), String> {
    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| hook(ctx))) {
        Ok(future) => future,
        Err(payload) => return Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tern_core::RecordingOutbound;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::context::Invocation;
    use crate::handler::{HandlerResult, HandlerSpec};

    async fn noop(_inv: Invocation) -> HandlerResult {
        Ok(())
    }

    fn manager(modules: ModuleSettings) -> Arc<ModuleManager> {
        ModuleManager::new(BotSettings::default(), RecordingOutbound::new(), modules)
    }

    fn simple(name: &'static str) -> ModuleDescriptor {
        ModuleDescriptor::new(name, move || {
            Module::new().handler(HandlerSpec::new(name, noop).commands([name]))
        })
    }

    #[tokio::test]
    async fn test_load_all_publishes_once() {
        let mgr = manager(ModuleSettings::default());
        assert_ok!(mgr.register(simple("ping")).await);
        assert_ok!(mgr.register(simple("seen")).await);

        let report = mgr.load_all().await;
        assert_eq!(report.loaded, vec!["ping", "seen"]);
        assert_eq!(mgr.generation(), report.generation);
        assert_eq!(mgr.registry().snapshot().len(), 2);
        assert_eq!(mgr.state("ping").await, Some(ModuleState::Active));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let mgr = manager(ModuleSettings::default());
        assert_ok!(mgr.register(simple("ping")).await);
        let err = assert_err!(mgr.register(simple("ping")).await);
        assert!(matches!(err, ModuleError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_setup_failure_binds_nothing() {
        let mgr = manager(ModuleSettings::default());
        let broken = ModuleDescriptor::new("broken", || {
            Module::new()
                .handler(HandlerSpec::new("never", noop).commands(["never"]))
                .on_setup(|_ctx| async {
                    Err::<(), _>(anyhow::anyhow!("database unreachable"))
                })
        });
        assert_ok!(mgr.register(broken).await);
        assert_ok!(mgr.register(simple("ping")).await);

        let report = mgr.load_all().await;
        assert_eq!(report.failed, vec!["broken"]);
        assert_eq!(report.loaded, vec!["ping"]);
        assert_eq!(mgr.state("broken").await, Some(ModuleState::FailedToLoad));

        let table = mgr.registry().snapshot();
        assert!(table.iter().all(|b| b.handler.module != "broken"));
    }

    #[tokio::test]
    async fn test_panicking_setup_is_contained() {
        let mgr = manager(ModuleSettings::default());
        let desc = ModuleDescriptor::new("panicky", || {
            Module::new().on_setup(|_ctx| async {
                let fail = true;
                if fail {
                    panic!("boom");
                }
                Ok(())
            })
        });
        assert_ok!(mgr.register(desc).await);
        let report = mgr.load_all().await;
        assert_eq!(report.failed, vec!["panicky"]);
    }

    #[tokio::test]
    async fn test_bad_rule_skips_only_that_handler() {
        let mgr = manager(ModuleSettings::default());
        let desc = ModuleDescriptor::new("mixed", || {
            Module::new()
                .handler(HandlerSpec::new("good", noop).commands(["good"]))
                .handler(HandlerSpec::new("bad", noop).rule("(unclosed"))
                .handler(HandlerSpec::new("also_good", noop).rule("hello"))
        });
        assert_ok!(mgr.register(desc).await);
        mgr.load_all().await;

        assert_eq!(mgr.state("mixed").await, Some(ModuleState::Active));
        let names: Vec<_> = mgr
            .registry()
            .snapshot()
            .iter()
            .map(|b| b.handler.name.clone())
            .collect();
        assert_eq!(names, vec!["good", "also_good"]);
    }

    #[tokio::test]
    async fn test_enable_and_exclude() {
        let mgr = manager(ModuleSettings {
            enable: Some(vec!["ping".into(), "seen".into()]),
            exclude: vec!["seen".into()],
            ..ModuleSettings::default()
        });
        for name in ["ping", "seen", "wiki"] {
            assert_ok!(mgr.register(simple(name)).await);
        }
        let report = mgr.load_all().await;
        assert_eq!(report.loaded, vec!["ping"]);
        assert_eq!(report.skipped, vec!["seen", "wiki"]);
        assert_eq!(mgr.state("wiki").await, Some(ModuleState::Unloaded));
    }

    #[tokio::test]
    async fn test_reload_runs_teardown_then_setup() {
        let mgr = manager(ModuleSettings::default());
        let setups = Arc::new(AtomicUsize::new(0));
        let teardowns = Arc::new(AtomicUsize::new(0));
        let (s, t) = (Arc::clone(&setups), Arc::clone(&teardowns));
        let desc = ModuleDescriptor::new("counted", move || {
            let (s, t) = (Arc::clone(&s), Arc::clone(&t));
            Module::new()
                .handler(HandlerSpec::new("counted", noop).commands(["counted"]))
                .on_setup(move |_ctx| {
                    let s = Arc::clone(&s);
                    async move {
                        s.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
                .on_teardown(move |_ctx| {
                    let t = Arc::clone(&t);
                    async move {
                        t.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
        });
        assert_ok!(mgr.register(desc).await);
        mgr.load_all().await;
        let first = mgr.registry().snapshot();

        let generation = assert_ok!(mgr.reload("counted").await);
        assert_eq!(setups.load(Ordering::SeqCst), 2);
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);

        let second = mgr.registry().snapshot();
        assert_eq!(second.generation(), generation);
        assert!(generation > first.generation());
        assert_eq!(second.len(), 1);
        assert!(second.iter().all(|b| b.handler.generation == generation));
        // The old snapshot still holds the old generation.
        assert!(first.iter().all(|b| b.handler.generation == first.generation()));
    }

    fn failing_teardown(name: &'static str) -> ModuleDescriptor {
        ModuleDescriptor::new(name, move || {
            Module::new()
                .handler(HandlerSpec::new(name, noop).commands([name]))
                .on_teardown(|_ctx| async {
                    Err::<(), _>(anyhow::anyhow!("flush failed"))
                })
        })
    }

    #[tokio::test]
    async fn test_failing_teardown_does_not_block_reload_or_unload() {
        let mgr = manager(ModuleSettings::default());
        assert_ok!(mgr.register(failing_teardown("sticky")).await);
        assert_ok!(mgr.register(simple("ping")).await);
        mgr.load_all().await;

        let generation = assert_ok!(mgr.reload("sticky").await);
        assert_eq!(mgr.state("sticky").await, Some(ModuleState::Active));
        let table = mgr.registry().snapshot();
        assert_eq!(table.len(), 2);
        assert!(
            table
                .iter()
                .filter(|b| b.handler.module == "sticky")
                .all(|b| b.handler.generation == generation)
        );

        assert_ok!(mgr.unload("sticky").await);
        assert_eq!(mgr.state("sticky").await, Some(ModuleState::Unloaded));
        let names: Vec<_> = mgr
            .registry()
            .snapshot()
            .iter()
            .map(|b| b.handler.module.clone())
            .collect();
        assert_eq!(names, vec!["ping"]);
    }

    #[tokio::test]
    async fn test_reload_with_failing_setup_leaves_module_failed() {
        let mgr = manager(ModuleSettings::default());
        let loads = Arc::new(AtomicUsize::new(0));
        let l = Arc::clone(&loads);
        let desc = ModuleDescriptor::new("flaky", move || {
            let l = Arc::clone(&l);
            Module::new()
                .handler(HandlerSpec::new("flaky", noop).commands(["flaky"]))
                .on_setup(move |_ctx| {
                    let l = Arc::clone(&l);
                    async move {
                        if l.fetch_add(1, Ordering::SeqCst) > 0 {
                            anyhow::bail!("config went missing");
                        }
                        Ok(())
                    }
                })
        });
        assert_ok!(mgr.register(desc).await);
        assert_ok!(mgr.register(simple("ping")).await);
        mgr.load_all().await;
        assert_eq!(mgr.registry().snapshot().len(), 2);

        assert_err!(mgr.reload("flaky").await);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(mgr.state("flaky").await, Some(ModuleState::FailedToLoad));

        let table = mgr.registry().snapshot();
        assert_eq!(table.generation(), mgr.generation());
        assert!(table.iter().all(|b| b.handler.module != "flaky"));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_unknown_module() {
        let mgr = manager(ModuleSettings::default());
        let err = assert_err!(mgr.reload("wiki").await);
        assert_eq!(err.to_string(), "wiki: no such module!");
    }

    #[tokio::test]
    async fn test_reload_all_rebuilds_every_module() {
        let mgr = manager(ModuleSettings::default());
        assert_ok!(mgr.register(simple("ping")).await);
        assert_ok!(mgr.register(simple("seen")).await);
        mgr.load_all().await;

        let report = mgr.reload_all().await;
        let table = mgr.registry().snapshot();
        assert_eq!(table.generation(), report.generation);
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|b| b.handler.generation == report.generation));
    }

    #[tokio::test]
    async fn test_unload_removes_handlers() {
        let mgr = manager(ModuleSettings::default());
        assert_ok!(mgr.register(simple("ping")).await);
        mgr.load_all().await;
        assert_ok!(mgr.unload("ping").await);
        assert!(mgr.registry().snapshot().is_empty());
        assert_eq!(mgr.state("ping").await, Some(ModuleState::Unloaded));
    }

    #[tokio::test]
    async fn test_setup_reads_module_config() {
        #[derive(serde::Deserialize)]
        struct Cfg {
            greeting: String,
        }

        let mut settings = ModuleSettings::default();
        settings
            .config
            .insert("greet".into(), serde_json::json!({ "greeting": "hoi" }));
        let mgr = manager(settings);

        let desc = ModuleDescriptor::new("greet", || {
            Module::new().on_setup(|ctx| async move {
                let cfg: Cfg = ctx.get_config()?;
                ctx.bot().insert_extension(cfg.greeting);
                Ok::<(), anyhow::Error>(())
            })
        });
        assert_ok!(mgr.register(desc).await);
        mgr.load_all().await;
        assert_eq!(
            mgr.context().extension::<String>().as_deref().map(String::as_str),
            Some("hoi")
        );
    }

    #[tokio::test]
    async fn test_docs_index() {
        let settings = BotSettings::new("wren");
        let mgr = ModuleManager::new(settings, RecordingOutbound::new(), ModuleSettings::default());
        let desc = ModuleDescriptor::new("admin", || {
            Module::new()
                .handler(
                    HandlerSpec::new("reload", noop)
                        .commands(["reload"])
                        .doc("Reloads a module.")
                        .example("$nickname: reload weather"),
                )
                .handler(HandlerSpec::new("undocumented", noop).commands(["x"]))
        });
        assert_ok!(mgr.register(desc).await);
        mgr.load_all().await;

        let docs = mgr.docs();
        assert_eq!(docs.len(), 1);
        let doc = mgr.doc("reload").unwrap();
        assert_eq!(doc.doc, "Reloads a module.");
        assert_eq!(doc.example.as_deref(), Some("wren: reload weather"));
    }
}
