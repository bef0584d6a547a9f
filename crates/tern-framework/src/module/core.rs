use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::context::BotContext;
use crate::handler::{BoxFuture, HandlerSpec};

// ─── ModuleSetup ────────────────────────────────────────────────────────────

/// Context passed to a module's `setup` and `teardown` hooks.
///
/// Provides the module's configuration section (or `Null` when absent) and
/// the shared bot context.
///
/// ```rust,ignore
/// #[derive(serde::Deserialize, Default)]
/// #[serde(default)]
/// struct SeenConfig { max_entries: usize }
///
/// async fn setup(ctx: ModuleSetup) -> anyhow::Result<()> {
///     let cfg: SeenConfig = ctx.get_config()?;
///     ctx.bot().insert_extension(SeenLog::with_capacity(cfg.max_entries));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ModuleSetup {
    module: String,
    bot: Arc<BotContext>,
    config: Arc<serde_json::Value>,
}

impl ModuleSetup {
    pub(crate) fn new(module: String, bot: Arc<BotContext>, config: Arc<serde_json::Value>) -> Self {
        Self {
            module,
            bot,
            config,
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub fn bot(&self) -> &Arc<BotContext> {
        &self.bot
    }

    /// Deserializes the module's configuration section into `T`.
    ///
    /// A missing section deserializes from `null`; use `#[serde(default)]`
    /// or `Option<T>` to tolerate it.
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(self.config.as_ref())
    }
}

impl fmt::Debug for ModuleSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSetup")
            .field("module", &self.module)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An async lifecycle hook.
pub type HookFn = Arc<dyn Fn(ModuleSetup) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

// ─── Module ─────────────────────────────────────────────────────────────────

/// A live module: its handler declarations plus optional lifecycle hooks.
///
/// Built fresh by [`ModuleDescriptor::instantiate`](super::ModuleDescriptor::instantiate)
/// on every load.
#[derive(Clone, Default)]
pub struct Module {
    handlers: Vec<HandlerSpec>,
    setup: Option<HookFn>,
    teardown: Option<HookFn>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler. Handlers are registered in the order they are added.
    pub fn handler(mut self, spec: HandlerSpec) -> Self {
        self.handlers.push(spec);
        self
    }

    /// Sets the hook run before the module's handlers are bound. A failing
    /// setup leaves the module unloaded with no handlers bound.
    pub fn on_setup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ModuleSetup) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.setup = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    /// Sets the hook run when the module is unloaded or replaced.
    pub fn on_teardown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ModuleSetup) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.teardown = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    pub fn handlers(&self) -> &[HandlerSpec] {
        &self.handlers
    }

    pub(crate) fn setup_hook(&self) -> Option<&HookFn> {
        self.setup.as_ref()
    }

    pub(crate) fn teardown_hook(&self) -> Option<&HookFn> {
        self.teardown.as_ref()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("handlers", &self.handlers.len())
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}
