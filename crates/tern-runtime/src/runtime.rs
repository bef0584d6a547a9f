//! The event loop.
//!
//! A transport pushes parsed [`InboundEvent`]s into an mpsc channel;
//! [`TernRuntime`] pulls them off one at a time and hands each to the
//! dispatch engine. Inline handlers run on this loop, threaded ones on the
//! worker pool.
//!
//! ```rust,ignore
//! let (tx, rx) = tokio::sync::mpsc::channel(64);
//! let runtime = TernRuntime::builder()
//!     .config_file("tern.toml")
//!     .module(ping_module())
//!     .build(outbound)
//!     .await?;
//!
//! spawn_transport(tx);
//! runtime.run(rx).await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tern_core::{BoxedOutbound, InboundEvent};
use tern_framework::{Bot, ModuleDescriptor};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{ConfigLoader, TernConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Counters for one runtime.
#[derive(Debug, Default)]
pub struct RuntimeStats {
    events: AtomicU64,
    ignored: AtomicU64,
    invocations: AtomicU64,
    degraded: AtomicU64,
}

impl RuntimeStats {
    /// Events pulled off the channel.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Events dropped because the nick is ignored.
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Handler invocations started.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Threaded invocations that ran inline because the pool was full.
    pub fn degraded(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }
}

/// Configuration, bot and event loop in one place.
pub struct TernRuntime {
    config: TernConfig,
    bot: Arc<Bot>,
    stats: RuntimeStats,
    running: AtomicBool,
    stopped: AtomicBool,
}

impl TernRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime from an already loaded configuration.
    ///
    /// Does not initialise logging.
    pub async fn from_config(
        config: TernConfig,
        outbound: BoxedOutbound,
        modules: Vec<ModuleDescriptor>,
        builtin: bool,
    ) -> RuntimeResult<Self> {
        let mut builder = Bot::builder(config.bot.clone(), outbound)
            .module_settings(config.modules.clone())
            .dispatch_settings(config.dispatch)
            .modules(modules);
        if !builtin {
            builder = builder.without_builtin();
        }
        let bot = builder.build().await?;

        info!(
            nick = %config.bot.nick,
            workers = config.dispatch.workers,
            "Runtime initialized"
        );
        Ok(Self {
            config,
            bot: Arc::new(bot),
            stats: RuntimeStats::default(),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &TernConfig {
        &self.config
    }

    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs until the channel closes, Ctrl+C or SIGTERM.
    pub async fn run(&self, events: mpsc::Receiver<InboundEvent>) -> RuntimeResult<()> {
        let signal = shutdown_signal()?;
        self.run_until(events, signal).await
    }

    /// Returns `true` once a run has finished. A stopped runtime cannot be
    /// run again.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Runs until the channel closes or `shutdown` completes.
    ///
    /// Loads every module first and tears them down on the way out, after
    /// queued threaded invocations have finished. The worker pool is closed
    /// for good at that point, so a second call returns
    /// [`RuntimeError::Stopped`].
    pub async fn run_until<F>(
        &self,
        mut events: mpsc::Receiver<InboundEvent>,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if self.is_stopped() {
            return Err(RuntimeError::Stopped);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyRunning);
        }

        let report = self.bot.start().await;
        info!(
            generation = report.generation,
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Tern runtime is now running"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        info!("Event source closed");
                        break;
                    }
                },
            }
        }

        self.stop().await;
        Ok(())
    }

    async fn handle(&self, event: InboundEvent) {
        self.stats.events.fetch_add(1, Ordering::Relaxed);
        let report = self.bot.dispatch(event).await;
        if report.ignored {
            self.stats.ignored.fetch_add(1, Ordering::Relaxed);
        }
        self.stats
            .invocations
            .fetch_add(report.invoked as u64, Ordering::Relaxed);
        self.stats
            .degraded
            .fetch_add(report.degraded as u64, Ordering::Relaxed);
    }

    async fn stop(&self) {
        info!("Stopping Tern runtime");
        self.bot.shutdown().await;
        self.stopped.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        debug!(
            events = self.stats.events(),
            invocations = self.stats.invocations(),
            degraded = self.stats.degraded(),
            "Runtime stopped"
        );
    }
}

impl std::fmt::Debug for TernRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TernRuntime")
            .field("nick", &self.config.bot.nick)
            .field("running", &self.is_running())
            .field("stopped", &self.is_stopped())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Completes on Ctrl+C or, on Unix, SIGTERM.
fn shutdown_signal() -> RuntimeResult<impl Future<Output = ()>> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        Ok(async move {
            tokio::select! {
                _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            }
        })
    }

    #[cfg(not(unix))]
    {
        Ok(async {
            let _ = signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down");
        })
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`TernRuntime`].
///
/// Loads configuration through [`ConfigLoader`] unless one is supplied with
/// [`config`](Self::config), then initialises logging from it.
#[must_use]
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<TernConfig>,
    modules: Vec<ModuleDescriptor>,
    builtin: bool,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            modules: Vec::new(),
            builtin: cfg!(feature = "builtin"),
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Layers `config` under files and the environment.
    pub fn merge(mut self, config: TernConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is; no files or environment are read.
    pub fn config(mut self, config: TernConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn module(mut self, desc: ModuleDescriptor) -> Self {
        self.modules.push(desc);
        self
    }

    pub fn modules(mut self, descs: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        self.modules.extend(descs);
        self
    }

    /// Leaves out the built-in `admin` module.
    pub fn without_builtin(mut self) -> Self {
        self.builtin = false;
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads configuration, initialises logging and registers the modules.
    pub async fn build(self, outbound: BoxedOutbound) -> RuntimeResult<TernRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        TernRuntime::from_config(config, outbound, self.modules, self.builtin).await
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use tern_core::RecordingOutbound;
    use tern_framework::{HandlerResult, HandlerSpec, Invocation, Module, ModuleState};
    use tokio::sync::oneshot;

    use super::*;

    async fn pong(inv: Invocation) -> HandlerResult {
        inv.reply("pong").await?;
        Ok(())
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct GreetConfig {
        greeting: String,
    }

    async fn greet(inv: Invocation) -> HandlerResult {
        let config: GreetConfig = inv.config()?;
        inv.say(format!("{}, {}", config.greeting, inv.nick())).await?;
        Ok(())
    }

    fn modules() -> Vec<ModuleDescriptor> {
        vec![
            ModuleDescriptor::new("ping", || {
                Module::new().handler(HandlerSpec::new("ping", pong).commands(["ping"]))
            }),
            ModuleDescriptor::new("greet", || {
                Module::new().handler(HandlerSpec::new("greet", greet).rule("hello").inline())
            }),
        ]
    }

    fn config() -> TernConfig {
        let mut config = TernConfig::default();
        config.bot.owner = Some("root".into());
        config.bot.ignore = vec!["spambot".into()];
        config
            .modules
            .config
            .insert("greet".into(), serde_json::json!({ "greeting": "hi" }));
        config
    }

    async fn runtime(out: &Arc<RecordingOutbound>) -> TernRuntime {
        TernRuntime::builder()
            .config(config())
            .without_logging()
            .modules(modules())
            .build(out.clone())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_runs_until_channel_closes() {
        let out = RecordingOutbound::new();
        let rt = runtime(&out).await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundEvent::message("alice", "#tern", ".ping")).await.unwrap();
        tx.send(InboundEvent::message("alice", "#tern", "hello")).await.unwrap();
        tx.send(InboundEvent::message("spambot", "#tern", ".ping")).await.unwrap();
        drop(tx);

        rt.run_until(rx, std::future::pending()).await.unwrap();

        let mut sent: Vec<String> = out.messages().iter().map(|m| m.rendered_text()).collect();
        sent.sort();
        assert_eq!(sent, vec!["alice: pong", "hi, alice"]);
        assert_eq!(rt.stats().events(), 3);
        assert_eq!(rt.stats().ignored(), 1);
        assert_eq!(rt.stats().invocations(), 2);
        assert!(!rt.is_running());
        assert_eq!(
            rt.bot().manager().state("ping").await,
            Some(ModuleState::Unloaded)
        );
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_loop() {
        let out = RecordingOutbound::new();
        let rt = Arc::new(runtime(&out).await);
        let (_tx, rx) = mpsc::channel::<InboundEvent>(8);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = {
            let rt = Arc::clone(&rt);
            tokio::spawn(async move {
                rt.run_until(rx, async {
                    let _ = stop_rx.await;
                })
                .await
            })
        };

        while !rt.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let (_tx2, rx2) = mpsc::channel::<InboundEvent>(1);
        let second = rt.run_until(rx2, std::future::ready(())).await;
        assert!(matches!(second, Err(RuntimeError::AlreadyRunning)));

        stop_tx.send(()).unwrap();
        tokio_test::assert_ok!(task.await.unwrap());
        assert!(!rt.is_running());
    }

    #[tokio::test]
    async fn test_stopped_runtime_cannot_run_again() {
        let out = RecordingOutbound::new();
        let rt = runtime(&out).await;

        let (tx, rx) = mpsc::channel(8);
        tx.send(InboundEvent::message("alice", "#tern", ".ping")).await.unwrap();
        drop(tx);
        rt.run_until(rx, std::future::pending()).await.unwrap();
        assert!(rt.is_stopped());
        assert_eq!(rt.stats().degraded(), 0);

        let (tx, rx) = mpsc::channel(8);
        tx.send(InboundEvent::message("alice", "#tern", ".ping")).await.unwrap();
        drop(tx);
        let second = rt.run_until(rx, std::future::pending()).await;
        assert!(matches!(second, Err(RuntimeError::Stopped)));
        assert_eq!(rt.stats().events(), 1);
        assert_eq!(rt.stats().degraded(), 0);
        assert_eq!(out.sent_to("#tern").len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut bad = config();
        bad.dispatch.workers = 0;
        let result = TernRuntime::builder()
            .config(bad)
            .without_logging()
            .build(RecordingOutbound::new())
            .await;
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[tokio::test]
    async fn test_builtin_reload_through_runtime() {
        let out = RecordingOutbound::new();
        let rt = runtime(&out).await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundEvent::message("root", "#tern", "tern: reload greet"))
            .await
            .unwrap();
        drop(tx);
        rt.run_until(rx, std::future::pending()).await.unwrap();

        if cfg!(feature = "builtin") {
            let sent = out.sent_to("#tern");
            assert_eq!(sent.len(), 1);
            assert!(sent[0].text.starts_with("greet reloaded (generation "));
        } else {
            assert!(out.is_empty());
        }
    }
}
