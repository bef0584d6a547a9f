//! Dispatch engine.
//!
//! For every inbound event the [`Dispatcher`]:
//!
//! 1. drops the event if the originating nick is ignored;
//! 2. takes one snapshot of the handler table;
//! 3. scans the tiers high → medium → low, each in registration order;
//! 4. for every binding whose event filter accepts the event and whose rule
//!    full-matches the text, checks the channel allow-list, then invokes the
//!    handler inline or on the worker pool;
//! 5. records the invocation in the stats table.
//!
//! Matching never short-circuits: every matching handler in every tier runs.
//! Each invocation is contained: a [`Grumble`] is replied to the caller, any
//! other error or a panic is logged and reported to the admins, and dispatch
//! carries on.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tern_core::InboundEvent;
use tracing::{Instrument, debug, error, info_span, trace, warn};

use crate::context::{BotContext, Invocation};
use crate::error::{Grumble, panic_message};
use crate::handler::{Concurrency, HandlerDescriptor, Priority};
use crate::manager::ModuleManager;
use crate::pool::{Job, RejectReason, WorkerPool};
use crate::registry::Registry;
use crate::text::truncate;

/// What one dispatch pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Generation of the table that was scanned.
    pub generation: u64,
    /// The originating nick is ignored; nothing was scanned.
    pub ignored: bool,
    /// Handlers invoked, by any path.
    pub invoked: usize,
    /// Invocations awaited on the dispatch task.
    pub inline: usize,
    /// Invocations submitted to the worker pool.
    pub threaded: usize,
    /// Threaded invocations run inline because the pool was saturated.
    pub degraded: usize,
    /// Matches suppressed by a channel allow-list.
    pub limited: usize,
}

/// Routes inbound events to matching handlers.
///
/// Holds the [`ModuleManager`] alive so that handlers reaching it through
/// [`BotContext::modules`] (`reload`, `help`) keep working.
pub struct Dispatcher {
    manager: Arc<ModuleManager>,
    registry: Arc<Registry>,
    context: Arc<BotContext>,
    pool: WorkerPool,
}

impl Dispatcher {
    /// Creates a dispatcher reading `manager`'s registry.
    pub fn new(manager: &Arc<ModuleManager>, pool: WorkerPool) -> Self {
        Self {
            manager: Arc::clone(manager),
            registry: Arc::clone(manager.registry()),
            context: Arc::clone(manager.context()),
            pool,
        }
    }

    pub fn manager(&self) -> &Arc<ModuleManager> {
        &self.manager
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Runs every handler that matches `event`.
    ///
    /// Returns once all inline invocations have finished and all threaded
    /// ones have been submitted.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchReport {
        let span = info_span!(
            "dispatch",
            kind = %event.kind,
            nick = %event.nick,
            sender = %event.sender,
        );
        self.dispatch_event(Arc::new(event)).instrument(span).await
    }

    async fn dispatch_event(&self, event: Arc<InboundEvent>) -> DispatchReport {
        let settings = self.context.settings();
        if settings.is_ignored(&event.nick) {
            debug!("Dropping event from ignored nick");
            return DispatchReport {
                ignored: true,
                ..DispatchReport::default()
            };
        }

        let table = self.registry.snapshot();
        let mut report = DispatchReport {
            generation: table.generation(),
            ..DispatchReport::default()
        };

        for priority in Priority::ALL {
            for binding in table.tier(priority) {
                let handler = &binding.handler;
                if !handler.event.accepts(&event.kind) {
                    continue;
                }
                let Some(matched) = binding.rule.matches(&event.text) else {
                    continue;
                };
                if !settings.allows(&event.sender, &handler.module) {
                    trace!(module = %handler.module, "Module not allowed in this channel");
                    report.limited += 1;
                    continue;
                }

                let inv = Invocation::new(
                    Arc::clone(&self.context),
                    Arc::clone(&event),
                    Arc::clone(handler),
                    matched,
                );
                let job = invoke(Arc::clone(handler), inv);
                match handler.concurrency {
                    Concurrency::Inline => {
                        job.await;
                        report.inline += 1;
                    }
                    Concurrency::Threaded => match self.pool.try_submit(job) {
                        Ok(()) => report.threaded += 1,
                        Err(rejected) => {
                            match rejected.reason {
                                RejectReason::Full => warn!(
                                    handler = %handler.qualified_name(),
                                    queued = self.pool.queue_depth(),
                                    "Worker pool saturated, running handler inline"
                                ),
                                RejectReason::Closed => warn!(
                                    handler = %handler.qualified_name(),
                                    "Worker pool is shut down, running handler inline"
                                ),
                            }
                            rejected.job.await;
                            report.degraded += 1;
                        }
                    },
                }
                report.invoked += 1;
                self.record(handler, &event);
            }
        }

        trace!(invoked = report.invoked, generation = report.generation, "Dispatch finished");
        report
    }

    /// Counts the invocation once for the caller and once for the target,
    /// or once in total when they are the same identity.
    fn record(&self, handler: &HandlerDescriptor, event: &InboundEvent) {
        let stats = self.context.stats();
        stats.record(&handler.name, &event.nick);
        if event.sender != event.nick {
            stats.record(&handler.name, &event.sender);
        }
    }

    /// Stops the worker pool after the queued invocations have finished.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("generation", &self.registry.generation())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Invocation containment
// =============================================================================

/// Wraps one handler call with error classification and panic capture.
fn invoke(handler: Arc<HandlerDescriptor>, inv: Invocation) -> Job {
    let span = info_span!("invoke", module = %handler.module, handler = %handler.name);
    Box::pin(
        async move {
            let call = async { handler.call(inv.clone()).await };
            match AssertUnwindSafe(call).catch_unwind().await {
                Ok(Ok(())) => trace!("Handler finished"),
                Ok(Err(err)) => handle_error(&handler, &inv, err).await,
                Err(payload) => {
                    let summary = format!("panicked: {}", panic_message(payload.as_ref()));
                    report_failure(&handler, &inv, &summary).await;
                }
            }
        }
        .instrument(span),
    )
}

async fn handle_error(handler: &HandlerDescriptor, inv: &Invocation, err: anyhow::Error) {
    // `anyhow::Chain` is not `Send`; drop it before the first await.
    let grumble = err
        .chain()
        .find_map(|e| e.downcast_ref::<Grumble>())
        .map(|g| g.message().to_string());
    if let Some(message) = grumble {
        debug!(%message, "Handler refused the request");
        if let Err(e) = inv.reply(&message).await {
            warn!(error = %e, "Could not deliver handler message");
        }
        return;
    }
    report_failure(handler, inv, &format!("{err:#}")).await;
}

async fn report_failure(handler: &HandlerDescriptor, inv: &Invocation, summary: &str) {
    error!(error = %summary, nick = %inv.nick(), text = %inv.text(), "Handler failed");
    let text = truncate(
        &format!("{} failed: {summary}", handler.qualified_name()),
        inv.settings().max_message_length,
    );
    for admin in inv.settings().report_recipients() {
        if let Err(e) = inv.bot().msg(admin, &text).await {
            warn!(admin = %admin, error = %e, "Could not report handler failure");
        }
    }
}
