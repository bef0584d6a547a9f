//! Handler declarations.
//!
//! A handler is any async function taking an [`Invocation`] and returning a
//! [`HandlerResult`]:
//!
//! ```rust,ignore
//! async fn ping(inv: Invocation) -> HandlerResult {
//!     inv.reply("pong").await?;
//!     Ok(())
//! }
//!
//! let spec = HandlerSpec::new("ping", ping)
//!     .commands(["ping"])
//!     .priority(Priority::High)
//!     .doc("Checks that the bot is alive.")
//!     .example(".ping");
//! ```
//!
//! A [`HandlerSpec`] is the declaration as written by a module. When the
//! module loads, each spec is compiled into a [`HandlerDescriptor`] (shared,
//! immutable metadata) plus the [`Rule`]s that select it.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tern_core::EventFilter;

use crate::context::Invocation;
use crate::error::RuleError;
use crate::rule::{Rule, RuleCompiler, RuleSpec};

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler returns. Return a [`Grumble`](crate::Grumble) to send the
/// caller a message instead of reporting a failure.
pub type HandlerResult = anyhow::Result<()>;

// ============================================================================
// Handler Trait
// ============================================================================

/// Type-erased handler callable.
///
/// Implemented for every `Fn(Invocation) -> impl Future<Output = HandlerResult>`.
pub trait ErasedHandler: Send + Sync {
    /// Runs the handler for one invocation.
    fn call(&self, inv: Invocation) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> ErasedHandler for F
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, inv: Invocation) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(inv))
    }
}

/// A handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Converts a handler function into a [`BoxedHandler`].
pub fn into_handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

// ============================================================================
// Priority & Concurrency
// ============================================================================

/// Scan tier. Higher tiers are scanned first; every tier is scanned.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Every tier, in scan order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Position in [`Priority::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

/// How an invocation is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concurrency {
    /// Submitted to the worker pool; dispatch does not wait for it.
    #[default]
    Threaded,
    /// Awaited on the dispatch task before the scan continues.
    Inline,
}

// ============================================================================
// HandlerSpec
// ============================================================================

/// A handler declaration, as written by a module.
#[derive(Clone)]
pub struct HandlerSpec {
    name: Cow<'static, str>,
    handler: BoxedHandler,
    rule: Option<RuleSpec>,
    commands: Vec<String>,
    priority: Priority,
    concurrency: Concurrency,
    point: bool,
    event: EventFilter,
    doc: Option<String>,
    example: Option<String>,
}

impl HandlerSpec {
    /// Declares a handler named `name`. Add a rule or commands before use.
    pub fn new<F, Fut>(name: impl Into<Cow<'static, str>>, handler: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: into_handler(handler),
            rule: None,
            commands: Vec::new(),
            priority: Priority::default(),
            concurrency: Concurrency::default(),
            point: false,
            event: EventFilter::default(),
            doc: None,
            example: None,
        }
    }

    /// Sets the rule.
    pub fn rule(mut self, rule: impl Into<RuleSpec>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the command words.
    pub fn commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the scan tier.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Runs the handler on the dispatch task.
    pub fn inline(mut self) -> Self {
        self.concurrency = Concurrency::Inline;
        self
    }

    /// Sets the execution mode.
    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Accepts a trailing `-> nick` redirect on every rule of this handler.
    pub fn point(mut self) -> Self {
        self.point = true;
        self
    }

    /// Sets the event filter, e.g. `"JOIN"` or `"*"`.
    pub fn event(mut self, event: impl Into<EventFilter>) -> Self {
        self.event = event.into();
        self
    }

    /// Sets the help text.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Sets the usage example. `$nickname` is replaced with the bot's nick.
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Handler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiles this declaration for `module`.
    ///
    /// Returns the shared descriptor and the rules that select it. Both a
    /// rule and a command list may be declared; each yields one [`Rule`].
    pub fn compile(
        &self,
        module: &str,
        generation: u64,
        compiler: &RuleCompiler,
    ) -> Result<(Arc<HandlerDescriptor>, Vec<Rule>), RuleError> {
        if self.rule.is_none() && self.commands.is_empty() {
            return Err(RuleError::NoRule {
                handler: self.name.to_string(),
            });
        }

        let mut rules = Vec::with_capacity(2);
        if let Some(rule) = &self.rule {
            rules.push(compiler.compile(&self.name, rule, self.point)?);
        }
        if !self.commands.is_empty() {
            rules.push(compiler.compile_commands(&self.name, &self.commands, self.point)?);
        }

        let descriptor = HandlerDescriptor {
            name: self.name.to_string(),
            module: module.to_string(),
            generation,
            priority: self.priority,
            concurrency: self.concurrency,
            event: self.event.clone(),
            point: self.point,
            doc: self.doc.clone(),
            example: self
                .example
                .as_ref()
                .map(|e| e.replace("$nickname", compiler.nick())),
            handler: Arc::clone(&self.handler),
        };
        Ok((Arc::new(descriptor), rules))
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .field("commands", &self.commands)
            .field("priority", &self.priority)
            .field("concurrency", &self.concurrency)
            .field("point", &self.point)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HandlerDescriptor
// ============================================================================

/// Compiled, immutable handler metadata shared by every invocation.
pub struct HandlerDescriptor {
    /// Handler name, unique within its module.
    pub name: String,
    /// Owning module name.
    pub module: String,
    /// Registry generation the owning module was loaded in.
    pub generation: u64,
    /// Scan tier.
    pub priority: Priority,
    /// Execution mode.
    pub concurrency: Concurrency,
    /// Event kinds this handler accepts.
    pub event: EventFilter,
    /// Whether rules accept a redirect suffix.
    pub point: bool,
    /// Help text.
    pub doc: Option<String>,
    /// Usage example with the bot's nick substituted.
    pub example: Option<String>,
    handler: BoxedHandler,
}

impl HandlerDescriptor {
    /// `module.handler`, as used in logs and failure reports.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub(crate) fn call(&self, inv: Invocation) -> BoxFuture<'static, HandlerResult> {
        self.handler.call(inv)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("generation", &self.generation)
            .field("priority", &self.priority)
            .field("concurrency", &self.concurrency)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BotSettings;

    async fn noop(_inv: Invocation) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn test_no_rule_rejected() {
        let compiler = RuleCompiler::new(&BotSettings::default());
        let err = HandlerSpec::new("empty", noop)
            .compile("m", 1, &compiler)
            .unwrap_err();
        assert!(matches!(err, RuleError::NoRule { .. }));
    }

    #[test]
    fn test_rule_and_commands_both_bind() {
        let compiler = RuleCompiler::new(&BotSettings::default());
        let (descriptor, rules) = HandlerSpec::new("both", noop)
            .rule("hello")
            .commands(["hi"])
            .compile("greet", 3, &compiler)
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(descriptor.qualified_name(), "greet.both");
        assert_eq!(descriptor.generation, 3);
    }

    #[test]
    fn test_example_substitutes_nickname() {
        let compiler = RuleCompiler::new(&BotSettings::new("wren"));
        let (descriptor, _) = HandlerSpec::new("reload", noop)
            .commands(["reload"])
            .example("$nickname: reload weather")
            .compile("admin", 1, &compiler)
            .unwrap();
        assert_eq!(descriptor.example.as_deref(), Some("wren: reload weather"));
    }

    #[test]
    fn test_priority_parse_and_order() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::High < Priority::Low);
        assert_eq!(Priority::ALL.map(Priority::index), [0, 1, 2]);
    }
}
