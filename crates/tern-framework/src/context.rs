//! Runtime context handed to handlers.
//!
//! - [`BotContext`] is shared by the whole bot: settings, the outbound
//!   transport, invocation stats, typed extensions, and a handle back to
//!   the module manager.
//! - [`Invocation`] is built once per matched handler and carries the
//!   triggering event, the capture groups, and the caller's privileges.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tern_core::{BoxedOutbound, InboundEvent, OutboundMessage, TransportResult};

use crate::handler::HandlerDescriptor;
use crate::manager::ModuleManager;
use crate::rule::RuleMatch;
use crate::settings::BotSettings;
use crate::stats::StatsTable;
use crate::text::break_up;

type ExtensionArc = Arc<dyn Any + Send + Sync>;

// ============================================================================
// BotContext
// ============================================================================

/// State shared by every handler of one bot.
pub struct BotContext {
    settings: Arc<BotSettings>,
    outbound: BoxedOutbound,
    stats: StatsTable,
    extensions: RwLock<HashMap<TypeId, ExtensionArc>>,
    modules: Weak<ModuleManager>,
}

impl BotContext {
    pub(crate) fn new(
        settings: Arc<BotSettings>,
        outbound: BoxedOutbound,
        modules: Weak<ModuleManager>,
    ) -> Self {
        Self {
            settings,
            outbound,
            stats: StatsTable::new(),
            extensions: RwLock::new(HashMap::new()),
            modules,
        }
    }

    /// Bot settings.
    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// The outbound transport.
    pub fn outbound(&self) -> &BoxedOutbound {
        &self.outbound
    }

    /// Invocation counters.
    pub fn stats(&self) -> &StatsTable {
        &self.stats
    }

    /// The module manager, unless the bot is being torn down.
    pub fn modules(&self) -> Option<Arc<ModuleManager>> {
        self.modules.upgrade()
    }

    /// Sends `text` to `target`, split to the configured message length.
    pub async fn msg(&self, target: &str, text: &str) -> TransportResult<()> {
        for part in break_up(text, self.settings.max_message_length) {
            self.outbound
                .send(OutboundMessage::message(target, part))
                .await?;
        }
        Ok(())
    }

    /// Stores a shared value, replacing any previous value of type `T`.
    ///
    /// Modules use this from `setup` to publish state their handlers read.
    pub fn insert_extension<T: Send + Sync + 'static>(&self, value: T) {
        self.extensions.write().insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Returns the shared value of type `T`, if any.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.extensions
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }

    /// Removes the shared value of type `T`.
    pub fn remove_extension<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.extensions
            .write()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
    }
}

impl fmt::Debug for BotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotContext")
            .field("nick", &self.settings.nick)
            .field("stats", &self.stats.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Everything one handler call can see and do.
///
/// Cheap to clone; the event and handler metadata are shared.
#[derive(Clone)]
pub struct Invocation {
    bot: Arc<BotContext>,
    event: Arc<InboundEvent>,
    handler: Arc<HandlerDescriptor>,
    matched: RuleMatch,
    admin: bool,
    owner: bool,
}

impl Invocation {
    pub(crate) fn new(
        bot: Arc<BotContext>,
        event: Arc<InboundEvent>,
        handler: Arc<HandlerDescriptor>,
        matched: RuleMatch,
    ) -> Self {
        let admin = bot.settings().is_admin(&event.nick);
        let owner = bot.settings().is_owner(&event.nick);
        Self {
            bot,
            event,
            handler,
            matched,
            admin,
            owner,
        }
    }

    // ─── Event ──────────────────────────────────────────────────────────────

    pub fn event(&self) -> &InboundEvent {
        &self.event
    }

    /// The matched text.
    pub fn text(&self) -> &str {
        &self.event.text
    }

    /// Nick of the caller.
    pub fn nick(&self) -> &str {
        &self.event.nick
    }

    /// Where replies go: a channel, or the caller's nick in private.
    pub fn sender(&self) -> &str {
        &self.event.sender
    }

    pub fn args(&self) -> &[String] {
        &self.event.args
    }

    /// Capture group `n` of the matched rule. Group 0 is the whole text.
    pub fn group(&self, n: usize) -> Option<&str> {
        self.matched.group(n)
    }

    pub fn groups(&self) -> &[Option<String>] {
        self.matched.groups()
    }

    /// Target named by a trailing `-> nick`, for point handlers.
    pub fn redirect(&self) -> Option<&str> {
        self.matched.redirect()
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    // ─── Handler ────────────────────────────────────────────────────────────

    pub fn handler(&self) -> &HandlerDescriptor {
        &self.handler
    }

    /// Registry generation the handler's module was loaded in.
    pub fn generation(&self) -> u64 {
        self.handler.generation
    }

    pub fn bot(&self) -> &Arc<BotContext> {
        &self.bot
    }

    pub fn settings(&self) -> &BotSettings {
        self.bot.settings()
    }

    /// Deserializes the configuration section of the handler's module.
    pub fn config<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self
            .bot
            .modules()
            .map(|m| m.module_config(&self.handler.module))
            .unwrap_or(serde_json::Value::Null);
        T::deserialize(&value)
    }

    // ─── Output ─────────────────────────────────────────────────────────────

    /// Replies to the caller, addressed to them (or to the redirect target).
    ///
    /// In private the reply is not prefixed with the caller's nick.
    pub async fn reply(&self, text: impl AsRef<str>) -> TransportResult<()> {
        let mention = match self.redirect() {
            Some(target) => Some(target),
            None if self.event.is_channel() => Some(self.nick()),
            None => None,
        };
        // The rendered line is `nick: text`, so the mention counts toward the limit.
        let max_length = self.bot.settings().max_message_length;
        let body_length = mention.map_or(max_length, |nick| {
            max_length.saturating_sub(nick.len() + 2)
        });
        for part in break_up(text.as_ref(), body_length) {
            let mut msg = OutboundMessage::message(self.sender(), part);
            if let Some(nick) = mention {
                msg = msg.mentioning(nick);
            }
            self.bot.outbound().send(msg).await?;
        }
        Ok(())
    }

    /// Sends `text` to where the event came from.
    pub async fn say(&self, text: impl AsRef<str>) -> TransportResult<()> {
        self.bot.msg(self.sender(), text.as_ref()).await
    }

    /// Sends an emote to where the event came from.
    pub async fn act(&self, text: impl AsRef<str>) -> TransportResult<()> {
        self.bot
            .outbound()
            .send(OutboundMessage::action(self.sender(), text.as_ref()))
            .await
    }

    /// Sends `text` to an arbitrary target.
    pub async fn msg(&self, target: &str, text: impl AsRef<str>) -> TransportResult<()> {
        self.bot.msg(target, text.as_ref()).await
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("handler", &self.handler.qualified_name())
            .field("nick", &self.event.nick)
            .field("sender", &self.event.sender)
            .field("groups", &self.matched.groups())
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}
