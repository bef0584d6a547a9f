//! Helpers for testing modules without a network connection.
//!
//! ```rust,ignore
//! let (bot, out) = testing::started_bot("tern", [ping_module()]).await;
//! bot.dispatch(InboundEvent::message("alice", "#tern", ".ping")).await;
//! testing::settle(&bot).await;
//! assert_eq!(out.messages()[0].rendered_text(), "alice: pong");
//! ```

use std::sync::Arc;

pub use tern_core::RecordingOutbound;

use crate::bot::Bot;
use crate::module::ModuleDescriptor;
use crate::settings::BotSettings;

/// Builds and starts a bot named `nick` whose output is recorded.
///
/// The built-in module is left out; `root` is the owner.
///
/// # Panics
///
/// Panics if two modules share a name.
pub async fn started_bot(
    nick: &str,
    modules: impl IntoIterator<Item = ModuleDescriptor>,
) -> (Bot, Arc<RecordingOutbound>) {
    started_bot_with(BotSettings::new(nick).with_owner("root"), modules).await
}

/// Like [`started_bot`] with explicit settings.
///
/// # Panics
///
/// Panics if two modules share a name.
pub async fn started_bot_with(
    settings: BotSettings,
    modules: impl IntoIterator<Item = ModuleDescriptor>,
) -> (Bot, Arc<RecordingOutbound>) {
    let outbound = RecordingOutbound::new();
    let bot = Bot::builder(settings, outbound.clone())
        .without_builtin()
        .modules(modules)
        .build()
        .await
        .unwrap_or_else(|e| panic!("test bot: {e}"));
    bot.start().await;
    (bot, outbound)
}

/// Waits until every threaded invocation submitted so far has finished.
///
/// Stops the worker pool; later threaded invocations run inline.
pub async fn settle(bot: &Bot) {
    bot.dispatcher().shutdown().await;
}
