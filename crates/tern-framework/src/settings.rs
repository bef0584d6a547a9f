//! Bot-level settings consumed by the router.
//!
//! These are plain serde structs. `tern-runtime` embeds them in its figment
//! configuration schema; tests and embedders can build them directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Bot Settings
// ============================================================================

/// Identity, privilege and routing policy for one bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSettings {
    /// The bot's own nick. Substituted for `$nickname` and `$nick` in rules.
    #[serde(default = "default_nick")]
    pub nick: String,

    /// Literal command prefix, e.g. `.` for `.ping`.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Nick of the bot owner. The owner is always an admin.
    #[serde(default)]
    pub owner: Option<String>,

    /// Additional admin nicks.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Nicks whose events are dropped before matching.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Per-channel allow-lists of module names.
    ///
    /// A channel with a non-empty list only runs handlers from the listed
    /// modules. Channels without an entry are unrestricted.
    #[serde(default)]
    pub limit: HashMap<String, Vec<String>>,

    /// Longest outbound message body before it is split.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

fn default_nick() -> String {
    "tern".to_string()
}

fn default_prefix() -> String {
    ".".to_string()
}

fn default_max_message_length() -> usize {
    430
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            prefix: default_prefix(),
            owner: None,
            admins: Vec::new(),
            ignore: Vec::new(),
            limit: HashMap::new(),
            max_message_length: default_max_message_length(),
        }
    }
}

impl BotSettings {
    /// Creates settings for a bot named `nick`, everything else default.
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ..Self::default()
        }
    }

    /// Sets the command prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the owner nick.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Adds an admin nick.
    pub fn with_admin(mut self, admin: impl Into<String>) -> Self {
        self.admins.push(admin.into());
        self
    }

    /// Adds a nick to the ignore list.
    pub fn with_ignored(mut self, nick: impl Into<String>) -> Self {
        self.ignore.push(nick.into());
        self
    }

    /// Restricts `channel` to the given modules.
    pub fn with_limit<I, S>(mut self, channel: impl Into<String>, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.limit
            .insert(channel.into(), modules.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if `nick` is the owner.
    pub fn is_owner(&self, nick: &str) -> bool {
        self.owner.as_deref() == Some(nick)
    }

    /// Returns `true` if `nick` is the owner or a listed admin.
    pub fn is_admin(&self, nick: &str) -> bool {
        self.is_owner(nick) || self.admins.iter().any(|a| a == nick)
    }

    /// Returns `true` if events from `nick` must be dropped.
    pub fn is_ignored(&self, nick: &str) -> bool {
        self.ignore.iter().any(|n| n == nick)
    }

    /// Returns `true` if `module` may run for events addressed to `sender`.
    ///
    /// Only channel targets (`#...`) are subject to the allow-list.
    pub fn allows(&self, sender: &str, module: &str) -> bool {
        if !sender.starts_with('#') {
            return true;
        }
        match self.limit.get(sender) {
            Some(modules) if !modules.is_empty() => modules.iter().any(|m| m == module),
            _ => true,
        }
    }

    /// Every nick that receives failure reports, owner first, deduplicated.
    pub fn report_recipients(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.admins.len() + 1);
        for nick in self.owner.iter().chain(self.admins.iter()) {
            if !out.contains(&nick.as_str()) {
                out.push(nick);
            }
        }
        out
    }
}

// ============================================================================
// Module Settings
// ============================================================================

/// Which modules load, and the per-module configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSettings {
    /// If set, only these modules load.
    #[serde(default)]
    pub enable: Option<Vec<String>>,

    /// Modules that never load.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Free-form configuration, keyed by module name.
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl ModuleSettings {
    /// Returns `true` if the module named `name` should load.
    pub fn selects(&self, name: &str) -> bool {
        if self.exclude.iter().any(|n| n == name) {
            return false;
        }
        match &self.enable {
            Some(enabled) => enabled.iter().any(|n| n == name),
            None => true,
        }
    }

    /// Returns the configuration section for `name`, or `Null`.
    pub fn config_for(&self, name: &str) -> serde_json::Value {
        self.config
            .get(name)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

// ============================================================================
// Dispatch Settings
// ============================================================================

/// Sizing of the worker pool that runs threaded handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Number of worker tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Invocations that may wait for a worker before submission degrades to
    /// inline execution.
    #[serde(default = "default_backlog")]
    pub backlog: usize,
}

fn default_workers() -> usize {
    8
}

fn default_backlog() -> usize {
    256
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backlog: default_backlog(),
        }
    }
}
