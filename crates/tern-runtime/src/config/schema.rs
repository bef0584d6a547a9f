//! Configuration schema definitions.
//!
//! ```toml
//! [bot]
//! nick = "tern"
//! prefix = "."
//! owner = "root"
//! admins = ["ops"]
//! ignore = ["spambot"]
//! limit = { "#quiet" = ["admin"] }
//!
//! [modules]
//! exclude = ["weather"]
//! config.seen = { max_entries = 500 }
//!
//! [dispatch]
//! workers = 8
//! backlog = 256
//!
//! [logging]
//! level = "debug"
//! filters = { tern_framework = "trace" }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tern_framework::{BotSettings, DispatchSettings, ModuleSettings};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TernConfig {
    /// Identity, privileges and routing policy.
    #[serde(default)]
    pub bot: BotSettings,

    /// Module selection and per-module sections.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Worker pool sizing.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[modules]`: enable/exclude lists and `config.<module>` sections.
pub type ModulesConfig = ModuleSettings;

/// `[dispatch]`: `workers` and `backlog`.
pub type DispatchConfig = DispatchSettings;

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Writes to `file_path`.
    File,
}

/// How often the log file is rolled over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level. `RUST_LOG` takes precedence when set.
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file, for `output = "file"`.
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Include thread ids in each line.
    pub thread_ids: bool,
    /// Include source file and line in each line.
    pub file_location: bool,
    pub span_events: SpanEventConfig,
    /// Per-target levels, e.g. `tern_framework = "trace"`.
    pub filters: HashMap<String, LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TernConfig::default();
        assert_eq!(config.bot.prefix, ".");
        assert_eq!(config.bot.max_message_length, 430);
        assert_eq!(config.dispatch.workers, 8);
        assert_eq!(config.dispatch.backlog, 256);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.modules.enable.is_none());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: TernConfig = serde_json::from_value(serde_json::json!({
            "bot": { "nick": "wren", "admins": ["ops"] },
            "modules": { "config": { "seen": { "max_entries": 5 } } },
            "logging": { "format": "pretty", "filters": { "tern_framework": "trace" } },
        }))
        .unwrap();
        assert_eq!(config.bot.nick, "wren");
        assert_eq!(config.bot.prefix, ".");
        assert_eq!(config.modules.config_for("seen")["max_entries"], 5);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filters["tern_framework"], LogLevel::Trace);
        assert_eq!(config.dispatch.workers, 8);
    }
}
