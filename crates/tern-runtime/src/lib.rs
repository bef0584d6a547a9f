//! # Tern Runtime
//!
//! Everything around the router that a deployed bot needs:
//!
//! - Layered configuration with figment: defaults, `tern.toml` / `tern.yaml`,
//!   `TERN_*` environment variables ([`ConfigLoader`], [`TernConfig`])
//! - Logging through `tracing-subscriber`, optionally to a rolling file
//!   ([`LoggingBuilder`])
//! - The event loop that feeds inbound events to the dispatch engine and
//!   shuts down cleanly on Ctrl+C or SIGTERM ([`TernRuntime`])
//!
//! ```rust,ignore
//! use tern_runtime::TernRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (outbound, mut lines) = ChannelOutbound::channel(64);
//!     let (events_tx, events_rx) = tokio::sync::mpsc::channel(64);
//!
//!     let runtime = TernRuntime::builder()
//!         .module(ping_module())
//!         .build(Arc::new(outbound))
//!         .await?;
//!
//!     connect_transport(events_tx, lines);
//!     runtime.run(events_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, TernConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, RuntimeStats, TernRuntime};

// Re-export tracing for use by module crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros, for modules that only depend on the runtime.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
