//! Error types for the Tern framework.

use thiserror::Error;

/// A deliberate, user-correctable failure raised by handler code.
///
/// The dispatcher recognises this error anywhere in a handler's error chain
/// and delivers its message to the caller as a reply instead of logging it
/// as a bug or reporting it to the admins.
///
/// ```rust,ignore
/// async fn weather(inv: Invocation) -> HandlerResult {
///     let Some(city) = inv.group(2) else {
///         return Err(Grumble::new("which city?").into());
///     };
///     // ...
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Grumble(pub String);

impl Grumble {
    /// Creates a user-facing error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the message delivered to the caller.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Errors raised while compiling a handler's rule description.
///
/// A rule error disqualifies a single handler; its siblings in the same
/// module still load.
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    /// The handler declared neither a `rule` nor a `commands` list.
    #[error("handler '{handler}' declares neither a rule nor commands")]
    NoRule {
        /// Handler name.
        handler: String,
    },

    /// A command-style rule was given an empty command list.
    #[error("handler '{handler}' has an empty command list")]
    EmptyCommands {
        /// Handler name.
        handler: String,
    },

    /// The final pattern is not a valid regular expression.
    #[error("handler '{handler}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Handler name.
        handler: String,
        /// The pattern after placeholder substitution.
        pattern: String,
        /// Regex compiler message.
        reason: String,
    },
}

/// Errors raised by module lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    /// No module with this name has been registered.
    #[error("{0}: no such module!")]
    Unknown(String),

    /// A module with this name is already registered.
    #[error("module '{0}' is already registered")]
    Duplicate(String),

    /// The module factory panicked while building the module.
    #[error("module '{module}' could not be built: {reason}")]
    Build {
        /// Module name.
        module: String,
        /// Panic message.
        reason: String,
    },

    /// A lifecycle hook returned an error or panicked.
    #[error("error during {hook} of module '{module}': {reason}")]
    Hook {
        /// Module name.
        module: String,
        /// Hook name (`setup` or `teardown`).
        hook: &'static str,
        /// Error description.
        reason: String,
    },

    /// The bot context is gone (the bot was dropped).
    #[error("module manager is no longer available")]
    Unavailable,
}

/// Result type for module lifecycle operations.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grumble_found_in_chain() {
        let err = anyhow::Error::new(Grumble::new("bad input")).context("while parsing");
        let grumble = err.chain().find_map(|e| e.downcast_ref::<Grumble>());
        assert_eq!(grumble.map(Grumble::message), Some("bad input"));
    }

    #[test]
    fn test_unknown_module_message() {
        assert_eq!(
            ModuleError::Unknown("wiki".into()).to_string(),
            "wiki: no such module!"
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
