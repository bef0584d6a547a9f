//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DispatchConfig, LogOutput, LoggingConfig, ModulesConfig, TernConfig};
use tern_framework::BotSettings;

/// Shortest `max_message_length` that still leaves room for a word.
pub const MIN_MESSAGE_LENGTH: usize = 16;

/// Validates the entire configuration.
pub fn validate_config(config: &TernConfig) -> ConfigResult<()> {
    validate_bot(&config.bot)?;
    validate_modules(&config.modules)?;
    validate_dispatch(&config.dispatch)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_bot(bot: &BotSettings) -> ConfigResult<()> {
    if bot.nick.is_empty() {
        return Err(ConfigError::missing_field("bot.nick"));
    }
    if bot.nick.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Bot nick cannot contain whitespace"));
    }
    if bot.prefix.is_empty() {
        return Err(ConfigError::missing_field("bot.prefix"));
    }
    if bot.max_message_length < MIN_MESSAGE_LENGTH {
        return Err(ConfigError::validation(format!(
            "bot.max_message_length must be at least {MIN_MESSAGE_LENGTH}, got {}",
            bot.max_message_length
        )));
    }
    Ok(())
}

fn validate_modules(modules: &ModulesConfig) -> ConfigResult<()> {
    let Some(enable) = &modules.enable else {
        return Ok(());
    };
    if let Some(name) = enable.iter().find(|n| modules.exclude.contains(n)) {
        return Err(ConfigError::validation(format!(
            "Module '{name}' is both enabled and excluded"
        )));
    }
    Ok(())
}

fn validate_dispatch(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.workers == 0 {
        return Err(ConfigError::validation("dispatch.workers must be greater than 0"));
    }
    if dispatch.backlog == 0 {
        return Err(ConfigError::validation("dispatch.backlog must be greater than 0"));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}
