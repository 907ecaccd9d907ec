//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, DispatchConfig, LogOutput, LoggingConfig, SparkConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SparkConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_bot_config(&config.bot)?;
    validate_dispatch_config(&config.dispatch)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::missing_field("bot.prefix"));
    }
    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Command prefix must not contain whitespace: {:?}",
            bot.prefix
        )));
    }

    if bot.server_id.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::validation("bot.server_id must not be empty"));
    }
    if bot.banned_channels.iter().any(String::is_empty) {
        return Err(ConfigError::validation(
            "bot.banned_channels must not contain empty ids",
        ));
    }

    Ok(())
}

fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.bridge_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Bridge timeout must be greater than 0",
        ));
    }

    if dispatch.drain_limit == 0 {
        return Err(ConfigError::validation("Drain limit must be at least 1"));
    }

    if dispatch.max_pipe_expansions == 0 {
        return Err(ConfigError::validation(
            "Max pipe expansions must be at least 1",
        ));
    }

    Ok(())
}
