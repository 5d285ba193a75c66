//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{HeraldConfig, LogOutput, LoggingConfig, NotificationConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_notification_config(&config.notifications)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when output is 'file'",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {module:?}"
        )));
    }

    Ok(())
}

fn validate_notification_config(notifications: &NotificationConfig) -> ConfigResult<()> {
    if notifications.max_attempts == 0 {
        return Err(ConfigError::validation(
            "notifications.max_attempts must be at least 1",
        ));
    }

    if notifications.base_delay_ms == 0 {
        return Err(ConfigError::validation(
            "notifications.base_delay_ms must be greater than 0",
        ));
    }

    if notifications.max_delay_ms < notifications.base_delay_ms {
        return Err(ConfigError::validation(
            "notifications.max_delay_ms must be greater than or equal to base_delay_ms",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&HeraldConfig::default()).is_ok());
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let mut config = HeraldConfig::default();
        config.notifications.max_attempts = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn max_delay_below_base_is_rejected() {
        let mut config = HeraldConfig::default();
        config.notifications.base_delay_ms = 5000;
        config.notifications.max_delay_ms = 1000;
        assert!(validate_config(&config).is_err());

        config.notifications.base_delay_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn file_output_needs_a_path() {
        let mut config = HeraldConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("logs/herald.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn blank_filter_target_is_rejected() {
        let mut config = HeraldConfig::default();
        config.logging.filters.insert(" ".into(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
