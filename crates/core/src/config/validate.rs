use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Bitrate format (enforced by serde)
/// - Thread count is not 0
/// - Timeouts are not 0
/// - Source and target formats differ
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.conversion.threads == Some(0) {
        return Err(ConfigError::ValidationError(
            "conversion.threads cannot be 0".to_string(),
        ));
    }

    if config.conversion.source_format == config.conversion.target_format {
        return Err(ConfigError::ValidationError(format!(
            "conversion.source_format and conversion.target_format are both '{}'",
            config.conversion.source_format
        )));
    }

    if config.converter.encode_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.encode_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.converter.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.probe_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
