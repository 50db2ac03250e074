use super::{types::Config, ConfigError, MAX_BATCH_SIZE};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.limits.max_batch_size == 0 || config.limits.max_batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::ValidationError(format!(
            "limits.max_batch_size must be between 1 and {}",
            MAX_BATCH_SIZE
        )));
    }

    if config.limits.max_file_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "limits.max_file_size_bytes cannot be 0".to_string(),
        ));
    }

    if config.transcoder.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "transcoder.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.progress.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "progress.channel_capacity cannot be 0".to_string(),
        ));
    }

    if config.storage.upload_dir == config.storage.output_dir {
        return Err(ConfigError::ValidationError(
            "storage.upload_dir and storage.output_dir must differ".to_string(),
        ));
    }

    Ok(())
}
