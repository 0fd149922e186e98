use super::{types::Config, ConfigError};

/// Largest page size the listing endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "api.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.refresh.page_size == 0 || config.refresh.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::ValidationError(format!(
            "refresh.page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    if config.refresh.max_pages == 0 {
        return Err(ConfigError::ValidationError(
            "refresh.max_pages cannot be 0".to_string(),
        ));
    }

    if config.refresh.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "refresh.concurrency cannot be 0".to_string(),
        ));
    }

    if config.index.stale_after_hours == 0 {
        return Err(ConfigError::ValidationError(
            "index.stale_after_hours cannot be 0".to_string(),
        ));
    }

    if config.search.default_limit == 0 || config.search.max_pages == 0 {
        return Err(ConfigError::ValidationError(
            "search.default_limit and search.max_pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.api.timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_page_size_bounds() {
        let mut config = Config::default();
        config.refresh.page_size = MAX_PAGE_SIZE + 1;
        assert!(validate_config(&config).is_err());

        config.refresh.page_size = 0;
        assert!(validate_config(&config).is_err());

        config.refresh.page_size = MAX_PAGE_SIZE;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.refresh.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_staleness_window_fails() {
        let mut config = Config::default();
        config.index.stale_after_hours = 0;
        assert!(validate_config(&config).is_err());
    }
}
