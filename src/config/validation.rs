use crate::config::types::{
    Config, FetchConfig, NavigationEngine, NavigatorConfig, PathsConfig, RunConfig, SinkConfig,
    SinkTarget,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_run_config(&config.run)?;
    validate_paths_config(&config.paths)?;
    validate_fetch_config(&config.fetch)?;
    validate_sink_config(&config.storage)?;
    validate_navigator_config("catalog", &config.catalog)?;

    match &config.exclusion_catalog {
        Some(navigator) => validate_navigator_config("exclusion-catalog", navigator)?,
        None if config.run.mode.refreshes_exclusions() => {
            return Err(ConfigError::Validation(format!(
                "run mode '{}' requires an [exclusion-catalog] section",
                config.run.mode
            )));
        }
        None => {}
    }

    Ok(())
}

/// Validates crawl behavior configuration
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.skip_ahead_threshold < 1 {
        return Err(ConfigError::Validation(
            "skip-ahead-threshold must be >= 1".to_string(),
        ));
    }

    if config.max_empty_pages < 1 {
        return Err(ConfigError::Validation(
            "max-empty-pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates state file locations
fn validate_paths_config(config: &PathsConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("history-file", &config.history_file),
        ("failure-file", &config.failure_file),
        ("progress-file", &config.progress_file),
        ("exclusion-file", &config.exclusion_file),
        ("download-dir", &config.download_dir),
        ("diagnostics-dir", &config.diagnostics_dir),
        ("run-database", &config.run_database),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates artifact fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.detail_attempts < 1 {
        return Err(ConfigError::Validation(
            "detail-attempts must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be >= 1 second".to_string(),
        ));
    }

    if !config.magic.is_empty() && config.magic_window < config.magic.len() {
        return Err(ConfigError::Validation(format!(
            "magic-window ({}) must be at least as long as magic ({} bytes)",
            config.magic_window,
            config.magic.len()
        )));
    }

    if config.artifact_extension.trim_start_matches('.').trim().is_empty() {
        return Err(ConfigError::Validation(
            "artifact-extension must not be empty".to_string(),
        ));
    }

    if config.artifact_extension.contains(['/', '\\', '|', '\n']) {
        return Err(ConfigError::Validation(format!(
            "artifact-extension '{}' contains invalid characters",
            config.artifact_extension
        )));
    }

    Ok(())
}

/// Validates the remote storage configuration
fn validate_sink_config(config: &SinkConfig) -> Result<(), ConfigError> {
    match config.target {
        SinkTarget::Directory => {
            if config.directory.as_deref().map_or(true, |d| d.trim().is_empty()) {
                return Err(ConfigError::Validation(
                    "storage target 'directory' requires a directory".to_string(),
                ));
            }
        }
        SinkTarget::Http => {
            let base = config.base_url.as_deref().ok_or_else(|| {
                ConfigError::Validation("storage target 'http' requires a base-url".to_string())
            })?;
            validate_http_url("storage base-url", base)?;
        }
        SinkTarget::S3 => {
            if config.bucket.as_deref().map_or(true, |b| b.trim().is_empty()) {
                return Err(ConfigError::Validation(
                    "storage target 's3' requires a bucket".to_string(),
                ));
            }
            if let Some(endpoint) = &config.endpoint_url {
                validate_http_url("storage endpoint-url", endpoint)?;
            }
        }
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "storage timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates one navigator section
fn validate_navigator_config(section: &str, config: &NavigatorConfig) -> Result<(), ConfigError> {
    validate_http_url(&format!("{} start-url", section), &config.start_url)?;

    if let Some(template) = &config.page_url_template {
        if !template.contains("{page}") {
            return Err(ConfigError::Validation(format!(
                "{} page-url-template must contain '{{page}}'",
                section
            )));
        }
        validate_http_url(
            &format!("{} page-url-template", section),
            &template.replace("{page}", "1"),
        )?;
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "{} timeout-secs must be >= 1",
            section
        )));
    }

    match config.engine {
        NavigationEngine::Html => {
            let row_selector = config.row_selector.as_deref().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "{} uses the html engine and requires row-selector",
                    section
                ))
            })?;
            validate_selector(row_selector)?;
            validate_selector(&config.link_selector)?;
            if let Some(listing) = &config.listing_selector {
                validate_selector(listing)?;
            }
            if let Some(next) = &config.next_selector {
                validate_selector(next)?;
            }
            if let Some(total) = &config.total_selector {
                validate_selector(total)?;
            }
        }
        NavigationEngine::Json => {
            if config.page_url_template.is_none() {
                return Err(ConfigError::Validation(format!(
                    "{} uses the json engine and requires page-url-template",
                    section
                )));
            }
            for (name, pointer) in [
                ("rows-pointer", Some(&config.rows_pointer)),
                ("total-pointer", config.total_pointer.as_ref()),
            ] {
                if let Some(pointer) = pointer {
                    if !pointer.is_empty() && !pointer.starts_with('/') {
                        return Err(ConfigError::Validation(format!(
                            "{} {} must be a JSON pointer starting with '/', got '{}'",
                            section, name, pointer
                        )));
                    }
                }
            }
        }
    }

    validate_selector(&config.artifact_selector)?;

    Ok(())
}

/// Validates that a string is an absolute HTTP(S) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

/// Validates a CSS selector
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_navigator() -> NavigatorConfig {
        NavigatorConfig {
            engine: NavigationEngine::Html,
            start_url: "https://catalog.example.com/list".to_string(),
            page_url_template: None,
            timeout_secs: 30,
            politeness_delay_ms: 0,
            listing_selector: Some("table".to_string()),
            row_selector: Some("tbody tr".to_string()),
            link_selector: "a[href]".to_string(),
            next_selector: None,
            next_disabled_class: "disabled".to_string(),
            total_selector: None,
            rows_pointer: "/data".to_string(),
            name_field: "name".to_string(),
            detail_field: "url".to_string(),
            total_pointer: None,
            artifact_selector: "a[href*='.pdf']".to_string(),
        }
    }

    #[test]
    fn test_validate_navigator() {
        assert!(validate_navigator_config("catalog", &html_navigator()).is_ok());

        let mut missing_rows = html_navigator();
        missing_rows.row_selector = None;
        assert!(validate_navigator_config("catalog", &missing_rows).is_err());

        let mut bad_selector = html_navigator();
        bad_selector.row_selector = Some("tbody >>> tr[".to_string());
        assert!(matches!(
            validate_navigator_config("catalog", &bad_selector),
            Err(ConfigError::InvalidSelector(_))
        ));

        let mut bad_template = html_navigator();
        bad_template.page_url_template = Some("https://catalog.example.com/list".to_string());
        assert!(validate_navigator_config("catalog", &bad_template).is_err());

        let mut json_without_template = html_navigator();
        json_without_template.engine = NavigationEngine::Json;
        assert!(validate_navigator_config("catalog", &json_without_template).is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("x", "https://example.com/a").is_ok());
        assert!(validate_http_url("x", "http://127.0.0.1:8080/a").is_ok());
        assert!(validate_http_url("x", "ftp://example.com/a").is_err());
        assert!(validate_http_url("x", "not a url").is_err());
    }

    #[test]
    fn test_validate_sink_config() {
        let directory = SinkConfig {
            target: SinkTarget::Directory,
            directory: Some("archive".to_string()),
            base_url: None,
            token_env: None,
            bucket: None,
            region: None,
            endpoint_url: None,
            timeout_secs: 10,
        };
        assert!(validate_sink_config(&directory).is_ok());

        let http_without_url = SinkConfig {
            target: SinkTarget::Http,
            directory: None,
            base_url: None,
            token_env: None,
            bucket: None,
            region: None,
            endpoint_url: None,
            timeout_secs: 10,
        };
        assert!(validate_sink_config(&http_without_url).is_err());

        let s3 = SinkConfig {
            target: SinkTarget::S3,
            directory: None,
            base_url: None,
            token_env: None,
            bucket: Some("archive-bucket".to_string()),
            region: Some("ap-south-1".to_string()),
            endpoint_url: None,
            timeout_secs: 10,
        };
        assert!(validate_sink_config(&s3).is_ok());

        let s3_without_bucket = SinkConfig {
            bucket: None,
            ..s3.clone()
        };
        assert!(validate_sink_config(&s3_without_bucket).is_err());

        let s3_bad_endpoint = SinkConfig {
            endpoint_url: Some("minio:9000".to_string()),
            ..s3
        };
        assert!(validate_sink_config(&s3_bad_endpoint).is_err());
    }

    #[test]
    fn test_validate_fetch_config() {
        assert!(validate_fetch_config(&FetchConfig::default()).is_ok());

        let zero_attempts = FetchConfig {
            max_attempts: 0,
            ..FetchConfig::default()
        };
        assert!(validate_fetch_config(&zero_attempts).is_err());

        let narrow_window = FetchConfig {
            magic_window: 2,
            ..FetchConfig::default()
        };
        assert!(validate_fetch_config(&narrow_window).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_extension() {
        for extension in ["", ".", "  "] {
            let config = FetchConfig {
                artifact_extension: extension.to_string(),
                ..FetchConfig::default()
            };
            assert!(
                validate_fetch_config(&config).is_err(),
                "extension {:?} should be rejected",
                extension
            );
        }
    }
}
