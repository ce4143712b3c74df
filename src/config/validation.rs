use crate::config::types::{Config, CrawlConfig, FetchConfig, RunConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

const MAX_DETAIL_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_fetch_config(&config.fetch)?;
    validate_run_config(&config.run)?;
    validate_site_config(&config.site)?;
    validate_category_templates(&config.crawl, &config.site)?;
    Ok(())
}

/// Validates the crawl range and category selection
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.start_year > config.end_year {
        return Err(ConfigError::Validation(format!(
            "start-year must be less than or equal to end-year, got {} > {}",
            config.start_year, config.end_year
        )));
    }

    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category must be selected".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.detail_workers < 1 || config.detail_workers > MAX_DETAIL_WORKERS {
        return Err(ConfigError::Validation(format!(
            "detail-workers must be between 1 and {}, got {}",
            MAX_DETAIL_WORKERS, config.detail_workers
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates artifact paths
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("checkpoint-path", &config.checkpoint_path),
        ("output-path", &config.output_path),
        ("failed-report-path", &config.failed_report_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates the site base URL
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    Ok(())
}

/// Every selected category needs a listing template that mentions the year
fn validate_category_templates(crawl: &CrawlConfig, site: &SiteConfig) -> Result<(), ConfigError> {
    for category in &crawl.categories {
        let template = site
            .categories
            .get(category)
            .ok_or_else(|| ConfigError::UnknownCategory(category.clone()))?;

        if !template.contains("{year}") {
            return Err(ConfigError::Validation(format!(
                "template for category '{}' must contain '{{year}}', got '{}'",
                category, template
            )));
        }
    }

    Ok(())
}
