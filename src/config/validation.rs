use crate::config::types::{
    CatalogConfig, Config, CrawlerConfig, ListingLayout, OutputConfig, SourcesConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Largest worker pool accepted
const MAX_POOL_SIZE: usize = 64;

/// Pagination never walks past this page
const PAGE_CEILING: u32 = 99;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_catalog_config(&config.catalog)?;
    validate_listing_layout("series", &config.listing.series)?;
    validate_listing_layout("author", &config.listing.author)?;
    validate_sources_config(&config.sources)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_items < 1 || config.max_concurrent_items > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_items must be between 1 and {}, got {}",
            MAX_POOL_SIZE, config.max_concurrent_items
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_pages < 1 || config.max_pages > PAGE_CEILING {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            PAGE_CEILING, config.max_pages
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.item_path_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "item_path_marker cannot be empty".to_string(),
        ));
    }

    if config.editions_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "editions_marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_listing_layout(kind: &str, layout: &ListingLayout) -> Result<(), ConfigError> {
    if scraper::Selector::parse(&layout.selector).is_err() {
        return Err(ConfigError::Validation(format!(
            "listing.{} selector '{}' is not a valid CSS selector",
            kind, layout.selector
        )));
    }

    if layout.page_size == 0 {
        return Err(ConfigError::Validation(format!(
            "listing.{} page_size must be >= 1",
            kind
        )));
    }

    Ok(())
}

/// Validates the search templates of every availability source
fn validate_sources_config(config: &SourcesConfig) -> Result<(), ConfigError> {
    for (name, template) in [
        ("bookchor_url", &config.bookchor_url),
        ("bookish_santa_url", &config.bookish_santa_url),
        ("shbi_url", &config.shbi_url),
    ] {
        if !template.contains("{query}") {
            return Err(ConfigError::Validation(format!(
                "{} must contain a {{query}} placeholder, got '{}'",
                name, template
            )));
        }
        validate_http_url(name, &template.replace("{query}", "probe"))?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid email format: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }

    Ok(())
}
