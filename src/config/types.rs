use serde::Deserialize;

/// Main configuration structure for Edition-Scout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub catalog: CatalogConfig,
    pub listing: ListingConfig,
    pub sources: SourcesConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of items resolved concurrently by the worker pool
    #[serde(rename = "max-concurrent-items")]
    pub max_concurrent_items: usize,

    /// Additional dispatch rounds over failed items
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Cool-down between dispatch rounds (seconds)
    #[serde(rename = "retry-delay-secs")]
    pub retry_delay_secs: u64,

    /// Timeout applied to every HTTP request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Hard upper bound on listing pages walked
    #[serde(rename = "max-pages")]
    pub max_pages: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: 10,
            max_retries: 2,
            retry_delay_secs: 10,
            request_timeout_secs: 30,
            max_pages: 99,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "EditionScout".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/edition-scout".to_string(),
            contact_email: "scout@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Catalog site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Substring every item href must contain
    #[serde(rename = "item-path-marker")]
    pub item_path_marker: String,

    /// Anchor text of the link to the editions page
    #[serde(rename = "editions-marker")]
    pub editions_marker: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            item_path_marker: "/book/show".to_string(),
            editions_marker: "All Editions".to_string(),
        }
    }
}

/// Listing layouts, one per discovery mode
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub series: ListingLayout,
    pub author: ListingLayout,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            series: ListingLayout {
                selector: "a.gr-h3.gr-h3--serif.gr-h3--noMargin".to_string(),
                page_size: 30,
            },
            author: ListingLayout {
                selector: "a.bookTitle".to_string(),
                page_size: 50,
            },
        }
    }
}

/// CSS selector and page size of one listing layout
#[derive(Debug, Clone, Deserialize)]
pub struct ListingLayout {
    /// Selector matching the candidate anchors of a listing page
    pub selector: String,

    /// Value of the `per_page` query parameter
    #[serde(rename = "page-size")]
    pub page_size: u32,
}

/// Search URL templates of the availability sources
///
/// Each template carries a `{query}` placeholder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    #[serde(rename = "bookchor-url")]
    pub bookchor_url: String,

    #[serde(rename = "bookish-santa-url")]
    pub bookish_santa_url: String,

    #[serde(rename = "shbi-url")]
    pub shbi_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            bookchor_url: "https://www.bookchor.com/search/?query={query}".to_string(),
            bookish_santa_url: "https://www.bookishsanta.com/search?q={query}".to_string(),
            shbi_url: "https://www.secondhandbooksindia.com/search?query={query}".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite accumulation store
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the CSV report
    #[serde(rename = "report-path")]
    pub report_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./edition-scout.db".to_string(),
            report_path: "./report.csv".to_string(),
        }
    }
}
