use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Which part of the catalog to crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// First year to crawl (inclusive)
    #[serde(rename = "start-year")]
    pub start_year: i32,

    /// Last year to crawl (inclusive)
    #[serde(rename = "end-year")]
    pub end_year: i32,

    /// Category identifiers, in the order they should be crawled
    pub categories: Vec<String>,

    /// Categories moved to the front of each year when `prefer_priority` is set
    #[serde(rename = "priority-categories")]
    pub priority_categories: Vec<String>,

    /// Whether priority categories are crawled first
    #[serde(rename = "prefer-priority")]
    pub prefer_priority: bool,
}

/// HTTP fetching behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Pause between listing pages and between tasks (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Maximum number of concurrent detail page fetches
    #[serde(rename = "detail-workers")]
    pub detail_workers: usize,
}

/// Run mode and artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Path to the JSON checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Path to the record output file (CSV, or JSON for `.json`)
    #[serde(rename = "output-path")]
    pub output_path: String,

    /// Explicit output format; inferred from `output_path` when absent
    #[serde(rename = "output-format")]
    pub output_format: Option<OutputFormat>,

    /// Path to the failed-task CSV report
    #[serde(rename = "failed-report-path")]
    pub failed_report_path: String,

    /// Pause after this many newly resolved tasks (0 disables)
    #[serde(rename = "pause-after")]
    pub pause_after: usize,

    /// Resume from the checkpoint if it exists
    pub resume: bool,

    /// Only run the tasks recorded as failed in the checkpoint
    #[serde(rename = "failed-only")]
    pub failed_only: bool,
}

/// Site adapter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL that listing templates and relative links resolve against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Category identifier -> listing page template (`{year}` is substituted)
    pub categories: BTreeMap<String, String>,
}

/// Record output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// Picks a format from a file name: `.json` is JSON, anything else CSV
    pub fn from_path(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".json") {
            Self::Json
        } else {
            Self::Csv
        }
    }
}

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/123.0 Safari/537.36";

const CATEGORY_TEMPLATES: &[(&str, &str)] = &[
    ("indian", "Category:{year}_Indian_films"),
    ("tamil", "Category:{year}_Tamil-language_films"),
    ("telugu", "Category:{year}_Telugu-language_films"),
    ("malayalam", "Category:{year}_Malayalam-language_films"),
    ("kannada", "Category:{year}_Kannada-language_films"),
    ("hindi", "Category:{year}_Hindi-language_films"),
    ("bengali", "Category:{year}_Bengali-language_films"),
    ("marathi", "Category:{year}_Marathi-language_films"),
    ("punjabi", "Category:{year}_Punjabi-language_films"),
    ("gujarati", "Category:{year}_Gujarati-language_films"),
    ("odia", "Category:{year}_Odia-language_films"),
    ("assamese", "Category:{year}_Assamese-language_films"),
    ("bhojpuri", "Category:{year}_Bhojpuri-language_films"),
];

const PRIORITY_CATEGORIES: &[&str] = &["tamil", "telugu", "malayalam", "kannada"];

const DEFAULT_CATEGORIES: &[&str] = &[
    "tamil",
    "telugu",
    "malayalam",
    "kannada",
    "indian",
    "hindi",
    "bengali",
    "marathi",
    "punjabi",
    "gujarati",
    "odia",
    "assamese",
    "bhojpuri",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_year: 2000,
            end_year: 2015,
            categories: owned(DEFAULT_CATEGORIES),
            priority_categories: owned(PRIORITY_CATEGORIES),
            prefer_priority: true,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 20,
            politeness_delay_ms: 500,
            detail_workers: 8,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: "catalog_checkpoint.json".to_string(),
            output_path: "catalog_records.csv".to_string(),
            output_format: None,
            failed_report_path: "failed_tasks.csv".to_string(),
            pause_after: 0,
            resume: false,
            failed_only: false,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            categories: CATEGORY_TEMPLATES
                .iter()
                .map(|(name, template)| (name.to_string(), template.to_string()))
                .collect(),
        }
    }
}

impl RunConfig {
    /// The effective output format
    pub fn format(&self) -> OutputFormat {
        self.output_format
            .unwrap_or_else(|| OutputFormat::from_path(&self.output_path))
    }
}
