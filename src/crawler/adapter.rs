//! Site adapters for extracting catalog data from HTML
//!
//! An adapter knows a site's page templates:
//! - where the listing page for a task lives
//! - how to read (title, detail URL) pairs and the next-page link from a
//!   listing page
//! - how to read the poster and description from a detail page
//!
//! The orchestrator only talks to the `SiteAdapter` trait, so another catalog
//! can be crawled by supplying another implementation.

use crate::config::SiteConfig;
use crate::crawler::Task;
use crate::state::DetailEntry;
use crate::{ConfigError, HarvestError};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// Paragraphs shorter than this are skipped when picking a description
const MIN_DESCRIPTION_CHARS: usize = 60;

/// A title discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    /// Absolute URL of the title's detail page
    pub detail_url: String,
}

/// Extracted information from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    /// Absolute URL of the following listing page, if any
    pub next_page: Option<String>,
}

/// Site-specific page knowledge consumed by the orchestrator
pub trait SiteAdapter: Send + Sync {
    /// Absolute URL of the first listing page for a task
    fn listing_url(&self, task: &Task) -> Result<String, HarvestError>;

    /// Extracts entries and the next-page link from a listing page
    fn parse_listing(&self, html: &str) -> ListingPage;

    /// Extracts poster and description from a detail page
    ///
    /// Missing data yields empty strings, never an error.
    fn parse_detail(&self, html: &str) -> DetailEntry;
}

/// Adapter for Wikipedia category pages (`/wiki/Category:...`)
#[derive(Debug, Clone)]
pub struct WikipediaCategoryAdapter {
    base_url: Url,
    templates: BTreeMap<String, String>,
}

impl WikipediaCategoryAdapter {
    /// Creates an adapter from the site configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Base URL and category templates
    ///
    /// # Returns
    ///
    /// * `Ok(WikipediaCategoryAdapter)` - Adapter ready to use
    /// * `Err(ConfigError)` - The base URL does not parse
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        Ok(Self {
            base_url,
            templates: config.categories.clone(),
        })
    }

    /// Resolves an href against the site base URL
    fn resolve(&self, href: &str) -> Option<String> {
        self.base_url.join(href).ok().map(String::from)
    }

    fn extract_poster(&self, document: &Html) -> String {
        let infobox_src = Selector::parse("table.infobox img").ok().and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|img| img.value().attr("src"))
                .filter(|src| !src.is_empty())
                .map(str::to_string)
        });

        if let Some(src) = infobox_src {
            if src.starts_with("//") {
                return format!("https:{}", src);
            }
            return self.resolve(&src).unwrap_or(src);
        }

        meta_content(document, r#"meta[property="og:image"]"#).unwrap_or_default()
    }
}

impl SiteAdapter for WikipediaCategoryAdapter {
    fn listing_url(&self, task: &Task) -> Result<String, HarvestError> {
        let template = self
            .templates
            .get(&task.category)
            .ok_or_else(|| ConfigError::UnknownCategory(task.category.clone()))?;

        let page = template.replace("{year}", &task.year.to_string());
        let url = self.base_url.join(&format!("/wiki/{}", page))?;
        Ok(url.into())
    }

    fn parse_listing(&self, html: &str) -> ListingPage {
        let document = Html::parse_document(html);

        let container = match Selector::parse("#mw-pages")
            .ok()
            .and_then(|sel| document.select(&sel).next())
        {
            Some(c) => c,
            None => return ListingPage::default(),
        };

        let mut entries = Vec::new();
        if let Ok(item_selector) = Selector::parse("li a") {
            for anchor in container.select(&item_selector) {
                let title = compact_text(anchor);
                let href = anchor.value().attr("href").unwrap_or("");
                if title.is_empty() || href.is_empty() {
                    continue;
                }
                if let Some(detail_url) = self.resolve(href) {
                    entries.push(ListingEntry { title, detail_url });
                }
            }
        }

        // Only the first "next page" anchor counts, even if it has no href
        let next_page = Selector::parse("a")
            .ok()
            .and_then(|sel| {
                container
                    .select(&sel)
                    .find(|a| compact_text(*a).to_lowercase() == "next page")
            })
            .and_then(|a| a.value().attr("href"))
            .filter(|href| !href.is_empty())
            .and_then(|href| self.resolve(href));

        ListingPage { entries, next_page }
    }

    fn parse_detail(&self, html: &str) -> DetailEntry {
        let document = Html::parse_document(html);
        DetailEntry {
            poster: self.extract_poster(&document),
            description: extract_description(&document),
        }
    }
}

/// Text of an element with surrounding whitespace removed from each piece
fn compact_text(element: ElementRef) -> String {
    element.text().map(str::trim).collect::<String>()
}

/// Text of an element with pieces joined by single spaces
fn spaced_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|m| m.value().attr("content"))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// First substantial article paragraph, or the og:description fallback
fn extract_description(document: &Html) -> String {
    if let (Ok(content_sel), Ok(para_sel)) = (
        Selector::parse("div.mw-parser-output"),
        Selector::parse("p"),
    ) {
        if let Some(content) = document.select(&content_sel).next() {
            for para in content.select(&para_sel) {
                let text = spaced_text(para);
                if text.chars().count() >= MIN_DESCRIPTION_CHARS {
                    return text;
                }
            }
        }
    }

    meta_content(document, r#"meta[property="og:description"]"#)
        .map(|c| collapse_whitespace(&c))
        .unwrap_or_default()
}
