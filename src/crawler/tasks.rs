//! Task enumeration
//!
//! A task is one (year, category) listing to paginate. Tasks are generated
//! fresh from configuration on every run; their string key is what
//! checkpoints refer to.

use crate::config::CrawlConfig;
use std::collections::HashSet;
use std::fmt;

/// One unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Task {
    pub year: i32,
    pub category: String,
}

impl Task {
    pub fn new(year: i32, category: impl Into<String>) -> Self {
        Self {
            year,
            category: category.into(),
        }
    }

    /// Identity key stored in checkpoints: `"<year>:<category>"`
    pub fn key(&self) -> String {
        format!("{}:{}", self.year, self.category)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.year, self.category)
    }
}

/// Removes repeated categories, keeping the first occurrence of each
pub fn dedupe_categories(categories: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    categories
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

/// Moves priority categories ahead of the rest
///
/// This is a stable partition: relative input order is preserved within the
/// priority group and within the remaining group.
pub fn prioritize_categories(categories: &[String], priority: &[String]) -> Vec<String> {
    let mut ordered = categories.to_vec();
    ordered.sort_by_key(|c| !priority.contains(c));
    ordered
}

/// Produces the ordered task list
///
/// Years are the outer loop and categories the inner loop, so all categories
/// of a year are contiguous.
///
/// # Arguments
///
/// * `start_year` - First year (inclusive)
/// * `end_year` - Last year (inclusive)
/// * `categories` - Category identifiers in input order
/// * `priority` - When present, categories to crawl first within each year
pub fn enumerate_tasks(
    start_year: i32,
    end_year: i32,
    categories: &[String],
    priority: Option<&[String]>,
) -> Vec<Task> {
    let mut selected = dedupe_categories(categories);
    if let Some(priority) = priority {
        selected = prioritize_categories(&selected, priority);
    }

    (start_year..=end_year)
        .flat_map(|year| selected.iter().map(move |c| Task::new(year, c.clone())))
        .collect()
}

/// Produces the ordered task list for a crawl configuration
pub fn tasks_for_config(config: &CrawlConfig) -> Vec<Task> {
    let priority = config
        .prefer_priority
        .then_some(config.priority_categories.as_slice());
    enumerate_tasks(
        config.start_year,
        config.end_year,
        &config.categories,
        priority,
    )
}
