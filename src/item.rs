//! Item records flowing through the pipeline
//!
//! A [`WorkItem`] is what the dispatcher receives; a [`BookRecord`] is what it
//! produces and what the accumulation store keeps, keyed by name.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// One unit of dispatch work
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    /// Item name when already known (listing anchor text or `name;url` input)
    pub name: Option<String>,

    /// Absolute URL of the item page
    pub url: String,
}

impl WorkItem {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: url.into(),
        }
    }

    /// An item known only by URL; its name comes from the item page title
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
        }
    }
}

/// Stock results of one item across the availability sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    /// ISBNs Bookchor lists as in stock (empty = not present)
    pub bookchor: Vec<String>,

    /// Bookish Santa carries an exact-title match that is not sold out
    pub bookish_santa: bool,

    /// Second-hand Books India reports a nonzero result count
    pub shbi: bool,
}

/// A fully resolved item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub name: String,
    pub url: String,

    /// `None` when the item page had no editions link
    pub editions_url: Option<String>,

    pub identifiers: BTreeSet<String>,
    pub author: Option<String>,
    pub series: Option<String>,
    pub availability: Availability,
    pub checked_at: DateTime<Utc>,
}

impl BookRecord {
    /// Compares everything except the check timestamp
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.url == other.url
            && self.editions_url == other.editions_url
            && self.identifiers == other.identifiers
            && self.author == other.author
            && self.series == other.series
            && self.availability == other.availability
    }
}
