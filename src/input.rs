//! Seed files
//!
//! Three plain-text formats feed a run:
//!
//! - a listing seed: the series or author listing URL on the first line,
//!   optionally followed by names already covered elsewhere
//! - a covered list: one item name or item URL per line
//! - an item list: `name;url` or a bare `url` per line
//!
//! Blank lines and lines starting with `#` are ignored everywhere.

use crate::item::WorkItem;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while reading seed files
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} contains no entries")]
    Empty(PathBuf),

    #[error("{path}:{line}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// A listing URL and the names already covered for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSeed {
    pub url: String,
    pub covered: CoveredSet,
}

/// Items to skip, matched by name or by item URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoveredSet {
    entries: HashSet<String>,
}

impl CoveredSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: impl Into<String>) {
        self.entries.insert(entry.into().trim().to_string());
    }

    /// True when the item's name or URL is covered
    pub fn covers(&self, name: Option<&str>, url: &str) -> bool {
        name.is_some_and(|name| self.entries.contains(name.trim())) || self.entries.contains(url)
    }

    pub fn extend(&mut self, other: CoveredSet) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CoveredSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Self::new();
        for entry in iter {
            set.insert(entry);
        }
        set
    }
}

/// Reads a listing seed file
pub fn read_listing_seed(path: &Path) -> Result<ListingSeed, InputError> {
    let lines = read_entries(path)?;
    let mut lines = lines.into_iter();

    let (line, url) = lines.next().ok_or_else(|| InputError::Empty(path.to_path_buf()))?;
    if !is_http_url(&url) {
        return Err(InputError::Malformed {
            path: path.to_path_buf(),
            line,
            message: format!("expected a listing URL, got '{}'", url),
        });
    }

    Ok(ListingSeed {
        url,
        covered: lines.map(|(_, entry)| entry).collect(),
    })
}

/// Reads a covered list; an empty file yields an empty set
pub fn read_covered(path: &Path) -> Result<CoveredSet, InputError> {
    let entries = read_entries(path)?;
    if entries.is_empty() {
        tracing::warn!("{} has no covered entries", path.display());
    }
    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

/// Reads an item list, dropping repeated URLs after their first occurrence
pub fn read_item_list(path: &Path) -> Result<Vec<WorkItem>, InputError> {
    let entries = read_entries(path)?;
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for (line, entry) in entries {
        let item = match entry.split_once(';') {
            Some((name, url)) if !name.trim().is_empty() => {
                WorkItem::new(name.trim(), url.trim())
            }
            Some((_, url)) => WorkItem::from_url(url.trim()),
            None => WorkItem::from_url(entry.as_str()),
        };

        if !is_http_url(&item.url) {
            return Err(InputError::Malformed {
                path: path.to_path_buf(),
                line,
                message: format!("expected an item URL, got '{}'", item.url),
            });
        }

        if seen.insert(item.url.clone()) {
            items.push(item);
        }
    }

    if items.is_empty() {
        return Err(InputError::Empty(path.to_path_buf()));
    }
    Ok(items)
}

/// Non-blank, non-comment lines with their 1-based line numbers
fn read_entries(path: &Path) -> Result<Vec<(usize, String)>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, entry)| (line, entry.to_string()))
        .collect())
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
