//! Item title grammar
//!
//! Catalog item pages title themselves as
//!
//! ```text
//! <title>[ (<series>)] by <author>[ | <site suffix>]
//! ```
//!
//! e.g. `The Way of Kings (The Stormlight Archive, #1) by Brandon Sanderson | Goodreads`.
//! The ` by ` marker is mandatory; a title without it is rejected rather than
//! guessed at.

use std::fmt;
use thiserror::Error;

const BY_MARKER: &str = " by ";

/// Errors produced when a title does not follow the grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    #[error("title '{0}' has no ' by ' author marker")]
    MissingAuthor(String),

    #[error("title '{0}' has an empty book title")]
    EmptyTitle(String),

    #[error("title '{0}' has an empty author")]
    EmptyAuthor(String),

    #[error("item page {0} has no title")]
    Missing(String),
}

/// A parsed item title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTitle {
    pub title: String,
    pub series: Option<String>,
    pub author: String,
}

impl BookTitle {
    /// Parses a page title according to the grammar above
    pub fn parse(raw: &str) -> Result<Self, TitleError> {
        let text = collapse_whitespace(raw);

        // Drop a trailing " | Site" suffix
        let text = match text.rsplit_once(" | ") {
            Some((head, _)) => head.trim(),
            None => text.as_str(),
        };

        let (head, author) = text
            .rsplit_once(BY_MARKER)
            .ok_or_else(|| TitleError::MissingAuthor(raw.to_string()))?;

        let author = author.trim();
        if author.is_empty() {
            return Err(TitleError::EmptyAuthor(raw.to_string()));
        }

        let (title, series) = split_series(head.trim());
        if title.is_empty() {
            return Err(TitleError::EmptyTitle(raw.to_string()));
        }

        Ok(Self {
            title: title.to_string(),
            series: series.map(str::to_string),
            author: author.to_string(),
        })
    }
}

impl fmt::Display for BookTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(series) = &self.series {
            write!(f, " ({})", series)?;
        }
        write!(f, "{}{}", BY_MARKER, self.author)
    }
}

/// Splits a trailing `(series)` group off the title part
///
/// The group is the one opened by the parenthesis that balances the final
/// `)`, so nested groups stay inside the series. Unbalanced input keeps the
/// whole head as the title.
fn split_series(head: &str) -> (&str, Option<&str>) {
    if !head.ends_with(')') {
        return (head, None);
    }

    match matching_open(head) {
        Some(open) => {
            let series = head[open + 1..head.len() - 1].trim();
            let title = head[..open].trim_end();
            if series.is_empty() {
                (title, None)
            } else {
                (title, Some(series))
            }
        }
        None => (head, None),
    }
}

/// Byte index of the `(` balancing the `)` that ends `head`
fn matching_open(head: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in head.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
