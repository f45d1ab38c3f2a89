//! Open-ended tag sets attached to nodes and repertoires.
//!
//! Tags are plain `name -> value` pairs (`ECO`, `Variation`, `Comment`,
//! provenance keys, ...). The set of recognized names is not fixed; the
//! helpers here only interpret the few that exports read.
//!
//! Reach counts ride inside comments as `[rg:games=N]` so they survive a
//! round trip through game-notation text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Tag name for an opening classification code.
pub const TAG_ECO: &str = "ECO";
/// Tag name for a variation label.
pub const TAG_VARIATION: &str = "Variation";
/// Tag name for a free-text comment.
pub const TAG_COMMENT: &str = "Comment";
/// Tag name for an explicit reach count.
pub const TAG_GAMES: &str = "Games";

fn reach_count_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[rg:games=(\d+)\]").expect("reach count pattern is valid")
    })
}

/// Return the last tagged reach count in a comment and the comment with all
/// tags removed.
pub fn extract_reach_count(comment: &str) -> (Option<u64>, String) {
    let pattern = reach_count_pattern();
    let count = pattern
        .captures_iter(comment)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());
    if count.is_none() {
        return (None, comment.to_string());
    }
    let cleaned = pattern.replace_all(comment, "").trim().to_string();
    (count, cleaned)
}

/// Remove any existing reach-count tag and append a fresh one.
pub fn upsert_reach_count_tag(comment: Option<&str>, count: u64) -> String {
    let base = reach_count_pattern()
        .replace_all(comment.unwrap_or(""), "")
        .trim()
        .to_string();
    let tag = format!("[rg:games={count}]");
    if base.is_empty() {
        tag
    } else {
        format!("{base} {tag}")
    }
}

/// Ordered tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeMetadata {
    tags: BTreeMap<String, String>,
}

impl NodeMetadata {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a tag, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.tags.insert(name.into(), value.into())
    }

    /// Get a tag value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// Get a tag value, treating the PGN placeholder `?` and blanks as absent.
    pub fn get_known(&self, name: &str) -> Option<&str> {
        self.get(name)
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != "?")
    }

    /// Merge another tag set into this one; incoming values win.
    pub fn merge(&mut self, other: &NodeMetadata) {
        for (name, value) in &other.tags {
            self.tags.insert(name.clone(), value.clone());
        }
    }

    /// Iterate tags in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether there are no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Reach count from the `Games` tag, falling back to a comment tag.
    pub fn games_reached(&self) -> Option<u64> {
        if let Some(value) = self.get(TAG_GAMES) {
            if let Ok(count) = value.trim().parse::<u64>() {
                return Some(count);
            }
        }
        self.get(TAG_COMMENT)
            .and_then(|comment| extract_reach_count(comment).0)
    }

    /// Record a reach count inside the comment tag.
    pub fn set_games_reached(&mut self, count: u64) {
        let comment = upsert_reach_count_tag(self.get(TAG_COMMENT), count);
        self.tags.insert(TAG_COMMENT.to_string(), comment);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NodeMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tags: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
