//! Contact list: the usernames this profile talks to, in the order added.
//!
//! Serialized as a plain JSON array of strings.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, levenshtein};

/// Minimum score for a fuzzy contact match (0.0 - 1.0).
pub const FUZZY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactList {
    names: Vec<String>,
}

impl ContactList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Add a contact.
    ///
    /// Surrounding whitespace is trimmed. Returns `false` for empty names and
    /// names already present; lists loaded from disk keep whatever
    /// duplicates they had.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Exact or case-insensitive lookup. Use this where a wrong match would
    /// reach the wrong person, e.g. choosing a message recipient.
    pub fn find(&self, query: &str) -> Option<&str> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(name) = self.names.iter().find(|n| *n == query) {
            return Some(name.as_str());
        }
        let query_lower = query.to_lowercase();
        self.names
            .iter()
            .find(|n| n.to_lowercase() == query_lower)
            .map(String::as_str)
    }

    /// Resolve user input to a stored contact, allowing approximate input.
    ///
    /// Order of matching:
    /// 1. Exact
    /// 2. Case-insensitive
    /// 3. Unique case-insensitive prefix
    /// 4. Best fuzzy match scoring at least [`FUZZY_THRESHOLD`]
    pub fn resolve(&self, query: &str) -> Option<&str> {
        if let Some(name) = self.find(query) {
            return Some(name);
        }

        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return None;
        }
        let mut prefixed = self
            .names
            .iter()
            .filter(|n| n.to_lowercase().starts_with(&query_lower));
        if let (Some(name), None) = (prefixed.next(), prefixed.next()) {
            return Some(name.as_str());
        }

        let mut best: Option<(&str, f64)> = None;
        for name in &self.names {
            let score = similarity(&query_lower, &name.to_lowercase());
            if score >= FUZZY_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                best = Some((name.as_str(), score));
            }
        }
        best.map(|(name, _)| name)
    }
}

/// Best of Jaro-Winkler and normalized Levenshtein.
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    let lev = if max_len == 0 {
        1.0
    } else {
        1.0 - (levenshtein(a, b) as f64 / max_len as f64)
    };
    jaro_winkler(a, b).max(lev)
}

impl From<Vec<String>> for ContactList {
    fn from(names: Vec<String>) -> Self {
        Self { names }
    }
}
