//! Previously used entry descriptions, for autocomplete.
//!
//! Process-local only: nothing here is persisted, so a restart starts from an
//! empty history. This is a convenience cache and never participates in
//! balance computation.

use std::collections::BTreeMap;

/// Set of descriptions keyed case-insensitively; inserts are set unions.
#[derive(Clone, Debug, Default)]
pub struct DescriptionHistory {
    // lowercase key -> first spelling seen
    items: BTreeMap<String, String>,
}

impl DescriptionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one description. Blank input is ignored. Returns `true` if new.
    pub fn remember(&mut self, description: &str) -> bool {
        let d = description.trim();
        if d.is_empty() {
            return false;
        }
        let key = d.to_lowercase();
        if self.items.contains_key(&key) {
            return false;
        }
        self.items.insert(key, d.to_string());
        true
    }

    /// Union with another history (e.g. seeding from stored entries).
    pub fn merge<'a, I>(&mut self, descriptions: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for d in descriptions {
            self.remember(d);
        }
    }

    /// Up to `limit` descriptions starting with `prefix`, sorted.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let p = prefix.trim().to_lowercase();
        self.items
            .range(p.clone()..)
            .take_while(|(k, _)| k.starts_with(&p))
            .take(limit)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
