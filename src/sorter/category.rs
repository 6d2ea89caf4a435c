use std::collections::HashMap;

use super::record::{Record, is_blank_category, normalize_category};

/// Insertion-ordered set of category keys.
///
/// Keys are the uppercased category; each remembers the spelling it was first
/// seen with.
#[derive(Debug, Default, Clone)]
pub struct CategorySet {
    keys: Vec<String>,
    first_seen: Vec<String>,
    index: HashMap<String, usize>,
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw category value. Returns false for duplicates and blanks.
    pub fn insert(&mut self, raw: &str) -> bool {
        let key = normalize_category(raw);
        if is_blank_category(&key) || self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        self.first_seen.push(raw.trim().to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Normalised keys in first-seen order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Spelling the normalised `key` was first seen with.
    pub fn first_seen(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&i| self.first_seen[i].as_str())
    }
}

impl<'a> FromIterator<&'a str> for CategorySet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = CategorySet::new();
        for raw in iter {
            set.insert(raw);
        }
        set
    }
}

/// Distinct categories of `records`, in the order they first appear.
pub fn discover(records: &[Record]) -> CategorySet {
    records.iter().map(|r| r.category.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorter::record::BLANK_CATEGORY;

    #[test]
    fn test_case_insensitive_first_seen_order() {
        let set: CategorySet = ["Road", "fence", "ROAD", "Tree", "Fence", "road"]
            .into_iter()
            .collect();
        assert_eq!(set.keys(), ["ROAD", "FENCE", "TREE"]);
        assert_eq!(set.first_seen("FENCE"), Some("fence"));
        assert_eq!(set.first_seen("fence"), None);
    }

    #[test]
    fn test_blank_sentinel_excluded() {
        let mut set = CategorySet::new();
        assert!(!set.insert(""));
        assert!(!set.insert("None"));
        assert!(set.insert("Kerb"));
        assert!(!set.insert("kerb"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.keys(), ["KERB"]);
        assert_eq!(set.first_seen(BLANK_CATEGORY), None);
    }

    #[test]
    fn test_empty() {
        let set = discover(&[]);
        assert!(set.is_empty());
    }
}
