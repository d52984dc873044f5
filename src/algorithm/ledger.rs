//! Canonical keys and duplicate rejection

use crate::algorithm::builder::Assignment;
use crate::catalog::model::Catalog;
use crate::io::configuration::KEY_SEPARATOR;
use std::collections::HashSet;
use sha2::{Digest, Sha256};

/// Sorted, separator-joined identifiers of the keyed pieces in an assignment
///
/// Layers flagged `exclude_from_key` are left out.
pub fn canonical_string(assignment: &Assignment, catalog: &Catalog) -> String {
    let mut ids: Vec<&str> = assignment
        .placements()
        .filter(|&(layer, _)| {
            catalog
                .layer(layer)
                .is_some_and(|entry| !entry.exclude_from_key)
        })
        .filter_map(|(_, piece)| catalog.piece(piece).map(|entry| entry.id.as_str()))
        .collect();
    ids.sort_unstable();

    let mut text = String::new();
    for (index, id) in ids.iter().enumerate() {
        if index > 0 {
            text.push(KEY_SEPARATOR);
        }
        text.push_str(id);
    }
    text
}

/// Numeric key of a canonical string
///
/// The leading eight bytes of the string's SHA-256 digest, big-endian, so keys
/// stay comparable across builds and platforms.
pub fn hash_canonical(text: &str) -> u64 {
    Sha256::digest(text.as_bytes())
        .iter()
        .take(8)
        .fold(0, |key, &byte| (key << 8) | u64::from(byte))
}

/// Numeric canonical key of an assignment
pub fn canonical_key(assignment: &Assignment, catalog: &Catalog) -> u64 {
    hash_canonical(&canonical_string(assignment, catalog))
}

/// Keys accepted so far in one run
///
/// In hashed mode a collision may reject a genuinely new image, but a
/// duplicate is never accepted. Exact mode decides on canonical strings, so
/// only true duplicates are rejected.
#[derive(Debug, Default)]
pub struct UniquenessLedger {
    seen: HashSet<u64>,
    exact: Option<HashSet<String>>,
}

impl UniquenessLedger {
    /// Create an empty ledger comparing hashed keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ledger comparing canonical strings
    pub fn exact() -> Self {
        Self {
            seen: HashSet::new(),
            exact: Some(HashSet::new()),
        }
    }

    /// Test whether canonical strings decide uniqueness
    pub const fn is_exact(&self) -> bool {
        self.exact.is_some()
    }

    /// Record a key, returning `false` if it was already present
    pub fn accept(&mut self, key: u64) -> bool {
        self.seen.insert(key)
    }

    /// Record an assignment, returning its key if it was not seen before
    pub fn admit(&mut self, assignment: &Assignment, catalog: &Catalog) -> Option<u64> {
        let text = canonical_string(assignment, catalog);
        let key = hash_canonical(&text);
        match self.exact.as_mut() {
            Some(strings) => {
                if !strings.insert(text) {
                    return None;
                }
                self.seen.insert(key);
                Some(key)
            }
            None => self.accept(key).then_some(key),
        }
    }

    /// Test whether a key was accepted
    pub fn contains(&self, key: u64) -> bool {
        self.seen.contains(&key)
    }

    /// Number of accepted images
    pub fn len(&self) -> usize {
        self.exact.as_ref().map_or(self.seen.len(), HashSet::len)
    }

    /// Test if nothing was accepted yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
