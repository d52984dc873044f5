//! Read-only catalog of layers and pieces for one run
//!
//! Layers and pieces live in flat arenas addressed by dense indices. Tags are
//! interned once so that every tag test during generation is a bitset test.

use crate::algorithm::bitset::TagSet;
use crate::catalog::request::{LayerSpec, RunRequest};
use crate::io::error::{Result, invalid_catalog};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// A layer that participates in generation
#[derive(Clone, Debug)]
pub struct Layer {
    /// Caller-supplied identifier
    pub id: String,
    /// Piece arena indices, in authoring order (never empty)
    pub pieces: Vec<usize>,
    /// Maximum uses across one run
    pub limit: Option<usize>,
    /// Every non-favorite image must fill this layer
    pub required: bool,
    /// The choice for this layer is left out of the canonical key
    pub exclude_from_key: bool,
    /// Tags contributed when filled
    pub tags: TagSet,
    /// Tags this layer cannot appear alongside
    pub blocked_tags: TagSet,
}

/// One option for a layer
#[derive(Clone, Debug)]
pub struct Piece {
    /// Caller-supplied identifier, unique across the catalog
    pub id: String,
    /// Arena index of the owning layer
    pub layer: usize,
    /// Maximum uses across one run
    pub limit: Option<usize>,
    /// Tags contributed when chosen
    pub tags: TagSet,
    /// Tags this piece cannot appear alongside
    pub blocked_tags: TagSet,
}

#[derive(Default)]
struct TagInterner {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl TagInterner {
    fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.lookup.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), index);
        index
    }

    fn set(&self, names: &[String]) -> TagSet {
        TagSet::from_indices(
            names.iter().filter_map(|name| self.lookup.get(name).copied()),
            self.names.len(),
        )
    }
}

/// Immutable catalog snapshot
#[derive(Clone, Debug)]
pub struct Catalog {
    layers: Vec<Layer>,
    pieces: Vec<Piece>,
    tag_names: Vec<String>,
    piece_lookup: HashMap<String, usize>,
    layer_lookup: HashMap<String, usize>,
}

impl Catalog {
    /// Build the catalog described by a request
    ///
    /// # Errors
    ///
    /// Returns an error if layer or piece identifiers are duplicated
    pub fn from_request(request: &RunRequest) -> Result<Self> {
        Self::from_layers(&request.layers)
    }

    /// Build a catalog from layer specifications
    ///
    /// Layers without pieces are dropped before indices are assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if layer or piece identifiers are duplicated
    pub fn from_layers(specs: &[LayerSpec]) -> Result<Self> {
        let mut interner = TagInterner::default();
        for spec in specs {
            for tag in spec.tags.iter().chain(&spec.blocked_tags) {
                interner.intern(tag);
            }
            for piece in &spec.pieces {
                for tag in piece.tags.iter().chain(&piece.blocked_tags) {
                    interner.intern(tag);
                }
            }
        }

        let mut layers = Vec::new();
        let mut pieces = Vec::new();
        let mut piece_lookup = HashMap::new();
        let mut layer_lookup = HashMap::new();

        for spec in specs {
            if spec.pieces.is_empty() {
                tracing::debug!(layer = %spec.id, "skipping layer without pieces");
                continue;
            }

            let layer_index = layers.len();
            match layer_lookup.entry(spec.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(invalid_catalog(&format!(
                        "layer id '{}' is used more than once",
                        spec.id
                    )));
                }
                Entry::Vacant(entry) => {
                    entry.insert(layer_index);
                }
            }

            let mut layer_pieces = Vec::with_capacity(spec.pieces.len());
            for piece_spec in &spec.pieces {
                let piece_index = pieces.len();
                match piece_lookup.entry(piece_spec.id.clone()) {
                    Entry::Occupied(_) => {
                        return Err(invalid_catalog(&format!(
                            "piece id '{}' is used more than once",
                            piece_spec.id
                        )));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(piece_index);
                    }
                }
                pieces.push(Piece {
                    id: piece_spec.id.clone(),
                    layer: layer_index,
                    limit: piece_spec.limit.map(std::num::NonZeroUsize::get),
                    tags: interner.set(&piece_spec.tags),
                    blocked_tags: interner.set(&piece_spec.blocked_tags),
                });
                layer_pieces.push(piece_index);
            }

            layers.push(Layer {
                id: spec.id.clone(),
                pieces: layer_pieces,
                limit: spec.limit.map(std::num::NonZeroUsize::get),
                required: spec.required,
                exclude_from_key: spec.exclude_from_key,
                tags: interner.set(&spec.tags),
                blocked_tags: interner.set(&spec.blocked_tags),
            });
        }

        tracing::debug!(
            layers = layers.len(),
            pieces = pieces.len(),
            tags = interner.names.len(),
            "catalog built"
        );

        Ok(Self {
            layers,
            pieces,
            tag_names: interner.names,
            piece_lookup,
            layer_lookup,
        })
    }

    /// All participating layers
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// All pieces of participating layers
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Layer by arena index
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Piece by arena index
    pub fn piece(&self, index: usize) -> Option<&Piece> {
        self.pieces.get(index)
    }

    /// Arena index of a piece identifier
    pub fn piece_index(&self, id: &str) -> Option<usize> {
        self.piece_lookup.get(id).copied()
    }

    /// Arena index of a layer identifier
    pub fn layer_index(&self, id: &str) -> Option<usize> {
        self.layer_lookup.get(id).copied()
    }

    /// Number of distinct interned tags
    pub fn tag_count(&self) -> usize {
        self.tag_names.len()
    }

    /// Name of an interned tag
    pub fn tag_name(&self, index: usize) -> Option<&str> {
        self.tag_names.get(index).map(String::as_str)
    }

    /// Upper bound on distinct canonical keys, ignoring tags and limits
    ///
    /// Required layers contribute their piece count, optional layers one more
    /// for being skipped, and layers excluded from the key contribute nothing.
    /// Saturates at `u64::MAX`.
    pub fn combination_count(&self) -> u64 {
        if self.layers.is_empty() {
            return 0;
        }
        self.layers.iter().fold(1_u64, |total, layer| {
            let options = if layer.exclude_from_key {
                1
            } else if layer.required {
                layer.pieces.len() as u64
            } else {
                layer.pieces.len() as u64 + 1
            };
            total.saturating_mul(options)
        })
    }
}
