//! Caller-side collection assembled from a job's update stream

use crate::algorithm::builder::Assignment;
use crate::algorithm::executor::Image;
use crate::catalog::favorites::FavoriteBag;
use crate::catalog::model::Catalog;
use crate::io::message::WireImage;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// An image held by the caller under a local identifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionImage {
    /// Local identifier, fresh for every received image
    pub id: Uuid,
    /// The generated image
    pub image: Image,
}

/// Exported form of a collection image
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportedImage {
    /// Local identifier
    pub id: Uuid,
    /// Output number
    pub number: usize,
    /// Canonical key
    pub key: u64,
    /// Favorite id, if favorite-derived
    pub favorite: Option<String>,
    /// Chosen piece identifiers in layer order
    pub attributes: Vec<String>,
}

/// Images received for one job, in arrival order
#[derive(Debug)]
pub struct Collection {
    catalog: Arc<Catalog>,
    job: u64,
    size: usize,
    images: Vec<CollectionImage>,
    keys: HashSet<u64>,
}

impl Collection {
    /// Start an empty collection for a job
    pub fn new(catalog: Arc<Catalog>, job: u64, size: usize) -> Self {
        Self {
            catalog,
            job,
            size,
            images: Vec::with_capacity(size),
            keys: HashSet::new(),
        }
    }

    /// Job whose updates this collection accepts
    pub const fn job(&self) -> u64 {
        self.job
    }

    /// Requested collection size
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Catalog used to resolve identifiers
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Size the collection can reach at best, given the catalog's combinations
    pub fn expected_len(&self) -> usize {
        let combinations = usize::try_from(self.catalog.combination_count()).unwrap_or(usize::MAX);
        self.size.min(combinations)
    }

    /// Merge an update batch
    ///
    /// Batches from any other job are discarded. Unknown piece identifiers are
    /// dropped; an image whose key was already received is skipped. Returns the
    /// number of images merged.
    pub fn merge(&mut self, job: u64, images: Vec<WireImage>) -> usize {
        if job != self.job {
            tracing::warn!(job, current = self.job, "discarding batch from stale job");
            return 0;
        }

        let before = self.images.len();
        for wire in images {
            if !self.keys.insert(wire.key) {
                tracing::warn!(key = wire.key, number = wire.number, "image already exists");
                continue;
            }

            let mut assignment = Assignment::new(self.catalog.layers().len());
            for piece_id in &wire.attributes {
                let resolved = self
                    .catalog
                    .piece_index(piece_id)
                    .and_then(|piece| self.catalog.piece(piece).map(|entry| (entry.layer, piece)));
                match resolved {
                    Some((layer, piece)) => assignment.place(layer, piece),
                    None => tracing::warn!(piece = %piece_id, "received unknown piece"),
                }
            }

            self.images.push(CollectionImage {
                id: Uuid::new_v4(),
                image: Image::new(wire.number, wire.key, wire.favorite, assignment),
            });
        }
        self.images.len() - before
    }

    /// Images received so far
    pub fn images(&self) -> &[CollectionImage] {
        &self.images
    }

    /// Image by local identifier
    pub fn image(&self, id: Uuid) -> Option<&CollectionImage> {
        self.images.iter().find(|entry| entry.id == id)
    }

    /// Number of images received
    pub fn received(&self) -> usize {
        self.images.len()
    }

    /// Fraction of the requested size received, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (self.images.len() as f64 / self.size as f64).min(1.0)
    }

    /// Test whether every requested image arrived
    pub fn is_complete(&self) -> bool {
        self.images.len() >= self.size
    }

    /// How many received images use each layer and piece, by identifier
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.images {
            for (layer, piece) in entry.image.assignment().placements() {
                if let Some(layer) = self.catalog.layer(layer) {
                    *counts.entry(layer.id.clone()).or_insert(0) += 1;
                }
                if let Some(piece) = self.catalog.piece(piece) {
                    *counts.entry(piece.id.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Toggle the favorite mark of an image, recording it in `favorites`
    pub fn toggle_favorite(&mut self, id: Uuid, favorites: &mut FavoriteBag) -> Option<&Image> {
        let slot = self.images.iter().position(|entry| entry.id == id)?;
        let entry = self.images.get_mut(slot)?;
        entry.image = favorites.toggle(&entry.image, &self.catalog);
        Some(&entry.image)
    }

    /// Change one layer of a favorite image
    ///
    /// The image is replaced by one with a recomputed key. Returns `None`,
    /// leaving the collection and `favorites` unchanged, if the image is
    /// unknown or not a favorite held by `favorites`, if `piece` is not in
    /// `layer`, or if another image already has the new key.
    pub fn update_favorite(
        &mut self,
        id: Uuid,
        favorites: &mut FavoriteBag,
        layer: usize,
        piece: Option<usize>,
    ) -> Option<&Image> {
        let slot = self.images.iter().position(|entry| entry.id == id)?;
        let entry = self.images.get_mut(slot)?;
        let replacement = favorites.edit(&entry.image, &self.catalog, layer, piece)?;

        let previous = entry.image.key();
        if replacement.key() != previous && self.keys.contains(&replacement.key()) {
            tracing::warn!(key = replacement.key(), "favorite edit would duplicate an image");
            return None;
        }

        let favorite = replacement.favorite()?.to_string();
        favorites.insert(favorite, replacement.attribute_ids(&self.catalog));
        self.keys.remove(&previous);
        self.keys.insert(replacement.key());
        entry.image = replacement;
        Some(&entry.image)
    }

    /// Flatten the collection for export
    pub fn export(&self) -> Vec<ExportedImage> {
        self.images
            .iter()
            .map(|entry| ExportedImage {
                id: entry.id,
                number: entry.image.number(),
                key: entry.image.key(),
                favorite: entry.image.favorite().map(str::to_string),
                attributes: entry.image.attribute_ids(&self.catalog),
            })
            .collect()
    }
}
