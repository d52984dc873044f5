//! Favorite compositions: ordered storage, resolution and editing

use crate::algorithm::builder::Assignment;
use crate::algorithm::executor::Image;
use crate::catalog::model::Catalog;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// A pre-approved composition keyed by an opaque favorite id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Favorite {
    /// Opaque favorite identifier
    pub id: String,
    /// Piece identifiers making up the composition
    pub pieces: Vec<String>,
}

/// Favorites in the order the caller supplied them
///
/// Serialized as a JSON object whose key order is preserved on the way in;
/// favorites are applied in exactly that order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FavoriteBag {
    entries: Vec<Favorite>,
}

impl FavoriteBag {
    /// Create an empty bag
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace a favorite
    ///
    /// A replaced favorite keeps its position. Returns the previous pieces.
    pub fn insert(&mut self, id: impl Into<String>, pieces: Vec<String>) -> Option<Vec<String>> {
        let id = id.into();
        if let Some(existing) = self.entries.iter_mut().find(|entry| entry.id == id) {
            return Some(std::mem::replace(&mut existing.pieces, pieces));
        }
        self.entries.push(Favorite { id, pieces });
        None
    }

    /// Remove a favorite, returning its pieces
    pub fn remove(&mut self, id: &str) -> Option<Vec<String>> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(position).pieces)
    }

    /// Look up the pieces of a favorite
    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.pieces.as_slice())
    }

    /// Test whether a favorite id is present
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of favorites
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Test if the bag holds no favorites
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate favorites in application order
    pub fn iter(&self) -> impl Iterator<Item = &Favorite> {
        self.entries.iter()
    }

    /// Mark an image as favorite, or clear its favorite mark
    ///
    /// Returns the replacement image. Favoriting records the image's current
    /// pieces under a fresh id; unfavoriting drops the entry from the bag.
    pub fn toggle(&mut self, image: &Image, catalog: &Catalog) -> Image {
        if let Some(id) = image.favorite() {
            self.remove(id);
            return image.with_favorite(None);
        }

        let id = Uuid::new_v4().to_string();
        self.insert(id.clone(), image.attribute_ids(catalog));
        image.with_favorite(Some(id))
    }

    /// Compose the image a favorite would become after swapping one layer
    ///
    /// The bag is left untouched. `None` as `piece` clears the layer. Returns
    /// `None` when the image is not a favorite held by this bag, the layer is
    /// unknown, or `piece` belongs to another layer.
    pub fn edit(
        &self,
        image: &Image,
        catalog: &Catalog,
        layer: usize,
        piece: Option<usize>,
    ) -> Option<Image> {
        let id = image.favorite()?;
        if !self.contains(id) {
            return None;
        }
        catalog.layer(layer)?;

        let mut assignment = image.assignment().clone();
        match piece {
            Some(piece) => {
                if catalog.piece(piece)?.layer != layer {
                    tracing::debug!(layer, piece, "piece belongs to another layer");
                    return None;
                }
                assignment.place(layer, piece);
            }
            None => assignment.clear(layer),
        }

        Some(Image::compose(
            image.number(),
            assignment,
            Some(id.to_string()),
            catalog,
        ))
    }

    /// Swap one layer's piece in a favorite image
    ///
    /// The image is replaced rather than edited: the returned image carries a
    /// recomputed key and the bag records its new pieces. Returns `None`
    /// whenever [`FavoriteBag::edit`] does.
    pub fn update(
        &mut self,
        image: &Image,
        catalog: &Catalog,
        layer: usize,
        piece: Option<usize>,
    ) -> Option<Image> {
        let replacement = self.edit(image, catalog, layer, piece)?;
        let id = replacement.favorite()?.to_string();
        self.insert(id, replacement.attribute_ids(catalog));
        Some(replacement)
    }
}

/// Build the assignment a favorite describes
///
/// Identifiers that no longer resolve are skipped; a later identifier for the
/// same layer replaces an earlier one. No tag or limit checks apply.
pub fn resolve_favorite(catalog: &Catalog, pieces: &[String]) -> Assignment {
    let mut assignment = Assignment::new(catalog.layers().len());
    for piece_id in pieces {
        let Some(piece) = catalog.piece_index(piece_id) else {
            tracing::debug!(piece = %piece_id, "favorite references unknown piece");
            continue;
        };
        if let Some(entry) = catalog.piece(piece) {
            assignment.place(entry.layer, piece);
        }
    }
    assignment
}

impl Serialize for FavoriteBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.id, &entry.pieces)?;
        }
        map.end()
    }
}

struct FavoriteBagVisitor;

impl<'de> Visitor<'de> for FavoriteBagVisitor {
    type Value = FavoriteBag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from favorite id to a list of piece ids")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut bag = FavoriteBag::new();
        while let Some((id, pieces)) = access.next_entry::<String, Vec<String>>()? {
            bag.insert(id, pieces);
        }
        Ok(bag)
    }
}

impl<'de> Deserialize<'de> for FavoriteBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FavoriteBagVisitor)
    }
}
