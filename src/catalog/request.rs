//! Generation request payload as supplied by the caller

use crate::catalog::favorites::FavoriteBag;
use crate::io::error::{GenerationError, Result, file_system};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// One interchangeable option for a layer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceSpec {
    /// Catalog-wide unique identifier
    pub id: String,
    /// Tags contributed when this piece is chosen
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Tags that may not appear alongside this piece
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_tags: Vec<String>,
    /// Maximum uses across one run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<NonZeroUsize>,
}

/// A slot in the composite image
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpec {
    /// Unique layer identifier
    pub id: String,
    /// Tags contributed when this layer is filled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Tags that may not appear alongside this layer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_tags: Vec<String>,
    /// Every generated image must fill this layer
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// The layer's choice does not participate in the uniqueness key
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude_from_key: bool,
    /// Maximum uses across one run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<NonZeroUsize>,
    /// Options for this layer, in authoring order
    #[serde(default)]
    pub pieces: Vec<PieceSpec>,
}

impl LayerSpec {
    fn fingerprint(&self) -> String {
        let pieces = self
            .pieces
            .iter()
            .map(|piece| {
                [
                    limit_token(piece.limit),
                    piece.tags.join("|"),
                    piece.blocked_tags.join("|"),
                ]
                .join(":")
            })
            .collect::<Vec<_>>()
            .join(":");

        [
            u8::from(self.required).to_string(),
            u8::from(self.exclude_from_key).to_string(),
            limit_token(self.limit),
            self.tags.join("|"),
            self.blocked_tags.join("|"),
            pieces,
        ]
        .join(":")
    }
}

fn limit_token(limit: Option<NonZeroUsize>) -> String {
    limit.map_or_else(|| "x".to_string(), |limit| limit.to_string())
}

/// A complete generation request: catalog snapshot, target size and favorites
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Catalog layers in authoring order
    pub layers: Vec<LayerSpec>,
    /// Number of images to generate
    pub size: usize,
    /// Favorites applied before any random generation
    #[serde(default)]
    pub favorites: FavoriteBag,
}

impl RunRequest {
    /// Decode a request from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid request, including zero limits
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| GenerationError::RequestLoad {
            path: "<inline>".into(),
            source,
        })
    }

    /// Load a request from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(file_system(path, "read request"))?;
        serde_json::from_str(&text).map_err(|source| GenerationError::RequestLoad {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Canonical description of everything that shapes generation
    ///
    /// Layers are ordered by id so that reordering the catalog does not change
    /// the fingerprint. Identifiers of pieces and favorites are not included.
    pub fn fingerprint(&self) -> String {
        let mut layers: Vec<&LayerSpec> = self.layers.iter().collect();
        layers.sort_by(|a, b| a.id.cmp(&b.id));
        let body = layers
            .iter()
            .map(|layer| layer.fingerprint())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{body}", self.size)
    }
}
