//! Messages streamed from a generation job to its caller

use crate::algorithm::executor::Image;
use crate::catalog::model::Catalog;
use serde::{Deserialize, Serialize};

/// An accepted image as it crosses the job boundary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireImage {
    /// Output number in `1..=size`
    pub number: usize,
    /// Canonical key
    pub key: u64,
    /// Favorite id, serialized as `false` when absent
    #[serde(with = "favorite_flag")]
    pub favorite: Option<String>,
    /// Chosen piece identifiers
    pub attributes: Vec<String>,
}

impl WireImage {
    /// Flatten an image to identifiers
    pub fn from_image(image: &Image, catalog: &Catalog) -> Self {
        Self {
            number: image.number(),
            key: image.key(),
            favorite: image.favorite().map(str::to_string),
            attributes: image.attribute_ids(catalog),
        }
    }
}

/// Job to caller message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// A batch of accepted images
    Update {
        /// Images in acceptance order
        images: Vec<WireImage>,
    },
    /// The job produced its last image
    Finish,
}

mod favorite_flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Id(String),
        Marker(bool),
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        favorite: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match favorite {
            Some(id) => serializer.serialize_str(id),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match Flag::deserialize(deserializer)? {
            Flag::Id(id) => Ok(Some(id)),
            Flag::Marker(false) => Ok(None),
            Flag::Marker(true) => Err(D::Error::custom(
                "favorite must be a favorite id or false",
            )),
        }
    }
}
