//! Image payloads attached to folders, recipes, and steps.
//!
//! The store treats image bytes as opaque; encoding and compression belong
//! to the caller. Serialized forms carry the bytes as standard base64.
//!
//! Listing and search reads leave the bytes in the store. Such an image has
//! `data: None` and can still be written back unchanged; its bytes are read
//! with `SqliteRecipeStore::fetch_image_data`.

use serde::{Deserialize, Serialize};

use super::ids::ImageId;
use super::siblings::Identified;

/// An image with its raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Identity of the image.
    pub id: ImageId,
    /// Raw bytes, opaque to the store; `None` when they were not loaded.
    #[serde(
        with = "base64_bytes::optional",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Vec<u8>>,
}

impl Image {
    /// Creates an image with a fresh identity.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: ImageId::generate(),
            data: Some(data.into()),
        }
    }

    /// An image whose bytes stay in the store.
    #[must_use]
    pub const fn deferred(id: ImageId) -> Self {
        Self { id, data: None }
    }

    /// Returns `true` if the bytes are present.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.data.is_some()
    }
}

impl Identified for Image {
    type Id = ImageId;

    fn id(&self) -> ImageId {
        self.id
    }
}

/// Serde adapter encoding byte vectors as base64 strings.
pub mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserializes bytes from a base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }

    /// The same encoding for bytes that may be absent.
    pub mod optional {
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serializes present bytes as base64 and absent ones as null.
        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes a base64 string or null.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            #[derive(Deserialize)]
            struct Encoded(#[serde(deserialize_with = "super::deserialize")] Vec<u8>);

            Ok(Option::<Encoded>::deserialize(deserializer)?.map(|Encoded(bytes)| bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_base64() {
        let image = Image::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["data"], "3q2+7w==");

        let back: Image = serde_json::from_value(json).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_deferred_image_omits_data() {
        let image = Image::deferred(ImageId::generate());
        let json = serde_json::to_value(&image).unwrap();
        assert!(json.get("data").is_none());

        let back: Image = serde_json::from_value(json).unwrap();
        assert!(!back.is_loaded());
        assert_eq!(back, image);
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let json = format!(r#"{{"id":"{}","data":"***"}}"#, ImageId::generate());
        assert!(serde_json::from_str::<Image>(&json).is_err());
    }
}
