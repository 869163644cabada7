//! Mapping between [`Document`]s and the index's point payloads.
//!
//! A store writes every point with a single [`PayloadScheme`]. The nested scheme keeps content
//! and metadata under two reserved keys; the flat scheme spreads metadata across the payload and
//! reserves one key for the text. Points written under one scheme are not decodable under the
//! other, so the scheme is part of a store's configuration rather than inferred per point.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::document::{Document, Metadata};
use crate::qdrant::types::{Point, PointId};

/// Default payload key holding document content in the nested scheme.
pub const DEFAULT_CONTENT_KEY: &str = "page_content";
/// Default payload key holding document metadata in the nested scheme.
pub const DEFAULT_METADATA_KEY: &str = "metadata";
/// Default payload key holding document content in the flat scheme.
pub const DEFAULT_TEXT_KEY: &str = "text";
/// Metadata field whose value is reused as the point identifier on upsert.
pub const POINT_ID_METADATA_KEY: &str = "__point_id";

/// Errors raised while converting between documents and points.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload lacked a string value under the content key.
    #[error("missing content key `{key}` in point payload")]
    MissingContentKey {
        /// Key that was expected to hold the content.
        key: String,
    },
    /// Payload held a non-object value under the metadata key.
    #[error("metadata key `{key}` does not hold an object")]
    InvalidMetadata {
        /// Key that was expected to hold the metadata object.
        key: String,
    },
    /// Reserved point-id metadata field held an unusable value.
    #[error("metadata field `__point_id` must be a string or unsigned integer")]
    InvalidPointId,
    /// Vector was requested but the index did not return one.
    #[error("point `{id}` was returned without a vector")]
    MissingVector {
        /// Identifier of the offending point.
        id: String,
    },
}

/// Layout of document fields inside a point payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadScheme {
    /// `{content_key: "...", metadata_key: {...}}`.
    Nested {
        /// Payload key holding the content string.
        content_key: String,
        /// Payload key holding the metadata object.
        metadata_key: String,
    },
    /// Metadata fields at the top level, content under `text_key`.
    Flat {
        /// Payload key holding the content string.
        text_key: String,
    },
}

impl Default for PayloadScheme {
    fn default() -> Self {
        Self::nested(DEFAULT_CONTENT_KEY, DEFAULT_METADATA_KEY)
    }
}

impl PayloadScheme {
    /// Nested scheme with custom key names.
    pub fn nested(content_key: impl Into<String>, metadata_key: impl Into<String>) -> Self {
        Self::Nested {
            content_key: content_key.into(),
            metadata_key: metadata_key.into(),
        }
    }

    /// Flat scheme with a custom text key.
    pub fn flat(text_key: impl Into<String>) -> Self {
        Self::Flat {
            text_key: text_key.into(),
        }
    }

    /// Payload key holding the document content.
    pub fn content_key(&self) -> &str {
        match self {
            Self::Nested { content_key, .. } => content_key,
            Self::Flat { text_key } => text_key,
        }
    }

    /// Payload path of a metadata field, as used by filters and payload indexes.
    pub fn metadata_path(&self, key: &str) -> String {
        match self {
            Self::Nested { metadata_key, .. } => format!("{metadata_key}.{key}"),
            Self::Flat { .. } => key.to_string(),
        }
    }

    /// Convert a document and its embedding into a point ready for upsert.
    pub fn encode(&self, document: Document, vector: Vec<f32>) -> Result<Point, CodecError> {
        let Document {
            id,
            content,
            metadata,
            ..
        } = document;
        let id = resolve_point_id(id, &metadata)?;

        let payload = match self {
            Self::Nested {
                content_key,
                metadata_key,
            } => {
                let mut payload = Map::new();
                payload.insert(content_key.clone(), Value::String(content));
                payload.insert(metadata_key.clone(), Value::Object(metadata));
                payload
            }
            Self::Flat { text_key } => {
                let mut payload = metadata;
                payload.insert(text_key.clone(), Value::String(content));
                payload
            }
        };

        Ok(Point {
            id,
            vector: Some(vector),
            payload,
        })
    }

    /// Rebuild a document from a stored point.
    ///
    /// The vector is optional unless `require_vector` is set, which callers do when they asked
    /// the index to return vectors.
    pub fn decode(
        &self,
        point: Point,
        score: f32,
        require_vector: bool,
    ) -> Result<Document, CodecError> {
        let Point {
            id,
            vector,
            mut payload,
        } = point;

        if require_vector && vector.is_none() {
            return Err(CodecError::MissingVector { id: id.to_string() });
        }

        let content_key = self.content_key();
        let content = match payload.remove(content_key) {
            Some(Value::String(content)) => content,
            _ => {
                return Err(CodecError::MissingContentKey {
                    key: content_key.to_string(),
                });
            }
        };

        let metadata = match self {
            Self::Nested { metadata_key, .. } => match payload.remove(metadata_key) {
                None | Some(Value::Null) => Metadata::new(),
                Some(Value::Object(metadata)) => metadata,
                Some(_) => {
                    return Err(CodecError::InvalidMetadata {
                        key: metadata_key.clone(),
                    });
                }
            },
            Self::Flat { .. } => payload,
        };

        Ok(Document {
            id: Some(id.to_string()),
            content,
            metadata,
            score,
            vector,
        })
    }
}

fn resolve_point_id(id: Option<String>, metadata: &Metadata) -> Result<PointId, CodecError> {
    if let Some(id) = id.filter(|value| !value.trim().is_empty()) {
        return Ok(PointId::from(id));
    }

    match metadata.get(POINT_ID_METADATA_KEY) {
        None | Some(Value::Null) => Ok(PointId::generate()),
        Some(Value::String(value)) if !value.trim().is_empty() => {
            Ok(PointId::from(value.clone()))
        }
        Some(Value::Number(number)) => number
            .as_u64()
            .map(PointId::Num)
            .ok_or(CodecError::InvalidPointId),
        Some(_) => Err(CodecError::InvalidPointId),
    }
}
