//! Shared types used by the Qdrant client and helpers.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant answered with a non-200 status.
    #[error("{task}: Qdrant responded with {status}: {body}")]
    Api {
        /// Operation that was being performed.
        task: &'static str,
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Raw body text of the failing response.
        body: String,
    },
    /// Response body could not be decoded.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    /// Similarity search returned no points at all.
    #[error("empty response")]
    EmptyResponse,
}

/// Point identifier accepted by Qdrant: an unsigned integer or a UUID string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    /// Numeric identifier.
    Num(u64),
    /// UUID (or other string) identifier.
    Uuid(String),
}

impl PointId {
    /// Fresh random UUID v4 identifier.
    pub fn generate() -> Self {
        Self::Uuid(Uuid::new_v4().to_string())
    }
}

impl From<String> for PointId {
    fn from(value: String) -> Self {
        match value.parse::<u64>() {
            Ok(number) if number.to_string() == value => Self::Num(number),
            _ => Self::Uuid(value),
        }
    }
}

impl From<&str> for PointId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(number) => write!(f, "{number}"),
            Self::Uuid(value) => f.write_str(value),
        }
    }
}

/// Storage unit of the index: identifier, vector, and payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// Point identifier.
    pub id: PointId,
    /// Embedding vector; absent when the index omitted it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Payload fields stored alongside the vector.
    pub payload: Map<String, Value>,
}

/// Distance metric configured on a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Distance {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Euclidean distance.
    Euclid,
    /// Dot product.
    Dot,
    /// Manhattan distance.
    Manhattan,
}

/// Vector parameters of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorParams {
    /// Vector dimensionality.
    pub size: u64,
    /// Distance metric.
    pub distance: Distance,
}

/// Optimizer tuning applied at collection creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizersConfig {
    /// Segment size (in KB) above which segments are memory-mapped.
    pub memmap_threshold: u64,
}

/// Body of a create-collection request.
///
/// [`CollectionConfig::default`] yields the standard settings; builder methods return a
/// modified copy, leaving the default untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionConfig {
    /// Vector parameters.
    pub vectors: VectorParams,
    /// Whether payloads are stored on disk.
    pub on_disk_payload: bool,
    /// Optimizer settings.
    pub optimizers_config: OptimizersConfig,
    /// Extra top-level parameters (for example `hnsw_config`), sent verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            vectors: VectorParams {
                size: 1536,
                distance: Distance::Cosine,
            },
            on_disk_payload: true,
            optimizers_config: OptimizersConfig {
                memmap_threshold: 10_000,
            },
            extra: Map::new(),
        }
    }
}

impl CollectionConfig {
    /// Override the vector dimensionality.
    pub fn with_vector_size(mut self, size: u64) -> Self {
        self.vectors.size = size;
        self
    }

    /// Override the distance metric.
    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.vectors.distance = distance;
        self
    }

    /// Toggle on-disk payload storage.
    pub fn with_on_disk_payload(mut self, on_disk: bool) -> Self {
        self.on_disk_payload = on_disk;
        self
    }

    /// Override the memmap threshold.
    pub fn with_memmap_threshold(mut self, threshold: u64) -> Self {
        self.optimizers_config.memmap_threshold = threshold;
        self
    }

    /// Add an extra top-level parameter such as `hnsw_config`.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Parameters of a single scroll request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    /// Cursor returned by the previous page; `None` starts from the beginning.
    pub offset: Option<Value>,
    /// Maximum number of points per page.
    pub limit: usize,
    /// Optional filter passed through verbatim.
    pub filter: Option<Value>,
    /// Whether vectors should be returned (and therefore required on decode).
    pub with_vector: bool,
}

impl Default for ScrollRequest {
    fn default() -> Self {
        Self {
            offset: None,
            limit: DEFAULT_SCROLL_LIMIT,
            filter: None,
            with_vector: false,
        }
    }
}

/// Page size used when none is requested.
pub const DEFAULT_SCROLL_LIMIT: usize = 256;

/// Page of raw points returned by a scroll request.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    /// Points in index order.
    pub points: Vec<Point>,
    /// Cursor for the next page; `None` once the collection is exhausted.
    pub next_offset: Option<Value>,
}

/// Scored point returned by similarity search.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: PointId,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    /// Optional vector, present when requested.
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

impl ScoredPoint {
    /// Split into the stored point and its score.
    pub fn into_parts(self) -> (Point, f32) {
        let point = Point {
            id: self.id,
            vector: self.vector,
            payload: self.payload.unwrap_or_default(),
        };
        (point, self.score)
    }
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResponse {
    pub(crate) result: ScrollResult,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResult {
    #[serde(default)]
    pub(crate) points: Vec<RecordPoint>,
    #[serde(default)]
    pub(crate) next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct RecordPoint {
    pub(crate) id: PointId,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub(crate) vector: Option<Vec<f32>>,
}

impl From<RecordPoint> for Point {
    fn from(record: RecordPoint) -> Self {
        Self {
            id: record.id,
            vector: record.vector,
            payload: record.payload.unwrap_or_default(),
        }
    }
}
