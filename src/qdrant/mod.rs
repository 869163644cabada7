//! Qdrant vector store integration.

pub mod client;
pub mod filters;
/// Streaming helpers for Qdrant scroll pagination.
pub mod scroller;
pub mod types;

pub use client::QdrantService;
pub use filters::{FilterMatch, build_match_any_filter};
pub use scroller::stream_points;
pub use types::{
    CollectionConfig, Distance, Point, PointId, QdrantError, ScoredPoint, ScrollPage,
    ScrollRequest,
};
