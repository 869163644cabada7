#![deny(missing_docs)]

//! Document-to-vector storage adapter for Qdrant-compatible indexes.
//!
//! [`QdrantStore`] embeds documents through an [`Embedder`], maps them onto point payloads with
//! a [`PayloadScheme`], and talks to Qdrant over its REST API.

/// Payload mapping between documents and points.
pub mod codec;
/// Environment-driven configuration and configuration errors.
pub mod config;
/// Caller-facing document model.
pub mod document;
/// Embedding capability and local implementations.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Per-call options and threshold filtering.
pub mod options;
/// Qdrant wire protocol client.
pub mod qdrant;
/// Store façade.
pub mod store;
/// Store trait and retriever.
pub mod vectorstore;

pub use codec::{CodecError, PayloadScheme};
pub use config::ConfigError;
pub use document::{Document, Metadata};
pub use embedding::{Embedder, EmbeddingError, HashEmbedder, NilEmbedder};
pub use options::CallOptions;
pub use qdrant::{CollectionConfig, Distance, FilterMatch, QdrantError, ScrollRequest};
pub use store::{DocumentPage, QdrantStore, StoreBuilder, StoreError};
pub use vectorstore::{Retriever, VectorStore};
