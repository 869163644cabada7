//! Public store façade: embedding, payload mapping, and Qdrant exchanges in one place.

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::{StreamExt, pin_mut};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::{
    codec::{CodecError, PayloadScheme},
    config::{ConfigError, QDRANT_API_KEY_ENV, QDRANT_URL_ENV, load_env_optional},
    document::Document,
    embedding::{Embedder, EmbeddingError},
    options::{CallOptions, ResolvedOptions, apply_score_threshold, resolve},
    qdrant::{
        CollectionConfig, FilterMatch, QdrantError, QdrantService, ScrollRequest,
        build_match_any_filter,
        client::{USER_AGENT, normalize_base_url},
        stream_points,
    },
    vectorstore::VectorStore,
};

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store configuration was incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Score threshold fell outside `[0, 1]`.
    #[error("score threshold must be between 0 and 1, got {0}")]
    InvalidScoreThreshold(f32),
    /// Neither the call nor the store provided an embedder.
    #[error("no embedder configured for this call")]
    MissingEmbedder,
    /// Embedding provider failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Embedding provider returned a different number of vectors than texts.
    #[error(
        "number of vectors from embedder ({actual}) does not match number of documents ({expected})"
    )]
    EmbedderVectorCountMismatch {
        /// Number of documents submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// Document and point could not be mapped onto each other.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Qdrant exchange failed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
}

impl StoreError {
    /// Whether this error reports a similarity search that matched nothing at all.
    pub fn is_empty_response(&self) -> bool {
        matches!(self, Self::Qdrant(QdrantError::EmptyResponse))
    }
}

/// One page of decoded documents from a scroll.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    /// Documents in index order.
    pub documents: Vec<Document>,
    /// Cursor for the next page; `None` once the collection is exhausted.
    pub next_offset: Option<Value>,
}

impl DocumentPage {
    /// Whether this is the final page.
    pub fn is_last(&self) -> bool {
        self.next_offset.is_none()
    }
}

/// Collects store configuration. [`StoreBuilder::build`] validates without touching the network.
#[derive(Default)]
pub struct StoreBuilder {
    embedder: Option<Arc<dyn Embedder>>,
    collection_name: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    use_cloud: bool,
    payload_scheme: PayloadScheme,
    collection_config: CollectionConfig,
    index_keys: Vec<String>,
    http_client: Option<Client>,
}

impl StoreBuilder {
    /// Embedder used when a call does not override it. Required.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Target collection. Required.
    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    /// Qdrant base URL. Falls back to `QDRANT_BASE_URL`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// API key sent in the `api-key` header. Falls back to `QDRANT_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Require an API key, as managed deployments do.
    pub fn use_cloud(mut self, use_cloud: bool) -> Self {
        self.use_cloud = use_cloud;
        self
    }

    /// Payload layout for every point this store writes and reads.
    pub fn payload_scheme(mut self, scheme: PayloadScheme) -> Self {
        self.payload_scheme = scheme;
        self
    }

    /// Collection parameters applied by [`QdrantStore::provision`].
    pub fn collection_config(mut self, config: CollectionConfig) -> Self {
        self.collection_config = config;
        self
    }

    /// Metadata fields to declare as keyword indexes during provisioning.
    pub fn index_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.index_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Reuse an existing HTTP client.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validate the configuration and assemble the store.
    pub fn build(self) -> Result<QdrantStore, ConfigError> {
        self.build_with_env(load_env_optional)
    }

    /// Build the store, then create its collection and payload indexes.
    pub async fn connect(self) -> Result<QdrantStore, StoreError> {
        let store = self.build()?;
        store.provision().await?;
        Ok(store)
    }

    fn build_with_env<F>(self, lookup: F) -> Result<QdrantStore, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let embedder = self.embedder.ok_or(ConfigError::MissingEmbedder)?;

        let api_key = non_blank(self.api_key).or_else(|| lookup(QDRANT_API_KEY_ENV));
        if self.use_cloud && api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        let base_url = non_blank(self.base_url)
            .or_else(|| lookup(QDRANT_URL_ENV))
            .ok_or(ConfigError::MissingBaseUrl)?;
        let base_url = normalize_base_url(&base_url).map_err(ConfigError::InvalidUrl)?;

        let collection_name =
            non_blank(self.collection_name).ok_or(ConfigError::MissingCollectionName)?;

        let client = match self.http_client {
            Some(client) => client,
            None => Client::builder().user_agent(USER_AGENT).build()?,
        };

        Ok(QdrantStore {
            service: QdrantService::with_client(client, base_url, api_key),
            embedder,
            collection_name,
            payload_scheme: self.payload_scheme,
            collection_config: self.collection_config,
            index_keys: self.index_keys,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Document store backed by a single Qdrant collection.
///
/// Holds only immutable configuration plus shared handles, so clones are cheap and concurrent
/// use is safe as long as the embedder is.
#[derive(Clone)]
pub struct QdrantStore {
    service: QdrantService,
    embedder: Arc<dyn Embedder>,
    collection_name: String,
    payload_scheme: PayloadScheme,
    collection_config: CollectionConfig,
    index_keys: Vec<String>,
}

impl QdrantStore {
    /// Start configuring a store.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Collection this store reads and writes.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Payload layout used by this store.
    pub fn payload_scheme(&self) -> &PayloadScheme {
        &self.payload_scheme
    }

    /// Collection parameters used by [`Self::provision`].
    pub fn collection_config(&self) -> &CollectionConfig {
        &self.collection_config
    }

    /// Create the collection when missing and declare every configured payload index.
    ///
    /// Stops at the first failure and returns it.
    pub async fn provision(&self) -> Result<(), StoreError> {
        let created = self
            .service
            .ensure_collection(&self.collection_name, &self.collection_config)
            .await?;

        for key in &self.index_keys {
            let field = self.payload_scheme.metadata_path(key);
            self.service
                .create_payload_index(&self.collection_name, &field)
                .await?;
        }

        tracing::info!(
            collection = %self.collection_name,
            created,
            index_keys = self.index_keys.len(),
            "Collection provisioned"
        );
        Ok(())
    }

    /// Embed and upsert documents, returning the point ids written in input order.
    pub async fn add_documents(
        &self,
        documents: Vec<Document>,
        options: CallOptions,
    ) -> Result<Vec<String>, StoreError> {
        let ResolvedOptions { embedder, .. } = resolve(options, Some(&self.embedder))?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = documents
            .iter()
            .map(|document| document.content.clone())
            .collect();
        let vectors = embedder.embed_documents(texts).await?;

        if vectors.len() != documents.len() {
            return Err(StoreError::EmbedderVectorCountMismatch {
                expected: documents.len(),
                actual: vectors.len(),
            });
        }

        let points = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| self.payload_scheme.encode(document, vector))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<String> = points.iter().map(|point| point.id.to_string()).collect();

        self.service
            .upsert_points(&self.collection_name, &points)
            .await?;

        tracing::info!(
            collection = %self.collection_name,
            documents = ids.len(),
            "Documents added"
        );
        Ok(ids)
    }

    /// Return up to `num_documents` documents most similar to `query`.
    ///
    /// Documents scoring below a non-zero threshold are dropped after decoding; an index that
    /// returns no points at all yields [`QdrantError::EmptyResponse`].
    pub async fn similarity_search(
        &self,
        query: &str,
        num_documents: usize,
        options: CallOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let ResolvedOptions {
            embedder,
            filter,
            score_threshold,
        } = resolve(options, Some(&self.embedder))?;

        let vector = embedder.embed_query(query).await?;
        let hits = self
            .service
            .search_points(&self.collection_name, vector, num_documents, filter)
            .await?;

        let documents = hits
            .into_iter()
            .map(|hit| {
                let (point, score) = hit.into_parts();
                self.payload_scheme.decode(point, score, false)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let returned = documents.len();
        let kept = apply_score_threshold(documents, score_threshold);
        tracing::debug!(
            collection = %self.collection_name,
            returned,
            kept = kept.len(),
            score_threshold,
            "Similarity search completed"
        );
        Ok(kept)
    }

    /// Fetch and decode one scroll page.
    pub async fn scroll(&self, request: ScrollRequest) -> Result<DocumentPage, StoreError> {
        let with_vector = request.with_vector;
        let page = self
            .service
            .scroll_points(&self.collection_name, &request)
            .await?;

        let documents = page
            .points
            .into_iter()
            .map(|point| self.payload_scheme.decode(point, 0.0, with_vector))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentPage {
            documents,
            next_offset: page.next_offset,
        })
    }

    /// Stream every document in the collection, page after page.
    pub fn scroll_all(
        &self,
        request: ScrollRequest,
    ) -> impl Stream<Item = Result<Document, StoreError>> + '_ {
        try_stream! {
            let with_vector = request.with_vector;
            let points = stream_points(&self.service, &self.collection_name, request);
            pin_mut!(points);

            while let Some(point) = points.next().await {
                let point = point?;
                yield self.payload_scheme.decode(point, 0.0, with_vector)?;
            }
        }
    }

    /// Delete every document matching `filter`.
    pub async fn delete_documents(&self, filter: Value) -> Result<(), StoreError> {
        self.service
            .delete_points(&self.collection_name, filter)
            .await?;
        tracing::info!(collection = %self.collection_name, "Documents deleted");
        Ok(())
    }

    /// Build a conjunction of "metadata field is one of" clauses for this store's payload layout.
    pub fn must_equal_filter(&self, matches: &[FilterMatch]) -> Value {
        build_match_any_filter(matches, |key| self.payload_scheme.metadata_path(key))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add_documents(
        &self,
        documents: Vec<Document>,
        options: CallOptions,
    ) -> Result<Vec<String>, StoreError> {
        QdrantStore::add_documents(self, documents, options).await
    }

    async fn similarity_search(
        &self,
        query: &str,
        num_documents: usize,
        options: CallOptions,
    ) -> Result<Vec<Document>, StoreError> {
        QdrantStore::similarity_search(self, query, num_documents, options).await
    }
}
