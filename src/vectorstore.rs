//! Store abstraction and the retriever built on top of it.

use async_trait::async_trait;

use crate::{document::Document, options::CallOptions, store::StoreError};

/// Abstraction over document stores that can be written to and queried by similarity.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and persist documents, returning the ids written.
    async fn add_documents(
        &self,
        documents: Vec<Document>,
        options: CallOptions,
    ) -> Result<Vec<String>, StoreError>;

    /// Return up to `num_documents` documents most similar to `query`.
    async fn similarity_search(
        &self,
        query: &str,
        num_documents: usize,
        options: CallOptions,
    ) -> Result<Vec<Document>, StoreError>;
}

/// Binds a store to a fixed result count and default options.
#[derive(Debug, Clone)]
pub struct Retriever<S> {
    store: S,
    num_documents: usize,
    options: CallOptions,
}

impl<S: VectorStore> Retriever<S> {
    /// Retrieve `num_documents` results per query with default options.
    pub fn new(store: S, num_documents: usize) -> Self {
        Self {
            store,
            num_documents,
            options: CallOptions::default(),
        }
    }

    /// Replace the options applied to every query.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the documents relevant to `query`.
    pub async fn relevant_documents(&self, query: &str) -> Result<Vec<Document>, StoreError> {
        tracing::debug!(query, num_documents = self.num_documents, "Retriever started");
        let documents = self
            .store
            .similarity_search(query, self.num_documents, self.options.clone())
            .await?;
        tracing::debug!(query, documents = documents.len(), "Retriever finished");
        Ok(documents)
    }
}
