use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Capability that turns text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce one vector per input text, in input order.
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Produce the vector for a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Deterministic embedder that hashes bytes into vector slots.
///
/// Useful for local runs and tests where no model is available. Texts sharing a prefix land
/// close together; nothing about the output is semantically meaningful.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Construct an embedder producing vectors of `dimension` floats.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Dimensionality of produced vectors.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }

    fn check_dimension(&self) -> Result<(), EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.check_dimension()?;
        tracing::debug!(
            dimension = self.dimension,
            texts = texts.len(),
            "Generating hash embeddings"
        );

        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.check_dimension()?;
        Ok(Self::encode(text, self.dimension))
    }
}

/// Value written into every slot by [`NilEmbedder`]. Must be non-zero for cosine collections.
pub const NIL_VECTOR_VALUE: f32 = 0.000_000_1;

/// Embedder returning the same near-zero vector for every text.
///
/// Lets a store hold payload-only documents in a collection that still requires vectors.
#[derive(Debug, Clone, Copy)]
pub struct NilEmbedder {
    dimension: usize,
}

impl NilEmbedder {
    /// Construct a nil embedder for the given dimension.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector(&self) -> Vec<f32> {
        vec![NIL_VECTOR_VALUE; self.dimension]
    }
}

impl Default for NilEmbedder {
    fn default() -> Self {
        Self::new(1536)
    }
}

#[async_trait]
impl Embedder for NilEmbedder {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| self.vector()).collect())
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector())
    }
}
