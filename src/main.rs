use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures_util::{StreamExt, pin_mut};
use rustystore::{
    CallOptions, CollectionConfig, Document, FilterMatch, HashEmbedder, QdrantStore,
    ScrollRequest, config, logging,
    qdrant::{filters::parse_key_value, types::DEFAULT_SCROLL_LIMIT},
};

/// Store and search text documents in a Qdrant collection.
#[derive(Parser)]
#[command(name = "rustystore", version)]
struct Cli {
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the collection (when missing) and declare payload indexes.
    Provision {
        /// Metadata field to index as a keyword; repeatable.
        #[arg(long = "index-key")]
        index_keys: Vec<String>,
    },
    /// Embed and upsert documents from a JSON-lines file.
    Add {
        /// File with one `{"content": ..., "metadata": {...}, "id": ...}` object per line.
        file: PathBuf,
    },
    /// Print the documents most similar to a query as JSON lines.
    Search {
        /// Query text.
        query: String,
        /// Number of documents to return.
        #[arg(short = 'k', long, default_value_t = 4)]
        limit: usize,
        /// Minimum score in [0, 1]; 0 disables filtering.
        #[arg(long, default_value_t = 0.0)]
        score_threshold: f32,
        /// `key=value` metadata constraint; repeatable.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<FilterMatch>,
    },
    /// Print every stored document as JSON lines.
    Export {
        /// `key=value` metadata constraint; repeatable.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<FilterMatch>,
        /// Points fetched per scroll request.
        #[arg(long, default_value_t = DEFAULT_SCROLL_LIMIT)]
        page_size: usize,
        /// Include stored vectors in the output.
        #[arg(long)]
        with_vectors: bool,
    },
    /// Delete documents matching every given constraint.
    Delete {
        /// `key=value` metadata constraint; repeatable.
        #[arg(long = "filter", value_parser = parse_filter, required = true)]
        filters: Vec<FilterMatch>,
    },
}

fn parse_filter(input: &str) -> Result<FilterMatch, String> {
    parse_key_value(input).ok_or_else(|| format!("expected key=value, got `{input}`"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);
    let settings = config::init_settings().context("failed to load settings")?;

    let index_keys = match &cli.command {
        Command::Provision { index_keys } => index_keys.clone(),
        _ => Vec::new(),
    };
    let store = build_store(&settings, index_keys)?;

    match cli.command {
        Command::Provision { .. } => {
            store
                .provision()
                .await
                .context("failed to provision collection")?;
        }
        Command::Add { file } => {
            let documents = read_documents(&file).await?;
            let ids = store
                .add_documents(documents, CallOptions::new())
                .await
                .context("failed to add documents")?;
            for id in ids {
                println!("{id}");
            }
        }
        Command::Search {
            query,
            limit,
            score_threshold,
            filters,
        } => {
            let mut options = CallOptions::new().with_score_threshold(score_threshold);
            if !filters.is_empty() {
                options = options.with_filter(store.must_equal_filter(&filters));
            }
            match store.similarity_search(&query, limit, options).await {
                Ok(documents) => {
                    for document in &documents {
                        println!("{}", serde_json::to_string(document)?);
                    }
                }
                Err(err) if err.is_empty_response() => {
                    tracing::info!(query = %query, "No documents matched");
                }
                Err(err) => return Err(err).context("search failed"),
            }
        }
        Command::Export {
            filters,
            page_size,
            with_vectors,
        } => {
            let request = ScrollRequest {
                limit: page_size,
                filter: (!filters.is_empty()).then(|| store.must_equal_filter(&filters)),
                with_vector: with_vectors,
                ..ScrollRequest::default()
            };
            let documents = store.scroll_all(request);
            pin_mut!(documents);
            let mut exported = 0usize;
            while let Some(document) = documents.next().await {
                let document = document.context("export failed")?;
                println!("{}", serde_json::to_string(&document)?);
                exported += 1;
            }
            tracing::info!(exported, "Export finished");
        }
        Command::Delete { filters } => {
            store
                .delete_documents(store.must_equal_filter(&filters))
                .await
                .context("failed to delete documents")?;
        }
    }

    Ok(())
}

fn build_store(settings: &config::Settings, index_keys: Vec<String>) -> Result<QdrantStore> {
    let dimension = settings.embedding_dimension;
    let mut builder = QdrantStore::builder()
        .embedder(Arc::new(HashEmbedder::new(dimension)))
        .collection_name(settings.collection_name.clone())
        .use_cloud(settings.use_cloud)
        .collection_config(CollectionConfig::default().with_vector_size(dimension as u64))
        .index_keys(index_keys);
    if let Some(url) = &settings.qdrant_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(key) = &settings.api_key {
        builder = builder.api_key(key.clone());
    }
    builder.build().context("invalid store configuration")
}

async fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid document", path.display(), index + 1))
        })
        .collect()
}
