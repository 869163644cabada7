use std::sync::Arc;

use futures_util::{StreamExt, pin_mut};
use rustystore::{
    CallOptions, CollectionConfig, Document, FilterMatch, HashEmbedder, QdrantStore,
    ScrollRequest, config,
};
use serde_json::json;

const LIVE_DIMENSION: usize = 64;

async fn live_store() -> QdrantStore {
    let settings = config::init_settings().expect("QDRANT_* variables must be set");
    let mut builder = QdrantStore::builder()
        .embedder(Arc::new(HashEmbedder::new(LIVE_DIMENSION)))
        .collection_name(format!("{}-live", settings.collection_name))
        .use_cloud(settings.use_cloud)
        .collection_config(CollectionConfig::default().with_vector_size(LIVE_DIMENSION as u64))
        .index_keys(["run"]);
    if let Some(url) = settings.qdrant_url {
        builder = builder.base_url(url);
    }
    if let Some(key) = settings.api_key {
        builder = builder.api_key(key);
    }
    builder.connect().await.expect("live collection provisioned")
}

#[tokio::test]
#[ignore = "Requires live Qdrant"]
async fn live_add_search_export_delete() {
    let store = live_store().await;
    let run = uuid::Uuid::new_v4().to_string();
    let run_filter = store.must_equal_filter(&[FilterMatch::new("run", [run.as_str()])]);

    let ids = store
        .add_documents(
            vec![
                Document::new("Tokyo is the capital of Japan").with_field("run", json!(run)),
                Document::new("Paris is the capital of France").with_field("run", json!(run)),
            ],
            CallOptions::new(),
        )
        .await
        .expect("documents added");
    assert_eq!(ids.len(), 2);

    let hits = store
        .similarity_search(
            "Tokyo is the capital of Japan",
            1,
            CallOptions::new().with_filter(run_filter.clone()),
        )
        .await
        .expect("search succeeds");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "Tokyo is the capital of Japan");

    let exported = store.scroll_all(ScrollRequest {
        limit: 1,
        filter: Some(run_filter.clone()),
        ..ScrollRequest::default()
    });
    pin_mut!(exported);
    let mut count = 0;
    while let Some(document) = exported.next().await {
        document.expect("document decodes");
        count += 1;
    }
    assert_eq!(count, 2, "both documents should be exported across pages");

    store
        .delete_documents(run_filter)
        .await
        .expect("run documents deleted");
}
