//! HTTP client wrapper for interacting with Qdrant.

use crate::qdrant::types::{
    CollectionConfig, Point, QdrantError, ScoredPoint, ScrollPage, ScrollRequest,
    ScrollResponse, SearchResponse,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// User agent sent when the store builds its own `reqwest` client.
pub const USER_AGENT: &str = "rustystore/0.1";

/// Lightweight HTTP client for Qdrant operations.
#[derive(Clone)]
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a client for an already-normalized base URL.
    pub fn with_client(client: Client, base_url: String, api_key: Option<String>) -> Self {
        tracing::debug!(
            url = %base_url,
            has_api_key = %api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Create a collection only when it is missing. Returns whether it was created.
    pub async fn ensure_collection(
        &self,
        collection_name: &str,
        config: &CollectionConfig,
    ) -> Result<bool, QdrantError> {
        if self.collection_exists(collection_name).await? {
            tracing::debug!(collection = collection_name, "Collection already present");
            return Ok(false);
        }

        self.create_collection(collection_name, config).await?;
        Ok(true)
    }

    /// Create a collection with the given configuration.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        config: &CollectionConfig,
    ) -> Result<(), QdrantError> {
        let request = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(config);
        self.exchange(request, "creating collection").await?;
        tracing::debug!(
            collection = collection_name,
            vector_size = config.vectors.size,
            distance = ?config.vectors.distance,
            "Collection created"
        );
        Ok(())
    }

    /// Check whether a collection exists.
    pub async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await?;
                let error = QdrantError::Api {
                    task: "checking collection",
                    status,
                    body,
                };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    /// Declare a keyword payload index on the given field path.
    pub async fn create_payload_index(
        &self,
        collection_name: &str,
        field_name: &str,
    ) -> Result<(), QdrantError> {
        let request = self
            .request(Method::PUT, &format!("collections/{collection_name}/index"))
            .json(&json!({
                "field_name": field_name,
                "field_schema": "keyword",
            }));
        self.exchange(request, "indexing metadata key").await?;
        tracing::debug!(
            collection = collection_name,
            field = field_name,
            "Payload index ensured"
        );
        Ok(())
    }

    /// Upsert a batch of points.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        points: &[Point],
    ) -> Result<(), QdrantError> {
        if points.is_empty() {
            return Ok(());
        }

        let request = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": points }));
        self.exchange(request, "upserting vectors").await?;
        tracing::debug!(
            collection = collection_name,
            points = points.len(),
            "Points upserted"
        );
        Ok(())
    }

    /// Run a similarity search, returning scored points in index order.
    ///
    /// An empty result set is reported as [`QdrantError::EmptyResponse`].
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        limit: usize,
        filter: Option<Value>,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "with_vector": true,
        });
        if let Some(filter) = filter
            && let Some(object) = body.as_object_mut()
        {
            object.insert("filter".into(), filter);
        }

        let request = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/search"),
            )
            .json(&body);
        let text = self.exchange(request, "querying index").await?;
        let SearchResponse { result } = decode_body(&text)?;

        if result.is_empty() {
            tracing::debug!(collection = collection_name, "Search returned no points");
            return Err(QdrantError::EmptyResponse);
        }

        tracing::debug!(
            collection = collection_name,
            hits = result.len(),
            "Search completed"
        );
        Ok(result)
    }

    /// Fetch one page of points using the scroll API.
    pub async fn scroll_points(
        &self,
        collection_name: &str,
        request: &ScrollRequest,
    ) -> Result<ScrollPage, QdrantError> {
        let mut body = json!({
            "offset": request.offset.clone().unwrap_or(Value::Null),
            "limit": request.limit,
            "with_payload": true,
            "with_vector": request.with_vector,
        });
        if let Some(filter) = &request.filter
            && let Some(object) = body.as_object_mut()
        {
            object.insert("filter".into(), filter.clone());
        }

        let http = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/scroll"),
            )
            .json(&body);
        let text = self.exchange(http, "scrolling points").await?;
        let ScrollResponse { result } = decode_body(&text)?;

        let next_offset = result.next_page_offset.filter(|offset| !offset.is_null());
        let points: Vec<Point> = result.points.into_iter().map(Point::from).collect();
        tracing::debug!(
            collection = collection_name,
            points = points.len(),
            has_next = next_offset.is_some(),
            "Scroll page fetched"
        );

        Ok(ScrollPage {
            points,
            next_offset,
        })
    }

    /// Delete every point matching the filter.
    pub async fn delete_points(
        &self,
        collection_name: &str,
        filter: Value,
    ) -> Result<(), QdrantError> {
        let request = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/delete"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "filter": filter }));
        self.exchange(request, "deleting points").await?;
        tracing::debug!(collection = collection_name, "Points deleted");
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    /// Send a request and return the body text of a 200 response.
    async fn exchange(
        &self,
        request: RequestBuilder,
        task: &'static str,
    ) -> Result<String, QdrantError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK {
            Ok(body)
        } else {
            let error = QdrantError::Api { task, status, body };
            tracing::error!(task, status = %status, error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, QdrantError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse a base URL and strip any trailing slash from its path.
pub(crate) fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::types::PointId;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::Map;

    fn service(server: &MockServer, api_key: Option<&str>) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("rustystore-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: api_key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn create_collection_sends_config_and_api_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo")
                    .header("api-key", "secret")
                    .json_body(json!({
                        "vectors": { "size": 4, "distance": "Cosine" },
                        "on_disk_payload": true,
                        "optimizers_config": { "memmap_threshold": 10000 }
                    }));
                then.status(200).json_body(json!({ "result": true, "status": "ok" }));
            })
            .await;

        service(&server, Some("secret"))
            .create_collection("demo", &CollectionConfig::default().with_vector_size(4))
            .await
            .expect("create");
        mock.assert();
    }

    #[tokio::test]
    async fn ensure_collection_skips_existing() {
        let server = MockServer::start_async().await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(200).json_body(json!({ "result": {}, "status": "ok" }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo");
                then.status(200);
            })
            .await;

        let created = service(&server, None)
            .ensure_collection("demo", &CollectionConfig::default())
            .await
            .expect("ensure");
        assert!(!created);
        probe.assert();
        create.assert_hits(0);
    }

    #[tokio::test]
    async fn ensure_collection_creates_missing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(404).body("Not found");
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;

        let created = service(&server, None)
            .ensure_collection("demo", &CollectionConfig::default())
            .await
            .expect("ensure");
        assert!(created);
        create.assert();
    }

    #[tokio::test]
    async fn non_200_becomes_api_error_with_task_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo/index");
                then.status(400).body("{\"status\":{\"error\":\"bad field\"}}");
            })
            .await;

        let err = service(&server, None)
            .create_payload_index("demo", "metadata.country")
            .await
            .unwrap_err();
        match err {
            QdrantError::Api { task, status, body } => {
                assert_eq!(task, "indexing metadata key");
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("bad field"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_create_collection_reports_task_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo");
                then.status(500).body("boom");
            })
            .await;

        let err = service(&server, None)
            .create_collection("demo", &CollectionConfig::default())
            .await
            .unwrap_err();
        match err {
            QdrantError::Api { task, status, body } => {
                assert_eq!(task, "creating collection");
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_upsert_reports_task_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo/points");
                then.status(500).body("boom");
            })
            .await;

        let points = vec![Point {
            id: PointId::Num(1),
            vector: Some(vec![0.5]),
            payload: Map::new(),
        }];
        let err = service(&server, None)
            .upsert_points("demo", &points)
            .await
            .unwrap_err();
        match err {
            QdrantError::Api { task, status, body } => {
                assert_eq!(task, "upserting vectors");
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_search_reports_task_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/demo/points/search");
                then.status(404).body("collection missing");
            })
            .await;

        let err = service(&server, None)
            .search_points("demo", vec![0.1, 0.2], 3, None)
            .await
            .unwrap_err();
        match err {
            QdrantError::Api { task, status, body } => {
                assert_eq!(task, "querying index");
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "collection missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_existence_check_keeps_response_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/demo");
                then.status(503).body("overloaded");
            })
            .await;

        let err = service(&server, None)
            .collection_exists("demo")
            .await
            .unwrap_err();
        match err {
            QdrantError::Api { task, status, body } => {
                assert_eq!(task, "checking collection");
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_payload_index_declares_keyword_schema() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo/index")
                    .json_body(json!({
                        "field_name": "metadata.country",
                        "field_schema": "keyword"
                    }));
                then.status(200).json_body(json!({ "result": {}, "status": "ok" }));
            })
            .await;

        service(&server, None)
            .create_payload_index("demo", "metadata.country")
            .await
            .expect("index");
        mock.assert();
    }

    #[tokio::test]
    async fn upsert_points_serializes_batch() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo/points")
                    .query_param("wait", "true")
                    .json_body(json!({
                        "points": [
                            {
                                "id": 1,
                                "vector": [0.5, 0.25],
                                "payload": { "page_content": "Tokyo", "metadata": {} }
                            }
                        ]
                    }));
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let mut payload = Map::new();
        payload.insert("page_content".into(), json!("Tokyo"));
        payload.insert("metadata".into(), json!({}));
        let points = vec![Point {
            id: PointId::Num(1),
            vector: Some(vec![0.5, 0.25]),
            payload,
        }];

        service(&server, None)
            .upsert_points("demo", &points)
            .await
            .expect("upsert");
        mock.assert();
    }

    #[tokio::test]
    async fn upsert_points_skips_empty_batch() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/demo/points");
                then.status(200);
            })
            .await;

        service(&server, None)
            .upsert_points("demo", &[])
            .await
            .expect("noop");
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn search_points_emits_expected_request() {
        let server = MockServer::start_async().await;
        let filter = json!({ "must": [{ "key": "metadata.country", "match": { "any": ["Japan"] } }] });
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/search")
                    .json_body(json!({
                        "vector": [0.5, 0.25],
                        "limit": 3,
                        "with_payload": true,
                        "with_vector": true,
                        "filter": { "must": [{ "key": "metadata.country", "match": { "any": ["Japan"] } }] }
                    }));
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.001,
                    "result": [
                        {
                            "id": "memory-1",
                            "version": 3,
                            "score": 0.42,
                            "payload": { "page_content": "Tokyo", "metadata": { "country": "Japan" } },
                            "vector": [0.5, 0.25]
                        }
                    ]
                }));
            })
            .await;

        let results = service(&server, None)
            .search_points("demo", vec![0.5, 0.25], 3, Some(filter))
            .await
            .expect("search");
        mock.assert();

        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, PointId::Uuid("memory-1".into()));
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
        let payload = hit.payload.as_ref().expect("payload");
        assert_eq!(payload["page_content"], json!("Tokyo"));
    }

    #[tokio::test]
    async fn search_points_reports_empty_result() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/demo/points/search");
                then.status(200)
                    .json_body(json!({ "status": "ok", "time": 0.0, "result": [] }));
            })
            .await;

        let err = service(&server, None)
            .search_points("demo", vec![0.1], 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, QdrantError::EmptyResponse));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/demo/points/search");
                then.status(200).body("not json");
            })
            .await;

        let err = service(&server, None)
            .search_points("demo", vec![0.1], 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, QdrantError::Decode(_)));
    }

    #[tokio::test]
    async fn scroll_points_returns_page_and_cursor() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/scroll")
                    .json_body(json!({
                        "offset": null,
                        "limit": 2,
                        "with_payload": true,
                        "with_vector": false
                    }));
                then.status(200).json_body(json!({
                    "status": "ok",
                    "result": {
                        "points": [
                            { "id": 1, "payload": { "page_content": "a" } },
                            { "id": 2, "payload": { "page_content": "b" } }
                        ],
                        "next_page_offset": 3
                    }
                }));
            })
            .await;

        let page = service(&server, None)
            .scroll_points(
                "demo",
                &ScrollRequest {
                    limit: 2,
                    ..ScrollRequest::default()
                },
            )
            .await
            .expect("scroll");
        mock.assert();
        assert_eq!(page.points.len(), 2);
        assert_eq!(page.points[1].id, PointId::Num(2));
        assert_eq!(page.next_offset, Some(json!(3)));
    }

    #[tokio::test]
    async fn delete_points_posts_filter() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/delete")
                    .json_body(json!({ "filter": { "must": [] } }));
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        service(&server, None)
            .delete_points("demo", json!({ "must": [] }))
            .await
            .expect("delete");
        mock.assert();
    }

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:6333/").expect("url"),
            "http://localhost:6333/"
        );
        assert_eq!(
            normalize_base_url("https://example.com/qdrant/").expect("url"),
            "https://example.com/qdrant"
        );
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn format_endpoint_joins_without_double_slash() {
        assert_eq!(
            format_endpoint("http://host:6333/", "/collections/demo"),
            "http://host:6333/collections/demo"
        );
    }
}
