//! HTTP front end for the aggregation pipeline
//!
//! Every request goes through one shared `AggregationService`, so the ranked
//! list, item details and pending fetches are reused across requests for as
//! long as the server runs.

use std::any::Any;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::cli::{CliError, PageRequest};
use crate::data::ItemDetail;
use crate::stories::AggregationService;

/// Route serving pages of top stories
pub const TOP_STORIES_ROUTE: &str = "/api/Stories/GetTopStories";

const DEFAULT_PAGE_SIZE: i64 = 10;

/// Errors returned to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidPage(#[from] CliError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidPage(_) => StatusCode::BAD_REQUEST,
        };

        let payload = Json(json!({"message": self.to_string()}));

        (status, payload).into_response()
    }
}

/// Query string of [`TOP_STORIES_ROUTE`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStoriesParams {
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub search_query: String,
}

fn default_page_number() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Builds the application router around a shared service
pub fn router(service: AggregationService) -> Router {
    Router::new()
        .route(TOP_STORIES_ROUTE, get(top_stories))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn top_stories(
    State(service): State<AggregationService>,
    Query(params): Query<TopStoriesParams>,
) -> Result<Json<Vec<ItemDetail>>, ApiError> {
    let request = PageRequest::new(params.page_number, params.page_size, params.search_query)?;
    let page = service
        .get_top_stories(request.page_number, request.page_size, &request.query)
        .await;
    Ok(Json(page))
}

/// Turns a panic while serving into a 500 with a JSON body
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "request handler panicked");

    let payload = Json(json!({"message": "An unexpected error occurred."}));
    (StatusCode::INTERNAL_SERVER_ERROR, payload).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheManager;
    use crate::config::Settings;
    use crate::data::{ItemId, ListingSource};
    use crate::stories::fake::{dead, story, FakeSource};
    use axum_test::TestServer;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::Arc;

    fn server(source: &Arc<FakeSource>) -> TestServer {
        let source = Arc::clone(source) as Arc<dyn ListingSource>;
        let service = AggregationService::new(source, CacheManager::new(100), &Settings::default());
        TestServer::new(router(service)).expect("Should build test server")
    }

    fn ids(body: &Value) -> Vec<u64> {
        let mut ids: Vec<u64> = body
            .as_array()
            .expect("Body should be an array")
            .iter()
            .filter_map(|item| item["id"].as_u64())
            .collect();
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn test_defaults_serve_first_page() {
        let source = Arc::new(FakeSource::new(
            &[5, 3, 1],
            vec![story(5, "five"), dead(3), story(1, "one")],
        ));
        let server = server(&source);

        let response = server.get(TOP_STORIES_ROUTE).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(ids(&body), vec![1, 5]);
        assert_eq!(body[0]["totalRecords"], 2);
    }

    #[tokio::test]
    async fn test_query_parameters_page_and_filter() {
        let items = vec![
            story(4, "Rust a"),
            story(3, "Go b"),
            story(2, "rust c"),
            story(1, "RUST d"),
        ];
        let source = Arc::new(FakeSource::new(&[4, 3, 2, 1], items));
        let server = server(&source);

        let response = server
            .get(TOP_STORIES_ROUTE)
            .add_query_param("pageNumber", 2)
            .add_query_param("pageSize", 2)
            .add_query_param("searchQuery", "rust")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["totalRecords"], 3);
    }

    #[tokio::test]
    async fn test_non_positive_page_is_bad_request() {
        let source = Arc::new(FakeSource::new(&[1], vec![story(1, "one")]));
        let server = server(&source);

        for (page_number, page_size) in [(0, 10), (1, 0), (-3, 5)] {
            let response = server
                .get(TOP_STORIES_ROUTE)
                .add_query_param("pageNumber", page_number)
                .add_query_param("pageSize", page_size)
                .await;

            response.assert_status(StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert_eq!(body["message"], "Page number and page size must be greater than 0.");
        }
        assert_eq!(source.ranked_calls(), 0, "Rejected requests must not reach the pipeline");
    }

    #[tokio::test]
    async fn test_requests_share_one_cache() {
        let source = Arc::new(FakeSource::new(&[2, 1], vec![story(2, "two"), story(1, "one")]));
        let server = server(&source);

        server.get(TOP_STORIES_ROUTE).await.assert_status_ok();
        server.get(TOP_STORIES_ROUTE).await.assert_status_ok();

        assert_eq!(source.ranked_calls(), 1);
        assert_eq!(source.total_item_calls(), 2);
    }

    struct BrokenSource;

    #[async_trait::async_trait]
    impl ListingSource for BrokenSource {
        async fn fetch_ranked_ids(&self) -> Vec<ItemId> {
            panic!("ranking unavailable")
        }

        async fn fetch_item(&self, id: ItemId) -> ItemDetail {
            ItemDetail::placeholder(id)
        }
    }

    #[tokio::test]
    async fn test_handler_panic_is_internal_server_error() {
        let source: Arc<dyn ListingSource> = Arc::new(BrokenSource);
        let service = AggregationService::new(source, CacheManager::new(100), &Settings::default());
        let server = TestServer::new(router(service)).expect("Should build test server");

        let response = server.get(TOP_STORIES_ROUTE).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["message"], "An unexpected error occurred.");
    }

    #[test]
    fn test_panic_response_from_string_payload() {
        let response = panic_response(Box::new(String::from("boom")));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
