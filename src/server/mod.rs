//! HTTP surface over the [`QueryService`].
//!
//! | Route          | Success                      | Errors          |
//! |----------------|------------------------------|-----------------|
//! | `GET /`        | `{"categories": [...]}`      | 503             |
//! | `GET /:name`   | `{"torrents": [...]}`        | 400, 503        |
//! | anything else  |                              | 404             |
//!
//! Other methods on `/` and `/:name` are unmatched routes too (404, not 405).
//!
//! Handler panics become a 500 that only names the administrator contact.

mod error;

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::Result;
use crate::models::Torrent;
use crate::query::QueryService;

pub use error::{ApiError, ApiErrorBody};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    queries: QueryService,
    admin_email: Arc<str>,
}

impl AppState {
    pub fn new(queries: QueryService, admin_email: impl Into<Arc<str>>) -> Self {
        Self {
            queries,
            admin_email: admin_email.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CategoriesResponse {
    categories: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TorrentsResponse {
    torrents: Vec<Torrent>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    with_error_handling(routes(), &state.admin_email).with_state(state)
}

/// Serve `router(state)` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).fallback(not_found))
        .route("/:category", get(list_torrents).fallback(not_found))
}

fn with_error_handling(routes: Router<AppState>, admin_email: &str) -> Router<AppState> {
    let admin_email = admin_email.to_string();
    routes
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| -> Response {
                let detail = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic");
                log::error!("Request handler panicked: {}", detail);
                ApiError::internal(&admin_email).into_response()
            },
        ))
}

async fn list_categories(
    State(state): State<AppState>,
) -> std::result::Result<Json<CategoriesResponse>, ApiError> {
    let categories = state.queries.list_categories()?;
    Ok(Json(CategoriesResponse { categories }))
}

async fn list_torrents(
    State(state): State<AppState>,
    category: std::result::Result<Path<String>, PathRejection>,
) -> std::result::Result<Json<TorrentsResponse>, ApiError> {
    // A segment that does not decode to UTF-8 cannot name a category.
    let Path(category) = category.map_err(|e| {
        log::debug!("Rejected category path: {}", e);
        ApiError::invalid_category()
    })?;
    let torrents = state.queries.list_items(&category)?;
    Ok(Json(TorrentsResponse { torrents }))
}

async fn not_found() -> ApiError {
    ApiError::no_endpoint()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;
    use tokio::sync::oneshot;

    use super::*;
    use crate::models::CategoryIndex;
    use crate::store::IndexStore;

    const ADMIN: &str = "ops@example.org";

    struct TestServer {
        base: String,
        shutdown: Option<oneshot::Sender<()>>,
    }

    impl TestServer {
        async fn start(app: Router) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (tx, rx) = oneshot::channel::<()>();
            tokio::spawn(async move {
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = rx.await;
                    })
                    .await;
            });
            Self {
                base: format!("http://{addr}"),
                shutdown: Some(tx),
            }
        }

        async fn get(&self, path: &str) -> (StatusCode, Value) {
            self.request(reqwest::Method::GET, path).await
        }

        async fn request(&self, method: reqwest::Method, path: &str) -> (StatusCode, Value) {
            let response = reqwest::Client::new()
                .request(method, format!("{}{}", self.base, path))
                .send()
                .await
                .unwrap();
            let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
            (status, response.json().await.unwrap())
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }

    fn state_with(store: &Arc<IndexStore>) -> AppState {
        AppState::new(QueryService::new(Arc::clone(store)), ADMIN)
    }

    fn published_store() -> Arc<IndexStore> {
        let store = Arc::new(IndexStore::new());
        store.publish(CategoryIndex::from_categories([
            ("movies", vec![Torrent::named("a"), Torrent::named("b")]),
            ("music", vec![]),
        ]));
        store
    }

    #[tokio::test]
    async fn root_is_unavailable_before_first_publish() {
        let store = Arc::new(IndexStore::new());
        let server = TestServer::start(router(state_with(&store))).await;

        let (status, body) = server.get("/").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("rebuilding"));

        let (status, _) = server.get("/movies").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn root_lists_categories_in_order() {
        let server = TestServer::start(router(state_with(&published_store()))).await;

        let (status, body) = server.get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "categories": ["movies", "music"] }));
    }

    #[tokio::test]
    async fn category_lists_torrents() {
        let server = TestServer::start(router(state_with(&published_store()))).await;

        let (status, body) = server.get("/movies").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body["torrents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        let (status, body) = server.get("/music").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "torrents": [] }));
    }

    #[tokio::test]
    async fn unknown_category_is_bad_request() {
        let server = TestServer::start(router(state_with(&published_store()))).await;

        let (status, body) = server.get("/books").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid categoryName"));
    }

    #[tokio::test]
    async fn unmatched_route_is_not_found() {
        let server = TestServer::start(router(state_with(&published_store()))).await;

        let (status, body) = server.get("/movies/extra").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "error": "API endpoint does not exist." }));
    }

    #[tokio::test]
    async fn other_methods_are_not_found() {
        let server = TestServer::start(router(state_with(&published_store()))).await;
        let expected = serde_json::json!({ "error": "API endpoint does not exist." });

        let (status, body) = server.request(reqwest::Method::POST, "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, expected);

        let (status, body) = server.request(reqwest::Method::DELETE, "/movies").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn undecodable_category_is_bad_request() {
        let server = TestServer::start(router(state_with(&published_store()))).await;

        let (status, body) = server.get("/%FF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid categoryName"));
    }

    #[tokio::test]
    async fn handler_panic_is_internal_error_with_contact() {
        let store = published_store();
        async fn explode() -> &'static str {
            panic!("index slot poisoned at 0xdeadbeef")
        }
        let routes = routes().route("/panic/now", get(explode));
        let app = with_error_handling(routes, ADMIN).with_state(state_with(&store));
        let server = TestServer::start(app).await;

        let (status, body) = server.get("/panic/now").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains(ADMIN));
        assert!(!message.contains("0xdeadbeef"));

        // The failing request leaves the published index alone.
        let (status, _) = server.get("/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state_with(&published_store()), async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server did not stop");
        assert!(result.unwrap().is_ok());
    }
}
