//! Media delete relay.
//!
//! Clients upload with an unsigned preset, but destroying an asset needs the
//! CDN API secret. This small HTTP service holds that secret and exposes a
//! single delete endpoint.

pub mod cloudinary_admin;
mod handlers;
pub mod openapi;

pub use cloudinary_admin::{CloudinaryAdmin, MediaAdmin};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

/// Path of the delete endpoint, shared with the client.
pub const DELETE_MEDIA_PATH: &str = "/api/delete-cloudinary-file";

/// Builds the relay router around `admin`.
pub fn router(admin: Arc<dyn MediaAdmin>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::openapi()))
        .route("/health", get(handlers::health).options(handlers::health))
        .route(
            DELETE_MEDIA_PATH,
            post(handlers::delete_media).fallback(handlers::method_not_allowed),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(admin)),
        )
}

/// Serves the relay on `port` until ctrl-c.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(port: u16, admin: Arc<dyn MediaAdmin>) -> Result<()> {
    let app = router(admin);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method, path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::UploadError, BoxFuture};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingAdmin {
        fail: bool,
        destroyed: Mutex<Vec<String>>,
    }

    impl MediaAdmin for RecordingAdmin {
        fn destroy<'a>(&'a self, public_id: &'a str) -> BoxFuture<'a, Result<Value, UploadError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(UploadError::Rejected {
                        status: 401,
                        message: "Invalid Signature".to_string(),
                    });
                }
                self.destroyed
                    .lock()
                    .map_err(|_| UploadError::InvalidResponse("poisoned".to_string()))?
                    .push(public_id.to_string());
                let mut deleted = serde_json::Map::new();
                deleted.insert(public_id.to_string(), json!("deleted"));
                Ok(json!({ "deleted": deleted }))
            })
        }
    }

    async fn call(
        admin: Arc<RecordingAdmin>,
        method: Method,
        uri: &str,
        body: &str,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = router(admin).oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, value)
    }

    #[tokio::test]
    async fn delete_destroys_asset() {
        let admin = Arc::new(RecordingAdmin::default());
        let (status, headers, body) = call(
            admin.clone(),
            Method::POST,
            DELETE_MEDIA_PATH,
            r#"{"publicId":"folder/cat"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["result"]["deleted"]["folder/cat"], json!("deleted"));
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(
            *admin.destroyed.lock().expect("lock"),
            vec!["folder/cat".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_or_blank_public_id_is_bad_request() {
        for body in [r"{}", r#"{"publicId":""}"#, r#"{"publicId":"   "}"#, r#"{"publicId":null}"#] {
            let admin = Arc::new(RecordingAdmin::default());
            let (status, _, value) = call(admin.clone(), Method::POST, DELETE_MEDIA_PATH, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(value, json!({ "error": "Missing publicId" }));
            assert!(admin.destroyed.lock().expect("lock").is_empty());
        }
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let admin = Arc::new(RecordingAdmin::default());
        let (status, _, value) = call(admin, Method::POST, DELETE_MEDIA_PATH, "publicId=cat").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value, json!({ "error": "Invalid JSON body" }));
    }

    #[tokio::test]
    async fn host_failure_is_server_error() {
        let admin = Arc::new(RecordingAdmin {
            fail: true,
            ..RecordingAdmin::default()
        });
        let (status, _, value) =
            call(admin, Method::POST, DELETE_MEDIA_PATH, r#"{"publicId":"cat"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value, json!({ "error": "Failed to delete file from Cloudinary" }));
    }

    #[tokio::test]
    async fn other_methods_are_rejected() {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let admin = Arc::new(RecordingAdmin::default());
            let (status, _, value) = call(admin, method, DELETE_MEDIA_PATH, "").await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(value, json!({ "error": "Method Not Allowed" }));
        }
    }

    #[tokio::test]
    async fn health_reports_build() {
        let admin = Arc::new(RecordingAdmin::default());
        let (status, headers, body) = call(admin, Method::GET, "/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], json!(env!("CARGO_PKG_NAME")));
        assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
        assert!(headers.contains_key("X-App"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let admin = Arc::new(RecordingAdmin::default());
        let (status, _, body) = call(admin, Method::GET, "/api-docs/openapi.json", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"][DELETE_MEDIA_PATH].is_object());
    }
}
