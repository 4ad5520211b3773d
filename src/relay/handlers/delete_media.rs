use super::{error_response, ErrorBody};
use crate::relay::MediaAdmin;
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMediaRequest {
    pub public_id: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct DeleteMediaResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub result: Value,
}

#[utoipa::path(
    post,
    path = "/api/delete-cloudinary-file",
    request_body = DeleteMediaRequest,
    responses (
        (status = 200, description = "Asset destroyed", body = DeleteMediaResponse),
        (status = 400, description = "Missing publicId or malformed body", body = ErrorBody),
        (status = 405, description = "Only POST is allowed", body = ErrorBody),
        (status = 500, description = "The media host refused the delete", body = ErrorBody),
    ),
    tag = "media",
)]
/// Destroy an uploaded asset by public id.
///
/// The body is parsed by hand so a malformed payload gets the same JSON error
/// shape as every other failure.
#[instrument(skip(admin, body))]
pub async fn delete_media(admin: Extension<Arc<dyn MediaAdmin>>, body: Bytes) -> Response {
    let request: DeleteMediaRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            info!("Invalid delete request body: {err}");
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let Some(public_id) = request
        .public_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "Missing publicId");
    };

    match admin.destroy(public_id).await {
        Ok(result) => {
            info!(public_id, "media deleted");
            (
                StatusCode::OK,
                Json(DeleteMediaResponse {
                    success: true,
                    result,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Cloudinary delete error: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete file from Cloudinary",
            )
        }
    }
}

/// Any method other than POST on the delete route.
pub async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}
