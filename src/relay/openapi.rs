use super::handlers::{
    self,
    delete_media::{DeleteMediaRequest, DeleteMediaResponse},
    health::Health,
    ErrorBody,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health::health, handlers::delete_media::delete_media),
    components(schemas(Health, DeleteMediaRequest, DeleteMediaResponse, ErrorBody)),
    tags(
        (name = "health", description = "Service status"),
        (name = "media", description = "Privileged media operations"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/delete-cloudinary-file"));
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
    }
}
