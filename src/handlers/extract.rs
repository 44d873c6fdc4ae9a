//! Request extractors that reject with `CommunityError`
//!
//! axum's own extractors answer malformed input with plain-text bodies.
//! These wrappers keep every client error in the `{success, error, message}`
//! shape.

use axum::extract::{FromRequest, FromRequestParts};

use crate::utils::errors::CommunityError;

/// JSON request body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(CommunityError))]
pub struct AppJson<T>(pub T);

/// Path parameters
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CommunityError))]
pub struct AppPath<T>(pub T);

/// Query string
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CommunityError))]
pub struct AppQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::IntoResponse;
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, Deserialize)]
    struct Login {
        identifier: String,
    }

    async fn body_json(error: CommunityError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_invalid_input() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();

        let rejection = match AppJson::<Login>::from_request(request, &()).await {
            Ok(_) => panic!("malformed body was accepted"),
            Err(rejection) => rejection,
        };
        let (status, body) = body_json(rejection).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], Value::Bool(false));
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_invalid_input() {
        let request = Request::builder()
            .body(Body::from(r#"{"identifier":"a@b.org"}"#))
            .unwrap();

        let result = AppJson::<Login>::from_request(request, &()).await;
        assert!(matches!(result, Err(CommunityError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_well_formed_json_is_extracted() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"identifier":"a@b.org"}"#))
            .unwrap();

        let AppJson(login) = match AppJson::<Login>::from_request(request, &()).await {
            Ok(login) => login,
            Err(err) => panic!("unexpected rejection: {}", err),
        };
        assert_eq!(login.identifier, "a@b.org");
    }

    #[tokio::test]
    async fn test_bad_query_is_invalid_input() {
        #[derive(Debug, Deserialize)]
        struct Paging {
            #[allow(dead_code)]
            page: u32,
        }

        let (mut parts, _) = Request::builder()
            .uri("/api/users?page=abc")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let result = AppQuery::<Paging>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(CommunityError::InvalidInput(_))));
    }
}
