use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use crate::model::UserContext;

/// Axum extractor for the calling learner
///
/// Identity comes from headers set by the fronting proxy:
/// - X-User-Id: learner identifier
/// - X-User-Email: optional email
/// - X-User-Name: optional display name
///
/// Without an X-User-Id header the request runs as the local development user.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        match extract_header_value(headers, "x-user-id") {
            Some(user_id) => Ok(UserContext::with_details(
                user_id,
                extract_header_value(headers, "x-user-email"),
                extract_header_value(headers, "x-user-name"),
            )),
            None => Ok(UserContext::default_user()),
        }
    }
}

/// Trimmed, non-empty header value
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, Request};

    #[test]
    fn test_extract_header_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static(" learner-42 "),
        );
        headers.insert(
            HeaderName::from_static("x-user-name"),
            HeaderValue::from_static("   "),
        );

        assert_eq!(
            extract_header_value(&headers, "x-user-id"),
            Some("learner-42".to_string())
        );
        assert_eq!(extract_header_value(&headers, "x-user-name"), None);
        assert_eq!(extract_header_value(&headers, "x-user-email"), None);
    }

    #[tokio::test]
    async fn test_missing_headers_fall_back_to_dev_user() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let ctx = UserContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx, UserContext::default_user());
    }

    #[tokio::test]
    async fn test_headers_build_context() {
        let (mut parts, _) = Request::builder()
            .header("x-user-id", "learner-7")
            .header("x-user-email", "ada@example.com")
            .body(())
            .unwrap()
            .into_parts();
        let ctx = UserContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.user_id, "learner-7");
        assert_eq!(ctx.user_email.as_deref(), Some("ada@example.com"));
        assert_eq!(ctx.user_name, None);
    }
}
