use crate::model::ActorContext;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

/// Axum extractor for ActorContext from request headers
///
/// The surrounding system authenticates the user and forwards the resolved
/// identity in headers:
/// - X-User-Id: acting user identifier
/// - X-User-Email: optional email
/// - X-User-Name: optional display name
///
/// Without an X-User-Id header a development fallback actor is used.
#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        if let Some(user_id) = extract_header_value(headers, "x-user-id") {
            let user_email = extract_header_value(headers, "x-user-email");
            let user_name = extract_header_value(headers, "x-user-name");
            Ok(ActorContext::with_details(user_id, user_email, user_name))
        } else {
            Ok(ActorContext::default_user())
        }
    }
}

fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    #[test]
    fn header_values_are_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static("teacher-42"),
        );
        headers.insert(
            HeaderName::from_static("x-user-email"),
            HeaderValue::from_static("teacher@example.org"),
        );

        assert_eq!(
            extract_header_value(&headers, "x-user-id"),
            Some("teacher-42".to_string())
        );
        assert_eq!(
            extract_header_value(&headers, "x-user-email"),
            Some("teacher@example.org".to_string())
        );
        assert_eq!(extract_header_value(&headers, "x-user-name"), None);
    }
}
