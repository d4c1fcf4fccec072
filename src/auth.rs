use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::error::AppError;

/// Proof that the request carried `Authorization: Bearer <service token>`.
///
/// Add it as a handler argument to protect a write route.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAuth;

/// Check a raw `Authorization` header value against the expected token.
pub fn bearer_matches(header: Option<&str>, expected: &str) -> bool {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .is_some_and(|token| !token.is_empty() && token == expected)
}

impl FromRequestParts<AppState> for ServiceAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        if bearer_matches(header, &state.service_token) {
            Ok(ServiceAuth)
        } else {
            Err(AppError::Auth("Invalid service token".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_matches() {
        assert!(bearer_matches(Some("Bearer secret"), "secret"));
        assert!(!bearer_matches(Some("Bearer wrong"), "secret"));
        assert!(!bearer_matches(Some("secret"), "secret"));
        assert!(!bearer_matches(Some("Basic secret"), "secret"));
        assert!(!bearer_matches(None, "secret"));
    }

    #[test]
    fn test_empty_token_never_matches() {
        assert!(!bearer_matches(Some("Bearer "), ""));
    }
}
