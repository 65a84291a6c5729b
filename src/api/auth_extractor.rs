use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::model::UserContext;
use crate::store::traits::Store;

/// Caller identity resolved from the `Authorization: Bearer` header.
///
/// The raw token is kept so that collab membership can be checked on the
/// caller's behalf.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: UserContext,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<AppState<S>> for AuthenticatedUser
where
    S: Store + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            ApiError::Unauthorized("Missing bearer token in Authorization header".to_string())
        })?;

        match state.identity.user_info(&token).await? {
            Some(user) => Ok(AuthenticatedUser { user, token }),
            None => Err(ApiError::Unauthorized(
                "Invalid or expired token".to_string(),
            )),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  xyz "));
        assert_eq!(extract_bearer_token(&headers), Some("xyz".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
