use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{decode_principal, Principal};
use crate::error::ApiError;

/// Decodes the bearer token, if any, into a [`Principal`] request extension.
///
/// Requests without an `Authorization` header pass through anonymously; the
/// permission evaluator denies them where it matters. A header that is present
/// but malformed or carries an invalid token is rejected with 401.
pub async fn principal_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_bearer_token(request.headers())? {
        let principal = decode_principal(&token, &state.config.security.jwt_secret)?;
        tracing::debug!(
            "Authenticated '{}' with role {}",
            principal.username,
            principal.raw_role
        );
        request.extensions_mut().insert(principal);
    }

    Ok(next.run(request).await)
}

/// Principal attached by [`principal_middleware`], if the request carried one
pub fn request_principal(request: &Request) -> Option<&Principal> {
    request.extensions().get::<Principal>()
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        Some(_) => Err(ApiError::unauthorized("Empty JWT token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(
            extract_bearer_token(&headers).unwrap().as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn other_schemes_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic a2ltOnB3"));
        let err = extract_bearer_token(&headers).unwrap_err();
        assert_eq!(err.status_code(), 401);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer_token(&headers).is_err());
    }
}
