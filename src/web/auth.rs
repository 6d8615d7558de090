// Bearer token check for the admission endpoint.
//
// Callers send `Authorization: Bearer <EMIT_LABEL_KEY>`. The scheme is
// case-sensitive and the token must match exactly; anything else is a 403.

use axum::http::{header, HeaderMap};

pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from the Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// True when the request carries a bearer token equal to `expected`.
pub fn is_authorized(headers: &HeaderMap, expected: &str) -> bool {
    match bearer_token(headers) {
        Some(token) => !expected.is_empty() && constant_time_eq(token, expected),
        None => false,
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn accepts_matching_token() {
        assert!(is_authorized(&headers_with("Bearer s3cret"), "s3cret"));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(!is_authorized(&HeaderMap::new(), "s3cret"));
    }

    #[test]
    fn rejects_wrong_token() {
        assert!(!is_authorized(&headers_with("Bearer wrongtoken"), "s3cret"));
        assert!(!is_authorized(&headers_with("Bearer s3cre"), "s3cret"));
        assert!(!is_authorized(&headers_with("Bearer s3cret "), "s3cret"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(!is_authorized(&headers_with("Basic s3cret"), "s3cret"));
        assert!(!is_authorized(&headers_with("bearer s3cret"), "s3cret"));
        assert!(!is_authorized(&headers_with("s3cret"), "s3cret"));
        assert!(!is_authorized(&headers_with("Bearer"), "s3cret"));
    }

    #[test]
    fn empty_expected_key_never_matches() {
        assert!(!is_authorized(&headers_with("Bearer "), ""));
    }

    #[test]
    fn bearer_token_extracts_remainder() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Token abc")), None);
    }
}
