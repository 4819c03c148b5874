//! Token cookies.
//!
//! Both tokens travel as `HttpOnly` cookies scoped to `/`. A cookie's
//! `Max-Age` matches its token's lifetime, so the browser drops it when the
//! token would be rejected anyway.

use axum::http::{HeaderMap, HeaderValue, header};
use keyward_authn::TokenPair;

/// Name of the access token cookie.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Returns the value of cookie `name` from the request's `Cookie` headers.
///
/// Empty values are treated as absent.
#[must_use]
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Builds a `Set-Cookie` value for one token.
fn token_cookie(name: &str, token: &str, max_age_secs: i64, secure: bool) -> Option<HeaderValue> {
    let mut cookie =
        format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", max_age_secs.max(0));
    if secure {
        cookie.push_str("; Secure");
    }
    // Token strings are base64url with dots, always a valid header value.
    HeaderValue::from_str(&cookie).ok()
}

/// The two `Set-Cookie` values carrying a freshly issued pair.
///
/// Returns `None` if either value cannot be represented as a header.
#[must_use]
pub fn pair_cookies(pair: &TokenPair, secure: bool) -> Option<[HeaderValue; 2]> {
    let access_age = (pair.access_expires_at - pair.issued_at).num_seconds();
    let refresh_age = (pair.refresh_expires_at - pair.issued_at).num_seconds();
    Some([
        token_cookie(ACCESS_COOKIE_NAME, &pair.access_token, access_age, secure)?,
        token_cookie(REFRESH_COOKIE_NAME, &pair.refresh_token, refresh_age, secure)?,
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use keyward_authn::testutil::test_issuer;

    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn test_get_cookie_from_single_header() {
        let headers = headers(&["theme=dark; access_token=abc.def.ghi; refresh_token=xyz"]);
        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), Some("abc.def.ghi"));
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("xyz"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_get_cookie_across_multiple_headers() {
        let headers = headers(&["access_token=a", "refresh_token=r"]);
        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), Some("a"));
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("r"));
    }

    #[test]
    fn test_get_cookie_empty_value_is_absent() {
        let headers = headers(&["access_token=; refresh_token=r"]);
        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), None);
    }

    #[test]
    fn test_get_cookie_matches_whole_name() {
        let headers = headers(&["xaccess_token=a"]);
        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), None);
    }

    #[test]
    fn test_pair_cookies_attributes() {
        let pair = test_issuer().issue_pair("email1").unwrap();
        let [access, refresh] = pair_cookies(&pair, false).unwrap();
        let access = access.to_str().unwrap();
        let refresh = refresh.to_str().unwrap();

        assert!(access.starts_with(&format!("access_token={}", pair.access_token)));
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("Path=/"));
        assert!(access.contains("Max-Age=60"));
        assert!(!access.contains("Secure"));
        assert!(refresh.starts_with(&format!("refresh_token={}", pair.refresh_token)));
        assert!(refresh.contains("Max-Age=3600"));
    }

    #[test]
    fn test_pair_cookies_secure_flag() {
        let pair = test_issuer().issue_pair("email1").unwrap();
        let [access, refresh] = pair_cookies(&pair, true).unwrap();
        assert!(access.to_str().unwrap().ends_with("; Secure"));
        assert!(refresh.to_str().unwrap().ends_with("; Secure"));
    }
}
