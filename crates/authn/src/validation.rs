//! Token algorithm pinning.
//!
//! Tokens are signed and verified with HS256 only. The `alg` header is never
//! used to choose a verification algorithm; it is checked against the pinned
//! value after the signature has been verified with that value.

use jsonwebtoken::Algorithm;

use crate::error::AuthError;

/// The one algorithm used to sign and verify tokens.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms refused outright, whatever else is configured.
///
/// - `none`: no signature at all
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none"];

/// Header `alg` values accepted on decode.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["HS256"];

/// Checks a token header's `alg` against the pinned algorithm.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if `alg` is forbidden or is not
/// in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use keyward_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("HS256").is_ok());
/// assert!(validate_algorithm("none").is_err());
/// assert!(validate_algorithm("HS512").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.iter().any(|f| f.eq_ignore_ascii_case(alg)) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not in accepted list (only HS256 is supported)"
        )));
    }

    Ok(())
}
