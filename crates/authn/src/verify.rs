//! Access/refresh verification state machine.
//!
//! ```text
//!            access valid
//!   ┌──────────────────────────────► Accepted { principal }
//!   │
//! start
//!   │  access absent / malformed / forged / expired
//!   └──► refresh valid ─────────────► Renewed { principal, tokens }
//!          │
//!          └── otherwise ───────────► Rejected
//! ```
//!
//! Every token failure collapses into the next step; callers only ever see
//! the three outcomes. There is no token-type claim, so a still-valid access
//! token presented as the refresh token also renews.

use chrono::{DateTime, Utc};

use crate::issuer::{TokenIssuer, TokenPair};

/// Outcome of verifying a request's tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The access token is valid. Nothing was reissued.
    Accepted {
        /// Issuer of the access token.
        principal: String,
    },
    /// The access token was unusable but the refresh token was valid; a new
    /// pair replaces both.
    Renewed {
        /// Issuer of the refresh token.
        principal: String,
        /// The replacement pair.
        tokens: TokenPair,
    },
    /// Neither token was usable.
    Rejected,
}

impl Verdict {
    /// The authenticated principal, unless rejected.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        match self {
            Self::Accepted { principal } | Self::Renewed { principal, .. } => Some(principal),
            Self::Rejected => None,
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Renewed { .. } => "renewed",
            Self::Rejected => "rejected",
        }
    }
}

/// Classifies presented tokens and renews sessions.
#[derive(Clone, Debug)]
pub struct SessionVerifier {
    issuer: TokenIssuer,
}

impl SessionVerifier {
    /// Creates a verifier that renews through `issuer`.
    #[must_use]
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }

    /// The issuer used for renewals.
    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Verifies tokens against the current time.
    #[must_use]
    pub fn verify(&self, access: Option<&str>, refresh: Option<&str>) -> Verdict {
        self.verify_at(access, refresh, Utc::now())
    }

    /// Verifies tokens as of `now`. Renewed pairs are issued at `now`.
    #[must_use]
    pub fn verify_at(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Verdict {
        let codec = self.issuer.codec();

        if let Some(token) = access {
            match codec.decode_at(token, now) {
                Ok(claims) => return Verdict::Accepted { principal: claims.iss },
                Err(e) => tracing::debug!(error = %e, "access token unusable"),
            }
        }

        let Some(token) = refresh else {
            return Verdict::Rejected;
        };
        let claims = match codec.decode_at(token, now) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "refresh token unusable");
                return Verdict::Rejected;
            },
        };

        match self.issuer.issue_pair_at(&claims.iss, now) {
            Ok(tokens) => Verdict::Renewed { principal: claims.iss, tokens },
            Err(e) => {
                tracing::error!(error = %e, "failed to issue renewed token pair");
                Verdict::Rejected
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use rstest::rstest;

    use super::*;
    use crate::{
        jwt::TokenCodec,
        testutil::{test_issuer, tamper_segment},
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn verifier() -> SessionVerifier {
        SessionVerifier::new(test_issuer())
    }

    #[test]
    fn test_fresh_access_accepted() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();

        let verdict = verifier.verify_at(Some(&pair.access_token), None, t0());
        assert_eq!(verdict, Verdict::Accepted { principal: "email1".into() });
        assert_eq!(verdict.outcome(), "accepted");
    }

    #[test]
    fn test_fresh_access_wins_over_refresh() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();

        let verdict =
            verifier.verify_at(Some(&pair.access_token), Some(&pair.refresh_token), t0());
        assert!(matches!(verdict, Verdict::Accepted { .. }));
    }

    #[test]
    fn test_expired_access_with_fresh_refresh_renews() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();
        let later = t0() + TimeDelta::minutes(5);

        let verdict =
            verifier.verify_at(Some(&pair.access_token), Some(&pair.refresh_token), later);
        let Verdict::Renewed { principal, tokens } = verdict else {
            panic!("expected renewal, got {verdict:?}");
        };
        assert_eq!(principal, "email1");
        assert_eq!(tokens.issued_at, later);
        assert!(tokens.issued_at > pair.issued_at);

        let codec = verifier.issuer().codec();
        let access = codec.decode_at(&tokens.access_token, later).unwrap();
        let refresh = codec.decode_at(&tokens.refresh_token, later).unwrap();
        assert_eq!(access.iss, "email1");
        assert_eq!(access.iat, refresh.iat);
        assert_eq!(access.exp, access.iat + 60);
    }

    #[rstest]
    #[case::absent(None)]
    #[case::garbage(Some("not-a-token"))]
    #[case::empty(Some(""))]
    fn test_unusable_access_falls_through_to_refresh(#[case] access: Option<&str>) {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();

        let verdict = verifier.verify_at(access, Some(&pair.refresh_token), t0());
        assert_eq!(verdict.principal(), Some("email1"));
        assert_eq!(verdict.outcome(), "renewed");
    }

    #[test]
    fn test_forged_access_falls_through_to_refresh() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();
        let forged = tamper_segment(&pair.access_token, 1);

        let verdict = verifier.verify_at(Some(&forged), Some(&pair.refresh_token), t0());
        assert!(matches!(verdict, Verdict::Renewed { .. }));
    }

    #[test]
    fn test_both_expired_rejected() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();
        let much_later = t0() + TimeDelta::hours(2);

        let verdict =
            verifier.verify_at(Some(&pair.access_token), Some(&pair.refresh_token), much_later);
        assert_eq!(verdict, Verdict::Rejected);
        assert_eq!(verdict.principal(), None);
    }

    #[test]
    fn test_refresh_expiry_is_exclusive() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();

        let before = t0() + TimeDelta::seconds(3599);
        assert!(matches!(
            verifier.verify_at(None, Some(&pair.refresh_token), before),
            Verdict::Renewed { .. }
        ));

        let at = t0() + TimeDelta::seconds(3600);
        assert_eq!(verifier.verify_at(None, Some(&pair.refresh_token), at), Verdict::Rejected);
    }

    #[test]
    fn test_both_absent_rejected() {
        assert_eq!(verifier().verify_at(None, None, t0()), Verdict::Rejected);
    }

    #[test]
    fn test_pair_from_other_secret_rejected() {
        let foreign = TokenIssuer::new(TokenCodec::new(b"someone else's secret").unwrap());
        let pair = foreign.issue_pair_at("email1", t0()).unwrap();

        let verdict =
            verifier().verify_at(Some(&pair.access_token), Some(&pair.refresh_token), t0());
        assert_eq!(verdict, Verdict::Rejected);
    }

    #[test]
    fn test_forged_refresh_rejected() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();
        let forged = tamper_segment(&pair.refresh_token, 2);

        assert_eq!(verifier.verify_at(None, Some(&forged), t0()), Verdict::Rejected);
    }

    #[test]
    fn test_valid_access_in_refresh_slot_renews() {
        let verifier = verifier();
        let pair = verifier.issuer().issue_pair_at("email1", t0()).unwrap();

        let verdict = verifier.verify_at(None, Some(&pair.access_token), t0());
        assert!(matches!(verdict, Verdict::Renewed { .. }));
    }
}
