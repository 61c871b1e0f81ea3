//! HTTP Basic authentication for the collector endpoint.
//!
//! The username compares as plain text. The password compares through the
//! configured verifier: plain equality, or bcrypt for hashed credentials
//! (constant-time inside the bcrypt check; the plaintext path is not, which
//! mirrors the behaviour this aggregator is compatible with).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

/// How the configured collector password is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordVerifier {
    Plain(String),
    Bcrypt(String),
}

/// Rejections carry the attempted username for the warn log; the password is
/// never surfaced anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("malformed Authorization header")]
    MalformedHeader,
    #[error("invalid credentials for user {username:?}")]
    BadCredentials { username: String },
}

/// Configured collector credentials.
#[derive(Debug, Clone)]
pub struct CollectorAuth {
    username: String,
    verifier: PasswordVerifier,
}

impl CollectorAuth {
    pub fn new(username: impl Into<String>, verifier: PasswordVerifier) -> Self {
        Self {
            username: username.into(),
            verifier,
        }
    }

    /// Check a raw `Authorization` header value.
    pub fn authorize(&self, header: Option<&str>) -> Result<(), AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let encoded = header
            .strip_prefix("Basic ")
            .ok_or(AuthError::MalformedHeader)?;
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|_| AuthError::MalformedHeader)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MalformedHeader)?;

        if username == self.username && self.verify_password(password) {
            Ok(())
        } else {
            Err(AuthError::BadCredentials {
                username: username.to_owned(),
            })
        }
    }

    fn verify_password(&self, attempt: &str) -> bool {
        match &self.verifier {
            PasswordVerifier::Plain(expected) => attempt == expected,
            PasswordVerifier::Bcrypt(hash) => bcrypt::verify(attempt, hash).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{user}:{password}")))
    }

    fn plain_auth() -> CollectorAuth {
        CollectorAuth::new("monit", PasswordVerifier::Plain("monit".to_owned()))
    }

    #[test]
    fn accepts_the_configured_pair() {
        assert_eq!(plain_auth().authorize(Some(&basic("monit", "monit"))), Ok(()));
    }

    #[rstest]
    #[case::wrong_password(basic("monit", "nope"))]
    #[case::wrong_user(basic("other", "monit"))]
    fn rejects_bad_credentials(#[case] header: String) {
        assert!(matches!(
            plain_auth().authorize(Some(&header)),
            Err(AuthError::BadCredentials { .. })
        ));
    }

    #[test]
    fn rejection_names_the_attempted_user() {
        let err = plain_auth()
            .authorize(Some(&basic("mallory", "guess")))
            .expect_err("must reject");
        assert_eq!(
            err,
            AuthError::BadCredentials {
                username: "mallory".to_owned()
            }
        );
    }

    #[rstest]
    #[case::missing(None)]
    #[case::not_basic(Some("Bearer token"))]
    #[case::not_base64(Some("Basic %%%"))]
    fn rejects_malformed_headers(#[case] header: Option<&str>) {
        assert!(plain_auth().authorize(header).is_err());
    }

    #[test]
    fn bcrypt_verifier_accepts_the_hashed_password() {
        let hash = bcrypt::hash("monit", 4).expect("hashing works");
        let auth = CollectorAuth::new("monit", PasswordVerifier::Bcrypt(hash));
        assert_eq!(auth.authorize(Some(&basic("monit", "monit"))), Ok(()));
        assert!(auth.authorize(Some(&basic("monit", "wrong"))).is_err());
    }
}
