//! API credentials and their lookup seam.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Username plus personal access token for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub key: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            key: key.into(),
        }
    }

    /// `Authorization` header value, or `None` unless both parts are set.
    #[must_use]
    pub fn basic_auth_header(&self) -> Option<String> {
        let user = self.user.trim();
        let key = self.key.trim();
        if user.is_empty() || key.is_empty() {
            return None;
        }
        let encoded = STANDARD.encode(format!("{user}:{key}"));
        Some(format!("Basic {encoded}"))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Source of credentials, consulted on every request so rotations apply
/// without rebuilding the client.
pub trait CredentialStore: Send + Sync {
    fn credentials(&self) -> Option<Credentials>;
}

/// Fixed credentials loaded once from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<Credentials>);

impl StaticCredentials {
    pub fn new(user: Option<String>, key: Option<String>) -> Self {
        match (user, key) {
            (Some(user), Some(key)) => Self(Some(Credentials::new(user, key))),
            _ => Self(None),
        }
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl CredentialStore for StaticCredentials {
    fn credentials(&self) -> Option<Credentials> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header_encodes_user_and_key() {
        let creds = Credentials::new("octocat", "ghp_token");
        assert_eq!(
            creds.basic_auth_header().as_deref(),
            Some("Basic b2N0b2NhdDpnaHBfdG9rZW4=")
        );
    }

    #[test]
    fn basic_auth_header_requires_both_parts() {
        assert_eq!(Credentials::new("", "key").basic_auth_header(), None);
        assert_eq!(Credentials::new("user", "  ").basic_auth_header(), None);
    }

    #[test]
    fn debug_output_redacts_key() {
        let out = format!("{:?}", Credentials::new("octocat", "secret"));
        assert!(out.contains("octocat"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn static_credentials_need_user_and_key() {
        assert!(StaticCredentials::new(Some("u".into()), None).credentials().is_none());
        assert!(StaticCredentials::anonymous().credentials().is_none());
        let creds = StaticCredentials::new(Some("u".into()), Some("k".into()))
            .credentials()
            .expect("both parts set");
        assert_eq!(creds.user, "u");
    }
}
