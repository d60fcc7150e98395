use std::fmt;

use crate::config;

/// Caller identity plus API token attached to every listing request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub caller: String,
    pub token: String,
}

impl Credentials {
    pub fn new(caller: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("caller", &self.caller)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Source of credentials for the scanner. The scanner never reads the
/// environment or the filesystem itself.
pub trait CredentialsProvider: Send + Sync {
    fn credentials(&self) -> Credentials;
}

/// Fixed credentials, e.g. assembled by the binary after env overrides.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialsProvider for StaticCredentials {
    fn credentials(&self) -> Credentials {
        self.0.clone()
    }
}

impl CredentialsProvider for config::Github {
    fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.token.clone())
    }
}
