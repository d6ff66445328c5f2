//! Opaque session tokens.

use serde::{Deserialize, Serialize};

/// Number of random bytes behind a generated token.
const TOKEN_BYTES: usize = 32;

/// A cryptographically random opaque session identifier (cookie value).
///
/// Minted lazily on the first write of a non-empty session and reused for
/// every subsequent write until the session is cleared; never reused across
/// distinct logical sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps an existing token value (e.g. from an inbound cookie).
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a new cryptographically secure token.
    #[must_use]
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::RngCore;

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the token as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
