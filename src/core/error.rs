use thiserror::Error;

/// Failure reading credentials from a credential store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("Claude Code credentials not found in {0}. Please login via Claude Code CLI first.")]
    NotFound(String),
    #[error("Invalid credential data in {0}")]
    InvalidData(String),
    #[error("Credential store error: {0}")]
    Backend(String),
    #[error("Failed to decode credentials: {0}")]
    Decode(String),
}

/// Failure of one refresh cycle. Every variant is retried on the next poll.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UsageError {
    #[error("No authentication token available: {0}")]
    NoToken(#[source] CredentialError),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error: {0}")]
    Http(u16),
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl UsageError {
    /// Missing token or a rejected one.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NoToken(_) | Self::Http(401))
    }
}

impl From<CredentialError> for UsageError {
    fn from(e: CredentialError) -> Self {
        Self::NoToken(e)
    }
}

impl From<reqwest::Error> for UsageError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for UsageError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors() {
        assert!(UsageError::NoToken(CredentialError::NotFound("Keychain".into())).is_auth());
        assert!(UsageError::Http(401).is_auth());
        assert!(!UsageError::Http(500).is_auth());
        assert!(!UsageError::Network("offline".into()).is_auth());
        assert!(!UsageError::InvalidResponse("eof".into()).is_auth());
    }

    #[test]
    fn display_messages() {
        assert_eq!(UsageError::Http(503).to_string(), "HTTP error: 503");
        assert_eq!(
            UsageError::Network("timed out".into()).to_string(),
            "Network error: timed out"
        );
        let err: UsageError = CredentialError::NotFound("Keychain".into()).into();
        assert!(err.to_string().starts_with("No authentication token available"));
    }

    #[test]
    fn json_error_maps_to_invalid_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: UsageError = json_err.into();
        assert!(matches!(err, UsageError::InvalidResponse(_)));
    }
}
