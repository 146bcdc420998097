use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Credential blob written by the Claude Code CLI.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "claudeAiOauth")]
    pub claude_ai_oauth: OAuthToken,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as milliseconds since the Unix epoch
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub subscription_type: Option<String>,
}

impl Credentials {
    pub fn access_token(&self) -> &str {
        &self.claude_ai_oauth.access_token
    }

    /// Subscription tier with the first letter upper-cased, e.g. "Pro" or "Max".
    pub fn subscription_label(&self) -> String {
        match self.claude_ai_oauth.subscription_type.as_deref() {
            Some(tier) if !tier.is_empty() => capitalize(tier),
            _ => "Unknown".to_string(),
        }
    }
}

impl OAuthToken {
    pub fn expires_at_date(&self) -> Option<DateTime<Utc>> {
        self.expires_at.and_then(DateTime::from_timestamp_millis)
    }

    /// True when `expiresAt` is present and not after `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_date().is_some_and(|expiry| expiry <= now)
    }
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("claude_ai_oauth", &self.claude_ai_oauth)
            .finish()
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("subscription_type", &self.subscription_type)
            .finish()
    }
}
