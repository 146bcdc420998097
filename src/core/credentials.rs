use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::core::config::{CredentialSource, CredentialsConfig};
use crate::core::error::CredentialError;
use crate::core::models::credentials::Credentials;
use crate::core::process::run_command;

/// Keychain service name under which Claude Code stores its OAuth blob.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

const SECURITY_TIMEOUT: Duration = Duration::from_secs(10);
/// `errSecItemNotFound` as reported by `security` through its exit status.
const SECURITY_ITEM_NOT_FOUND: i32 = 44;

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Source of OAuth credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_credentials(&self) -> Result<Credentials>;

    /// Drop any cached value so the next read goes back to the store.
    fn clear_cache(&self) {}
}

fn parse_credentials(raw: &str, origin: &str) -> Result<Credentials> {
    if raw.trim().is_empty() {
        return Err(CredentialError::InvalidData(origin.to_string()));
    }
    let creds: Credentials =
        serde_json::from_str(raw).map_err(|e| CredentialError::Decode(e.to_string()))?;
    if creds.access_token().is_empty() {
        return Err(CredentialError::InvalidData(origin.to_string()));
    }
    Ok(creds)
}

// --- macOS Keychain ---

/// Reads the generic-password item through the `security` CLI.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCHAIN_SERVICE)
    }
}

#[async_trait]
impl CredentialProvider for KeychainStore {
    async fn get_credentials(&self) -> Result<Credentials> {
        debug!(service = %self.service, "reading credentials from keychain");
        let output = run_command(
            "security",
            &["find-generic-password", "-s", &self.service, "-w"],
            SECURITY_TIMEOUT,
        )
        .await
        .map_err(|e| CredentialError::Backend(format!("Failed to run security: {}", e)))?;

        if !output.success {
            if output.code == Some(SECURITY_ITEM_NOT_FOUND)
                || output.stderr.contains("could not be found")
            {
                return Err(CredentialError::NotFound("Keychain".to_string()));
            }
            return Err(CredentialError::Backend(format!(
                "Keychain error ({}): {}",
                output.code.unwrap_or(-1),
                output.stderr
            )));
        }

        parse_credentials(&output.stdout, "Keychain")
    }
}

// --- Credentials file ---

/// Reads `~/.claude/.credentials.json` or a configured path.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".claude")
            .join(".credentials.json")
    }

}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[async_trait]
impl CredentialProvider for FileStore {
    async fn get_credentials(&self) -> Result<Credentials> {
        debug!(path = %self.path.display(), "reading credentials file");
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::NotFound(self.path.display().to_string()));
            }
            Err(e) => {
                return Err(CredentialError::Backend(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        parse_credentials(&content, &self.path.display().to_string())
    }
}

// --- Platform selection ---

/// Credential store chosen by configuration.
///
/// `Auto` reads the keychain on macOS and falls back to the credentials
/// file when the keychain has no item; other platforms use the file only.
#[derive(Debug, Clone)]
pub struct SystemStore {
    source: CredentialSource,
    keychain: KeychainStore,
    file: FileStore,
}

impl SystemStore {
    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self {
            source: config.source,
            keychain: KeychainStore::new(config.keychain_service.clone()),
            file: config
                .file_path
                .as_ref()
                .map(FileStore::new)
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CredentialProvider for SystemStore {
    async fn get_credentials(&self) -> Result<Credentials> {
        match self.source {
            CredentialSource::Keychain => self.keychain.get_credentials().await,
            CredentialSource::File => self.file.get_credentials().await,
            CredentialSource::Auto if cfg!(target_os = "macos") => {
                match self.keychain.get_credentials().await {
                    Err(CredentialError::NotFound(_)) => {
                        debug!("no keychain item, trying credentials file");
                        self.file.get_credentials().await
                    }
                    other => other,
                }
            }
            CredentialSource::Auto => self.file.get_credentials().await,
        }
    }
}

// --- Cache ---

/// Serves the last credentials read until explicitly invalidated.
pub struct CachedStore<S> {
    inner: S,
    cached: Mutex<Option<Credentials>>,
}

impl<S: CredentialProvider> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn is_cached(&self) -> bool {
        self.cached.lock().map(|c| c.is_some()).unwrap_or(false)
    }
}

#[async_trait]
impl<S: CredentialProvider> CredentialProvider for CachedStore<S> {
    async fn get_credentials(&self) -> Result<Credentials> {
        if let Ok(cached) = self.cached.lock() {
            if let Some(creds) = cached.as_ref() {
                return Ok(creds.clone());
            }
        }

        let creds = self.inner.get_credentials().await?;
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(creds.clone());
        }
        Ok(creds)
    }

    fn clear_cache(&self) {
        debug!("clearing cached credentials");
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
        self.inner.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CREDS_JSON: &str = r#"{
        "claudeAiOauth": {
            "accessToken": "tok_abc123",
            "refreshToken": "ref_abc123",
            "expiresAt": 1764876900000,
            "scopes": ["user:inference"],
            "subscriptionType": "pro"
        }
    }"#;

    struct CountingStore {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl CredentialProvider for CountingStore {
        async fn get_credentials(&self) -> Result<Credentials> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            parse_credentials(CREDS_JSON, "test")
        }
    }

    #[test]
    fn parse_credentials_happy_path() {
        let creds = parse_credentials(CREDS_JSON, "test").unwrap();
        assert_eq!(creds.access_token(), "tok_abc123");
        assert_eq!(creds.subscription_label(), "Pro");
    }

    #[test]
    fn parse_credentials_rejects_empty_blob() {
        let err = parse_credentials("  \n", "Keychain").unwrap_err();
        assert_eq!(err, CredentialError::InvalidData("Keychain".into()));
    }

    #[test]
    fn parse_credentials_rejects_empty_token() {
        let err = parse_credentials(r#"{"claudeAiOauth":{"accessToken":""}}"#, "x").unwrap_err();
        assert!(matches!(err, CredentialError::InvalidData(_)));
    }

    #[test]
    fn parse_credentials_reports_decode_error() {
        let err = parse_credentials(r#"{"other": 1}"#, "x").unwrap_err();
        assert!(matches!(err, CredentialError::Decode(_)));
    }

    #[tokio::test]
    async fn file_store_reads_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CREDS_JSON.as_bytes()).unwrap();
        let store = FileStore::new(file.path());
        let creds = store.get_credentials().await.unwrap();
        assert_eq!(creds.access_token(), "tok_abc123");
    }

    #[tokio::test]
    async fn file_store_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.json"));
        let err = store.get_credentials().await.unwrap_err();
        assert!(matches!(err, CredentialError::NotFound(_)));
    }

    #[tokio::test]
    async fn system_store_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CREDS_JSON.as_bytes()).unwrap();
        let config = CredentialsConfig {
            source: CredentialSource::File,
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            file_path: Some(file.path().to_path_buf()),
        };
        let store = SystemStore::from_config(&config);
        assert_eq!(store.get_credentials().await.unwrap().access_token(), "tok_abc123");
    }

    #[tokio::test]
    async fn cached_store_reads_once_until_cleared() {
        let store = CachedStore::new(CountingStore {
            reads: AtomicUsize::new(0),
        });
        assert!(!store.is_cached());

        store.get_credentials().await.unwrap();
        store.get_credentials().await.unwrap();
        assert_eq!(store.inner.reads.load(Ordering::SeqCst), 1);
        assert!(store.is_cached());

        store.clear_cache();
        assert!(!store.is_cached());
        store.get_credentials().await.unwrap();
        assert_eq!(store.inner.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cached_store_does_not_cache_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = CachedStore::new(FileStore::new(dir.path().join("missing.json")));
        assert!(store.get_credentials().await.is_err());
        assert!(!store.is_cached());
    }
}
