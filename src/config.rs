//! Configuration types for article processing.
//!
//! All run behaviour is controlled through [`PressConfig`], built via its
//! [`PressConfigBuilder`]. Credentials are resolved once, at the boundary,
//! into an explicit [`Credentials`] value; nothing inside the pipeline reads
//! the process environment.

use crate::error::PressError;
use crate::progress::ProgressCallback;
use crate::token::TokenCache;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default WeChat API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com/cgi-bin";

/// Environment variable carrying the account's AppID.
pub const APP_ID_VAR: &str = "WECHAT_APP_ID";

/// Environment variable carrying the account's AppSecret.
pub const APP_SECRET_VAR: &str = "WECHAT_APP_SECRET";

/// How many directories (current included) are searched for a `.env` file.
const ENV_FILE_SEARCH_DEPTH: usize = 5;

/// Account credentials for the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Resolve credentials from the process environment, falling back to the
    /// nearest `.env` file above the current directory.
    ///
    /// Environment variables always win over the file. The file is read, not
    /// loaded: the process environment is left untouched.
    pub fn from_env() -> Result<Self, PressError> {
        let file_vars = std::env::current_dir()
            .ok()
            .and_then(|cwd| find_env_file(&cwd))
            .map(|path| read_env_file(&path))
            .unwrap_or_default();

        Self::resolve(|key| std::env::var(key).ok(), &file_vars)
    }

    /// Resolve from an arbitrary lookup plus parsed `.env` pairs.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        file_vars: &HashMap<String, String>,
    ) -> Result<Self, PressError> {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .or_else(|| file_vars.get(key).cloned().filter(|v| !v.is_empty()))
        };

        match (get(APP_ID_VAR), get(APP_SECRET_VAR)) {
            (Some(app_id), Some(app_secret)) => Ok(Self { app_id, app_secret }),
            (id, secret) => {
                let missing: Vec<&str> = [
                    id.is_none().then_some(APP_ID_VAR),
                    secret.is_none().then_some(APP_SECRET_VAR),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(PressError::CredentialsMissing {
                    missing: missing.join(", "),
                })
            }
        }
    }
}

/// Walk up from `start` looking for a `.env` file.
pub fn find_env_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(ENV_FILE_SEARCH_DEPTH)
        .map(|dir| dir.join(".env"))
        .find(|candidate| candidate.is_file())
}

/// Parse a `.env` file into key/value pairs. Unreadable lines are skipped.
pub fn read_env_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => {
            debug!("Reading credentials file: {}", path.display());
            iter.filter_map(Result::ok).collect()
        }
        Err(e) => {
            debug!("Ignoring unreadable env file {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

/// Configuration for a processing run.
///
/// Built via [`PressConfig::builder()`] or using [`PressConfig::default()`].
///
/// # Example
/// ```rust
/// use wechat_press::{Credentials, PressConfig};
///
/// let config = PressConfig::builder()
///     .credentials(Credentials::new("wx123", "secret"))
///     .upload_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PressConfig {
    /// Base URL of the WeChat API. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,

    /// Timeout for the token request, in seconds. Default: 30.
    pub token_timeout_secs: u64,

    /// Timeout for each image upload, in seconds. Default: 120.
    pub upload_timeout_secs: u64,

    /// Timeout for fetching an external image, in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Ignore any cached token and request a fresh one. Default: false.
    pub force_refresh: bool,

    /// Account credentials. Required by every operation that talks to the API.
    pub credentials: Option<Credentials>,

    /// Token cache. If None, a file cache at the per-user default location is used.
    pub token_cache: Option<Arc<dyn TokenCache>>,

    /// Per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_timeout_secs: 30,
            upload_timeout_secs: 120,
            download_timeout_secs: 60,
            force_refresh: false,
            credentials: None,
            token_cache: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PressConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PressConfig")
            .field("api_base", &self.api_base)
            .field("token_timeout_secs", &self.token_timeout_secs)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("force_refresh", &self.force_refresh)
            .field("credentials", &self.credentials)
            .field(
                "token_cache",
                &self.token_cache.as_ref().map(|_| "<dyn TokenCache>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PressProgressCallback>"),
            )
            .finish()
    }
}

impl PressConfig {
    /// Create a new builder for `PressConfig`.
    pub fn builder() -> PressConfigBuilder {
        PressConfigBuilder {
            config: Self::default(),
        }
    }

    /// The credentials, or `CredentialsMissing` if none were supplied.
    pub fn require_credentials(&self) -> Result<&Credentials, PressError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| PressError::CredentialsMissing {
                missing: format!("{APP_ID_VAR}, {APP_SECRET_VAR}"),
            })
    }
}

/// Builder for [`PressConfig`].
pub struct PressConfigBuilder {
    config: PressConfig,
}

impl PressConfigBuilder {
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token_timeout_secs(mut self, secs: u64) -> Self {
        self.config.token_timeout_secs = secs;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn force_refresh(mut self, v: bool) -> Self {
        self.config.force_refresh = v;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn token_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.config.token_cache = Some(cache);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PressConfig, PressError> {
        let c = &self.config;
        if !(c.api_base.starts_with("http://") || c.api_base.starts_with("https://")) {
            return Err(PressError::InvalidConfig(format!(
                "API base must be an http(s) URL, got '{}'",
                c.api_base
            )));
        }
        for (name, secs) in [
            ("token timeout", c.token_timeout_secs),
            ("upload timeout", c.upload_timeout_secs),
            ("download timeout", c.download_timeout_secs),
        ] {
            if secs == 0 {
                return Err(PressError::InvalidConfig(format!("{name} must be ≥ 1s")));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_are_valid() {
        let config = PressConfig::builder().build().unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.upload_timeout_secs, 120);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = PressConfig::builder().upload_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, PressError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_base_rejected() {
        let err = PressConfig::builder().api_base("ftp://x").build().unwrap_err();
        assert!(err.to_string().contains("ftp://x"));
    }

    #[test]
    fn trailing_slash_trimmed_from_base() {
        let config = PressConfig::builder()
            .api_base("http://localhost:8080/cgi-bin/")
            .build()
            .unwrap();
        assert_eq!(config.api_base, "http://localhost:8080/cgi-bin");
    }

    #[test]
    fn missing_credentials_reported_before_network() {
        let config = PressConfig::default();
        let err = config.require_credentials().unwrap_err();
        assert!(matches!(err, PressError::CredentialsMissing { .. }));
    }

    #[test]
    fn environment_wins_over_file() {
        let mut file = HashMap::new();
        file.insert(APP_ID_VAR.to_string(), "from-file".to_string());
        file.insert(APP_SECRET_VAR.to_string(), "file-secret".to_string());

        let creds = Credentials::resolve(
            |k| (k == APP_ID_VAR).then(|| "from-env".to_string()),
            &file,
        )
        .unwrap();
        assert_eq!(creds.app_id, "from-env");
        assert_eq!(creds.app_secret, "file-secret");
    }

    #[test]
    fn empty_values_count_as_missing() {
        let creds = Credentials::resolve(
            |k| (k == APP_ID_VAR).then(String::new),
            &HashMap::new(),
        );
        match creds {
            Err(PressError::CredentialsMissing { missing }) => {
                assert_eq!(missing, "WECHAT_APP_ID, WECHAT_APP_SECRET");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn only_absent_variable_is_named() {
        let mut file = HashMap::new();
        file.insert(APP_ID_VAR.to_string(), "wx1".to_string());
        let err = Credentials::resolve(no_env, &file).unwrap_err();
        match err {
            PressError::CredentialsMissing { missing } => assert_eq!(missing, APP_SECRET_VAR),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn env_file_found_in_parent_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            root.path().join(".env"),
            "# account\nWECHAT_APP_ID=wx42\nWECHAT_APP_SECRET=\"s3cret\"\n",
        )
        .unwrap();

        let found = find_env_file(&nested).expect(".env should be found");
        let vars = read_env_file(&found);
        let creds = Credentials::resolve(no_env, &vars).unwrap();
        assert_eq!(creds.app_id, "wx42");
        assert_eq!(creds.app_secret, "s3cret");
    }

    #[test]
    fn env_file_search_is_bounded() {
        let root = tempfile::tempdir().unwrap();
        let deep = root.path().join("1").join("2").join("3").join("4").join("5");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(root.path().join(".env"), "WECHAT_APP_ID=x\n").unwrap();
        assert!(find_env_file(&deep).is_none());
    }

    #[test]
    fn unreadable_env_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_file(&dir.path().join(".env")).is_empty());
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("wx1", "hunter2");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("hunter2"));
    }
}
