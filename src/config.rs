//! # Configuration Management
//!
//! This module provides configuration management for the wake word upload service.
//! The upload policy (allow-lists, size limit, bindings) can be overridden through an
//! optional Cloudflare KV namespace and falls back to built-in defaults otherwise.
//!
//! ## Configuration Sources
//!
//! 1. **KV Storage**: Optional JSON document stored under the "config" key
//! 2. **Defaults**: Used for every field missing from KV, or when KV is not bound
//!
//! ## Configuration Options
//!
//! - `bucket_name`: Name of the R2 bucket binding receiving clips
//! - `allowed_content_types`: Accepted `content-type` values
//! - `allowed_wake_words`: Accepted `wake_word` values
//! - `max_content_length`: Largest accepted clip in bytes (default: 250 KiB)
//! - `client_ip_header`: Header carrying the client address used for the user hash
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = Config::shared(&env, &logger, &reporter).await;
//! println!("Max clip size: {} bytes", config.max_content_length);
//! ```

use std::sync::{Arc, OnceLock};

use serde_json::json;

use crate::constants::{
    ASSIST_CONFIG_KV_NAME, CONFIG_KV_KEY, DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_WAKE_WORDS,
    DEFAULT_MAX_CONTENT_LENGTH, HEADER_CLIENT_IP, WAKE_WORD_BUCKET_NAME,
};
use crate::errors::{AppError, AppResult};
use crate::logging::Logger;
use crate::reporting::ErrorReporter;
use serde::{Deserialize, Serialize};
use worker::kv::KvStore;
use worker::Env;

static CONFIG_CACHE: OnceLock<Arc<Config>> = OnceLock::new();

/// Upload policy and binding configuration.
///
/// Loaded once per isolate and shared read-only between requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the R2 bucket binding. Must match wrangler.toml.
    pub bucket_name: String,

    /// Exact `content-type` values accepted for uploads.
    /// The storage key extension is the value with its `audio/` prefix removed.
    pub allowed_content_types: Vec<String>,

    /// Closed set of wake words clips may be uploaded for.
    pub allowed_wake_words: Vec<String>,

    /// Maximum declared `content-length` in bytes.
    pub max_content_length: u64,

    /// Header holding the client address.
    pub client_ip_header: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_name: WAKE_WORD_BUCKET_NAME.to_string(),
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_wake_words: DEFAULT_ALLOWED_WAKE_WORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            client_ip_header: HEADER_CLIENT_IP.to_string(),
        }
    }
}

impl Config {
    /// Reads the raw configuration document from KV storage.
    ///
    /// # Configuration Format
    ///
    /// Any subset of the fields may be present:
    /// ```json
    /// {
    ///   "allowed_wake_words": ["casita", "ok_nabu"],
    ///   "max_content_length": 256000
    /// }
    /// ```
    ///
    /// # Error Handling
    ///
    /// - If no config exists under the key, defaults are used
    /// - KV access errors and invalid JSON are returned as `AppError::Internal`
    pub async fn load(kv: &KvStore) -> AppResult<Self> {
        let raw = kv
            .get(CONFIG_KV_KEY)
            .text()
            .await
            .map_err(|e| AppError::internal(format!("Config read failed: {:?}", e)))?;
        Self::from_kv_value(raw.as_deref())
    }

    /// Parses the stored document; an absent value means defaults.
    pub fn from_kv_value(raw: Option<&str>) -> AppResult<Self> {
        match raw {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| AppError::internal(format!("Invalid config JSON: {}", e))),
            None => Ok(Self::default()),
        }
    }

    /// Settles a load attempt.
    ///
    /// A loaded config is returned as cacheable. A failed load is reported and
    /// the defaults apply to the current request only, so the next request
    /// retries the read.
    pub fn settle(loaded: AppResult<Self>, reporter: &impl ErrorReporter) -> (Self, bool) {
        match loaded {
            Ok(config) => (config, true),
            Err(error) => {
                reporter.report(&error, json!({ "fallback": "default config" }));
                (Self::default(), false)
            }
        }
    }

    /// Returns the isolate-wide config, loading it on first use.
    ///
    /// Never fails: without the optional KV binding the built-in policy
    /// applies, and load failures fall back to defaults.
    pub async fn shared(env: &Env, logger: &Logger, reporter: &impl ErrorReporter) -> Arc<Self> {
        if let Some(config) = CONFIG_CACHE.get() {
            return config.clone();
        }

        let loaded = match env.kv(ASSIST_CONFIG_KV_NAME) {
            Ok(kv) => Self::load(&kv).await,
            Err(_) => {
                logger.info("No config KV binding, using default config", None);
                Ok(Self::default())
            }
        };

        let (config, cacheable) = Self::settle(loaded, reporter);
        let config = Arc::new(config);
        if cacheable {
            let _ = CONFIG_CACHE.set(config.clone());
        }
        config
    }

    pub fn is_allowed_content_type(&self, content_type: &str) -> bool {
        self.allowed_content_types.iter().any(|t| t == content_type)
    }

    pub fn is_allowed_wake_word(&self, wake_word: &str) -> bool {
        self.allowed_wake_words.iter().any(|w| w == wake_word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::recording::RecordingReporter;

    #[test]
    fn default_policy_matches_training_targets() {
        let config = Config::default();
        assert_eq!(config.max_content_length, 256_000);
        assert!(config.is_allowed_content_type("audio/ogg"));
        assert!(!config.is_allowed_content_type("audio/wav"));
        assert!(config.is_allowed_wake_word("ok_nabu"));
        assert!(!config.is_allowed_wake_word("hey_jarvis"));
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "allowed_wake_words": ["hey_nabu"] }"#).unwrap();
        assert_eq!(config.allowed_wake_words, vec!["hey_nabu".to_string()]);
        assert_eq!(config.bucket_name, WAKE_WORD_BUCKET_NAME);
        assert_eq!(config.client_ip_header, HEADER_CLIENT_IP);
        assert_eq!(config.allowed_content_types.len(), 3);
    }

    #[test]
    fn absent_kv_value_means_defaults() {
        assert_eq!(Config::from_kv_value(None).unwrap(), Config::default());
    }

    #[test]
    fn malformed_kv_value_is_an_internal_error() {
        let err = Config::from_kv_value(Some("{not json")).unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(err.to_string().contains("Invalid config JSON"));
    }

    #[test]
    fn failed_load_is_reported_and_falls_back_uncached() {
        let reporter = RecordingReporter::default();
        let (config, cacheable) =
            Config::settle(Config::from_kv_value(Some("{not json")), &reporter);

        assert_eq!(config, Config::default());
        assert!(!cacheable);
        let reports = reporter.reports.borrow();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1["fallback"], "default config");
    }

    #[test]
    fn loaded_config_is_cacheable_and_not_reported() {
        let reporter = RecordingReporter::default();
        let (config, cacheable) = Config::settle(
            Config::from_kv_value(Some(r#"{ "max_content_length": 1024 }"#)),
            &reporter,
        );

        assert_eq!(config.max_content_length, 1024);
        assert!(cacheable);
        assert!(reporter.reports.borrow().is_empty());
    }
}
