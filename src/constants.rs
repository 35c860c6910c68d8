//! # Application Constants
//!
//! This module defines application-wide constants used throughout the wake word
//! upload service. Centralizing constants keeps binding names, routes and the
//! default upload policy in one place.
//!
//! ## Binding Names
//!
//! Constants for Cloudflare Worker bindings that must match wrangler.toml configuration.
//!
//! ## Upload Policy
//!
//! Defaults for the content type and wake word allow-lists and the size limit.
//! They can be overridden through the optional KV configuration.
//!
//! ## Headers
//!
//! HTTP header names and values used by the upload API.

/// Optional KV configuration binding name
pub const ASSIST_CONFIG_KV_NAME: &str = "ASSIST_CONFIG";

/// Key under which the JSON configuration is stored in KV
pub const CONFIG_KV_KEY: &str = "config";

/// R2 bucket binding receiving training clips
pub const WAKE_WORD_BUCKET_NAME: &str = "WAKEWORD_TRAINING_BUCKET";

/// The only route served by this worker
pub const WAKE_WORD_TRAINING_UPLOAD_PATH: &str = "/assist/wake_word/training_data/upload";

/// Content types accepted for training clips
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &["audio/webm", "audio/ogg", "audio/mp4"];

/// Wake words that can be trained
pub const DEFAULT_ALLOWED_WAKE_WORDS: &[&str] = &["casita", "ok_nabu"];

/// Default maximum clip size (250 KiB)
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 250 * 1024;

/// Header set by Cloudflare with the address of the connecting client
pub const HEADER_CLIENT_IP: &str = "CF-Connecting-IP";

/// Query parameters read from the upload URL
pub const PARAM_DISTANCE: &str = "distance";
pub const PARAM_SPEED: &str = "speed";
pub const PARAM_WAKE_WORD: &str = "wake_word";

/// Longest distance/speed value that may be embedded in a storage key
pub const MAX_KEY_TOKEN_LENGTH: usize = 32;

/// CORS header for allowed origins
pub const CORS_ALLOW_ORIGIN: &str = "*";

/// CORS header for allowed methods
pub const CORS_ALLOW_METHODS: &str = "PUT";

/// CORS header for allowed headers
pub const CORS_ALLOW_HEADERS: &str = "Content-Type";

/// Content type of every response body
pub const RESPONSE_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
