//! # Middleware Components
//!
//! This module provides the request/response processing shared by the upload route:
//! CORS handling and upload validation.
//!
//! ## Middleware Types
//!
//! - **CORS Middleware**: Preflight responses and the header set every response carries
//! - **Validation Middleware**: The ordered upload policy checks
//!
//! ## Validation Order
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! ```text
//! method → content-type → content-length → required parameters
//!        → wake word allow-list → key-safe distance/speed
//! ```
//!
//! ## Usage Examples
//!
//! ```rust,ignore
//! if method == Method::OPTIONS {
//!     return CorsMiddleware::apply(CorsMiddleware::preflight());
//! }
//!
//! match ValidationMiddleware::validate(&upload, &config) {
//!     ValidationOutcome::Accepted(descriptor) => { /* derive key, store */ }
//!     ValidationOutcome::Rejected(rejection) => { /* 4xx */ }
//! }
//! ```

use http::{Method, StatusCode};
use worker::{Headers, Response, Result};

use crate::config::Config;
use crate::constants::{
    CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN, MAX_KEY_TOKEN_LENGTH,
    PARAM_DISTANCE, PARAM_SPEED, PARAM_WAKE_WORD, RESPONSE_CONTENT_TYPE,
};
use crate::models::{ApiResponse, Rejection, UploadDescriptor, UploadRequest, ValidationOutcome};

/// Middleware for Cross-Origin Resource Sharing (CORS).
///
/// Every response, including rejections and 404s, carries the same header set:
/// any origin, `PUT`, the `Content-Type` request header, and a JSON content type.
pub struct CorsMiddleware;

impl CorsMiddleware {
    /// Header name/value pairs sent with every response.
    pub fn header_pairs() -> [(&'static str, &'static str); 4] {
        [
            ("Access-Control-Allow-Origin", CORS_ALLOW_ORIGIN),
            ("Access-Control-Allow-Methods", CORS_ALLOW_METHODS),
            ("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS),
            ("Content-Type", RESPONSE_CONTENT_TYPE),
        ]
    }

    pub fn headers() -> Result<Headers> {
        let headers = Headers::new();
        for (name, value) in Self::header_pairs() {
            headers.set(name, value)?;
        }
        Ok(headers)
    }

    /// Body of a preflight response. Never touches validation or storage.
    pub fn preflight() -> ApiResponse {
        ApiResponse::text(StatusCode::OK, "ok")
    }

    /// Converts a pipeline response into a worker response with the header set applied.
    pub fn apply(response: ApiResponse) -> Result<Response> {
        Ok(Response::ok(response.body)?
            .with_status(response.status.as_u16())
            .with_headers(Self::headers()?))
    }
}

/// Middleware validating upload requests against the configured policy.
///
/// Validation is a pure function of the request metadata and the config; the
/// body is never read.
pub struct ValidationMiddleware;

impl ValidationMiddleware {
    /// Runs every check in order and returns the first rejection, or the
    /// accepted upload descriptor.
    pub fn validate<B>(req: &UploadRequest<B>, config: &Config) -> ValidationOutcome {
        Self::run_checks(req, config).into()
    }

    fn run_checks<B>(
        req: &UploadRequest<B>,
        config: &Config,
    ) -> std::result::Result<UploadDescriptor, Rejection> {
        Self::validate_method(&req.method)?;
        let content_type = Self::validate_content_type(req.header("content-type"), config)?;
        let content_length =
            Self::validate_content_length(req.header("content-length"), config.max_content_length)?;
        let (distance, speed, wake_word) = Self::validate_required_params(req)?;
        Self::validate_wake_word(wake_word, config)?;
        Self::validate_key_token(PARAM_DISTANCE, distance)?;
        Self::validate_key_token(PARAM_SPEED, speed)?;

        Ok(UploadDescriptor {
            key_extension: Self::key_extension(content_type).to_string(),
            content_type: content_type.to_string(),
            content_length,
            distance: distance.to_string(),
            speed: speed.to_string(),
            wake_word: wake_word.to_string(),
        })
    }

    /// `audio/webm` → `webm`
    fn key_extension(content_type: &str) -> &str {
        content_type
            .strip_prefix("audio/")
            .or_else(|| content_type.rsplit('/').next())
            .unwrap_or(content_type)
    }

    /// Only `PUT` is accepted; method names are case-sensitive.
    pub fn validate_method(method: &Method) -> std::result::Result<(), Rejection> {
        if *method != Method::PUT {
            return Err(Rejection::new(
                StatusCode::METHOD_NOT_ALLOWED,
                "Invalid method",
            ));
        }
        Ok(())
    }

    /// The content type must exactly match one of the allowed values.
    pub fn validate_content_type<'a>(
        content_type: Option<&'a str>,
        config: &Config,
    ) -> std::result::Result<&'a str, Rejection> {
        match content_type {
            Some(value) if config.is_allowed_content_type(value) => Ok(value),
            other => Err(Rejection::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!(
                    "Invalid content-type, received: {}, allowed: {}",
                    other.unwrap_or("null"),
                    config.allowed_content_types.join(",")
                ),
            )),
        }
    }

    /// Parses the declared length and enforces the size limit.
    ///
    /// # Errors
    ///
    /// - `411` when the header is missing
    /// - `400` when it is not all ASCII digits or overflows `u64`
    /// - `413` when it exceeds `max`
    pub fn validate_content_length(
        content_length: Option<&str>,
        max: u64,
    ) -> std::result::Result<u64, Rejection> {
        let raw = content_length.ok_or_else(|| {
            Rejection::new(StatusCode::LENGTH_REQUIRED, "Missing content-length")
        })?;

        let malformed = || {
            Rejection::new(
                StatusCode::BAD_REQUEST,
                format!("Invalid content-length, received: {}", raw),
            )
        };
        // Digits only: `u64::from_str` would also take a leading `+`.
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let length = raw.parse::<u64>().map_err(|_| malformed())?;

        if length > max {
            return Err(Rejection::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "Invalid content-length, received: {}, allowed [<{}]",
                    length, max
                ),
            ));
        }
        Ok(length)
    }

    /// `distance`, `speed` and `wake_word` must all be present and non-empty.
    pub fn validate_required_params<B>(
        req: &UploadRequest<B>,
    ) -> std::result::Result<(&str, &str, &str), Rejection> {
        match (
            req.param(PARAM_DISTANCE),
            req.param(PARAM_SPEED),
            req.param(PARAM_WAKE_WORD),
        ) {
            (Some(distance), Some(speed), Some(wake_word)) => Ok((distance, speed, wake_word)),
            (distance, speed, wake_word) => {
                let missing: Vec<&str> = [
                    (PARAM_DISTANCE, distance),
                    (PARAM_SPEED, speed),
                    (PARAM_WAKE_WORD, wake_word),
                ]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(name, _)| name)
                .collect();
                Err(Rejection::new(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid parameters: missing {}", missing.join(", ")),
                ))
            }
        }
    }

    pub fn validate_wake_word(
        wake_word: &str,
        config: &Config,
    ) -> std::result::Result<(), Rejection> {
        if !config.is_allowed_wake_word(wake_word) {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                format!("Invalid wake word, received: {}", wake_word),
            ));
        }
        Ok(())
    }

    /// Values embedded in the storage key are limited to short runs of ASCII
    /// alphanumerics, `.` and `_` so they cannot introduce separators or paths.
    pub fn validate_key_token(name: &str, value: &str) -> std::result::Result<(), Rejection> {
        let valid = value.len() <= MAX_KEY_TOKEN_LENGTH
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
        if !valid {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                format!("Invalid parameters: {} received: {}", name, value),
            ));
        }
        Ok(())
    }
}
