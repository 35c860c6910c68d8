//! # Upload Handlers
//!
//! The wake word training upload pipeline:
//!
//! ```text
//! Received → Validating → Rejected
//!                       → Accepted → Deriving key → Writing → Stored | WriteFailed
//! ```
//!
//! [`UploadService`] is transport independent and generic over the blob store and
//! error reporter; [`handle_wake_word_upload`] wires it to the Workers runtime.

use chrono::{DateTime, Utc};
use serde_json::json;
use worker::{ByteStream, Env, Request};

use crate::config::Config;
use crate::errors::AppResult;
use crate::handlers::{request_headers, request_method};
use crate::log_data;
use crate::logging::Logger;
use crate::middleware::ValidationMiddleware;
use crate::models::{ApiResponse, UploadRequest, ValidationOutcome};
use crate::reporting::{ErrorReporter, LogErrorReporter};
use crate::storage::{BlobStore, R2BlobStore};
use crate::utils::derive_storage_key;

/// Validates an upload, derives its key and writes it exactly once.
pub struct UploadService<'a, S, R> {
    config: &'a Config,
    store: S,
    reporter: R,
    logger: &'a Logger,
}

impl<'a, S, R> UploadService<'a, S, R>
where
    S: BlobStore,
    R: ErrorReporter,
{
    pub fn new(config: &'a Config, store: S, reporter: R, logger: &'a Logger) -> Self {
        Self {
            config,
            store,
            reporter,
            logger,
        }
    }

    /// Runs the pipeline for one request. Always yields exactly one response.
    pub async fn handle(&self, request: UploadRequest<S::Body>, now: DateTime<Utc>) -> ApiResponse {
        let descriptor = match ValidationMiddleware::validate(&request, self.config) {
            ValidationOutcome::Accepted(descriptor) => descriptor,
            ValidationOutcome::Rejected(rejection) => {
                self.logger.warn(
                    "Upload rejected",
                    log_data!(
                        "status" => rejection.status.as_u16(),
                        "reason" => rejection.message.as_str()
                    ),
                );
                return ApiResponse::rejected(rejection);
            }
        };

        // A missing address header hashes the empty string.
        let client_ip = request
            .header(&self.config.client_ip_header)
            .unwrap_or_default()
            .to_string();
        let key = derive_storage_key(&descriptor, &client_ip, now);

        match self
            .store
            .put(&key, request.body, descriptor.content_length)
            .await
        {
            Ok(stored) => {
                self.logger.info(
                    "Training clip stored",
                    log_data!(
                        "key" => stored.key.as_str(),
                        "wake_word" => descriptor.wake_word.as_str(),
                        "content_length" => descriptor.content_length
                    ),
                );
                ApiResponse::stored(stored.key)
            }
            Err(error) => {
                self.reporter.report(
                    &error,
                    json!({ "key": key.as_str(), "content_type": descriptor.content_type }),
                );
                ApiResponse::message(error.status_code(), "Internal Server Error")
            }
        }
    }
}

/// Converts a Workers request into an [`UploadRequest`] carrying the body stream.
///
/// The body is not read here; a request without a body carries `None`.
pub fn upload_request_from_worker(
    req: &mut Request,
) -> AppResult<UploadRequest<Option<ByteStream>>> {
    let method = request_method(req)?;
    let headers = request_headers(req);
    let url = req.url()?;
    let query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    let body = req.stream().ok();

    Ok(UploadRequest::new(method, headers, body).with_query(query))
}

/// Handles `/assist/wake_word/training_data/upload` against the R2 bucket binding.
pub async fn handle_wake_word_upload(
    mut req: Request,
    env: &Env,
    config: &Config,
    logger: &Logger,
) -> AppResult<ApiResponse> {
    let upload = upload_request_from_worker(&mut req)?;
    let store = R2BlobStore::new(env.bucket(&config.bucket_name)?);
    let service = UploadService::new(config, store, LogErrorReporter::new(logger), logger);

    Ok(service.handle(upload, Utc::now()).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::executor::block_on;
    use http::{HeaderMap, HeaderName, Method, StatusCode};
    use sha2::{Digest, Sha256};

    use crate::models::ApiMessage;
    use crate::reporting::recording::RecordingReporter;
    use crate::storage::memory::MemoryBlobStore;

    fn upload(
        method: Method,
        headers: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> UploadRequest<Vec<u8>> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        UploadRequest::new(method, map, b"clip".to_vec()).with_query(query.iter().copied())
    }

    fn valid_upload(ip: &str) -> UploadRequest<Vec<u8>> {
        upload(
            Method::PUT,
            &[
                ("Content-Type", "audio/webm"),
                ("Content-Length", "1000"),
                ("CF-Connecting-IP", ip),
            ],
            &[("distance", "2"), ("speed", "1"), ("wake_word", "casita")],
        )
    }

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn run(
        store: &MemoryBlobStore,
        reporter: &RecordingReporter,
        request: UploadRequest<Vec<u8>>,
    ) -> ApiResponse {
        let config = Config::default();
        let logger = Logger::new("test".to_string());
        let service = UploadService::new(&config, store, reporter, &logger);
        block_on(service.handle(request, new_year()))
    }

    #[test]
    fn stores_valid_clip_under_derived_key() {
        let store = MemoryBlobStore::default();
        let reporter = RecordingReporter::default();

        let response = run(&store, &reporter, valid_upload("1.2.3.4"));

        let expected_key = format!(
            "casita-2024-01-01T00-00-00.000-2-1-{}.webm",
            hex::encode(Sha256::digest(b"1.2.3.4"))
        );
        assert_eq!(response.status, StatusCode::CREATED);
        let message: ApiMessage = serde_json::from_str(&response.body).unwrap();
        assert_eq!(message.message, "success");
        assert_eq!(message.key.unwrap().as_str(), expected_key);

        let writes = store.writes.borrow();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], (expected_key, b"clip".to_vec(), 1000));
        assert!(reporter.reports.borrow().is_empty());
    }

    #[test]
    fn rejected_uploads_never_reach_storage() {
        let store = MemoryBlobStore::default();
        let reporter = RecordingReporter::default();

        let cases = [
            (upload(Method::GET, &[], &[]), StatusCode::METHOD_NOT_ALLOWED),
            (
                upload(Method::PUT, &[("content-type", "video/mp4")], &[]),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                upload(
                    Method::PUT,
                    &[("content-type", "audio/mp4"), ("content-length", "300000")],
                    &[("distance", "2"), ("speed", "1"), ("wake_word", "casita")],
                ),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                upload(
                    Method::PUT,
                    &[("content-type", "audio/mp4"), ("content-length", "10")],
                    &[("wake_word", "casita")],
                ),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (request, status) in cases {
            let response = run(&store, &reporter, request);
            assert_eq!(response.status, status);
            let message: ApiMessage = serde_json::from_str(&response.body).unwrap();
            assert!(message.key.is_none());
        }
        assert_eq!(store.write_count(), 0);
        assert!(reporter.reports.borrow().is_empty());
    }

    #[test]
    fn different_clients_get_different_keys() {
        let store = MemoryBlobStore::default();
        let reporter = RecordingReporter::default();

        run(&store, &reporter, valid_upload("1.2.3.4"));
        run(&store, &reporter, valid_upload("10.0.0.1"));

        let writes = store.writes.borrow();
        assert_eq!(writes.len(), 2);
        assert_ne!(writes[0].0, writes[1].0);
    }

    #[test]
    fn missing_client_ip_hashes_empty_string() {
        let store = MemoryBlobStore::default();
        let reporter = RecordingReporter::default();
        let request = upload(
            Method::PUT,
            &[("content-type", "audio/ogg"), ("content-length", "5")],
            &[("distance", "0.5"), ("speed", "fast"), ("wake_word", "ok_nabu")],
        );

        let response = run(&store, &reporter, request);

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(
            store.writes.borrow()[0].0,
            format!(
                "ok_nabu-2024-01-01T00-00-00.000-0.5-fast-{}.ogg",
                hex::encode(Sha256::digest(b""))
            )
        );
    }

    #[test]
    fn storage_failure_is_reported_once_and_mapped_to_500() {
        let store = MemoryBlobStore::failing("bucket unavailable");
        let reporter = RecordingReporter::default();

        let response = run(&store, &reporter, valid_upload("1.2.3.4"));

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let message: ApiMessage = serde_json::from_str(&response.body).unwrap();
        assert_eq!(message.message, "Internal Server Error");
        assert!(message.key.is_none());
        assert_eq!(store.write_count(), 1);

        let reports = reporter.reports.borrow();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].0.contains("bucket unavailable"));
        assert!(reports[0].1["key"].as_str().unwrap().starts_with("casita-"));
    }
}
