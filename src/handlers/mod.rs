//! # Handlers Module
//!
//! HTTP request handlers for the wake word upload service, plus the helpers that
//! translate Workers requests into transport-independent values.

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use worker::Request;

use crate::errors::{AppError, AppResult};
use crate::models::ApiResponse;

pub mod upload;

/// The request method exactly as sent, so `PUT` is compared case-sensitively.
pub fn request_method(req: &Request) -> AppResult<Method> {
    let method = req.inner().method();
    Method::from_bytes(method.as_bytes())
        .map_err(|_| AppError::internal(format!("Unparseable request method: {}", method)))
}

/// Copies request headers into a case-insensitive map, skipping invalid entries.
pub fn request_headers(req: &Request) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in req.headers().entries() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.append(name, value);
        }
    }
    headers
}

/// Handles requests to unmatched routes with a 404 Not Found response.
pub fn handle_not_found() -> ApiResponse {
    ApiResponse::text(StatusCode::NOT_FOUND, "Not Found")
}
