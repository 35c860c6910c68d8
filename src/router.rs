//! # Request Routing and Dispatch
//!
//! This module handles HTTP request routing for the wake word upload service.
//!
//! ## Routing Strategy
//!
//! - `OPTIONS` on any path is answered as a CORS preflight before anything else
//! - The training upload path goes to the upload pipeline, whatever the method
//!   (the pipeline itself rejects non-`PUT` methods with 405)
//! - Everything else is a 404
//!
//! ## Supported Routes
//!
//! - `OPTIONS *` - CORS preflight
//! - `PUT /assist/wake_word/training_data/upload?distance=&speed=&wake_word=` - Upload a clip
//!
//! Every response carries the CORS headers and a JSON content type. Errors that
//! escape a handler are reported and answered with a generic 500.

use http::Method;
use serde_json::json;
use worker::*;

use crate::config::Config;
use crate::constants::WAKE_WORD_TRAINING_UPLOAD_PATH;
use crate::errors::{AppError, AppResult};
use crate::handlers::upload::handle_wake_word_upload;
use crate::handlers::{handle_not_found, request_method};
use crate::logging::Logger;
use crate::middleware::CorsMiddleware;
use crate::models::ApiResponse;
use crate::reporting::{ErrorReporter, LogErrorReporter};
use crate::utils::generate_request_id;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Preflight,
    WakeWordUpload,
    NotFound,
}

/// Resolves the route for a method and path.
pub fn resolve_route(method: &Method, path: &str) -> Route {
    if *method == Method::OPTIONS {
        return Route::Preflight;
    }
    match path {
        WAKE_WORD_TRAINING_UPLOAD_PATH => Route::WakeWordUpload,
        _ => Route::NotFound,
    }
}

/// Handles incoming HTTP requests and routes them to the appropriate handler.
///
/// # Request Flow
///
/// 1. **Route Resolution**: Preflight, upload, or not found
/// 2. **Handler Dispatch**: Delegates to the matching handler
/// 3. **Error Handling**: Reports escaped errors and answers with 500
/// 4. **Headers**: Applies the CORS and content type headers
pub async fn handle_request(req: Request, env: Env) -> Result<Response> {
    let logger = Logger::new(generate_request_id());
    let reporter = LogErrorReporter::new(&logger);
    let config = Config::shared(&env, &logger, &reporter).await;

    let response = match dispatch(req, &env, &config, &logger).await {
        Ok(response) => response,
        Err(error) => failure_response(&error, &reporter),
    };

    CorsMiddleware::apply(response)
}

/// Reports an error that escaped a handler and answers with a generic 500.
fn failure_response(error: &AppError, reporter: &impl ErrorReporter) -> ApiResponse {
    reporter.report(error, json!({ "stage": "dispatch" }));
    ApiResponse::message(error.status_code(), "Internal Server Error")
}

async fn dispatch(
    req: Request,
    env: &Env,
    config: &Config,
    logger: &Logger,
) -> AppResult<ApiResponse> {
    let url = req.url()?;
    let path = url.path();
    let method = request_method(&req)?;
    let route = resolve_route(&method, path);

    logger.info(
        "Routing request",
        crate::log_data!("method" => method.as_str(), "path" => path, "route" => format!("{:?}", route)),
    );

    match route {
        Route::Preflight => Ok(CorsMiddleware::preflight()),
        Route::WakeWordUpload => handle_wake_word_upload(req, env, config, logger).await,
        Route::NotFound => Ok(handle_not_found()),
    }
}
