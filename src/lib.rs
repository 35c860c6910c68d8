//! # Assist Wake Word Upload - Cloudflare Workers
//!
//! Accepts short audio clips recorded by users training a wake word model,
//! validates them against a strict upload policy and stores them in R2 under a
//! deterministic key that anonymizes the uploader.
//!
//! ## Architecture
//!
//! - **Router**: Preflight, the single upload route, and 404s
//! - **Middleware**: CORS headers and the ordered upload validation
//! - **Handlers**: The upload pipeline (validate → derive key → write once)
//! - **Storage**: Blob store seam with the R2 implementation
//! - **Reporting**: Error-monitoring seam for unexpected failures
//! - **Utils**: Storage key derivation and user hashing
//!
//! ## API
//!
//! ```text
//! PUT /assist/wake_word/training_data/upload?distance=2&speed=1&wake_word=casita
//! Content-Type: audio/webm
//!
//! 201 { "message": "success", "key": "casita-2024-01-01T00-00-00.000-2-1-<sha256(ip)>.webm" }
//! ```
//!
//! Rejections use 405, 411, 413, 415 and 400 with `{ "message": ... }`.

use worker::*;

mod config;
mod constants;
mod errors;
mod handlers;
mod logging;
mod middleware;
mod models;
mod reporting;
mod router;
mod storage;
mod utils;

/// Main entry point for the Cloudflare Worker.
///
/// Sets up panic reporting and hands the request to the router, which loads the
/// configuration and turns every failure into a JSON response with CORS headers.
#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    router::handle_request(req, env).await
}
