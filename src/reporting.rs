//! Error-monitoring collaborator.
//!
//! Unexpected failures (storage writes, worker errors) are handed to an
//! [`ErrorReporter`]. Client validation rejections never are.

use serde_json::Value;

use crate::errors::AppError;
use crate::logging::Logger;

pub trait ErrorReporter {
    fn report(&self, error: &AppError, context: Value);
}

impl<T: ErrorReporter> ErrorReporter for &T {
    fn report(&self, error: &AppError, context: Value) {
        (**self).report(error, context)
    }
}

/// Reports errors as structured ERROR log lines, picked up by Workers Logs / Logpush.
pub struct LogErrorReporter<'a> {
    logger: &'a Logger,
}

impl<'a> LogErrorReporter<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        Self { logger }
    }
}

impl ErrorReporter for LogErrorReporter<'_> {
    fn report(&self, error: &AppError, context: Value) {
        self.logger.error(
            "Unexpected failure",
            crate::log_data!(
                "kind" => error.kind(),
                "error" => error.to_string(),
                "context" => context
            ),
        );
    }
}
