use chrono::Utc;
use serde_json::json;

/// Logger struct for handling structured logging
pub struct Logger {
    request_id: String,
}

impl Logger {
    /// Create a new Logger instance
    ///
    /// # Arguments
    ///
    /// * `request_id` - A unique identifier for the current request
    pub fn new(request_id: String) -> Self {
        Self { request_id }
    }

    /// Log an info message
    pub fn info(&self, message: &str, data: Option<serde_json::Value>) {
        self.log(Level::Info, message, data);
    }

    /// Log a warning message. Used for rejected uploads.
    pub fn warn(&self, message: &str, data: Option<serde_json::Value>) {
        self.log(Level::Warn, message, data);
    }

    /// Log an error message
    pub fn error(&self, message: &str, data: Option<serde_json::Value>) {
        self.log(Level::Error, message, data);
    }

    fn log(&self, level: Level, message: &str, data: Option<serde_json::Value>) {
        let line = self.format(level, message, data);
        emit(level, &line);
    }

    fn format(&self, level: Level, message: &str, data: Option<serde_json::Value>) -> String {
        json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level.as_str(),
            "request_id": self.request_id,
            "message": message,
            "data": data
        })
        .to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        fn emit(level: Level, line: &str) {
            match level {
                Level::Info => worker::console_log!("{}", line),
                Level::Warn => worker::console_warn!("{}", line),
                Level::Error => worker::console_error!("{}", line),
            }
        }
    } else {
        // Native builds (tests) have no JS console.
        fn emit(_level: Level, line: &str) {
            eprintln!("{}", line);
        }
    }
}

/// Macro to create a JSON object for additional log data
///
/// Usage: log_data!("key1" => "value1", "key2" => 42)
#[macro_export]
macro_rules! log_data {
    ($($key:expr => $value:expr),* $(,)?) => {
        Some(serde_json::json!({ $($key: $value),* }))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_structured_line() {
        let logger = Logger::new("req-1".to_string());
        let line = logger.format(Level::Warn, "Upload rejected", log_data!("status" => 415));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["request_id"], "req-1");
        assert_eq!(value["message"], "Upload rejected");
        assert_eq!(value["data"]["status"], 415);
    }
}
