use std::collections::HashMap;
use std::fmt;

use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};

/// An inbound upload, detached from the transport.
///
/// Header lookups are case-insensitive. For repeated query parameters the first
/// occurrence wins.
#[derive(Debug)]
pub struct UploadRequest<B> {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: B,
}

impl<B> UploadRequest<B> {
    pub fn new(method: Method, headers: HeaderMap, body: B) -> Self {
        Self {
            method,
            headers,
            query: HashMap::new(),
            body,
        }
    }

    /// Collects query pairs, keeping the first value of a repeated name.
    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in pairs {
            self.query.entry(name.into()).or_insert_with(|| value.into());
        }
        self
    }

    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Query value, treating an empty string as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Everything the key deriver and store writer need from an accepted upload.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadDescriptor {
    pub content_type: String,
    pub key_extension: String,
    pub content_length: u64,
    pub distance: String,
    pub speed: String,
    pub wake_word: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: String,
}

impl Rejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
    Accepted(UploadDescriptor),
    Rejected(Rejection),
}

impl From<Result<UploadDescriptor, Rejection>> for ValidationOutcome {
    fn from(result: Result<UploadDescriptor, Rejection>) -> Self {
        match result {
            Ok(descriptor) => ValidationOutcome::Accepted(descriptor),
            Err(rejection) => ValidationOutcome::Rejected(rejection),
        }
    }
}

/// Lowercase hex SHA-256 of the client address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserHash(pub(crate) String);

impl fmt::Display for UserHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `{wake_word}-{timestamp}-{distance}-{speed}-{user_hash}.{extension}`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(pub(crate) String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Confirmation returned by a blob store after a successful write.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredUpload {
    pub key: StorageKey,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<StorageKey>,
}

/// Transport-independent response: status plus a pretty-printed JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ApiMessage {
                message: message.into(),
                key: None,
            },
        )
    }

    pub fn stored(key: StorageKey) -> Self {
        Self::json(
            StatusCode::CREATED,
            &ApiMessage {
                message: "success".to_string(),
                key: Some(key),
            },
        )
    }

    /// A bare JSON string body such as `"ok"`.
    pub fn text(status: StatusCode, text: &str) -> Self {
        Self::json(status, &text)
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self::message(rejection.status, rejection.message)
    }

    fn json<T: Serialize + ?Sized>(status: StatusCode, content: &T) -> Self {
        // Serializing strings and ApiMessage cannot fail.
        let body = serde_json::to_string_pretty(content).unwrap_or_default();
        Self { status, body }
    }
}
