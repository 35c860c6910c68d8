//! # Utility Functions
//!
//! Storage key derivation and identifier helpers.
//!
//! ## Storage Keys
//!
//! Every accepted clip is stored under a flat key that encodes the upload metadata
//! and an anonymized uploader id:
//!
//! ```text
//! {wake_word}-{timestamp}-{distance}-{speed}-{user_hash}.{extension}
//! casita-2024-01-01T00-00-00.000-2-1-6694f8…e1a.webm
//! ```
//!
//! The timestamp is UTC with millisecond precision and `:` replaced by `-`. The user
//! hash is the lowercase hex SHA-256 of the client address. Two uploads from the same
//! client with identical metadata in the same millisecond map to the same key and the
//! later one overwrites the earlier.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{StorageKey, UploadDescriptor, UserHash};

/// Formats `now` as `YYYY-MM-DDTHH-mm-ss.sss` (23 characters).
pub fn key_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3f")
        .to_string()
        .replace(':', "-")
}

/// Anonymizes a client address. Stable for a given input, never reversed.
pub fn user_hash(client_ip: &str) -> UserHash {
    let digest = Sha256::digest(client_ip.as_bytes());
    UserHash(hex::encode(digest))
}

/// Derives the storage key for an accepted upload.
///
/// Pure given its inputs; callers pass the current instant.
pub fn derive_storage_key(
    descriptor: &UploadDescriptor,
    client_ip: &str,
    now: DateTime<Utc>,
) -> StorageKey {
    StorageKey(format!(
        "{}-{}-{}-{}-{}.{}",
        descriptor.wake_word,
        key_timestamp(now),
        descriptor.distance,
        descriptor.speed,
        user_hash(client_ip),
        descriptor.key_extension
    ))
}

/// Generates an identifier used to correlate log lines of one request.
///
/// Format: `{epoch_millis}-{uuid_v4}`
pub fn generate_request_id() -> String {
    let uuid_part = Uuid::new_v4().to_string();
    let timestamp = Utc::now().timestamp_millis();
    format!("{}-{}", timestamp, uuid_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn descriptor() -> UploadDescriptor {
        UploadDescriptor {
            content_type: "audio/webm".to_string(),
            key_extension: "webm".to_string(),
            content_length: 1000,
            distance: "2".to_string(),
            speed: "1".to_string(),
            wake_word: "casita".to_string(),
        }
    }

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn timestamp_is_millisecond_precision_without_colons() {
        let instant = Utc.with_ymd_and_hms(2023, 11, 5, 13, 7, 9).unwrap()
            + chrono::Duration::microseconds(42_999);
        let stamp = key_timestamp(instant);
        assert_eq!(stamp, "2023-11-05T13-07-09.042");
        assert_eq!(stamp.len(), 23);
        assert_eq!(key_timestamp(new_year()), "2024-01-01T00-00-00.000");
    }

    #[test]
    fn user_hash_is_lowercase_sha256_hex() {
        assert_eq!(
            user_hash("").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let hash = user_hash("1.2.3.4").to_string();
        assert_eq!(hash.len(), 64);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(user_hash("1.2.3.4"), user_hash("1.2.3.4"));
    }

    #[test]
    fn derives_documented_key() {
        let key = derive_storage_key(&descriptor(), "1.2.3.4", new_year());
        let expected = format!(
            "casita-2024-01-01T00-00-00.000-2-1-{}.webm",
            hex::encode(Sha256::digest(b"1.2.3.4"))
        );
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn different_clients_get_different_keys() {
        let a = derive_storage_key(&descriptor(), "1.2.3.4", new_year());
        let b = derive_storage_key(&descriptor(), "5.6.7.8", new_year());
        assert_ne!(a, b);
    }

    #[test]
    fn same_inputs_same_instant_collide() {
        let a = derive_storage_key(&descriptor(), "1.2.3.4", new_year());
        let b = derive_storage_key(&descriptor(), "1.2.3.4", new_year());
        assert_eq!(a, b);
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
