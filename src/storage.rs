//! # Blob Storage
//!
//! The store writer seam of the upload pipeline. The pipeline only depends on
//! [`BlobStore`]; the worker wires in [`R2BlobStore`], tests use an in-memory store.
//!
//! A write is attempted exactly once per accepted upload. There are no retries and
//! no compensating actions: if the client aborts mid-stream the object is simply
//! not written.

use async_trait::async_trait;
use worker::{Bucket, ByteStream, FixedLengthStream};

use crate::errors::{AppError, AppResult};
use crate::models::{StorageKey, StoredUpload};

/// Put-by-key blob storage.
///
/// Workers futures are not `Send`, hence `?Send`.
#[async_trait(?Send)]
pub trait BlobStore {
    /// Body handed over from the transport on acceptance.
    type Body;

    /// Writes `body` under `key`. `content_length` is the validated declared length.
    async fn put(
        &self,
        key: &StorageKey,
        body: Self::Body,
        content_length: u64,
    ) -> AppResult<StoredUpload>;
}

#[async_trait(?Send)]
impl<T: BlobStore> BlobStore for &T {
    type Body = T::Body;

    async fn put(
        &self,
        key: &StorageKey,
        body: Self::Body,
        content_length: u64,
    ) -> AppResult<StoredUpload> {
        (**self).put(key, body, content_length).await
    }
}

/// R2 bucket binding.
///
/// The request body is streamed into R2 without buffering. R2 needs to know the
/// length of a streamed upload up front, so the stream is wrapped in a
/// [`FixedLengthStream`] sized by the declared `content-length`; a body that does
/// not match it fails the write.
pub struct R2BlobStore {
    bucket: Bucket,
}

impl R2BlobStore {
    pub fn new(bucket: Bucket) -> Self {
        Self { bucket }
    }
}

#[async_trait(?Send)]
impl BlobStore for R2BlobStore {
    type Body = Option<ByteStream>;

    async fn put(
        &self,
        key: &StorageKey,
        body: Self::Body,
        content_length: u64,
    ) -> AppResult<StoredUpload> {
        let builder = match body {
            Some(stream) => self
                .bucket
                .put(key.as_str(), FixedLengthStream::wrap(stream, content_length)),
            None => self.bucket.put(key.as_str(), Vec::<u8>::new()),
        };

        builder
            .execute()
            .await
            .map_err(|e| AppError::storage(key.as_str(), e))?;

        Ok(StoredUpload { key: key.clone() })
    }
}
