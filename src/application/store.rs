//! Storage seam for image payloads.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::domain::images::ImageName;

/// Byte chunks of an incoming upload, already mapped into store errors.
pub type ImageStream = BoxStream<'static, Result<Bytes, StoreError>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("upload payload exceeds the configured body limit")]
    PayloadTooLarge {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("upload payload stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("upload payload size exceeds supported range")]
    SizeOverflow,
}

/// Backing store for uploaded images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Report whether `name` currently resolves to a stored image. Backed by a
    /// stat call, so a missing file is `Ok(false)` rather than an error.
    async fn exists(&self, name: &ImageName) -> Result<bool, StoreError>;

    /// List stored image filenames in whatever order the backend yields them.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Persist `payload` under `name`, replacing any previous content.
    /// Returns the number of bytes written.
    async fn store(&self, name: &ImageName, payload: ImageStream) -> Result<u64, StoreError>;

    /// Read the full payload stored under `name`.
    async fn read(&self, name: &ImageName) -> Result<Bytes, StoreError>;
}
