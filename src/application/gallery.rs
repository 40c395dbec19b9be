//! Gallery service: the application-level operations behind the public pages.

use std::io::ErrorKind;
use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::application::store::{ImageStore, ImageStream, StoreError};
use crate::domain::images::{ImageName, sniff_content_type};

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub name: String,
    pub size_bytes: u64,
}

/// A stored payload together with its sniffed content type.
#[derive(Debug, Clone)]
pub struct ImageContent {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

#[derive(Clone)]
pub struct GalleryService {
    store: Arc<dyn ImageStore>,
}

impl GalleryService {
    pub fn new(store: Arc<dyn ImageStore>) -> Self {
        Self { store }
    }

    /// Filenames of every stored image, in backend order.
    pub async fn images(&self) -> Result<Vec<String>, StoreError> {
        self.store.list().await
    }

    pub async fn store_image(
        &self,
        name: &ImageName,
        payload: ImageStream,
    ) -> Result<StoredImage, StoreError> {
        let size_bytes = self.store.store(name, payload).await?;

        counter!("scatto_uploads_total").increment(1);
        counter!("scatto_upload_bytes_total").increment(size_bytes);
        debug!(
            target = "scatto::gallery",
            name = %name,
            size_bytes = size_bytes,
            "stored image",
        );

        Ok(StoredImage {
            name: name.as_str().to_string(),
            size_bytes,
        })
    }

    /// Fetch a stored image, or `None` when nothing is stored under `name`.
    pub async fn fetch_image(&self, name: &ImageName) -> Result<Option<ImageContent>, StoreError> {
        if !self.store.exists(name).await? {
            return Ok(None);
        }

        let bytes = match self.store.read(name).await {
            Ok(bytes) => bytes,
            // The image can disappear between the existence check and the
            // read; fold that race into the not-found case.
            Err(StoreError::Io(err)) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        let content_type = sniff_content_type(&bytes);
        counter!("scatto_image_views_total").increment(1);

        Ok(Some(ImageContent {
            bytes,
            content_type,
        }))
    }
}

/// Decorative token shown in the upload form. Displayed only, never verified.
pub fn upload_form_token() -> String {
    let timestamp = time::OffsetDateTime::now_utc().unix_timestamp();
    let digest = Sha256::digest(timestamp.to_string().as_bytes());
    hex::encode(digest)
}
