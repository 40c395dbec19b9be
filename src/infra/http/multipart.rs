//! Extraction of the image payload from a multipart upload request.

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Field, Multipart, MultipartError};
use thiserror::Error;

use crate::application::error::PageError;
use crate::domain::images::{ImageName, ImageNameError};

/// Field names that may carry the image. Browser forms post `image`; the
/// bundled upload client sends `uploadFile`.
const FILE_FIELDS: [&str; 2] = ["image", "uploadFile"];

pub struct ImagePayload {
    pub name: ImageName,
    pub field: Field,
}

#[derive(Debug, Error)]
pub enum UploadPayloadError {
    #[error("multipart form did not contain an image field")]
    MissingField,
    #[error("image field did not carry a filename")]
    MissingFilename,
    #[error("invalid image filename")]
    InvalidName(#[from] ImageNameError),
    #[error("upload request exceeded the body limit")]
    TooLarge {
        #[source]
        source: MultipartError,
    },
    #[error("multipart form data could not be read")]
    Malformed {
        #[source]
        source: MultipartError,
    },
}

impl From<UploadPayloadError> for PageError {
    fn from(err: UploadPayloadError) -> Self {
        match err {
            UploadPayloadError::TooLarge { .. } => PageError::PayloadTooLarge,
            other => PageError::validation(other.to_string()),
        }
    }
}

/// Advance the multipart form until the image field is found, skipping any
/// other fields (the upload form also posts a decorative token).
pub async fn read_image_payload(
    multipart: &mut Multipart,
) -> Result<ImagePayload, UploadPayloadError> {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                match field.name() {
                    Some(name) if FILE_FIELDS.contains(&name) => {}
                    _ => continue,
                }

                let filename = field
                    .file_name()
                    .map(str::to_owned)
                    .filter(|value| !value.trim().is_empty())
                    .ok_or(UploadPayloadError::MissingFilename)?;
                let name = ImageName::parse(&filename)?;
                return Ok(ImagePayload { name, field });
            }
            Ok(None) => return Err(UploadPayloadError::MissingField),
            Err(err) => {
                return Err(if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    UploadPayloadError::TooLarge { source: err }
                } else {
                    UploadPayloadError::Malformed { source: err }
                });
            }
        }
    }
}
