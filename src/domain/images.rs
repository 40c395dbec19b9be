//! Image naming rules and content-type sniffing.

use std::fmt;
use std::path::{Component, Path};

use serde::Serialize;
use thiserror::Error;

/// Number of leading bytes inspected when sniffing a payload's content type.
const SNIFF_WINDOW: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageNameError {
    #[error("image name is empty")]
    Empty,
    #[error("image name must be a plain filename")]
    NotAFilename,
}

/// A validated image filename: a single non-empty path segment with no
/// separators, so joining it under the storage root can never escape it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageName(String);

impl ImageName {
    pub fn parse(candidate: &str) -> Result<Self, ImageNameError> {
        if candidate.is_empty() {
            return Err(ImageNameError::Empty);
        }
        if candidate.contains(['/', '\\']) {
            return Err(ImageNameError::NotAFilename);
        }

        let mut components = Path::new(candidate).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(Self(candidate.to_string())),
            _ => Err(ImageNameError::NotAFilename),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guess a Content-Type from the first bytes of a stored payload.
///
/// Recognized raster formats map to their image types; anything that still
/// looks like text falls back to `text/plain` and the rest is served as an
/// opaque octet stream.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let window = &data[..data.len().min(SNIFF_WINDOW)];

    if let Ok(kind) = imagesize::image_type(window) {
        match kind {
            imagesize::ImageType::Png => return "image/png",
            imagesize::ImageType::Jpeg => return "image/jpeg",
            imagesize::ImageType::Gif => return "image/gif",
            imagesize::ImageType::Webp => return "image/webp",
            imagesize::ImageType::Bmp => return "image/bmp",
            imagesize::ImageType::Tiff => return "image/tiff",
            imagesize::ImageType::Ico => return "image/x-icon",
            _ => {}
        }
    }

    if looks_textual(window) {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn looks_textual(window: &[u8]) -> bool {
    window
        .iter()
        .all(|&byte| !matches!(byte, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F))
}
