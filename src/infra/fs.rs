//! Filesystem-backed image store.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::store::{ImageStore, ImageStream, StoreError};
use crate::domain::images::ImageName;

/// Stores every image as a regular file directly under one root directory.
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn image_path(&self, name: &ImageName) -> PathBuf {
        self.root.join(name.as_str())
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn exists(&self, name: &ImageName) -> Result<bool, StoreError> {
        match fs::metadata(self.image_path(name)).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn store(&self, name: &ImageName, mut payload: ImageStream) -> Result<u64, StoreError> {
        let path = self.image_path(name);
        let mut file = File::create(&path).await?;

        let total_bytes = match copy_payload(&mut file, &mut payload).await {
            Ok(total_bytes) => total_bytes,
            Err(err) => {
                // Do not leave a truncated file behind, whether the stream
                // or the disk failed mid-copy.
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(err);
            }
        };

        debug!(
            target = "scatto::fs",
            path = %path.display(),
            bytes = total_bytes,
            "wrote image file",
        );
        Ok(total_bytes)
    }

    async fn read(&self, name: &ImageName) -> Result<Bytes, StoreError> {
        let contents = fs::read(self.image_path(name)).await?;
        Ok(Bytes::from(contents))
    }
}

async fn copy_payload(file: &mut File, payload: &mut ImageStream) -> Result<u64, StoreError> {
    let mut total_bytes: u64 = 0;

    while let Some(chunk_result) = payload.next().await {
        let chunk = chunk_result?;
        if chunk.is_empty() {
            continue;
        }

        total_bytes = total_bytes
            .checked_add(chunk.len() as u64)
            .ok_or(StoreError::SizeOverflow)?;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use tempfile::TempDir;

    use super::*;

    fn store_in(dir: &TempDir) -> FsImageStore {
        FsImageStore::new(dir.path().to_path_buf()).expect("store should open")
    }

    fn name(value: &str) -> ImageName {
        ImageName::parse(value).expect("valid image name")
    }

    fn chunks(parts: &[&'static [u8]]) -> ImageStream {
        stream::iter(
            parts
                .iter()
                .map(|&part| Ok(Bytes::from_static(part)))
                .collect::<Vec<_>>(),
        )
        .boxed()
    }

    #[tokio::test]
    async fn store_then_read_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        let written = store
            .store(&name("sheep.png"), chunks(&[b"PNG", b"", b"DATA12"]))
            .await
            .expect("store should succeed");
        assert_eq!(written, 9);

        let read = store.read(&name("sheep.png")).await.expect("read back");
        assert_eq!(read.as_ref(), b"PNGDATA12");
    }

    #[tokio::test]
    async fn exists_reflects_stored_files() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let image = name("photo.jpg");

        assert!(!store.exists(&image).await.expect("stat should work"));

        store
            .store(&image, chunks(&[b"JPEGDATA"]))
            .await
            .expect("store should succeed");

        assert!(store.exists(&image).await.expect("stat should work"));
    }

    #[tokio::test]
    async fn list_tracks_directory_contents() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        assert!(store.list().await.expect("list").is_empty());

        store
            .store(&name("a.png"), chunks(&[b"a"]))
            .await
            .expect("store a");
        store
            .store(&name("b.png"), chunks(&[b"b"]))
            .await
            .expect("store b");

        let mut names = store.list().await.expect("list");
        names.sort();
        assert_eq!(names, vec!["a.png".to_string(), "b.png".to_string()]);

        std::fs::remove_file(dir.path().join("a.png")).expect("remove");
        assert_eq!(store.list().await.expect("list"), vec!["b.png".to_string()]);
    }

    #[tokio::test]
    async fn failed_stream_removes_partial_file() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let image = name("broken.png");

        let payload = stream::iter(vec![
            Ok(Bytes::from_static(b"PARTIAL")),
            Err(StoreError::PayloadStream {
                source: "connection reset".into(),
            }),
        ])
        .boxed();

        let result = store.store(&image, payload).await;
        assert!(matches!(result, Err(StoreError::PayloadStream { .. })));
        assert!(!store.exists(&image).await.expect("stat should work"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_write_removes_partial_file() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let image = name("stuck.png");

        // Writes through this name land on /dev/full and fail with ENOSPC.
        std::os::unix::fs::symlink("/dev/full", dir.path().join("stuck.png"))
            .expect("symlink to /dev/full");

        let result = store.store(&image, chunks(&[b"DATA"])).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn store_replaces_existing_content() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        let image = name("replace.png");

        store
            .store(&image, chunks(&[b"first version"]))
            .await
            .expect("store first");
        store
            .store(&image, chunks(&[b"second"]))
            .await
            .expect("store second");

        let read = store.read(&image).await.expect("read back");
        assert_eq!(read.as_ref(), b"second");
    }
}
