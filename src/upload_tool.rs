//! One-shot upload client for a running Scatto server.

use std::io;

use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::info;
use url::Url;

use scatto::config::UploadArgs;

#[derive(Debug, Error)]
pub enum UploadToolError {
    #[error("failed to read `{path}`")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid server URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("upload request failed")]
    Request(#[from] reqwest::Error),
    #[error("server rejected the upload with status {status}")]
    Rejected { status: u16 },
}

/// Post the file as multipart form data and print the server's response.
pub async fn upload_file(args: &UploadArgs) -> Result<(), UploadToolError> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .map_err(|source| UploadToolError::ReadFile {
            path: args.file.display().to_string(),
            source,
        })?;

    let filename = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = mime_guess::from_path(&args.file).first_or_octet_stream();

    let endpoint =
        upload_endpoint(&args.server).map_err(|source| UploadToolError::InvalidUrl {
            url: args.server.clone(),
            source,
        })?;

    info!(
        target = "scatto::upload_tool",
        file = %args.file.display(),
        endpoint = %endpoint,
        bytes = bytes.len(),
        "uploading file",
    );

    let part = Part::bytes(bytes)
        .file_name(filename)
        .mime_str(mime.as_ref())?;
    let form = Form::new().part("uploadFile", part);

    let client = reqwest::Client::new();
    let response = client.post(endpoint).multipart(form).send().await?;

    let status = response.status();
    let body = response.text().await?;
    println!("{status}");
    println!("{body}");

    if !(status.is_success() || status.is_redirection()) {
        return Err(UploadToolError::Rejected {
            status: status.as_u16(),
        });
    }

    Ok(())
}

/// Resolve the upload route under the server URL. The base path is treated as
/// a directory, so `http://host/app` posts to `/app/upload` rather than
/// `/upload`.
fn upload_endpoint(server: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(server)?;
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join("upload")
}
