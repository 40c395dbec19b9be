use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{
    application::store::StoreError, infra::error::InfraError, infra::templates::TemplateError,
};

/// Diagnostic attached to error responses so the response logger can report
/// the originating module and the full error chain.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures that abort the process during startup or a subcommand run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

/// Failures produced while serving a page request.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("image `{name}` was not found")]
    NotFound { name: String },
    #[error("{message}")]
    Validation { message: String },
    #[error("upload exceeds the configured body limit")]
    PayloadTooLarge,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] TemplateError),
}

impl PageError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PageError::NotFound { .. } => StatusCode::NOT_FOUND,
            PageError::Validation { .. } => StatusCode::BAD_REQUEST,
            PageError::PayloadTooLarge
            | PageError::Store(StoreError::PayloadTooLarge { .. })
            | PageError::Store(StoreError::SizeOverflow) => StatusCode::PAYLOAD_TOO_LARGE,
            PageError::Store(_) | PageError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn presentation_message(&self) -> String {
        match self {
            PageError::NotFound { name } => format!("Image `{name}` was not found"),
            PageError::Validation { message } => message.clone(),
            PageError::PayloadTooLarge
            | PageError::Store(StoreError::PayloadTooLarge { .. })
            | PageError::Store(StoreError::SizeOverflow) => {
                "Uploaded file is too large".to_string()
            }
            PageError::Store(_) => "Could not access stored images".to_string(),
            PageError::Render(_) => "Page rendering failed".to_string(),
        }
    }
}
