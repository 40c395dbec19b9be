use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

use crate::application::error::ErrorReport;
use crate::infra::templates::{TemplateError, TemplateRegistry};

pub const LIST_TEMPLATE: &str = "list";
pub const UPLOAD_TEMPLATE: &str = "upload";
pub const ERROR_TEMPLATE: &str = "error";

#[derive(Debug, Serialize)]
pub struct ListPage {
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadPage {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorPage {
    pub error: String,
}

pub fn render_page<T: Serialize>(
    templates: &TemplateRegistry,
    name: &str,
    view: &T,
) -> Result<Html<String>, TemplateError> {
    let context = tera::Context::from_serialize(view).map_err(|source| TemplateError::Context {
        name: name.to_string(),
        source,
    })?;
    templates.render(name, &context).map(Html)
}

/// Render a page, falling back to the error page when rendering fails.
pub fn render_page_response<T: Serialize>(
    templates: &TemplateRegistry,
    name: &str,
    view: &T,
    status: StatusCode,
) -> Response {
    match render_page(templates, name, view) {
        Ok(html) => (status, html).into_response(),
        Err(err) => {
            let mut response = render_error_page(
                templates,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Page rendering failed",
            );
            ErrorReport::from_error(
                "presentation::views::render_page_response",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Render the error page with the given status. When even the error template
/// cannot render, degrade to a plain-text body so the response still carries
/// the detail.
pub fn render_error_page(templates: &TemplateRegistry, status: StatusCode, detail: &str) -> Response {
    let view = ErrorPage {
        error: detail.to_string(),
    };
    match render_page(templates, ERROR_TEMPLATE, &view) {
        Ok(html) => (status, html).into_response(),
        Err(err) => {
            warn!(
                target = "scatto::presentation",
                error = %err,
                "error template unavailable, falling back to plain text",
            );
            (status, detail.to_string()).into_response()
        }
    }
}
