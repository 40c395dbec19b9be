//! Public router and page handlers.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::multipart::Multipart;
use futures::StreamExt;
use serde::Deserialize;
use tower_http::services::ServeDir;
use tracing::error;

use crate::application::error::{ErrorReport, PageError};
use crate::application::gallery::{GalleryService, ImageContent, upload_form_token};
use crate::application::store::StoreError;
use crate::config::StaticSettings;
use crate::domain::images::ImageName;
use crate::infra::http::middleware::{log_responses, set_request_context};
use crate::infra::http::multipart::{ImagePayload, read_image_payload};
use crate::infra::http::recovery::recovery_layer;
use crate::infra::templates::TemplateRegistry;
use crate::presentation::views::{
    LIST_TEMPLATE, ListPage, UPLOAD_TEMPLATE, UploadPage, render_error_page, render_page_response,
};

#[derive(Clone)]
pub struct HttpState {
    pub gallery: Arc<GalleryService>,
    pub templates: Arc<TemplateRegistry>,
}

pub fn build_router(
    state: HttpState,
    static_assets: &StaticSettings,
    upload_body_limit: usize,
) -> Router {
    let templates = state.templates.clone();
    Router::new()
        .route("/", get(index))
        .route("/upload", get(upload_form).post(store_upload))
        .route("/views", get(view_image))
        .nest_service(
            static_assets.route_prefix.as_str(),
            ServeDir::new(&static_assets.directory),
        )
        .layer(DefaultBodyLimit::max(upload_body_limit))
        .with_state(state)
        .layer(recovery_layer(templates))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewQuery {
    id: Option<String>,
}

async fn index(State(state): State<HttpState>) -> Response {
    match state.gallery.images().await {
        Ok(images) => render_page_response(
            &state.templates,
            LIST_TEMPLATE,
            &ListPage { images },
            StatusCode::OK,
        ),
        Err(err) => page_error_response(
            &state.templates,
            "infra::http::pages::index",
            PageError::from(err),
        ),
    }
}

async fn upload_form(State(state): State<HttpState>) -> Response {
    let view = UploadPage {
        token: upload_form_token(),
    };
    render_page_response(&state.templates, UPLOAD_TEMPLATE, &view, StatusCode::OK)
}

async fn store_upload(State(state): State<HttpState>, mut multipart: Multipart) -> Response {
    const SOURCE: &str = "infra::http::pages::store_upload";

    let ImagePayload { name, field } = match read_image_payload(&mut multipart).await {
        Ok(payload) => payload,
        Err(err) => return page_error_response(&state.templates, SOURCE, PageError::from(err)),
    };

    let stream = field
        .map(|result| {
            result.map_err(|err| {
                if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StoreError::PayloadTooLarge {
                        source: Box::new(err),
                    }
                } else {
                    StoreError::PayloadStream {
                        source: Box::new(err),
                    }
                }
            })
        })
        .boxed();

    match state.gallery.store_image(&name, stream).await {
        Ok(stored) => redirect_to_view(&stored.name),
        Err(err) => page_error_response(&state.templates, SOURCE, PageError::from(err)),
    }
}

async fn view_image(State(state): State<HttpState>, Query(query): Query<ViewQuery>) -> Response {
    const SOURCE: &str = "infra::http::pages::view_image";

    let Some(id) = query.id.as_deref().filter(|id| !id.is_empty()) else {
        return page_error_response(
            &state.templates,
            SOURCE,
            PageError::validation("missing `id` query parameter"),
        );
    };

    let name = match ImageName::parse(id) {
        Ok(name) => name,
        // An id that can never name a stored file is indistinguishable
        // from a missing image to the caller.
        Err(_) => return page_error_response(&state.templates, SOURCE, PageError::not_found(id)),
    };

    match state.gallery.fetch_image(&name).await {
        Ok(Some(content)) => build_image_response(content),
        Ok(None) => page_error_response(&state.templates, SOURCE, PageError::not_found(id)),
        Err(err) => page_error_response(&state.templates, SOURCE, PageError::from(err)),
    }
}

/// 302 to the canonical view URL of a freshly stored image.
fn redirect_to_view(name: &str) -> Response {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id", name)
        .finish();
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, format!("/views?{query}"))
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn build_image_response(content: ImageContent) -> Response {
    let length = content.bytes.len();
    let mut response = Response::new(Body::from(content.bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content.content_type));
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    response
}

fn page_error_response(
    templates: &TemplateRegistry,
    source: &'static str,
    err: PageError,
) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(
            target = "scatto::http::pages",
            source = source,
            error = %err,
            "request failed",
        );
    }

    let mut response = render_error_page(templates, status, &err.presentation_message());
    ErrorReport::from_error(source, status, &err).attach(&mut response);
    response
}
