//! Panic recovery: a handler panic becomes a rendered 500 page.

use std::any::Any;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use metrics::counter;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tracing::error;

use crate::application::error::ErrorReport;
use crate::infra::templates::TemplateRegistry;
use crate::presentation::views::render_error_page;

pub fn recovery_layer(templates: Arc<TemplateRegistry>) -> CatchPanicLayer<PanicResponder> {
    CatchPanicLayer::custom(PanicResponder { templates })
}

#[derive(Clone)]
pub struct PanicResponder {
    templates: Arc<TemplateRegistry>,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let detail = panic_detail(err.as_ref());
        error!(
            target = "scatto::http::recovery",
            detail = %detail,
            "recovered from handler panic",
        );
        counter!("scatto_recovered_panics_total").increment(1);

        let mut response =
            render_error_page(&self.templates, StatusCode::INTERNAL_SERVER_ERROR, &detail);
        ErrorReport::from_message(
            "infra::http::recovery",
            StatusCode::INTERNAL_SERVER_ERROR,
            detail,
        )
        .attach(&mut response);
        response
    }
}

fn panic_detail(err: &(dyn Any + Send)) -> String {
    if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "request handler panicked".to_string()
    }
}
