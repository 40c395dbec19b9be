use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
    routing::get,
};
use metrics_util::debugging::DebuggingRecorder;
use tempfile::TempDir;
use tower::ServiceExt;

use scatto::application::gallery::GalleryService;
use scatto::config::StaticSettings;
use scatto::infra::fs::FsImageStore;
use scatto::infra::http::{HttpState, build_router, recovery_layer};
use scatto::infra::templates::TemplateRegistry;

const BOUNDARY: &str = "scatto-metrics-boundary";

fn write_templates(dir: &Path) {
    std::fs::write(
        dir.join("list.html"),
        "<ul>{% for image in images %}<li>{{ image }}</li>{% endfor %}</ul>",
    )
    .expect("write list template");
    std::fs::write(dir.join("upload.html"), "<form>{{ token }}</form>")
        .expect("write upload template");
    std::fs::write(dir.join("error.html"), "<p>error: {{ error }}</p>")
        .expect("write error template");
}

fn upload_request(filename: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}

async fn boom() -> Response {
    panic!("metrics panic probe")
}

#[tokio::test]
async fn gallery_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let templates = TempDir::new().expect("templates tempdir");
    write_templates(templates.path());
    let statics = TempDir::new().expect("statics tempdir");
    let uploads = TempDir::new().expect("uploads tempdir");

    let registry = Arc::new(TemplateRegistry::load(templates.path()).expect("templates load"));
    let store =
        FsImageStore::new(uploads.path().to_path_buf()).expect("filesystem store should open");
    let state = HttpState {
        gallery: Arc::new(GalleryService::new(Arc::new(store))),
        templates: registry.clone(),
    };
    let static_assets = StaticSettings {
        directory: statics.path().to_path_buf(),
        route_prefix: "/static".to_string(),
    };
    let app = build_router(state, &static_assets, 32 * 1024 * 1024);

    // Upload and view drive the gallery counters.
    let upload = app
        .clone()
        .oneshot(upload_request("metric.png", b"PNGDATA12"))
        .await
        .expect("router should respond");
    assert_eq!(upload.status(), StatusCode::FOUND);

    let view = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/views?id=metric.png")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    assert_eq!(view.status(), StatusCode::OK);

    // A panicking handler drives the recovery counter.
    let panicky = Router::new()
        .route("/boom", get(boom))
        .layer(recovery_layer(registry));
    let recovered = panicky
        .oneshot(
            Request::builder()
                .uri("/boom")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    assert_eq!(recovered.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "scatto_uploads_total",
        "scatto_upload_bytes_total",
        "scatto_image_views_total",
        "scatto_recovered_panics_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
