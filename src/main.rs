use std::{process, sync::Arc};

use scatto::{
    application::{error::AppError, gallery::GalleryService},
    config,
    infra::{
        error::InfraError,
        fs::FsImageStore,
        http::{HttpState, build_router},
        telemetry,
        templates::TemplateRegistry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

mod upload_tool;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Upload(args) => upload_tool::upload_file(&args)
            .await
            .map_err(|err| AppError::unexpected(err.to_string())),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let templates = TemplateRegistry::load(&settings.templates.directory)?;
    info!(
        target = "scatto::startup",
        directory = %settings.templates.directory.display(),
        templates = templates.len(),
        "loaded template registry",
    );

    let store = FsImageStore::new(settings.uploads.directory.clone())
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    let state = HttpState {
        gallery: Arc::new(GalleryService::new(Arc::new(store))),
        templates: Arc::new(templates),
    };

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let upload_body_limit = settings.uploads.max_request_bytes.get() as usize;
    let router = build_router(state, &settings.static_assets, upload_body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "scatto::startup",
        addr = %settings.server.addr,
        "listening",
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
