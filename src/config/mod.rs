//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU64, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "scatto";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3002;
const DEFAULT_TEMPLATE_DIR: &str = "templates";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_STATIC_ROUTE_PREFIX: &str = "/static";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 32 * 1024 * 1024;
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3002/";

/// Command-line arguments for the Scatto binary.
#[derive(Debug, Parser)]
#[command(name = "scatto", version, about = "Scatto photo hosting server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SCATTO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Scatto HTTP service.
    Serve(Box<ServeArgs>),
    /// Upload a file to a running Scatto server.
    #[command(name = "upload")]
    Upload(UploadArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the template directory.
    #[arg(long = "templates-directory", value_name = "PATH")]
    pub templates_directory: Option<PathBuf>,

    /// Override the uploads directory.
    #[arg(long = "uploads-directory", value_name = "PATH")]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Override the static asset directory.
    #[arg(long = "static-directory", value_name = "PATH")]
    pub static_directory: Option<PathBuf>,

    /// Override the URL prefix the static asset directory is served under.
    #[arg(long = "static-route-prefix", value_name = "PREFIX")]
    pub static_route_prefix: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct UploadArgs {
    /// Path of the file to upload.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Base URL of the target server.
    #[arg(
        long = "server",
        env = "SCATTO_SERVER",
        value_name = "URL",
        default_value = DEFAULT_SERVER_URL
    )]
    pub server: String,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub templates: TemplateSettings,
    pub uploads: UploadSettings,
    pub static_assets: StaticSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct TemplateSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub directory: PathBuf,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct StaticSettings {
    pub directory: PathBuf,
    pub route_prefix: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SCATTO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Upload(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    templates: RawTemplateSettings,
    uploads: RawUploadSettings,
    static_assets: RawStaticSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(directory) = overrides.templates_directory.as_ref() {
            self.templates.directory = Some(directory.clone());
        }
        if let Some(directory) = overrides.uploads_directory.as_ref() {
            self.uploads.directory = Some(directory.clone());
        }
        if let Some(limit) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(limit);
        }
        if let Some(directory) = overrides.static_directory.as_ref() {
            self.static_assets.directory = Some(directory.clone());
        }
        if let Some(prefix) = overrides.static_route_prefix.as_ref() {
            self.static_assets.route_prefix = Some(prefix.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            templates,
            uploads,
            static_assets,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let templates = build_template_settings(templates)?;
        let uploads = build_upload_settings(uploads)?;
        let static_assets = build_static_settings(static_assets)?;

        Ok(Self {
            server,
            logging,
            templates,
            uploads,
            static_assets,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_template_settings(templates: RawTemplateSettings) -> Result<TemplateSettings, LoadError> {
    let directory = templates
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "templates.directory",
            "path must not be empty",
        ));
    }

    Ok(TemplateSettings { directory })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let directory = uploads
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "uploads.directory",
            "path must not be empty",
        ));
    }

    let max_request_bytes_value = uploads
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("uploads.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "uploads.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(UploadSettings {
        directory,
        max_request_bytes,
    })
}

fn build_static_settings(static_assets: RawStaticSettings) -> Result<StaticSettings, LoadError> {
    let directory = static_assets
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "static_assets.directory",
            "path must not be empty",
        ));
    }

    let route_prefix = static_assets
        .route_prefix
        .unwrap_or_else(|| DEFAULT_STATIC_ROUTE_PREFIX.to_string());
    if !route_prefix.starts_with('/') || route_prefix == "/" || route_prefix.ends_with('/') {
        return Err(LoadError::invalid(
            "static_assets.route_prefix",
            "prefix must name a sub-path without a trailing `/`",
        ));
    }

    Ok(StaticSettings {
        directory,
        route_prefix,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTemplateSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    directory: Option<PathBuf>,
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStaticSettings {
    directory: Option<PathBuf>,
    route_prefix: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
