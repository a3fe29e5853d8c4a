//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{
    CliArgs, Command, CompileArgs, CompileOverrides, DatabaseOverride, MigrateArgs, ServeArgs,
    ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "notepress";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_STORAGE_DIR: &str = "storage";
const DEFAULT_STORAGE_BUCKET: &str = "documents";
const DEFAULT_STORAGE_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;
const MIN_JWT_SECRET_BYTES: usize = 16;
const DEFAULT_LATEX_PROGRAM: &str = "pdflatex";
const DEFAULT_TYPST_PROGRAM: &str = "typst";
const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_COMPILE_REQUEST_LIMIT_BYTES: u64 = 2 * 1024 * 1024;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub compile: CompileSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub directory: PathBuf,
    pub bucket: String,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Clone)]
pub struct AuthSettings {
    /// Required by `serve`; other commands never sign tokens.
    pub jwt_secret: Option<String>,
    pub token_ttl: time::Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CompileSettings {
    pub latex_program: PathBuf,
    pub typst_program: PathBuf,
    pub timeout: Duration,
    pub max_concurrent: NonZeroUsize,
    pub workspace_root: Option<PathBuf>,
    pub max_request_bytes: NonZeroU64,
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

    builder = builder.add_source(Environment::with_prefix("NOTEPRESS").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Compile(args)) => raw.apply_compile_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    storage: RawStorageSettings,
    auth: RawAuthSettings,
    compile: RawCompileSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(directory) = overrides.storage_directory.as_ref() {
            self.storage.directory = Some(directory.clone());
        }
        if let Some(bucket) = overrides.storage_bucket.as_ref() {
            self.storage.bucket = Some(bucket.clone());
        }
        if let Some(limit) = overrides.storage_max_request_bytes {
            self.storage.max_request_bytes = Some(limit);
        }
        if let Some(limit) = overrides.compile_max_request_bytes {
            self.compile.max_request_bytes = Some(limit);
        }
        if let Some(hours) = overrides.auth_token_ttl_hours {
            self.auth.token_ttl_hours = Some(hours);
        }

        self.apply_compile_overrides(&overrides.compile);
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }

    fn apply_compile_overrides(&mut self, overrides: &CompileOverrides) {
        if let Some(path) = overrides.latex_program.as_ref() {
            self.compile.latex_program = Some(path.clone());
        }
        if let Some(path) = overrides.typst_program.as_ref() {
            self.compile.typst_program = Some(path.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.compile.timeout_seconds = Some(seconds);
        }
        if let Some(max) = overrides.max_concurrent {
            self.compile.max_concurrent = Some(max);
        }
        if let Some(root) = overrides.workspace_root.as_ref() {
            self.compile.workspace_root = Some(root.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            storage,
            auth,
            compile,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            storage: build_storage_settings(storage)?,
            auth: build_auth_settings(auth)?,
            compile: build_compile_settings(compile)?,
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

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let directory = storage
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.directory",
            "path must not be empty",
        ));
    }

    let bucket = storage
        .bucket
        .map(|bucket| bucket.trim().to_string())
        .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string());
    if bucket.is_empty() || bucket == "." || bucket == ".." || bucket.contains(['/', '\\']) {
        return Err(LoadError::invalid(
            "storage.bucket",
            "must be a single non-empty path segment",
        ));
    }

    let max_request_bytes = request_limit(
        storage
            .max_request_bytes
            .unwrap_or(DEFAULT_STORAGE_REQUEST_LIMIT_BYTES),
        "storage.max_request_bytes",
    )?;

    Ok(StorageSettings {
        directory,
        bucket,
        max_request_bytes,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let jwt_secret = auth.jwt_secret.filter(|secret| !secret.is_empty());
    if jwt_secret
        .as_ref()
        .is_some_and(|secret| secret.len() < MIN_JWT_SECRET_BYTES)
    {
        return Err(LoadError::invalid(
            "auth.jwt_secret",
            format!("must be at least {MIN_JWT_SECRET_BYTES} bytes"),
        ));
    }

    let hours = auth.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS);
    if hours == 0 {
        return Err(LoadError::invalid(
            "auth.token_ttl_hours",
            "must be greater than zero",
        ));
    }
    let hours = i64::try_from(hours)
        .map_err(|_| LoadError::invalid("auth.token_ttl_hours", "value out of range"))?;

    Ok(AuthSettings {
        jwt_secret,
        token_ttl: time::Duration::hours(hours),
    })
}

fn build_compile_settings(compile: RawCompileSettings) -> Result<CompileSettings, LoadError> {
    let latex_program = compile
        .latex_program
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LATEX_PROGRAM));
    if latex_program.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "compile.latex_program",
            "path must not be empty",
        ));
    }

    let typst_program = compile
        .typst_program
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TYPST_PROGRAM));
    if typst_program.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "compile.typst_program",
            "path must not be empty",
        ));
    }

    let timeout_secs = compile
        .timeout_seconds
        .unwrap_or(DEFAULT_COMPILE_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "compile.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let max_concurrent = match compile.max_concurrent {
        Some(value) => usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                LoadError::invalid(
                    "compile.max_concurrent",
                    "must be greater than zero and fit in usize",
                )
            })?,
        None => std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
    };

    let workspace_root = compile
        .workspace_root
        .filter(|path| !path.as_os_str().is_empty());

    let max_request_bytes = request_limit(
        compile
            .max_request_bytes
            .unwrap_or(DEFAULT_COMPILE_REQUEST_LIMIT_BYTES),
        "compile.max_request_bytes",
    )?;

    Ok(CompileSettings {
        latex_program,
        typst_program,
        timeout: Duration::from_secs(timeout_secs),
        max_concurrent,
        workspace_root,
        max_request_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    directory: Option<PathBuf>,
    bucket: Option<String>,
    max_request_bytes: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    jwt_secret: Option<String>,
    token_ttl_hours: Option<u64>,
}

impl std::fmt::Debug for RawAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawAuthSettings")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCompileSettings {
    latex_program: Option<PathBuf>,
    typst_program: Option<PathBuf>,
    timeout_seconds: Option<u64>,
    max_concurrent: Option<u64>,
    workspace_root: Option<PathBuf>,
    max_request_bytes: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn request_limit(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    let limit = NonZeroU64::new(value)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))?;
    usize::try_from(value)
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    Ok(limit)
}

#[cfg(test)]
mod tests;
