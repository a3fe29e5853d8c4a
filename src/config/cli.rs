use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::types::CompileFlavor;

/// Command-line arguments for the notepress binary.
#[derive(Debug, Parser)]
#[command(
    name = "notepress",
    version,
    about = "Notes backend with LaTeX and Typst compilation"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "NOTEPRESS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Compile a local LaTeX or Typst file to PDF.
    Compile(CompileArgs),
    /// Apply the embedded database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CompileOverrides {
    /// Override the LaTeX compiler executable.
    #[arg(long = "compile-latex-program", value_name = "PATH")]
    pub latex_program: Option<PathBuf>,

    /// Override the Typst compiler executable.
    #[arg(long = "compile-typst-program", value_name = "PATH")]
    pub typst_program: Option<PathBuf>,

    /// Override the per-call compiler timeout.
    #[arg(long = "compile-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the number of compiler processes allowed to run at once.
    #[arg(long = "compile-max-concurrent", value_name = "COUNT")]
    pub max_concurrent: Option<u64>,

    /// Directory hosting the per-call compile workspaces.
    #[arg(long = "compile-workspace-root", value_name = "PATH")]
    pub workspace_root: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub compile: CompileOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the blob storage directory.
    #[arg(long = "storage-directory", value_name = "PATH")]
    pub storage_directory: Option<PathBuf>,

    /// Override the bucket holding document content.
    #[arg(long = "storage-bucket", value_name = "NAME")]
    pub storage_bucket: Option<String>,

    /// Override the maximum document request size in bytes.
    #[arg(long = "storage-max-request-bytes", value_name = "BYTES")]
    pub storage_max_request_bytes: Option<u64>,

    /// Override the maximum compile request size in bytes.
    #[arg(long = "compile-max-request-bytes", value_name = "BYTES")]
    pub compile_max_request_bytes: Option<u64>,

    /// Override the session token lifetime.
    #[arg(long = "auth-token-ttl-hours", value_name = "HOURS")]
    pub auth_token_ttl_hours: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct CompileArgs {
    #[command(flatten)]
    pub overrides: CompileOverrides,

    /// Markup flavor; inferred from the input extension when omitted.
    #[arg(long, value_enum)]
    pub flavor: Option<CompileFlavor>,

    /// Output PDF path; defaults to the input path with a `.pdf` extension.
    #[arg(long, short, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Source file to compile.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
}

impl CompileArgs {
    pub fn resolve_flavor(&self) -> Option<CompileFlavor> {
        self.flavor.or_else(|| {
            self.input
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| ext.to_ascii_lowercase().parse().ok())
        })
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("pdf"))
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}
