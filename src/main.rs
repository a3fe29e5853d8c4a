use std::{future::IntoFuture, process, sync::Arc};

use notepress::{
    application::{
        accounts::{AccountService, TokenSigner},
        compile::{CompileService, CompilerConfig},
        documents::DocumentService,
        error::AppError,
        repos::{DocumentsRepo, HealthRepo, TodosRepo, UsersRepo},
        storage::BlobStore,
        todos::TodoService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, RequestLimits},
        storage::FilesystemBlobStore,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
        config::Command::Compile(args) => run_compile(settings, args).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let jwt_secret = settings.auth.jwt_secret.as_deref().ok_or_else(|| {
        AppError::validation(
            "jwt secret is required (set NOTEPRESS__AUTH__JWT_SECRET or auth.jwt_secret)",
        )
    })?;

    let repositories = init_repositories(&settings).await?;

    let blobs = FilesystemBlobStore::new(settings.storage.directory.clone())
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    blobs
        .ensure_bucket(&settings.storage.bucket)
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let documents_repo: Arc<dyn DocumentsRepo> = repositories.clone();
    let todos_repo: Arc<dyn TodosRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;
    let blobs: Arc<dyn BlobStore> = Arc::new(blobs);

    let signer = TokenSigner::new(jwt_secret.as_bytes(), settings.auth.token_ttl);
    let state = ApiState {
        accounts: Arc::new(AccountService::new(users_repo, signer)),
        documents: Arc::new(DocumentService::new(
            documents_repo,
            blobs,
            settings.storage.bucket.clone(),
        )),
        todos: Arc::new(TodoService::new(todos_repo)),
        compiler: Arc::new(CompileService::new(CompilerConfig::from(&settings.compile))),
        health: health_repo,
        limits: request_limits(&settings)?,
    };

    serve_http(&settings, state).await
}

async fn run_compile(
    settings: config::Settings,
    args: config::CompileArgs,
) -> Result<(), AppError> {
    let flavor = args.resolve_flavor().ok_or_else(|| {
        AppError::validation(format!(
            "cannot infer markup flavor from `{}`; pass --flavor latex|typst",
            args.input.display()
        ))
    })?;
    let output = args.output_path();

    let markup = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let service = CompileService::new(CompilerConfig::from(&settings.compile));
    let pdf = service.compile(flavor, &markup).await?;

    tokio::fs::write(&output, &pdf)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "notepress::cli",
        flavor = flavor.as_str(),
        input = %args.input.display(),
        output = %output.display(),
        bytes = pdf.len(),
        "Compiled document"
    );
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "notepress::cli", "Database migrations applied");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| {
            InfraError::configuration(
                "database url is not configured (set NOTEPRESS__DATABASE__URL or --database-url)",
            )
        })
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn request_limits(settings: &config::Settings) -> Result<RequestLimits, AppError> {
    let to_usize = |value: u64, key: &str| {
        usize::try_from(value)
            .map_err(|_| AppError::validation(format!("{key} does not fit in usize")))
    };

    Ok(RequestLimits {
        compile_bytes: to_usize(
            settings.compile.max_request_bytes.get(),
            "compile.max_request_bytes",
        )?,
        document_bytes: to_usize(
            settings.storage.max_request_bytes.get(),
            "storage.max_request_bytes",
        )?,
    })
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "notepress::server",
        addr = %settings.server.addr,
        "Listening for HTTP requests"
    );

    let draining = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let draining = draining.clone();
        async move {
            shutdown_signal().await;
            draining.notify_one();
        }
    });

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server.into_future() => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            draining.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "notepress::server",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out; dropping remaining connections"
            );
        }
    }

    info!(target = "notepress::server", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!(target = "notepress::server", "Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!(
                    target = "notepress::server",
                    "Received terminate signal, shutting down"
                );
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
