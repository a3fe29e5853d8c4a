pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::{ApiState, RequestLimits};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{any, get, post},
};

use handlers::{accounts, compile, documents, health, todos};

/// Routes under `/api`: public account and compile endpoints plus the
/// bearer-protected document and todo resources.
pub fn build_api_router(state: ApiState) -> Router<ApiState> {
    let limits = state.limits;

    let compile_routes = Router::new()
        .route("/api/compile-latex", any(compile::compile_latex))
        .route("/api/compile-typst", any(compile::compile_typst))
        .layer(DefaultBodyLimit::max(limits.compile_bytes));

    let account_routes = Router::new()
        .route("/api/register", post(accounts::register))
        .route("/api/login", post(accounts::login));

    let protected_routes = Router::new()
        .route(
            "/api/documents",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/api/documents/{id}",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/api/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/api/todos/{id}",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .layer(DefaultBodyLimit::max(limits.document_bytes))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .merge(compile_routes)
        .merge(account_routes)
        .merge(protected_routes)
        .route("/_health/db", get(health::database))
}
