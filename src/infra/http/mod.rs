pub mod api;
mod middleware;

pub use api::{ApiState, RequestLimits, build_api_router};
pub use middleware::RequestContext;

use axum::{Router, middleware as axum_middleware};

/// Assemble the full application router with request logging.
pub fn build_router(state: ApiState) -> Router {
    build_api_router(state.clone())
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
