use axum::Json;
use axum::extract::{FromRequest, Request, State};
use axum::http::Method;
use serde::de::DeserializeOwned;

use crate::application::compile::CompileEnvelope;
use crate::domain::types::CompileFlavor;

use super::super::error::ApiError;
use super::super::models::{CompileLatexRequest, CompileTypstRequest};
use super::super::state::ApiState;
use super::ApiJson;

pub async fn compile_latex(
    State(state): State<ApiState>,
    request: Request,
) -> Result<Json<CompileEnvelope>, ApiError> {
    run_compile(state, CompileFlavor::Latex, request, latex_source).await
}

pub async fn compile_typst(
    State(state): State<ApiState>,
    request: Request,
) -> Result<Json<CompileEnvelope>, ApiError> {
    run_compile(state, CompileFlavor::Typst, request, typst_source).await
}

fn latex_source(request: CompileLatexRequest) -> String {
    request.latex
}

fn typst_source(request: CompileTypstRequest) -> String {
    request.typst
}

/// Compile failures are reported inside the envelope with HTTP 200; only
/// method and body problems produce error statuses.
async fn run_compile<T, F>(
    state: ApiState,
    flavor: CompileFlavor,
    request: Request,
    markup: F,
) -> Result<Json<CompileEnvelope>, ApiError>
where
    T: DeserializeOwned,
    F: FnOnce(T) -> String,
{
    // Checked before the body is read so the method wins over size limits.
    if request.method() != Method::POST {
        return Err(ApiError::method_not_allowed());
    }

    let ApiJson(body) = ApiJson::<T>::from_request(request, &()).await?;
    let markup = markup(body);

    // Detached so a dropped connection does not kill the compiler mid-run.
    let compiler = state.compiler.clone();
    let envelope =
        tokio::spawn(async move { compiler.compile_envelope(flavor, &markup).await })
            .await
            .map_err(|err| ApiError::internal(format!("compile task failed: {err}")))?;

    Ok(Json(envelope))
}
