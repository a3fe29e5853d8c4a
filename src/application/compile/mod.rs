//! LaTeX/Typst to PDF compilation.
//!
//! Every call gets its own [`Workspace`], runs one compiler process through
//! [`CompilerInvoker`] and maps the outcome into a [`CompileEnvelope`].
//! A semaphore caps how many compiler processes run at once.

mod envelope;
mod invoker;
mod workspace;

use std::{
    num::NonZeroUsize,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use metrics::{counter, gauge, histogram};
use tokio::sync::Semaphore;
use tracing::info;

use crate::{config::CompileSettings, domain::types::CompileFlavor};

pub use envelope::{CompileEnvelope, CompileStatus};
pub use invoker::{CompileError, CompilerInvoker};
pub use workspace::Workspace;

pub const METRIC_COMPILE_TOTAL: &str = "notepress_compile_total";
pub const METRIC_COMPILE_FAILURES: &str = "notepress_compile_failures_total";
pub const METRIC_COMPILE_MS: &str = "notepress_compile_ms";
pub const METRIC_COMPILE_INFLIGHT: &str = "notepress_compile_inflight";
pub const METRIC_WORKSPACE_CLEANUP_FAILURES: &str =
    "notepress_compile_workspace_cleanup_failures_total";

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub latex_program: PathBuf,
    pub typst_program: PathBuf,
    pub timeout: Duration,
    pub max_concurrent: NonZeroUsize,
    pub workspace_root: Option<PathBuf>,
}

impl From<&CompileSettings> for CompilerConfig {
    fn from(settings: &CompileSettings) -> Self {
        Self {
            latex_program: settings.latex_program.clone(),
            typst_program: settings.typst_program.clone(),
            timeout: settings.timeout,
            max_concurrent: settings.max_concurrent,
            workspace_root: settings.workspace_root.clone(),
        }
    }
}

/// Shared entry point for HTTP handlers and the `compile` subcommand.
#[derive(Debug)]
pub struct CompileService {
    invoker: CompilerInvoker,
    permits: Arc<Semaphore>,
}

impl CompileService {
    pub fn new(config: CompilerConfig) -> Self {
        let invoker = CompilerInvoker::new(
            config.latex_program,
            config.typst_program,
            config.timeout,
            config.workspace_root,
        );
        Self {
            invoker,
            permits: Arc::new(Semaphore::new(config.max_concurrent.get())),
        }
    }

    pub async fn compile(
        &self,
        flavor: CompileFlavor,
        markup: &str,
    ) -> Result<Vec<u8>, CompileError> {
        // The semaphore is owned here and never closed.
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("compile semaphore is never closed");

        let started_at = Instant::now();
        gauge!(METRIC_COMPILE_INFLIGHT).increment(1.0);
        let result = self.invoker.compile(flavor, markup).await;
        gauge!(METRIC_COMPILE_INFLIGHT).decrement(1.0);

        let elapsed = started_at.elapsed();
        counter!(METRIC_COMPILE_TOTAL, "flavor" => flavor.as_str()).increment(1);
        histogram!(METRIC_COMPILE_MS, "flavor" => flavor.as_str())
            .record(elapsed.as_secs_f64() * 1000.0);

        match &result {
            Ok(pdf) => info!(
                target = "notepress::compile",
                op = "compile",
                result = "ok",
                flavor = flavor.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                markup_bytes = markup.len(),
                pdf_bytes = pdf.len(),
                "Document compiled"
            ),
            Err(err) => {
                counter!(
                    METRIC_COMPILE_FAILURES,
                    "flavor" => flavor.as_str(),
                    "reason" => err.code()
                )
                .increment(1);
                info!(
                    target = "notepress::compile",
                    op = "compile",
                    result = "error",
                    flavor = flavor.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error_code = err.code(),
                    "Document compilation failed"
                );
            }
        }

        result
    }

    /// Compile and encode the outcome; compile failures become an error envelope.
    pub async fn compile_envelope(&self, flavor: CompileFlavor, markup: &str) -> CompileEnvelope {
        let result = self.compile(flavor, markup).await;
        CompileEnvelope::from_result(flavor, &result)
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn service_with_typst(bin: &TempDir, body: &str, max_concurrent: usize) -> CompileService {
        let path = bin.path().join("typst");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");

        CompileService::new(CompilerConfig {
            latex_program: PathBuf::from("pdflatex"),
            typst_program: path,
            timeout: Duration::from_secs(10),
            max_concurrent: NonZeroUsize::new(max_concurrent).expect("non-zero"),
            workspace_root: None,
        })
    }

    #[tokio::test]
    #[serial]
    async fn permits_are_returned_after_each_call() {
        let bin = TempDir::new().expect("bin");
        let service = service_with_typst(&bin, r#"cp "$2" "$3""#, 2);

        let envelope = service
            .compile_envelope(CompileFlavor::Typst, "%PDF-1.4")
            .await;
        assert!(envelope.is_success());
        assert_eq!(service.available_permits(), 2);

        let failing = service_with_typst(&bin, "exit 3", 1);
        let envelope = failing.compile_envelope(CompileFlavor::Typst, "x").await;
        assert!(!envelope.is_success());
        assert_eq!(failing.available_permits(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn semaphore_serializes_compiler_processes() {
        let bin = TempDir::new().expect("bin");
        let marker = bin.path().join("running");
        let body = format!(
            r#"if [ -e "{marker}" ]; then exit 42; fi
touch "{marker}"
sleep 0.2
rm "{marker}"
cp "$2" "$3""#,
            marker = marker.display()
        );
        let service = Arc::new(service_with_typst(&bin, &body, 1));

        let mut handles = Vec::new();
        for index in 0..3 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .compile(CompileFlavor::Typst, &format!("%PDF-{index}"))
                    .await
            }));
        }

        for (index, handle) in handles.into_iter().enumerate() {
            let pdf = handle.await.expect("join").expect("compile");
            assert_eq!(pdf, format!("%PDF-{index}").into_bytes());
        }
    }
}
