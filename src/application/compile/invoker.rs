//! Runs an external LaTeX/Typst compiler inside a scoped workspace.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};
use tracing::{debug, warn};

use crate::domain::types::CompileFlavor;

use super::workspace::Workspace;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to create temporary directory: {0}")]
    WorkspaceCreation(#[source] io::Error),
    #[error("failed to write {} source file: {source}", .flavor.display_name())]
    WriteInput {
        flavor: CompileFlavor,
        #[source]
        source: io::Error,
    },
    #[error("failed to start {} compiler `{program}`: {source}", .flavor.display_name())]
    Spawn {
        flavor: CompileFlavor,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for {} compiler: {source}", .flavor.display_name())]
    Wait {
        flavor: CompileFlavor,
        #[source]
        source: io::Error,
    },
    #[error(
        "failed to compile {} document: {status}\nStdout: {stdout}\nStderr: {stderr}",
        .flavor.display_name()
    )]
    Failed {
        flavor: CompileFlavor,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    #[error(
        "failed to compile {} document: compiler did not finish within {:?}",
        .flavor.display_name(),
        .timeout
    )]
    Timeout {
        flavor: CompileFlavor,
        timeout: Duration,
    },
    #[error("failed to read compiled PDF: {0}")]
    ReadOutput(#[source] io::Error),
}

impl CompileError {
    /// Short machine-readable code used in logs and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WorkspaceCreation(_) => "workspace",
            Self::WriteInput { .. } => "write_input",
            Self::Spawn { .. } => "spawn",
            Self::Wait { .. } => "wait",
            Self::Failed { .. } => "exit_status",
            Self::Timeout { .. } => "timeout",
            Self::ReadOutput(_) => "read_output",
        }
    }
}

/// Locations of the compiler binaries plus per-call limits.
#[derive(Debug, Clone)]
pub struct CompilerInvoker {
    latex_program: PathBuf,
    typst_program: PathBuf,
    timeout: Duration,
    workspace_root: Option<PathBuf>,
}

impl CompilerInvoker {
    pub fn new(
        latex_program: PathBuf,
        typst_program: PathBuf,
        timeout: Duration,
        workspace_root: Option<PathBuf>,
    ) -> Self {
        Self {
            latex_program,
            typst_program,
            timeout,
            workspace_root,
        }
    }

    pub fn program(&self, flavor: CompileFlavor) -> &Path {
        match flavor {
            CompileFlavor::Latex => &self.latex_program,
            CompileFlavor::Typst => &self.typst_program,
        }
    }

    /// Compile `markup` and return the produced PDF bytes. The workspace is
    /// released before this returns on every path.
    pub async fn compile(
        &self,
        flavor: CompileFlavor,
        markup: &str,
    ) -> Result<Vec<u8>, CompileError> {
        let workspace = Workspace::acquire(flavor, self.workspace_root.as_deref())
            .map_err(CompileError::WorkspaceCreation)?;

        let input_path = workspace.input_path();
        tokio::fs::write(&input_path, markup.as_bytes())
            .await
            .map_err(|source| CompileError::WriteInput { flavor, source })?;

        self.run(flavor, &workspace).await?;

        tokio::fs::read(workspace.output_path()).await.map_err(|err| {
            warn!(
                target = "notepress::compile::invoker",
                op = "compile::read_output",
                result = "error",
                flavor = flavor.as_str(),
                error_code = "read_output",
                error = %err,
                "Compiler exited cleanly but produced no readable PDF"
            );
            CompileError::ReadOutput(err)
        })
    }

    async fn run(&self, flavor: CompileFlavor, workspace: &Workspace) -> Result<(), CompileError> {
        let program = self.program(flavor);
        let started_at = Instant::now();

        let mut command = Command::new(program);
        command
            .args(compiler_args(flavor, workspace))
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group so helpers the compiler forks die with it on timeout.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|source| {
                warn!(
                    target = "notepress::compile::invoker",
                    op = "compile::spawn",
                    result = "error",
                    flavor = flavor.as_str(),
                    program = %program.display(),
                    error_code = "spawn",
                    error = %source,
                    "Failed to spawn compiler"
                );
                CompileError::Spawn {
                    flavor,
                    program: program.display().to_string(),
                    source,
                }
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = tokio::time::timeout(self.timeout, async {
            let (status, stdout, stderr) =
                tokio::join!(child.wait(), read_stream(stdout), read_stream(stderr));
            Ok::<_, io::Error>((status?, stdout?, stderr?))
        })
        .await;

        let (status, stdout, stderr) = match outcome {
            Ok(Ok(collected)) => collected,
            Ok(Err(source)) => return Err(CompileError::Wait { flavor, source }),
            Err(_) => {
                #[cfg(unix)]
                kill_process_group(&child, flavor);
                if let Err(err) = child.kill().await {
                    warn!(
                        target = "notepress::compile::invoker",
                        op = "compile::kill",
                        result = "error",
                        flavor = flavor.as_str(),
                        error = %err,
                        "Failed to kill timed out compiler"
                    );
                }
                warn!(
                    target = "notepress::compile::invoker",
                    op = "compile::run",
                    result = "timeout",
                    flavor = flavor.as_str(),
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    timeout_ms = self.timeout.as_millis() as u64,
                    error_code = "timeout",
                    "Compiler timed out and was killed"
                );
                return Err(CompileError::Timeout {
                    flavor,
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if !status.success() {
            warn!(
                target = "notepress::compile::invoker",
                op = "compile::run",
                result = "error",
                flavor = flavor.as_str(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = status.code().map(i64::from).unwrap_or(-1),
                error_code = "exit_status",
                stderr = %stderr,
                "Compiler exited with failure"
            );
            return Err(CompileError::Failed {
                flavor,
                status,
                stdout,
                stderr,
            });
        }

        debug!(
            target = "notepress::compile::invoker",
            op = "compile::run",
            result = "ok",
            flavor = flavor.as_str(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            stdout_bytes = stdout.len(),
            "Compiler finished"
        );
        Ok(())
    }
}

/// SIGKILL every process in the child's group. The child leads the group,
/// so its pid is the group id.
#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child, flavor: CompileFlavor) {
    use nix::{
        errno::Errno,
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => warn!(
            target = "notepress::compile::invoker",
            op = "compile::kill_group",
            result = "error",
            flavor = flavor.as_str(),
            pgid = pid,
            error = %err,
            "Failed to kill compiler process group"
        ),
    }
}

fn compiler_args(flavor: CompileFlavor, workspace: &Workspace) -> Vec<OsString> {
    match flavor {
        CompileFlavor::Latex => vec![
            OsString::from("-interaction=nonstopmode"),
            OsString::from("-output-directory"),
            workspace.path().as_os_str().to_owned(),
            workspace.input_path().into_os_string(),
        ],
        CompileFlavor::Typst => vec![
            OsString::from("compile"),
            workspace.input_path().into_os_string(),
            workspace.output_path().into_os_string(),
        ],
    }
}

async fn read_stream<R>(stream: Option<R>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}
