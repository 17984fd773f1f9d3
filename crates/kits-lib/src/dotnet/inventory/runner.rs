use crate::utils::process::KitsCommandExt;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to start {}: {source}", .executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} exited with {code:?}: {stderr}", .executable.display())]
    ExitStatus {
        executable: PathBuf,
        code: Option<i32>,
        stderr: String,
    },
}

/// Runs a `dotnet` executable and returns its stdout.
/// Only a zero exit code yields output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, executable: &Path, args: &[&str]) -> Result<String, CommandError>;
}

/// Spawns real child processes through tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, executable: &Path, args: &[&str]) -> Result<String, CommandError> {
        log::debug!("Running {:?} {}", executable, args.join(" "));

        let mut command = tokio::process::Command::new(executable);
        command
            .args(args)
            .quiet_dotnet()
            .suppress_console()
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = command.output().await.map_err(|source| CommandError::Spawn {
            executable: executable.to_path_buf(),
            source,
        })?;

        if !output.status.success() {
            return Err(CommandError::ExitStatus {
                executable: executable.to_path_buf(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
