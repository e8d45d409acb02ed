//! External command execution seam
//!
//! The interpreter never performs a hardware side effect itself; it hands a
//! formatted command line to a [`CommandRunner`]. The default runner spawns
//! the line through the system shell.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Executes a formatted command line against the host system
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command line to completion
    async fn run(&self, command_line: &str) -> Result<()>;
}

/// Runs command lines through `sh -c`
#[derive(Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command_line: &str) -> Result<()> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(anyhow!("{}: {}", output.status, stderr.trim()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command() {
        ProcessRunner.run("true").await.expect("true succeeds");
    }

    #[tokio::test]
    async fn test_failing_command_reports_error() {
        let err = ProcessRunner
            .run("echo boom >&2; exit 3")
            .await
            .expect_err("non-zero exit");
        assert!(err.to_string().contains("boom"));
    }
}
