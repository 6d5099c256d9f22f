//! Statistics source.
//!
//! The scheduler only sees the [`Sampler`] trait; production uses
//! [`CommandSampler`], which runs the tool directly (no shell) under a
//! timeout. A child that outlives the timeout is killed.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use iostat_core::error::{IostatError, Result};

use crate::config::ExporterConfig;

/// Longest stderr excerpt carried in an error.
const STDERR_EXCERPT_BYTES: usize = 512;

/// One invocation of the statistics source per call, no retries.
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn sample(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct CommandSampler {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSampler {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(cfg: &ExporterConfig) -> Self {
        Self::new(
            cfg.sampler.program.clone(),
            cfg.sampler.args.clone(),
            cfg.sampler_timeout(),
        )
    }
}

#[async_trait]
impl Sampler for CommandSampler {
    async fn sample(&self) -> Result<String> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| IostatError::Spawn(format!("{}: {e}", self.program)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| IostatError::SamplerTimeout(self.timeout))?
            .map_err(|e| IostatError::Internal(format!("waiting for {} failed: {e}", self.program)))?;

        if !output.status.success() {
            return Err(IostatError::ExitStatus {
                code: output.status.code(),
                stderr: excerpt(&output.stderr),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn excerpt(stderr: &[u8]) -> String {
    let end = stderr.len().min(STDERR_EXCERPT_BYTES);
    String::from_utf8_lossy(&stderr[..end]).trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> CommandSampler {
        CommandSampler::new("sh", vec!["-c".into(), script.into()], timeout)
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = sh("printf 'ada0 1 2 3 4 5 6 7 8 9 10\\n'", Duration::from_secs(5))
            .sample()
            .await
            .unwrap();
        assert_eq!(out, "ada0 1 2 3 4 5 6 7 8 9 10\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let err = sh("echo broken >&2; exit 3", Duration::from_secs(5))
            .sample()
            .await
            .unwrap_err();
        match err {
            IostatError::ExitStatus { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let err = sh("sleep 5", Duration::from_millis(100))
            .sample()
            .await
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "timeout");
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let sampler = CommandSampler::new(
            "/nonexistent/iostat",
            vec!["-x".into()],
            Duration::from_secs(1),
        );
        let err = sampler.sample().await.unwrap_err();
        assert_eq!(err.kind().as_str(), "spawn");
    }
}
