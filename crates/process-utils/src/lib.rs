//! Helpers for running external command-line tools from async code.

use std::ffi::OsStr;

#[cfg(feature = "tokio")]
use std::process::Stdio;
#[cfg(feature = "tokio")]
use std::time::Duration;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Errors produced while running a child process to completion.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} did not finish within {timeout_ms} ms")]
    Timeout { program: String, timeout_ms: u128 },
}

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
///
/// The child is killed if the returned command's future is dropped, so a
/// timed-out invocation does not leave a stray process behind.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd.kill_on_drop(true);
    cmd
}

/// Run `cmd` to completion and return its stdout as (lossy) UTF-8.
///
/// A non-zero exit status is an error carrying the trimmed stderr. When
/// `timeout` is `None` the call waits as long as the child runs.
#[cfg(feature = "tokio")]
pub async fn capture_stdout(
    cmd: &mut tokio::process::Command,
    timeout: Option<Duration>,
) -> Result<String, ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(ProcessError::Timeout {
                    program,
                    timeout_ms: limit.as_millis(),
                });
            }
        },
        None => cmd.output().await,
    }
    .map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(ProcessError::Exit {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix, feature = "tokio"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_stdout_success() {
        let mut cmd = tokio_command("sh");
        cmd.arg("-c").arg("printf 'hello\\nworld\\n'");
        let out = capture_stdout(&mut cmd, None).await.unwrap();
        assert_eq!(out, "hello\nworld\n");
    }

    #[tokio::test]
    async fn test_capture_stdout_non_zero_exit() {
        let mut cmd = tokio_command("sh");
        cmd.arg("-c").arg("echo boom >&2; exit 3");
        let err = capture_stdout(&mut cmd, None).await.unwrap_err();
        match err {
            ProcessError::Exit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_capture_stdout_missing_program() {
        let mut cmd = tokio_command("definitely-not-a-real-binary-4711");
        let err = capture_stdout(&mut cmd, None).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_capture_stdout_timeout() {
        let mut cmd = tokio_command("sh");
        cmd.arg("-c").arg("sleep 5");
        let err = capture_stdout(&mut cmd, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }
}
