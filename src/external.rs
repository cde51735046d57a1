//! Running helper programs.
//!
//! `optipng`, `plantuml` and `tifftools` are driven through [`run_process`]:
//! stdin is fed from a separate task so large inputs cannot deadlock against
//! a full stdout pipe, and the child is killed if it outlives the timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::ExternalError;

/// Run `program` with `args`, optionally piping `stdin` into it, and return
/// its stdout.
///
/// # Errors
/// - `Spawn` if the program cannot be started
/// - `Timeout` if it does not exit within `timeout`
/// - `Failed` on a non-zero exit status, with stderr attached
pub async fn run_process(
    program: &str,
    args: &[String],
    stdin: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<Vec<u8>, ExternalError> {
    debug!(program, ?args, "Running external program");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExternalError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&input).await {
                trace!("stdin closed early: {}", e);
            }
            // Dropping the pipe closes it so the child sees EOF
        });
    }

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| ExternalError::Io(e.to_string()))?,
        Err(_) => {
            return Err(ExternalError::Timeout {
                program: program.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        return Err(ExternalError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    trace!(program, bytes = output.stdout.len(), "External program finished");
    Ok(output.stdout)
}
