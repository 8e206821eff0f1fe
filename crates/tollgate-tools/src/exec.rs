//! Bounded subprocess execution for CLI-backed handlers.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tollgate_core::HandlerFailure;

/// Characters rejected in any subprocess argument.
///
/// Arguments are passed without a shell, but operator CLIs have their own
/// expansion surprises; structured handler arguments never legitimately
/// contain these.
const FORBIDDEN: &[char] = &[';', '&', '|', '`', '$', '>', '<', '\n', '\r'];

/// Validates a single argument destined for a subprocess.
pub fn check_argument(arg: &str) -> Result<(), HandlerFailure> {
    if arg.is_empty() {
        return Err(HandlerFailure::invalid_arguments("empty argument"));
    }
    if arg.chars().any(|c| FORBIDDEN.contains(&c)) {
        return Err(HandlerFailure::invalid_arguments(format!(
            "argument contains forbidden character: {arg}"
        )));
    }
    Ok(())
}

/// Runs a program with arguments under a timeout, capturing stdout.
///
/// - Non-zero exit → [`External`] failure carrying stderr.
/// - Deadline exceeded → [`Timeout`] failure (the child is killed).
/// - Spawn failure (missing binary) → [`External`] failure.
///
/// [`External`]: tollgate_core::FailureKind::External
/// [`Timeout`]: tollgate_core::FailureKind::Timeout
pub async fn run_checked(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, HandlerFailure> {
    for arg in args {
        check_argument(arg)?;
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| {
            HandlerFailure::timeout(format!("{program} exceeded {}s", timeout.as_secs()))
        })?
        .map_err(|e| HandlerFailure::external(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HandlerFailure::external(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
