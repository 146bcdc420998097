use std::time::Duration;

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command with arguments and a timeout, capturing trimmed stdout and stderr.
///
/// A non-zero exit is not an error here; callers inspect `success`/`code`
/// because tools like `security` signal "not found" through their exit code.
pub async fn run_command(
    cmd: &str,
    args: &[&str],
    timeout: Duration,
) -> std::io::Result<CommandOutput> {
    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(cmd)
            .args(args)
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("`{}` timed out after {}s", cmd, timeout.as_secs()),
        )
    })??;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
