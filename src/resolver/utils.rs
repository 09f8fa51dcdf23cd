// Subprocess helper shared by the extractors

use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::ExtractError;

/// Run `program` to completion, killing it after `timeout_secs`
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, ExtractError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ExtractError::ToolNotFound(program.to_string()),
            _ => ExtractError::Execution(format!("failed to start {}: {}", program, e)),
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| ExtractError::Execution(format!("no stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| ExtractError::Execution(format!("no stderr from {}", program)))?;

    // Drain both pipes concurrently so a chatty child cannot block on a full pipe
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => {
            let status = status
                .map_err(|e| ExtractError::Execution(format!("failed to wait for {}: {}", program, e)))?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            tracing::warn!(program, timeout_secs, "killing timed out subprocess");
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(ExtractError::Timeout(timeout_secs))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    task.await
        .map_err(|e| ExtractError::Execution(format!("{} reader failed: {}", name, e)))?
        .map_err(|e| ExtractError::Execution(format!("failed to read {}: {}", name, e)))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output() {
        let out = run_output_with_timeout("sh", vec!["-c".into(), "echo hi; echo oops >&2".into()], 5)
            .await
            .unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout, b"hi\n");
        assert_eq!(out.stderr, b"oops\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let err = run_output_with_timeout("sleep", vec!["5".into()], 1).await.unwrap_err();
        assert!(matches!(err, ExtractError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run_output_with_timeout("arbor-no-such-binary", vec![], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ToolNotFound(_)));
    }
}
