//! Child-process execution for external linters: bounded wait, and
//! termination with a grace period on timeout or cancellation (§5).

use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::error::RunError;

const GRACE_PERIOD: Duration = Duration::from_secs(2);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A single cancellation token shared by every task the scheduler runs.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of running one external linter.
pub struct ChildResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub timed_out: bool,
}

/// Run `program args...` in `workdir`, polling for cancellation and the
/// per-analyzer timeout. On timeout or cancellation the child is sent a
/// termination signal, given a 2s grace period to exit, then killed.
pub fn run_linter(
    program: &str,
    args: &[String],
    workdir: &std::path::Path,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<ChildResult, RunError> {
    let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
    let started = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RunError::Spawn { program: program.to_string(), source: e })?;

    let poll_interval = Duration::from_millis(100);
    let mut timed_out = false;
    loop {
        if let Some(status) = child.wait_timeout(poll_interval).map_err(RunError::Wait)? {
            let stdout = read_all(child.stdout.take());
            let stderr = read_all(child.stderr.take());
            return Ok(ChildResult {
                stdout,
                stderr,
                exit_code: status.code(),
                duration: started.elapsed(),
                timed_out: false,
            });
        }
        if cancel.is_cancelled() || started.elapsed() >= timeout {
            timed_out = started.elapsed() >= timeout && !cancel.is_cancelled();
            break;
        }
    }

    terminate_with_grace(&mut child);
    let stdout = read_all(child.stdout.take());
    let stderr = read_all(child.stderr.take());
    let exit_code = child.wait().ok().and_then(|s| s.code());
    Ok(ChildResult { stdout, stderr, exit_code, duration: started.elapsed(), timed_out })
}

fn terminate_with_grace(child: &mut std::process::Child) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill").arg(child.id().to_string()).status();
    }
    if child.wait_timeout(GRACE_PERIOD).ok().flatten().is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
}

fn read_all(stream: Option<impl std::io::Read>) -> String {
    use std::io::Read;
    let mut buf = String::new();
    if let Some(mut s) = stream {
        let _ = s.read_to_string(&mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_and_captures_exit_code() {
        let cancel = CancelToken::new();
        let result =
            run_linter("true", &[], std::path::Path::new("."), Some(Duration::from_secs(5)), &cancel).unwrap();
        assert_eq!(result.exit_code, Some(0));
        assert!(!result.timed_out);
    }

    #[test]
    fn captures_stdout() {
        let cancel = CancelToken::new();
        let result = run_linter(
            "echo",
            &["hello".to_string()],
            std::path::Path::new("."),
            Some(Duration::from_secs(5)),
            &cancel,
        )
        .unwrap();
        assert!(result.stdout.contains("hello"));
    }
}
