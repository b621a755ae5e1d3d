use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use common::CaseVerdict;
use common::limits::EffectiveLimits;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// How a judged process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Exited(i32),
    Signaled(i32),
    TimedOut,
}

/// Raw observation from running one test case.
#[derive(Debug)]
pub struct CaseExecution {
    pub outcome: ExecutionOutcome,
    pub stdout: Vec<u8>,
    pub wall_time_ms: i32,
    /// Peak RSS of child processes in kilobytes, when the platform reports
    /// it. Cumulative across the job's children, so an approximation.
    pub memory_kb: Option<i32>,
}

/// Run one command with the given stdin, enforcing a wall-clock timeout.
/// The process is killed on expiry.
pub async fn run_case(
    program: &str,
    args: &[String],
    cwd: &Path,
    input: &[u8],
    time_limit_ms: i32,
) -> std::io::Result<CaseExecution> {
    let start = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        // The child may exit without draining stdin; a broken pipe here is
        // part of the verdict, not an infrastructure failure.
        let _ = stdin.write_all(input).await;
        drop(stdin);
    }

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        std::io::Error::other("child stdout was not captured")
    })?;
    let read_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf).await;
        buf
    });

    let timeout = Duration::from_millis(time_limit_ms as u64);
    let outcome = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => {
            let status = status?;
            match status.code() {
                Some(code) => ExecutionOutcome::Exited(code),
                None => {
                    #[cfg(unix)]
                    let signal = {
                        use std::os::unix::process::ExitStatusExt;
                        status.signal().unwrap_or(0)
                    };
                    #[cfg(not(unix))]
                    let signal = 0;
                    ExecutionOutcome::Signaled(signal)
                }
            }
        }
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            ExecutionOutcome::TimedOut
        }
    };

    let wall_time_ms = start.elapsed().as_millis() as i32;
    let stdout = read_task.await.unwrap_or_default();

    Ok(CaseExecution {
        outcome,
        stdout,
        wall_time_ms,
        memory_kb: children_max_rss_kb(),
    })
}

/// Peak RSS across reaped child processes, in kilobytes.
#[cfg(unix)]
fn children_max_rss_kb() -> Option<i32> {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, &mut usage) };
    if rc != 0 {
        return None;
    }
    // ru_maxrss is kilobytes on Linux, bytes on macOS.
    #[cfg(target_os = "macos")]
    let kb = usage.ru_maxrss / 1024;
    #[cfg(not(target_os = "macos"))]
    let kb = usage.ru_maxrss;
    i32::try_from(kb).ok()
}

#[cfg(not(unix))]
fn children_max_rss_kb() -> Option<i32> {
    None
}

/// Compare program output against the expected output, ignoring trailing
/// whitespace on each line and trailing blank lines.
pub fn compare_output(actual: &[u8], expected: &[u8]) -> bool {
    normalize(actual) == normalize(expected)
}

fn normalize(data: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(data);
    let mut lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Map a raw execution onto a verdict. The memory check comes first so an
/// over-limit run that also timed out or crashed reports the memory fault.
pub fn classify(execution: &CaseExecution, limits: &EffectiveLimits, expected: &[u8]) -> CaseVerdict {
    if let Some(memory_kb) = execution.memory_kb {
        if memory_kb > limits.memory_kb {
            return CaseVerdict::MemoryLimitExceeded;
        }
    }

    match execution.outcome {
        ExecutionOutcome::TimedOut => CaseVerdict::TimeLimitExceeded,
        ExecutionOutcome::Signaled(_) => CaseVerdict::RuntimeError,
        ExecutionOutcome::Exited(code) if code != 0 => CaseVerdict::RuntimeError,
        ExecutionOutcome::Exited(_) => {
            if compare_output(&execution.stdout, expected) {
                CaseVerdict::Passed
            } else {
                CaseVerdict::WrongOutput
            }
        }
    }
}
