//! External tool invocation with a hard timeout.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use crate::error::{MonitorError, Result};

const POLL_STEP: Duration = Duration::from_millis(10);

/// Run `program` with `args` and return its stdout.
///
/// The program is resolved through `PATH` first, so a missing tool is
/// reported as `ToolNotFound` without spawning anything. A child still
/// running after `timeout` is killed and reported as `Timeout`.
pub fn run_tool(program: &str, args: &[&str], timeout: Duration) -> Result<String> {
    let path = which::which(program).map_err(|_| MonitorError::tool_not_found(program))?;

    let mut command = Command::new(path);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    hide_console_window(&mut command);

    let mut child = command.spawn()?;

    // Drain both pipes concurrently so a chatty tool cannot block on a full pipe
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || read_pipe(stdout));
    let stderr_reader = thread::spawn(move || read_pipe(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            log::debug!("{} timed out after {:?}", program, timeout);
            return Err(MonitorError::Timeout {
                tool: program.to_string(),
                timeout_ms: timeout.as_millis(),
            });
        }
        thread::sleep(POLL_STEP);
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(MonitorError::ToolFailed {
            tool: program.to_string(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(stdout)
}

/// Run a PowerShell snippet that ends in `ConvertTo-Json` and decode it.
///
/// `ConvertTo-Json` emits a bare object for a single result and an array
/// otherwise; both decode to a `Vec`.
pub fn run_powershell_json<T: DeserializeOwned>(script: &str, timeout: Duration) -> Result<Vec<T>> {
    let stdout = run_tool(
        "powershell",
        &["-NoProfile", "-NonInteractive", "-Command", script],
        timeout,
    )?;
    parse_json_list(&stdout)
}

pub fn parse_json_list<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(MonitorError::from))
            .collect(),
        value => Ok(vec![serde_json::from_value(value)?]),
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}
