//! Timeout-bounded subprocess execution.
//!
//! Everything the collector spawns goes through [`run_with_timeout`]: stdin
//! is closed, both output pipes are drained on dedicated threads so a chatty
//! child cannot deadlock against a full pipe, and a child that outlives its
//! deadline is killed and reported rather than waited on forever.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;

use log::debug;
use wait_timeout::ChildExt;

/// What came back from one subprocess run.
#[derive(Debug)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, when the child exited normally.
    pub exit_code: Option<i32>,
    /// True when the child was killed at the deadline.
    pub timed_out: bool,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Captured output as one text block, stdout first.
    pub fn combined_output(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Runs `program` with `args`, killing it after `timeout`.
///
/// # Arguments
/// * `program` - Executable to spawn, resolved through `PATH`
/// * `args` - Arguments passed as-is, one per argv entry
/// * `timeout` - Wall-clock budget before the child is killed
///
/// # Returns
/// The captured outcome; `Err` only when the child could not be spawned.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> std::io::Result<ExecOutcome> {
    debug!("spawning '{program}' with {} arg(s)", args.len());
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_reader = spawn_pipe_reader("exec-stdout", stdout_pipe);
    let stderr_reader = spawn_pipe_reader("exec-stderr", stderr_pipe);

    let (exit_code, timed_out) = match child.wait_timeout(timeout)? {
        Some(status) => (status.code(), false),
        None => {
            debug!("'{program}' exceeded {}s, killing it", timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            (None, true)
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(ExecOutcome {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
        timed_out,
    })
}

fn spawn_pipe_reader<R>(name: &str, pipe: Option<R>) -> std::thread::JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut buffer = Vec::new();
            if let Some(mut pipe) = pipe {
                let _ = pipe.read_to_end(&mut buffer);
            }
            buffer
        })
        .unwrap_or_else(|_| std::thread::spawn(Vec::new))
}
