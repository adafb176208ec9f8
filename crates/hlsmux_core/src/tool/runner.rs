//! Process execution for the media tool.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::invocation::ToolInvocation;
use super::{ToolError, ToolResult};

/// Poll interval while waiting on a child with a timeout.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Captured result of a finished tool process.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, -1 if the process was terminated by a signal.
    pub exit_code: i32,
    /// Standard output, one entry per line.
    pub stdout: Vec<String>,
    /// Standard error, one entry per line.
    pub stderr: Vec<String>,
}

impl ToolOutput {
    /// Output of a process that exited with `exit_code` and printed nothing.
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last `lines` lines of stderr joined with newlines.
    pub fn stderr_tail(&self, lines: usize) -> String {
        let start = self.stderr.len().saturating_sub(lines);
        self.stderr[start..].join("\n")
    }
}

/// Runs tool invocations.
///
/// The pipeline only talks to the media tool through this trait, so tests
/// can substitute a runner that fakes the tool's filesystem effects.
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput>;
}

/// Runs ffmpeg (or a compatible binary) as a child process.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill invocations that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timeout from a seconds value where 0 means none.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        if secs == 0 {
            self
        } else {
            self.with_timeout(Duration::from_secs(secs))
        }
    }

    fn wait(&self, child: &mut Child, program: &Path) -> ToolResult<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|e| ToolError::io(program, e));
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(|e| ToolError::io(program, e))? {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::TimedOut {
                    program: program.display().to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

impl ToolRunner for FfmpegRunner {
    fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
        let program = invocation.program.as_path();

        tracing::debug!("Running {}", invocation.display());

        let mut child = Command::new(program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::spawn(program, e))?;

        // Both pipes are drained concurrently; ffmpeg fills stderr fast enough
        // to block on a full pipe otherwise.
        let stdout = child.stdout.take().map(drain_lines);
        let stderr = child.stderr.take().map(drain_lines);

        // On timeout the readers are left detached; they finish once the
        // pipes close.
        let status = self.wait(&mut child, program)?;

        let stdout = stdout.map(join_lines).unwrap_or_default();
        let stderr = stderr.map(join_lines).unwrap_or_default();

        Ok(ToolOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

/// Query the tool's version banner (first line of `-version`).
pub fn probe_version(runner: &dyn ToolRunner, program: &Path) -> ToolResult<String> {
    let invocation = ToolInvocation::new("version", program).arg("-version");
    let output = runner.run(&invocation)?;

    if !output.success() {
        return Err(ToolError::Failed {
            program: program.display().to_string(),
            exit_code: output.exit_code,
        });
    }

    Ok(output
        .stdout
        .into_iter()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default())
}

fn drain_lines<R: Read + Send + 'static>(reader: R) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        BufReader::new(reader)
            .split(b'\n')
            .map_while(Result::ok)
            .map(|line| {
                String::from_utf8_lossy(&line)
                    .trim_end_matches('\r')
                    .to_string()
            })
            .collect()
    })
}

fn join_lines(handle: JoinHandle<Vec<String>>) -> Vec<String> {
    handle.join().unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolInvocation {
        ToolInvocation::new("test", "/bin/sh").args(["-c", script])
    }

    #[test]
    fn captures_exit_code_and_streams() {
        let runner = FfmpegRunner::new();
        let output = runner
            .run(&sh("echo out-line; echo err-one 1>&2; echo err-two 1>&2; exit 3"))
            .unwrap();

        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
        assert_eq!(output.stdout, vec!["out-line"]);
        assert_eq!(output.stderr, vec!["err-one", "err-two"]);
        assert_eq!(output.stderr_tail(1), "err-two");
    }

    #[test]
    fn successful_process() {
        let output = FfmpegRunner::new().run(&sh("exit 0")).unwrap();
        assert!(output.success());
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn large_stderr_does_not_block() {
        let script = "i=0; while [ $i -lt 5000 ]; do echo \"frame=$i\" 1>&2; i=$((i+1)); done";
        let output = FfmpegRunner::new().run(&sh(script)).unwrap();
        assert!(output.success());
        assert_eq!(output.stderr.len(), 5000);
    }

    #[test]
    fn timeout_kills_child() {
        let runner = FfmpegRunner::new().with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = runner.run(&sh("exec sleep 10")).unwrap_err();

        assert!(matches!(err, ToolError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_not_found() {
        let inv = ToolInvocation::new("test", "/nonexistent/hlsmux-test-ffmpeg");
        let err = FfmpegRunner::new().run(&inv).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn zero_timeout_secs_means_none() {
        let runner = FfmpegRunner::new().with_timeout_secs(0);
        assert!(runner.timeout.is_none());
        let runner = FfmpegRunner::new().with_timeout_secs(30);
        assert_eq!(runner.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn probe_version_reads_first_line() {
        // `sh -version` is not portable, so probe through a wrapper script
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        std::fs::write(&script, "#!/bin/sh\necho 'ffmpeg version 7.1 Copyright'\necho second\n")
            .unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let banner = probe_version(&FfmpegRunner::new(), &script).unwrap();
        assert_eq!(banner, "ffmpeg version 7.1 Copyright");
    }
}
