//! Shell command execution.
//!
//! Every external step (cmake, make, the simulation pipeline, the profilers)
//! runs through a [`CommandExecutor`]. The production implementation is
//! [`ShellExecutor`], which hands each command line to `sh -c` so the
//! pipeline templates are passed through byte-for-byte.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exceeded the {timeout:?} timeout and was killed")]
    Timeout { command: String, timeout: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub line: String,
    pub cwd: PathBuf,
    /// Written verbatim to the child's stdin, which is then closed.
    pub stdin: Option<String>,
    /// Forward output lines to the console while the command runs.
    pub echo: bool,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(line: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            line: line.into(),
            cwd: cwd.into(),
            stdin: None,
            echo: false,
            timeout: None,
        }
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        (**self).execute(spec)
    }
}

pub type LineSink = Box<dyn Fn(OutputStream, &str) + Send + Sync>;

/// Runs commands through `sh -c`, blocking until they exit.
pub struct ShellExecutor {
    shell: String,
    sink: LineSink,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            sink: Box::new(|stream, line| match stream {
                OutputStream::Stdout => println!("{}", line),
                OutputStream::Stderr => eprintln!("{}", line),
            }),
        }
    }

    /// Replaces the console as the destination of echoed lines.
    pub fn with_line_sink(mut self, sink: LineSink) -> Self {
        self.sink = sink;
        self
    }

    fn spawn(&self, spec: &CommandSpec) -> Result<Child, ProcessError> {
        let mut command = Command::new(&self.shell);
        #[cfg(unix)]
        if spec.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
            .arg("-c")
            .arg(&spec.line)
            .current_dir(&spec.cwd)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: spec.line.clone(),
                source,
            })
    }

    fn drain<R: Read>(&self, reader: R, stream: OutputStream, echo: bool) -> io::Result<String> {
        let mut captured = String::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let chunk = String::from_utf8_lossy(&buf);
            if echo {
                (self.sink)(stream, chunk.trim_end_matches(['\n', '\r']));
            }
            captured.push_str(&chunk);
        }
        Ok(captured)
    }

    fn wait(
        child: &mut Child,
        spec: &CommandSpec,
        started: Instant,
    ) -> Result<ExitStatus, ProcessError> {
        let io_err = |source| ProcessError::Io {
            command: spec.line.clone(),
            source,
        };

        let Some(timeout) = spec.timeout else {
            return child.wait().map_err(io_err);
        };

        loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                warn!("Killing '{}' after {:?}", spec.line, timeout);
                if let Err(e) = kill_process_tree(child) {
                    warn!("Failed to kill timed-out process: {}", e);
                }
                child.wait().map_err(io_err)?;
                return Err(ProcessError::Timeout {
                    command: spec.line.clone(),
                    timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        debug!("Running in {:?}: {}", &spec.cwd, &spec.line);
        let started = Instant::now();
        let mut child = self.spawn(spec)?;

        let io_err = |source| ProcessError::Io {
            command: spec.line.clone(),
            source,
        };

        if let (Some(input), Some(mut stdin)) = (spec.stdin.as_ref(), child.stdin.take()) {
            trace!("Writing {} byte(s) to stdin", input.len());
            // A child that exits without reading its input closes the pipe early.
            match stdin.write_all(input.as_bytes()) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(io_err(e)),
                _ => {}
            }
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, stdout, stderr) = thread::scope(|scope| {
            let out_handle = stdout.map(|pipe| {
                scope.spawn(move || self.drain(pipe, OutputStream::Stdout, spec.echo))
            });
            let err_handle = stderr.map(|pipe| {
                scope.spawn(move || self.drain(pipe, OutputStream::Stderr, spec.echo))
            });

            let status = Self::wait(&mut child, spec, started);

            (status, join_reader(out_handle), join_reader(err_handle))
        });

        let status = status?;
        let output = CommandOutput {
            code: status.code(),
            stdout: stdout.map_err(io_err)?,
            stderr: stderr.map_err(io_err)?,
            elapsed: started.elapsed(),
        };
        debug!(
            "Command finished with {:?} after {:.3}s",
            output.code,
            output.elapsed.as_secs_f64()
        );
        Ok(output)
    }
}

fn join_reader(handle: Option<thread::ScopedJoinHandle<'_, io::Result<String>>>) -> io::Result<String> {
    match handle.map(|h| h.join()) {
        Some(Ok(result)) => result,
        Some(Err(_)) => Err(io::Error::other("output reader thread panicked")),
        None => Ok(String::new()),
    }
}

/// Kills the child and, on unix, everything it spawned. Commands run with a
/// timeout are placed in their own process group so `sh -c` grandchildren
/// holding the output pipes die with it.
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        let pgid = child.id() as libc::pid_t;
        // SAFETY: kill(2) with a negative pid only signals the process group.
        if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
    }
    child.kill()
}

/// Quotes a path for interpolation into a `sh -c` command line.
pub fn shell_quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let is_plain = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@%".contains(c));
    if is_plain {
        raw.into_owned()
    } else {
        format!("'{}'", raw.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_leaves_plain_paths_untouched() {
        assert_eq!(
            shell_quote(Path::new("../release/bin/gmx")),
            "../release/bin/gmx"
        );
    }

    #[test]
    fn shell_quote_wraps_paths_with_spaces_and_quotes() {
        assert_eq!(shell_quote(Path::new("/my dir/gmx")), "'/my dir/gmx'");
        assert_eq!(shell_quote(Path::new("/it's/gmx")), r"'/it'\''s/gmx'");
    }

    #[test]
    fn output_success_requires_zero_exit_code() {
        let mut output = CommandOutput::default();
        assert!(!output.success());
        output.code = Some(0);
        assert!(output.success());
        output.code = Some(2);
        assert!(!output.success());
    }

    #[cfg(unix)]
    mod shell {
        use super::super::*;
        use std::sync::{Arc, Mutex};
        use tempfile::tempdir;

        #[test]
        fn captures_stdout_stderr_and_exit_code() {
            let dir = tempdir().unwrap();
            let spec = CommandSpec::new("echo out; echo err 1>&2; exit 3", dir.path());

            let output = ShellExecutor::new().execute(&spec).unwrap();

            assert_eq!(output.code, Some(3));
            assert_eq!(output.stdout, "out\n");
            assert_eq!(output.stderr, "err\n");
        }

        #[test]
        fn runs_in_requested_working_directory() {
            let dir = tempdir().unwrap();
            std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
            let spec = CommandSpec::new("cat marker.txt", dir.path());

            let output = ShellExecutor::new().execute(&spec).unwrap();

            assert!(output.success());
            assert_eq!(output.stdout, "here");
        }

        #[test]
        fn stdin_token_is_delivered_verbatim() {
            let dir = tempdir().unwrap();
            let spec = CommandSpec::new("cat", dir.path()).stdin("13");

            let output = ShellExecutor::new().execute(&spec).unwrap();

            assert_eq!(output.stdout, "13");
        }

        #[test]
        fn echo_forwards_lines_to_sink() {
            let dir = tempdir().unwrap();
            let lines = Arc::new(Mutex::new(Vec::new()));
            let sink_lines = lines.clone();
            let executor = ShellExecutor::new().with_line_sink(Box::new(move |stream, line| {
                sink_lines.lock().unwrap().push((stream, line.to_string()));
            }));
            let spec = CommandSpec::new("echo one; echo two", dir.path()).echo(true);

            executor.execute(&spec).unwrap();

            let lines = lines.lock().unwrap();
            assert_eq!(
                *lines,
                vec![
                    (OutputStream::Stdout, "one".to_string()),
                    (OutputStream::Stdout, "two".to_string()),
                ]
            );
        }

        #[test]
        fn silent_commands_do_not_reach_sink() {
            let dir = tempdir().unwrap();
            let calls = Arc::new(Mutex::new(0usize));
            let counter = calls.clone();
            let executor = ShellExecutor::new().with_line_sink(Box::new(move |_, _| {
                *counter.lock().unwrap() += 1;
            }));

            executor
                .execute(&CommandSpec::new("echo quiet", dir.path()))
                .unwrap();

            assert_eq!(*calls.lock().unwrap(), 0);
        }

        #[test]
        fn timeout_kills_long_running_command() {
            let dir = tempdir().unwrap();
            let spec = CommandSpec::new("sleep 5", dir.path())
                .timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let result = ShellExecutor::new().execute(&spec);

            assert!(matches!(result, Err(ProcessError::Timeout { .. })));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn missing_working_directory_is_a_spawn_error() {
            let dir = tempdir().unwrap();
            let spec = CommandSpec::new("true", dir.path().join("absent"));

            let result = ShellExecutor::new().execute(&spec);

            assert!(matches!(result, Err(ProcessError::Spawn { .. })));
        }
    }
}
