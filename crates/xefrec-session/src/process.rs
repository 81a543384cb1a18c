//! Ownership wrapper around the recording utility's OS process.
//!
//! A `ProcessHandle` owns exactly one child process. The child is spawned
//! with `kill_on_drop`, so losing the handle (including a panicking
//! worker) always takes the process down with it.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{self as tokio_io, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

/// `CREATE_NO_WINDOW`: keep console utilities from flashing a window.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

// ============================================================================
// Errors
// ============================================================================

/// The recording utility could not be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The executable does not exist
    #[error("recording utility not found: {}", program.display())]
    NotFound { program: PathBuf },

    /// The executable exists but may not be run by this user
    #[error("permission denied launching {}", program.display())]
    PermissionDenied { program: PathBuf },

    /// Any other spawn failure
    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    fn from_io(program: &Path, err: io::Error) -> Self {
        let program = program.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { program },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { program },
            _ => Self::Spawn {
                program,
                source: err,
            },
        }
    }
}

/// A kill request could not be delivered.
#[derive(Debug, Error)]
pub enum KillError {
    /// The process had already exited. Callers treat this as success.
    #[error("process already exited")]
    AlreadyExited,

    /// The OS refused the termination request
    #[error("failed to kill process: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Process Handle
// ============================================================================

/// One running (or exited) recording utility process.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
}

impl ProcessHandle {
    /// Spawns `program` with `args`.
    ///
    /// Stdout is piped for `output_lines`, stdin and stderr are detached,
    /// and on Windows no console window is created.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `LaunchError::NotFound` if `program` does not exist
    /// - `LaunchError::PermissionDenied` if it cannot be executed
    /// - `LaunchError::Spawn` for any other OS error
    pub fn start<I, S>(program: &Path, args: I) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let child = command
            .spawn()
            .map_err(|e| LaunchError::from_io(program, e))?;
        let pid = child.id();

        Ok(Self { child, pid })
    }

    /// OS process id, if the process was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Takes the stdout line stream. Returns `None` on every call after
    /// the first.
    pub fn output_lines(&mut self) -> Option<OutputLines> {
        self.child.stdout.take().map(|stdout| OutputLines {
            reader: BufReader::new(stdout),
            buf: Vec::new(),
        })
    }

    /// Requests termination without waiting for the process to exit.
    ///
    /// # Errors
    ///
    /// - `KillError::AlreadyExited` if the process is no longer running
    /// - `KillError::Io` if the signal could not be sent
    pub fn kill(&mut self) -> Result<(), KillError> {
        if !self.is_running() {
            return Err(KillError::AlreadyExited);
        }

        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // tokio reports a reaped child as InvalidInput
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Err(KillError::AlreadyExited),
            Err(e) => Err(KillError::Io(e)),
        }
    }

    /// Returns true if the process has not exited yet. Never blocks.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Waits for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the exit status cannot be collected.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// Lazy, finite sequence of the process's stdout lines.
///
/// The stream is opaque: bytes that are not UTF-8 are replaced rather than
/// rejected. Ends when the stream closes, which happens when the process
/// exits or is killed.
#[derive(Debug)]
pub struct OutputLines {
    reader: BufReader<ChildStdout>,
    buf: Vec<u8>,
}

impl OutputLines {
    /// Reads the next line, without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns the read error from the pipe.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }

        let line = self.buf.as_slice();
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }

    /// Reads and throws away everything until the stream closes.
    ///
    /// Keeps the pipe open so the process never writes into a closed pipe.
    /// Returns the number of bytes discarded.
    ///
    /// # Errors
    ///
    /// Returns the read error from the pipe.
    pub async fn discard(&mut self) -> io::Result<u64> {
        tokio_io::copy(&mut self.reader, &mut tokio_io::sink()).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn sh(script: &str) -> ProcessHandle {
        ProcessHandle::start(Path::new("/bin/sh"), ["-c", script]).unwrap()
    }

    #[tokio::test]
    async fn test_reads_output_until_exit() {
        let mut process = sh("echo first; echo second");
        assert!(process.pid().is_some());

        let mut lines = process.output_lines().unwrap();
        assert!(process.output_lines().is_none(), "stdout can only be taken once");

        let mut seen = Vec::new();
        while let Some(line) = timeout(WAIT, lines.next_line()).await.unwrap().unwrap() {
            seen.push(line);
        }
        assert_eq!(seen, vec!["first".to_string(), "second".to_string()]);

        let status = timeout(WAIT, process.wait()).await.unwrap().unwrap();
        assert!(status.success());
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_non_utf8_output_is_replaced() {
        let mut process = sh("printf 'Aufnahme l\\344uft\\r\\n'; echo next");
        let mut lines = process.output_lines().unwrap();

        let first = timeout(WAIT, lines.next_line()).await.unwrap().unwrap();
        assert_eq!(first.as_deref(), Some("Aufnahme l\u{FFFD}uft"));
        let second = timeout(WAIT, lines.next_line()).await.unwrap().unwrap();
        assert_eq!(second.as_deref(), Some("next"));
        assert!(timeout(WAIT, lines.next_line()).await.unwrap().unwrap().is_none());

        let status = timeout(WAIT, process.wait()).await.unwrap().unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_discard_drains_until_exit() {
        let mut process = sh("i=0; while [ $i -lt 200 ]; do echo \"frame $i\"; i=$((i+1)); done");
        let mut lines = process.output_lines().unwrap();

        let discarded = timeout(WAIT, lines.discard()).await.unwrap().unwrap();
        assert!(discarded > 0);

        let status = timeout(WAIT, process.wait()).await.unwrap().unwrap();
        assert!(status.success(), "writer must not hit a closed pipe");
    }

    #[tokio::test]
    async fn test_kill_running_process() {
        let mut process = sh("exec sleep 30");
        assert!(process.is_running());

        process.kill().unwrap();

        let status = timeout(WAIT, process.wait()).await.unwrap().unwrap();
        assert!(!status.success());
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_kill_after_exit_is_already_exited() {
        let mut process = sh("exit 0");
        timeout(WAIT, process.wait()).await.unwrap().unwrap();

        assert!(matches!(process.kill(), Err(KillError::AlreadyExited)));
        // Repeated kills stay harmless
        assert!(matches!(process.kill(), Err(KillError::AlreadyExited)));
    }

    #[tokio::test]
    async fn test_kill_closes_output_stream() {
        let mut process = sh("echo ready; exec sleep 30");
        let mut lines = process.output_lines().unwrap();

        let first = timeout(WAIT, lines.next_line()).await.unwrap().unwrap();
        assert_eq!(first.as_deref(), Some("ready"));

        process.kill().unwrap();
        let rest = timeout(WAIT, lines.next_line()).await.unwrap().unwrap();
        assert!(rest.is_none());
    }

    #[tokio::test]
    async fn test_start_missing_executable() {
        let err = ProcessHandle::start(Path::new("/nonexistent/KSUtil.exe"), ["-record"]).unwrap_err();
        assert!(matches!(err, LaunchError::NotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/KSUtil.exe"));
    }

    #[tokio::test]
    async fn test_start_non_executable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-program");
        std::fs::write(&path, "plain text").unwrap();

        let err = ProcessHandle::start(&path, Vec::<&str>::new()).unwrap_err();
        assert!(matches!(err, LaunchError::PermissionDenied { .. }));
    }
}
