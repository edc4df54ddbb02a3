//! Duplication of the standard streams to a log file.
//!
//! [`duplicate_stdout_stream_to_file`] points the process's standard output
//! (and optionally standard error) at a pipe. A pump thread per stream copies
//! everything written there both to the original terminal and to the log
//! file, so output from `println!`, `eprintln!` and child processes is
//! recorded. The returned [`StreamDuplication`] guard puts the original
//! streams back when it is suppressed or dropped. Only one guard per stream
//! can be alive at a time.
//!
//! ```rust,no_run
//! use signal_toolbox::utilities::{WriteMode, duplicate_stdout_stream_to_file, make_header};
//!
//! # fn example() -> signal_toolbox::ToolboxResult<()> {
//! let logs = duplicate_stdout_stream_to_file("run", "logs", WriteMode::Append, true)?;
//! print!("{}", make_header(&[("signal_toolbox", "0.1.0")]));
//! println!("starting the sweep");
//! logs.suppress()?;
//! # Ok(())
//! # }
//! ```

use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::debug;

use crate::savebox::PathSpec;
use crate::{ToolboxError, ToolboxResult};

use redirect::Redirection;

/// Extension given to log files whose name has none.
pub const DEFAULT_LOG_EXTENSION: &str = ".log";

const BANNER_WIDTH: usize = 79;

static STDOUT_CLAIMED: AtomicBool = AtomicBool::new(false);
static STDERR_CLAIMED: AtomicBool = AtomicBool::new(false);

/// How the log file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate an existing file.
    Write,
    /// Append to an existing file.
    #[default]
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteMode::Write => "w",
            WriteMode::Append => "a",
        })
    }
}

impl FromStr for WriteMode {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "w" | "write" => Ok(WriteMode::Write),
            "a" | "append" => Ok(WriteMode::Append),
            other => Err(ToolboxError::InvalidParameter(format!(
                "unknown write mode '{other}', expected 'w' or 'a'"
            ))),
        }
    }
}

/// A writer forwarding everything to a terminal and to a shared log file.
#[derive(Debug)]
pub struct Tee<W: Write> {
    terminal: W,
    log: Arc<Mutex<File>>,
}

impl<W: Write> Tee<W> {
    /// Tee writing to `terminal` and to `log`.
    pub fn new(terminal: W, log: Arc<Mutex<File>>) -> Self {
        Self { terminal, log }
    }

    /// Flush both sinks and give the terminal writer back.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.terminal)
    }
}

impl<W: Write> Write for Tee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.terminal.write_all(buf)?;
        self.log.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.terminal.flush()?;
        self.log.lock().flush()
    }
}

#[cfg(unix)]
mod redirect {
    use std::fs::File;
    use std::io::{self, Write};
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use parking_lot::Mutex;

    use super::Tee;

    pub(super) const STDOUT: RawFd = libc::STDOUT_FILENO;
    pub(super) const STDERR: RawFd = libc::STDERR_FILENO;

    /// A file descriptor pointed at a pipe drained by a pump thread.
    #[derive(Debug)]
    pub(super) struct Redirection {
        fd: RawFd,
        saved: OwnedFd,
        pump: Option<JoinHandle<io::Result<u64>>>,
    }

    fn check(ret: libc::c_int) -> io::Result<libc::c_int> {
        if ret == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
        let mut ends = [0 as libc::c_int; 2];
        // SAFETY: `ends` has room for the two descriptors pipe(2) writes.
        check(unsafe { libc::pipe(ends.as_mut_ptr()) })?;
        // SAFETY: both descriptors were just created and are owned by nobody else.
        Ok(unsafe { (OwnedFd::from_raw_fd(ends[0]), OwnedFd::from_raw_fd(ends[1])) })
    }

    fn dup(fd: RawFd) -> io::Result<OwnedFd> {
        // SAFETY: dup(2) has no memory safety requirements.
        let copy = check(unsafe { libc::dup(fd) })?;
        // SAFETY: `copy` is a fresh descriptor owned by nobody else.
        Ok(unsafe { OwnedFd::from_raw_fd(copy) })
    }

    fn dup2(from: RawFd, to: RawFd) -> io::Result<()> {
        // SAFETY: dup2(2) has no memory safety requirements; `to` stays open.
        check(unsafe { libc::dup2(from, to) }).map(|_| ())
    }

    impl Redirection {
        /// Point `fd` at a pipe whose content is copied to the former target
        /// of `fd` and to `log`.
        pub(super) fn install(fd: RawFd, log: Arc<Mutex<File>>) -> io::Result<Self> {
            let saved = dup(fd)?;
            let terminal = File::from(saved.try_clone()?);
            let (reader, writer) = pipe()?;
            dup2(writer.as_raw_fd(), fd)?;
            drop(writer);

            let spawned = thread::Builder::new()
                .name(format!("log-tee-fd{fd}"))
                .spawn(move || {
                    let mut tee = Tee::new(terminal, log);
                    let copied = io::copy(&mut File::from(reader), &mut tee)?;
                    tee.flush()?;
                    Ok(copied)
                });
            match spawned {
                Ok(pump) => Ok(Self {
                    fd,
                    saved,
                    pump: Some(pump),
                }),
                Err(e) => {
                    dup2(saved.as_raw_fd(), fd)?;
                    Err(e)
                }
            }
        }

        /// Point `fd` back at its former target and wait for the pump to
        /// drain the pipe. Returns the number of bytes that went through.
        ///
        /// Blocks while a child process still holds the pipe open.
        pub(super) fn restore(&mut self) -> io::Result<u64> {
            let Some(pump) = self.pump.take() else {
                return Ok(0);
            };
            dup2(self.saved.as_raw_fd(), self.fd)?;
            pump.join()
                .map_err(|_| io::Error::other("log pump thread panicked"))?
        }
    }

    impl Drop for Redirection {
        fn drop(&mut self) {
            let _ = self.restore();
        }
    }
}

#[cfg(not(unix))]
mod redirect {
    use std::fs::File;
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;

    pub(super) const STDOUT: i32 = 1;
    pub(super) const STDERR: i32 = 2;

    #[derive(Debug)]
    pub(super) struct Redirection;

    impl Redirection {
        pub(super) fn install(_fd: i32, _log: Arc<Mutex<File>>) -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stream duplication needs file descriptors",
            ))
        }

        pub(super) fn restore(&mut self) -> io::Result<u64> {
            Ok(0)
        }
    }
}

/// Guard keeping the standard streams duplicated to a log file.
///
/// Suppressing or dropping it restores the original streams, flushes and
/// closes the log file, and releases the streams for a new duplication.
#[derive(Debug)]
pub struct StreamDuplication {
    stdout: Option<Redirection>,
    stderr: Option<Redirection>,
    log: Arc<Mutex<File>>,
    log_path: PathBuf,
}

impl StreamDuplication {
    /// Returns true when standard error is recorded as well.
    pub const fn records_errors(&self) -> bool {
        self.stderr.is_some()
    }

    /// File receiving the duplicated output.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Stop duplicating, reporting any failure to restore the streams or to
    /// flush the log file.
    pub fn suppress(mut self) -> ToolboxResult<()> {
        self.release()
            .map_err(|e| ToolboxError::io(format!("closing '{}'", self.log_path.display()), e))
    }

    fn release(&mut self) -> io::Result<()> {
        // Rust's own stdout buffer still targets the pipe.
        let flushed = io::stdout().flush().and_then(|()| io::stderr().flush());

        let mut restored = Ok(0);
        if let Some(mut stderr) = self.stderr.take() {
            restored = stderr.restore();
            STDERR_CLAIMED.store(false, Ordering::Release);
        }
        if let Some(mut stdout) = self.stdout.take() {
            restored = restored.and(stdout.restore());
            STDOUT_CLAIMED.store(false, Ordering::Release);
            debug!(path = %self.log_path.display(), "stopped duplicating streams");
        }

        flushed?;
        restored?;
        self.log.lock().flush()
    }
}

impl Drop for StreamDuplication {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Duplicate standard output (and standard error when `record_errors` is set)
/// to the file `name` in the folder described by `path`.
///
/// `.log` is appended when `name` has no extension.
///
/// # Errors
///
/// [`ToolboxError::StreamBusy`] when a stream is already duplicated, and
/// [`ToolboxError::Io`] when the log file cannot be opened or the streams
/// cannot be redirected.
pub fn duplicate_stdout_stream_to_file<P: Into<PathSpec>>(
    name: &str,
    path: P,
    mode: WriteMode,
    record_errors: bool,
) -> ToolboxResult<StreamDuplication> {
    let folder = path.into().resolve()?;
    let log_path = if Path::new(name).extension().is_some() {
        folder.join(name)
    } else {
        folder.join(format!("{name}{DEFAULT_LOG_EXTENSION}"))
    };

    claim(&STDOUT_CLAIMED, "stdout")?;
    if record_errors {
        if let Err(e) = claim(&STDERR_CLAIMED, "stderr") {
            release_claims(false);
            return Err(e);
        }
    }

    let log = match open_log(&log_path, mode) {
        Ok(file) => Arc::new(Mutex::new(file)),
        Err(e) => {
            release_claims(record_errors);
            return Err(e);
        }
    };

    let stdout = io::stdout()
        .flush()
        .and_then(|()| Redirection::install(redirect::STDOUT, Arc::clone(&log)));
    let stdout = match stdout {
        Ok(redirection) => redirection,
        Err(e) => {
            release_claims(record_errors);
            return Err(ToolboxError::io("redirecting stdout", e));
        }
    };
    let stderr = if record_errors {
        match Redirection::install(redirect::STDERR, Arc::clone(&log)) {
            Ok(redirection) => Some(redirection),
            Err(e) => {
                drop(stdout);
                release_claims(true);
                return Err(ToolboxError::io("redirecting stderr", e));
            }
        }
    } else {
        None
    };

    debug!(path = %log_path.display(), %mode, record_errors, "duplicating streams");
    Ok(StreamDuplication {
        stdout: Some(stdout),
        stderr,
        log,
        log_path,
    })
}

fn release_claims(stderr: bool) {
    if stderr {
        STDERR_CLAIMED.store(false, Ordering::Release);
    }
    STDOUT_CLAIMED.store(false, Ordering::Release);
}

fn claim(flag: &AtomicBool, stream: &'static str) -> ToolboxResult<()> {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map(|_| ())
        .map_err(|_| ToolboxError::StreamBusy(stream))
}

fn open_log(path: &Path, mode: WriteMode) -> ToolboxResult<File> {
    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Write => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    options
        .open(path)
        .map_err(|e| ToolboxError::io(format!("opening '{}'", path.display()), e))
}

/// Header block for the top of a log, stamped with the current time and
/// the command line of the running program.
pub fn make_header(dependencies: &[(&str, &str)]) -> String {
    let argv: Vec<String> = std::env::args().collect();
    make_header_with(dependencies, &Local::now(), &argv)
}

/// [`make_header`] with an explicit time and command line.
pub fn make_header_with(dependencies: &[(&str, &str)], date: &DateTime<Local>, argv: &[String]) -> String {
    let banner = "#".repeat(BANNER_WIDTH);
    let script = argv.first().map(String::as_str).unwrap_or_default();
    let deps = dependencies
        .iter()
        .map(|(name, version)| format!("{name} v.{version}"))
        .collect::<Vec<_>>()
        .join(", ");
    let args = argv
        .iter()
        .skip(1)
        .map(String::as_str)
        .map(quote_argument)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{banner}\n{banner}\n\nDate: {}\nScript: {script}\nDependencies: {deps}\nCommand-line arguments: [{args}]\n",
        date.format("%d %b %Y %H:%M")
    )
}

/// Quote an argument the way Python prints a string inside a list: single
/// quotes unless the text holds a single quote and no double quote, with
/// backslashes, the quote character and control characters escaped.
fn quote_argument(arg: &str) -> String {
    let quote = if arg.contains('\'') && !arg.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push(quote);
    for c in arg.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c == quote => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_ascii_control() => {
                let _ = write!(quoted, "\\x{:02x}", u32::from(c));
            }
            c => quoted.push(c),
        }
    }
    quoted.push(quote);
    quoted
}
