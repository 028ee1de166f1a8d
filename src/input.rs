//! Where the event stream comes from: a file, piped stdin, or a `go test -json`
//! child process whose stdout is consumed directly.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("can't read from file and stdin at the same time")]
    ConflictingSources,

    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{command}`")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("no command given")]
    EmptyCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
    /// Program and arguments, run with stdout captured.
    Command(Vec<String>),
}

impl InputSource {
    /// Pick a source: a named file first, then piped stdin, and otherwise
    /// run `go test -json` with `test_args`.
    pub fn select(
        from_file: Option<PathBuf>,
        stdin_is_piped: bool,
        test_args: Vec<String>,
    ) -> Result<Self, InputError> {
        match (from_file, stdin_is_piped) {
            (Some(_), true) => Err(InputError::ConflictingSources),
            (Some(path), false) => Ok(Self::File(path)),
            (None, true) => Ok(Self::Stdin),
            (None, false) => Ok(Self::go_test(test_args)),
        }
    }

    pub fn go_test(args: Vec<String>) -> Self {
        let mut command = vec!["go".to_string(), "test".to_string(), "-json".to_string()];
        command.extend(args);
        Self::Command(command)
    }

    pub async fn open(self) -> Result<Input, InputError> {
        match self {
            Self::File(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|source| InputError::Open { path, source })?;
                Ok(Input::new(Box::new(file), None))
            }
            Self::Stdin => Ok(Input::new(Box::new(tokio::io::stdin()), None)),
            Self::Command(argv) => {
                let (program, args) = argv.split_first().ok_or(InputError::EmptyCommand)?;
                let command = argv.join(" ");
                info!(%command, "running tests");

                let mut child = Command::new(program)
                    .args(args)
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit())
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|source| InputError::Spawn {
                        command: command.clone(),
                        source,
                    })?;

                let stdout = child.stdout.take().ok_or_else(|| InputError::Spawn {
                    command: command.clone(),
                    source: io::Error::new(io::ErrorKind::Other, "stdout was not captured"),
                })?;

                Ok(Input::new(Box::new(stdout), Some(Supervised { command, child })))
            }
        }
    }
}

struct Supervised {
    command: String,
    child: Child,
}

/// An open event stream. Dropping it kills a spawned child.
pub struct Input {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    child: Option<Supervised>,
}

impl Input {
    fn new(reader: Box<dyn AsyncRead + Send + Unpin>, child: Option<Supervised>) -> Self {
        Self { reader, child }
    }

    pub fn reader(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        self.reader.as_mut()
    }

    /// Wait for a spawned child to exit. Returns its exit code when it failed;
    /// termination by signal is reported as 1.
    pub async fn finish(self) -> Result<Option<i32>, InputError> {
        let Some(Supervised { command, mut child }) = self.child else {
            return Ok(None);
        };
        drop(self.reader);

        let status = child
            .wait()
            .await
            .map_err(|source| InputError::Wait {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            return Ok(None);
        }

        // Expected when tests fail; the chart is still rendered.
        let code = status.code().unwrap_or(1);
        warn!(%command, code, "test command failed");
        Ok(Some(code))
    }
}

/// Whether stdin is a pipe or a redirected file rather than a terminal or
/// another character device such as `/dev/null`.
pub fn stdin_is_piped() -> bool {
    #[cfg(unix)]
    {
        use std::os::fd::AsFd;
        use std::os::unix::fs::FileTypeExt;

        let metadata = std::io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .map(std::fs::File::from)
            .and_then(|file| file.metadata());

        match metadata {
            Ok(metadata) => !metadata.file_type().is_char_device(),
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        use std::io::IsTerminal;
        !std::io::stdin().is_terminal()
    }
}
