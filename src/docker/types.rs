use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Cooperative cancellation token backed by an `AtomicBool`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A host directory bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn read_write(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    pub fn read_only(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            read_only: true,
            ..Self::read_write(source, target)
        }
    }

    /// Value for `--mount`, e.g. `type=bind,src=/a,dst=/b,readonly`.
    ///
    /// `--mount` is parsed as CSV, so a source containing `,` or `"` is
    /// emitted as a quoted field with inner quotes doubled.
    pub fn to_arg(&self) -> String {
        let src = format!("src={}", self.source.display());
        let src = if src.contains([',', '"']) {
            format!("\"{}\"", src.replace('"', "\"\""))
        } else {
            src
        };
        let mut arg = format!("type=bind,{src},dst={}", self.target);
        if self.read_only {
            arg.push_str(",readonly");
        }
        arg
    }
}

/// Describes a container invocation. `args` is the full argument list passed
/// to `program` (the pipeline layer is responsible for assembling it).
#[derive(Debug, Clone)]
pub struct ContainerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    pub log_path: Option<PathBuf>,
}

impl ContainerCommand {
    /// Render as a single shell-quoted line.
    pub fn to_shell_line(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// Outcome of a container run.
#[derive(Debug)]
pub struct ContainerResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub cancelled: bool,
    pub timed_out: bool,
}

/// Streamed output from a running container.
#[derive(Debug)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
    Done(ContainerResult),
}
