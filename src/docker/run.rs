use std::fs::File;
use std::io::{BufRead, BufReader, LineWriter, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::types::{CancelToken, ContainerCommand, ContainerResult, OutputLine};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long a terminated runtime gets to stop its container before SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(10);

/// Spawn the container runtime and return a channel that streams its output.
///
/// The caller receives [`OutputLine::Stdout`]/[`OutputLine::Stderr`] as they
/// arrive, followed by exactly one [`OutputLine::Done`] carrying the result.
/// With `log_path` set, every line is also appended to that file as it arrives.
pub fn spawn(cmd: ContainerCommand, cancel: CancelToken) -> Result<Receiver<OutputLine>> {
    let log = match &cmd.log_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            Some(Arc::new(Mutex::new(LineWriter::new(file))))
        }
        None => None,
    };

    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", cmd.program))?;
    tracing::debug!(pid = child.id(), program = %cmd.program, "container process started");

    let stdout = child.stdout.take().context("child stdout was not piped")?;
    let stderr = child.stderr.take().context("child stderr was not piped")?;

    let (tx, rx) = mpsc::channel();
    let readers = [
        pump(stdout, OutputLine::Stdout, tx.clone(), log.clone()),
        pump(stderr, OutputLine::Stderr, tx.clone(), log),
    ];

    std::thread::spawn(move || {
        supervise(child, readers, tx, cancel, cmd.timeout);
    });

    Ok(rx)
}

type SharedLog = Arc<Mutex<LineWriter<File>>>;

/// Forward each line of `stream` to `tx`, appending it to the log file if any.
fn pump<R: Read + Send + 'static>(
    stream: R,
    wrap: fn(String) -> OutputLine,
    tx: Sender<OutputLine>,
    log: Option<SharedLog>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if let Some(log) = &log
                && let Ok(mut file) = log.lock()
                && let Err(err) = writeln!(file, "{line}")
            {
                tracing::warn!(error = %err, "failed to append to container log");
            }
            // Receiver may be dropped; ignore send errors.
            let _ = tx.send(wrap(line));
        }
    })
}

/// Ask the runtime to stop (it proxies SIGTERM into the container), then kill
/// it if it is still alive after [`TERMINATE_GRACE`].
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill() only sends a signal; pid belongs to our unreaped child.
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
            let deadline = Instant::now() + TERMINATE_GRACE;
            while Instant::now() < deadline {
                if let Ok(Some(_)) = child.try_wait() {
                    return;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            tracing::warn!(pid, "runtime ignored SIGTERM, killing it");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn supervise(
    mut child: Child,
    readers: [JoinHandle<()>; 2],
    tx: Sender<OutputLine>,
    cancel: CancelToken,
    timeout: Option<Duration>,
) {
    let start = Instant::now();
    let mut cancelled = false;
    let mut timed_out = false;

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "lost track of container process");
                break None;
            }
        }

        if cancel.is_cancelled() {
            cancelled = true;
        } else if timeout.is_some_and(|limit| start.elapsed() > limit) {
            timed_out = true;
        }
        if cancelled || timed_out {
            terminate(&mut child);
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    for reader in readers {
        let _ = reader.join();
    }

    let exit_code = exit_status.and_then(|s| s.code());
    let _ = tx.send(OutputLine::Done(ContainerResult {
        success: exit_code == Some(0),
        exit_code,
        cancelled,
        timed_out,
    }));
}
