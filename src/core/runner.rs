use std::io;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::debug;

use crate::core::error::EncodeError;
use crate::core::lines::LineReader;
use crate::core::progress::EncodeProgress;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cancellation flag shared between the caller, the signal handler, and the
/// runner's wait loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also flips on SIGINT/SIGTERM, so an OS termination signal
    /// tears the encode down the same way an explicit `cancel()` does.
    pub fn hooked_to_signals() -> io::Result<Self> {
        let token = Self::new();
        signal_hook::flag::register(SIGINT, Arc::clone(&token.flag))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&token.flag))?;
        Ok(token)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs `argv` with stdout piped through `parse`, delivering each snapshot to
/// `on_progress` in production order while waiting for the process to exit.
/// Cancellation kills the process and reports `EncodeError::Cancelled`.
pub fn run_with_progress<P, F>(
    argv: &[String],
    cancel: &CancelToken,
    mut parse: P,
    mut on_progress: F,
) -> Result<(), EncodeError>
where
    P: FnMut(&str) -> Option<EncodeProgress> + Send + 'static,
    F: FnMut(&EncodeProgress),
{
    let (binary, rest) = match argv.split_first() {
        Some((binary, rest)) => (binary.clone(), rest),
        None => return Err(EncodeError::BinaryNotFound(String::new())),
    };

    let mut cmd = Command::new(&binary);
    cmd.args(rest).stdout(Stdio::piped()).stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            EncodeError::BinaryNotFound(binary.clone())
        } else {
            EncodeError::SpawnFailed {
                binary: binary.clone(),
                source: e,
            }
        }
    })?;

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EncodeError::StdoutCapture(binary));
        }
    };

    let (progress_tx, progress_rx) = mpsc::channel::<EncodeProgress>();

    let reader_handle = thread::spawn(move || {
        for line in LineReader::new(stdout) {
            if let Some(snapshot) = parse(&line) {
                if progress_tx.send(snapshot).is_err() {
                    break;
                }
            }
        }
    });

    let status = loop {
        while let Ok(snapshot) = progress_rx.try_recv() {
            on_progress(&snapshot);
        }

        if cancel.is_cancelled() {
            debug!(%binary, "cancellation requested, killing process");
            let _ = child.kill();
            let _ = child.wait();
            return Err(EncodeError::Cancelled);
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EncodeError::WaitFailed { binary, source: e });
            }
        }
    };

    // The pipe closed with the process, so the reader finishes on its own;
    // drain whatever it produced before the exit status is reported.
    let _ = reader_handle.join();
    while let Ok(snapshot) = progress_rx.try_recv() {
        on_progress(&snapshot);
    }

    if status.success() {
        Ok(())
    } else {
        Err(EncodeError::ProcessFailed {
            binary,
            exit_code: status.code(),
        })
    }
}
