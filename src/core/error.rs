use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{0} binary not found in PATH")]
    BinaryNotFound(String),
    #[error("failed to start {binary}: {source}")]
    SpawnFailed {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to capture {0} stdout")]
    StdoutCapture(String),
    #[error("failed to wait on {binary}: {source}")]
    WaitFailed {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("{binary} failed (exit_code={exit_code:?})")]
    ProcessFailed {
        binary: String,
        exit_code: Option<i32>,
    },
    #[error("encoding cancelled")]
    Cancelled,
    #[error("no such file: {0}")]
    InputNotFound(String),
    #[error("failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to run ffprobe: {0}")]
    ProbeExec(#[source] io::Error),
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),
    #[error("failed to parse ffprobe output: {0}")]
    ProbeParse(#[from] serde_json::Error),
    #[error("video stream not found")]
    NoVideoStream,
    #[error("failed to parse duration: {0:?}")]
    InvalidDuration(String),
}
