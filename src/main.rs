mod cli;
mod core;
mod util;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use clap::Parser;
use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Encoder};
use crate::core::error::EncodeError;
use crate::core::params::EncodeParams;
use crate::core::progress::EncodeProgress;
use crate::core::runner::CancelToken;
use crate::core::{ffmpeg, handbrake, probe};

fn main() {
    let args = Cli::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(message) = args.validate() {
        error!("{message}");
        process::exit(2);
    }

    let cancel = match CancelToken::hooked_to_signals() {
        Ok(token) => token,
        Err(err) => {
            error!("failed to install signal handlers: {err}");
            process::exit(1);
        }
    };

    match run(&args, &cancel) {
        Ok(()) => {}
        Err(EncodeError::Cancelled) => {
            println!();
            info!("encoding cancelled by user");
            process::exit(1);
        }
        Err(err) => {
            println!();
            error!("encoding failed: {err}");
            process::exit(1);
        }
    }
}

fn run(args: &Cli, cancel: &CancelToken) -> Result<(), EncodeError> {
    let input_path = fs::canonicalize(&args.video_path)
        .map_err(|_| EncodeError::InputNotFound(args.video_path.clone()))?
        .to_string_lossy()
        .into_owned();
    debug!(%input_path, "resolved input path");

    let probe = probe::probe(&input_path)?;
    debug!(
        duration_secs = probe.duration.as_secs(),
        codec = %probe.codec,
        width = probe.width,
        height = probe.height,
        "probed input"
    );

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => Path::new(&input_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string()),
    };
    fs::create_dir_all(&output_dir).map_err(|source| EncodeError::CreateOutputDir {
        path: output_dir.clone(),
        source,
    })?;

    let filename =
        util::generate_filename(&input_path, probe.width, probe.height, args.width, args.height);
    let mut save_path = Path::new(&output_dir)
        .join(&filename)
        .to_string_lossy()
        .into_owned();
    if save_path == input_path {
        save_path = util::reencoded_path(&save_path);
    }
    debug!(%save_path, "resolved output path");

    let params = EncodeParams {
        input_path,
        output_path: save_path,
        quality: args.quality,
        ten_bit: args.is_ten_bit(),
        from_time: args.from_time,
        duration: args.effective_duration(),
        denoise: args.denoise,
        width: args.width,
        height: args.height,
        extra_args: args.extra_args.clone(),
    };

    let result = match args.encoder {
        Encoder::Ffmpeg => ffmpeg::encode(&params, cancel, print_progress),
        Encoder::Handbrake => handbrake::encode(&params, cancel, print_progress),
    };

    if result.is_ok() {
        println!();
        info!("encoding complete");
    }
    result
}

fn print_progress(progress: &EncodeProgress) {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine));
    let _ = write!(stdout, "{progress}");
    let _ = stdout.flush();
}
