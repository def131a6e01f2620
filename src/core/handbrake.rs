use std::fs;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::core::error::EncodeError;
use crate::core::params::EncodeParams;
use crate::core::progress::{parse_compact_duration, round_to, EncodeProgress};
use crate::core::runner::{self, CancelToken};

static RE_PROGRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Encoding: task \d+ of \d+, ([\d.]+) %(?:\s*\([^,]+,\s*avg\s+([\d.]+)\s*fps,\s*ETA\s+([^)]+)\))?")
        .unwrap()
});

/// Extracts progress from one HandBrake output line. The avg-fps/ETA clause
/// is only present on some lines; when absent both default to zero. Current
/// size comes from a fresh stat of the output file (HandBrake does not
/// self-report it), and a missing file reads as zero.
pub fn parse_progress(line: &str, output_path: &str) -> Option<EncodeProgress> {
    let caps = RE_PROGRESS.captures(line)?;

    let percent = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    let mut fps_avg = 0.0;
    let mut eta = Duration::ZERO;
    if let Some(fps) = caps.get(2) {
        fps_avg = fps.as_str().parse().unwrap_or(0.0);
        if let Some(eta_text) = caps.get(3) {
            eta = parse_compact_duration(eta_text.as_str()).unwrap_or(Duration::ZERO);
        }
    }

    let current_size = fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);

    Some(EncodeProgress {
        percent: round_to(percent, 1),
        fps_avg,
        eta,
        current_size,
    })
}

pub fn build_args(params: &EncodeParams) -> Vec<String> {
    let encoder = if params.ten_bit {
        "vt_h265_10bit"
    } else {
        "vt_h265"
    };

    let quality = format!("{:.0}", params.quality);
    let mut args: Vec<String> = [
        "HandBrakeCLI",
        "--format",
        "av_mp4",
        "--input",
        params.input_path.as_str(),
        "--output",
        params.output_path.as_str(),
        "--optimize",
        "--encoder",
        encoder,
        "--quality",
        quality.as_str(),
        "--vfr",
        "--aencoder",
        "ac3",
        "--ab",
        "160",
        "--non-anamorphic",
        "--verbose",
        "1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if params.from_time > Duration::ZERO {
        args.push("--start-at".to_string());
        args.push(format!("duration:{:.1}", params.from_time.as_secs_f64()));
    }

    if params.duration > Duration::ZERO {
        args.push("--stop-at".to_string());
        args.push(format!("duration:{:.1}", params.duration.as_secs_f64()));
    }

    if params.denoise {
        args.push("--hqdn3d".to_string());
        args.push("light".to_string());
    }

    if params.width > 0 && params.height > 0 {
        args.push("--width".to_string());
        args.push(params.width.to_string());
        args.push("--height".to_string());
        args.push(params.height.to_string());
    } else if params.width > 0 {
        args.push("--width".to_string());
        args.push(params.width.to_string());
    } else if params.height > 0 {
        args.push("--height".to_string());
        args.push(params.height.to_string());
    }

    args.extend(params.extra_args.iter().cloned());

    args
}

pub fn encode<F>(
    params: &EncodeParams,
    cancel: &CancelToken,
    on_progress: F,
) -> Result<(), EncodeError>
where
    F: FnMut(&EncodeProgress),
{
    let args = build_args(params);
    debug!(?args, "starting HandBrake encode");

    let output_path = params.output_path.clone();
    runner::run_with_progress(
        &args,
        cancel,
        move |line| parse_progress(line, &output_path),
        on_progress,
    )
}
