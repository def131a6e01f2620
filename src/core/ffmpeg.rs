use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::error::EncodeError;
use crate::core::params::EncodeParams;
use crate::core::probe;
use crate::core::progress::{round_to, EncodeProgress};
use crate::core::runner::{self, CancelToken};

/// Running state accumulated across ffmpeg's key=value progress stream.
/// Speed and size arrive on their own lines and are carried forward; each
/// `out_time_ms` update produces a fresh snapshot against the known total
/// duration.
pub struct ProgressTracker {
    total_duration: Duration,
    fps_avg: f64,
    current_size: u64,
    started_at: Option<Instant>,
}

impl ProgressTracker {
    pub fn new(total_duration: Duration) -> Self {
        Self {
            total_duration,
            fps_avg: 0.0,
            current_size: 0,
            started_at: None,
        }
    }

    pub fn push_line(&mut self, line: &str) -> Option<EncodeProgress> {
        let line = line.trim();

        if line.starts_with("progress=continue") {
            if self.started_at.is_none() {
                self.started_at = Some(Instant::now());
            }
            return None;
        }

        if let Some(value) = line.strip_prefix("fps=") {
            if let Ok(fps) = value.trim().parse::<f64>() {
                self.fps_avg = fps;
            }
            return None;
        }

        if let Some(value) = line.strip_prefix("total_size=") {
            if let Ok(size) = value.trim().parse::<u64>() {
                self.current_size = size;
            }
            return None;
        }

        if let Some(value) = line.strip_prefix("out_time_ms=") {
            let micros = value.trim().parse::<i64>().ok()?;
            if self.total_duration.is_zero() {
                return None;
            }

            // out_time_ms carries microseconds despite the name.
            let out_time = Duration::from_micros(micros.max(0) as u64);
            let percent = round_to(
                (out_time.as_secs_f64() / self.total_duration.as_secs_f64() * 100.0).min(100.0),
                2,
            );

            let mut eta = Duration::ZERO;
            if let Some(started_at) = self.started_at {
                if percent > 0.0 && percent < 100.0 {
                    let elapsed = started_at.elapsed();
                    let estimated = elapsed.mul_f64(100.0 / percent);
                    eta = Duration::from_secs(estimated.saturating_sub(elapsed).as_secs());
                }
            }

            return Some(EncodeProgress {
                percent,
                fps_avg: self.fps_avg,
                eta,
                current_size: self.current_size,
            });
        }

        None
    }
}

fn input_title(input_path: &str) -> String {
    Path::new(input_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn build_args(params: &EncodeParams) -> Vec<String> {
    let mut args: Vec<String> = ["ffmpeg", "-y", "-progress", "pipe:1", "-stats_period", "3"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    // Seek and duration must precede -i to apply to the input.
    if params.from_time > Duration::ZERO {
        args.push("-ss".to_string());
        args.push(format!("{}", params.from_time.as_secs()));
    }
    if params.duration > Duration::ZERO {
        args.push("-t".to_string());
        args.push(format!("{}", params.duration.as_secs()));
    }

    args.push("-i".to_string());
    args.push(params.input_path.clone());

    args.push("-c:v".to_string());
    args.push("hevc_videotoolbox".to_string());
    args.push("-q:v".to_string());
    args.push(format!("{:.0}", params.quality));
    args.push("-profile:v".to_string());
    let profile = if params.ten_bit { "main10" } else { "main" };
    args.push(profile.to_string());
    args.push("-map_metadata".to_string());
    args.push("0".to_string());
    args.push("-metadata".to_string());
    args.push(format!("title={}", input_title(&params.input_path)));

    if params.width > 0 || params.height > 0 {
        let scale_filter = if params.width > 0 && params.height > 0 {
            format!(
                "scale={}:{}:force_original_aspect_ratio=decrease",
                params.width, params.height
            )
        } else if params.width > 0 {
            format!("scale={}:-2", params.width)
        } else {
            format!("scale=-2:{}", params.height)
        };
        args.push("-vf".to_string());
        args.push(scale_filter);
    }

    args.push(params.output_path.clone());

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
    let total_duration = if params.duration > Duration::ZERO {
        params.duration
    } else {
        probe::probe(&params.input_path)?.duration
    };

    let args = build_args(params);
    debug!(?args, "starting ffmpeg encode");

    let mut tracker = ProgressTracker::new(total_duration);
    runner::run_with_progress(
        &args,
        cancel,
        move |line| tracker.push_line(line),
        on_progress,
    )
}
