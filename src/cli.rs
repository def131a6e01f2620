use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::core::progress::parse_compact_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoder {
    Handbrake,
    Ffmpeg,
}

fn duration_arg(text: &str) -> Result<Duration, String> {
    parse_compact_duration(text)
        .ok_or_else(|| format!("invalid duration {text:?} (expected e.g. 5m30s, 1h30m, 300s)"))
}

#[derive(Debug, Parser)]
#[command(
    name = "encx",
    version,
    about = "HandBrakeCLI/ffmpeg front end for x265 re-encodes"
)]
pub struct Cli {
    /// Video file to encode
    #[arg(value_name = "VIDEO")]
    pub video_path: String,

    /// Encoder engine
    #[arg(long, value_enum, default_value_t = Encoder::Handbrake)]
    pub encoder: Encoder,

    /// x265 quality factor
    #[arg(long, default_value_t = 35.0)]
    pub quality: f64,

    /// Directory to save encoded files (defaults to the input's directory)
    #[arg(long = "output-dir")]
    pub output_dir: Option<String>,

    /// Enable denoise filter (HandBrake only)
    #[arg(long)]
    pub denoise: bool,

    /// Encode using 10-bit profile (default)
    #[arg(long = "10bit")]
    pub ten_bit: bool,

    /// Encode using 8-bit profile
    #[arg(long = "8bit", overrides_with = "ten_bit")]
    pub eight_bit: bool,

    /// Start encoding from this time (e.g. 5m30s, 1h30m, 300s)
    #[arg(long = "from", value_parser = duration_arg, default_value = "0s")]
    pub from_time: Duration,

    /// End encoding at this time (mutually exclusive with --duration)
    #[arg(long = "to", value_parser = duration_arg, default_value = "0s")]
    pub to_time: Duration,

    /// Encoding duration (e.g. 10m, 1h30m, 420s)
    #[arg(long, value_parser = duration_arg, default_value = "0s")]
    pub duration: Duration,

    /// Output video width
    #[arg(long, default_value_t = 0)]
    pub width: u32,

    /// Output video height
    #[arg(long, default_value_t = 0)]
    pub height: u32,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Extra arguments passed to the encoder verbatim
    #[arg(last = true, value_name = "EXTRA_ARGS")]
    pub extra_args: Vec<String>,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if self.duration > Duration::ZERO && self.to_time > Duration::ZERO {
            return Err("cannot specify both --duration and --to flags".to_string());
        }
        if self.to_time > Duration::ZERO && self.to_time <= self.from_time {
            return Err("--to time must be after --from time".to_string());
        }
        Ok(())
    }

    pub fn is_ten_bit(&self) -> bool {
        self.ten_bit || !self.eight_bit
    }

    pub fn effective_duration(&self) -> Duration {
        if self.to_time > Duration::ZERO {
            self.to_time - self.from_time
        } else {
            self.duration
        }
    }
}
