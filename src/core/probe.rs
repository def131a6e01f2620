use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::core::error::EncodeError;

/// Metadata reported by ffprobe for a video file.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub duration: Duration,
    pub codec: String,
    pub fps: f64,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
    pub container: String,
    pub aspect_ratio: f64,
    pub sample_ar: f64,
}

impl ProbeResult {
    pub fn is_vertical(&self) -> bool {
        self.width < self.height
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    codec_name: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    r_frame_rate: String,
    #[serde(default)]
    bit_rate: String,
    #[serde(default)]
    sample_aspect_ratio: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    bit_rate: String,
}

pub fn probe(video_path: &str) -> Result<ProbeResult, EncodeError> {
    debug!(%video_path, "running ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_streams",
            "-show_format",
            "-print_format",
            "json",
            video_path,
        ])
        .output()
        .map_err(EncodeError::ProbeExec)?;

    if !output.status.success() {
        return Err(EncodeError::ProbeFailed(format!(
            "ffprobe exited with {}",
            output.status
        )));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)?;
    probe_result_from(parsed, video_path)
}

fn probe_result_from(parsed: ProbeOutput, video_path: &str) -> Result<ProbeResult, EncodeError> {
    let video = parsed
        .streams
        .iter()
        .find(|stream| stream.codec_type == "video")
        .ok_or(EncodeError::NoVideoStream)?;

    let duration_secs = parsed
        .format
        .duration
        .parse::<f64>()
        .map_err(|_| EncodeError::InvalidDuration(parsed.format.duration.clone()))?;
    let duration = Duration::from_secs(duration_secs as u64);

    let size_bytes = parsed.format.size.parse().unwrap_or(0);

    let mut bitrate: u64 = video.bit_rate.parse().unwrap_or(0);
    if bitrate == 0 {
        bitrate = parsed.format.bit_rate.parse().unwrap_or(0);
    }

    let container = Path::new(video_path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    Ok(ProbeResult {
        duration,
        codec: video.codec_name.clone(),
        fps: parse_fps(&video.r_frame_rate),
        size_bytes,
        width: video.width,
        height: video.height,
        bitrate,
        container,
        aspect_ratio: video.width as f64 / video.height as f64,
        sample_ar: parse_sample_aspect_ratio(&video.sample_aspect_ratio),
    })
}

/// Parses a frame rate expressed as "30000/1001".
fn parse_fps(r_frame_rate: &str) -> f64 {
    let Some((num, den)) = r_frame_rate.split_once('/') else {
        return 0.0;
    };
    match (num.parse::<f64>(), den.parse::<f64>()) {
        (Ok(num), Ok(den)) if den != 0.0 => num / den,
        _ => 0.0,
    }
}

/// Parses a sample aspect ratio expressed as "1:1"; defaults to square.
fn parse_sample_aspect_ratio(sar: &str) -> f64 {
    let Some((w, h)) = sar.split_once(':') else {
        return 1.0;
    };
    match (w.parse::<f64>(), h.parse::<f64>()) {
        (Ok(w), Ok(h)) if h != 0.0 => w / h,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FFPROBE_JSON: &str = r#"{
        "streams": [
            {
                "codec_type": "audio",
                "codec_name": "aac"
            },
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30000/1001",
                "bit_rate": "4500000",
                "sample_aspect_ratio": "1:1"
            }
        ],
        "format": {
            "duration": "4223.933000",
            "size": "2476452119",
            "bit_rate": "4690891"
        }
    }"#;

    #[test]
    fn test_probe_result_from_json() {
        let parsed: ProbeOutput = serde_json::from_str(FFPROBE_JSON).unwrap();
        let result = probe_result_from(parsed, "/videos/show.mkv").unwrap();
        assert_eq!(result.duration, Duration::from_secs(4223));
        assert_eq!(result.codec, "h264");
        assert_eq!(result.width, 1920);
        assert_eq!(result.height, 1080);
        assert_eq!(result.size_bytes, 2_476_452_119);
        assert_eq!(result.bitrate, 4_500_000);
        assert_eq!(result.container, "mkv");
        assert!((result.fps - 29.97).abs() < 0.01);
        assert_eq!(result.sample_ar, 1.0);
        assert!(!result.is_vertical());
    }

    #[test]
    fn test_bitrate_falls_back_to_format() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "hevc", "width": 1280, "height": 720, "r_frame_rate": "25/1"}],
            "format": {"duration": "10.0", "bit_rate": "900000"}
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        let result = probe_result_from(parsed, "clip.mp4").unwrap();
        assert_eq!(result.bitrate, 900_000);
        assert_eq!(result.size_bytes, 0);
    }

    #[test]
    fn test_missing_video_stream() {
        let json = r#"{
            "streams": [{"codec_type": "audio", "codec_name": "mp3"}],
            "format": {"duration": "10.0"}
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        assert!(matches!(
            probe_result_from(parsed, "song.mp3"),
            Err(EncodeError::NoVideoStream)
        ));
    }

    #[test]
    fn test_unparseable_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "h264", "width": 10, "height": 10}],
            "format": {"duration": "N/A"}
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        assert!(matches!(
            probe_result_from(parsed, "weird.mkv"),
            Err(EncodeError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_parse_fps() {
        assert!((parse_fps("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_fps("25/1"), 25.0);
        assert_eq!(parse_fps("0/0"), 0.0);
        assert_eq!(parse_fps(""), 0.0);
    }

    #[test]
    fn test_parse_sample_aspect_ratio() {
        assert_eq!(parse_sample_aspect_ratio("1:1"), 1.0);
        assert_eq!(parse_sample_aspect_ratio("4:3"), 4.0 / 3.0);
        assert_eq!(parse_sample_aspect_ratio(""), 1.0);
        assert_eq!(parse_sample_aspect_ratio("1:0"), 1.0);
    }

    #[test]
    fn test_vertical_detection() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "h264", "width": 1080, "height": 1920, "r_frame_rate": "30/1"}],
            "format": {"duration": "60.0"}
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        assert!(probe_result_from(parsed, "short.mp4").unwrap().is_vertical());
    }
}
