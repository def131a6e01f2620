use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

/// Snapshot of encode progress, re-created on every parsed update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeProgress {
    pub percent: f64,
    pub fps_avg: f64,
    pub eta: Duration,
    pub current_size: u64,
}

impl EncodeProgress {
    pub fn encoded_mb(&self) -> f64 {
        self.current_size as f64 / 1_048_576.0
    }

    pub fn estimated_mb(&self) -> f64 {
        if self.percent == 0.0 {
            return 0.0;
        }
        round_to(self.encoded_mb() / (self.percent / 100.0), 1)
    }
}

impl fmt::Display for EncodeProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:3.1}fps, {:3.1}MB/{:3.1}MB ({:.1}%) ETA: {}",
            self.fps_avg,
            self.encoded_mb(),
            self.estimated_mb(),
            self.percent,
            format_compact_duration(self.eta),
        )
    }
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

static RE_COMPACT_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+(?:\.\d+)?)s)?$").unwrap());

/// Parses compact duration notation ("01h23m45s", "23m45s", "1h30m", "300s").
/// Returns `None` on anything else rather than an error.
pub fn parse_compact_duration(text: &str) -> Option<Duration> {
    let caps = RE_COMPACT_DURATION.captures(text.trim())?;
    if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
        return None;
    }

    let hours = match caps.get(1) {
        Some(m) => m.as_str().parse::<u64>().ok()?,
        None => 0,
    };
    let minutes = match caps.get(2) {
        Some(m) => m.as_str().parse::<u64>().ok()?,
        None => 0,
    };
    let seconds = match caps.get(3) {
        Some(m) => m.as_str().parse::<f64>().ok()?,
        None => 0.0,
    };

    Some(Duration::from_secs_f64(
        hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
    ))
}

pub fn format_compact_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}h{minutes:02}m{seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_mb() {
        let progress = EncodeProgress {
            current_size: 2 * 1_048_576,
            ..Default::default()
        };
        assert_eq!(progress.encoded_mb(), 2.0);
    }

    #[test]
    fn test_estimated_mb() {
        let progress = EncodeProgress {
            percent: 25.0,
            current_size: 10 * 1_048_576,
            ..Default::default()
        };
        assert_eq!(progress.estimated_mb(), 40.0);
    }

    #[test]
    fn test_estimated_mb_zero_percent() {
        let progress = EncodeProgress {
            percent: 0.0,
            current_size: 123_456_789,
            ..Default::default()
        };
        assert_eq!(progress.estimated_mb(), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(42.4567, 1), 42.5);
        assert_eq!(round_to(42.4549, 2), 42.45);
        assert_eq!(round_to(100.0, 2), 100.0);
    }

    #[test]
    fn test_round_to_idempotent() {
        let once = round_to(7.36281, 1);
        assert_eq!(round_to(once, 1), once);
        let twice = round_to(99.99499, 2);
        assert_eq!(round_to(twice, 2), twice);
    }

    #[test]
    fn test_parse_compact_duration() {
        assert_eq!(
            parse_compact_duration("00h01m30s"),
            Some(Duration::from_secs(90))
        );
        assert_eq!(
            parse_compact_duration("1h30m"),
            Some(Duration::from_secs(5400))
        );
        assert_eq!(
            parse_compact_duration("23m45s"),
            Some(Duration::from_secs(1425))
        );
        assert_eq!(parse_compact_duration("300s"), Some(Duration::from_secs(300)));
        assert_eq!(
            parse_compact_duration("1.5s"),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_parse_compact_duration_rejects_garbage() {
        assert_eq!(parse_compact_duration(""), None);
        assert_eq!(parse_compact_duration("soon"), None);
        assert_eq!(parse_compact_duration("10"), None);
        assert_eq!(parse_compact_duration("1h2x3s"), None);
    }

    #[test]
    fn test_format_compact_duration() {
        assert_eq!(format_compact_duration(Duration::from_secs(5445)), "1h30m45s");
        assert_eq!(format_compact_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_compact_duration(Duration::from_secs(7)), "7s");
        assert_eq!(format_compact_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_display_format() {
        let progress = EncodeProgress {
            percent: 42.5,
            fps_avg: 6.9,
            eta: Duration::from_secs(90),
            current_size: 10 * 1_048_576,
        };
        assert_eq!(
            progress.to_string(),
            "6.9fps, 10.0MB/23.5MB (42.5%) ETA: 1m30s"
        );
    }
}
