use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_RESOLUTION_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+[pk]\]").unwrap());

/// Builds the output filename from the input name and the final dimensions,
/// tagging the stem with a resolution band and the codec. Any resolution tag
/// already present in the stem is stripped first.
pub fn generate_filename(
    file_path: &str,
    source_width: u32,
    source_height: u32,
    requested_width: u32,
    requested_height: u32,
) -> String {
    let mut final_width = source_width;
    let mut final_height = source_height;

    if requested_width > 0 || requested_height > 0 {
        if requested_width > 0 && requested_height > 0 {
            final_width = requested_width;
            final_height = requested_height;
        } else if requested_width > 0 {
            let aspect_ratio = source_height as f64 / source_width as f64;
            final_width = requested_width;
            final_height = (requested_width as f64 * aspect_ratio) as u32;
        } else {
            let aspect_ratio = source_width as f64 / source_height as f64;
            final_height = requested_height;
            final_width = (requested_height as f64 * aspect_ratio) as u32;
        }
    }

    let max_length = final_width.max(final_height);
    let resolution = match max_length {
        n if n >= 3000 => Some("4K"),
        1900..=2000 => Some("1080p"),
        1200..=1400 => Some("720p"),
        _ => None,
    };

    let path = Path::new(file_path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = RE_RESOLUTION_TAG.replace_all(&stem, "");
    let stripped = stripped.trim();

    let new_stem = match resolution {
        Some(tag) => format!("{stripped} [{tag}, x265]"),
        None => format!("{stripped} [x265]"),
    };

    match path.extension() {
        Some(ext) => format!("{new_stem}.{}", ext.to_string_lossy()),
        None => new_stem,
    }
}

/// Inserts a ".reencoded" marker before the extension, used when the
/// generated output path would clobber the input file.
pub fn reencoded_path(path: &str) -> String {
    match Path::new(path).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            let suffix = format!(".{ext}");
            let stem = path.strip_suffix(suffix.as_str()).unwrap_or(path);
            format!("{stem}.reencoded.{ext}")
        }
        None => format!("{path}.reencoded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_filename_1080p() {
        assert_eq!(
            generate_filename("/videos/Show S01E01.mkv", 1920, 1080, 0, 0),
            "Show S01E01 [1080p, x265].mkv"
        );
    }

    #[test]
    fn test_generate_filename_4k() {
        assert_eq!(
            generate_filename("movie.mp4", 3840, 2160, 0, 0),
            "movie [4K, x265].mp4"
        );
    }

    #[test]
    fn test_generate_filename_720p() {
        assert_eq!(
            generate_filename("clip.mkv", 1280, 720, 0, 0),
            "clip [720p, x265].mkv"
        );
    }

    #[test]
    fn test_generate_filename_untagged_resolution() {
        assert_eq!(
            generate_filename("old.avi", 640, 480, 0, 0),
            "old [x265].avi"
        );
    }

    #[test]
    fn test_generate_filename_strips_existing_tag() {
        assert_eq!(
            generate_filename("Show [1080p].mkv", 1920, 1080, 0, 0),
            "Show [1080p, x265].mkv"
        );
    }

    #[test]
    fn test_generate_filename_downscale_changes_tag() {
        assert_eq!(
            generate_filename("movie.mkv", 3840, 2160, 1920, 0),
            "movie [1080p, x265].mkv"
        );
    }

    #[test]
    fn test_generate_filename_exact_dimensions() {
        assert_eq!(
            generate_filename("movie.mkv", 1920, 1080, 1280, 720),
            "movie [720p, x265].mkv"
        );
    }

    #[test]
    fn test_generate_filename_height_only() {
        // 1080 tall from a 16:9 source scales the width proportionally.
        assert_eq!(
            generate_filename("movie.mkv", 3840, 2160, 0, 1080),
            "movie [1080p, x265].mkv"
        );
    }

    #[test]
    fn test_reencoded_path() {
        assert_eq!(reencoded_path("/v/movie.mkv"), "/v/movie.reencoded.mkv");
        assert_eq!(reencoded_path("noext"), "noext.reencoded");
    }
}
