use std::time::Duration;

/// Parameters for one encode invocation, shared by both backends.
#[derive(Debug, Clone, Default)]
pub struct EncodeParams {
    pub input_path: String,
    pub output_path: String,
    pub quality: f64,
    pub ten_bit: bool,
    pub from_time: Duration,
    pub duration: Duration,
    /// Honored by the HandBrake backend only.
    pub denoise: bool,
    pub width: u32,
    pub height: u32,
    pub extra_args: Vec<String>,
}
