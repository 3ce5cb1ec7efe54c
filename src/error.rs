use thiserror::Error;

/// Precondition failures raised while constructing processors or running
/// transforms. These are caller mistakes detectable before any audio moves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DspError {
    #[error("transform length {0} is not a power of two")]
    NotPowerOfTwo(usize),
    #[error("buffer too short: need {needed} values, got {got}")]
    LengthMismatch { needed: usize, got: usize },
    #[error("harmonic tone needs at least one harmonic")]
    NoHarmonics,
    #[error("tone pattern step list is empty")]
    EmptyPattern,
    #[error("tone pattern description must hold (delta, count) pairs, got {0} values")]
    UnpairedPattern(usize),
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Stream protocol violations and faults carried in-band through a pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    #[error("stream is closed: every receiver has been dropped")]
    Closed,
    #[error("read past end of stream")]
    ReadPastEnd,
    #[error("input {input} buffered {buffered} samples, over the cap of {cap}")]
    BufferOverflow {
        input: usize,
        buffered: usize,
        cap: usize,
    },
    #[error("stream task failed: {0}")]
    Task(String),
}

/// Failures loading a processor stack description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Dsp(#[from] DspError),
}

/// Failures in the WAV file layer.
#[cfg(feature = "wav")]
#[derive(Debug, Error)]
pub enum WavError {
    #[error("wav codec error: {0}")]
    Codec(#[from] hound::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
    #[error("bad clip entry `{0}`")]
    BadClip(String),
    #[error("no readable input files for {}", .0.display())]
    NoInput(std::path::PathBuf),
    #[error(
        "format mismatch in {}: expected {expected_rate} Hz x{expected_channels}, found {rate} Hz x{channels}",
        .path.display()
    )]
    FormatMismatch {
        path: std::path::PathBuf,
        expected_rate: u32,
        expected_channels: u16,
        rate: u32,
        channels: u16,
    },
}
