use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("Malformed or unsupported WAV container: {0}")]
    WavFormat(String),

    #[error("Failed to detect preamble")]
    SyncNotFound,

    #[error("Symbol stream out of sync with framing: {0}")]
    Desync(String),

    #[error("Frame checksum mismatch (expected {expected:#010x}, computed {actual:#010x})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Frame too short ({len} bytes)")]
    TooShort { len: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("FFT error: {0}")]
    Fft(String),
}

pub type Result<T> = std::result::Result<T, ModemError>;
