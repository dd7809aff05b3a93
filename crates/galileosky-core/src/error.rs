use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Framing errors
    #[error("frame exceeds maximum size: {0} bytes")]
    FrameTooLarge(usize),

    #[error("invalid frame header byte: {0:#04x}")]
    InvalidFrameHeader(u8),

    // Tag stream errors
    #[error("unsupported tag id: {0:#04x}")]
    UnsupportedTag(u8),

    #[error("truncated tag payload for tag {tag:#04x}: need {needed} bytes, have {available}")]
    TruncatedTag { tag: u8, needed: usize, available: usize },

    // Mercury 230 errors
    #[error("mercury 230 blob has wrong size: expected 93 bytes, got {0}")]
    MercuryWrongSize(usize),

    #[error("mercury 230 blob missing leading 0x02 marker")]
    MercuryMissingMarker,

    // Sink errors
    #[error("sink write failed: {0}")]
    SinkWriteFailed(String),

    // Configuration errors
    #[error("invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
