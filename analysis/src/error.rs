use thiserror::Error;

/// Errors returned by analyzer ports.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("quality analysis failed: {0}")]
    Quality(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("embedding extraction failed: {0}")]
    Extraction(String),

    #[error("spoof detection failed: {0}")]
    SpoofCheck(String),

    #[error("face enrollment lookup failed: {0}")]
    Lookup(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
