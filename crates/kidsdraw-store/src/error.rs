//! Store error type.

use std::io;
use std::path::PathBuf;

/// Errors from reading, writing, or composing stored images.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A bitmap could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// A stored file could not be decoded.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode {
        /// File that failed.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// A file or base name would escape its directory or is empty.
    #[error("invalid file name '{0}'")]
    InvalidName(String),

    /// An artwork record could not be (de)serialized.
    #[error("invalid artwork record: {0}")]
    Record(#[from] serde_json::Error),

    /// The share image could not be composed.
    #[error("failed to compose share image: {0}")]
    Compose(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<image::ImageError> for StoreError {
    fn from(err: image::ImageError) -> Self {
        Self::Encode(err.to_string())
    }
}
