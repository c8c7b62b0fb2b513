//! Error types for host-side feature extraction
//!
//! Wraps the `no_std` core errors with `thiserror` and adds the context an
//! orchestration layer needs to skip a failed epoch or recording.

use somno_core::{ConfigError, ShapeError};
use thiserror::Error;

/// Feature extraction error types
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Input has the wrong shape
    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    /// Run configuration cannot produce output
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single epoch failed; no output was produced for it
    #[error("Epoch {index} failed: {source}")]
    Epoch {
        /// Index of the failing epoch
        index: usize,
        /// Underlying error
        #[source]
        source: Box<ExtractionError>,
    },

    /// Requested channel is not present in the recording
    #[error("Unknown channel {name:?}")]
    UnknownChannel {
        /// Requested channel name
        name: String,
    },

    /// Recording carries no labelled epochs for the requested channel
    #[error("No complete labelled epochs on channel {name:?}")]
    NoEpochs {
        /// Channel name
        name: String,
    },
}

impl ExtractionError {
    /// Attach the epoch index to an error raised while processing it
    #[must_use]
    pub fn in_epoch(self, index: usize) -> Self {
        Self::Epoch { index, source: Box::new(self) }
    }

    /// Index of the failing epoch, if the error is tied to one
    #[must_use]
    pub fn epoch_index(&self) -> Option<usize> {
        match self {
            Self::Epoch { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type for extraction operations
pub type ExtractionResult<T> = Result<T, ExtractionError>;
