//! Error types for the Somno feature pipeline
//!
//! These errors work in `no_std` environments and carry enough context to
//! tell which precondition an input violated without heap allocation.

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Shape Errors
// ============================================================================

/// An input does not have the shape an operation requires.
///
/// Shape errors are raised before any output is produced for the offending
/// epoch or signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeError {
    /// Matrix is not square
    NotSquare {
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
    },
    /// Matrix is smaller than the minimum supported size
    TooSmall {
        /// Actual side length
        size: usize,
        /// Minimum side length
        min: usize,
    },
    /// Signal is shorter than the operation requires
    InsufficientSamples {
        /// Number of samples available
        available: usize,
        /// Number of samples required
        required: usize,
    },
    /// Partition length of zero samples
    EmptyPartition,
    /// Partition count of zero
    NoPartitions,
    /// Epoch sample rate differs from the rate the extractor was built for
    SampleRateMismatch {
        /// Sample rate the extractor expects, in Hz
        expected: f64,
        /// Sample rate found on the epoch, in Hz
        got: f64,
    },
    /// A matrix row has a different length from the first row
    Ragged {
        /// Offending row index
        row: usize,
        /// Length of that row
        len: usize,
        /// Expected length
        expected: usize,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSquare { rows, cols } => {
                write!(f, "Matrix is not square: {rows}x{cols}")
            }
            Self::TooSmall { size, min } => {
                write!(f, "Matrix too small: {size}x{size}, need at least {min}x{min}")
            }
            Self::InsufficientSamples { available, required } => {
                write!(f, "Insufficient samples: {available}/{required}")
            }
            Self::EmptyPartition => write!(f, "Partition length must be at least one sample"),
            Self::NoPartitions => write!(f, "Partition count must be at least one"),
            Self::SampleRateMismatch { expected, got } => {
                write!(f, "Sample rate mismatch: expected {expected} Hz, got {got} Hz")
            }
            Self::Ragged { row, len, expected } => {
                write!(f, "Row {row} has {len} columns, expected {expected}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ShapeError {}

// ============================================================================
// Configuration Errors
// ============================================================================

/// A run was configured in a way that cannot produce output.
///
/// Configuration errors abort before any computation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Decomposition requested zero levels
    NoLevels,
    /// Band selection mask has no `true` entry
    EmptySelection,
    /// Band selection mask length does not match the level count
    MaskLength {
        /// Expected mask length (levels + 1)
        expected: usize,
        /// Actual mask length
        got: usize,
    },
    /// A numeric parameter is out of range
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the issue
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLevels => write!(f, "Decomposition must request at least one level"),
            Self::EmptySelection => write!(f, "Band selection must keep at least one band"),
            Self::MaskLength { expected, got } => {
                write!(f, "Band selection has {got} entries, expected {expected}")
            }
            Self::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter {name}: {reason}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
