//! Somno Native - Host-side feature extraction for sleep staging
//!
//! This crate turns labelled polysomnography epochs into feature tables:
//! - Bispectral entropy and log-magnitude features
//! - Partition-averaged real cepstra
//! - MODWT multi-resolution band statistics
//!
//! # Modules
//!
//! - [`features`]: Per-epoch extractors and feature tables
//! - [`processing`]: Windowing, FFT-based estimators, wavelets, moments
//! - [`error`]: Extraction error type
//!
//! # Example
//!
//! ```
//! use somno_core::{Channel, Recording, SignalKind, SleepStage};
//! use somno_native::features::{channel_epochs, extract_cepstrum};
//!
//! let samples: Vec<f64> = (0..600).map(|i| (i as f64 * 0.3).sin()).collect();
//! let recording = Recording::new(
//!     10.0,
//!     vec![Channel::new("C3", SignalKind::Eeg, samples)],
//!     vec![SleepStage::Wake, SleepStage::N1],
//! );
//!
//! let epochs = channel_epochs(&recording, "C3")?;
//! let out = extract_cepstrum(&epochs, recording.sample_rate_hz, 2.0)?;
//! assert_eq!(out.table.len(), 2);
//! assert_eq!(out.quefrency.len(), 20);
//! # Ok::<(), somno_native::ExtractionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod error;
pub mod features;
pub mod processing;

// Re-export key types
pub use error::{ExtractionError, ExtractionResult};
pub use features::{
    bispectral_features, channel_epochs, compute_multiresolution_statistics,
    extract_bispectrum_features, extract_cepstrum, BispectralFeatures, BispectralRow,
    CepstrumExtractor, FeatureRow, FeatureTable, MultiResolutionOutput,
};
pub use processing::bispectrum::BispectrumEstimator;
pub use processing::wavelet::MultiResolution;
