//! Somno Core - `no_std` compatible data model for sleep-epoch features
//!
//! This crate provides the types shared by the Somno feature extractors. It
//! has no numeric dependencies so that loaders and embedded front ends can
//! produce [`Recording`]s and [`Epoch`]s without pulling in the host pipeline.
//!
//! # Modules
//!
//! - [`types`]: Sleep stages, signal kinds, epochs, bispectrum matrices
//! - [`recording`]: Multi-channel recordings with an aligned hypnogram
//! - [`config`]: Run configuration for every extractor
//! - [`error`]: Shape and configuration errors
//!
//! # Features
//!
//! - `std`: Enable standard library support (`std::error::Error` impls)
//!
//! # Example
//!
//! ```rust
//! use somno_core::{Channel, Recording, SignalKind, SleepStage};
//!
//! let samples = vec![0.0; 100 * 60];
//! let rec = Recording::new(
//!     100.0,
//!     vec![Channel::new("Fpz-Cz", SignalKind::Eeg, samples)],
//!     vec![SleepStage::Wake, SleepStage::N1],
//! );
//!
//! let epochs = rec.epochs(&rec.channels[0]);
//! assert_eq!(epochs.len(), 2);
//! assert_eq!(epochs[1].stage, SleepStage::N1);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod config;
pub mod error;
pub mod recording;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{
    BispectrumConfig, CepstrumConfig, ExtractionConfig, MraConfig, Wavelet, DEFAULT_EPSILON,
};
pub use error::{ConfigError, ShapeError};
pub use recording::{Channel, Recording};
pub use types::{BispectrumMatrix, Epoch, SignalKind, SleepStage, DEFAULT_EPOCH_SECS};
