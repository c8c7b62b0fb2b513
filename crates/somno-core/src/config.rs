//! Run configuration for the feature extractors
//!
//! Every extraction run takes an explicit [`ExtractionConfig`]; there is no
//! process-wide state. All structs implement [`Default`] with the values used
//! for 30 s sleep scoring, so callers usually override one or two fields with
//! struct-update syntax.

use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::DEFAULT_EPOCH_SECS;

/// Stabilising constant added before normalisation and logarithms
pub const DEFAULT_EPSILON: f64 = 1e-5;

// ============================================================================
// Wavelets
// ============================================================================

/// Orthonormal wavelet family used by the multi-resolution decomposition
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wavelet {
    /// Haar (2 taps)
    Haar,
    /// Daubechies, 2 vanishing moments (4 taps)
    Db2,
    /// Symlet, 4 vanishing moments (8 taps)
    #[default]
    Sym4,
}

impl Wavelet {
    /// Number of filter taps
    #[inline]
    #[must_use]
    pub const fn filter_len(self) -> usize {
        match self {
            Self::Haar => 2,
            Self::Db2 => 4,
            Self::Sym4 => 8,
        }
    }

    /// Short wavelet name
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Haar => "haar",
            Self::Db2 => "db2",
            Self::Sym4 => "sym4",
        }
    }

    /// Parse a short wavelet name (ASCII case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Haar, Self::Db2, Self::Sym4]
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// Per-extractor configuration
// ============================================================================

/// Direct bispectrum estimator settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BispectrumConfig {
    /// FFT length per segment (samples)
    pub nfft: usize,
    /// Fractional overlap between consecutive segments (0..1)
    pub overlap: f64,
    /// Output normalised bicoherence instead of bispectrum magnitude
    pub bicoherence: bool,
}

impl Default for BispectrumConfig {
    fn default() -> Self {
        Self { nfft: 256, overlap: 0.5, bicoherence: false }
    }
}

/// Cepstral analysis settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CepstrumConfig {
    /// Duration of one partition in seconds
    pub partition_secs: f64,
}

impl Default for CepstrumConfig {
    fn default() -> Self {
        Self { partition_secs: 2.0 }
    }
}

/// Multi-resolution decomposition and sliding statistics settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MraConfig {
    /// Number of detail levels `L`
    pub levels: usize,
    /// Wavelet family
    pub wavelet: Wavelet,
    /// Bands to keep: `L` details (finest first) followed by the smooth
    pub selection: Vec<bool>,
    /// Statistics window length in seconds (one window per label)
    pub window_secs: f64,
}

impl MraConfig {
    /// Keep every band of an `levels`-level decomposition
    #[must_use]
    pub fn all_bands(levels: usize) -> Self {
        Self {
            levels,
            selection: vec![true; levels + 1],
            ..Self::default()
        }
    }

    /// Number of bands produced by the decomposition (`L + 1`)
    #[inline]
    #[must_use]
    pub fn band_count(&self) -> usize {
        self.levels + 1
    }

    /// Indices of the selected bands
    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.selection.iter().enumerate().filter(|&(_, &keep)| keep).map(|(i, _)| i)
    }

    /// Check that the configuration can produce output.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoLevels`] if `levels == 0`
    /// - [`ConfigError::MaskLength`] if the mask does not have `levels + 1` entries
    /// - [`ConfigError::EmptySelection`] if no band is selected
    /// - [`ConfigError::InvalidParameter`] for a non-positive window
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels == 0 {
            return Err(ConfigError::NoLevels);
        }
        if self.selection.len() != self.band_count() {
            return Err(ConfigError::MaskLength {
                expected: self.band_count(),
                got: self.selection.len(),
            });
        }
        if !self.selection.iter().any(|&keep| keep) {
            return Err(ConfigError::EmptySelection);
        }
        if !(self.window_secs.is_finite() && self.window_secs > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "window_secs",
                reason: "must be a positive number of seconds",
            });
        }
        Ok(())
    }
}

impl Default for MraConfig {
    fn default() -> Self {
        Self {
            levels: 5,
            wavelet: Wavelet::Sym4,
            selection: vec![true; 6],
            window_secs: DEFAULT_EPOCH_SECS,
        }
    }
}

// ============================================================================
// Run configuration
// ============================================================================

/// Complete configuration for one extraction run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Stabilising constant for normalisation and logarithms
    pub epsilon: f64,
    /// Bispectrum estimator settings
    pub bispectrum: BispectrumConfig,
    /// Cepstrum settings
    pub cepstrum: CepstrumConfig,
    /// Multi-resolution settings
    pub mra: MraConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            bispectrum: BispectrumConfig::default(),
            cepstrum: CepstrumConfig::default(),
            mra: MraConfig::default(),
        }
    }
}

impl ExtractionConfig {
    /// Check every section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "epsilon",
                reason: "must be a small positive number",
            });
        }
        if self.bispectrum.nfft < 4 {
            return Err(ConfigError::InvalidParameter {
                name: "bispectrum.nfft",
                reason: "must be at least 4 samples",
            });
        }
        if !(0.0..1.0).contains(&self.bispectrum.overlap) {
            return Err(ConfigError::InvalidParameter {
                name: "bispectrum.overlap",
                reason: "must lie in [0, 1)",
            });
        }
        if !(self.cepstrum.partition_secs.is_finite() && self.cepstrum.partition_secs > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "cepstrum.partition_secs",
                reason: "must be a positive number of seconds",
            });
        }
        self.mra.validate()
    }
}
