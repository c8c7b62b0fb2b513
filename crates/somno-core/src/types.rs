//! Core types for the Somno feature pipeline
//!
//! This module provides the data model shared by every extractor:
//! - Sleep-stage labels (AASM, with legacy R&K codes accepted on input)
//! - Signal modality identifiers for polysomnography channels
//! - Fixed-duration epochs of one channel
//! - Square bispectrum matrices consumed by the entropy features

use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// Default epoch duration used for sleep scoring (seconds)
pub const DEFAULT_EPOCH_SECS: f64 = 30.0;

// ============================================================================
// Sleep Stages
// ============================================================================

/// Sleep stage assigned to one scoring epoch.
///
/// Serialised as its short hypnogram code (`W`, `N1`, `N2`, `N3`, `R`, `?`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SleepStage {
    /// Wakefulness
    #[serde(rename = "W", alias = "wake")]
    Wake = 0,
    /// Light sleep, stage 1
    #[serde(rename = "N1", alias = "S1")]
    N1 = 1,
    /// Light sleep, stage 2 (spindles, K-complexes)
    #[serde(rename = "N2", alias = "S2")]
    N2 = 2,
    /// Slow-wave sleep
    #[serde(rename = "N3", alias = "S3", alias = "S4")]
    N3 = 3,
    /// Rapid eye movement sleep
    #[serde(rename = "R", alias = "REM")]
    Rem = 4,
    /// Epoch was not scored (artefact, movement time, missing)
    #[serde(rename = "?", alias = "unscored", alias = "MT")]
    Unscored = 5,
}

impl SleepStage {
    /// All stages in hypnogram order
    pub const ALL: [Self; 6] = [
        Self::Wake, Self::N1, Self::N2, Self::N3, Self::Rem, Self::Unscored,
    ];

    /// Number of stages
    pub const COUNT: usize = 6;

    /// Get the array index for this stage
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short hypnogram code
    #[inline]
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Wake => "W",
            Self::N1 => "N1",
            Self::N2 => "N2",
            Self::N3 => "N3",
            Self::Rem => "R",
            Self::Unscored => "?",
        }
    }

    /// Check if this epoch was scored as any sleep stage
    #[inline]
    #[must_use]
    pub const fn is_sleep(self) -> bool {
        matches!(self, Self::N1 | Self::N2 | Self::N3 | Self::Rem)
    }

    /// Check if this epoch carries a usable label
    #[inline]
    #[must_use]
    pub const fn is_scored(self) -> bool {
        !matches!(self, Self::Unscored)
    }
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a hypnogram code is not recognised
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParseStageError;

impl fmt::Display for ParseStageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unrecognised sleep stage code")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseStageError {}

impl FromStr for SleepStage {
    type Err = ParseStageError;

    /// Parse an AASM code, or a legacy Rechtschaffen & Kales code.
    ///
    /// R&K stages 3 and 4 are both mapped to `N3`; movement time is unscored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        let stage = match code {
            c if c.eq_ignore_ascii_case("W") || c.eq_ignore_ascii_case("wake") => Self::Wake,
            c if c.eq_ignore_ascii_case("N1") || c.eq_ignore_ascii_case("S1") => Self::N1,
            c if c.eq_ignore_ascii_case("N2") || c.eq_ignore_ascii_case("S2") => Self::N2,
            c if c.eq_ignore_ascii_case("N3")
                || c.eq_ignore_ascii_case("S3")
                || c.eq_ignore_ascii_case("S4") =>
            {
                Self::N3
            }
            c if c.eq_ignore_ascii_case("R") || c.eq_ignore_ascii_case("REM") => Self::Rem,
            c if c == "?"
                || c.eq_ignore_ascii_case("unscored")
                || c.eq_ignore_ascii_case("MT") =>
            {
                Self::Unscored
            }
            _ => return Err(ParseStageError),
        };
        Ok(stage)
    }
}

// ============================================================================
// Signal Modalities
// ============================================================================

/// Polysomnography signal modality
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Electroencephalogram
    #[default]
    Eeg,
    /// Electrooculogram
    Eog,
    /// Electromyogram (chin)
    Emg,
    /// Electrocardiogram
    Ecg,
    /// Any other auxiliary channel (respiration, SpO2, ...)
    Other,
}

impl SignalKind {
    /// Get the modality name
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Eeg => "EEG",
            Self::Eog => "EOG",
            Self::Emg => "EMG",
            Self::Ecg => "ECG",
            Self::Other => "Other",
        }
    }
}

// ============================================================================
// Epochs
// ============================================================================

/// Fixed-duration segment of one recording channel with its sleep stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    /// Position of this epoch in the recording (0-based)
    pub index: usize,
    /// Raw samples in physical units
    pub samples: Vec<f64>,
    /// Sample rate in Hz
    pub sample_rate_hz: f64,
    /// Scored sleep stage
    pub stage: SleepStage,
}

impl Epoch {
    /// Create a new epoch
    #[must_use]
    pub fn new(index: usize, samples: Vec<f64>, sample_rate_hz: f64, stage: SleepStage) -> Self {
        Self { index, samples, sample_rate_hz, stage }
    }

    /// Number of samples in the epoch
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the epoch holds no samples
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of the epoch in seconds
    #[inline]
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz
    }

    /// Start time of the epoch relative to the recording start (seconds)
    #[inline]
    #[must_use]
    pub fn onset_secs(&self) -> f64 {
        self.index as f64 * self.duration_secs()
    }
}

// ============================================================================
// Bispectrum Matrix
// ============================================================================

/// Square bispectrum (or bicoherence) estimate for one epoch.
///
/// Values are stored row-major. Entries may be signed; consumers take
/// magnitudes before computing features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBispectrum")]
pub struct BispectrumMatrix {
    size: usize,
    values: Vec<f64>,
    /// Frequency axis in Hz, one entry per row/column (may be empty)
    #[serde(default)]
    pub freqs_hz: Vec<f64>,
}

#[derive(Deserialize)]
struct RawBispectrum {
    size: usize,
    values: Vec<f64>,
    #[serde(default)]
    freqs_hz: Vec<f64>,
}

impl TryFrom<RawBispectrum> for BispectrumMatrix {
    type Error = ShapeError;

    fn try_from(raw: RawBispectrum) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.size, raw.values)?.with_freqs(raw.freqs_hz))
    }
}

impl BispectrumMatrix {
    /// Minimum supported side length
    pub const MIN_SIZE: usize = 2;

    /// Create a matrix from row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::NotSquare`] if `values.len() != size * size`
    /// and [`ShapeError::TooSmall`] if `size < 2`.
    pub fn new(size: usize, values: Vec<f64>) -> Result<Self, ShapeError> {
        if size < Self::MIN_SIZE {
            return Err(ShapeError::TooSmall { size, min: Self::MIN_SIZE });
        }
        if values.len() != size * size {
            return Err(ShapeError::NotSquare { rows: size, cols: values.len() / size });
        }
        Ok(Self { size, values, freqs_hz: Vec::new() })
    }

    /// Create a matrix from a list of rows.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::Ragged`] if rows differ in length,
    /// [`ShapeError::NotSquare`] if the row count differs from the column count
    /// and [`ShapeError::TooSmall`] for matrices smaller than 2×2.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ShapeError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);

        for (row, r) in rows.iter().enumerate() {
            if r.len() != n_cols {
                return Err(ShapeError::Ragged { row, len: r.len(), expected: n_cols });
            }
        }
        if n_rows != n_cols {
            return Err(ShapeError::NotSquare { rows: n_rows, cols: n_cols });
        }

        let values = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(n_rows, values)
    }

    /// Attach a frequency axis.
    #[must_use]
    pub fn with_freqs(mut self, freqs_hz: Vec<f64>) -> Self {
        self.freqs_hz = freqs_hz;
        self
    }

    /// Side length
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major values
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at (row, col)
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.size && col < self.size, "index out of bounds");
        self.values[row * self.size + col]
    }

    /// Entries on the anti-diagonal, bottom-left to top-right.
    ///
    /// Equivalent to the main diagonal of the matrix flipped upside down.
    pub fn anti_diagonal(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.size).map(move |i| self.values[(self.size - 1 - i) * self.size + i])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_stage_parsing() {
        assert_eq!("W".parse::<SleepStage>(), Ok(SleepStage::Wake));
        assert_eq!("n2".parse::<SleepStage>(), Ok(SleepStage::N2));
        assert_eq!("REM".parse::<SleepStage>(), Ok(SleepStage::Rem));
        assert_eq!(" ? ".parse::<SleepStage>(), Ok(SleepStage::Unscored));
        assert!("N5".parse::<SleepStage>().is_err());
    }

    #[test]
    fn test_legacy_stage_codes() {
        assert_eq!("S1".parse::<SleepStage>(), Ok(SleepStage::N1));
        assert_eq!("S3".parse::<SleepStage>(), Ok(SleepStage::N3));
        assert_eq!("S4".parse::<SleepStage>(), Ok(SleepStage::N3));
        assert_eq!("MT".parse::<SleepStage>(), Ok(SleepStage::Unscored));
    }

    #[test]
    fn test_stage_codes_round_trip() {
        for stage in SleepStage::ALL {
            assert_eq!(stage.code().parse::<SleepStage>(), Ok(stage));
        }
        assert!(SleepStage::Rem.is_sleep());
        assert!(!SleepStage::Unscored.is_scored());
    }

    #[test]
    fn test_stage_serde_uses_codes() {
        let json = serde_json::to_string(&SleepStage::Rem).unwrap();
        assert_eq!(json, "\"R\"");
        let stage: SleepStage = serde_json::from_str("\"N3\"").unwrap();
        assert_eq!(stage, SleepStage::N3);
    }

    #[test]
    fn test_epoch_duration() {
        let epoch = Epoch::new(2, vec![0.0; 3000], 100.0, SleepStage::N2);
        assert!((epoch.duration_secs() - 30.0).abs() < 1e-12);
        assert!((epoch.onset_secs() - 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_bispectrum_from_rows() {
        let m = BispectrumMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.size(), 2);
        assert_eq!(m.get(1, 0), 3.0);
        let anti: Vec<f64> = m.anti_diagonal().collect();
        assert_eq!(anti, vec![3.0, 2.0]);
    }

    #[test]
    fn test_bispectrum_rejects_bad_shapes() {
        let err = BispectrumMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(err, Err(ShapeError::NotSquare { rows: 2, cols: 3 }));

        let err = BispectrumMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert_eq!(err, Err(ShapeError::Ragged { row: 1, len: 1, expected: 2 }));

        let err = BispectrumMatrix::new(1, vec![1.0]);
        assert_eq!(err, Err(ShapeError::TooSmall { size: 1, min: 2 }));
    }

    #[test]
    fn test_bispectrum_deserialize_validates() {
        let ok: BispectrumMatrix =
            serde_json::from_str(r#"{"size":2,"values":[1,0,0,1]}"#).unwrap();
        assert_eq!(ok.get(1, 1), 1.0);
        assert!(ok.freqs_hz.is_empty());

        let bad = serde_json::from_str::<BispectrumMatrix>(r#"{"size":2,"values":[1,0,0]}"#);
        assert!(bad.is_err());
    }
}
