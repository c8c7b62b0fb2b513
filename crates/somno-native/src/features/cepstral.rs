//! Partition-averaged real cepstrum
//!
//! Each epoch is cut into `K = ⌊T / dt⌋` Hann-windowed partitions of
//! `M = ⌊dt · fs⌋` samples. The real cepstrum `Re(IFFT(ln|FFT(x)|))` of every
//! partition is computed and the `K` vectors are averaged element-wise.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use somno_core::{ConfigError, Epoch, ShapeError, SleepStage};

use super::table::{FeatureRow, FeatureTable};
use super::try_map_epochs;
use crate::error::{ExtractionError, ExtractionResult};
use crate::processing::windowing::{partition, WindowFunction};

/// Slack when flooring sample and partition counts, so that `30 / 0.1`
/// yields 300 partitions rather than 299
const COUNT_TOLERANCE: f64 = 1e-9;

/// Smallest magnitude passed to the logarithm
const MAGNITUDE_FLOOR: f64 = f64::MIN_POSITIVE;

/// Sample rates closer than this are considered equal (Hz)
const RATE_TOLERANCE: f64 = 1e-6;

#[inline]
fn floor_count(x: f64) -> usize {
    (x + COUNT_TOLERANCE).floor() as usize
}

/// One row of the cepstral feature table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CepstralRow {
    /// Epoch index
    pub epoch: usize,
    /// Partition-averaged cepstral coefficients (length `M`)
    pub cepstrum: Vec<f64>,
    /// Sleep stage
    pub stage: SleepStage,
}

impl FeatureRow for CepstralRow {
    fn epoch(&self) -> usize {
        self.epoch
    }

    fn stage(&self) -> SleepStage {
        self.stage
    }

    fn values(&self) -> Vec<f64> {
        self.cepstrum.clone()
    }
}

/// Cepstral features for a run of epochs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CepstrumOutput {
    /// One row per epoch, in epoch order
    pub table: FeatureTable<CepstralRow>,
    /// Quefrency of each coefficient in seconds (shared by all rows)
    pub quefrency: Vec<f64>,
}

/// Real-cepstrum extractor for a fixed sample rate and partition length
pub struct CepstrumExtractor {
    sample_rate: f64,
    partition_secs: f64,
    partition_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl CepstrumExtractor {
    /// Create a new extractor
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz
    /// * `partition_secs` - Partition duration `dt` in seconds
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidParameter`] for a non-positive rate or duration
    /// - [`ShapeError::EmptyPartition`] if `dt · fs < 1`
    pub fn new(sample_rate: f64, partition_secs: f64) -> ExtractionResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "sample_rate",
                reason: "must be a positive frequency",
            }
            .into());
        }
        if !(partition_secs.is_finite() && partition_secs > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "partition_secs",
                reason: "must be a positive number of seconds",
            }
            .into());
        }
        let partition_len = floor_count(partition_secs * sample_rate);
        if partition_len == 0 {
            return Err(ShapeError::EmptyPartition.into());
        }

        let mut planner = FftPlanner::new();
        Ok(Self {
            sample_rate,
            partition_secs,
            partition_len,
            forward: planner.plan_fft_forward(partition_len),
            inverse: planner.plan_fft_inverse(partition_len),
        })
    }

    /// Samples per partition (`M`)
    #[inline]
    #[must_use]
    pub fn partition_len(&self) -> usize {
        self.partition_len
    }

    /// Number of partitions (`K`) for an epoch of `duration_secs`
    #[inline]
    #[must_use]
    pub fn partition_count(&self, duration_secs: f64) -> usize {
        floor_count(duration_secs / self.partition_secs)
    }

    /// `M` evenly spaced quefrencies from 0 to `dt` inclusive
    #[must_use]
    pub fn quefrency(&self) -> Vec<f64> {
        let m = self.partition_len;
        if m == 1 {
            return vec![self.partition_secs];
        }
        let step = self.partition_secs / (m - 1) as f64;
        (0..m).map(|i| i as f64 * step).collect()
    }

    /// Real cepstrum of one (already windowed) partition
    #[must_use]
    pub fn real_cepstrum(&self, partition: &[f64]) -> Vec<f64> {
        let m = self.partition_len;
        let mut buffer: Vec<Complex<f64>> =
            partition.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(m, Complex::new(0.0, 0.0));

        let scratch_len = self
            .forward
            .get_inplace_scratch_len()
            .max(self.inverse.get_inplace_scratch_len());
        let mut scratch = vec![Complex::new(0.0, 0.0); scratch_len];

        self.forward.process_with_scratch(&mut buffer, &mut scratch);
        for c in &mut buffer {
            *c = Complex::new(c.norm().max(MAGNITUDE_FLOOR).ln(), 0.0);
        }
        self.inverse.process_with_scratch(&mut buffer, &mut scratch);

        // rustfft leaves the inverse unnormalised
        let scale = 1.0 / m as f64;
        buffer.iter().map(|c| c.re * scale).collect()
    }

    /// Partition-averaged cepstrum of one epoch.
    ///
    /// # Errors
    ///
    /// - [`ShapeError::SampleRateMismatch`] if the epoch was sampled at another rate
    /// - [`ShapeError::InsufficientSamples`] if the epoch is shorter than one partition
    pub fn epoch_cepstrum(&self, epoch: &Epoch) -> ExtractionResult<Vec<f64>> {
        if (epoch.sample_rate_hz - self.sample_rate).abs() > RATE_TOLERANCE {
            return Err(ShapeError::SampleRateMismatch {
                expected: self.sample_rate,
                got: epoch.sample_rate_hz,
            }
            .into());
        }

        let count = self.partition_count(epoch.duration_secs());
        if count == 0 {
            return Err(ShapeError::InsufficientSamples {
                available: epoch.len(),
                required: self.partition_len,
            }
            .into());
        }

        let parts = partition(&epoch.samples, count, self.partition_len, WindowFunction::Hann)?;
        let mut mean = vec![0.0; self.partition_len];
        for part in &parts {
            for (acc, c) in mean.iter_mut().zip(self.real_cepstrum(part)) {
                *acc += c;
            }
        }
        let scale = 1.0 / count as f64;
        mean.iter_mut().for_each(|c| *c *= scale);
        Ok(mean)
    }

    /// Extract the averaged cepstrum of every epoch.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Epoch`] wrapping the first failing epoch in
    /// input order; no rows are returned in that case.
    pub fn extract(&self, epochs: &[Epoch]) -> ExtractionResult<CepstrumOutput> {
        let rows = try_map_epochs(epochs, |epoch| {
            let cepstrum = self
                .epoch_cepstrum(epoch)
                .map_err(|e| e.in_epoch(epoch.index))?;
            Ok(CepstralRow { epoch: epoch.index, cepstrum, stage: epoch.stage })
        })?;

        let columns = (0..self.partition_len).map(|i| format!("c{i}")).collect();
        let table = FeatureTable::new(columns, rows)?;
        tracing::debug!(
            epochs = table.len(),
            partition_len = self.partition_len,
            partition_secs = self.partition_secs,
            "Extracted cepstral features"
        );

        Ok(CepstrumOutput { table, quefrency: self.quefrency() })
    }
}

/// Extract partition-averaged cepstra for `epochs` sampled at `sample_rate`.
///
/// # Errors
///
/// See [`CepstrumExtractor::new`] and [`CepstrumExtractor::extract`].
pub fn extract_cepstrum(
    epochs: &[Epoch],
    sample_rate: f64,
    partition_secs: f64,
) -> ExtractionResult<CepstrumOutput> {
    if let Some(epoch) = epochs.first() {
        if partition_secs > epoch.duration_secs() + COUNT_TOLERANCE {
            return Err(ExtractionError::from(ShapeError::InsufficientSamples {
                available: epoch.len(),
                required: floor_count(partition_secs * sample_rate),
            })
            .in_epoch(epoch.index));
        }
    }
    CepstrumExtractor::new(sample_rate, partition_secs)?.extract(epochs)
}
