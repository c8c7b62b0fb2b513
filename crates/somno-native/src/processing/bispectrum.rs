//! Direct (FFT-based) bispectrum and bicoherence estimation
//!
//! The epoch is split into overlapping Hann-windowed segments; the triple
//! product `X(f1)·X(f2)·X*(f1+f2)` is averaged over segments for every pair
//! of non-negative frequency bins below Nyquist.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use somno_core::{BispectrumConfig, BispectrumMatrix, ShapeError};

use super::windowing::hann_window;

/// Segment-averaged bispectrum estimator
pub struct BispectrumEstimator {
    nfft: usize,
    hop: usize,
    sample_rate: f64,
    bicoherence: bool,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
}

impl BispectrumEstimator {
    /// Create a new estimator
    ///
    /// # Arguments
    ///
    /// * `config` - Segment length, overlap and output kind
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::TooSmall`] if `config.nfft < 4` (the matrix would
    /// be smaller than 2×2).
    pub fn new(config: &BispectrumConfig, sample_rate: f64) -> Result<Self, ShapeError> {
        let nfft = config.nfft;
        if nfft < 2 * BispectrumMatrix::MIN_SIZE {
            return Err(ShapeError::TooSmall {
                size: nfft / 2,
                min: BispectrumMatrix::MIN_SIZE,
            });
        }
        let overlap = config.overlap.clamp(0.0, 0.99);
        let hop = ((nfft as f64 * (1.0 - overlap)).round() as usize).max(1);

        let mut planner = FftPlanner::new();
        Ok(Self {
            nfft,
            hop,
            sample_rate,
            bicoherence: config.bicoherence,
            fft: planner.plan_fft_forward(nfft),
            window: hann_window(nfft),
        })
    }

    /// Side length of the output matrix (`nfft / 2`)
    #[inline]
    #[must_use]
    pub fn output_size(&self) -> usize {
        self.nfft / 2
    }

    /// Frequency resolution (Hz per bin)
    #[must_use]
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.nfft as f64
    }

    /// Number of segments averaged for a signal of `len` samples
    #[must_use]
    pub fn segment_count(&self, len: usize) -> usize {
        if len < self.nfft {
            0
        } else {
            (len - self.nfft) / self.hop + 1
        }
    }

    /// Estimate the bispectrum magnitude (or bicoherence) of `samples`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InsufficientSamples`] if `samples` is shorter
    /// than one segment.
    pub fn estimate(&self, samples: &[f64]) -> Result<BispectrumMatrix, ShapeError> {
        let n_segments = self.segment_count(samples.len());
        if n_segments == 0 {
            return Err(ShapeError::InsufficientSamples {
                available: samples.len(),
                required: self.nfft,
            });
        }

        let half = self.output_size();
        let mut triple = vec![Complex::new(0.0, 0.0); half * half];
        let mut pair_power = vec![0.0; half * half];
        let mut sum_power = vec![0.0; half * half];

        let mut buffer = vec![Complex::new(0.0, 0.0); self.nfft];
        let mut scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];

        for seg in 0..n_segments {
            let segment = &samples[seg * self.hop..seg * self.hop + self.nfft];
            let mean = segment.iter().sum::<f64>() / self.nfft as f64;
            for (b, (&s, &w)) in buffer.iter_mut().zip(segment.iter().zip(&self.window)) {
                *b = Complex::new((s - mean) * w, 0.0);
            }
            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for f1 in 0..half {
                for f2 in 0..half {
                    // f1 + f2 < nfft, no wrap needed
                    let x12 = buffer[f1] * buffer[f2];
                    let x3 = buffer[f1 + f2];
                    let idx = f1 * half + f2;
                    triple[idx] += x12 * x3.conj();
                    if self.bicoherence {
                        pair_power[idx] += x12.norm_sqr();
                        sum_power[idx] += x3.norm_sqr();
                    }
                }
            }
        }

        let values: Vec<f64> = if self.bicoherence {
            triple
                .iter()
                .zip(pair_power.iter().zip(&sum_power))
                .map(|(t, (&p12, &p3))| {
                    let denom = p12 * p3;
                    if denom > 0.0 {
                        t.norm_sqr() / denom
                    } else {
                        0.0
                    }
                })
                .collect()
        } else {
            let scale = 1.0 / n_segments as f64;
            triple.iter().map(|t| t.norm() * scale).collect()
        };

        let freqs = (0..half).map(|k| k as f64 * self.frequency_resolution()).collect();
        Ok(BispectrumMatrix::new(half, values)?.with_freqs(freqs))
    }
}
