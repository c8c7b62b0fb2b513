//! Segment windowing
//!
//! Splits an epoch into equal, non-overlapping partitions and tapers each
//! one with a window function before spectral or cepstral analysis.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use somno_core::ShapeError;

/// Window applied to each partition
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    /// No tapering
    Rectangular,
    /// Symmetric Hann window
    #[default]
    Hann,
    /// Symmetric Hamming window
    Hamming,
}

impl WindowFunction {
    /// Generate `size` window coefficients.
    ///
    /// Symmetric windows of length one are `[1.0]`.
    #[must_use]
    pub fn coefficients(self, size: usize) -> Vec<f64> {
        match self {
            Self::Rectangular => vec![1.0; size],
            Self::Hann => hann_window(size),
            Self::Hamming => cosine_window(size, 0.54, 0.46),
        }
    }
}

/// Generate symmetric Hann window coefficients
#[must_use]
pub fn hann_window(size: usize) -> Vec<f64> {
    cosine_window(size, 0.5, 0.5)
}

fn cosine_window(size: usize, a0: f64, a1: f64) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|i| a0 - a1 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

/// Split `signal` into `count` partitions of `len` samples each.
///
/// Samples past `count * len` are discarded, never padded. Every partition is
/// multiplied element-wise by `window` of length `len`.
///
/// # Errors
///
/// - [`ShapeError::EmptyPartition`] if `len == 0`
/// - [`ShapeError::NoPartitions`] if `count == 0`
/// - [`ShapeError::InsufficientSamples`] if `count * len > signal.len()`
pub fn partition(
    signal: &[f64],
    count: usize,
    len: usize,
    window: WindowFunction,
) -> Result<Vec<Vec<f64>>, ShapeError> {
    if len == 0 {
        return Err(ShapeError::EmptyPartition);
    }
    if count == 0 {
        return Err(ShapeError::NoPartitions);
    }
    let required = count.checked_mul(len).ok_or(ShapeError::InsufficientSamples {
        available: signal.len(),
        required: usize::MAX,
    })?;
    if required > signal.len() {
        return Err(ShapeError::InsufficientSamples { available: signal.len(), required });
    }

    let coeffs = window.coefficients(len);
    Ok(signal[..required]
        .chunks_exact(len)
        .map(|chunk| chunk.iter().zip(&coeffs).map(|(&s, &w)| s * w).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(5);
        assert_eq!(w.len(), 5);
        assert!(w[0].abs() < 1e-15);
        assert!(w[4].abs() < 1e-15);
        assert!((w[2] - 1.0).abs() < 1e-15);
        assert!((w[1] - w[3]).abs() < 1e-15);
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_hamming_endpoints() {
        let w = WindowFunction::Hamming.coefficients(8);
        assert!((w[0] - 0.08).abs() < 1e-12);
        assert!((w[7] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_partition_discards_trailing_samples() {
        let signal: Vec<f64> = (0..23).map(f64::from).collect();
        let parts = partition(&signal, 4, 5, WindowFunction::Rectangular).unwrap();

        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|p| p.len() == 5));
        // 23 - 4 * 5 = 3 samples dropped: the last kept sample is 19
        assert_eq!(parts[3][4], 19.0);
        let kept: usize = parts.iter().map(Vec::len).sum();
        assert_eq!(signal.len() - kept, 3);
    }

    #[test]
    fn test_partition_applies_window() {
        let signal = vec![2.0; 10];
        let parts = partition(&signal, 2, 5, WindowFunction::Hann).unwrap();
        let w = hann_window(5);
        for part in &parts {
            for (x, c) in part.iter().zip(&w) {
                assert!((x - 2.0 * c).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn test_partition_errors() {
        let signal = vec![0.0; 10];
        assert_eq!(
            partition(&signal, 3, 4, WindowFunction::Hann),
            Err(ShapeError::InsufficientSamples { available: 10, required: 12 })
        );
        assert_eq!(
            partition(&signal, 2, 0, WindowFunction::Hann),
            Err(ShapeError::EmptyPartition)
        );
        assert_eq!(
            partition(&signal, 0, 2, WindowFunction::Hann),
            Err(ShapeError::NoPartitions)
        );
    }
}
