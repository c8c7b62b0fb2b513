//! Central moments over fixed-length windows

use serde::{Deserialize, Serialize};

/// Skewness and kurtosis reported for a window with zero spread
pub const DEGENERATE_MOMENT: f64 = 0.0;

/// Largest spread, relative to the window's largest magnitude, that is
/// treated as rounding noise around a constant
pub const DEGENERATE_SPREAD: f64 = 1e-12;

/// Population moments of one window
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowMoments {
    /// Arithmetic mean
    pub mean: f64,
    /// Population variance (mean squared deviation)
    pub variance: f64,
    /// Standard deviation
    pub std: f64,
    /// Third standardised moment
    pub skewness: f64,
    /// Fourth standardised moment (not excess; a Gaussian gives 3)
    pub kurtosis: f64,
}

impl WindowMoments {
    /// Compute the moments of `window`.
    ///
    /// Deviations are divided by their largest magnitude before any power is
    /// taken, so tiny or huge amplitudes neither underflow nor overflow the
    /// standardised moments. A window whose spread is at most
    /// [`DEGENERATE_SPREAD`] times its largest magnitude (this includes
    /// every constant window) reports [`DEGENERATE_MOMENT`] for skewness and
    /// kurtosis. An empty window yields all zeros.
    #[must_use]
    pub fn compute(window: &[f64]) -> Self {
        if window.is_empty() {
            return Self::default();
        }
        let first = window[0];
        if window.iter().all(|&x| x == first) {
            return Self {
                mean: first,
                skewness: DEGENERATE_MOMENT,
                kurtosis: DEGENERATE_MOMENT,
                ..Self::default()
            };
        }
        let n = window.len() as f64;
        let mean = window.iter().map(|&x| x / n).sum::<f64>();

        let magnitude = window.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
        let spread = window.iter().fold(0.0_f64, |m, &x| m.max((x - mean).abs()));
        if spread <= DEGENERATE_SPREAD * magnitude {
            let variance = window.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / n;
            return Self {
                mean,
                variance,
                std: variance.sqrt(),
                skewness: DEGENERATE_MOMENT,
                kurtosis: DEGENERATE_MOMENT,
            };
        }

        // z in [-1, 1] with at least one |z| == 1, so z2 >= 1 / n
        let (mut z2, mut z3, mut z4) = (0.0, 0.0, 0.0);
        for &x in window {
            let z = (x - mean) / spread;
            let zz = z * z;
            z2 += zz;
            z3 += zz * z;
            z4 += zz * zz;
        }
        let (z2, z3, z4) = (z2 / n, z3 / n, z4 / n);

        let std = spread * z2.sqrt();
        let skewness = z3 / (z2 * z2.sqrt());
        let kurtosis = z4 / (z2 * z2);
        let finite = skewness.is_finite() && kurtosis.is_finite();

        Self {
            mean,
            variance: std * std,
            std,
            skewness: if finite { skewness } else { DEGENERATE_MOMENT },
            kurtosis: if finite { kurtosis } else { DEGENERATE_MOMENT },
        }
    }

    /// Check that no field is NaN or infinite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.mean, self.variance, self.std, self.skewness, self.kurtosis]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_moments() {
        // Two-point distribution: symmetric, kurtosis exactly 1
        let m = WindowMoments::compute(&[-1.0, 1.0, -1.0, 1.0]);
        assert!(m.mean.abs() < 1e-15);
        assert!((m.variance - 1.0).abs() < 1e-15);
        assert!((m.std - 1.0).abs() < 1e-15);
        assert!(m.skewness.abs() < 1e-15);
        assert!((m.kurtosis - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_skewed_window() {
        // mean 1, deviations [-1, -1, -1, 3]: m2 = 3, m3 = 6, m4 = 21
        let m = WindowMoments::compute(&[0.0, 0.0, 0.0, 4.0]);
        assert!((m.mean - 1.0).abs() < 1e-15);
        assert!((m.variance - 3.0).abs() < 1e-12);
        assert!((m.skewness - 6.0 / 3.0_f64.powf(1.5)).abs() < 1e-12);
        assert!((m.kurtosis - 21.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_window_fallback() {
        let m = WindowMoments::compute(&[3.7; 3000]);
        assert_eq!(m.std, 0.0);
        assert_eq!(m.skewness, DEGENERATE_MOMENT);
        assert_eq!(m.kurtosis, DEGENERATE_MOMENT);
        assert!((m.mean - 3.7).abs() < 1e-15);
        assert!(m.is_finite());
    }

    #[test]
    fn test_tiny_amplitude_window() {
        let m = WindowMoments::compute(&[0.0, 1e-150, 0.0, 1e-150]);
        assert!((m.std - 5e-151).abs() < 1e-165);
        assert!(m.skewness.abs() < 1e-12);
        assert!((m.kurtosis - 1.0).abs() < 1e-12);
        assert!(m.is_finite());
    }

    #[test]
    fn test_huge_amplitude_window() {
        let m = WindowMoments::compute(&[1e200, -1e200, 1e200, -1e200]);
        assert!((m.std / 1e200 - 1.0).abs() < 1e-12);
        assert!(m.skewness.abs() < 1e-12);
        assert!((m.kurtosis - 1.0).abs() < 1e-12);
        // The variance itself is not representable
        assert!(m.variance.is_infinite());
    }

    #[test]
    fn test_rounding_noise_counts_as_constant() {
        let window: Vec<f64> =
            (0..64).map(|i| 2.5 + if i % 3 == 0 { 4e-16 } else { -2e-16 }).collect();
        let m = WindowMoments::compute(&window);
        assert_eq!(m.skewness, DEGENERATE_MOMENT);
        assert_eq!(m.kurtosis, DEGENERATE_MOMENT);
        assert!(m.std < 1e-15);
    }

    #[test]
    fn test_empty_window() {
        let m = WindowMoments::compute(&[]);
        assert_eq!(m, WindowMoments::default());
    }
}
