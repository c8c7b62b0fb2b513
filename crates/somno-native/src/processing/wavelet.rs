//! Maximal-overlap discrete wavelet transform and multi-resolution analysis
//!
//! The MODWT keeps every level at the input length (no decimation) and uses
//! circular boundary handling, so the multi-resolution bands add back up to
//! the input signal exactly, up to rounding.
//!
//! Band layout for an `L`-level decomposition at sample rate `fs`:
//!
//! | Band | Content | Nominal range |
//! |------|---------|---------------|
//! | `0..L` | detail `D(j+1)` | `[fs / 2^(j+2), fs / 2^(j+1))` |
//! | `L` | smooth `S(L)` | `[0, fs / 2^(L+1))` |

use std::f64::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};
use somno_core::{ConfigError, ShapeError, Wavelet};

use crate::error::ExtractionResult;

/// Symlet-4 reconstruction low-pass filter
const SYM4_SCALING: [f64; 8] = [
    0.032_223_100_604_042_7,
    -0.012_603_967_262_037_833,
    -0.099_219_543_576_847_22,
    0.297_857_795_605_277_36,
    0.803_738_751_805_916_1,
    0.497_618_667_632_015_45,
    -0.029_635_527_645_998_51,
    -0.075_765_714_789_273_33,
];

/// Quadrature-mirror filter pair for one wavelet
#[derive(Clone, Debug, PartialEq)]
pub struct WaveletFilters {
    /// Scaling (low-pass) filter, unit energy
    pub low_pass: Vec<f64>,
    /// Wavelet (high-pass) filter, unit energy
    pub high_pass: Vec<f64>,
}

impl WaveletFilters {
    /// Build the filter pair for a wavelet family
    #[must_use]
    pub fn new(wavelet: Wavelet) -> Self {
        let low_pass = match wavelet {
            Wavelet::Haar => vec![FRAC_1_SQRT_2, FRAC_1_SQRT_2],
            Wavelet::Db2 => {
                let sqrt3 = 3.0_f64.sqrt();
                let denom = 4.0 * std::f64::consts::SQRT_2;
                vec![
                    (1.0 + sqrt3) / denom,
                    (3.0 + sqrt3) / denom,
                    (3.0 - sqrt3) / denom,
                    (1.0 - sqrt3) / denom,
                ]
            }
            Wavelet::Sym4 => SYM4_SCALING.to_vec(),
        };

        // h[l] = (-1)^l g[L-1-l]
        let len = low_pass.len();
        let high_pass = (0..len)
            .map(|l| {
                let sign = if l % 2 == 0 { 1.0 } else { -1.0 };
                sign * low_pass[len - 1 - l]
            })
            .collect();

        Self { low_pass, high_pass }
    }

    /// Filters rescaled by 1/sqrt(2) for the undecimated transform
    fn modwt(&self) -> (Vec<f64>, Vec<f64>) {
        let scale = |f: &[f64]| f.iter().map(|c| c * FRAC_1_SQRT_2).collect::<Vec<_>>();
        (scale(&self.low_pass), scale(&self.high_pass))
    }
}

/// Circular filtering step of the MODWT pyramid: `out[t] = Σ f[l] x[t - s·l]`
fn circular_filter(x: &[f64], filter: &[f64], stride: usize) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|t| {
            filter
                .iter()
                .enumerate()
                .map(|(l, &c)| c * x[(t + n - (stride * l) % n) % n])
                .sum()
        })
        .collect()
}

/// Adjoint of [`circular_filter`]: `out[t] = Σ f[l] x[t + s·l]`
fn circular_adjoint(x: &[f64], filter: &[f64], stride: usize) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|t| {
            filter
                .iter()
                .enumerate()
                .map(|(l, &c)| c * x[(t + (stride * l) % n) % n])
                .sum()
        })
        .collect()
}

/// Multi-resolution analysis of one signal
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiResolution {
    /// Wavelet used for the decomposition
    pub wavelet: Wavelet,
    /// Number of detail levels
    pub levels: usize,
    /// `levels` detail bands (finest first) followed by the smooth
    pub bands: Vec<Vec<f64>>,
}

impl MultiResolution {
    /// Decompose `signal` into `levels` detail bands plus a smooth.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoLevels`] if `levels == 0`
    /// - [`ShapeError::InsufficientSamples`] if the signal is shorter than `2^levels`
    pub fn decompose(signal: &[f64], levels: usize, wavelet: Wavelet) -> ExtractionResult<Self> {
        if levels == 0 {
            return Err(ConfigError::NoLevels.into());
        }
        let required = u32::try_from(levels)
            .ok()
            .and_then(|l| 1usize.checked_shl(l))
            .unwrap_or(usize::MAX);
        if signal.len() < required {
            return Err(ShapeError::InsufficientSamples {
                available: signal.len(),
                required,
            }
            .into());
        }

        let (g, h) = WaveletFilters::new(wavelet).modwt();
        let n = signal.len();

        // Forward pyramid
        let mut details = Vec::with_capacity(levels);
        let mut smooth = signal.to_vec();
        for j in 0..levels {
            let stride = 1usize << j;
            details.push(circular_filter(&smooth, &h, stride));
            smooth = circular_filter(&smooth, &g, stride);
        }

        // Synthesis from a single level's coefficients, all others zero
        let synthesize = |level: usize, coeffs: &[f64], is_detail: bool| {
            let stride = 1usize << level;
            let mut v = if is_detail {
                circular_adjoint(coeffs, &h, stride)
            } else {
                circular_adjoint(coeffs, &g, stride)
            };
            for k in (0..level).rev() {
                v = circular_adjoint(&v, &g, 1usize << k);
            }
            v
        };

        let mut bands: Vec<Vec<f64>> = details
            .iter()
            .enumerate()
            .map(|(j, w)| synthesize(j, w, true))
            .collect();
        bands.push(synthesize(levels - 1, &smooth, false));

        debug_assert!(bands.iter().all(|b| b.len() == n));
        tracing::trace!(levels, n, wavelet = wavelet.name(), "MODWT multi-resolution computed");

        Ok(Self { wavelet, levels, bands })
    }

    /// Number of bands (`levels + 1`)
    #[inline]
    #[must_use]
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Length of every band
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bands.first().map_or(0, Vec::len)
    }

    /// Check if the decomposed signal was empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nominal frequency range `(low, high)` of a band in Hz
    #[must_use]
    pub fn band_range_hz(&self, band: usize, sample_rate_hz: f64) -> (f64, f64) {
        band_range_hz(band, self.levels, sample_rate_hz)
    }

    /// Human-readable band name (`D1`..`DL`, `S<L>`)
    #[must_use]
    pub fn band_name(&self, band: usize) -> String {
        if band < self.levels {
            format!("D{}", band + 1)
        } else {
            format!("S{}", self.levels)
        }
    }

    /// Sum the selected bands element-wise.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MaskLength`] if `selection` does not have one entry per band
    /// - [`ConfigError::EmptySelection`] if nothing is selected
    pub fn reconstruct(&self, selection: &[bool]) -> ExtractionResult<Vec<f64>> {
        if selection.len() != self.band_count() {
            return Err(ConfigError::MaskLength {
                expected: self.band_count(),
                got: selection.len(),
            }
            .into());
        }
        if !selection.iter().any(|&keep| keep) {
            return Err(ConfigError::EmptySelection.into());
        }

        let mut out = vec![0.0; self.len()];
        for band in self.bands.iter().zip(selection).filter(|&(_, &keep)| keep).map(|(b, _)| b) {
            for (o, &x) in out.iter_mut().zip(band) {
                *o += x;
            }
        }
        Ok(out)
    }
}

/// Nominal frequency range `(low, high)` in Hz of band `band` of an
/// `levels`-level decomposition
#[must_use]
pub fn band_range_hz(band: usize, levels: usize, sample_rate_hz: f64) -> (f64, f64) {
    if band < levels {
        let high = sample_rate_hz / f64::from(1u32 << (band + 1).min(31));
        (high / 2.0, high)
    } else {
        (0.0, sample_rate_hz / f64::from(1u32 << (levels + 1).min(31)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn test_signal(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                (0.05 * t).sin() + 0.5 * (1.3 * t).cos() + (i as f64 * 0.123).sin().powi(3)
            })
            .collect()
    }

    fn energy(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    #[test]
    fn test_filters_are_orthonormal() {
        for wavelet in [Wavelet::Haar, Wavelet::Db2, Wavelet::Sym4] {
            let f = WaveletFilters::new(wavelet);
            assert_eq!(f.low_pass.len(), wavelet.filter_len());
            // Published coefficients carry about 12 significant digits
            assert!((energy(&f.low_pass) - 1.0).abs() < 1e-10);
            assert!((f.low_pass.iter().sum::<f64>() - std::f64::consts::SQRT_2).abs() < 1e-10);
            assert!(f.high_pass.iter().sum::<f64>().abs() < 1e-10);
            for shift in (2..f.low_pass.len()).step_by(2) {
                let overlap: f64 =
                    f.low_pass.iter().zip(&f.low_pass[shift..]).map(|(a, b)| a * b).sum();
                assert!(overlap.abs() < 1e-10, "{wavelet:?} shift {shift}: {overlap}");
            }
        }
    }

    #[test]
    fn test_full_selection_reconstructs_signal() {
        let signal = test_signal(500);
        for wavelet in [Wavelet::Haar, Wavelet::Db2, Wavelet::Sym4] {
            let mra = MultiResolution::decompose(&signal, 4, wavelet).unwrap();
            assert_eq!(mra.band_count(), 5);

            let rebuilt = mra.reconstruct(&[true; 5]).unwrap();
            for (a, b) in rebuilt.iter().zip(&signal) {
                assert!((a - b).abs() < 1e-9, "{wavelet:?}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_partial_selection_sums_bands() {
        let signal = test_signal(256);
        let mra = MultiResolution::decompose(&signal, 3, Wavelet::Sym4).unwrap();
        let rebuilt = mra.reconstruct(&[false, true, false, true]).unwrap();
        for (t, &v) in rebuilt.iter().enumerate() {
            let expected = mra.bands[1][t] + mra.bands[3][t];
            assert!((v - expected).abs() < 1e-15);
        }
    }

    #[test]
    fn test_high_frequency_lands_in_finest_detail() {
        let fs = 128.0;
        let signal: Vec<f64> = (0..1024)
            .map(|i| (2.0 * PI * 48.0 * i as f64 / fs).sin())
            .collect();
        let mra = MultiResolution::decompose(&signal, 5, Wavelet::Sym4).unwrap();
        assert!(energy(&mra.bands[0]) > 0.8 * energy(&signal));
    }

    #[test]
    fn test_low_frequency_lands_in_smooth() {
        let fs = 128.0;
        let signal: Vec<f64> = (0..1024)
            .map(|i| (2.0 * PI * i as f64 / fs).sin())
            .collect();
        let mra = MultiResolution::decompose(&signal, 5, Wavelet::Sym4).unwrap();
        assert!(energy(&mra.bands[5]) > 0.8 * energy(&signal));
    }

    #[test]
    fn test_band_ranges() {
        assert_eq!(band_range_hz(0, 5, 256.0), (64.0, 128.0));
        assert_eq!(band_range_hz(1, 5, 256.0), (32.0, 64.0));
        assert_eq!(band_range_hz(5, 5, 256.0), (0.0, 4.0));
    }

    #[test]
    fn test_decompose_errors() {
        let err = MultiResolution::decompose(&[1.0; 8], 0, Wavelet::Haar).unwrap_err();
        assert!(matches!(err, crate::ExtractionError::Config(ConfigError::NoLevels)));

        let err = MultiResolution::decompose(&[1.0; 7], 3, Wavelet::Haar).unwrap_err();
        assert!(matches!(
            err,
            crate::ExtractionError::Shape(ShapeError::InsufficientSamples { available: 7, required: 8 })
        ));
    }

    #[test]
    fn test_reconstruct_validates_mask() {
        let mra = MultiResolution::decompose(&test_signal(64), 2, Wavelet::Haar).unwrap();
        assert!(mra.reconstruct(&[true, true]).is_err());
        assert!(mra.reconstruct(&[false, false, false]).is_err());
        assert_eq!(mra.band_name(0), "D1");
        assert_eq!(mra.band_name(2), "S2");
    }
}
