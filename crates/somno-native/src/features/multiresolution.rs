//! Multi-resolution band statistics
//!
//! The signal is decomposed with a MODWT multi-resolution analysis, the
//! selected bands are summed into a reconstruction, and every selected band
//! is summarised window by window (one window per sleep label) with its
//! spread, skewness and kurtosis.

use serde::{Deserialize, Serialize};
use somno_core::{ConfigError, MraConfig, SleepStage};

use super::map_epochs;
use crate::error::ExtractionResult;
use crate::processing::moments::WindowMoments;
use crate::processing::wavelet::MultiResolution;

/// Moments of one band over one labelled window
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    /// Window (epoch) index
    pub epoch: usize,
    /// Start of the window relative to the signal start, in seconds
    pub time_offset_secs: f64,
    /// Moments of the band samples in the window
    pub moments: WindowMoments,
    /// Label of the window
    pub stage: SleepStage,
}

/// Windowed statistics of one selected band
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandStatistics {
    /// Band index: `0..L` are details (finest first), `L` is the smooth
    pub band: usize,
    /// Band name (`D1`.., `S<L>`)
    pub name: String,
    /// Nominal frequency range in Hz
    pub range_hz: (f64, f64),
    /// One entry per labelled window
    pub windows: Vec<WindowStatistics>,
}

/// Result of [`compute_multiresolution_statistics`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiResolutionOutput {
    /// Element-wise sum of the selected bands (same length as the input)
    pub reconstruction: Vec<f64>,
    /// Statistics of each selected band, in band order
    pub bands: Vec<BandStatistics>,
}

fn window_len(window_secs: f64, sample_rate: f64) -> usize {
    (window_secs * sample_rate).round() as usize
}

/// Decompose `signal`, reconstruct the selected bands and compute their
/// statistics over windows aligned with `labels`.
///
/// The number of windows is `min(labels.len(), N / window_len)`; trailing
/// samples that do not fill a window are ignored.
///
/// # Errors
///
/// - [`ConfigError`] for an invalid configuration or sample rate, reported
///   before any decomposition work
/// - [`somno_core::ShapeError::InsufficientSamples`] if the signal is shorter than `2^L`
pub fn compute_multiresolution_statistics(
    signal: &[f64],
    sample_rate: f64,
    config: &MraConfig,
    labels: &[SleepStage],
) -> ExtractionResult<MultiResolutionOutput> {
    config.validate()?;
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(ConfigError::InvalidParameter {
            name: "sample_rate",
            reason: "must be a positive frequency",
        }
        .into());
    }
    let win = window_len(config.window_secs, sample_rate);
    if win == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "window_secs",
            reason: "shorter than one sample",
        }
        .into());
    }

    let mra = MultiResolution::decompose(signal, config.levels, config.wavelet)?;
    let reconstruction = mra.reconstruct(&config.selection)?;

    let n_windows = labels.len().min(signal.len() / win);
    let window_secs = win as f64 / sample_rate;
    let selected: Vec<usize> = config.selected().collect();

    let bands = map_epochs(&selected, |&band| {
        let samples = &mra.bands[band];
        let windows = samples
            .chunks_exact(win)
            .zip(labels)
            .take(n_windows)
            .enumerate()
            .map(|(epoch, (window, &stage))| WindowStatistics {
                epoch,
                time_offset_secs: epoch as f64 * window_secs,
                moments: WindowMoments::compute(window),
                stage,
            })
            .collect();
        BandStatistics {
            band,
            name: mra.band_name(band),
            range_hz: mra.band_range_hz(band, sample_rate),
            windows,
        }
    });

    tracing::debug!(
        levels = config.levels,
        wavelet = config.wavelet.name(),
        bands = bands.len(),
        windows = n_windows,
        "Computed multi-resolution statistics"
    );

    Ok(MultiResolutionOutput { reconstruction, bands })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::processing::moments::DEGENERATE_MOMENT;
    use somno_core::{ShapeError, Wavelet};
    use std::f64::consts::PI;

    fn test_signal(n: usize, fs: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 1.5 * t).sin() + 0.4 * (2.0 * PI * 11.0 * t).cos() + 0.05 * t
            })
            .collect()
    }

    fn config(levels: usize, selection: Vec<bool>, window_secs: f64) -> MraConfig {
        MraConfig { levels, wavelet: Wavelet::Sym4, selection, window_secs }
    }

    #[test]
    fn test_full_mask_reconstructs_signal() {
        let fs = 32.0;
        let signal = test_signal(960, fs);
        let labels = vec![SleepStage::N2; 32];
        let out =
            compute_multiresolution_statistics(&signal, fs, &MraConfig::all_bands(4), &labels)
                .unwrap();

        assert_eq!(out.reconstruction.len(), signal.len());
        for (r, x) in out.reconstruction.iter().zip(&signal) {
            assert!((r - x).abs() < 1e-9);
        }
        assert_eq!(out.bands.len(), 5);
        assert_eq!(out.bands[0].name, "D1");
        assert_eq!(out.bands[4].name, "S4");
    }

    #[test]
    fn test_window_count_and_offsets() {
        let fs = 10.0;
        // 95 s of signal but 4 labels of 30 s: three full windows fit
        let signal = test_signal(950, fs);
        let labels = [SleepStage::Wake, SleepStage::N1, SleepStage::N2, SleepStage::N3];
        let cfg = config(3, vec![false, true, false, true], 30.0);

        let out = compute_multiresolution_statistics(&signal, fs, &cfg, &labels).unwrap();
        assert_eq!(out.bands.iter().map(|b| b.band).collect::<Vec<_>>(), vec![1, 3]);
        for band in &out.bands {
            assert_eq!(band.windows.len(), 3);
            for (i, w) in band.windows.iter().enumerate() {
                assert_eq!(w.epoch, i);
                assert_eq!(w.stage, labels[i]);
                assert!((w.time_offset_secs - 30.0 * i as f64).abs() < 1e-12);
                assert!(w.moments.is_finite());
            }
        }
    }

    #[test]
    fn test_windows_limited_by_labels() {
        let fs = 10.0;
        let signal = test_signal(600, fs);
        let labels = vec![SleepStage::Rem; 2];
        let cfg = config(2, vec![true; 3], 15.0);
        let out = compute_multiresolution_statistics(&signal, fs, &cfg, &labels).unwrap();
        assert!(out.bands.iter().all(|b| b.windows.len() == 2));
    }

    #[test]
    fn test_constant_signal_uses_fallback() {
        let signal = vec![2.5; 512];
        let cfg = config(3, vec![false, false, false, true], 16.0);
        let labels = vec![SleepStage::N3; 2];

        let out = compute_multiresolution_statistics(&signal, 16.0, &cfg, &labels).unwrap();
        let smooth = &out.bands[0];
        assert_eq!(smooth.name, "S3");
        for w in &smooth.windows {
            assert!((w.moments.mean - 2.5).abs() < 1e-9);
            assert!(w.moments.std < 1e-9);
            // Filtering leaves rounding noise, which still counts as constant
            assert_eq!(w.moments.skewness, DEGENERATE_MOMENT);
            assert_eq!(w.moments.kurtosis, DEGENERATE_MOMENT);
            assert!(w.moments.is_finite());
        }
        // Detail bands of a constant vanish entirely
        let detail = compute_multiresolution_statistics(
            &signal,
            16.0,
            &config(3, vec![true, false, false, false], 16.0),
            &labels,
        )
        .unwrap();
        for w in &detail.bands[0].windows {
            assert!(w.moments.std < 1e-9);
            assert!(w.moments.skewness.is_finite() && w.moments.kurtosis.is_finite());
        }
        let zero = WindowMoments::compute(&[0.0; 8]);
        assert_eq!(zero.skewness, DEGENERATE_MOMENT);
        assert_eq!(zero.kurtosis, DEGENERATE_MOMENT);
    }

    #[test]
    fn test_config_errors_before_decomposition() {
        // The signal is far too short; configuration errors must win
        let run = |cfg: MraConfig| {
            compute_multiresolution_statistics(&[1.0, 2.0], 10.0, &cfg, &[SleepStage::Wake])
                .unwrap_err()
        };

        assert!(matches!(
            run(config(0, vec![true], 30.0)),
            ExtractionError::Config(ConfigError::NoLevels)
        ));
        assert!(matches!(
            run(config(3, vec![true; 3], 30.0)),
            ExtractionError::Config(ConfigError::MaskLength { expected: 4, got: 3 })
        ));
        assert!(matches!(
            run(config(3, vec![false; 4], 30.0)),
            ExtractionError::Config(ConfigError::EmptySelection)
        ));
        assert!(matches!(
            run(config(3, vec![true; 4], 30.0)),
            ExtractionError::Shape(ShapeError::InsufficientSamples { available: 2, required: 8 })
        ));
    }

    #[test]
    fn test_partial_selection_sums_bands() {
        let fs = 16.0;
        let signal = test_signal(256, fs);
        let labels = vec![SleepStage::N1; 2];
        let low = compute_multiresolution_statistics(
            &signal,
            fs,
            &config(2, vec![false, true, true], 8.0),
            &labels,
        )
        .unwrap();
        let high = compute_multiresolution_statistics(
            &signal,
            fs,
            &config(2, vec![true, false, false], 8.0),
            &labels,
        )
        .unwrap();
        for ((l, h), x) in low.reconstruction.iter().zip(&high.reconstruction).zip(&signal) {
            assert!((l + h - x).abs() < 1e-9);
        }
    }
}
