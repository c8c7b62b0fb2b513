//! Bispectral entropy features
//!
//! For an epoch bispectrum `B` and a small constant `ε`:
//!
//! - `b = |B| / (max|B| + ε)`
//! - `ent_p = -Σ bᵖ · log2(bᵖ)` for `p = 1, 2, 3`
//! - `H1 = Σ log2(|B| + ε)` over all entries
//! - `H2 = Σ log2(|B| + ε)` over the anti-diagonal
//!
//! Entropy terms with `bᵖ == 0` contribute exactly zero (the `x·log x → 0`
//! limit); no other term is dropped.

use serde::{Deserialize, Serialize};
use somno_core::{BispectrumConfig, BispectrumMatrix, ConfigError, Epoch, SleepStage};

use super::table::{FeatureRow, FeatureTable};
use super::{map_epochs, try_map_epochs};
use crate::error::{ExtractionError, ExtractionResult};
use crate::processing::bispectrum::BispectrumEstimator;

/// Column names of [`BispectralRow`], in value order
pub const BISPECTRAL_COLUMNS: [&str; 5] = ["ent1", "ent2", "ent3", "h1", "h2"];

/// Scalar features of one bispectrum
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BispectralFeatures {
    /// Normalised bispectral entropy, order 1
    pub ent1: f64,
    /// Normalised bispectral entropy, order 2
    pub ent2: f64,
    /// Normalised bispectral entropy, order 3
    pub ent3: f64,
    /// Sum of log2 magnitudes over the whole matrix
    pub h1: f64,
    /// Sum of log2 magnitudes along the anti-diagonal
    pub h2: f64,
}

/// Contribution of one normalised magnitude to `-Σ x·log2(x)`
#[inline]
fn entropy_term(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        -x * x.log2()
    }
}

/// Compute the bispectral features of one matrix.
///
/// Entries are taken by magnitude, so signed or raw estimates are accepted.
/// `epsilon` must be finite and positive; the table-building entry points
/// check this, a zero here turns an all-zero matrix into NaN.
#[must_use]
pub fn bispectral_features(bis: &BispectrumMatrix, epsilon: f64) -> BispectralFeatures {
    let max = bis.values().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let norm = max + epsilon;

    let mut features = BispectralFeatures::default();
    for v in bis.values() {
        let mag = v.abs();
        let b1 = mag / norm;
        let b2 = b1 * b1;
        let b3 = b2 * b1;

        features.ent1 += entropy_term(b1);
        features.ent2 += entropy_term(b2);
        features.ent3 += entropy_term(b3);
        features.h1 += (mag + epsilon).log2();
    }
    features.h2 = bis.anti_diagonal().map(|v| (v.abs() + epsilon).log2()).sum();

    features
}

/// A bispectrum estimate tied to its epoch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochBispectrum {
    /// Epoch index
    pub index: usize,
    /// Bispectrum (or bicoherence) matrix of that epoch
    pub matrix: BispectrumMatrix,
    /// Sleep stage of that epoch
    pub stage: SleepStage,
}

/// One row of the bispectral feature table
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BispectralRow {
    /// Epoch index
    pub epoch: usize,
    /// Features
    #[serde(flatten)]
    pub features: BispectralFeatures,
    /// Sleep stage
    pub stage: SleepStage,
}

impl FeatureRow for BispectralRow {
    fn epoch(&self) -> usize {
        self.epoch
    }

    fn stage(&self) -> SleepStage {
        self.stage
    }

    fn values(&self) -> Vec<f64> {
        let f = &self.features;
        vec![f.ent1, f.ent2, f.ent3, f.h1, f.h2]
    }
}

fn check_epsilon(epsilon: f64) -> Result<(), ConfigError> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name: "epsilon",
            reason: "must be a small positive number",
        })
    }
}

fn bispectral_table(rows: Vec<BispectralRow>) -> ExtractionResult<FeatureTable<BispectralRow>> {
    let columns = BISPECTRAL_COLUMNS.iter().map(ToString::to_string).collect();
    Ok(FeatureTable::new(columns, rows)?)
}

/// Tabulate bispectral features for precomputed per-epoch bispectra.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidParameter`] for a non-positive or
/// non-finite `epsilon`, otherwise propagates table construction errors.
pub fn extract_bispectrum_features(
    epochs: &[EpochBispectrum],
    epsilon: f64,
) -> ExtractionResult<FeatureTable<BispectralRow>> {
    check_epsilon(epsilon)?;
    let rows = map_epochs(epochs, |e| BispectralRow {
        epoch: e.index,
        features: bispectral_features(&e.matrix, epsilon),
        stage: e.stage,
    });
    tracing::debug!(epochs = rows.len(), epsilon, "Extracted bispectral features");
    bispectral_table(rows)
}

/// Estimate each epoch's bispectrum and tabulate its features.
///
/// # Errors
///
/// - [`ConfigError::InvalidParameter`] for a non-positive or non-finite
///   `epsilon`
/// - [`ExtractionError::Epoch`] wrapping the first epoch (in order) that is
///   too short for one estimator segment
pub fn extract_bispectrum_features_from_epochs(
    epochs: &[Epoch],
    config: &BispectrumConfig,
    epsilon: f64,
) -> ExtractionResult<FeatureTable<BispectralRow>> {
    check_epsilon(epsilon)?;
    let Some(first) = epochs.first() else {
        return bispectral_table(Vec::new());
    };
    let estimator = BispectrumEstimator::new(config, first.sample_rate_hz)?;

    let rows = try_map_epochs(epochs, |epoch| {
        let matrix = estimator
            .estimate(&epoch.samples)
            .map_err(|e| ExtractionError::from(e).in_epoch(epoch.index))?;
        Ok(BispectralRow {
            epoch: epoch.index,
            features: bispectral_features(&matrix, epsilon),
            stage: epoch.stage,
        })
    })?;
    tracing::debug!(
        epochs = rows.len(),
        nfft = config.nfft,
        bicoherence = config.bicoherence,
        "Estimated bispectra and extracted features"
    );
    bispectral_table(rows)
}

/// Compute features from a nested-row matrix, checking its shape first.
///
/// # Errors
///
/// Returns a shape error for ragged, non-square or smaller than 2×2 input,
/// or [`ConfigError::InvalidParameter`] for a bad `epsilon`.
pub fn bispectral_features_from_rows(
    rows: &[Vec<f64>],
    epsilon: f64,
) -> ExtractionResult<BispectralFeatures> {
    check_epsilon(epsilon)?;
    let matrix = BispectrumMatrix::from_rows(rows)?;
    Ok(bispectral_features(&matrix, epsilon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use somno_core::{ShapeError, DEFAULT_EPSILON};

    const EPS: f64 = DEFAULT_EPSILON;

    fn matrix(rows: &[Vec<f64>]) -> BispectrumMatrix {
        BispectrumMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_constant_matrix_entropy() {
        let c = 3.0;
        let f = bispectral_features(&matrix(&[vec![c, c], vec![c, c]]), EPS);

        let cn: f64 = c / (c + EPS);
        assert!((f.ent1 - (-4.0 * cn * cn.log2())).abs() < 1e-15);
        let cn2 = cn * cn;
        assert!((f.ent2 - (-4.0 * cn2 * cn2.log2())).abs() < 1e-15);
        assert!((f.h1 - 4.0 * (c + EPS).log2()).abs() < 1e-12);
        assert!((f.h2 - 2.0 * (c + EPS).log2()).abs() < 1e-12);
    }

    #[test]
    fn test_peaked_matrix_has_near_zero_entropy() {
        // max = 2, so b = 2 / (2 + ε) on the diagonal and exactly 0 elsewhere
        let f = bispectral_features(&matrix(&[vec![2.0, 0.0], vec![0.0, 2.0]]), EPS);
        let b: f64 = 2.0 / (2.0 + EPS);
        assert!((f.ent1 - (-2.0 * b * b.log2())).abs() < 1e-15);
        assert!(f.ent1 < 1e-4);
        assert!(f.ent1.is_finite() && f.ent2.is_finite() && f.ent3.is_finite());
        // Anti-diagonal holds the two zeros
        assert!((f.h2 - 2.0 * EPS.log2()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_row_contributes_nothing() {
        let with_zeros = bispectral_features(
            &matrix(&[vec![0.0, 0.0, 0.0], vec![1.0, 4.0, 2.0], vec![3.0, 0.5, 1.5]]),
            EPS,
        );

        let norm = 4.0 + EPS;
        let expected: f64 = [1.0, 4.0, 2.0, 3.0, 0.5, 1.5]
            .iter()
            .map(|v| {
                let b = v / norm;
                -b * b.log2()
            })
            .sum();

        assert!(with_zeros.ent1.is_finite());
        assert!((with_zeros.ent1 - expected).abs() < 1e-12);
    }

    #[test]
    fn test_entropies_non_negative() {
        let rows: Vec<Vec<f64>> = (0..8)
            .map(|i| (0..8).map(|j| ((i * 7 + j * 3) % 11) as f64 - 5.0).collect())
            .collect();
        let f = bispectral_features(&matrix(&rows), EPS);
        assert!(f.ent1 >= 0.0);
        assert!(f.ent2 >= 0.0);
        assert!(f.ent3 >= 0.0);
    }

    #[test]
    fn test_non_square_rejected() {
        let err = bispectral_features_from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], EPS)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Shape(ShapeError::NotSquare { rows: 2, cols: 3 })));
    }

    #[test]
    fn test_table_keeps_epoch_order_and_labels() {
        let epochs: Vec<EpochBispectrum> = (0..20)
            .map(|i| EpochBispectrum {
                index: i,
                matrix: matrix(&[vec![i as f64 + 1.0, 1.0], vec![1.0, 1.0]]),
                stage: if i % 2 == 0 { SleepStage::N2 } else { SleepStage::Rem },
            })
            .collect();

        let table = extract_bispectrum_features(&epochs, EPS).unwrap();
        assert_eq!(table.len(), 20);
        assert_eq!(table.columns(), &["ent1", "ent2", "ent3", "h1", "h2"]);
        for (i, row) in table.rows().iter().enumerate() {
            assert_eq!(row.epoch, i);
            assert_eq!(row.stage, epochs[i].stage);
            assert_eq!(row.features, bispectral_features(&epochs[i].matrix, EPS));
        }
    }

    #[test]
    fn test_estimated_features_from_epochs() {
        let epochs: Vec<Epoch> = (0..3)
            .map(|i| {
                let samples = (0..300).map(|t| ((t * (i + 2)) as f64 * 0.37).sin()).collect();
                Epoch::new(i, samples, 10.0, SleepStage::N3)
            })
            .collect();
        let config = BispectrumConfig { nfft: 32, ..BispectrumConfig::default() };

        let table = extract_bispectrum_features_from_epochs(&epochs, &config, EPS).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.rows().iter().all(|r| r.features.ent1 >= 0.0));
    }

    #[test]
    fn test_short_epoch_names_its_index() {
        let epochs = vec![
            Epoch::new(0, vec![1.0; 300], 10.0, SleepStage::Wake),
            Epoch::new(1, vec![1.0; 10], 10.0, SleepStage::Wake),
        ];
        let err =
            extract_bispectrum_features_from_epochs(&epochs, &BispectrumConfig::default(), EPS)
                .unwrap_err();
        assert_eq!(err.epoch_index(), Some(1));
    }

    #[test]
    fn test_non_positive_epsilon_rejected() {
        let zeros = vec![vec![0.0; 3]; 3];
        let epochs = vec![EpochBispectrum {
            index: 0,
            matrix: matrix(&zeros),
            stage: SleepStage::N1,
        }];
        for epsilon in [0.0, -1e-6, f64::NAN, f64::INFINITY] {
            let err = extract_bispectrum_features(&epochs, epsilon).unwrap_err();
            assert!(matches!(
                err,
                ExtractionError::Config(ConfigError::InvalidParameter { name: "epsilon", .. })
            ));
            assert!(bispectral_features_from_rows(&zeros, epsilon).is_err());
        }

        // With a positive epsilon the all-zero matrix is well defined
        let f = bispectral_features_from_rows(&zeros, EPS).unwrap();
        assert_eq!(f.ent1, 0.0);
        assert!((f.h1 - 9.0 * EPS.log2()).abs() < 1e-9);
        assert!((f.h2 - 3.0 * EPS.log2()).abs() < 1e-9);
    }
}
