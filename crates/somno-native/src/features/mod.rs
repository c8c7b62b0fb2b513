//! Per-epoch feature extraction
//!
//! - [`bispectral`]: Entropy and log-magnitude features of epoch bispectra
//! - [`cepstral`]: Partition-averaged real cepstrum per epoch
//! - [`multiresolution`]: MODWT band statistics over labelled windows
//! - [`table`]: Typed feature tables with a checked column schema
//!
//! Every extractor is a pure function of its inputs. Epochs are processed
//! independently (in parallel with the `parallel` feature) and results are
//! always returned in input order.

pub mod bispectral;
pub mod cepstral;
pub mod multiresolution;
pub mod table;

pub use bispectral::{
    bispectral_features, extract_bispectrum_features, BispectralFeatures, BispectralRow,
    EpochBispectrum,
};
pub use cepstral::{extract_cepstrum, CepstralRow, CepstrumExtractor, CepstrumOutput};
pub use multiresolution::{
    compute_multiresolution_statistics, BandStatistics, MultiResolutionOutput, WindowStatistics,
};
pub use table::{FeatureRow, FeatureTable};

use somno_core::{Epoch, Recording};

use crate::error::{ExtractionError, ExtractionResult};

/// Apply `f` to every item, preserving order.
pub(crate) fn map_epochs<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items.par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        items.iter().map(f).collect()
    }
}

/// Apply a fallible `f` to every item and return the first error in input
/// order, or all results in input order.
pub(crate) fn try_map_epochs<T, R, F>(items: &[T], f: F) -> ExtractionResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> ExtractionResult<R> + Sync + Send,
{
    map_epochs(items, f).into_iter().collect()
}

/// Cut the named channel of a recording into labelled epochs.
///
/// # Errors
///
/// - [`ExtractionError::UnknownChannel`] if no channel has that name
/// - [`ExtractionError::NoEpochs`] if the channel holds no complete labelled epoch
pub fn channel_epochs(recording: &Recording, channel: &str) -> ExtractionResult<Vec<Epoch>> {
    let ch = recording
        .channel(channel)
        .ok_or_else(|| ExtractionError::UnknownChannel { name: channel.to_string() })?;

    let epochs = recording.epochs(ch);
    if epochs.is_empty() {
        return Err(ExtractionError::NoEpochs { name: ch.name.clone() });
    }
    tracing::debug!(
        channel = %ch.name,
        kind = ch.kind.name(),
        epochs = epochs.len(),
        "Cut channel into epochs"
    );
    Ok(epochs)
}
