//! Recording model handed over by signal loaders
//!
//! A [`Recording`] is the contract between file loaders (EDF readers and the
//! like, which live outside this workspace) and the feature extractors: one
//! sample rate, several channels of equal rate and an aligned hypnogram.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::types::{Epoch, SignalKind, SleepStage, DEFAULT_EPOCH_SECS};

fn default_epoch_secs() -> f64 {
    DEFAULT_EPOCH_SECS
}

/// One recorded channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel label as stored in the source file (e.g. `"EEG Fpz-Cz"`)
    pub name: String,
    /// Signal modality
    #[serde(default)]
    pub kind: SignalKind,
    /// Samples in physical units
    pub samples: Vec<f64>,
}

impl Channel {
    /// Create a new channel
    #[must_use]
    pub fn new(name: impl Into<String>, kind: SignalKind, samples: Vec<f64>) -> Self {
        Self { name: name.into(), kind, samples }
    }
}

/// A polysomnography recording with its hypnogram
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Optional subject/recording identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Common sample rate of all channels, in Hz
    pub sample_rate_hz: f64,
    /// Scoring epoch duration in seconds
    #[serde(default = "default_epoch_secs")]
    pub epoch_secs: f64,
    /// Recorded channels
    pub channels: Vec<Channel>,
    /// One sleep stage per scoring epoch
    pub stages: Vec<SleepStage>,
}

impl Recording {
    /// Create a recording with the default 30 s epoch
    #[must_use]
    pub fn new(sample_rate_hz: f64, channels: Vec<Channel>, stages: Vec<SleepStage>) -> Self {
        Self {
            id: None,
            sample_rate_hz,
            epoch_secs: DEFAULT_EPOCH_SECS,
            channels,
            stages,
        }
    }

    /// Look up a channel by name (ASCII case-insensitive)
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Number of samples in one scoring epoch
    #[inline]
    #[must_use]
    pub fn epoch_samples(&self) -> usize {
        // epoch_secs and sample_rate_hz are positive, so this rounds to nearest
        (self.epoch_secs * self.sample_rate_hz + 0.5) as usize
    }

    /// Number of complete, labelled epochs available on a channel
    #[must_use]
    pub fn epoch_count(&self, channel: &Channel) -> usize {
        let per_epoch = self.epoch_samples();
        if per_epoch == 0 {
            return 0;
        }
        (channel.samples.len() / per_epoch).min(self.stages.len())
    }

    /// Cut a channel into labelled epochs.
    ///
    /// One epoch is produced per hypnogram entry, limited by the number of
    /// complete epochs in the signal. Trailing samples are discarded.
    #[must_use]
    pub fn epochs(&self, channel: &Channel) -> Vec<Epoch> {
        let per_epoch = self.epoch_samples();
        (0..self.epoch_count(channel))
            .map(|i| {
                let start = i * per_epoch;
                Epoch::new(
                    i,
                    channel.samples[start..start + per_epoch].to_vec(),
                    self.sample_rate_hz,
                    self.stages[i],
                )
            })
            .collect()
    }

    /// Total duration of the hypnogram in seconds
    #[inline]
    #[must_use]
    pub fn scored_duration_secs(&self) -> f64 {
        self.stages.len() as f64 * self.epoch_secs
    }
}
