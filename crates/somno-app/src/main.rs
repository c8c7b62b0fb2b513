//! Somno command-line application
//!
//! Extracts sleep-staging features from JSON polysomnography recordings.
//!
//! # Usage
//!
//! ```bash
//! # Bispectral entropy features of channel C3
//! somno bispectrum --input rec.json --channel C3 --nfft 256
//!
//! # Partition-averaged cepstrum as CSV
//! somno --format csv cepstrum --input rec.json --channel C3 --dt 2.0
//!
//! # Multi-resolution statistics of the three coarsest bands
//! somno mra --input rec.json --channel C3 --levels 5 --select 0,0,0,1,1,1
//!
//! # Every extractor over many recordings, skipping failures
//! somno batch --config run.json --out-dir features/ night1.json night2.json
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use somno_core::{
    BispectrumConfig, ExtractionConfig, MraConfig, Recording, Wavelet, DEFAULT_EPSILON,
};
use somno_native::features::bispectral::extract_bispectrum_features_from_epochs;
use somno_native::features::{
    channel_epochs, compute_multiresolution_statistics, extract_cepstrum, BispectralRow,
    CepstrumOutput, FeatureTable, MultiResolutionOutput,
};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Somno sleep feature extraction
#[derive(Parser, Debug)]
#[command(name = "somno")]
#[command(author, version, about = "Sleep-epoch feature extraction", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Write results to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format for single-recording commands
    #[arg(short, long, value_enum, default_value_t = Format::Json, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Pretty-printed JSON
    Json,
    /// Comma-separated table with a header row
    Csv,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bispectral entropy features per epoch
    Bispectrum {
        /// Recording file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Channel name (case-insensitive)
        #[arg(short, long)]
        channel: String,

        /// FFT length per estimator segment
        #[arg(long, default_value = "256")]
        nfft: usize,

        /// Fractional segment overlap
        #[arg(long, default_value = "0.5")]
        overlap: f64,

        /// Use bicoherence instead of bispectrum magnitude
        #[arg(long)]
        bicoherence: bool,

        /// Normalisation constant
        #[arg(long, default_value_t = DEFAULT_EPSILON)]
        epsilon: f64,
    },

    /// Partition-averaged real cepstrum per epoch
    Cepstrum {
        /// Recording file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Channel name (case-insensitive)
        #[arg(short, long)]
        channel: String,

        /// Partition duration in seconds
        #[arg(long, default_value = "2.0")]
        dt: f64,
    },

    /// Multi-resolution band statistics
    Mra {
        /// Recording file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Channel name (case-insensitive)
        #[arg(short, long)]
        channel: String,

        /// Decomposition levels
        #[arg(long, default_value = "5")]
        levels: usize,

        /// Wavelet: haar, db2 or sym4
        #[arg(long, default_value = "sym4", value_parser = parse_wavelet)]
        wavelet: Wavelet,

        /// Band mask, finest detail first then the smooth (e.g. 0,0,1,1,1,1)
        #[arg(long, value_delimiter = ',', value_parser = parse_flag)]
        select: Option<Vec<bool>>,

        /// Statistics window in seconds
        #[arg(long, default_value = "30.0")]
        window_secs: f64,
    },

    /// Run every extractor over several recordings
    Batch {
        /// Run configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for per-recording results (defaults to each input's directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Recording files (JSON)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

/// Parse a wavelet name for clap
fn parse_wavelet(s: &str) -> Result<Wavelet, String> {
    Wavelet::from_name(s)
        .ok_or_else(|| format!("unknown wavelet '{s}' (expected haar, db2 or sym4)"))
}

/// Parse one band mask entry for clap
fn parse_flag(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "y" | "yes" => Ok(true),
        "0" | "false" | "n" | "no" => Ok(false),
        other => Err(format!("invalid mask entry '{other}'")),
    }
}

/// Batch run configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct BatchConfig {
    /// Channel to analyse (first channel of each recording if unset)
    channel: Option<String>,
    /// Extractor settings
    extraction: ExtractionConfig,
}

/// Every feature family for one recording
#[derive(Debug, Serialize)]
struct RecordingFeatures {
    id: Option<String>,
    channel: String,
    bispectral: FeatureTable<BispectralRow>,
    cepstral: CepstrumOutput,
    multiresolution: MultiResolutionOutput,
}

/// Outcome counts of a batch run
#[derive(Debug, Default, PartialEq, Eq)]
struct BatchSummary {
    succeeded: usize,
    failed: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Somno v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Bispectrum { input, channel, nfft, overlap, bicoherence, epsilon } => {
            let config = ExtractionConfig {
                epsilon,
                bispectrum: BispectrumConfig { nfft, overlap, bicoherence },
                ..ExtractionConfig::default()
            };
            config.validate()?;
            let recording = load_recording(&input)?;
            let table = run_bispectrum(&recording, &channel, &config)?;
            let rendered = match cli.format {
                Format::Json => serde_json::to_string_pretty(&table)?,
                Format::Csv => table.to_delimited(','),
            };
            write_output(cli.output.as_deref(), &rendered)?;
        }
        Commands::Cepstrum { input, channel, dt } => {
            let recording = load_recording(&input)?;
            let out = run_cepstrum(&recording, &channel, dt)?;
            let rendered = match cli.format {
                Format::Json => serde_json::to_string_pretty(&out)?,
                Format::Csv => out.table.to_delimited(','),
            };
            write_output(cli.output.as_deref(), &rendered)?;
        }
        Commands::Mra { input, channel, levels, wavelet, select, window_secs } => {
            let config = MraConfig {
                levels,
                wavelet,
                selection: select.unwrap_or_else(|| vec![true; levels + 1]),
                window_secs,
            };
            config.validate()?;
            let recording = load_recording(&input)?;
            let out = run_mra(&recording, &channel, &config)?;
            let rendered = match cli.format {
                Format::Json => serde_json::to_string_pretty(&out)?,
                Format::Csv => mra_to_csv(&out),
            };
            write_output(cli.output.as_deref(), &rendered)?;
        }
        Commands::Batch { config, out_dir, inputs } => {
            let config = match config {
                Some(path) => load_batch_config(&path)?,
                None => BatchConfig::default(),
            };
            let summary = run_batch(&config, &inputs, out_dir.as_deref())?;
            info!(succeeded = summary.succeeded, failed = summary.failed, "Batch finished");
            if summary.succeeded == 0 {
                bail!("No recording could be processed");
            }
        }
    }

    Ok(())
}

/// Read a recording from a JSON file
fn load_recording(path: &Path) -> anyhow::Result<Recording> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    let recording: Recording = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse recording {}", path.display()))?;
    if !(recording.sample_rate_hz.is_finite() && recording.sample_rate_hz > 0.0) {
        bail!("Recording {} has an invalid sample rate", path.display());
    }
    debug!(
        path = %path.display(),
        channels = recording.channels.len(),
        epochs = recording.stages.len(),
        "Loaded recording"
    );
    Ok(recording)
}

fn load_batch_config(path: &Path) -> anyhow::Result<BatchConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: BatchConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    config.extraction.validate().context("Invalid extraction config")?;
    Ok(config)
}

fn write_output(path: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

fn run_bispectrum(
    recording: &Recording,
    channel: &str,
    config: &ExtractionConfig,
) -> anyhow::Result<FeatureTable<BispectralRow>> {
    let epochs = channel_epochs(recording, channel)?;
    extract_bispectrum_features_from_epochs(&epochs, &config.bispectrum, config.epsilon)
        .with_context(|| format!("Bispectral features failed on channel {channel}"))
}

fn run_cepstrum(recording: &Recording, channel: &str, dt: f64) -> anyhow::Result<CepstrumOutput> {
    let epochs = channel_epochs(recording, channel)?;
    extract_cepstrum(&epochs, recording.sample_rate_hz, dt)
        .with_context(|| format!("Cepstral features failed on channel {channel}"))
}

fn run_mra(
    recording: &Recording,
    channel: &str,
    config: &MraConfig,
) -> anyhow::Result<MultiResolutionOutput> {
    let ch = recording
        .channel(channel)
        .with_context(|| format!("Unknown channel: {channel}"))?;
    compute_multiresolution_statistics(
        &ch.samples,
        recording.sample_rate_hz,
        config,
        &recording.stages,
    )
    .with_context(|| format!("Multi-resolution statistics failed on channel {channel}"))
}

/// Render multi-resolution statistics as one CSV row per band and window
fn mra_to_csv(out: &MultiResolutionOutput) -> String {
    let mut csv = String::from("band,epoch,time_offset_secs,std,skewness,kurtosis,stage\n");
    for band in &out.bands {
        for w in &band.windows {
            let _ = writeln!(
                csv,
                "{},{},{},{},{},{},{}",
                band.name,
                w.epoch,
                w.time_offset_secs,
                w.moments.std,
                w.moments.skewness,
                w.moments.kurtosis,
                w.stage
            );
        }
    }
    csv
}

fn extract_all(recording: &Recording, config: &BatchConfig) -> anyhow::Result<RecordingFeatures> {
    let channel = match &config.channel {
        Some(name) => name.clone(),
        None => recording
            .channels
            .first()
            .map(|c| c.name.clone())
            .context("Recording has no channels")?,
    };
    let extraction = &config.extraction;

    Ok(RecordingFeatures {
        id: recording.id.clone(),
        bispectral: run_bispectrum(recording, &channel, extraction)?,
        cepstral: run_cepstrum(recording, &channel, extraction.cepstrum.partition_secs)?,
        multiresolution: run_mra(recording, &channel, &extraction.mra)?,
        channel,
    })
}

fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().map_or_else(|| "recording".into(), |s| s.to_string_lossy());
    let name = format!("{stem}.features.json");
    match out_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

fn process_one(
    input: &Path,
    config: &BatchConfig,
    out_dir: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let recording = load_recording(input)?;
    let features = extract_all(&recording, config)?;
    let path = output_path(input, out_dir);
    let json = serde_json::to_string_pretty(&features)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Process every input, logging and skipping the ones that fail
fn run_batch(
    config: &BatchConfig,
    inputs: &[PathBuf],
    out_dir: Option<&Path>,
) -> anyhow::Result<BatchSummary> {
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let mut summary = BatchSummary::default();
    for input in inputs {
        match process_one(input, config, out_dir) {
            Ok(path) => {
                info!(input = %input.display(), output = %path.display(), "Recording processed");
                summary.succeeded += 1;
            }
            Err(e) => {
                warn!(input = %input.display(), "Skipping recording: {e:#}");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}
