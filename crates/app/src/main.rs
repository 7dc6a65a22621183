use std::path::{Path, PathBuf};

use beat_synth_core::{
    generate_beats, run_augmentation, AppConfig, AugmentMode, CancelToken,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

fn main() -> beat_synth_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Beats(args) => run_beats(args),
        Commands::Augment(args) => run_augment(args),
    }
}

fn run_beats(args: BeatsArgs) -> beat_synth_core::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    let beats = &mut config.beats;
    if let Some(folder_path) = args.folder_path {
        beats.source_dir = folder_path;
    }
    if let Some(output_folder) = args.output_folder {
        beats.output_dir = output_folder;
    }
    if let Some(bpm) = args.bpm {
        beats.bpm = bpm;
    }
    if let Some(num_beats) = args.num_beats {
        beats.num_beats = num_beats;
    }
    if args.seed.is_some() {
        beats.seed = args.seed;
    }
    if let Some(jobs) = args.jobs {
        beats.jobs = jobs;
    }
    if let Some(gain_db) = args.gain_db {
        config.processing.gain_db = gain_db;
    }
    if let Some(fade_ms) = args.fade_ms {
        config.processing.fade_ms = fade_ms;
    }

    tracing::info!(source = ?config.beats.source_dir, output = ?config.beats.output_dir, "starting beat generation");
    let summary = generate_beats(&config.beats, &config.processing, &CancelToken::new())?;
    tracing::info!(
        beats = summary.beats_written,
        output = ?summary.output_dir,
        seed = summary.seed,
        "done"
    );
    Ok(())
}

fn run_augment(args: AugmentArgs) -> beat_synth_core::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    let augment = &mut config.augment;
    if let Some(folder_path) = args.folder_path {
        augment.source_dir = folder_path;
    }
    if let Some(mode) = args.mode {
        augment.mode = mode.into();
    }
    if args.seed.is_some() {
        augment.seed = args.seed;
    }
    if let Some(jobs) = args.jobs {
        augment.jobs = jobs;
    }

    tracing::info!(source = ?augment.source_dir, mode = ?augment.mode, "starting augmentation");
    let summary = run_augmentation(&config.augment, &CancelToken::new())?;
    tracing::info!(
        files = summary.files_processed,
        outputs = summary.outputs_written,
        seed = summary.seed,
        "done"
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> beat_synth_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_json_file(path),
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthetic percussion dataset generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stitch randomly chosen single strokes into beats at a fixed tempo.
    Beats(BeatsArgs),
    /// Run a folder of recordings through the augmentation transforms.
    Augment(AugmentArgs),
}

#[derive(Args, Debug)]
struct BeatsArgs {
    /// Folder containing single stroke audio files [default: .]
    #[arg(long = "folder_path")]
    folder_path: Option<PathBuf>,
    /// Folder the synthetic beats are written to [default: synthetic_beats]
    #[arg(long = "output_folder")]
    output_folder: Option<PathBuf>,
    /// Tempo in beats per minute [default: 60]
    #[arg(long)]
    bpm: Option<u32>,
    /// Number of synthetic beats to create [default: 50]
    #[arg(long = "num_beats")]
    num_beats: Option<usize>,
    /// Seed for reproducible stroke selection.
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads.
    #[arg(long)]
    jobs: Option<usize>,
    /// Gain applied to each stroke, in dB.
    #[arg(long = "gain_db", allow_hyphen_values = true)]
    gain_db: Option<f32>,
    /// Fade-out applied to the end of each stroke, in milliseconds.
    #[arg(long = "fade_ms")]
    fade_ms: Option<f64>,
    /// JSON configuration file; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AugmentArgs {
    /// Folder containing the recordings to augment [default: .]
    #[arg(long = "folder_path")]
    folder_path: Option<PathBuf>,
    /// Which transform preset to run [default: standard]
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Seed for the noise transform.
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads.
    #[arg(long)]
    jobs: Option<usize>,
    /// JSON configuration file; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Standard,
    Extended,
}

impl From<ModeArg> for AugmentMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Standard => AugmentMode::Standard,
            ModeArg::Extended => AugmentMode::Extended,
        }
    }
}
