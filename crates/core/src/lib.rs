//! Core library for synthetic percussion dataset generation.
//!
//! The crate covers two jobs. The beat compositor samples single-stroke
//! recordings from a folder, processes each one and lays them out on a tempo
//! grid to produce numbered "synthetic beat" files. The augmentation pipeline
//! runs a folder of recordings through a fixed set of signal transforms.
//! Both share the same WAV I/O, configuration and worker pool.

pub mod audio;
pub mod augment;
pub mod batch;
pub mod compose;
pub mod config;
pub mod dsp;
pub mod error;
pub mod pool;
pub mod sink;
pub mod spectral;
pub mod wav;

pub use audio::AudioClip;
pub use augment::{run_augmentation, AugmentPlan, AugmentSummary, Augmentation, OutputLayout};
pub use batch::CancelToken;
pub use compose::{generate_beats, Beat, BeatCompositor, RunSummary, StrokeProcessor, TempoGrid};
pub use config::{AppConfig, AugmentMode, AugmentSettings, BeatRunConfig, CanvasSizing, StrokeProcessing};
pub use error::{BeatSynthError, Result};
pub use pool::StrokePool;
pub use sink::OutputSink;
pub use spectral::PhaseVocoder;
pub use wav::SampleFormat;
