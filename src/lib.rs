//! Combat log DPS meter
//!
//! Reads a game's scrolling combat log off the screen, recognizes its text,
//! removes lines already seen in the previous capture and aggregates the
//! damage it finds into cumulative and sliding-window statistics.
//!
//! The screen grabber and OCR engine are pluggable through
//! [`capture::FrameSource`] and [`ocr::Recognizer`]; transcript replay
//! ([`capture::TranscriptSource`] with [`ocr::PassthroughRecognizer`]) drives
//! the same pipeline from recorded text.

pub mod capture;
pub mod combat_log;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod state;
pub mod stats;
pub mod utils;

pub use config::Config;
pub use error::{AppResult, CaptureError, CombatLogError, ConfigError, OcrError, PipelineError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineSummary};
pub use stats::{StatsHandle, StatsSnapshot};
