use thiserror::Error;

/// Domain errors using thiserror for structured error handling.
///
/// None of these are fatal to a running pipeline: capture and recognition
/// failures are absorbed per frame, persistence failures are logged. They
/// surface only at the seams (collaborator traits, config, lifecycle).

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to initialize frame source")]
    InitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to capture frame")]
    CaptureFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Frame source exhausted")]
    SourceExhausted,

    #[error("Invalid capture region: {0:?}")]
    InvalidRegion([u32; 4]),
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine")]
    InitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to perform OCR on frame")]
    RecognitionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to preprocess frame: {0}")]
    PreprocessFailed(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

#[derive(Error, Debug)]
pub enum CombatLogError {
    #[error("Failed to create combat log directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to combat log: {path}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parse rule '{name}'")]
    InvalidRule {
        name: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline not running")]
    NotRunning,

    #[error("Pipeline already running")]
    AlreadyRunning,

    #[error("Cannot perform action during state transition")]
    InTransition,

    #[error("Failed to start {name} thread")]
    ThreadSpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
