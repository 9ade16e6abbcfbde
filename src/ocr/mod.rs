/// Text recognition seam
///
/// The OCR engine is an external collaborator behind [`Recognizer`]. Workers
/// call [`recognize_or_empty`], which turns any failure into an empty text so
/// nothing downstream has to branch on recognition errors.
///
/// # Submodules
/// - `preprocessing`: text color masking applied before recognition

pub mod preprocessing;

pub use preprocessing::{FilteredRecognizer, TextColorFilter};

use crate::capture::Frame;
use crate::error::OcrError;

/// Recognized text for one dispatched frame
///
/// Produced exactly once per dispatched frame; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedSnapshot {
    pub seq_id: u64,
    pub timestamp: u64,
    /// Recognized text, empty when recognition failed or found nothing
    pub text: String,
}

/// OCR engine interface
///
/// Shared by every worker of the pool, hence `Sync`. Engines that need
/// exclusive access wrap their handle in a mutex.
pub trait Recognizer<I>: Send + Sync {
    fn recognize(&self, image: &I) -> Result<String, OcrError>;

    /// Engine name (for logging)
    fn name(&self) -> &'static str {
        "recognizer"
    }
}

/// Run recognition for one frame, absorbing failures
pub fn recognize_or_empty<I, R>(recognizer: &R, frame: &Frame<I>) -> RecognizedSnapshot
where
    R: Recognizer<I> + ?Sized,
{
    let text = match recognizer.recognize(&frame.image) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(
                "OCR error on frame #{} ({}): {err}",
                frame.seq_id,
                recognizer.name()
            );
            String::new()
        }
    };

    RecognizedSnapshot {
        seq_id: frame.seq_id,
        timestamp: frame.timestamp,
        text,
    }
}

/// Recognizer for frames that already are text (transcript replay)
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRecognizer;

impl Recognizer<String> for PassthroughRecognizer {
    fn recognize(&self, image: &String) -> Result<String, OcrError> {
        Ok(image.clone())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}
