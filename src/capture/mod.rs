/// Frame capture seam
///
/// The pipeline does not grab the screen itself. A [`FrameSource`] hands
/// out frames of some image type; the cadence loop paces the calls,
/// filters unchanged frames and assigns sequence ids to the rest.
///
/// # Implementations
/// - [`replay::TranscriptSource`]: recorded OCR transcripts, one block per frame
/// - Screen grabbers live outside the crate and implement [`FrameSource`]
///   for `image::RgbaImage`

pub mod replay;
pub mod similarity;

pub use replay::TranscriptSource;
pub use similarity::FrameSimilarity;

use crate::error::CaptureError;
use serde::{Deserialize, Serialize};

/// Represents a screen region to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_array(arr: [u32; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    /// Reject empty regions
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidRegion([self.x, self.y, self.width, self.height]));
        }
        Ok(())
    }
}

/// A captured image with its capture time
#[derive(Debug, Clone)]
pub struct CapturedFrame<I> {
    pub image: I,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl<I> CapturedFrame<I> {
    pub fn new(image: I, timestamp: u64) -> Self {
        Self { image, timestamp }
    }
}

/// A frame selected for recognition
///
/// Sequence ids are assigned at dispatch time, increase by one per
/// dispatched frame and are never reused.
#[derive(Debug, Clone)]
pub struct Frame<I> {
    pub seq_id: u64,
    pub timestamp: u64,
    pub image: I,
}

/// Producer of frames, polled by the cadence loop
pub trait FrameSource: Send {
    type Image: FrameSimilarity + Send + 'static;

    /// Capture one frame
    ///
    /// Returning [`CaptureError::SourceExhausted`] ends the cadence loop;
    /// any other error skips this tick.
    fn capture(&mut self) -> Result<CapturedFrame<Self::Image>, CaptureError>;
}
