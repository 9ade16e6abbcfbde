/// Replay of recorded OCR transcripts
///
/// A transcript is a text file of blocks, each introduced by a header line
/// `=== <timestamp_ms>` and followed by the text one frame showed:
///
/// ```text
/// === 1700000000000
/// Used Fireball against Golem and dealt 1,250 Critical damage.
/// Dealt additional damage of 40 to Stone Golem.
/// === 1700000000250
/// ...
/// ```
///
/// Each block becomes one `String` frame. Paired with
/// [`PassthroughRecognizer`](crate::ocr::PassthroughRecognizer) this drives
/// the full pipeline without a screen or OCR engine.

use super::{CapturedFrame, FrameSource};
use crate::error::CaptureError;
use crate::utils::now_millis;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

const BLOCK_HEADER: &str = "===";

/// Frame source yielding recorded transcript blocks once each
#[derive(Debug, Clone, Default)]
pub struct TranscriptSource {
    frames: VecDeque<CapturedFrame<String>>,
}

impl TranscriptSource {
    /// Parse transcript text
    ///
    /// Text before the first header is ignored. A header without a valid
    /// timestamp is stamped with the current time.
    pub fn parse(transcript: &str) -> Self {
        let mut frames = VecDeque::new();
        let mut current: Option<(u64, Vec<&str>)> = None;

        for line in transcript.lines() {
            if let Some(rest) = line.strip_prefix(BLOCK_HEADER) {
                if let Some((timestamp, lines)) = current.take() {
                    frames.push_back(CapturedFrame::new(join_block(&lines), timestamp));
                }
                let timestamp = rest.trim().parse().unwrap_or_else(|_| now_millis());
                current = Some((timestamp, Vec::new()));
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(line);
            }
        }
        if let Some((timestamp, lines)) = current {
            frames.push_back(CapturedFrame::new(join_block(&lines), timestamp));
        }

        Self { frames }
    }

    /// Load and parse a transcript file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| CaptureError::InitFailed(Box::new(e)))?;
        Ok(Self::parse(&content))
    }

    /// Build directly from `(timestamp, text)` pairs
    pub fn from_frames<S: Into<String>>(frames: impl IntoIterator<Item = (u64, S)>) -> Self {
        Self {
            frames: frames
                .into_iter()
                .map(|(timestamp, text)| CapturedFrame::new(text.into(), timestamp))
                .collect(),
        }
    }

    /// Frames not yet captured
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

fn join_block(lines: &[&str]) -> String {
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

impl FrameSource for TranscriptSource {
    type Image = String;

    fn capture(&mut self) -> Result<CapturedFrame<String>, CaptureError> {
        self.frames.pop_front().ok_or(CaptureError::SourceExhausted)
    }
}
