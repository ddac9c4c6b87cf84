use std::path::Path;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{CapsyncError, CapsyncResult};

/// One entry of the transcript JSON array.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptEntry {
    /// Spoken word.
    pub word: String,
    /// Start time in seconds.
    pub time: f64,
    /// Spoken duration in seconds.
    #[serde(default)]
    pub duration: f64,
}

/// A transcript word placed on the frame timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Word {
    /// Display text.
    pub text: String,
    /// Start time in seconds.
    pub start_secs: f64,
    /// Spoken duration in seconds.
    pub duration_secs: f64,
    /// `round(start_secs * fps)`.
    pub frame: FrameIndex,
}

impl Word {
    /// The empty leading word anchoring the state before the first spoken word.
    pub fn sentinel() -> Self {
        Self {
            text: String::new(),
            start_secs: 0.0,
            duration_secs: 0.0,
            frame: FrameIndex(0),
        }
    }

    /// `true` for words without visible text (the sentinel, pauses).
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Ordered, frame-mapped word sequence. Index 0 is always the sentinel.
#[derive(Clone, Debug)]
pub struct Transcript {
    words: Vec<Word>,
    fps: Fps,
}

impl Transcript {
    /// Read and map a transcript JSON file.
    pub fn from_path(path: &Path, fps: Fps) -> CapsyncResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            CapsyncError::transcript(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_slice(&bytes, fps)
    }

    /// Decode transcript JSON bytes and map every word to its frame.
    pub fn from_slice(bytes: &[u8], fps: Fps) -> CapsyncResult<Self> {
        let entries: Vec<TranscriptEntry> = serde_json::from_slice(bytes).map_err(|e| {
            CapsyncError::transcript(format!(
                "expected a JSON array of {{word, time, duration}} objects: {e}"
            ))
        })?;
        Self::from_entries(entries, fps)
    }

    /// Map already-decoded entries to frames.
    pub fn from_entries(entries: Vec<TranscriptEntry>, fps: Fps) -> CapsyncResult<Self> {
        if entries.is_empty() {
            return Err(CapsyncError::transcript("transcript has no words"));
        }

        let mut words = Vec::with_capacity(entries.len() + 1);
        words.push(Word::sentinel());

        let mut last_time = 0.0f64;
        for (i, e) in entries.into_iter().enumerate() {
            if !e.time.is_finite() || e.time < 0.0 {
                return Err(CapsyncError::transcript(format!(
                    "word {i} has invalid time {}",
                    e.time
                )));
            }
            if !e.duration.is_finite() || e.duration < 0.0 {
                return Err(CapsyncError::transcript(format!(
                    "word {i} has invalid duration {}",
                    e.duration
                )));
            }
            if e.time < last_time {
                return Err(CapsyncError::transcript(format!(
                    "word {i} starts at {}s, before the previous word ({last_time}s)",
                    e.time
                )));
            }
            last_time = e.time;

            words.push(Word {
                text: e.word.trim().to_owned(),
                start_secs: e.time,
                duration_secs: e.duration,
                frame: FrameIndex(fps.secs_to_frames_round(e.time)),
            });
        }

        tracing::debug!(words = words.len() - 1, fps = fps.as_f64(), "mapped transcript");
        Ok(Self { words, fps })
    }

    /// All words, sentinel first.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Frame rate used for the mapping.
    pub fn fps(&self) -> Fps {
        self.fps
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transcript/mapper.rs"]
mod tests;
