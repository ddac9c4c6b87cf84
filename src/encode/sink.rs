use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{CapsyncError, CapsyncResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Caption frame width in pixels.
    pub width: u32,
    /// Caption frame height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Vertical position of the caption frame inside the output video.
    pub offset_y: f64,
}

/// Sink contract for consuming encoded caption frames in output order.
///
/// Ordering contract: `push_frame` is called with indices `0, 1, 2, ...` with no gaps.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CapsyncResult<()>;
    /// Push one encoded frame.
    fn push_frame(&mut self, idx: FrameIndex, image: &[u8]) -> CapsyncResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> CapsyncResult<()>;
}

/// Tracks the next expected frame index and rejects gaps or reordering.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OrderGuard {
    next: u64,
}

impl OrderGuard {
    pub(crate) fn reset(&mut self) {
        self.next = 0;
    }

    pub(crate) fn accept(&mut self, idx: FrameIndex) -> CapsyncResult<()> {
        if idx.0 != self.next {
            return Err(CapsyncError::validation(format!(
                "sink expected frame {} but received frame {}",
                self.next, idx.0
            )));
        }
        self.next += 1;
        Ok(())
    }

    pub(crate) fn received(&self) -> u64 {
        self.next
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    order: OrderGuard,
    ended: bool,
    /// Frames in output order.
    pub(crate) frames: Vec<(FrameIndex, Vec<u8>)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, Vec<u8>)] {
        &self.frames
    }

    /// Whether `end` was called after the last `begin`.
    pub fn is_finished(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CapsyncResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.order.reset();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, image: &[u8]) -> CapsyncResult<()> {
        if self.cfg.is_none() {
            return Err(CapsyncError::validation("sink not started"));
        }
        self.order.accept(idx)?;
        self.frames.push((idx, image.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> CapsyncResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
