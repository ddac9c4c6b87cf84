use crate::config::options::RenderOptions;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::CapsyncResult;
use crate::transcript::mapper::Word;

/// One frame to render.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTask {
    /// Position in the output frame stream.
    pub index: FrameIndex,
    /// Word being spoken, and highlighted, in this frame. `0` (the sentinel) before the first
    /// word starts.
    pub active_word: usize,
    /// Transition progress in `[0, 1]`.
    pub progress: f64,
}

impl FrameTask {
    /// `true` for frames before the first word is spoken.
    pub fn is_lead_in(&self) -> bool {
        self.active_word == 0
    }
}

/// Counters describing a computed schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStats {
    /// Total tasks emitted.
    pub frames: u64,
    /// Frames with nothing to highlight: the silence before the first word and pauses.
    pub idle_frames: u64,
    /// Frames added after the last word starts.
    pub tail_frames: u64,
    /// Frames per transition before progress saturates at 1.
    pub transition_frames: u64,
}

/// Ordered frame tasks for a whole transcript.
#[derive(Clone, Debug, Default)]
pub struct Schedule {
    tasks: Vec<FrameTask>,
    stats: ScheduleStats,
}

impl Schedule {
    /// Tasks in output order; `tasks()[i].index == FrameIndex(i)`.
    pub fn tasks(&self) -> &[FrameTask] {
        &self.tasks
    }

    /// Schedule counters.
    pub fn stats(&self) -> ScheduleStats {
        self.stats
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` if no frame is scheduled.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Consume into the task list.
    pub fn into_tasks(self) -> Vec<FrameTask> {
        self.tasks
    }
}

/// Transition progress of sub-frame `j` in a gap of `span` frames.
///
/// The animation runs over `min(span, transition)` frames and then holds at 1.
pub fn transition_progress(j: u64, span: u64, transition: u64) -> f64 {
    let denom = span.min(transition);
    if denom == 0 {
        return 1.0;
    }
    (j as f64 / denom as f64).min(1.0)
}

/// Turn the frame-mapped word sequence into the ordered list of frame tasks.
///
/// Every consecutive pair `(prev, current)` spans `current.frame - prev.frame` frames during
/// which `prev` is spoken and highlighted, so output frame `n` is transcript frame `n`. Gaps
/// whose spoken word has no text (the leading sentinel, pauses) still emit their frames and
/// count as idle. With `hold_last_word` the last word additionally gets `round(duration * fps)`
/// frames so it stays on screen while it is spoken.
pub fn schedule_frames(words: &[Word], opts: &RenderOptions) -> CapsyncResult<Schedule> {
    let fps = opts.frame_rate()?;
    let transition = fps.secs_to_frames_trunc(opts.transition_secs);

    let mut tasks = Vec::new();
    let mut stats = ScheduleStats {
        transition_frames: transition,
        ..ScheduleStats::default()
    };

    let emit_gap = |tasks: &mut Vec<FrameTask>, active: usize, span: u64| {
        for j in 0..span {
            tasks.push(FrameTask {
                index: FrameIndex(tasks.len() as u64),
                active_word: active,
                progress: transition_progress(j, span, transition),
            });
        }
    };

    for (i, pair) in words.windows(2).enumerate() {
        let (prev, current) = (&pair[0], &pair[1]);
        let span = current.frame.0.saturating_sub(prev.frame.0);
        if prev.is_empty() {
            stats.idle_frames += span;
        }
        emit_gap(&mut tasks, i, span);
    }

    if opts.hold_last_word
        && let Some((last, word)) = words.iter().enumerate().next_back()
        && !word.is_empty()
    {
        let span = fps.secs_to_frames_round(word.duration_secs);
        emit_gap(&mut tasks, last, span);
        stats.tail_frames = span;
    }

    stats.frames = tasks.len() as u64;
    tracing::debug!(
        frames = stats.frames,
        idle = stats.idle_frames,
        tail = stats.tail_frames,
        transition,
        "scheduled caption frames"
    );

    Ok(Schedule { tasks, stats })
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/frames.rs"]
mod tests;
