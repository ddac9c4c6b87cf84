use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{CapsyncError, CapsyncResult};
use crate::render::canvas::Canvas;
use crate::render::scene::{FrameScene, SceneContext, compose_frame};
use crate::schedule::frames::FrameTask;

/// Upper bound on pixel memory held by one chunk of in-flight frames.
pub(crate) const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// One encoded caption frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFrame {
    /// Position in the output frame stream.
    pub index: FrameIndex,
    /// Encoded image bytes.
    pub image: Vec<u8>,
}

/// What to do when drawing a single frame fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameErrorPolicy {
    /// Fail the whole render with [`CapsyncError::RenderTask`].
    #[default]
    Abort,
    /// Substitute a blank frame and log a warning.
    BlankFrame,
}

#[derive(Clone, Debug)]
/// Threading and chunking controls for multi-frame rendering.
pub struct RenderThreading {
    /// Enable parallel rendering when `true`.
    pub parallel: bool,
    /// Chunk size in frames for batched scheduling.
    pub chunk_size: usize,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
    /// Bounded channel capacity between render workers and the sink thread.
    pub channel_capacity: usize,
    /// Per-frame failure handling.
    pub error_policy: FrameErrorPolicy,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
            channel_capacity: 4,
            error_policy: FrameErrorPolicy::Abort,
        }
    }
}

/// Aggregated rendering counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    /// Total requested frames.
    pub frames_total: u64,
    /// Frames drawn from their scene.
    pub frames_rendered: u64,
    /// Frames replaced by a blank frame after a draw failure.
    pub frames_blank: u64,
}

impl RenderStats {
    pub(crate) fn add(&mut self, other: RenderStats) {
        self.frames_total += other.frames_total;
        self.frames_rendered += other.frames_rendered;
        self.frames_blank += other.frames_blank;
    }

    fn count(&mut self, blank: bool) {
        self.frames_total += 1;
        if blank {
            self.frames_blank += 1;
        } else {
            self.frames_rendered += 1;
        }
    }
}

/// Cooperative cancellation flag shared between a caller and running render workers.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not canceled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; workers stop before their next frame.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> CapsyncResult<()> {
        if self.is_canceled() {
            Err(CapsyncError::RenderCanceled)
        } else {
            Ok(())
        }
    }
}

/// Compose and draw a single frame.
pub fn render_frame(
    canvas: &mut dyn Canvas,
    ctx: &SceneContext<'_>,
    task: &FrameTask,
) -> CapsyncResult<RenderedFrame> {
    let scene = compose_frame(ctx, task);
    let image = canvas
        .draw_frame(&scene)
        .map_err(|e| CapsyncError::render_task(task.index.0, e.to_string()))?;
    Ok(RenderedFrame {
        index: task.index,
        image,
    })
}

/// Render `tasks` and return the frames in task order.
///
/// Sequential mode draws on a single canvas. Parallel mode runs chunks of tasks on a dedicated
/// rayon pool; every worker builds its own canvas with `make_canvas` and writes into its own
/// pre-sized result slot, so completion order never affects output order.
pub fn render_frames<C, F>(
    ctx: &SceneContext<'_>,
    tasks: &[FrameTask],
    make_canvas: F,
    threading: &RenderThreading,
    cancel: &CancelToken,
) -> CapsyncResult<(Vec<RenderedFrame>, RenderStats)>
where
    C: Canvas,
    F: Fn() -> CapsyncResult<C> + Sync + Send,
{
    let mut out = Vec::with_capacity(tasks.len());
    let mut stats = RenderStats::default();
    for_each_chunk(ctx, tasks, &make_canvas, threading, cancel, |frames, chunk_stats| {
        out.extend(frames);
        stats.add(chunk_stats);
        Ok(())
    })?;
    Ok((out, stats))
}

/// Drive rendering chunk by chunk, handing each finished chunk, in order, to `on_chunk`.
pub(crate) fn for_each_chunk<C, F>(
    ctx: &SceneContext<'_>,
    tasks: &[FrameTask],
    make_canvas: &F,
    threading: &RenderThreading,
    cancel: &CancelToken,
    mut on_chunk: impl FnMut(Vec<RenderedFrame>, RenderStats) -> CapsyncResult<()>,
) -> CapsyncResult<()>
where
    C: Canvas,
    F: Fn() -> CapsyncResult<C> + Sync + Send,
{
    let (width, height) = ctx.opts.frame_size();
    let chunk_size = chunk_size_for(threading.chunk_size, width, height);
    let policy = threading.error_policy;

    if !threading.parallel {
        let mut canvas = make_canvas()?;
        for chunk in tasks.chunks(chunk_size) {
            let mut frames = Vec::with_capacity(chunk.len());
            let mut stats = RenderStats::default();
            for task in chunk {
                cancel.check()?;
                let (frame, blank) = render_with_policy(&mut canvas, ctx, task, policy)?;
                stats.count(blank);
                frames.push(frame);
            }
            on_chunk(frames, stats)?;
        }
        return Ok(());
    }

    let pool = build_thread_pool(threading.threads)?;
    for chunk in tasks.chunks(chunk_size) {
        let (frames, stats) =
            render_chunk_parallel(ctx, chunk, make_canvas, policy, cancel, &pool)?;
        on_chunk(frames, stats)?;
    }
    Ok(())
}

fn render_chunk_parallel<C, F>(
    ctx: &SceneContext<'_>,
    chunk: &[FrameTask],
    make_canvas: &F,
    policy: FrameErrorPolicy,
    cancel: &CancelToken,
    pool: &rayon::ThreadPool,
) -> CapsyncResult<(Vec<RenderedFrame>, RenderStats)>
where
    C: Canvas,
    F: Fn() -> CapsyncResult<C> + Sync + Send,
{
    let mut slots: Vec<Option<(RenderedFrame, bool)>> = vec![None; chunk.len()];

    pool.install(|| {
        slots
            .par_iter_mut()
            .zip(chunk.par_iter())
            .try_for_each_init(make_canvas, |canvas, (slot, task)| -> CapsyncResult<()> {
                cancel.check()?;
                let canvas = canvas.as_mut().map_err(|e| {
                    CapsyncError::render_task(task.index.0, format!("canvas setup failed: {e}"))
                })?;
                *slot = Some(render_with_policy(canvas, ctx, task, policy)?);
                Ok(())
            })
    })?;

    let mut frames = Vec::with_capacity(slots.len());
    let mut stats = RenderStats::default();
    for slot in slots {
        let (frame, blank) =
            slot.ok_or_else(|| anyhow::anyhow!("internal error: render slot left empty"))?;
        stats.count(blank);
        frames.push(frame);
    }
    Ok((frames, stats))
}

fn render_with_policy(
    canvas: &mut dyn Canvas,
    ctx: &SceneContext<'_>,
    task: &FrameTask,
    policy: FrameErrorPolicy,
) -> CapsyncResult<(RenderedFrame, bool)> {
    match render_frame(canvas, ctx, task) {
        Ok(frame) => Ok((frame, false)),
        Err(e) if policy == FrameErrorPolicy::BlankFrame => {
            tracing::warn!(frame = task.index.0, error = %e, "substituting blank frame");
            let (width, height) = ctx.opts.frame_size();
            let blank = FrameScene {
                width,
                height,
                clear: ctx.opts.background_color,
                ops: Vec::new(),
            };
            let image = canvas.draw_frame(&blank).map_err(|blank_err| {
                CapsyncError::render_task(
                    task.index.0,
                    format!("{e}; blank frame also failed: {blank_err}"),
                )
            })?;
            Ok((
                RenderedFrame {
                    index: task.index,
                    image,
                },
                true,
            ))
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> CapsyncResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CapsyncError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

/// Chunk length bounded by the configured size and by [`MAX_REORDER_BUFFER_BYTES`].
pub(crate) fn chunk_size_for(chunk_size: usize, width: u32, height: u32) -> usize {
    let bytes_per_frame = u64::from(width)
        .saturating_mul(u64::from(height))
        .saturating_mul(4)
        .max(1);
    let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
    normalized_chunk_size(chunk_size).min(max_chunk_by_mem) as usize
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
