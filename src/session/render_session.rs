use std::sync::{Arc, mpsc};

use crate::assets::fonts::FontCache;
use crate::config::options::RenderOptions;
use crate::encode::ffmpeg::FfmpegCompositor;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{CapsyncError, CapsyncResult};
use crate::layout::lines::{LineLayout, layout_lines};
use crate::render::canvas::{Canvas, TextMeasure};
use crate::render::cpu::CpuCanvas;
use crate::render::pipeline::{
    CancelToken, RenderStats, RenderThreading, RenderedFrame, for_each_chunk, render_frame,
    render_frames,
};
use crate::render::scene::SceneContext;
use crate::schedule::frames::{Schedule, schedule_frames};
use crate::transcript::mapper::Transcript;

/// Session-oriented caption renderer.
///
/// A session front-loads option validation, line layout and frame scheduling, then renders single
/// frames, whole frame lists, or streams every frame into a [`FrameSink`]. Everything it owns is
/// read-only after construction, so render calls only need `&self`.
#[derive(Debug)]
pub struct CaptionSession {
    transcript: Transcript,
    opts: RenderOptions,
    layout: LineLayout,
    schedule: Schedule,
    fonts: Option<Arc<FontCache>>,
}

impl CaptionSession {
    /// Build a session that measures and draws with the CPU canvas over `fonts`.
    #[tracing::instrument(skip_all, fields(words = transcript.words().len()))]
    pub fn new(
        transcript: Transcript,
        opts: RenderOptions,
        fonts: Arc<FontCache>,
    ) -> CapsyncResult<Self> {
        opts.validate()?;
        let mut measure = CpuCanvas::new(fonts.clone(), opts.font_size)?;
        let mut session = Self::with_measure(transcript, opts, &mut measure)?;
        session.fonts = Some(fonts);
        Ok(session)
    }

    /// Build a session that lays out lines with `measure`.
    ///
    /// Sessions built this way carry no fonts; render through the `*_with` methods and a canvas
    /// factory of your own.
    pub fn with_measure(
        transcript: Transcript,
        opts: RenderOptions,
        measure: &mut dyn TextMeasure,
    ) -> CapsyncResult<Self> {
        opts.validate()?;
        let fps = opts.frame_rate()?;
        if transcript.fps() != fps {
            return Err(CapsyncError::validation(format!(
                "transcript was mapped at {} fps but options ask for {} fps",
                transcript.fps().as_f64(),
                fps.as_f64()
            )));
        }

        let layout = layout_lines(transcript.words(), measure, &opts)?;
        let schedule = schedule_frames(transcript.words(), &opts)?;
        tracing::info!(
            lines = layout.lines().len(),
            frames = schedule.len(),
            style = opts.style.name(),
            "caption session ready"
        );

        Ok(Self {
            transcript,
            opts,
            layout,
            schedule,
            fonts: None,
        })
    }

    /// Mapped transcript, sentinel first.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Base options.
    pub fn options(&self) -> &RenderOptions {
        &self.opts
    }

    /// Line layout computed at construction.
    pub fn layout(&self) -> &LineLayout {
        &self.layout
    }

    /// Frame schedule computed at construction.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Sink configuration for a video `output_height` pixels tall.
    pub fn sink_config(&self, output_height: u32) -> CapsyncResult<SinkConfig> {
        let (width, height) = self.opts.frame_size();
        Ok(SinkConfig {
            width,
            height,
            fps: self.opts.frame_rate()?,
            offset_y: self.opts.vertical_offset(output_height),
        })
    }

    fn scene_context(&self) -> SceneContext<'_> {
        SceneContext::new(self.transcript.words(), &self.layout, &self.opts)
    }

    fn fonts(&self) -> CapsyncResult<Arc<FontCache>> {
        self.fonts.clone().ok_or_else(|| {
            CapsyncError::validation("session was built without fonts; use a custom canvas")
        })
    }

    /// Render scheduled frame `index` as PNG with the CPU canvas.
    pub fn render_frame(&self, index: FrameIndex) -> CapsyncResult<RenderedFrame> {
        let mut canvas = CpuCanvas::new(self.fonts()?, self.opts.font_size)?;
        self.render_frame_with(&mut canvas, index)
    }

    /// Render scheduled frame `index` on `canvas`.
    pub fn render_frame_with(
        &self,
        canvas: &mut dyn Canvas,
        index: FrameIndex,
    ) -> CapsyncResult<RenderedFrame> {
        let task = usize::try_from(index.0)
            .ok()
            .and_then(|i| self.schedule.tasks().get(i))
            .ok_or_else(|| {
                CapsyncError::validation(format!(
                    "frame {} is outside the schedule ({} frames)",
                    index.0,
                    self.schedule.len()
                ))
            })?;
        render_frame(canvas, &self.scene_context(), task)
    }

    /// Render every scheduled frame as PNG with the CPU canvas, in frame order.
    pub fn render_frames(
        &self,
        threading: &RenderThreading,
        cancel: &CancelToken,
    ) -> CapsyncResult<(Vec<RenderedFrame>, RenderStats)> {
        let fonts = self.fonts()?;
        let font_size = self.opts.font_size;
        self.render_frames_with(
            move || CpuCanvas::new(fonts.clone(), font_size),
            threading,
            cancel,
        )
    }

    /// Render every scheduled frame with canvases from `make_canvas`, in frame order.
    #[tracing::instrument(skip_all, fields(frames = self.schedule.len(), parallel = threading.parallel))]
    pub fn render_frames_with<C, F>(
        &self,
        make_canvas: F,
        threading: &RenderThreading,
        cancel: &CancelToken,
    ) -> CapsyncResult<(Vec<RenderedFrame>, RenderStats)>
    where
        C: Canvas,
        F: Fn() -> CapsyncResult<C> + Sync + Send,
    {
        render_frames(
            &self.scene_context(),
            self.schedule.tasks(),
            make_canvas,
            threading,
            cancel,
        )
    }

    /// Stream every frame, rendered with the CPU canvas, into `sink`.
    pub fn render_to_sink(
        &self,
        sink: &mut dyn FrameSink,
        threading: &RenderThreading,
        cancel: &CancelToken,
    ) -> CapsyncResult<RenderStats> {
        let fonts = self.fonts()?;
        let font_size = self.opts.font_size;
        self.render_to_sink_with(
            move || CpuCanvas::new(fonts.clone(), font_size),
            sink,
            threading,
            cancel,
        )
    }

    /// Stream every frame into `sink`, rendering with canvases from `make_canvas`.
    ///
    /// The sink receives frames in strictly increasing index order on a dedicated encoder thread.
    /// Rendering runs ahead of the sink by at most `threading.channel_capacity` frames plus one
    /// chunk. The caption box is positioned against `options().height`.
    #[tracing::instrument(skip_all, fields(frames = self.schedule.len(), parallel = threading.parallel))]
    pub fn render_to_sink_with<C, F>(
        &self,
        make_canvas: F,
        sink: &mut dyn FrameSink,
        threading: &RenderThreading,
        cancel: &CancelToken,
    ) -> CapsyncResult<RenderStats>
    where
        C: Canvas,
        F: Fn() -> CapsyncResult<C> + Sync + Send,
    {
        if self.schedule.is_empty() {
            return Err(CapsyncError::validation(
                "schedule has no frames; every word is empty",
            ));
        }
        let cfg = self.sink_config(self.opts.height)?;
        let total = self.schedule.len() as u64;
        let cap = threading.channel_capacity.max(1);
        let ctx = self.scene_context();

        std::thread::scope(|scope| -> CapsyncResult<RenderStats> {
            let (tx, rx) = mpsc::sync_channel::<RenderedFrame>(cap);
            let sink_ref: &mut dyn FrameSink = sink;

            // Returns whether every frame arrived; a short stream means the producer failed.
            let enc = scope.spawn(move || -> CapsyncResult<bool> {
                sink_ref.begin(cfg)?;
                let mut received = 0u64;
                for frame in rx.iter() {
                    sink_ref.push_frame(frame.index, &frame.image)?;
                    received += 1;
                }
                if received < total {
                    return Ok(false);
                }
                sink_ref.end()?;
                Ok(true)
            });

            let mut stats = RenderStats::default();
            let produce_res = for_each_chunk(
                &ctx,
                self.schedule.tasks(),
                &make_canvas,
                threading,
                cancel,
                |frames, chunk_stats| {
                    stats.add(chunk_stats);
                    for frame in frames {
                        tx.send(frame).map_err(|_| {
                            CapsyncError::Other(anyhow::anyhow!(
                                "encoder thread is not accepting frames"
                            ))
                        })?;
                    }
                    Ok(())
                },
            );

            drop(tx);
            let completed = enc
                .join()
                .map_err(|_| CapsyncError::Other(anyhow::anyhow!("encoder thread panicked")))?;

            // A sink failure explains why frames stopped flowing, so it wins over the send error.
            let completed = completed?;
            produce_res?;
            if !completed {
                return Err(CapsyncError::Other(anyhow::anyhow!(
                    "render stopped before every frame reached the sink"
                )));
            }

            tracing::info!(
                rendered = stats.frames_rendered,
                blank = stats.frames_blank,
                "render finished"
            );
            Ok(stats)
        })
    }

    /// Render every frame with the CPU canvas and overlay it on `background` with ffmpeg.
    ///
    /// Returns the muxed Matroska bytes.
    pub fn render_video(
        &self,
        background: Vec<u8>,
        threading: &RenderThreading,
        cancel: &CancelToken,
    ) -> CapsyncResult<Vec<u8>> {
        let mut compositor = FfmpegCompositor::new(background);
        self.render_to_sink(&mut compositor, threading, cancel)?;
        compositor.take_output()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
