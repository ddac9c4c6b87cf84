//! capsync burns word-synchronized, animated captions into videos.
//!
//! A word-timed transcript is mapped to frame indices, wrapped into lines, scheduled into one
//! render task per output frame and drawn as transparent caption frames that ffmpeg overlays on a
//! background video. The public API is session-oriented:
//!
//! - Load a [`Transcript`] and [`RenderOptions`]
//! - Create a [`CaptionSession`] (layout and scheduling happen once, up front)
//! - Render single frames, whole frame lists, or stream every frame into a [`FrameSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub(crate) mod animation;
pub(crate) mod config;
/// Frame sinks and ffmpeg muxing.
pub mod encode;
pub(crate) mod layout;
/// Scene composition, canvases and the frame rendering pipeline.
pub mod render;
pub(crate) mod schedule;
/// Session-oriented rendering API.
pub mod session;
pub(crate) mod style;
pub(crate) mod transcript;

pub use crate::foundation::core::{Affine, Fps, FrameIndex, Point, Rect, Rgba8, Vec2};
pub use crate::foundation::error::{CapsyncError, CapsyncResult};

pub use crate::animation::ease::Ease;
pub use crate::animation::interp::{Curve, Interp, SpringParams, lerp, spring};
pub use crate::assets::fonts::{FontCache, FontFace};
pub use crate::config::options::{Alignment, RenderOptions};
pub use crate::encode::ffmpeg::{FfmpegCompositor, is_ffmpeg_on_path, probe_video_size};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::layout::lines::{Line, LineLayout, layout_lines};
pub use crate::render::canvas::{Canvas, FaceWeight, TextMeasure};
pub use crate::render::cpu::CpuCanvas;
pub use crate::render::pipeline::{
    CancelToken, FrameErrorPolicy, RenderStats, RenderThreading, RenderedFrame, render_frame,
    render_frames,
};
pub use crate::render::scene::{DrawOp, FrameScene, SceneContext, compose_frame};
pub use crate::schedule::frames::{
    FrameTask, Schedule, ScheduleStats, schedule_frames, transition_progress,
};
pub use crate::session::render_session::CaptionSession;
pub use crate::style::updater::{Style, Updater};
pub use crate::transcript::mapper::{Transcript, TranscriptEntry, Word};
