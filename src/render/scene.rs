use crate::config::options::RenderOptions;
use crate::foundation::core::{Point, Rect, Rgba8};
use crate::layout::lines::LineLayout;
use crate::render::canvas::FaceWeight;
use crate::schedule::frames::FrameTask;
use crate::style::updater::Updater;
use crate::transcript::mapper::Word;

/// Share of the font size between the baseline and the bottom of the highlight box.
const DESCENT_RATIO: f64 = 0.23;

/// One drawing operation in a [`FrameScene`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Filled rounded rectangle behind the highlighted word.
    Highlight {
        /// Unscaled box.
        rect: Rect,
        /// Corner radius.
        radius: f64,
        /// Uniform scale about the box center.
        scale: f64,
        /// Fill color.
        color: Rgba8,
    },
    /// A single word.
    Text {
        /// Text to draw.
        text: String,
        /// Face to draw it with.
        weight: FaceWeight,
        /// Left end of the baseline.
        origin: Point,
        /// Fill color.
        color: Rgba8,
    },
}

/// Backend-agnostic draw list for one caption frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameScene {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Color the frame is cleared to.
    pub clear: Rgba8,
    /// Operations in paint order.
    pub ops: Vec<DrawOp>,
}

impl FrameScene {
    /// Number of text runs in the scene.
    pub fn text_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { .. }))
            .count()
    }

    /// The highlight box, if one is drawn.
    pub fn highlight(&self) -> Option<&DrawOp> {
        self.ops
            .iter()
            .find(|op| matches!(op, DrawOp::Highlight { .. }))
    }
}

/// Read-only inputs shared by every frame of one render.
#[derive(Clone, Copy)]
pub struct SceneContext<'a> {
    /// Frame-mapped words, sentinel first.
    pub words: &'a [Word],
    /// Line layout of `words`.
    pub layout: &'a LineLayout,
    /// Base options; never mutated.
    pub opts: &'a RenderOptions,
    /// Animation strategy.
    pub updater: &'a dyn Updater,
}

impl<'a> SceneContext<'a> {
    /// Context animated by `opts.style`.
    pub fn new(words: &'a [Word], layout: &'a LineLayout, opts: &'a RenderOptions) -> Self {
        Self {
            words,
            layout,
            opts,
            updater: &opts.style,
        }
    }

    /// Replace the animation strategy.
    pub fn with_updater(mut self, updater: &'a dyn Updater) -> Self {
        self.updater = updater;
        self
    }
}

/// Build the draw list for `task`.
///
/// Pure: the result depends only on `ctx` and `task`, so frames can be composed in any order on
/// any thread. Lead-in frames come out fully transparent; nothing is on screen before the first
/// word.
pub fn compose_frame(ctx: &SceneContext<'_>, task: &FrameTask) -> FrameScene {
    if task.is_lead_in() {
        let (width, height) = ctx.opts.frame_size();
        return FrameScene {
            width,
            height,
            clear: Rgba8::TRANSPARENT,
            ops: Vec::new(),
        };
    }

    let opts = ctx.updater.update(ctx.opts.clone(), task.progress);
    let (width, height) = opts.frame_size();
    let mut ops = Vec::new();

    let layout = ctx.layout;
    let window = layout.window(task.active_word, opts.max_lines);
    let highlight_slot = task
        .active_word
        .checked_sub(layout.words_before(window.start));

    let canvas_w = f64::from(width);
    let sep = layout.separator_width();
    let text_color = opts.font_color.scale_alpha(opts.text_opacity);
    let selected_color = opts.selected_text_color.scale_alpha(opts.text_opacity);

    let mut slot = 0usize;
    for (row, line) in layout.lines()[window].iter().enumerate() {
        let baseline = opts.padding + opts.font_size + row as f64 * opts.line_height();
        let start_x = match (opts.rtl, opts.center) {
            (false, true) => (canvas_w - line.width) / 2.0,
            (false, false) => opts.padding,
            (true, true) => (canvas_w + line.width) / 2.0,
            (true, false) => canvas_w - opts.padding,
        };

        let mut cursor = 0.0;
        for idx in line.words.clone() {
            let this_slot = slot;
            slot += 1;

            let Some(word) = ctx.words.get(idx) else {
                continue;
            };
            if word.is_empty() {
                continue;
            }
            let w = layout.word_widths().get(idx).copied().unwrap_or(0.0);
            let x = if opts.rtl {
                start_x - cursor - w
            } else {
                start_x + cursor
            };
            cursor += w + sep;

            if !ctx.updater.is_visible(ctx.words, task.active_word, idx) {
                continue;
            }

            if Some(this_slot) == highlight_slot {
                push_highlight(&mut ops, &opts, x, baseline, w);
                ops.push(DrawOp::Text {
                    text: word.text.clone(),
                    weight: FaceWeight::Bold,
                    origin: Point::new(x + opts.text_offset_x, baseline + opts.text_offset_y),
                    color: selected_color,
                });
            } else {
                ops.push(DrawOp::Text {
                    text: word.text.clone(),
                    weight: FaceWeight::Regular,
                    origin: Point::new(x, baseline),
                    color: text_color,
                });
            }
        }
    }

    FrameScene {
        width,
        height,
        clear: opts.background_color,
        ops,
    }
}

fn push_highlight(ops: &mut Vec<DrawOp>, opts: &RenderOptions, x: f64, baseline: f64, w: f64) {
    if opts.highlight_color.a == 0 || opts.highlight_scale <= 0.0 {
        return;
    }
    let pad = opts.highlight_padding;
    let x0 = x - pad + opts.text_offset_x;
    let y0 = baseline - opts.font_size - pad + opts.text_offset_y + opts.font_size * DESCENT_RATIO;
    let rect = Rect::new(x0, y0, x0 + w + 2.0 * pad, y0 + opts.font_size + 2.0 * pad);
    ops.push(DrawOp::Highlight {
        rect,
        radius: opts.highlight_border_radius,
        scale: opts.highlight_scale,
        color: opts.highlight_color,
    });
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
