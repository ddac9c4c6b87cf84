use crate::animation::ease::Ease;
use crate::animation::interp::{Interp, SpringParams};
use crate::config::options::RenderOptions;
use crate::foundation::core::Rgba8;
use crate::foundation::error::{CapsyncError, CapsyncResult};
use crate::transcript::mapper::Word;

/// Per-frame animation strategy.
///
/// `update` must stay a pure function of its inputs: frames are rendered concurrently and in any
/// order, each on its own copy of the options.
pub trait Updater: Send + Sync {
    /// Return `opts` with the animated fields set for transition `progress` in `[0, 1]`.
    fn update(&self, opts: RenderOptions, progress: f64) -> RenderOptions;

    /// Whether word `candidate` is drawn in a frame whose active word is `active`.
    fn is_visible(&self, words: &[Word], active: usize, candidate: usize) -> bool;
}

/// Built-in caption animation styles, selected by `RenderOptions::style`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Style {
    /// The whole window stays on screen; the highlight box springs into place on every word.
    ScrollingBox {
        /// Curve driving `highlight_scale`.
        #[serde(default = "default_box_scale")]
        scale: Interp,
    },
    /// Words appear one by one, sliding up and fading in as they are spoken.
    AppearingWords {
        /// Curve driving `text_offset_y` of the active word.
        #[serde(default = "default_appear_offset")]
        offset: Interp,
        /// Curve driving the alpha of the active word.
        #[serde(default = "default_appear_opacity")]
        opacity: Interp,
        /// Draw no highlight box behind the active word.
        #[serde(default = "default_true")]
        hide_highlight: bool,
    },
}

fn default_box_scale() -> Interp {
    Interp::spring(0.9, 1.0, SpringParams::default())
}

fn default_appear_offset() -> Interp {
    Interp::eased(25.0, 0.0, Ease::InQuad)
}

fn default_appear_opacity() -> Interp {
    Interp::linear(0.0, 1.0)
}

fn default_true() -> bool {
    true
}

impl Default for Style {
    fn default() -> Self {
        Self::ScrollingBox {
            scale: default_box_scale(),
        }
    }
}

impl Style {
    /// Default [`Style::AppearingWords`].
    pub fn appearing_words() -> Self {
        Self::AppearingWords {
            offset: default_appear_offset(),
            opacity: default_appear_opacity(),
            hide_highlight: true,
        }
    }

    /// Validate curve parameters.
    pub fn validate(&self) -> CapsyncResult<()> {
        match self {
            Self::ScrollingBox { scale } => {
                scale.validate()?;
                if scale.from < 0.0 || scale.to < 0.0 {
                    return Err(CapsyncError::validation(
                        "scrollingBox scale endpoints must be >= 0",
                    ));
                }
                Ok(())
            }
            Self::AppearingWords {
                offset, opacity, ..
            } => {
                offset.validate()?;
                opacity.validate()
            }
        }
    }

    /// Stable style name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScrollingBox { .. } => "scrollingBox",
            Self::AppearingWords { .. } => "appearingWords",
        }
    }
}

impl Updater for Style {
    fn update(&self, mut opts: RenderOptions, progress: f64) -> RenderOptions {
        match self {
            Self::ScrollingBox { scale } => {
                opts.highlight_scale = scale.sample(progress).max(0.0);
            }
            Self::AppearingWords {
                offset,
                opacity,
                hide_highlight,
            } => {
                opts.text_offset_y = offset.sample(progress);
                opts.selected_text_color = opts
                    .selected_text_color
                    .scale_alpha(opacity.sample(progress));
                if *hide_highlight {
                    opts.highlight_color = Rgba8::TRANSPARENT;
                }
            }
        }
        opts
    }

    fn is_visible(&self, _words: &[Word], active: usize, candidate: usize) -> bool {
        match self {
            Self::ScrollingBox { .. } => true,
            Self::AppearingWords { .. } => candidate <= active,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/style/updater.rs"]
mod tests;
