use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{Fps, Rgba8};
use crate::foundation::error::{CapsyncError, CapsyncResult};
use crate::style::updater::Style;

/// Vertical placement of the caption box inside the output video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Box touches the top edge.
    Top,
    /// Box is vertically centered.
    Center,
    /// Box touches the bottom edge.
    #[default]
    Bottom,
}

/// Caption rendering configuration.
///
/// The first group of fields is base configuration, fixed for a whole render. The animated group
/// (`text_offset_*`, `text_opacity`, `highlight_scale` and the colors) is rewritten per frame by
/// the active [`Style`] on a per-frame copy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Font family name, used to locate `<family>-Medium.ttf` / `<family>-Bold.ttf`.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Color of non-highlighted words.
    pub font_color: Rgba8,
    /// Fill color of the highlight box.
    pub highlight_color: Rgba8,
    /// Color of the highlighted word.
    pub selected_text_color: Rgba8,
    /// Clear color of every caption frame.
    pub background_color: Rgba8,
    /// Inner padding of the caption box in pixels.
    pub padding: f64,
    /// Number of space characters between words.
    pub word_spacing: u32,
    /// Line advance as a multiple of `font_size`.
    pub line_spacing: f64,
    /// Lines per visible window.
    pub max_lines: usize,
    /// Output frame rate.
    pub fps: u32,
    /// Caption box width (also the output video width).
    pub width: u32,
    /// Output video height, used for vertical alignment.
    pub height: u32,
    /// Lay words out right-to-left.
    pub rtl: bool,
    /// Center every line horizontally.
    pub center: bool,
    /// Vertical placement of the caption box.
    pub alignment: Alignment,
    /// Corner radius of the highlight box.
    pub highlight_border_radius: f64,
    /// Padding between a word and its highlight box.
    pub highlight_padding: f64,
    /// Highlight box scale about its center.
    pub highlight_scale: f64,
    /// Horizontal offset of the highlighted word.
    pub text_offset_x: f64,
    /// Vertical offset of the highlighted word.
    pub text_offset_y: f64,
    /// Opacity multiplier for caption text.
    pub text_opacity: f64,
    /// Length of the highlight transition between two words.
    pub transition_secs: f64,
    /// Keep the last word on screen for its spoken duration.
    pub hold_last_word: bool,
    /// Animation style.
    pub style: Style,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font_family: "Montserrat".to_owned(),
            font_size: 40.0,
            font_color: Rgba8::WHITE,
            highlight_color: Rgba8::new(12, 119, 135, 255),
            selected_text_color: Rgba8::WHITE,
            background_color: Rgba8::TRANSPARENT,
            padding: 40.0,
            word_spacing: 1,
            line_spacing: 1.6,
            max_lines: 3,
            fps: 30,
            width: 720,
            height: 1280,
            rtl: false,
            center: true,
            alignment: Alignment::Bottom,
            highlight_border_radius: 15.0,
            highlight_padding: 15.0,
            highlight_scale: 1.0,
            text_offset_x: 0.0,
            text_offset_y: 0.0,
            text_opacity: 1.0,
            transition_secs: 0.2,
            hold_last_word: true,
            style: Style::default(),
        }
    }
}

impl RenderOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_path(path: &Path) -> CapsyncResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read options '{}'", path.display()))?;
        Self::from_json_slice(&bytes)
    }

    /// Parse options from JSON bytes and validate them.
    pub fn from_json_slice(bytes: &[u8]) -> CapsyncResult<Self> {
        let opts: Self = serde_json::from_slice(bytes)
            .map_err(|e| CapsyncError::validation(format!("invalid options json: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject configurations that cannot produce frames.
    pub fn validate(&self) -> CapsyncResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(CapsyncError::validation("fontSize must be finite and > 0"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CapsyncError::validation("width/height must be non-zero"));
        }
        if self.max_lines == 0 {
            return Err(CapsyncError::validation("maxLines must be >= 1"));
        }
        if self.fps == 0 {
            return Err(CapsyncError::validation("fps must be >= 1"));
        }
        for (name, v) in [
            ("padding", self.padding),
            ("highlightPadding", self.highlight_padding),
            ("highlightBorderRadius", self.highlight_border_radius),
            ("transitionSecs", self.transition_secs),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(CapsyncError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if !self.line_spacing.is_finite() || self.line_spacing <= 0.0 {
            return Err(CapsyncError::validation(
                "lineSpacing must be finite and > 0",
            ));
        }
        if 2.0 * self.padding >= f64::from(self.width) {
            return Err(CapsyncError::validation(
                "padding leaves no horizontal room for text",
            ));
        }
        self.style.validate()
    }

    /// Output frame rate as [`Fps`].
    pub fn frame_rate(&self) -> CapsyncResult<Fps> {
        Fps::integer(self.fps)
    }

    /// Separator placed between words.
    pub fn separator(&self) -> String {
        " ".repeat(self.word_spacing as usize)
    }

    /// Line advance in pixels.
    pub fn line_height(&self) -> f64 {
        self.font_size * self.line_spacing
    }

    /// Height of the caption box: `max_lines` line advances plus vertical padding.
    pub fn box_height(&self) -> f64 {
        self.font_size * self.max_lines as f64 * self.line_spacing + 2.0 * self.padding
    }

    /// Pixel size of every rendered caption frame.
    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.box_height().ceil().max(1.0) as u32)
    }

    /// Vertical offset of the caption box against `output_height`, per [`Alignment`].
    pub fn vertical_offset(&self, output_height: u32) -> f64 {
        let h = f64::from(output_height);
        let box_h = self.box_height();
        match self.alignment {
            Alignment::Top => 0.0,
            Alignment::Center => h / 2.0 - box_h / 2.0,
            Alignment::Bottom => h - box_h,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/options.rs"]
mod tests;
