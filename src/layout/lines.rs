use std::ops::Range;

use crate::config::options::RenderOptions;
use crate::foundation::error::CapsyncResult;
use crate::render::canvas::{FaceWeight, TextMeasure};
use crate::transcript::mapper::Word;

/// A run of consecutive words laid out on one row.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    /// Word indices (into the transcript word sequence) on this line.
    pub words: Range<usize>,
    /// Measured width: word widths plus separators between them, without padding.
    pub width: f64,
    /// `true` when the line holds a single word wider than the width budget.
    pub overflow: bool,
}

/// Result of greedy line wrapping over a word sequence.
///
/// Built once per render and shared read-only by every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LineLayout {
    lines: Vec<Line>,
    word_line: Vec<usize>,
    word_widths: Vec<f64>,
    separator_width: f64,
}

impl LineLayout {
    /// All lines in order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Owning line index for every word index.
    pub fn word_lines(&self) -> &[usize] {
        &self.word_line
    }

    /// Measured regular-face width of every word.
    pub fn word_widths(&self) -> &[f64] {
        &self.word_widths
    }

    /// Width of the separator placed between words.
    pub fn separator_width(&self) -> f64 {
        self.separator_width
    }

    /// Line holding word `word`.
    pub fn line_of(&self, word: usize) -> usize {
        self.word_line.get(word).copied().unwrap_or(0)
    }

    /// Number of words on lines strictly before `line`.
    pub fn words_before(&self, line: usize) -> usize {
        self.lines
            .get(line)
            .map(|l| l.words.start)
            .unwrap_or(self.word_line.len())
    }

    /// Visible window of lines for the frame where `active` is the current word.
    ///
    /// Windows are aligned to multiples of `max_lines`, so the caption box pages rather than
    /// scrolling one line at a time.
    pub fn window(&self, active: usize, max_lines: usize) -> Range<usize> {
        let max_lines = max_lines.max(1);
        let line = self.line_of(active);
        let start = line - line % max_lines;
        let end = (start + max_lines).min(self.lines.len());
        start..end
    }
}

/// Greedily wrap `words` into lines that fit `opts.width` minus padding.
///
/// Single pass, no backtracking: a word goes on the current line if it fits, otherwise it opens
/// a new one. A word wider than the whole budget still gets a line of its own. Words with empty
/// text take no room and never open a line.
pub fn layout_lines(
    words: &[Word],
    measure: &mut dyn TextMeasure,
    opts: &RenderOptions,
) -> CapsyncResult<LineLayout> {
    let padding = opts.padding;
    let max_width = f64::from(opts.width);
    let budget = max_width - 2.0 * padding;
    let separator_width = measure.measure_width(&opts.separator(), FaceWeight::Regular)?;

    let mut lines = Vec::<Line>::new();
    let mut word_line = Vec::with_capacity(words.len());
    let mut word_widths = Vec::with_capacity(words.len());

    let mut current = padding;
    let mut start = 0usize;
    let mut has_text = false;

    for (i, word) in words.iter().enumerate() {
        if word.is_empty() {
            word_line.push(lines.len());
            word_widths.push(0.0);
            continue;
        }

        let w = measure.measure_width(&word.text, FaceWeight::Regular)?;
        if has_text && current + w + separator_width + padding > max_width - padding {
            lines.push(close_line(start..i, current - padding - separator_width, budget));
            start = i;
            current = padding;
        }

        word_line.push(lines.len());
        word_widths.push(w);
        current += w + separator_width;
        has_text = true;
    }

    if start < words.len() {
        let width = if has_text {
            current - padding - separator_width
        } else {
            0.0
        };
        lines.push(close_line(start..words.len(), width, budget));
    }

    tracing::debug!(
        words = words.len(),
        lines = lines.len(),
        separator_width,
        "laid out caption lines"
    );

    Ok(LineLayout {
        lines,
        word_line,
        word_widths,
        separator_width,
    })
}

fn close_line(words: Range<usize>, width: f64, budget: f64) -> Line {
    let overflow = width > budget;
    if overflow {
        tracing::warn!(
            first_word = words.start,
            width,
            budget,
            "word wider than the caption box; placed alone on its own line"
        );
    }
    Line {
        words,
        width,
        overflow,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/lines.rs"]
mod tests;
