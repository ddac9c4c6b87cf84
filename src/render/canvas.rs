use crate::foundation::error::CapsyncResult;
use crate::render::scene::FrameScene;

/// Which of the two loaded faces a text run uses.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum FaceWeight {
    /// Face used for every non-highlighted word, and for layout measurement.
    #[default]
    Regular,
    /// Face used for the highlighted word.
    Bold,
}

/// Text measurement capability used by line layout.
pub trait TextMeasure {
    /// Advance width of `text` in pixels when set in `weight`.
    fn measure_width(&mut self, text: &str, weight: FaceWeight) -> CapsyncResult<f64>;
}

/// A drawing surface that rasterizes one [`FrameScene`] into encoded image bytes.
///
/// Implementations hold their own mutable shaping/raster state; render workers each own one
/// instance and never share it.
pub trait Canvas: TextMeasure {
    /// Rasterize and encode `scene`.
    fn draw_frame(&mut self, scene: &FrameScene) -> CapsyncResult<Vec<u8>>;
}
