use std::borrow::Cow;
use std::sync::Arc;

use image::ImageEncoder as _;

use crate::assets::fonts::{FontCache, FontFace};
use crate::foundation::core::{Affine, Rgba8, Vec2};
use crate::foundation::error::{CapsyncError, CapsyncResult};
use crate::render::canvas::{Canvas, FaceWeight, TextMeasure};
use crate::render::scene::{DrawOp, FrameScene};

/// Tolerance used when flattening rounded rectangles into paths.
const PATH_TOLERANCE: f64 = 0.1;

/// CPU canvas: parley shapes words, `vello_cpu` rasterizes, `image` encodes PNG.
///
/// One instance per worker thread. Font bytes are shared through the [`FontCache`]; every
/// instance registers them in its own parley contexts.
pub struct CpuCanvas {
    font_size: f32,
    layout_ctx: parley::LayoutContext<Rgba8>,
    regular: FaceShaper,
    bold: FaceShaper,
    ctx: Option<vello_cpu::RenderContext>,
}

struct FaceShaper {
    font_ctx: parley::FontContext,
    family: String,
    font: vello_cpu::peniko::FontData,
}

impl FaceShaper {
    fn new(face: &FontFace) -> CapsyncResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(face.bytes().to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| CapsyncError::font("no font families registered from font bytes"))?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CapsyncError::font("registered font family has no name"))?
            .to_string();
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(face.bytes().to_vec()),
            0,
        );
        Ok(Self {
            font_ctx,
            family,
            font,
        })
    }
}

impl CpuCanvas {
    /// Create a canvas drawing text at `font_size` pixels.
    pub fn new(fonts: Arc<FontCache>, font_size: f64) -> CapsyncResult<Self> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(CapsyncError::validation(
                "canvas font size must be finite and > 0",
            ));
        }
        let regular = FaceShaper::new(fonts.face(FaceWeight::Regular))?;
        let bold = FaceShaper::new(fonts.face(FaceWeight::Bold))?;
        Ok(Self {
            font_size: font_size as f32,
            layout_ctx: parley::LayoutContext::new(),
            regular,
            bold,
            ctx: None,
        })
    }

    fn layout(&mut self, text: &str, weight: FaceWeight) -> parley::Layout<Rgba8> {
        let shaper = match weight {
            FaceWeight::Regular => &mut self.regular,
            FaceWeight::Bold => &mut self.bold,
        };
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut shaper.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(shaper.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(self.font_size));
        builder.push_default(parley::style::StyleProperty::Brush(Rgba8::WHITE));

        let mut layout: parley::Layout<Rgba8> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        weight: FaceWeight,
        origin: Vec2,
        color: Rgba8,
    ) {
        let layout = self.layout(text, weight);
        let font = match weight {
            FaceWeight::Regular => &self.regular.font,
            FaceWeight::Bold => &self.bold.font,
        };

        ctx.set_transform(affine_to_cpu(Affine::translate(origin)));
        ctx.set_paint(paint(color));
        for line in layout.lines() {
            let baseline = line.metrics().baseline;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y - baseline,
                });
                ctx.glyph_run(font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

impl TextMeasure for CpuCanvas {
    fn measure_width(&mut self, text: &str, weight: FaceWeight) -> CapsyncResult<f64> {
        if text.is_empty() {
            return Ok(0.0);
        }
        Ok(f64::from(self.layout(text, weight).full_width()))
    }
}

impl Canvas for CpuCanvas {
    fn draw_frame(&mut self, scene: &FrameScene) -> CapsyncResult<Vec<u8>> {
        let width: u16 = scene
            .width
            .try_into()
            .map_err(|_| CapsyncError::validation("frame width exceeds u16"))?;
        let height: u16 = scene
            .height
            .try_into()
            .map_err(|_| CapsyncError::validation("frame height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(CapsyncError::validation("frame size must be non-zero"));
        }

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();

        if scene.clear.a > 0 {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(paint(scene.clear));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(width),
                f64::from(height),
            ));
        }

        for op in &scene.ops {
            match op {
                DrawOp::Highlight {
                    rect,
                    radius,
                    scale,
                    color,
                } => {
                    let center = rect.center().to_vec2();
                    let about = Affine::translate(center)
                        * Affine::scale(*scale)
                        * Affine::translate(-center);
                    let rounded = kurbo::RoundedRect::from_rect(*rect, *radius);
                    ctx.set_transform(affine_to_cpu(about));
                    ctx.set_paint(paint(*color));
                    ctx.fill_path(&shape_to_cpu(&rounded));
                }
                DrawOp::Text {
                    text,
                    weight,
                    origin,
                    color,
                } => {
                    self.draw_text(&mut ctx, text, *weight, origin.to_vec2(), *color);
                }
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        encode_png(pixmap.data_as_u8_slice(), scene.width, scene.height)
    }
}

fn paint(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn shape_to_cpu(shape: &impl kurbo::Shape) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in shape.path_elements(PATH_TOLERANCE) {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Encode premultiplied RGBA8 pixels as a straight-alpha PNG.
pub(crate) fn encode_png(premul: &[u8], width: u32, height: u32) -> CapsyncResult<Vec<u8>> {
    let mut straight = premul.to_vec();
    unpremultiply_in_place(&mut straight);

    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(&straight, width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| anyhow::anyhow!("png encode failed: {e}"))?;
    Ok(out)
}

fn unpremultiply_in_place(px: &mut [u8]) {
    for p in px.chunks_exact_mut(4) {
        let a = u16::from(p[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut p[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
