use ab_glyph::{point, Font, FontArc, GlyphId, InvalidFont, OutlinedGlyph, PxScale, ScaleFont};
use image::{GrayImage, Pixel, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use super::layout::Anchor;

#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outline {
    pub color: Rgba<u8>,
    pub width: f32,
}

/// `size` is the em box in pixels, CSS style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Rgba<u8>,
    pub align: Align,
    pub outline: Option<Outline>,
}

impl TextStyle {
    pub fn new(size: f32, color: Rgba<u8>, align: Align) -> Self {
        Self {
            size,
            color,
            align,
            outline: None,
        }
    }

    pub fn with_outline(mut self, color: Rgba<u8>, width: f32) -> Self {
        self.outline = Some(Outline { color, width });
        self
    }
}

/// Coverage of a laid-out string, positioned relative to the pen origin
struct TextMask {
    coverage: GrayImage,
    left: i32,
    top: i32,
    advance: f32,
}

impl Typeface {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, InvalidFont> {
        FontArc::try_from_vec(bytes).map(|font| Self { font })
    }

    fn scale(&self, size: f32) -> PxScale {
        match self.font.units_per_em() {
            Some(units_per_em) => PxScale::from(size * self.font.height_unscaled() / units_per_em),
            None => PxScale::from(size),
        }
    }

    fn layout(&self, text: &str, size: f32) -> (Vec<OutlinedGlyph>, f32) {
        let scale = self.scale(size);
        let scaled = self.font.as_scaled(scale);
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        let mut glyphs = Vec::new();

        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, 0.0));
            caret += scaled.h_advance(id);
            previous = Some(id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                glyphs.push(outlined);
            }
        }

        (glyphs, caret)
    }

    /// Horizontal advance of `text` in pixels
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        self.layout(text, size).1
    }

    fn rasterize(&self, text: &str, size: f32, pad: u32) -> TextMask {
        let (glyphs, advance) = self.layout(text, size);

        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for glyph in &glyphs {
            let bounds = glyph.px_bounds();
            min_x = min_x.min(bounds.min.x);
            min_y = min_y.min(bounds.min.y);
            max_x = max_x.max(bounds.max.x);
            max_y = max_y.max(bounds.max.y);
        }

        if glyphs.is_empty() {
            return TextMask {
                coverage: GrayImage::new(0, 0),
                left: 0,
                top: 0,
                advance,
            };
        }

        let (min_x, min_y) = (min_x.floor() as i32, min_y.floor() as i32);
        let (max_x, max_y) = (max_x.ceil() as i32, max_y.ceil() as i32);
        let width = (max_x - min_x) as u32 + 2 * pad;
        let height = (max_y - min_y) as u32 + 2 * pad;
        let mut coverage = GrayImage::new(width, height);

        for glyph in &glyphs {
            let bounds = glyph.px_bounds();
            let offset_x = bounds.min.x as i32 - min_x + pad as i32;
            let offset_y = bounds.min.y as i32 - min_y + pad as i32;
            glyph.draw(|x, y, c| {
                let px = offset_x + x as i32;
                let py = offset_y + y as i32;
                if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                    return;
                }
                let value = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
                let pixel = coverage.get_pixel_mut(px as u32, py as u32);
                pixel.0[0] = pixel.0[0].max(value);
            });
        }

        TextMask {
            coverage,
            left: min_x - pad as i32,
            top: min_y - pad as i32,
            advance,
        }
    }
}

/// Draw `text` with its baseline at `anchor`, clipped to the canvas.
///
/// An outline is the glyph coverage mask dilated by the stroke width, painted
/// before the fill.
pub fn draw_text(
    canvas: &mut RgbaImage,
    face: &Typeface,
    text: &str,
    anchor: Anchor,
    style: &TextStyle,
) {
    let pad = style
        .outline
        .map(|o| (o.width / 2.0).ceil() as u32)
        .unwrap_or(0);
    let mask = face.rasterize(text, style.size, pad);
    if mask.coverage.width() == 0 {
        return;
    }

    let shift = match style.align {
        Align::Left => 0.0,
        Align::Center => mask.advance / 2.0,
    };
    let left = (anchor.x - shift).round() as i32 + mask.left;
    let top = anchor.y.round() as i32 + mask.top;

    if let Some(outline) = style.outline {
        let radius = pad.min(u32::from(u8::MAX)) as u8;
        let stroke = dilate(&mask.coverage, Norm::L2, radius);
        paint_mask(canvas, &stroke, left, top, outline.color);
    }

    paint_mask(canvas, &mask.coverage, left, top, style.color);
}

fn paint_mask(canvas: &mut RgbaImage, mask: &GrayImage, left: i32, top: i32, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();

    for (mx, my, coverage) in mask.enumerate_pixels() {
        let coverage = coverage.0[0];
        if coverage == 0 {
            continue;
        }
        let x = left + mx as i32;
        let y = top + my as i32;
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            continue;
        }

        let mut source = color;
        source.0[3] = (u16::from(color.0[3]) * u16::from(coverage) / 255) as u8;
        canvas.get_pixel_mut(x as u32, y as u32).blend(&source);
    }
}

/// Uppercase the first character, leaving the rest untouched
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
