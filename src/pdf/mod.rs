pub mod font;
mod writer;

pub use writer::{PdfDocument, PdfFont};

use crate::error::LayoutResult;
use font::{FontMetrics, FontSource, FontVariant};

pub const PDF_MIME: &str = "application/pdf";

/// US Letter in points.
pub const LETTER: PageGeometry = PageGeometry {
    width: 612.0,
    height: 792.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn covering(geometry: PageGeometry) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: geometry.width,
            h: geometry.height,
        }
    }
}

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Parses `#rgb` or `#rrggbb`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| f32::from(v) / 255.0);
        match hex.len() {
            3 => {
                let mut parts = hex.chars().map(|ch| channel(&format!("{ch}{ch}")));
                Some(Self {
                    r: parts.next()??,
                    g: parts.next()??,
                    b: parts.next()??,
                })
            }
            6 if hex.is_ascii() => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            _ => None,
        }
    }
}

/// A font embedded into a document, usable for measuring and drawing.
pub trait FontHandle {
    fn metrics(&self) -> &FontMetrics;

    fn width_of_text(&self, text: &str, size: f32) -> LayoutResult<f32> {
        self.metrics().width_of_text(text, size)
    }
}

/// The document operations the layout engine needs. Coordinates are PDF
/// points with the origin at the bottom-left corner of the page.
pub trait Document {
    type Font: FontHandle;

    fn pages(&self) -> Vec<PageGeometry>;

    /// Appends a page and returns its index.
    fn add_page(&mut self, geometry: PageGeometry) -> LayoutResult<usize>;

    fn embed_font(&mut self, variant: FontVariant, source: &FontSource)
    -> LayoutResult<Self::Font>;

    fn draw_rectangle(&mut self, page: usize, rect: Rect, color: Rgb) -> LayoutResult<()>;

    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        page: usize,
        x: f32,
        y: f32,
        text: &str,
        font: &Self::Font,
        size: f32,
        color: Rgb,
    ) -> LayoutResult<()>;

    fn save(self) -> LayoutResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Rgb::from_hex("#ffffff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("#000"), Some(Rgb::BLACK));
        let red = Rgb::from_hex(" #c40000 ").unwrap();
        assert!((red.r - 196.0 / 255.0).abs() < 1e-6);
        assert_eq!(red.g, 0.0);
        assert_eq!(Rgb::from_hex("ffffff"), None);
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#gg0000"), None);
    }
}
