mod assemble;
pub mod cursor;
mod fallback;
pub mod markup;
pub mod wrap;

pub use assemble::{LayoutReport, Placement, assemble, layout};
pub use fallback::fallback;

use crate::pdf::font::FontSource;
use crate::pdf::{LETTER, PageGeometry, Rgb};

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub font_size: f32,
    pub line_height: f32,
    pub margin: f32,
    /// Geometry of the first page when the source has none.
    pub default_page: PageGeometry,
    pub text_color: Rgb,
    /// Fill colour of the erase pass.
    pub background: Rgb,
    pub regular_font: FontSource,
    pub emphasized_font: FontSource,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            line_height: 16.0,
            margin: 50.0,
            default_page: LETTER,
            text_color: Rgb::BLACK,
            background: Rgb::WHITE,
            regular_font: FontSource::Standard,
            emphasized_font: FontSource::Standard,
        }
    }
}
