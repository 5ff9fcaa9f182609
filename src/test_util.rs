#![cfg(test)]

use crate::error::{LayoutError, LayoutResult};
use crate::pdf::font::{FontMetrics, FontSource, FontVariant};
use crate::pdf::{Document, FontHandle, PageGeometry, Rect, Rgb};

pub(crate) struct RecordedFont(FontMetrics);

impl FontHandle for RecordedFont {
    fn metrics(&self) -> &FontMetrics {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawnText {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub variant: FontVariant,
}

/// In-memory document that records draw calls instead of writing a PDF.
#[derive(Default)]
pub(crate) struct RecordingDocument {
    pub pages: Vec<PageGeometry>,
    pub rects: Vec<(usize, Rect, Rgb)>,
    pub texts: Vec<DrawnText>,
    pub fail_embed: Option<FontVariant>,
}

impl RecordingDocument {
    pub fn new(pages: Vec<PageGeometry>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    fn check_page(&self, page: usize) -> LayoutResult<()> {
        if page < self.pages.len() {
            Ok(())
        } else {
            Err(LayoutError::MissingPage(page))
        }
    }
}

impl Document for RecordingDocument {
    type Font = RecordedFont;

    fn pages(&self) -> Vec<PageGeometry> {
        self.pages.clone()
    }

    fn add_page(&mut self, geometry: PageGeometry) -> LayoutResult<usize> {
        self.pages.push(geometry);
        Ok(self.pages.len() - 1)
    }

    fn embed_font(&mut self, variant: FontVariant, source: &FontSource) -> LayoutResult<RecordedFont> {
        if self.fail_embed == Some(variant) {
            return Err(LayoutError::font_embed(variant, "refused by test document"));
        }
        FontMetrics::load(source, variant).map(RecordedFont)
    }

    fn draw_rectangle(&mut self, page: usize, rect: Rect, color: Rgb) -> LayoutResult<()> {
        self.check_page(page)?;
        self.rects.push((page, rect, color));
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: usize,
        x: f32,
        y: f32,
        text: &str,
        font: &RecordedFont,
        size: f32,
        _color: Rgb,
    ) -> LayoutResult<()> {
        self.check_page(page)?;
        font.width_of_text(text, size)?;
        self.texts.push(DrawnText {
            page,
            x,
            y,
            text: text.to_string(),
            variant: font.metrics().variant(),
        });
        Ok(())
    }

    fn save(self) -> LayoutResult<Vec<u8>> {
        Ok(Vec::new())
    }
}
