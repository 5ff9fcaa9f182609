use tracing::info;

use super::LayoutOptions;
use super::markup::{paragraphs, plain_text};
use crate::error::LayoutResult;
use crate::pdf::font::FontVariant;
use crate::pdf::{Document, LETTER, PdfDocument};

/// Draws the whole text on one new Letter page with the regular font, one
/// input line per baseline from the top margin down. Nothing is wrapped and
/// nothing moves to a second page; lines past the bottom edge are clipped by
/// the page.
pub fn fallback(text: &str, options: &LayoutOptions) -> LayoutResult<Vec<u8>> {
    let mut doc = PdfDocument::create(LETTER)?;
    let font = doc.embed_font(FontVariant::Regular, &options.regular_font)?;

    let mut y = LETTER.height - options.margin;
    let mut drawn = 0;
    for line in paragraphs(text) {
        y -= options.line_height;
        let plain = plain_text(line);
        if plain.trim().is_empty() {
            continue;
        }
        doc.draw_text(
            0,
            options.margin,
            y,
            &plain,
            &font,
            options.font_size,
            options.text_color,
        )?;
        drawn += 1;
    }
    info!("fallback: drew {} line(s) on a single page", drawn);
    doc.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;
    use crate::pdf::font::FontSource;
    use std::sync::Arc;

    #[test]
    fn renders_a_single_page() {
        let text = (0..80).map(|n| format!("row {n}")).collect::<Vec<_>>().join("\n");
        let bytes = fallback(&text, &LayoutOptions::default()).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn broken_font_is_fatal() {
        let options = LayoutOptions {
            regular_font: FontSource::TrueType(Arc::new(vec![0u8; 16])),
            ..LayoutOptions::default()
        };
        let err = fallback("text", &options).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::FontEmbed {
                variant: FontVariant::Regular,
                ..
            }
        ));
    }
}
