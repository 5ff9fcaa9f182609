use tracing::{info, warn};

use super::LayoutOptions;
use super::cursor::{Baseline, PageCursor};
use super::fallback::fallback;
use super::markup::{paragraphs, parse_line};
use super::wrap::{FontPair, LineBreaker, Run};
use crate::error::{LayoutError, LayoutResult};
use crate::pdf::font::FontVariant;
use crate::pdf::{Document, FontHandle, PDF_MIME, PdfDocument, Rect};

/// A run as drawn, with the page it landed on.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub page: usize,
    pub run: Run,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    pub placements: Vec<Placement>,
    pub page_count: usize,
}

/// Lays `text` out over `source` and returns the finished PDF.
///
/// A source is reused only when `mime` says it is a PDF; anything else gets
/// a fresh page. If the primary layout fails at any step the text is
/// rendered by [`fallback`] instead, and only a failure there is returned.
pub fn layout(
    source: Option<&[u8]>,
    text: &str,
    mime: &str,
    options: &LayoutOptions,
) -> LayoutResult<Vec<u8>> {
    match render(source, text, mime, options) {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            warn!("layout failed, using fallback rendering: {}", err);
            fallback(text, options).map_err(|err| LayoutError::Fallback(Box::new(err)))
        }
    }
}

fn render(
    source: Option<&[u8]>,
    text: &str,
    mime: &str,
    options: &LayoutOptions,
) -> LayoutResult<Vec<u8>> {
    let mut doc = match source {
        Some(bytes) if is_pdf(mime) => {
            info!("layout: reusing pages of source pdf ({} bytes)", bytes.len());
            PdfDocument::load(bytes)?
        }
        _ => {
            info!("layout: new document (source mime={})", mime);
            PdfDocument::create(options.default_page)?
        }
    };
    let report = assemble(&mut doc, text, options)?;
    info!(
        "layout: {} run(s) on {} page(s)",
        report.placements.len(),
        report.page_count
    );
    doc.save()
}

fn is_pdf(mime: &str) -> bool {
    mime.split(';')
        .next()
        .map(|value| value.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false)
}

/// Erases every page of `doc`, then draws `text` line by line, adding pages
/// as the cursor runs past the last one.
pub fn assemble<D: Document>(
    doc: &mut D,
    text: &str,
    options: &LayoutOptions,
) -> LayoutResult<LayoutReport> {
    let regular = doc.embed_font(FontVariant::Regular, &options.regular_font)?;
    let emphasized = doc.embed_font(FontVariant::Emphasized, &options.emphasized_font)?;

    let pages = doc.pages();
    for (index, geometry) in pages.iter().enumerate() {
        doc.draw_rectangle(index, Rect::covering(*geometry), options.background)?;
    }
    let first = pages.first().copied().unwrap_or(options.default_page);
    let max_width = (first.width - options.margin * 2.0).max(0.0);
    let mut cursor = PageCursor::new(pages, options.default_page, options.margin);

    let fonts = FontPair {
        regular: regular.metrics(),
        emphasized: emphasized.metrics(),
    };
    let breaker = LineBreaker::new(fonts, options.font_size, max_width);
    let mut placements = Vec::new();

    for line in paragraphs(text) {
        let lines = breaker.break_segments(&parse_line(line))?;
        if lines.is_empty() {
            let baseline = cursor.request_line(options.line_height);
            open_page(doc, &baseline, options)?;
            continue;
        }
        for visual in lines {
            let baseline = cursor.request_line(options.line_height);
            open_page(doc, &baseline, options)?;
            for run in visual.runs {
                let font = if run.emphasized { &emphasized } else { &regular };
                let run = Run {
                    x: options.margin + run.x,
                    y: baseline.y,
                    ..run
                };
                doc.draw_text(
                    baseline.page,
                    run.x,
                    run.y,
                    &run.text,
                    font,
                    options.font_size,
                    options.text_color,
                )?;
                placements.push(Placement {
                    page: baseline.page,
                    run,
                });
            }
        }
    }

    Ok(LayoutReport {
        placements,
        page_count: doc.pages().len(),
    })
}

fn open_page<D: Document>(
    doc: &mut D,
    baseline: &Baseline,
    options: &LayoutOptions,
) -> LayoutResult<()> {
    let Some(geometry) = baseline.new_page else {
        return Ok(());
    };
    let index = doc.add_page(geometry)?;
    if index != baseline.page {
        return Err(LayoutError::MissingPage(baseline.page));
    }
    doc.draw_rectangle(index, Rect::covering(geometry), options.background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{LETTER, PageGeometry, Rgb};
    use crate::test_util::RecordingDocument;

    fn runs_on(report: &LayoutReport, page: usize) -> Vec<&Run> {
        report
            .placements
            .iter()
            .filter(|placement| placement.page == page)
            .map(|placement| &placement.run)
            .collect()
    }

    #[test]
    fn hello_world_is_two_runs_on_one_baseline() {
        let mut doc = RecordingDocument::new(vec![LETTER]);
        let report = assemble(&mut doc, "Hello **World**", &LayoutOptions::default()).unwrap();
        let runs = runs_on(&report, 0);
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].text.as_str(), runs[0].emphasized), ("Hello ", false));
        assert_eq!((runs[1].text.as_str(), runs[1].emphasized), ("World", true));
        assert_eq!(runs[0].y, runs[1].y);
        assert_eq!(runs[0].x, 50.0);
        // "Hello " in Helvetica is 2556/1000 em.
        assert!((runs[1].x - (50.0 + 2.556 * 12.0)).abs() < 1e-3);
        assert_eq!(doc.texts.len(), 2);
        assert_eq!(doc.texts[1].variant, FontVariant::Emphasized);
    }

    #[test]
    fn hundred_lines_take_three_letter_pages() {
        let text = (1..=100)
            .map(|n| format!("line {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let mut doc = RecordingDocument::new(vec![LETTER]);
        let report = assemble(&mut doc, &text, &LayoutOptions::default()).unwrap();
        assert_eq!(report.page_count, 3);
        assert_eq!(runs_on(&report, 0).len(), 43);
        assert_eq!(runs_on(&report, 1).len(), 43);
        assert_eq!(runs_on(&report, 2).len(), 14);
        assert_eq!(doc.pages, vec![LETTER; 3]);
        // Every page, including the two added ones, is painted once.
        let erased: Vec<usize> = doc.rects.iter().map(|(page, _, _)| *page).collect();
        assert_eq!(erased, vec![0, 1, 2]);
    }

    #[test]
    fn page_count_grows_with_text() {
        let options = LayoutOptions::default();
        let mut previous = 0;
        for lines in [1, 10, 43, 44, 86, 87, 200, 400] {
            let text = vec!["some words here"; lines].join("\n");
            let mut doc = RecordingDocument::new(vec![LETTER]);
            let report = assemble(&mut doc, &text, &options).unwrap();
            assert!(report.page_count >= previous, "{lines} lines");
            previous = report.page_count;
        }
        assert_eq!(previous, 10);
    }

    #[test]
    fn blank_lines_consume_space() {
        let mut doc = RecordingDocument::new(vec![LETTER]);
        let report = assemble(&mut doc, "first\n\n   \nlast", &LayoutOptions::default()).unwrap();
        let runs = runs_on(&report, 0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].y - runs[1].y, 16.0 * 3.0);
    }

    #[test]
    fn trailing_newline_does_not_open_a_page() {
        let text = format!("{}\n", vec!["line"; 43].join("\n"));
        let mut doc = RecordingDocument::new(vec![LETTER]);
        let report = assemble(&mut doc, &text, &LayoutOptions::default()).unwrap();
        assert_eq!(report.page_count, 1);
        assert_eq!(runs_on(&report, 0).len(), 43);

        let mut doc = RecordingDocument::new(vec![LETTER]);
        let report = assemble(&mut doc, &format!("{text}\n"), &LayoutOptions::default()).unwrap();
        assert_eq!(report.page_count, 2);
    }

    #[test]
    fn empty_text_only_erases() {
        let small = PageGeometry {
            width: 400.0,
            height: 300.0,
        };
        let mut doc = RecordingDocument::new(vec![LETTER, small, LETTER]);
        let options = LayoutOptions {
            background: Rgb {
                r: 0.9,
                g: 0.9,
                b: 0.8,
            },
            ..LayoutOptions::default()
        };
        let report = assemble(&mut doc, "", &options).unwrap();
        assert!(report.placements.is_empty());
        assert_eq!(report.page_count, 3);
        assert_eq!(doc.rects.len(), 3);
        assert_eq!(doc.rects[1], (1, Rect::covering(small), options.background));
    }

    #[test]
    fn wraps_to_the_first_page_width() {
        let narrow = PageGeometry {
            width: 200.0,
            height: 792.0,
        };
        let mut doc = RecordingDocument::new(vec![narrow]);
        let text = "one two three four five six seven eight nine ten";
        let report = assemble(&mut doc, text, &LayoutOptions::default()).unwrap();
        let baselines: std::collections::BTreeSet<i64> = report
            .placements
            .iter()
            .map(|placement| placement.run.y as i64)
            .collect();
        assert!(baselines.len() > 1);
        let regular = crate::pdf::font::FontMetrics::standard(FontVariant::Regular);
        for placement in &report.placements {
            let right = placement.run.x
                + regular.width_of_text(&placement.run.text, 12.0).unwrap();
            assert!(right <= 150.0 + 1e-3);
        }
    }

    #[test]
    fn font_embed_failure_aborts() {
        let mut doc = RecordingDocument::new(vec![LETTER]);
        doc.fail_embed = Some(FontVariant::Emphasized);
        let err = assemble(&mut doc, "text", &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, LayoutError::FontEmbed { .. }));
        assert!(doc.texts.is_empty());
    }

    #[test]
    fn pdf_mime_detection() {
        assert!(is_pdf("application/pdf"));
        assert!(is_pdf(" Application/PDF ; charset=binary"));
        assert!(!is_pdf("image/png"));
        assert!(!is_pdf(""));
    }
}
