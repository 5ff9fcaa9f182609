use lopdf::content::{Content, Operation};
use lopdf::xref::XrefType;
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

use super::font::{FontMetrics, FontSource, FontVariant, is_supported};
use super::{Document, FontHandle, LETTER, PageGeometry, Rect, Rgb};
use crate::error::{LayoutError, LayoutResult};

/// Page-tree lookups follow at most this many `Parent` links.
const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct PdfFont {
    resource: String,
    metrics: FontMetrics,
}

impl PdfFont {
    pub fn resource_name(&self) -> &str {
        &self.resource
    }
}

impl FontHandle for PdfFont {
    fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }
}

struct PdfPage {
    id: ObjectId,
    geometry: PageGeometry,
    origin: (f32, f32),
    ops: Vec<Operation>,
}

/// A PDF held in memory. Drawing is buffered per page and written out as an
/// extra content stream on `save`, so loaded pages keep their original
/// streams underneath the overlay.
pub struct PdfDocument {
    doc: lopdf::Document,
    pages_root: ObjectId,
    pages: Vec<PdfPage>,
    fonts: Vec<(String, ObjectId)>,
}

impl PdfDocument {
    /// A new document with a single page of the given size.
    pub fn create(geometry: PageGeometry) -> LayoutResult<Self> {
        let mut doc = lopdf::Document::with_version("1.5");
        doc.reference_table.cross_reference_type = XrefType::CrossReferenceTable;
        let pages_root = doc.new_object_id();
        doc.set_object(
            pages_root,
            dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            },
        );
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_root,
        });
        doc.trailer.set("Root", catalog);

        let mut document = Self {
            doc,
            pages_root,
            pages: Vec::new(),
            fonts: Vec::new(),
        };
        document.add_page(geometry)?;
        Ok(document)
    }

    /// Parses `bytes` as a PDF and exposes its pages for reuse. A document
    /// without any page gets a blank Letter page.
    pub fn load(bytes: &[u8]) -> LayoutResult<Self> {
        let doc = lopdf::Document::load_mem(bytes).map_err(LayoutError::Load)?;
        let pages_root = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .and_then(|root| doc.get_dictionary(root))
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(LayoutError::Load)?;

        let pages = doc
            .get_pages()
            .into_values()
            .map(|id| {
                let (geometry, origin) = media_box(&doc, id);
                PdfPage {
                    id,
                    geometry,
                    origin,
                    ops: Vec::new(),
                }
            })
            .collect::<Vec<_>>();
        debug!("loaded pdf with {} page(s)", pages.len());

        let mut document = Self {
            doc,
            pages_root,
            pages,
            fonts: Vec::new(),
        };
        if document.pages.is_empty() {
            document.add_page(LETTER)?;
        }
        Ok(document)
    }

    fn page_mut(&mut self, page: usize) -> LayoutResult<&mut PdfPage> {
        self.pages
            .get_mut(page)
            .ok_or(LayoutError::MissingPage(page))
    }

    fn add_font_object(&mut self, metrics: &FontMetrics) -> ObjectId {
        let base_font = Object::Name(metrics.base_font().as_bytes().to_vec());
        let Some(program) = metrics.program() else {
            return self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base_font,
                "Encoding" => "WinAnsiEncoding",
            });
        };

        let file = self.doc.add_object(Stream::new(
            dictionary! { "Length1" => program.data.len() as i64 },
            program.data.to_vec(),
        ));
        let descriptor = self.doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.clone(),
            "Flags" => 32,
            "FontBBox" => program.bbox.iter().map(|v| Object::Integer(i64::from(*v))).collect::<Vec<_>>(),
            "ItalicAngle" => program.italic_angle,
            "Ascent" => program.ascent,
            "Descent" => program.descent,
            "CapHeight" => program.cap_height,
            "StemV" => 80,
            "FontFile2" => file,
        });
        let widths = metrics
            .widths()
            .iter()
            .map(|w| Object::Integer(i64::from(*w)))
            .collect::<Vec<_>>();
        self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => base_font,
            "FirstChar" => i64::from(super::font::FIRST_CHAR),
            "LastChar" => i64::from(super::font::LAST_CHAR),
            "Widths" => widths,
            "FontDescriptor" => descriptor,
            "Encoding" => "WinAnsiEncoding",
        })
    }

    /// Merges the embedded fonts into the page's (possibly inherited)
    /// resources and stores the result directly on the page.
    fn install_fonts(&mut self, page_id: ObjectId) -> LayoutResult<()> {
        let mut resources = match inherited(&self.doc, page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let mut fonts = match resources.get(b"Font").map(|font| resolve(&self.doc, font)) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        for (name, id) in &self.fonts {
            fonts.set(name.clone(), *id);
        }
        resources.set("Font", fonts);
        self.doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", resources);
        Ok(())
    }

    fn append_content(&mut self, page_id: ObjectId, ops: Vec<Operation>) -> LayoutResult<()> {
        let existing = match self.doc.get_dictionary(page_id)?.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            _ => Vec::new(),
        };

        let mut contents = Vec::with_capacity(existing.len() + 2);
        let mut operations = Vec::with_capacity(ops.len() + 1);
        if !existing.is_empty() {
            let save_state = self
                .doc
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(Object::Reference(save_state));
            contents.extend(existing);
            operations.push(Operation::new("Q", vec![]));
        }
        operations.extend(ops);
        let encoded = Content { operations }.encode()?;
        let overlay = self.doc.add_object(Stream::new(Dictionary::new(), encoded));
        contents.push(Object::Reference(overlay));

        self.doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", contents);
        Ok(())
    }
}

impl Document for PdfDocument {
    type Font = PdfFont;

    fn pages(&self) -> Vec<PageGeometry> {
        self.pages.iter().map(|page| page.geometry).collect()
    }

    fn add_page(&mut self, geometry: PageGeometry) -> LayoutResult<usize> {
        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            geometry.width.into(),
            geometry.height.into(),
        ];
        let id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_root,
            "MediaBox" => media_box,
        });

        let root = self.doc.get_object_mut(self.pages_root)?.as_dict_mut()?;
        let mut kids = match root.get(b"Kids") {
            Ok(Object::Array(kids)) => kids.clone(),
            _ => Vec::new(),
        };
        let count = root.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        kids.push(Object::Reference(id));
        root.set("Kids", kids);
        root.set("Count", count + 1);

        self.pages.push(PdfPage {
            id,
            geometry,
            origin: (0.0, 0.0),
            ops: Vec::new(),
        });
        Ok(self.pages.len() - 1)
    }

    fn embed_font(&mut self, variant: FontVariant, source: &FontSource) -> LayoutResult<PdfFont> {
        let metrics = FontMetrics::load(source, variant)?;
        let id = self.add_font_object(&metrics);
        let resource = format!("OvF{}", self.fonts.len() + 1);
        self.fonts.push((resource.clone(), id));
        debug!("embedded {} font {} as {}", variant, metrics.base_font(), resource);
        Ok(PdfFont { resource, metrics })
    }

    fn draw_rectangle(&mut self, page: usize, rect: Rect, color: Rgb) -> LayoutResult<()> {
        let page = self.page_mut(page)?;
        let (ox, oy) = page.origin;
        page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]),
            Operation::new(
                "re",
                vec![
                    (rect.x + ox).into(),
                    (rect.y + oy).into(),
                    rect.w.into(),
                    rect.h.into(),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: usize,
        x: f32,
        y: f32,
        text: &str,
        font: &PdfFont,
        size: f32,
        color: Rgb,
    ) -> LayoutResult<()> {
        if let Some(ch) = text.chars().find(|ch| !is_supported(*ch)) {
            return Err(LayoutError::Measurement { ch });
        }
        let page = self.page_mut(page)?;
        let (ox, oy) = page.origin;
        page.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource.as_bytes().to_vec()), size.into()],
            ),
            Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]),
            Operation::new("Td", vec![(x + ox).into(), (y + oy).into()]),
            Operation::new(
                "Tj",
                vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn save(mut self) -> LayoutResult<Vec<u8>> {
        let pending = self
            .pages
            .iter_mut()
            .filter(|page| !page.ops.is_empty())
            .map(|page| (page.id, std::mem::take(&mut page.ops)))
            .collect::<Vec<_>>();
        for (page_id, ops) in pending {
            self.install_fonts(page_id)?;
            self.append_content(page_id, ops)?;
        }

        self.doc.compress();
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|err| LayoutError::Save(err.to_string()))?;
        Ok(buffer)
    }
}

/// Looks `key` up on the page, then on its ancestors, resolving a final
/// indirect reference.
fn inherited<'a>(doc: &'a lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a lopdf::Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn number(doc: &lopdf::Document, object: &Object) -> Option<f32> {
    match resolve(doc, object) {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn media_box(doc: &lopdf::Document, page_id: ObjectId) -> (PageGeometry, (f32, f32)) {
    let corners = match inherited(doc, page_id, b"MediaBox") {
        Some(Object::Array(values)) if values.len() == 4 => values
            .iter()
            .map(|value| number(doc, value))
            .collect::<Option<Vec<_>>>(),
        _ => None,
    };
    match corners.as_deref() {
        Some(&[x0, y0, x1, y1]) if (x1 - x0).abs() > 0.0 && (y1 - y0).abs() > 0.0 => (
            PageGeometry {
                width: (x1 - x0).abs(),
                height: (y1 - y0).abs(),
            },
            (x0.min(x1), y0.min(y1)),
        ),
        _ => (LETTER, (0.0, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reload(bytes: &[u8]) -> lopdf::Document {
        lopdf::Document::load_mem(bytes).expect("reload pdf")
    }

    fn page_font_names(doc: &lopdf::Document, page_id: ObjectId) -> Vec<Vec<u8>> {
        let page = doc.get_dictionary(page_id).expect("page");
        let resources = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .expect("inline resources");
        let fonts = resources
            .get(b"Font")
            .and_then(Object::as_dict)
            .expect("font resources");
        fonts
            .iter()
            .filter_map(|(_, font)| font.as_reference().ok())
            .filter_map(|id| doc.get_dictionary(id).ok())
            .filter_map(|font| font.get(b"BaseFont").and_then(Object::as_name).ok())
            .map(|name| name.to_vec())
            .collect()
    }

    #[test]
    fn create_and_grow_page_tree() {
        let mut doc = PdfDocument::create(LETTER).expect("create");
        let a4 = PageGeometry {
            width: 595.0,
            height: 842.0,
        };
        assert_eq!(doc.add_page(a4).expect("add page"), 1);
        assert_eq!(doc.pages(), vec![LETTER, a4]);

        let bytes = doc.save().expect("save");
        let reloaded = PdfDocument::load(&bytes).expect("load");
        assert_eq!(reloaded.pages(), vec![LETTER, a4]);
    }

    #[test]
    fn text_and_fonts_are_written_to_the_page() {
        let mut doc = PdfDocument::create(LETTER).expect("create");
        let regular = doc
            .embed_font(FontVariant::Regular, &FontSource::Standard)
            .expect("embed regular");
        let bold = doc
            .embed_font(FontVariant::Emphasized, &FontSource::Standard)
            .expect("embed bold");
        assert_ne!(regular.resource_name(), bold.resource_name());
        doc.draw_rectangle(0, Rect::covering(LETTER), Rgb::WHITE)
            .expect("erase");
        doc.draw_text(0, 50.0, 700.0, "Hello world", &regular, 12.0, Rgb::BLACK)
            .expect("draw");
        let bytes = doc.save().expect("save");

        let reloaded = reload(&bytes);
        let page_id = *reloaded.get_pages().get(&1).expect("first page");
        let content = reloaded.get_page_content(page_id).expect("content");
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("(Hello world)"));
        assert!(content.contains(regular.resource_name()));

        let names = page_font_names(&reloaded, page_id);
        assert!(names.contains(&b"Helvetica".to_vec()));
        assert!(names.contains(&b"Helvetica-Bold".to_vec()));
    }

    #[test]
    fn drawing_rejects_unsupported_glyphs() {
        let mut doc = PdfDocument::create(LETTER).expect("create");
        let regular = doc
            .embed_font(FontVariant::Regular, &FontSource::Standard)
            .expect("embed");
        let err = doc
            .draw_text(0, 0.0, 0.0, "na\u{ef}ve", &regular, 12.0, Rgb::BLACK)
            .unwrap_err();
        assert!(matches!(err, LayoutError::Measurement { ch: '\u{ef}' }));
    }

    #[test]
    fn drawing_on_a_missing_page_fails() {
        let mut doc = PdfDocument::create(LETTER).expect("create");
        let err = doc
            .draw_rectangle(3, Rect::covering(LETTER), Rgb::WHITE)
            .unwrap_err();
        assert!(matches!(err, LayoutError::MissingPage(3)));
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        let err = PdfDocument::load(b"definitely not a pdf").err().expect("error");
        assert!(matches!(err, LayoutError::Load(_)));
    }

    #[test]
    fn existing_content_is_kept_under_the_overlay() {
        let mut source = PdfDocument::create(LETTER).expect("create");
        let regular = source
            .embed_font(FontVariant::Regular, &FontSource::Standard)
            .expect("embed");
        source
            .draw_text(0, 72.0, 720.0, "Original", &regular, 12.0, Rgb::BLACK)
            .expect("draw");
        let bytes = source.save().expect("save");

        let mut doc = PdfDocument::load(&bytes).expect("load");
        doc.draw_rectangle(0, Rect::covering(LETTER), Rgb::WHITE)
            .expect("erase");
        let bytes = doc.save().expect("save");

        let reloaded = reload(&bytes);
        let page_id = *reloaded.get_pages().get(&1).expect("first page");
        let page = reloaded.get_dictionary(page_id).expect("page");
        let contents = page
            .get(b"Contents")
            .and_then(Object::as_array)
            .expect("contents array");
        assert_eq!(contents.len(), 3);
        let content = String::from_utf8_lossy(&reloaded.get_page_content(page_id).expect("content"))
            .into_owned();
        let original = content.find("Original").expect("original text");
        let erase = content.find(" re").expect("erase rectangle");
        assert!(original < erase);
    }
}
