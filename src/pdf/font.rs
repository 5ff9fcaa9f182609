use std::fmt;
use std::sync::Arc;

use ttf_parser::Face;
use ttf_parser::name_id;

use crate::error::{LayoutError, LayoutResult};

pub const FIRST_CHAR: u8 = 0x20;
pub const LAST_CHAR: u8 = 0x7E;
const GLYPH_COUNT: usize = (LAST_CHAR - FIRST_CHAR + 1) as usize;

/// Advance widths of Helvetica for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; GLYPH_COUNT] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Advance widths of Helvetica-Bold for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; GLYPH_COUNT] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontVariant {
    Regular,
    Emphasized,
}

impl fmt::Display for FontVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => f.write_str("regular"),
            Self::Emphasized => f.write_str("emphasized"),
        }
    }
}

/// Where the glyphs of one font variant come from.
#[derive(Clone, Default)]
pub enum FontSource {
    /// Helvetica / Helvetica-Bold from the PDF base-14 set.
    #[default]
    Standard,
    /// Raw TrueType/OpenType data, embedded into the output.
    TrueType(Arc<Vec<u8>>),
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("Standard"),
            Self::TrueType(data) => write!(f, "TrueType({} bytes)", data.len()),
        }
    }
}

/// Descriptor values needed to embed a TrueType program.
#[derive(Debug, Clone)]
pub(crate) struct TrueTypeProgram {
    pub(crate) data: Arc<Vec<u8>>,
    pub(crate) ascent: i32,
    pub(crate) descent: i32,
    pub(crate) cap_height: i32,
    pub(crate) italic_angle: i32,
    pub(crate) bbox: [i32; 4],
}

/// Glyph widths for the printable ASCII range of one font.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    variant: FontVariant,
    base_font: String,
    widths: [u16; GLYPH_COUNT],
    program: Option<TrueTypeProgram>,
}

impl FontMetrics {
    pub fn standard(variant: FontVariant) -> Self {
        let (base_font, widths) = match variant {
            FontVariant::Regular => ("Helvetica", HELVETICA_WIDTHS),
            FontVariant::Emphasized => ("Helvetica-Bold", HELVETICA_BOLD_WIDTHS),
        };
        Self {
            variant,
            base_font: base_font.to_string(),
            widths,
            program: None,
        }
    }

    pub fn load(source: &FontSource, variant: FontVariant) -> LayoutResult<Self> {
        match source {
            FontSource::Standard => Ok(Self::standard(variant)),
            FontSource::TrueType(data) => Self::from_truetype(data.clone(), variant),
        }
    }

    fn from_truetype(data: Arc<Vec<u8>>, variant: FontVariant) -> LayoutResult<Self> {
        let face = Face::parse(&data, 0)
            .map_err(|err| LayoutError::font_embed(variant, format!("invalid font data: {err}")))?;
        let units = f32::from(face.units_per_em().max(1));
        let scale = |value: f32| (value * 1000.0 / units).round();
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(face.units_per_em() / 2);

        let mut widths = [0u16; GLYPH_COUNT];
        for (slot, code) in widths.iter_mut().zip(FIRST_CHAR..=LAST_CHAR) {
            let advance = face
                .glyph_index(char::from(code))
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(space_advance);
            *slot = scale(f32::from(advance)) as u16;
        }

        let bbox = face.global_bounding_box();
        let program = TrueTypeProgram {
            ascent: scale(f32::from(face.ascender())) as i32,
            descent: scale(f32::from(face.descender())) as i32,
            cap_height: scale(f32::from(face.capital_height().unwrap_or(face.ascender()))) as i32,
            italic_angle: if face.is_italic() { -12 } else { 0 },
            bbox: [
                scale(f32::from(bbox.x_min)) as i32,
                scale(f32::from(bbox.y_min)) as i32,
                scale(f32::from(bbox.x_max)) as i32,
                scale(f32::from(bbox.y_max)) as i32,
            ],
            data: data.clone(),
        };
        let base_font = extract_family_name(&face)
            .map(|name| postscript_name(&name, variant))
            .unwrap_or_else(|| format!("EmbeddedFont-{variant}"));

        Ok(Self {
            variant,
            base_font,
            widths,
            program: Some(program),
        })
    }

    pub fn variant(&self) -> FontVariant {
        self.variant
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    pub fn widths(&self) -> &[u16] {
        &self.widths
    }

    pub(crate) fn program(&self) -> Option<&TrueTypeProgram> {
        self.program.as_ref()
    }

    /// Width of `text` at `size` points. Fails on the first glyph outside
    /// the printable ASCII range.
    pub fn width_of_text(&self, text: &str, size: f32) -> LayoutResult<f32> {
        Ok(units_to_points(self.units_of_text(text)?, size))
    }

    /// Width of `text` in 1/1000 em.
    pub fn units_of_text(&self, text: &str) -> LayoutResult<u32> {
        text.chars()
            .try_fold(0u32, |units, ch| Ok(units + u32::from(self.glyph_width(ch)?)))
    }

    fn glyph_width(&self, ch: char) -> LayoutResult<u16> {
        if !is_supported(ch) {
            return Err(LayoutError::Measurement { ch });
        }
        Ok(self.widths[(ch as u32 - u32::from(FIRST_CHAR)) as usize])
    }
}

pub fn units_to_points(units: u32, size: f32) -> f32 {
    units as f32 * size / 1000.0
}

pub fn is_supported(ch: char) -> bool {
    (char::from(FIRST_CHAR)..=char::from(LAST_CHAR)).contains(&ch)
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::POST_SCRIPT_NAME {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

fn postscript_name(name: &str, variant: FontVariant) -> String {
    let cleaned: String = name
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect();
    if cleaned.is_empty() {
        format!("EmbeddedFont-{variant}")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_widths_match_afm() {
        let regular = FontMetrics::standard(FontVariant::Regular);
        let bold = FontMetrics::standard(FontVariant::Emphasized);
        assert_eq!(regular.base_font(), "Helvetica");
        assert_eq!(bold.base_font(), "Helvetica-Bold");
        assert_eq!(regular.glyph_width(' ').unwrap(), 278);
        assert_eq!(regular.glyph_width('W').unwrap(), 944);
        assert_eq!(regular.glyph_width('~').unwrap(), 584);
        assert_eq!(bold.glyph_width('b').unwrap(), 611);
        assert_eq!(bold.glyph_width('i').unwrap(), 278);
    }

    #[test]
    fn width_scales_with_size() {
        let regular = FontMetrics::standard(FontVariant::Regular);
        let width = regular.width_of_text("Hello", 12.0).unwrap();
        assert!((width - 27.336).abs() < 1e-3);
        let doubled = regular.width_of_text("Hello", 24.0).unwrap();
        assert!((doubled - width * 2.0).abs() < 1e-3);
        assert_eq!(regular.width_of_text("", 12.0).unwrap(), 0.0);
    }

    #[test]
    fn unsupported_glyph_is_an_error() {
        let regular = FontMetrics::standard(FontVariant::Regular);
        let err = regular.width_of_text("caf\u{e9}", 12.0).unwrap_err();
        assert!(matches!(err, LayoutError::Measurement { ch: '\u{e9}' }));
        assert!(regular.width_of_text("tab\there", 12.0).is_err());
    }

    #[test]
    fn invalid_truetype_data_fails_to_embed() {
        let source = FontSource::TrueType(Arc::new(b"not a font".to_vec()));
        let err = FontMetrics::load(&source, FontVariant::Emphasized).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::FontEmbed {
                variant: FontVariant::Emphasized,
                ..
            }
        ));
    }

    #[test]
    fn truetype_widths_come_from_the_face() {
        let data = include_bytes!("../../tests/fixtures/demo.ttf");
        let source = FontSource::TrueType(Arc::new(data.to_vec()));
        let metrics = FontMetrics::load(&source, FontVariant::Regular).unwrap();

        // The face maps only 'A'; unmapped codes take half an em.
        assert_eq!(metrics.glyph_width('A').unwrap(), 540);
        assert_eq!(metrics.glyph_width(' ').unwrap(), 500);
        assert_eq!(metrics.glyph_width('z').unwrap(), 500);
        assert_eq!(metrics.units_of_text("AA ").unwrap(), 1580);
        assert_eq!(metrics.base_font(), "EmbeddedFont-regular");

        let program = metrics.program().expect("embedded program");
        assert_eq!(program.data.as_slice(), data.as_slice());
        assert_eq!((program.ascent, program.descent), (1024, -400));
        assert_eq!(program.italic_angle, 0);
    }
}
