use thiserror::Error;

use crate::pdf::font::FontVariant;

pub type LayoutResult<T> = Result<T, LayoutError>;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to load source document: {0}")]
    Load(#[source] lopdf::Error),

    #[error("failed to embed {variant} font: {reason}")]
    FontEmbed { variant: FontVariant, reason: String },

    #[error("unsupported glyph {ch:?}")]
    Measurement { ch: char },

    #[error("page {0} does not exist")]
    MissingPage(usize),

    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to serialize document: {0}")]
    Save(String),

    #[error("fallback rendering failed: {0}")]
    Fallback(#[source] Box<LayoutError>),
}

impl LayoutError {
    pub(crate) fn font_embed(variant: FontVariant, reason: impl Into<String>) -> Self {
        Self::FontEmbed {
            variant,
            reason: reason.into(),
        }
    }
}
