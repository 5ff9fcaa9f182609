//! Paginated text layout over PDF pages.
//!
//! [`layout`] takes translated text with `**bold**` markup and the original
//! document, erases the original pages, and reflows the text over them,
//! adding pages as needed.

pub mod error;
pub mod layout;
pub mod logging;
pub mod mime;
pub mod pdf;
pub mod settings;
mod test_util;

pub use error::{LayoutError, LayoutResult};
pub use layout::{LayoutOptions, LayoutReport, Placement, assemble, fallback, layout};
pub use pdf::{Document, PdfDocument};
