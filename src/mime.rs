use anyhow::{Result, anyhow};
use std::path::Path;

use crate::pdf::PDF_MIME;

pub const TEXT_MIME: &str = "text/plain";
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// Turns a `--mime` value into a mime type. `auto` sniffs the bytes, then
/// looks at the file extension; sources that match neither are opaque.
pub fn resolve_mime(input: &str, bytes: &[u8], path: Option<&Path>) -> Result<String> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(anyhow!("mime is empty"));
    }
    let lower = raw.to_lowercase();

    match lower.as_str() {
        "auto" => return Ok(detect_mime(bytes, path).to_string()),
        "pdf" => return Ok(PDF_MIME.to_string()),
        "txt" | "text" => return Ok(TEXT_MIME.to_string()),
        "png" => return Ok("image/png".to_string()),
        "jpg" | "jpeg" => return Ok("image/jpeg".to_string()),
        "gif" => return Ok("image/gif".to_string()),
        "webp" => return Ok("image/webp".to_string()),
        "bmp" => return Ok("image/bmp".to_string()),
        "tiff" | "tif" => return Ok("image/tiff".to_string()),
        _ => {}
    }

    if lower.contains('/') && !lower.starts_with('/') && !lower.ends_with('/') {
        return Ok(lower);
    }
    Err(anyhow!(
        "unsupported mime '{}' (expected auto, pdf, txt, png, jpg, gif, webp, bmp, tiff or type/subtype)",
        raw
    ))
}

fn detect_mime(bytes: &[u8], path: Option<&Path>) -> &'static str {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type();
    }
    extension_lower(path)
        .and_then(|ext| mime_from_extension(&ext))
        .unwrap_or(OCTET_STREAM_MIME)
}

fn extension_lower(path: Option<&Path>) -> Option<String> {
    path.and_then(|path| path.extension())
        .and_then(|value| value.to_str())
        .map(|value| value.to_lowercase())
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "pdf" => Some(PDF_MIME),
        "txt" | "md" => Some(TEXT_MIME),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        _ => None,
    }
}
