//! Text extraction for Word (DOCX) documents.

use lazy_static::lazy_static;
use regex::Regex;

use super::{open_archive, read_entry};
use crate::error::{Error, Result};
use crate::normalizer::strip_markup;

/// Main document part inside the package.
const DOCUMENT_PART: &str = "word/document.xml";

lazy_static! {
    /// Field instructions and tracked deletions are not part of the visible text.
    static ref HIDDEN_RUNS: Regex =
        Regex::new(r"(?s)<w:(instrText|delText)\b[^>]*>.*?</w:(?:instrText|delText)>").unwrap();
}

/// Extracts the visible text of a DOCX package.
///
/// Paragraphs and breaks become line breaks and tabs become tab characters; all other
/// markup is removed and entities are decoded.
///
/// # Arguments
///
/// * `bytes` - Raw bytes of the `.docx` file
///
/// # Returns
///
/// * `Result<String>` - The document text, or [`Error::Parse`] if the package is unreadable
pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    let xml = read_entry(&mut archive, DOCUMENT_PART).map_err(|e| match e {
        Error::NotFound(_) => Error::Parse(format!("DOCX package has no '{}'", DOCUMENT_PART)),
        other => other,
    })?;

    let visible = HIDDEN_RUNS.replace_all(&xml, "");
    Ok(strip_markup(&visible))
}
