//! Decoder module provides the interface and built-in implementations for binary formats.
//!
//! DOCX and EPUB sources are ZIP containers that have to be unpacked before their
//! text can be normalized. The [`DocumentDecoder`] trait is the seam for that work; the
//! crate ships [`ArchiveDecoder`], which handles both formats with the `zip` crate.
//! Importers configured without a decoder fail fast on these formats.

use std::io::{Cursor, Read, Seek};

use async_trait::async_trait;
use tokio::task::spawn_blocking;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Error, Result};
use crate::types::FileFormat;

pub mod docx;
pub mod epub;

/// Common interface for all binary-format decoders.
///
/// Implementations turn the raw bytes of a document into UTF-8 prose. The returned text
/// may still contain markup; the normalizer strips tags and collapses whitespace afterwards.
#[async_trait]
pub trait DocumentDecoder: Send + Sync {
    /// Decodes a document.
    ///
    /// # Parameters
    /// * `format` - Declared format of the document
    /// * `bytes` - Raw document bytes
    ///
    /// # Returns
    /// * `Result<String>` - The extracted text, or an error if the document cannot be read
    async fn decode(&self, format: FileFormat, bytes: &[u8]) -> Result<String>;
}

/// ZIP-based decoder for DOCX and EPUB documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveDecoder;

#[async_trait]
impl DocumentDecoder for ArchiveDecoder {
    async fn decode(&self, format: FileFormat, bytes: &[u8]) -> Result<String> {
        let bytes = bytes.to_vec();
        // Unzipping and regex work are blocking, so move them off the async workers
        spawn_blocking(move || match format {
            FileFormat::Docx => docx::extract_docx_text(&bytes),
            FileFormat::Epub => epub::extract_epub_text(&bytes),
            other => Err(Error::Format(format!(
                "'{}' is not a document archive format",
                other
            ))),
        })
        .await?
    }
}

/// Opens an in-memory ZIP archive.
pub(crate) fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Parse(format!("Not a valid ZIP container: {}", e)))
}

/// Reads an archive entry as (lossy) UTF-8 text.
pub(crate) fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => Error::NotFound(format!("Archive entry '{}'", name)),
        other => Error::Zip(other),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
