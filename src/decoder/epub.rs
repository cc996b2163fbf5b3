//! Text extraction for EPUB publications.
//!
//! Content documents are read in spine order, resolved through
//! `META-INF/container.xml` and the package (OPF) document. Publications without a
//! usable package fall back to every XHTML entry in name order.

use std::collections::HashMap;
use std::io::{Read, Seek};

use lazy_static::lazy_static;
use regex::Regex;
use zip::ZipArchive;

use super::{open_archive, read_entry};
use crate::error::{Error, Result};
use crate::normalizer::strip_markup;

const CONTAINER_PATH: &str = "META-INF/container.xml";

lazy_static! {
    static ref ROOTFILE_PATH: Regex = Regex::new(r#"full-path\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref MANIFEST_ITEM: Regex = Regex::new(r"<(?:opf:)?item\b[^>]*>").unwrap();
    static ref SPINE_ITEMREF: Regex = Regex::new(r"<(?:opf:)?itemref\b[^>]*>").unwrap();
    static ref ATTRIBUTE: Regex = Regex::new(r#"([\w:-]+)\s*=\s*["']([^"']*)["']"#).unwrap();
}

/// Extracts the text of an EPUB publication, one section per content document.
///
/// # Arguments
///
/// * `bytes` - Raw bytes of the `.epub` file
///
/// # Returns
///
/// * `Result<String>` - Sections joined by blank lines, or [`Error::Parse`] if the
///   archive is unreadable or holds no content documents
pub fn extract_epub_text(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;

    let documents = match spine_documents(&mut archive) {
        Ok(documents) if !documents.is_empty() => documents,
        Ok(_) => fallback_documents(&archive),
        Err(e) => {
            log::warn!("EPUB package could not be resolved ({}), reading all XHTML entries", e);
            fallback_documents(&archive)
        }
    };
    if documents.is_empty() {
        return Err(Error::Parse(
            "EPUB contains no XHTML content documents".to_string(),
        ));
    }

    let mut sections = Vec::with_capacity(documents.len());
    for path in documents {
        match read_entry(&mut archive, &path) {
            Ok(markup) => {
                let text = strip_markup(&markup);
                if !text.trim().is_empty() {
                    sections.push(text);
                }
            }
            Err(e) => log::warn!("Skipping EPUB entry '{}': {}", path, e),
        }
    }

    Ok(sections.join("\n\n"))
}

/// Archive paths of the XHTML documents listed in the spine, in reading order.
fn spine_documents<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let container = read_entry(archive, CONTAINER_PATH)?;
    let opf_path = ROOTFILE_PATH
        .captures(&container)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::Parse("container.xml names no rootfile".to_string()))?;
    let opf = read_entry(archive, &opf_path)?;
    let base_dir = opf_path.rsplit_once('/').map_or("", |(dir, _)| dir);

    // id -> (href, media-type)
    let manifest: HashMap<String, (String, String)> = MANIFEST_ITEM
        .find_iter(&opf)
        .filter_map(|tag| {
            let attrs = attributes(tag.as_str());
            let id = attrs.get("id")?.clone();
            let href = attrs.get("href")?.clone();
            let media_type = attrs.get("media-type").cloned().unwrap_or_default();
            Some((id, (href, media_type)))
        })
        .collect();

    let documents = SPINE_ITEMREF
        .find_iter(&opf)
        .filter_map(|tag| attributes(tag.as_str()).get("idref").cloned())
        .filter_map(|idref| manifest.get(&idref))
        .filter(|(href, media_type)| media_type.contains("html") || is_xhtml_name(href))
        .map(|(href, _)| resolve_href(base_dir, href))
        .collect();

    Ok(documents)
}

/// Every XHTML/HTML entry of the archive, sorted by name.
fn fallback_documents<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| is_xhtml_name(name))
        .map(str::to_string)
        .collect();
    names.sort();
    names
}

fn is_xhtml_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xhtml") || lower.ends_with(".html") || lower.ends_with(".htm")
}

fn attributes(tag: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Resolves a manifest href against the package directory, dropping fragments and
/// collapsing `.`/`..` segments.
fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
