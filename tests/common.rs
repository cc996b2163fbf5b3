//! Common test utilities and constants for the chapterwise crate.
//!
//! Provides functions for setting up test directories, generating random prose,
//! building in-memory DOCX/EPUB fixtures and shared test constants.

use chapterwise::error::Result;
use rand::{Rng, distributions::Alphanumeric};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

#[allow(dead_code)]
const WORDS: &[&str] = &[
    "river", "lantern", "quiet", "morning", "stone", "letter", "harbor", "window", "garden",
    "silver", "road", "winter", "candle", "forest", "memory", "voice", "bridge", "shadow",
];

/// Paths of a per-test scratch directory.
#[allow(dead_code)]
pub struct TestDirs {
    pub base_dir: PathBuf,
    pub source_dir: PathBuf,
}

/// Helper function to create a clean test directory with a source subdirectory.
/// The directory name gets a random suffix so tests can run in parallel.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let unique_sub_path = format!("{}-{}", sub_path, rand_string);
    let base_dir = PathBuf::from(TEST_TMP_DIR).join(unique_sub_path);
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir).await.unwrap();
    }
    let source_dir = base_dir.join("source");
    fs::create_dir_all(&source_dir).await.unwrap();

    TestDirs {
        base_dir,
        source_dir,
    }
}

/// Removes a test directory created by [`setup_test_dirs`].
#[allow(dead_code)]
pub async fn cleanup_test_dirs(dirs: &TestDirs) {
    let _ = fs::remove_dir_all(&dirs.base_dir).await;
}

/// Writes a file, creating parent directories as needed.
#[allow(dead_code)]
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    Ok(())
}

/// Generates `count` random words separated by single spaces, with a line break every
/// twelve words.
#[allow(dead_code)]
pub fn random_words(count: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut text = String::new();
    for i in 0..count {
        if i > 0 {
            text.push(if i % 12 == 0 { '\n' } else { ' ' });
        }
        text.push_str(WORDS[rng.gen_range(0..WORDS.len())]);
    }
    text
}

/// Packs `(name, contents)` pairs into an in-memory ZIP archive.
#[allow(dead_code)]
pub fn zip_entries(entries: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(contents.as_bytes())?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Builds a minimal DOCX document with one `w:p` per paragraph.
#[allow(dead_code)]
pub fn build_docx(paragraphs: &[&str]) -> Result<Vec<u8>> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}</w:body></w:document>",
        body
    );
    zip_entries(&[
        ("[Content_Types].xml", "<?xml version=\"1.0\"?><Types/>"),
        ("word/document.xml", document.as_str()),
    ])
}

/// Builds a minimal EPUB whose spine lists `chapters` in order.
///
/// Each chapter is `(title, body)`; the title becomes an `<h1>` and the body a `<p>`.
/// Content documents are stored in reverse name order so that only the spine gives the
/// right reading order.
#[allow(dead_code)]
pub fn build_epub(chapters: &[(&str, &str)]) -> Result<Vec<u8>> {
    let container = "<?xml version=\"1.0\"?>\
        <container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\
        <rootfiles><rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/></rootfiles>\
        </container>";

    let count = chapters.len();
    let file_name = |i: usize| format!("text/part{:02}.xhtml", count - i);

    let manifest: String = (0..count)
        .map(|i| {
            format!(
                "<item id=\"c{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>",
                i,
                file_name(i)
            )
        })
        .collect();
    let spine: String = (0..count)
        .map(|i| format!("<itemref idref=\"c{}\"/>", i))
        .collect();
    let opf = format!(
        "<?xml version=\"1.0\"?><package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\">\
         <manifest><item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>{}</manifest>\
         <spine>{}</spine></package>",
        manifest, spine
    );

    let documents: Vec<(String, String)> = chapters
        .iter()
        .enumerate()
        .map(|(i, (title, body))| {
            (
                format!("OEBPS/{}", file_name(i)),
                format!(
                    "<?xml version=\"1.0\"?><!DOCTYPE html><html xmlns=\"http://www.w3.org/1999/xhtml\">\
                     <head><title>{}</title></head><body><h1>{}</h1><p>{}</p></body></html>",
                    title, title, body
                ),
            )
        })
        .collect();

    let mut entries: Vec<(&str, &str)> = vec![
        ("mimetype", "application/epub+zip"),
        ("META-INF/container.xml", container),
        ("OEBPS/content.opf", opf.as_str()),
    ];
    entries.extend(documents.iter().map(|(n, c)| (n.as_str(), c.as_str())));
    zip_entries(&entries)
}
