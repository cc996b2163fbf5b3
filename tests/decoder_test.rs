use chapterwise::decoder::{docx::extract_docx_text, epub::extract_epub_text};
use chapterwise::error::{Error, Result};
use chapterwise::prelude::*;

mod common;
use common::{build_docx, build_epub, zip_entries};

#[test]
fn test_epub_text_follows_spine_order() -> Result<()> {
    let bytes = build_epub(&[
        ("Chapter One", "The first body."),
        ("Chapter Two", "The second body."),
    ])?;

    let text = extract_epub_text(&bytes)?;
    let first = text.find("Chapter One\nThe first body.").expect("first section missing");
    let second = text.find("Chapter Two\nThe second body.").expect("second section missing");
    assert!(first < second, "sections out of order: {:?}", text);
    // <head> content is dropped
    assert_eq!(text.matches("Chapter One").count(), 1);
    Ok(())
}

#[test]
fn test_epub_without_package_reads_entries_by_name() -> Result<()> {
    let bytes = zip_entries(&[
        ("mimetype", "application/epub+zip"),
        ("b.xhtml", "<html><body><p>Second</p></body></html>"),
        ("a.xhtml", "<html><body><p>First</p></body></html>"),
        ("style.css", "p { margin: 0 }"),
    ])?;

    let text = extract_epub_text(&bytes)?;
    assert_eq!(text.trim(), "First\n\n\nSecond");
    assert!(!text.contains("margin"));
    Ok(())
}

#[test]
fn test_epub_without_content_documents_is_a_parse_error() -> Result<()> {
    let bytes = zip_entries(&[("mimetype", "application/epub+zip")])?;
    assert!(matches!(extract_epub_text(&bytes), Err(Error::Parse(_))));
    Ok(())
}

#[test]
fn test_docx_paragraphs_become_lines() -> Result<()> {
    let bytes = build_docx(&["Chapter 1", "Fish &amp; chips"])?;
    let text = extract_docx_text(&bytes)?;
    assert_eq!(text.trim(), "Chapter 1\nFish & chips");
    Ok(())
}

#[test]
fn test_docx_without_document_part_is_a_parse_error() -> Result<()> {
    let bytes = zip_entries(&[("[Content_Types].xml", "<Types/>")])?;
    assert!(matches!(extract_docx_text(&bytes), Err(Error::Parse(_))));
    assert!(matches!(extract_docx_text(b"not a zip"), Err(Error::Parse(_))));
    Ok(())
}

#[tokio::test]
async fn test_archive_decoder_rejects_plain_formats() {
    let result = ArchiveDecoder.decode(FileFormat::Txt, b"plain").await;
    assert!(matches!(result, Err(Error::Format(_))));
}

#[tokio::test]
async fn test_import_epub_splits_on_chapter_headings() -> Result<()> {
    let bytes = build_epub(&[
        ("Chapter One", "The first body."),
        ("Chapter Two", "The second body."),
    ])?;

    let result = ImportConfig::default()
        .import_file(SourceFile::from_bytes("novel.epub", bytes))
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.chapters.len(), 2);
    assert_eq!(result.chapters[0].title, "Chapter One");
    assert_eq!(result.chapters[0].content, "The first body.");
    assert_eq!(result.chapters[1].title, "Chapter Two");
    assert_eq!(result.chapters[1].content, "The second body.");
    Ok(())
}
