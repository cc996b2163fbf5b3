//! Word, character and reading-time statistics for chapters and whole imports.

use std::time::Instant;

use chrono::Utc;

use crate::types::ImportMetadata;

/// Average reading speed used for reading-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

/// Per-chapter statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChapterMetadata {
    pub word_count: usize,
    pub character_count: usize,
    pub estimated_reading_time: usize,
}

/// Number of whitespace-delimited tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Length in UTF-16 code units, matching what UI layers report as "characters".
pub fn count_characters(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Minutes needed to read `word_count` words; 0 only for empty text.
pub fn reading_time_minutes(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

pub fn compute_chapter_metadata(content: &str) -> ChapterMetadata {
    let word_count = count_words(content);
    ChapterMetadata {
        word_count,
        character_count: count_characters(content),
        estimated_reading_time: reading_time_minutes(word_count),
    }
}

/// Builds the metadata record for one imported file.
///
/// # Arguments
///
/// * `file_name` - Name of the source file
/// * `total_size` - Size of the raw source in bytes
/// * `normalized_text` - Text after normalization; totals are taken from here, not the raw bytes
/// * `encoding` - Encoding label the source was decoded with
/// * `started` - When the orchestrator began work on this file
pub fn compute_import_metadata(
    file_name: &str,
    total_size: u64,
    normalized_text: &str,
    encoding: &str,
    started: Instant,
) -> ImportMetadata {
    ImportMetadata {
        total_size,
        total_characters: count_characters(normalized_text),
        total_words: count_words(normalized_text),
        encoding: encoding.to_string(),
        file_name: file_name.to_string(),
        import_date: Utc::now().timestamp_millis(),
        processing_time: started.elapsed().as_millis() as u64,
    }
}
