//! Core data types, enums, and reports for the chapterwise import engine.
//!
//! This module defines the fundamental data structures used throughout the crate:
//! - Source descriptions (`SourceFile`, `SourceData`, `FileFormat`)
//! - Splitting and AI processing options (`SplitOptions`, `AiProcessingOptions`)
//! - Chapter records and per-file results (`ImportedChapter`, `ImportResult`, `ImportedStory`)
//! - Batch reporting types (`BatchImportResult`, `BatchSummary`)
//! - Content filtering configuration (`ContentFilter`, `FilterFlag`, `ContentAnalysis`)
//! - Progress reporting (`ProcessingProgress`)

use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metadata::compute_chapter_metadata;
use crate::path_utils::{extension_lowercase, get_file_name_lossy, title_from_file_name};

/// Default window size for [`SplitMethod::WordCount`].
pub const DEFAULT_WORDS_PER_CHAPTER: usize = 2000;

/// Input formats understood by the importer.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FileFormat {
    Txt,
    Md,
    Docx,
    Epub,
}

impl FileFormat {
    /// Resolves a format from a file extension (case-insensitive, without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(FileFormat::Txt),
            "md" | "markdown" => Some(FileFormat::Md),
            "docx" => Some(FileFormat::Docx),
            "epub" => Some(FileFormat::Epub),
            _ => None,
        }
    }

    /// Resolves a format from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        extension_lowercase(file_name).and_then(|ext| Self::from_extension(&ext))
    }

    /// Whether the format is a ZIP container that needs a [`DocumentDecoder`](crate::decoder::DocumentDecoder).
    pub fn is_archive(&self) -> bool {
        matches!(self, FileFormat::Docx | FileFormat::Epub)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Txt => "txt",
            FileFormat::Md => "md",
            FileFormat::Docx => "docx",
            FileFormat::Epub => "epub",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| Error::Format(format!("Unknown file format '{}'", s)))
    }
}

/// Raw payload of a source file.
#[derive(Debug, Clone)]
pub enum SourceData {
    Bytes(Vec<u8>),
    /// Already-decoded text; encoding detection is skipped.
    Text(String),
}

/// A file-like input handed to the importer.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    /// Size of the source in bytes.
    pub size: u64,
    /// Format inferred from the name, or set explicitly. `None` means unknown.
    pub format: Option<FileFormat>,
    pub data: SourceData,
}

impl SourceFile {
    /// Creates a source from raw bytes, inferring the format from the file name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            format: FileFormat::from_file_name(&name),
            size: bytes.len() as u64,
            data: SourceData::Bytes(bytes),
            name,
        }
    }

    /// Creates a source from decoded text, inferring the format from the file name.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        let text = text.into();
        Self {
            format: FileFormat::from_file_name(&name),
            size: text.len() as u64,
            data: SourceData::Text(text),
            name,
        }
    }

    /// Reads a source from disk.
    pub async fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(
            get_file_name_lossy(path),
            bytes,
        ))
    }

    /// Overrides the inferred format.
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Strategy used to cut normalized text into chapters.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SplitMethod {
    #[default]
    Pattern, // Boundary regex (explicit or auto-detected from the pattern library)
    WordCount, // Fixed windows of whitespace-delimited tokens
    Manual,    // Whole text as one chapter; real splitting happens in the UI
    Ai,        // Delegated to a TextProcessor, falls back to Pattern
}

/// Options for the chapter splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitOptions {
    pub method: SplitMethod,
    /// Explicit boundary regex. `None` with [`SplitMethod::Pattern`] means auto-detect.
    pub pattern: Option<String>,
    /// Capture group holding the title for an explicit pattern (defaults to the last group).
    pub title_group: Option<usize>,
    /// Capture group where the body starts for an explicit pattern (defaults to none).
    pub content_group: Option<usize>,
    /// Window size for [`SplitMethod::WordCount`] (defaults to 2000).
    pub word_count: Option<usize>,
    pub preserve_titles: bool,
    pub generate_titles: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            method: SplitMethod::Pattern,
            pattern: None,
            title_group: None,
            content_group: None,
            word_count: None,
            preserve_titles: true,
            generate_titles: true,
        }
    }
}

impl SplitOptions {
    /// Pattern splitting with auto-detection from the pattern library.
    pub fn auto_detect() -> Self {
        Self::default()
    }

    /// Pattern splitting with an explicit boundary regex.
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Fixed-size word windows.
    pub fn by_word_count(word_count: usize) -> Self {
        Self {
            method: SplitMethod::WordCount,
            word_count: Some(word_count),
            ..Self::default()
        }
    }

    pub fn with_method(method: SplitMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Effective window size for word-count splitting.
    pub fn words_per_chapter(&self) -> usize {
        self.word_count
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_WORDS_PER_CHAPTER)
    }
}

/// A chapter produced by the splitter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportedChapter {
    pub id: String,
    pub title: String,
    pub content: String,
    /// 0-based order in the source.
    pub original_position: usize,
    pub word_count: usize,
    /// UTF-16 code units.
    pub character_count: usize,
    /// Minutes.
    pub estimated_reading_time: usize,
    /// Boundary text matched in pattern mode.
    pub heading: Option<String>,
    /// Byte range of the normalized text this chapter was cut from.
    pub source_span: Option<Range<usize>>,
}

impl ImportedChapter {
    /// Creates a chapter with a fresh id and computed metadata.
    pub fn new(title: impl Into<String>, content: impl Into<String>, position: usize) -> Self {
        let content = content.into();
        let stats = compute_chapter_metadata(&content);
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content,
            original_position: position,
            word_count: stats.word_count,
            character_count: stats.character_count,
            estimated_reading_time: stats.estimated_reading_time,
            heading: None,
            source_span: None,
        }
    }

    /// Placeholder title used when none could be extracted.
    pub fn placeholder_title(position: usize) -> String {
        format!("Chapter {}", position + 1)
    }

    /// Recomputes counts after `content` was modified (e.g. by the filter pipeline).
    pub fn refresh_metadata(&mut self) {
        let stats = compute_chapter_metadata(&self.content);
        self.word_count = stats.word_count;
        self.character_count = stats.character_count;
        self.estimated_reading_time = stats.estimated_reading_time;
    }
}

/// Error taxonomy reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ImportErrorKind {
    Parse,
    Encoding,
    Format,
    Size,
    Content,
}

/// A failure (fatal or advisory) recorded for one file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportError {
    pub kind: ImportErrorKind,
    pub message: String,
    pub position: Option<usize>,
    pub line: Option<usize>,
    /// Name of the source file, filled in by the orchestrators.
    pub file: Option<String>,
}

impl ImportError {
    pub fn new(kind: ImportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
            line: None,
            file: None,
        }
    }

    pub fn for_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl From<&Error> for ImportError {
    fn from(error: &Error) -> Self {
        ImportError::new(error.kind(), error.to_string())
    }
}

impl From<Error> for ImportError {
    fn from(error: Error) -> Self {
        ImportError::from(&error)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{:?}] {}: {}", self.kind, file, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

/// Per-file metadata, computed once.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportMetadata {
    /// Source size in bytes.
    pub total_size: u64,
    /// UTF-16 code units of the normalized text.
    pub total_characters: usize,
    pub total_words: usize,
    pub encoding: String,
    pub file_name: String,
    /// Epoch milliseconds.
    pub import_date: i64,
    /// Milliseconds.
    pub processing_time: u64,
}

/// Result of importing a single file. Always well-formed, even on failure.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportResult {
    pub success: bool,
    pub chapters: Vec<ImportedChapter>,
    pub errors: Vec<ImportError>,
    pub metadata: ImportMetadata,
    /// Matches recorded by `flag` content filters.
    pub flags: Vec<FilterFlag>,
}

impl ImportResult {
    /// Wraps a successful result into a story, deriving its title.
    /// Returns `None` for failed results.
    pub fn into_story(self, original_file: impl Into<String>) -> Option<ImportedStory> {
        if !self.success {
            return None;
        }
        let original_file = original_file.into();
        let title = derive_story_title(&self.chapters, &original_file);
        Some(ImportedStory {
            id: Uuid::new_v4().to_string(),
            title,
            chapters: self.chapters,
            metadata: self.metadata,
            original_file,
        })
    }
}

/// Minimum and maximum length (in characters) of a line accepted as a story title.
const TITLE_LENGTH_WINDOW: (usize, usize) = (10, 100);
/// How many non-blank lines of the first chapter are scanned for a title.
const TITLE_SCAN_LINES: usize = 5;

/// Derives a story title from the first chapter, falling back to the file name.
pub fn derive_story_title(chapters: &[ImportedChapter], file_name: &str) -> String {
    let (min, max) = TITLE_LENGTH_WINDOW;
    chapters
        .first()
        .and_then(|chapter| {
            chapter
                .content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take(TITLE_SCAN_LINES)
                .find(|line| (min..=max).contains(&line.chars().count()))
                .map(str::to_string)
        })
        .unwrap_or_else(|| title_from_file_name(file_name))
}

/// A successfully imported file, ready to be persisted by the caller.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportedStory {
    pub id: String,
    pub title: String,
    pub chapters: Vec<ImportedChapter>,
    pub metadata: ImportMetadata,
    pub original_file: String,
}

/// Summary of a batch import.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    /// Milliseconds from batch start to last completion.
    pub total_processing_time: u64,
}

/// Result of a batch import. `success` means at least one file was imported.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchImportResult {
    pub success: bool,
    pub stories: Vec<ImportedStory>,
    pub errors: Vec<ImportError>,
    pub summary: BatchSummary,
}

/// Content categories handled by the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FilterType {
    Violence,
    Explicit,
    Profanity,
    Sensitive,
    Custom,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterType::Violence => "violence",
            FilterType::Explicit => "explicit",
            FilterType::Profanity => "profanity",
            FilterType::Sensitive => "sensitive",
            FilterType::Custom => "custom",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FilterAction {
    Remove,
    Replace,
    Flag,
    Rewrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

/// One step of the content filter pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentFilter {
    pub filter_type: FilterType,
    pub action: FilterAction,
    pub severity: Severity,
    /// Regex source, only used by [`FilterType::Custom`].
    pub custom_pattern: Option<String>,
}

impl ContentFilter {
    pub fn new(filter_type: FilterType, action: FilterAction) -> Self {
        Self {
            filter_type,
            action,
            severity: Severity::default(),
            custom_pattern: None,
        }
    }

    pub fn custom(pattern: impl Into<String>, action: FilterAction) -> Self {
        Self {
            custom_pattern: Some(pattern.into()),
            ..Self::new(FilterType::Custom, action)
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// A match recorded by a `flag` filter. Content is left untouched.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterFlag {
    pub chapter_id: String,
    pub filter_type: FilterType,
    pub severity: Severity,
    /// Byte range within the chapter content at the time the filter ran.
    pub span: Range<usize>,
    pub matched: String,
}

/// Read-only detection report used for pre-flight display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentAnalysis {
    pub has_violence: bool,
    pub has_explicit_content: bool,
    pub has_profanity: bool,
    pub has_sensitive_content: bool,
    pub word_count: usize,
    pub character_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EnhancementLevel {
    #[default]
    Light,
    Moderate,
    Heavy,
}

/// Options for the optional AI post-processing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AiProcessingOptions {
    pub enable_content_moderation: bool,
    pub enable_content_enhancement: bool,
    pub enable_translation: bool,
    pub target_language: Option<String>,
    pub content_filters: Vec<ContentFilter>,
    pub enhancement_level: EnhancementLevel,
    pub preserve_style: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProcessingStage {
    Uploading,
    Parsing,
    Splitting,
    AiProcessing,
    Saving,
}

/// Transient progress report handed to the configured progress callback.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessingProgress {
    pub stage: ProcessingStage,
    /// 0-100
    pub progress: u8,
    pub message: String,
    pub current_item: Option<String>,
    pub estimated_time_remaining: Option<Duration>,
}

impl ProcessingProgress {
    pub fn new(stage: ProcessingStage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            message: message.into(),
            current_item: None,
            estimated_time_remaining: None,
        }
    }
}
