//! Chapterwise - Manuscript Import and Chapter Segmentation Library
//!
//! This crate provides an asynchronous, declarative API for importing raw manuscript
//! files (plain text, Markdown, DOCX and EPUB), normalizing their content, detecting
//! chapter boundaries with a ranked multilingual pattern library and splitting them into
//! chapter records with word counts and reading times. An optional content filter stage
//! can remove, replace, flag or rewrite sensitive passages.
//!
//! # Getting Started
//!
//! Configure an import with the `ImportConfig` builder, then run it on one file, a batch
//! of files or a whole directory.
//!
//! ```rust,no_run
//! use chapterwise::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> chapterwise::error::Result<()> {
//!     // 1. Configure the import using the builder
//!     let config = ImportConfig::builder()
//!         .split_options(SplitOptions::with_pattern(r"(?i)^Chương\s*(\d+)[:.\s]*(.+?)$"))
//!         .ai_processing(true)
//!         .ai_processing_options(AiProcessingOptions {
//!             enable_content_moderation: true,
//!             content_filters: vec![ContentFilter::new(
//!                 FilterType::Profanity,
//!                 FilterAction::Replace,
//!             )],
//!             ..Default::default()
//!         })
//!         .build()?;
//!
//!     // 2. Import a single file
//!     let source = SourceFile::from_path(Path::new("./manuscripts/novel.txt")).await?;
//!     let result = config.import_file(source).await;
//!     for chapter in &result.chapters {
//!         println!("{} ({} words)", chapter.title, chapter.word_count);
//!     }
//!
//!     // 3. Or import every manuscript of a directory at once
//!     let batch = config.import_directory(Path::new("./manuscripts")).await?;
//!     println!(
//!         "Imported {}/{} files",
//!         batch.summary.successful_files, batch.summary.total_files
//!     );
//!
//!     Ok(())
//! }
//! ```
//!
//! For custom boundary patterns, AI collaborators or binary decoders, refer to the
//! module-level documentation.

pub mod collector;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod importer;
pub mod metadata;
pub mod normalizer;
pub mod path_utils;
pub mod patterns;
pub mod processor;
pub mod splitter;
pub mod types;

// Publicly expose the main `ImportConfig` struct and its builder
pub use importer::{ImportConfig, ImportConfigBuilder, ProgressCallback};

// Re-export error and core types for direct access
pub use types::{
    AiProcessingOptions, BatchImportResult, BatchSummary, ContentAnalysis, ContentFilter,
    EnhancementLevel, FileFormat, FilterAction, FilterFlag, FilterType, ImportError,
    ImportErrorKind, ImportMetadata, ImportResult, ImportedChapter, ImportedStory,
    ProcessingProgress, ProcessingStage, Severity, SourceData, SourceFile, SplitMethod,
    SplitOptions,
};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits, allowing you to
/// import everything you need with a single `use chapterwise::prelude::*;` statement.
pub mod prelude {
    pub use super::{
        AiProcessingOptions, BatchImportResult, BatchSummary, ContentAnalysis, ContentFilter,
        EnhancementLevel, FileFormat, FilterAction, FilterFlag, FilterType, ImportConfig,
        ImportConfigBuilder, ImportError, ImportErrorKind, ImportMetadata, ImportResult,
        ImportedChapter, ImportedStory, ProcessingProgress, ProcessingStage, ProgressCallback,
        Severity, SourceData, SourceFile, SplitMethod, SplitOptions, error, types,
    };
    pub use crate::collector::Collector;
    pub use crate::decoder::{ArchiveDecoder, DocumentDecoder};
    pub use crate::filter::{ContentFilterPipeline, FilterOutcome, analyze_content};
    pub use crate::normalizer::{detect_encoding, normalize};
    pub use crate::patterns::{ChapterPattern, PatternLibrary};
    pub use crate::processor::{ChapterDraft, TextProcessor};
    pub use crate::splitter::ChapterSplitter;
    pub use regex::Regex;
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
