//! Optional AI text-processing collaborator.
//!
//! The engine never talks to an AI provider itself. Callers that have one implement
//! [`TextProcessor`] and inject it through
//! [`ImportConfigBuilder::text_processor`](crate::importer::ImportConfigBuilder::text_processor).
//! Every capability is optional: the default method bodies return
//! [`Error::Unsupported`], and the importer treats any error exactly like an absent
//! processor, so a missing or failing collaborator never blocks an import.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{EnhancementLevel, FilterType, Severity};

/// A chapter proposed by an external splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDraft {
    pub title: Option<String>,
    pub content: String,
}

impl ChapterDraft {
    pub fn new(title: Option<String>, content: impl Into<String>) -> Self {
        Self {
            title,
            content: content.into(),
        }
    }
}

/// Interface to an external AI text-processing service.
#[async_trait]
pub trait TextProcessor: Send + Sync {
    /// Improves the prose of `text`.
    async fn enhance(
        &self,
        _text: &str,
        _level: EnhancementLevel,
        _preserve_style: bool,
    ) -> Result<String> {
        Err(Error::Unsupported("enhance".to_string()))
    }

    /// Translates `text` into `target_language`.
    async fn translate(&self, _text: &str, _target_language: &str) -> Result<String> {
        Err(Error::Unsupported("translate".to_string()))
    }

    /// Rewrites passages of `text` that belong to `category`.
    async fn rewrite(&self, _text: &str, _category: FilterType, _severity: Severity) -> Result<String> {
        Err(Error::Unsupported("rewrite".to_string()))
    }

    /// Splits normalized text into chapters.
    async fn split_chapters(&self, _text: &str) -> Result<Vec<ChapterDraft>> {
        Err(Error::Unsupported("split_chapters".to_string()))
    }
}
