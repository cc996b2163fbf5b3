//! Chapter splitting strategies.
//!
//! The [`ChapterSplitter`] turns normalized text into an ordered list of
//! [`ImportedChapter`]s using one of four methods:
//!
//! - [`SplitMethod::Pattern`]: boundary regex, explicit or auto-detected from the [`PatternLibrary`]
//! - [`SplitMethod::WordCount`]: fixed windows of whitespace-delimited tokens
//! - [`SplitMethod::Manual`]: the whole text as a single chapter
//! - [`SplitMethod::Ai`]: handled by the importer's [`TextProcessor`](crate::processor::TextProcessor)
//!   when one is configured; here it always takes the pattern path
//!
//! Pattern and word-count splits record a `source_span` on every chapter, and the spans of
//! one split partition the input text, so nothing is lost between chapters.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::Result;
use crate::patterns::{ChapterPattern, PatternLibrary};
use crate::processor::ChapterDraft;
use crate::types::{ImportedChapter, SplitMethod, SplitOptions};

lazy_static! {
    static ref WORD_REGEX: Regex = Regex::new(r"\S+").unwrap();
}

/// Splits normalized text into chapters using the patterns of a library.
#[derive(Debug, Clone, Copy)]
pub struct ChapterSplitter<'a> {
    library: &'a PatternLibrary,
}

impl<'a> ChapterSplitter<'a> {
    pub fn new(library: &'a PatternLibrary) -> Self {
        Self { library }
    }

    /// Splits `text` according to `options`.
    ///
    /// Blank text yields no chapters. An invalid explicit pattern is reported as
    /// [`Error::Content`](crate::error::Error::Content).
    pub fn split(&self, text: &str, options: &SplitOptions) -> Result<Vec<ImportedChapter>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let chapters = match options.method {
            SplitMethod::Pattern => self.split_by_pattern(text, options)?,
            SplitMethod::Ai => {
                log::debug!("AI splitting is not available here, using pattern splitting");
                self.split_by_pattern(text, options)?
            }
            SplitMethod::WordCount => split_by_word_count(text, options.words_per_chapter()),
            SplitMethod::Manual => whole_text(text),
        };
        log::debug!(
            "Split text into {} chapter(s) using {:?}",
            chapters.len(),
            options.method
        );
        Ok(chapters)
    }

    fn split_by_pattern(&self, text: &str, options: &SplitOptions) -> Result<Vec<ImportedChapter>> {
        let pattern: Option<Cow<ChapterPattern>> = match &options.pattern {
            Some(source) => Some(Cow::Owned(ChapterPattern::from_user_pattern(
                source,
                options.title_group,
                options.content_group,
            )?)),
            None => self.library.detect(text).map(Cow::Borrowed),
        };

        Ok(match pattern {
            Some(pattern) => split_with_pattern(text, &pattern),
            None => whole_text(text),
        })
    }
}

/// Splits `text` at every non-empty match of `pattern`.
///
/// Each match starts a chapter whose title is the pattern's title group (or a placeholder)
/// and whose body runs from the end of the match (or the start of the content group) to
/// the next match. Text before the first match becomes an untitled chapter when it is not
/// blank. With no matches the whole text is a single chapter titled "Chapter 1".
pub fn split_with_pattern(text: &str, pattern: &ChapterPattern) -> Vec<ImportedChapter> {
    let boundaries: Vec<Captures> = pattern
        .regex
        .captures_iter(text)
        .filter(|caps| caps.get(0).is_some_and(|m| !m.is_empty()))
        .collect();

    let Some(first_start) = boundaries.first().and_then(|c| c.get(0)).map(|m| m.start()) else {
        return whole_text(text);
    };

    let mut chapters = Vec::with_capacity(boundaries.len() + 1);
    let mut span_start = 0;

    let preamble = &text[..first_start];
    if !preamble.trim().is_empty() {
        let mut chapter = ImportedChapter::new(
            ImportedChapter::placeholder_title(0),
            preamble.trim(),
            0,
        );
        chapter.source_span = Some(0..first_start);
        chapters.push(chapter);
        span_start = first_start;
    }

    for (i, caps) in boundaries.iter().enumerate() {
        let Some(heading) = caps.get(0) else {
            continue;
        };
        let next_start = boundaries
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map_or(text.len(), |m| m.start());
        let body_start = pattern
            .content_group
            .and_then(|g| caps.get(g))
            .map_or(heading.end(), |m| m.start());
        let title = pattern
            .title_group
            .and_then(|g| caps.get(g))
            .map(|m| m.as_str().trim())
            .filter(|t| !t.is_empty());

        let position = chapters.len();
        let title = title.map_or_else(|| ImportedChapter::placeholder_title(position), str::to_string);
        let mut chapter =
            ImportedChapter::new(title, text[body_start..next_start].trim(), position);
        chapter.heading = Some(text[heading.start()..body_start].to_string());
        chapter.source_span = Some(span_start..next_start);
        chapters.push(chapter);
        span_start = next_start;
    }

    chapters
}

/// Cuts `text` into windows of `words_per_chapter` tokens, re-joined with single spaces.
pub fn split_by_word_count(text: &str, words_per_chapter: usize) -> Vec<ImportedChapter> {
    let size = words_per_chapter.max(1);
    let tokens: Vec<_> = WORD_REGEX.find_iter(text).collect();

    tokens
        .chunks(size)
        .enumerate()
        .map(|(i, window)| {
            let start = if i == 0 { 0 } else { window[0].start() };
            let end = tokens
                .get((i + 1) * size)
                .map_or(text.len(), |next| next.start());
            let content = window
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let mut chapter =
                ImportedChapter::new(ImportedChapter::placeholder_title(i), content, i);
            chapter.source_span = Some(start..end);
            chapter
        })
        .collect()
}

/// The whole text as a single chapter titled "Chapter 1".
pub fn whole_text(text: &str) -> Vec<ImportedChapter> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut chapter = ImportedChapter::new(ImportedChapter::placeholder_title(0), text.trim(), 0);
    chapter.source_span = Some(0..text.len());
    vec![chapter]
}

/// Builds chapters from drafts returned by an external splitter. Blank drafts are dropped.
pub fn chapters_from_drafts(drafts: Vec<ChapterDraft>) -> Vec<ImportedChapter> {
    drafts
        .into_iter()
        .filter(|draft| !draft.content.trim().is_empty())
        .enumerate()
        .map(|(position, draft)| {
            let title = draft
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| ImportedChapter::placeholder_title(position));
            ImportedChapter::new(title, draft.content.trim(), position)
        })
        .collect()
}
