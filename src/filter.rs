//! Content filter pipeline and read-only content analysis.
//!
//! Filters run in list order, each on the output of the previous one. Every category owns
//! a fixed family of English and Vietnamese detection patterns; `custom` filters bring
//! their own regex. Actions:
//!
//! - `remove` replaces matches with a category token such as `[REMOVED: VIOLENCE]`
//! - `replace` replaces matches with a shorter phrase such as `[violence]`
//! - `flag` leaves content untouched and records a [`FilterFlag`] per match
//! - `rewrite` hands the chapter to the configured [`TextProcessor`]; without one (or on
//!   failure) the content stays as it is
//!
//! An invalid custom regex skips that filter and is reported as a `content` error, so one
//! bad user pattern never stops the rest of the pipeline.
//!
//! Word and character counts are not recomputed after filtering; call
//! [`ImportedChapter::refresh_metadata`] when fresh counts are needed.

use std::sync::Arc;

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;

use crate::error::Error;
use crate::metadata::{count_characters, count_words};
use crate::processor::TextProcessor;
use crate::types::{
    ContentAnalysis, ContentFilter, FilterAction, FilterFlag, FilterType, ImportError,
    ImportedChapter,
};

lazy_static! {
    static ref VIOLENCE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:kill(?:s|ed|er|ing)?|murder(?:s|ed|er|ing)?|blood(?:y|shed)?|stab(?:s|bed|bing)?|slaughter(?:ed)?|tortur(?:e|ed|ing)|behead(?:ed)?|massacre)\b").unwrap(),
        Regex::new(r"(?i)\b(?:giết(?: người)?|tàn sát|đâm chém|chém giết|máu me|tra tấn|thảm sát|bạo lực)\b").unwrap(),
    ];
    static ref EXPLICIT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:sex(?:ual|ually)?|nude|naked|porn(?:ographic|ography)?|erotic|orgasm)\b").unwrap(),
        Regex::new(r"(?i)\b(?:khỏa thân|khoả thân|tình dục|khiêu dâm|làm tình)\b").unwrap(),
    ];
    static ref PROFANITY_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:fuck(?:s|ed|er|ing)?|shit(?:s|ty)?|bitch(?:es)?|bastard(?:s)?|asshole(?:s)?|damn(?:ed)?)\b").unwrap(),
        Regex::new(r"(?i)\b(?:đồ khốn|chết tiệt|mẹ kiếp|đm|vcl|vãi)\b").unwrap(),
    ];
    static ref SENSITIVE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\b(?:suicide|suicidal|self[- ]harm|overdose|drug abuse|addiction|racis[mt]|terroris[mt])\b").unwrap(),
        Regex::new(r"(?i)\b(?:tự tử|tự sát|tự hại|ma túy|nghiện|phân biệt chủng tộc|khủng bố)\b").unwrap(),
    ];
}

/// Detection patterns owned by a built-in category. Empty for `custom`.
pub fn category_patterns(filter_type: FilterType) -> &'static [Regex] {
    match filter_type {
        FilterType::Violence => &VIOLENCE_PATTERNS,
        FilterType::Explicit => &EXPLICIT_PATTERNS,
        FilterType::Profanity => &PROFANITY_PATTERNS,
        FilterType::Sensitive => &SENSITIVE_PATTERNS,
        FilterType::Custom => &[],
    }
}

/// Token used by the `remove` action.
pub fn removal_token(filter_type: FilterType) -> &'static str {
    match filter_type {
        FilterType::Violence => "[REMOVED: VIOLENCE]",
        FilterType::Explicit => "[REMOVED: EXPLICIT]",
        FilterType::Profanity => "[REMOVED: PROFANITY]",
        FilterType::Sensitive => "[REMOVED: SENSITIVE]",
        FilterType::Custom => "[REMOVED]",
    }
}

/// Phrase used by the `replace` action.
pub fn replacement_phrase(filter_type: FilterType) -> &'static str {
    match filter_type {
        FilterType::Violence => "[violence]",
        FilterType::Explicit => "[explicit]",
        FilterType::Profanity => "[***]",
        FilterType::Sensitive => "[sensitive]",
        FilterType::Custom => "[filtered]",
    }
}

/// Runs the detection patterns read-only, for pre-flight display.
pub fn analyze_content(text: &str) -> ContentAnalysis {
    let detects = |filter_type| category_patterns(filter_type).iter().any(|re| re.is_match(text));
    ContentAnalysis {
        has_violence: detects(FilterType::Violence),
        has_explicit_content: detects(FilterType::Explicit),
        has_profanity: detects(FilterType::Profanity),
        has_sensitive_content: detects(FilterType::Sensitive),
        word_count: count_words(text),
        character_count: count_characters(text),
    }
}

/// Chapters after filtering, plus the side channel of flags and non-fatal errors.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub chapters: Vec<ImportedChapter>,
    pub flags: Vec<FilterFlag>,
    pub errors: Vec<ImportError>,
}

/// An ordered list of content filters with an optional rewriting collaborator.
#[derive(Clone, Default)]
pub struct ContentFilterPipeline {
    filters: Vec<ContentFilter>,
    rewriter: Option<Arc<dyn TextProcessor>>,
}

impl std::fmt::Debug for ContentFilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentFilterPipeline")
            .field("filters", &self.filters)
            .field(
                "rewriter",
                if self.rewriter.is_some() {
                    &"Some(TextProcessor)"
                } else {
                    &"None"
                },
            )
            .finish()
    }
}

impl ContentFilterPipeline {
    pub fn new(filters: Vec<ContentFilter>) -> Self {
        Self {
            filters,
            rewriter: None,
        }
    }

    /// Sets the collaborator used by `rewrite` filters.
    pub fn with_rewriter(mut self, rewriter: Option<Arc<dyn TextProcessor>>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn filters(&self) -> &[ContentFilter] {
        &self.filters
    }

    /// Applies every filter, in order, to every chapter.
    pub async fn apply(&self, chapters: Vec<ImportedChapter>) -> FilterOutcome {
        let mut outcome = FilterOutcome {
            chapters,
            ..FilterOutcome::default()
        };

        for filter in &self.filters {
            let patterns = match compile_filter(filter) {
                Ok(patterns) => patterns,
                Err(e) => {
                    log::warn!("Skipping {} filter: {}", filter.filter_type, e);
                    outcome.errors.push(ImportError::from(&e));
                    continue;
                }
            };

            match filter.action {
                FilterAction::Remove | FilterAction::Replace => {
                    let placeholder = match filter.action {
                        FilterAction::Remove => removal_token(filter.filter_type),
                        _ => replacement_phrase(filter.filter_type),
                    };
                    outcome.chapters.par_iter_mut().for_each(|chapter| {
                        for re in patterns.iter() {
                            if re.is_match(&chapter.content) {
                                chapter.content =
                                    re.replace_all(&chapter.content, placeholder).into_owned();
                            }
                        }
                    });
                }
                FilterAction::Flag => {
                    let flags: Vec<Vec<FilterFlag>> = outcome
                        .chapters
                        .par_iter()
                        .map(|chapter| flag_matches(chapter, filter, &patterns))
                        .collect();
                    outcome.flags.extend(flags.into_iter().flatten());
                }
                FilterAction::Rewrite => self.rewrite(&mut outcome.chapters, filter, &patterns).await,
            }
        }

        outcome
    }

    async fn rewrite(&self, chapters: &mut [ImportedChapter], filter: &ContentFilter, patterns: &[Regex]) {
        let Some(rewriter) = &self.rewriter else {
            log::debug!(
                "No text processor configured; {} rewrite filter leaves content unchanged",
                filter.filter_type
            );
            return;
        };

        for chapter in chapters.iter_mut() {
            if !patterns.iter().any(|re| re.is_match(&chapter.content)) {
                continue;
            }
            match rewriter
                .rewrite(&chapter.content, filter.filter_type, filter.severity)
                .await
            {
                Ok(text) => chapter.content = text,
                Err(e) => log::warn!(
                    "Rewrite of chapter '{}' for {} content failed, keeping original: {}",
                    chapter.title,
                    filter.filter_type,
                    e
                ),
            }
        }
    }
}

/// Patterns a filter runs: the category family, or the compiled custom regex.
fn compile_filter(filter: &ContentFilter) -> Result<Vec<Regex>, Error> {
    match filter.filter_type {
        FilterType::Custom => {
            let source = filter.custom_pattern.as_deref().ok_or_else(|| {
                Error::Content("Custom filter has no pattern".to_string())
            })?;
            let regex = Regex::new(source).map_err(|e| {
                Error::Content(format!("Invalid custom filter pattern '{}': {}", source, e))
            })?;
            Ok(vec![regex])
        }
        other => Ok(category_patterns(other).to_vec()),
    }
}

fn flag_matches(chapter: &ImportedChapter, filter: &ContentFilter, patterns: &[Regex]) -> Vec<FilterFlag> {
    let mut flags: Vec<FilterFlag> = patterns
        .iter()
        .flat_map(|re| re.find_iter(&chapter.content))
        .filter(|m| !m.is_empty())
        .map(|m| FilterFlag {
            chapter_id: chapter.id.clone(),
            filter_type: filter.filter_type,
            severity: filter.severity,
            span: m.range(),
            matched: m.as_str().to_string(),
        })
        .collect();
    flags.sort_by_key(|flag| flag.span.start);
    flags
}
