//! Ranked library of chapter-boundary patterns.
//!
//! A [`PatternLibrary`] is an ordinary ordered list owned by the caller (normally through
//! [`ImportConfig`](crate::importer::ImportConfig)). Patterns are kept sorted by ascending
//! priority; auto-detection walks them in that order and picks the first one that finds
//! at least one boundary.
//!
//! The built-in families cover Vietnamese and Chinese chapter markers, English
//! Chapter/Part/Volume headings, bare numeric or Roman ordinals, Markdown headings and
//! decorative separators.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

lazy_static! {
    /// "Chương 1", "CHƯƠNG IV: Mở đầu", "Hồi 3 - ...", "Tiết 2"
    pub static ref VIETNAMESE_CHAPTER_REGEX: Regex = Regex::new(
        r"(?m)^[ \t]*((?i:chương|hồi|tiết)[ \t]+(?:\d+|[IVXLCDM]+)\b(?:[ \t]*[:.\-–—][ \t]*.*|[ \t]+.*)?)[ \t]*$"
    ).unwrap();
    /// "第一章", "第12回 标题", "第三卷"
    pub static ref CHINESE_CHAPTER_REGEX: Regex = Regex::new(
        r"(?m)^[ \t]*(第[ \t]*[0-9０-９零〇一二三四五六七八九十百千万两]+[ \t]*[章回节節卷集部篇](?:[ \t:：、.．-]*.*)?)[ \t]*$"
    ).unwrap();
    /// "Chapter 1", "CHAPTER TWELVE: The Storm", "Prologue", "Epilogue"
    pub static ref ENGLISH_CHAPTER_REGEX: Regex = Regex::new(
        r"(?m)^[ \t]*((?i:chapter)[ \t]+(?:\d+|[IVXLCDM]+|(?i:one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)(?:[- \t](?i:one|two|three|four|five|six|seven|eight|nine))?)\b(?:[ \t]*[:.\-–—][ \t]*.*|[ \t]+.*)?|(?i:prologue|epilogue)(?:[ \t]*[:.\-–—][ \t]*.*)?)[ \t]*$"
    ).unwrap();
    /// "Phần 1", "Quyển II", "Tập 3"
    pub static ref VIETNAMESE_PART_REGEX: Regex = Regex::new(
        r"(?m)^[ \t]*((?i:phần|quyển|tập)[ \t]+(?:\d+|[IVXLCDM]+)\b(?:[ \t]*[:.\-–—][ \t]*.*|[ \t]+.*)?)[ \t]*$"
    ).unwrap();
    /// "Part 2", "VOLUME III - Winter", "Book 4"
    pub static ref ENGLISH_PART_REGEX: Regex = Regex::new(
        r"(?m)^[ \t]*((?i:part|volume|book)[ \t]+(?:\d+|[IVXLCDM]+)\b(?:[ \t]*[:.\-–—][ \t]*.*|[ \t]+.*)?)[ \t]*$"
    ).unwrap();
    /// "# Title" up to "###### Title"
    pub static ref MARKDOWN_HEADING_REGEX: Regex =
        Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+(.+?)[ \t#]*$").unwrap();
    /// A line holding only "12", "12.", "XIV" or "XIV."
    pub static ref NUMERIC_ORDINAL_REGEX: Regex =
        Regex::new(r"(?m)^[ \t]*(\d{1,4}|[IVXLCDM]{1,8})\.?[ \t]*$").unwrap();
    /// "***", "* * *", "---", "===", "~~~", "→→→", "☆☆☆", "◆ ◆ ◆"
    pub static ref DECORATIVE_SEPARATOR_REGEX: Regex = Regex::new(
        r"(?m)^[ \t]*(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:=[ \t]*){3,}|(?:~[ \t]*){3,}|(?:_[ \t]*){3,}|(?:[→⟶►▶>»][ \t]*){3,}|(?:[☆★✦✧❖◆◇•·][ \t]*){3,})$"
    ).unwrap();
}

/// A boundary matcher with the capture groups that hold the title and the body start.
#[derive(Debug, Clone)]
pub struct ChapterPattern {
    pub name: String,
    pub regex: Regex,
    /// Capture group holding the chapter title, if any.
    pub title_group: Option<usize>,
    /// Capture group where the chapter body begins, if the matcher captures body text itself.
    pub content_group: Option<usize>,
    /// Lower values are tried first during auto-detection.
    pub priority: u32,
}

impl ChapterPattern {
    /// Creates a pattern from a compiled regex, checking the group indices against it.
    pub fn new(
        name: impl Into<String>,
        regex: Regex,
        title_group: Option<usize>,
        content_group: Option<usize>,
        priority: u32,
    ) -> Result<Self> {
        let name = name.into();
        let groups = regex.captures_len();
        for group in [title_group, content_group].into_iter().flatten() {
            if group == 0 || group >= groups {
                return Err(Error::Content(format!(
                    "Pattern '{}' has no capture group {} (it defines {})",
                    name,
                    group,
                    groups - 1
                )));
            }
        }
        Ok(Self {
            name,
            regex,
            title_group,
            content_group,
            priority,
        })
    }

    /// Compiles a user-supplied boundary regex.
    ///
    /// The regex is compiled in multi-line mode so `^`/`$` anchor on line boundaries.
    /// When `title_group` is `None`, the last capture group (if any) is used as the title.
    pub fn from_user_pattern(
        pattern: &str,
        title_group: Option<usize>,
        content_group: Option<usize>,
    ) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(|e| Error::Content(format!("Invalid chapter pattern '{}': {}", pattern, e)))?;
        let last_group = regex.captures_len().checked_sub(1).filter(|&g| g > 0);
        let title_group = title_group.or(last_group);
        Self::new("custom", regex, title_group, content_group, 0)
    }

    /// Whether this pattern finds at least one non-empty boundary in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.find_iter(text).any(|m| !m.is_empty())
    }
}

/// Ordered registry of chapter patterns.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: Vec<ChapterPattern>,
}

impl Default for PatternLibrary {
    /// The library with every built-in pattern family registered.
    fn default() -> Self {
        let builtins = [
            ("vietnamese_chapter", &*VIETNAMESE_CHAPTER_REGEX, Some(1), 10),
            ("chinese_chapter", &*CHINESE_CHAPTER_REGEX, Some(1), 20),
            ("english_chapter", &*ENGLISH_CHAPTER_REGEX, Some(1), 30),
            ("vietnamese_part", &*VIETNAMESE_PART_REGEX, Some(1), 40),
            ("english_part", &*ENGLISH_PART_REGEX, Some(1), 50),
            ("markdown_heading", &*MARKDOWN_HEADING_REGEX, Some(1), 60),
            ("numeric_ordinal", &*NUMERIC_ORDINAL_REGEX, Some(1), 70),
            ("decorative_separator", &*DECORATIVE_SEPARATOR_REGEX, None, 80),
        ];

        let mut library = Self::empty();
        for (name, regex, title_group, priority) in builtins {
            library.patterns.push(ChapterPattern {
                name: name.to_string(),
                regex: regex.clone(),
                title_group,
                content_group: None,
                priority,
            });
        }
        library.sort();
        library
    }
}

impl PatternLibrary {
    /// A library with no patterns; auto-detection on it never finds a boundary.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// All patterns in ascending priority order.
    pub fn patterns(&self) -> &[ChapterPattern] {
        &self.patterns
    }

    /// Looks up a pattern by name.
    pub fn get(&self, name: &str) -> Option<&ChapterPattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    /// Registers a pattern and re-sorts the library.
    ///
    /// Sorting is stable, so among equal priorities earlier registrations are tried first.
    pub fn register(&mut self, pattern: ChapterPattern) -> &mut Self {
        log::debug!(
            "Registering chapter pattern '{}' with priority {}",
            pattern.name,
            pattern.priority
        );
        self.patterns.push(pattern);
        self.sort();
        self
    }

    /// Removes every pattern with the given name, returning how many were removed.
    pub fn unregister(&mut self, name: &str) -> usize {
        let before = self.patterns.len();
        self.patterns.retain(|p| p.name != name);
        before - self.patterns.len()
    }

    /// Returns the first pattern, in priority order, that finds a boundary in `text`.
    pub fn detect(&self, text: &str) -> Option<&ChapterPattern> {
        let found = self.patterns.iter().find(|p| p.matches(text));
        match found {
            Some(pattern) => log::debug!("Auto-detected chapter pattern '{}'", pattern.name),
            None => log::debug!("No chapter pattern matched; text stays a single chapter"),
        }
        found
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn sort(&mut self) {
        self.patterns.sort_by_key(|p| p.priority);
    }
}
