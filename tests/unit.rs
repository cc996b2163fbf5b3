//! Unit tests for core chapterwise functionality.
//!
//! Tests individual components in isolation without running a full import.

use chapterwise::error::Result;
use chapterwise::filter::{removal_token, replacement_phrase};
use chapterwise::metadata::count_words;
use chapterwise::prelude::*;

mod common;
use common::random_words;

fn chapter(content: &str) -> ImportedChapter {
    ImportedChapter::new("Chapter 1", content, 0)
}

#[test]
fn test_import_config_builder_validation() {
    let result = ImportConfig::builder()
        .split_options(SplitOptions::with_pattern("(unclosed"))
        .build();
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Invalid chapter pattern")
    );

    let result = ImportConfig::builder()
        .split_options(SplitOptions::by_word_count(0))
        .build();
    assert!(result.is_err());

    let result = ImportConfig::builder().max_concurrent_imports(0usize).build();
    assert!(result.is_err());

    let mut options = SplitOptions::with_pattern(r"^Chapter (\d+)$");
    options.content_group = Some(3);
    assert!(ImportConfig::builder().split_options(options).build().is_err());

    let result = ImportConfig::builder().encoding("klingon").build();
    assert!(result.is_err());
}

#[test]
fn test_import_config_defaults_and_preflight() -> Result<()> {
    let config = ImportConfig::builder().build()?;
    assert!(config.auto_split);
    assert_eq!(config.split_options.method, SplitMethod::Pattern);
    assert!(config.max_concurrent_imports >= 1);
    assert!(config.document_decoder.is_some());
    assert!(config.text_processor.is_none());
    assert!(!config.pattern_library.is_empty());
    config.preflight_check()?;

    let config = ImportConfig::builder().no_document_decoder().build()?;
    assert!(config.document_decoder.is_none());

    let mut config = ImportConfig::builder().build()?;
    config.split_options = SplitOptions::with_pattern("[");
    assert!(config.preflight_check().is_err());
    Ok(())
}

#[test]
fn test_normalization_is_idempotent() {
    let deep_emphasis = format!("{}a{}", "*".repeat(40), "*".repeat(40));
    let samples = [
        "  Title\r\n\r\nFirst\tline   \r\nSecond line\r\r\n\n\n",
        "# Chapter 1\n\n> A **quoted** line with [a link](http://example.com)\n\n- item one\n- item `two`\n\n* * *\n\n## Chapter 2 ##\nBody",
        "> > - **nested** _marks_ and ~~struck~~\n```\ncode fence\n```\n1. first\n2) second",
        "\u{FEFF}Chapter 1\nbody",
        deep_emphasis.as_str(),
        "",
    ];
    for raw in samples {
        for format in [FileFormat::Txt, FileFormat::Md] {
            let once = normalize(raw, format);
            let twice = normalize(&once, format);
            assert_eq!(once, twice, "normalization of {:?} as {} is not stable", raw, format);
        }
    }
}

#[test]
fn test_leading_byte_order_mark_is_dropped() -> Result<()> {
    let text = normalize("\u{FEFF}Chương 1: Mở đầu\nNội dung", FileFormat::Txt);
    assert_eq!(text, "Chương 1: Mở đầu\nNội dung");

    let library = PatternLibrary::default();
    let chapters = ChapterSplitter::new(&library).split(&text, &SplitOptions::auto_detect())?;
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].heading.as_deref(), Some("Chương 1: Mở đầu"));
    assert_eq!(chapters[0].content, "Nội dung");
    Ok(())
}

#[test]
fn test_markdown_normalization_strips_markup() {
    let raw = "# Chapter 1\n\nA **bold** word and a [link](http://x.y).\n\n- bullet\n> quote";
    assert_eq!(
        normalize(raw, FileFormat::Md),
        "Chapter 1\n\nA bold word and a link.\n\nbullet\nquote"
    );
}

#[test]
fn test_vietnamese_pattern_scenario() -> Result<()> {
    let library = PatternLibrary::default();
    let splitter = ChapterSplitter::new(&library);
    let text = "Chương 1: Mở đầu\nNội dung A\nChương 2: Tiếp theo\nNội dung B";
    let options = SplitOptions::with_pattern(r"(?i)^Chương\s*(\d+)[:\.\s]*(.+?)$");

    let chapters = splitter.split(text, &options)?;

    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "Mở đầu");
    assert_eq!(chapters[1].title, "Tiếp theo");
    assert!(chapters[0].content.contains("Nội dung A"));
    assert!(chapters[1].content.contains("Nội dung B"));
    assert_eq!(chapters[0].original_position, 0);
    assert_eq!(chapters[1].original_position, 1);
    assert_ne!(chapters[0].id, chapters[1].id);
    Ok(())
}

#[test]
fn test_pattern_split_reconstructs_text() -> Result<()> {
    let library = PatternLibrary::default();
    let splitter = ChapterSplitter::new(&library);
    let text = "Preface line\n\nCHAPTER I: Dawn\nThe sun rose.\n\nCHAPTER II\nIt set again.\n";

    let chapters = splitter.split(text, &SplitOptions::auto_detect())?;
    assert_eq!(chapters.len(), 3);
    assert_eq!(chapters[0].title, "Chapter 1");
    assert_eq!(chapters[1].title, "CHAPTER I: Dawn");

    let rebuilt: String = chapters
        .iter()
        .map(|c| &text[c.source_span.clone().unwrap()])
        .collect();
    assert_eq!(rebuilt, text);

    for c in &chapters[1..] {
        let heading = c.heading.as_deref().unwrap();
        let span = &text[c.source_span.clone().unwrap()];
        assert!(span.starts_with(heading));
        assert!(span.contains(&c.content));
    }
    Ok(())
}

#[test]
fn test_spelled_out_heading_stays_on_its_line() -> Result<()> {
    let library = PatternLibrary::default();
    let splitter = ChapterSplitter::new(&library);

    let text = "Chapter Twenty\nOne day later the rain stopped.\nMore prose here.";
    let chapters = splitter.split(text, &SplitOptions::auto_detect())?;
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].title, "Chapter Twenty");
    assert_eq!(chapters[0].heading.as_deref(), Some("Chapter Twenty"));
    assert!(chapters[0].content.starts_with("One day"));

    let chapters = splitter.split("Chapter Twenty One\nbody", &SplitOptions::auto_detect())?;
    assert_eq!(chapters[0].title, "Chapter Twenty One");
    assert_eq!(chapters[0].content, "body");
    Ok(())
}

#[test]
fn test_zero_match_fallback() -> Result<()> {
    let library = PatternLibrary::default();
    let splitter = ChapterSplitter::new(&library);
    let text = "Just some prose.\nNo headings anywhere in here.";

    let chapters = splitter.split(text, &SplitOptions::with_pattern(r"^Chapter (\d+)$"))?;
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].title, "Chapter 1");
    assert_eq!(chapters[0].content, text);

    let empty = PatternLibrary::empty();
    let chapters = ChapterSplitter::new(&empty).split(text, &SplitOptions::auto_detect())?;
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].content, text);
    Ok(())
}

#[test]
fn test_word_count_split() -> Result<()> {
    let library = PatternLibrary::default();
    let splitter = ChapterSplitter::new(&library);
    let text = random_words(4500);

    let chapters = splitter.split(&text, &SplitOptions::by_word_count(2000))?;
    let counts: Vec<usize> = chapters.iter().map(|c| c.word_count).collect();
    assert_eq!(counts, vec![2000, 2000, 500]);
    assert_eq!(counts.iter().sum::<usize>(), count_words(&text));

    let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Chapter 1", "Chapter 2", "Chapter 3"]);

    // Default window size
    let chapters = splitter.split(&text, &SplitOptions::with_method(SplitMethod::WordCount))?;
    assert_eq!(chapters.len(), 3);
    Ok(())
}

#[test]
fn test_manual_and_ai_methods() -> Result<()> {
    let library = PatternLibrary::default();
    let splitter = ChapterSplitter::new(&library);
    let text = "Chapter 1\nalpha\nChapter 2\nbeta";

    let manual = splitter.split(text, &SplitOptions::with_method(SplitMethod::Manual))?;
    assert_eq!(manual.len(), 1);
    assert_eq!(manual[0].content, text);

    let ai = splitter.split(text, &SplitOptions::with_method(SplitMethod::Ai))?;
    let pattern = splitter.split(text, &SplitOptions::auto_detect())?;
    assert_eq!(ai.len(), 2);
    assert_eq!(
        ai.iter().map(|c| &c.content).collect::<Vec<_>>(),
        pattern.iter().map(|c| &c.content).collect::<Vec<_>>()
    );

    assert!(splitter.split("  \n ", &SplitOptions::default())?.is_empty());
    Ok(())
}

#[test]
fn test_pattern_library_priority_and_registration() -> Result<()> {
    let mut library = PatternLibrary::default();
    let priorities: Vec<u32> = library.patterns().iter().map(|p| p.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort();
    assert_eq!(priorities, sorted);

    let text = "Part 1\nChapter 1\nalpha\nChapter 2\nbeta";
    assert_eq!(library.detect(text).map(|p| p.name.as_str()), Some("english_chapter"));

    let mixed = "Chương 1: Một\nChapter 2\nhai";
    assert_eq!(library.detect(mixed).map(|p| p.name.as_str()), Some("vietnamese_chapter"));

    assert_eq!(library.detect("第一章 开始\n内容").map(|p| p.name.as_str()), Some("chinese_chapter"));
    assert_eq!(library.detect("Phần 2\nbody").map(|p| p.name.as_str()), Some("vietnamese_part"));
    assert_eq!(library.detect("Book 4: Winter\nbody").map(|p| p.name.as_str()), Some("english_part"));
    assert_eq!(library.detect("## Title\nbody").map(|p| p.name.as_str()), Some("markdown_heading"));
    assert_eq!(library.detect("XIV\nbody").map(|p| p.name.as_str()), Some("numeric_ordinal"));
    assert_eq!(library.detect("intro\n* * *\nmore").map(|p| p.name.as_str()), Some("decorative_separator"));

    let scene = ChapterPattern::new("scene", Regex::new(r"(?m)^Scene (\d+)$")?, Some(1), None, 5)?;
    library.register(scene);
    assert_eq!(library.patterns()[0].name, "scene");
    assert_eq!(library.detect("Scene 1\nChapter 2\nx").map(|p| p.name.as_str()), Some("scene"));

    assert_eq!(library.unregister("scene"), 1);
    assert!(library.get("scene").is_none());

    assert!(ChapterPattern::new("bad", Regex::new(r"(a)")?, Some(2), None, 1).is_err());
    Ok(())
}

#[test]
fn test_chapter_metadata_invariant() -> Result<()> {
    let library = PatternLibrary::default();
    let text = random_words(1234);
    let chapters = ChapterSplitter::new(&library).split(&text, &SplitOptions::by_word_count(300))?;

    for c in &chapters {
        assert_eq!(c.word_count, c.content.split_whitespace().count());
        assert_eq!(c.character_count, c.content.encode_utf16().count());
        let expected = if c.word_count > 0 {
            c.word_count.div_ceil(200).max(1)
        } else {
            0
        };
        assert_eq!(c.estimated_reading_time, expected);
    }
    Ok(())
}

#[tokio::test]
async fn test_filter_remove_and_replace() -> Result<()> {
    let pipeline = ContentFilterPipeline::new(vec![
        ContentFilter::new(FilterType::Violence, FilterAction::Remove),
        ContentFilter::new(FilterType::Profanity, FilterAction::Replace),
    ]);
    let outcome = pipeline
        .apply(vec![chapter("He wanted to kill the king. Damn it all.")])
        .await;

    let content = &outcome.chapters[0].content;
    assert!(content.contains(removal_token(FilterType::Violence)));
    assert!(content.contains(replacement_phrase(FilterType::Profanity)));
    assert!(!content.to_lowercase().contains("kill"));
    assert!(!content.to_lowercase().contains("damn"));
    assert_ne!(
        removal_token(FilterType::Profanity),
        replacement_phrase(FilterType::Profanity)
    );
    assert!(outcome.errors.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_filters_apply_in_order() -> Result<()> {
    let pipeline = ContentFilterPipeline::new(vec![
        ContentFilter::custom("secret", FilterAction::Replace),
        ContentFilter::custom("filtered", FilterAction::Remove),
    ]);
    let outcome = pipeline.apply(vec![chapter("a secret plan")]).await;
    assert_eq!(outcome.chapters[0].content, "a [[REMOVED]] plan");
    Ok(())
}

#[tokio::test]
async fn test_filter_flag_leaves_content() -> Result<()> {
    let original = "Máu me khắp nơi. The murder happened at dawn.";
    let pipeline = ContentFilterPipeline::new(vec![
        ContentFilter::new(FilterType::Violence, FilterAction::Flag).with_severity(Severity::High),
    ]);
    let input = chapter(original);
    let id = input.id.clone();
    let outcome = pipeline.apply(vec![input]).await;

    assert_eq!(outcome.chapters[0].content, original);
    assert_eq!(outcome.flags.len(), 2);
    for flag in &outcome.flags {
        assert_eq!(flag.chapter_id, id);
        assert_eq!(flag.filter_type, FilterType::Violence);
        assert_eq!(flag.severity, Severity::High);
        assert_eq!(&original[flag.span.clone()], flag.matched);
    }
    assert!(outcome.flags[0].span.start < outcome.flags[1].span.start);
    Ok(())
}

#[tokio::test]
async fn test_invalid_custom_filter_does_not_crash() -> Result<()> {
    let pipeline = ContentFilterPipeline::new(vec![
        ContentFilter::custom("(unclosed", FilterAction::Remove),
        ContentFilter {
            custom_pattern: None,
            ..ContentFilter::new(FilterType::Custom, FilterAction::Remove)
        },
    ]);
    let outcome = pipeline.apply(vec![chapter("nothing to see")]).await;

    assert_eq!(outcome.chapters[0].content, "nothing to see");
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome.errors.iter().all(|e| e.kind == ImportErrorKind::Content));
    Ok(())
}

#[tokio::test]
async fn test_rewrite_without_processor_is_noop() -> Result<()> {
    let pipeline = ContentFilterPipeline::new(vec![ContentFilter::new(
        FilterType::Violence,
        FilterAction::Rewrite,
    )]);
    let outcome = pipeline.apply(vec![chapter("a bloody mess")]).await;
    assert_eq!(outcome.chapters[0].content, "a bloody mess");
    assert!(outcome.errors.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_filtered_counts_are_stale_until_refreshed() -> Result<()> {
    let pipeline = ContentFilterPipeline::new(vec![ContentFilter::new(
        FilterType::Violence,
        FilterAction::Remove,
    )]);
    let mut outcome = pipeline.apply(vec![chapter("kill kill kill")]).await;
    let filtered = &mut outcome.chapters[0];
    assert_eq!(filtered.word_count, 3);

    filtered.refresh_metadata();
    assert_eq!(filtered.word_count, 6);
    assert_eq!(filtered.character_count, filtered.content.encode_utf16().count());
    Ok(())
}

#[test]
fn test_analyze_content() {
    let analysis = analyze_content("They drank and swore: damn!");
    assert!(analysis.has_profanity);
    assert!(!analysis.has_violence);
    assert!(!analysis.has_explicit_content);
    assert!(!analysis.has_sensitive_content);
    assert_eq!(analysis.word_count, 5);
    assert_eq!(analysis.character_count, 27);

    let analysis = analyze_content("Hắn muốn giết người. Chuyện tự tử.");
    assert!(analysis.has_violence);
    assert!(analysis.has_sensitive_content);
}

#[test]
fn test_detect_encoding_and_story_title() {
    assert_eq!(detect_encoding(&[0xEF, 0xBB, 0xBF, b'x']), "utf-8-bom");
    assert_eq!(detect_encoding("plain".as_bytes()), "utf-8");

    let chapters = vec![ImportedChapter::new(
        "Chapter 1",
        "Short\n\nThe Lantern Keeper of Harbor Row\nIt began on a Tuesday.",
        0,
    )];
    assert_eq!(
        chapterwise::types::derive_story_title(&chapters, "x.txt"),
        "The Lantern Keeper of Harbor Row"
    );

    let chapters = vec![ImportedChapter::new("Chapter 1", "Tiny\nbits", 0)];
    assert_eq!(
        chapterwise::types::derive_story_title(&chapters, "my_great-novel.txt"),
        "my great novel"
    );
}
