//! Encoding detection and format-specific text normalization.
//!
//! Every source ends up here before chapter detection:
//! - raw bytes are decoded with [`decode_bytes`] using the label from [`detect_encoding`]
//!   (or an explicit override),
//! - the decoded text is cleaned with [`normalize`] according to its [`FileFormat`].
//!
//! Normalization of `txt` and `md` is idempotent: running it twice yields the same text.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::types::FileFormat;

/// Spaces a tab expands to in plain text.
const TAB_WIDTH: usize = 4;

lazy_static! {
    /// Block quote, bullet, ordered-list and ATX heading markers at the start of a line.
    static ref MD_LINE_PREFIX: Regex =
        Regex::new(r"^[ \t]*(?:>[ \t]?|[-*+][ \t]+|\d{1,9}[.)][ \t]+|#{1,6}(?:[ \t]+|$))+").unwrap();
    /// Closing hashes of an ATX heading ("## Title ##").
    static ref MD_HEADING_SUFFIX: Regex = Regex::new(r"[ \t]+#+[ \t]*$").unwrap();
    /// Thematic breaks are kept verbatim so decorative-separator patterns still see them.
    static ref MD_THEMATIC_BREAK: Regex = Regex::new(r"^[ \t]*(?:[-*_][ \t]*){3,}$").unwrap();
    static ref MD_CODE_FENCE: Regex = Regex::new(r"^[ \t]*(?:```|~~~)").unwrap();
    static ref MD_LINK: Regex = Regex::new(r"!?\[([^\]\n]*)\]\([^)\n]*\)").unwrap();
    static ref MD_INLINE_CODE: Regex = Regex::new(r"`([^`\n]*)`").unwrap();
    static ref MD_STRONG_STAR: Regex = Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap();
    static ref MD_STRONG_UNDERSCORE: Regex = Regex::new(r"__([^_\n]+?)__").unwrap();
    static ref MD_STRIKE: Regex = Regex::new(r"~~([^~\n]+?)~~").unwrap();
    static ref MD_EM_STAR: Regex = Regex::new(r"\*([^*\n]+?)\*").unwrap();
    static ref MD_EM_UNDERSCORE: Regex = Regex::new(r"\b_([^_\n]+?)_\b").unwrap();

    static ref MARKUP_COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref MARKUP_INVISIBLE: Regex =
        Regex::new(r"(?is)<(head|script|style)\b[^>]*>.*?</(?:head|script|style)\s*>").unwrap();
    static ref MARKUP_BREAK: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|li|tr|blockquote|section|article|title)\s*>|<w:p\b[^>]*/>|</w:p>|<w:br\b[^>]*/?>|<w:cr\b[^>]*/?>").unwrap();
    static ref MARKUP_TAB: Regex = Regex::new(r"<w:tab\b[^>]*/?>").unwrap();
    static ref MARKUP_TAG: Regex = Regex::new(r"</?[A-Za-z?!][^>]*>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
    static ref HORIZONTAL_WS: Regex = Regex::new(r"[ \t\u{00A0}\u{3000}]+").unwrap();
    static ref EXTRA_BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Normalizes decoded text for the given format.
///
/// Equivalent to [`normalize_with`] with `preserve_formatting = false`.
pub fn normalize(raw: &str, format: FileFormat) -> String {
    normalize_with(raw, format, false)
}

/// Normalizes decoded text for the given format.
///
/// # Arguments
///
/// * `raw` - Decoded text (for `docx`/`epub`, the output of a [`DocumentDecoder`](crate::decoder::DocumentDecoder))
/// * `format` - Declared format of the source
/// * `preserve_formatting` - When `true`, Markdown markup is kept and only the plain-text rules apply
///
/// # Returns
///
/// * `String` - Text ready for chapter boundary detection
pub fn normalize_with(raw: &str, format: FileFormat, preserve_formatting: bool) -> String {
    match format {
        FileFormat::Txt => normalize_plain(raw),
        FileFormat::Md if preserve_formatting => normalize_plain(raw),
        FileFormat::Md => normalize_markdown(raw),
        FileFormat::Docx | FileFormat::Epub => normalize_prose(raw),
    }
}

/// Plain-text rules: leading BOM dropped, LF line endings, tabs expanded, trailing
/// whitespace stripped, trimmed.
pub fn normalize_plain(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let tab = " ".repeat(TAB_WIDTH);
    unified
        .split('\n')
        .map(|line| line.replace('\t', &tab).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Plain-text rules plus removal of Markdown markup, repeated until the text is stable.
pub fn normalize_markdown(raw: &str) -> String {
    // Stripping only ever removes characters, so this reaches a fixpoint
    let mut current = normalize_plain(raw);
    loop {
        let next = normalize_plain(&strip_markdown(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One pass of Markdown stripping: headings, emphasis, links, inline code, block quotes,
/// list markers and code fences. Thematic breaks are preserved.
pub fn strip_markdown(text: &str) -> String {
    text.split('\n')
        .filter(|line| !MD_CODE_FENCE.is_match(line))
        .map(strip_markdown_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_markdown_line(line: &str) -> String {
    if MD_THEMATIC_BREAK.is_match(line) {
        return line.to_string();
    }

    let is_heading = line.trim_start().starts_with('#');
    let mut out: Cow<str> = MD_LINE_PREFIX.replace(line, "");
    if is_heading {
        out = Cow::Owned(MD_HEADING_SUFFIX.replace(&out, "").into_owned());
    }

    let mut out = out.into_owned();
    for re in [
        &*MD_LINK,
        &*MD_INLINE_CODE,
        &*MD_STRONG_STAR,
        &*MD_STRONG_UNDERSCORE,
        &*MD_STRIKE,
        &*MD_EM_STAR,
        &*MD_EM_UNDERSCORE,
    ] {
        out = re.replace_all(&out, "${1}").into_owned();
    }
    out
}

/// Rules for text coming out of a DOCX/EPUB decoder: markup and entities removed,
/// horizontal whitespace collapsed, at most one blank line between paragraphs.
pub fn normalize_prose(raw: &str) -> String {
    let stripped = strip_markup(raw);
    let unified = stripped.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = unified
        .split('\n')
        .map(|line| HORIZONTAL_WS.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    EXTRA_BLANK_LINES
        .replace_all(&collapsed, "\n\n")
        .trim()
        .to_string()
}

/// Removes XML/HTML markup, turning block-level closings into line breaks and decoding entities.
pub fn strip_markup(markup: &str) -> String {
    let text = MARKUP_COMMENT.replace_all(markup, "");
    let text = MARKUP_INVISIBLE.replace_all(&text, "");
    let text = MARKUP_BREAK.replace_all(&text, "\n");
    let text = MARKUP_TAB.replace_all(&text, "\t");
    let text = MARKUP_TAG.replace_all(&text, "");
    decode_entities(&text)
}

/// Decodes named and numeric character references in a single pass.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        _ => return None,
    };
    Some(c)
}

/// Best-effort encoding classifier for a byte sample.
///
/// BOM markers are checked first (`utf-8-bom`, `utf-16be`, `utf-16le`), then the sample is
/// tested for UTF-8 validity, then for GBK-encoded CJK text. Anything else is reported as
/// `windows-1252`. Callers may override the result via configuration.
pub fn detect_encoding(sample: &[u8]) -> &'static str {
    if sample.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "utf-8-bom";
    }
    if sample.starts_with(&[0xFE, 0xFF]) {
        return "utf-16be";
    }
    if sample.starts_with(&[0xFF, 0xFE]) {
        return "utf-16le";
    }

    match std::str::from_utf8(sample) {
        Ok(_) => return "utf-8",
        // A sample cut in the middle of a multi-byte sequence is still UTF-8
        Err(e) if e.error_len().is_none() => return "utf-8",
        Err(_) => {}
    }

    let looks_like_gbk = encoding_rs::GBK
        .decode_without_bom_handling_and_without_replacement(sample)
        .map(|text| text.chars().any(is_cjk_ideograph))
        .unwrap_or(false);
    if looks_like_gbk {
        return "gbk";
    }

    "windows-1252"
}

fn is_cjk_ideograph(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// Text decoded from raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedText {
    pub text: String,
    /// Label the bytes were decoded with.
    pub encoding: String,
    /// Whether malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Resolves an encoding label (including `utf-8-bom`) to an `encoding_rs` encoding.
pub fn encoding_for_label(label: &str) -> Result<&'static encoding_rs::Encoding> {
    match label.trim().to_ascii_lowercase().as_str() {
        "utf-8-bom" | "utf8-bom" => Ok(encoding_rs::UTF_8),
        other => encoding_rs::Encoding::for_label(other.as_bytes())
            .ok_or_else(|| Error::Encoding(format!("Unknown encoding label '{}'", label))),
    }
}

/// Decodes bytes with the given encoding label. A leading BOM is stripped.
pub fn decode_bytes(bytes: &[u8], label: &str) -> Result<DecodedText> {
    let encoding = encoding_for_label(label)?;
    let (text, _used, had_errors) = encoding.decode(bytes);
    Ok(DecodedText {
        text: text.into_owned(),
        encoding: label.to_string(),
        had_errors,
    })
}
