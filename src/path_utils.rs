//! File name utilities for source handling.
//!
//! This module provides helpers for working with source file names safely: lossy name
//! extraction, extension lookup, hidden-file detection and turning a file name into a
//! readable fallback title.

use std::path::Path;

/// Gets the file name from a path with fallback to lossy conversion.
///
/// # Arguments
///
/// * `path` - The path to extract the file name from
///
/// # Returns
///
/// * `String` - The file name, using lossy conversion if necessary
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Checks if a filename starts with a dot (hidden file) using safe conversion.
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Returns the lowercase extension of a file name, without the dot.
///
/// Names that start with a dot and have no other dot (e.g. `.profile`) have no extension.
pub fn extension_lowercase(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Returns the file name without its final extension.
pub fn file_stem_lossy(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string())
}

/// Turns a file name into a readable title.
///
/// The extension is stripped, `_`, `-` and `.` separators become spaces and runs of
/// whitespace are collapsed. Falls back to `"Untitled"` for names with no usable characters.
///
/// # Arguments
///
/// * `file_name` - The file name to convert (e.g. `"my_great-novel.txt"`)
///
/// # Returns
///
/// * `String` - The derived title (e.g. `"my great novel"`)
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = file_stem_lossy(file_name);
    let title = stem
        .chars()
        .map(|c| match c {
            '_' | '-' | '.' => ' ',
            c => c,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}
