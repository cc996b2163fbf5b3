//! Manuscript file collection from a directory.
//!
//! This module scans a directory for importable manuscript files (`.txt`, `.md`, `.docx`,
//! `.epub`), orders them naturally by the numbers in their names and loads them
//! concurrently into [`SourceFile`]s ready for a batch import.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use tokio::fs::{ReadDir, read_dir};
use tokio::spawn;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::path_utils::{file_stem_lossy, get_file_name_lossy, is_hidden_file};
use crate::types::{FileFormat, SourceFile};

/// Limits the number of files read at the same time
const MAX_CONCURRENT_READS: usize = 64;

lazy_static! {
    /// Default Regex pattern for extracting numeric values from file names.
    /// Matches "001", "1", "1.5" etc.
    pub static ref DEFAULT_NUMBER_REGEX: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
}

/// Collects manuscript files from a single directory.
#[derive(Debug)]
pub struct Collector<'a> {
    base_directory: &'a Path,
    max_concurrent_reads: usize,
}

impl<'a> Collector<'a> {
    /// Creates a new Collector instance for the specified directory.
    ///
    /// # Arguments
    ///
    /// * `base_directory` - Directory holding the manuscript files
    pub fn new(base_directory: &'a Path) -> Self {
        Self {
            base_directory,
            max_concurrent_reads: MAX_CONCURRENT_READS,
        }
    }

    /// Caps how many files are read concurrently. Values below 1 are raised to 1.
    pub fn with_max_concurrent_reads(mut self, max_concurrent_reads: usize) -> Self {
        self.max_concurrent_reads = max_concurrent_reads.max(1);
        self
    }

    /// Lists the importable files of the base directory in natural order.
    ///
    /// Hidden entries, sub-directories and files without a supported extension are skipped.
    ///
    /// # Returns
    ///
    /// * `Result<Vec<PathBuf>>` - Paths of the manuscript files
    pub async fn collect_files(&self) -> Result<Vec<PathBuf>> {
        if !self.base_directory.is_dir() {
            return Err(Error::NotFound(format!(
                "Source directory does not exist: {:?}",
                self.base_directory
            )));
        }

        let mut files = Vec::new();
        let mut entries: ReadDir = read_dir(self.base_directory).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_hidden_file(&path) || path.is_dir() {
                continue;
            }
            if FileFormat::from_file_name(&get_file_name_lossy(&path)).is_none() {
                log::debug!("Skipping unsupported file {:?}", path);
                continue;
            }
            files.push(path);
        }

        files.par_sort_by(|a, b| Self::sort_name_by_number_default(a, b));
        log::debug!(
            "Collected {} manuscript file(s) from {:?}",
            files.len(),
            self.base_directory
        );
        Ok(files)
    }

    /// Collects and reads every manuscript file of the base directory.
    ///
    /// Files are read concurrently; the returned sources keep the natural order of
    /// [`collect_files`](Collector::collect_files). A file that cannot be read fails the
    /// whole collection.
    pub async fn load_sources(&self) -> Result<Vec<SourceFile>> {
        let files = self.collect_files().await?;
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_reads));

        let handles: Vec<JoinHandle<Result<SourceFile>>> = files
            .into_iter()
            .map(|path| {
                let semaphore = Arc::clone(&semaphore);
                spawn(async move {
                    let _permit = semaphore.acquire().await?;
                    SourceFile::from_path(&path).await
                })
            })
            .collect();

        // try_join_all keeps input order
        try_join_all(handles).await?.into_iter().collect()
    }

    /// Extracts the last number in a file stem, if any.
    pub fn number_in_name(path: &Path) -> Option<f64> {
        let stem = file_stem_lossy(&get_file_name_lossy(path));
        DEFAULT_NUMBER_REGEX
            .find_iter(&stem)
            .last()
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    /// Sorts paths by the numbers found in their names, then by name.
    ///
    /// Files without a number come first, matching `Option` ordering.
    pub fn sort_name_by_number_default(a: &Path, b: &Path) -> Ordering {
        let an = Self::number_in_name(a);
        let bn = Self::number_in_name(b);

        an.partial_cmp(&bn)
            .unwrap_or(Ordering::Equal)
            .then_with(|| get_file_name_lossy(a).cmp(&get_file_name_lossy(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut paths = vec![
            PathBuf::from("dir/part 10.txt"),
            PathBuf::from("dir/part 2.txt"),
            PathBuf::from("dir/notes.md"),
            PathBuf::from("dir/part 1.5.txt"),
        ];
        paths.sort_by(|a, b| Collector::sort_name_by_number_default(a, b));
        let names: Vec<String> = paths.iter().map(|p| get_file_name_lossy(p)).collect();
        assert_eq!(names, vec!["notes.md", "part 1.5.txt", "part 2.txt", "part 10.txt"]);
    }

    #[test]
    fn test_number_in_name_ignores_extension() {
        assert_eq!(Collector::number_in_name(Path::new("ch007.txt")), Some(7.0));
        assert_eq!(Collector::number_in_name(Path::new("vol2-ch3.md")), Some(3.0));
        assert_eq!(Collector::number_in_name(Path::new("story.epub")), None);
    }
}
