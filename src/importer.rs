use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;

use crate::collector::Collector;
use crate::decoder::{ArchiveDecoder, DocumentDecoder};
use crate::error::{Error, Result};
use crate::filter::{ContentFilterPipeline, FilterOutcome};
use crate::metadata::compute_import_metadata;
use crate::normalizer::{decode_bytes, detect_encoding, encoding_for_label, normalize_with};
use crate::patterns::{ChapterPattern, PatternLibrary};
use crate::processor::TextProcessor;
use crate::splitter::{ChapterSplitter, chapters_from_drafts};
use crate::types::{
    AiProcessingOptions, BatchImportResult, BatchSummary, FileFormat, ImportError,
    ImportResult, ImportedChapter, ProcessingProgress, ProcessingStage, SourceData, SourceFile,
    SplitMethod, SplitOptions,
};

/// How many leading bytes are inspected when guessing the encoding of a text file.
const ENCODING_SAMPLE_SIZE: usize = 64 * 1024;

/// Callback receiving progress reports while files are imported.
pub type ProgressCallback = Arc<dyn Fn(&ProcessingProgress) + Send + Sync + 'static>;

fn default_max_concurrent_imports() -> usize {
    num_cpus::get().clamp(1, 8)
}

fn default_document_decoder() -> Option<Arc<dyn DocumentDecoder>> {
    Some(Arc::new(ArchiveDecoder))
}

/// The import configuration, built declaratively using the builder pattern.
///
/// This struct carries every option of an import together with the collaborators the
/// pipeline may call: the [`PatternLibrary`] used for auto-detection, the
/// [`DocumentDecoder`] for DOCX/EPUB sources and the optional [`TextProcessor`]. Once built
/// it can run imports through:
///
/// - [`import_file`](ImportConfig::import_file): one source, always returns a well-formed result
/// - [`import_batch`](ImportConfig::import_batch): many sources, imported concurrently
/// - [`import_directory`](ImportConfig::import_directory): every manuscript file of a directory
///
/// ## Builder Pattern
///
/// ```rust,no_run
/// # use chapterwise::prelude::*;
/// let config = ImportConfig::builder()
///     .split_options(SplitOptions::by_word_count(1500))
///     .preserve_formatting(true)
///     .build()
///     .expect("Invalid configuration");
/// ```
#[derive(Clone, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct ImportConfig {
    /// Format used when a source's own format is unknown.
    #[builder(default)]
    pub file_format: Option<FileFormat>,

    /// Encoding label (e.g. `"utf-8"`, `"gbk"`, `"windows-1252"`) overriding detection
    /// for txt/md byte sources.
    #[builder(default)]
    pub encoding: Option<String>,

    /// Whether to split into chapters at all. When `false` every file becomes one chapter.
    #[builder(default = "true")]
    pub auto_split: bool,

    /// Splitting strategy and its parameters.
    #[builder(default)]
    pub split_options: SplitOptions,

    /// Whether to run the post-processing stage described by `ai_processing_options`.
    #[builder(default)]
    pub ai_processing: bool,

    #[builder(default)]
    pub ai_processing_options: AiProcessingOptions,

    /// Keep Markdown markup in `md` sources instead of stripping it.
    #[builder(default)]
    pub preserve_formatting: bool,

    /// Advisory: callers may group the imported chapters into parts/volumes.
    #[builder(default)]
    pub create_hierarchy: bool,

    /// Size in bytes above which a `size` error is recorded. The import still proceeds.
    #[builder(default)]
    pub max_file_size: Option<u64>,

    /// Upper bound on files imported at the same time in a batch.
    #[builder(default = "default_max_concurrent_imports()")]
    pub max_concurrent_imports: usize,

    /// Patterns walked during chapter auto-detection.
    #[builder(default)]
    pub pattern_library: PatternLibrary,

    /// Decoder for DOCX/EPUB sources. Defaults to [`ArchiveDecoder`].
    #[builder(default = "default_document_decoder()")]
    pub document_decoder: Option<Arc<dyn DocumentDecoder>>,

    /// Optional AI collaborator for splitting, rewriting, enhancement and translation.
    #[builder(default)]
    pub text_processor: Option<Arc<dyn TextProcessor>>,

    #[builder(default)]
    pub progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportConfig")
            .field("file_format", &self.file_format)
            .field("encoding", &self.encoding)
            .field("auto_split", &self.auto_split)
            .field("split_options", &self.split_options)
            .field("ai_processing", &self.ai_processing)
            .field("ai_processing_options", &self.ai_processing_options)
            .field("preserve_formatting", &self.preserve_formatting)
            .field("create_hierarchy", &self.create_hierarchy)
            .field("max_file_size", &self.max_file_size)
            .field("max_concurrent_imports", &self.max_concurrent_imports)
            .field("pattern_library", &self.pattern_library.len())
            .field(
                "document_decoder",
                if self.document_decoder.is_some() {
                    &"Some(DocumentDecoder)"
                } else {
                    &"None"
                },
            )
            .field(
                "text_processor",
                if self.text_processor.is_some() {
                    &"Some(TextProcessor)"
                } else {
                    &"None"
                },
            )
            .field(
                "progress_callback",
                if self.progress_callback.is_some() {
                    &"Some(Function)"
                } else {
                    &"None"
                },
            )
            .finish()
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            file_format: None,
            encoding: None,
            auto_split: true,
            split_options: SplitOptions::default(),
            ai_processing: false,
            ai_processing_options: AiProcessingOptions::default(),
            preserve_formatting: false,
            create_hierarchy: false,
            max_file_size: None,
            max_concurrent_imports: default_max_concurrent_imports(),
            pattern_library: PatternLibrary::default(),
            document_decoder: default_document_decoder(),
            text_processor: None,
            progress_callback: None,
        }
    }
}

impl ImportConfig {
    /// Creates a new builder for configuring `ImportConfig`.
    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder::default()
    }

    /// Performs validation checks on a built configuration.
    ///
    /// The builder already runs these checks; this is useful after fields of a built
    /// configuration were changed directly.
    ///
    /// # Returns
    ///
    /// * `Ok(&self)` - Configuration is valid
    /// * `Err(Error)` - The split pattern, group indices or limits are invalid
    pub fn preflight_check(&self) -> Result<&Self> {
        check_split_options(&self.split_options).map_err(Error::Content)?;
        if self.max_concurrent_imports == 0 {
            return Err(Error::Other(
                "max_concurrent_imports must be at least 1".to_string(),
            ));
        }
        if let Some(label) = &self.encoding {
            encoding_for_label(label)?;
        }
        Ok(self)
    }

    // --- Single file ---

    /// Imports one source file.
    ///
    /// Runs decoding, normalization, chapter splitting, the optional post-processing
    /// stage and metadata computation. Never fails: any fatal stage error is reported
    /// through a result with `success == false` and no chapters. Advisory problems
    /// (size limit, malformed bytes, filter errors) are listed in `errors` of a
    /// successful result.
    ///
    /// # Arguments
    ///
    /// * `source` - The file to import
    ///
    /// # Returns
    ///
    /// * `ImportResult` - Chapters, errors and metadata of the import
    pub async fn import_file(&self, source: SourceFile) -> ImportResult {
        let started = Instant::now();
        let mut errors = Vec::new();

        match self.run_import(&source, started, &mut errors).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Import of '{}' failed: {}", source.name, e);
                errors.push(ImportError::from(&e));
                let encoding = self.encoding.as_deref().unwrap_or("unknown");
                ImportResult {
                    success: false,
                    chapters: Vec::new(),
                    errors,
                    metadata: compute_import_metadata(
                        &source.name,
                        source.size,
                        "",
                        encoding,
                        started,
                    ),
                    flags: Vec::new(),
                }
            }
        }
    }

    async fn run_import(
        &self,
        source: &SourceFile,
        started: Instant,
        errors: &mut Vec<ImportError>,
    ) -> Result<ImportResult> {
        self.report(ProcessingStage::Uploading, 0, "Reading source", &source.name);

        let format = source.format.or(self.file_format).ok_or_else(|| {
            Error::Format(format!(
                "Cannot determine the format of '{}' (supported: txt, md, docx, epub)",
                source.name
            ))
        })?;

        if let Some(limit) = self.max_file_size {
            if source.size > limit {
                let error = Error::Size(format!(
                    "'{}' is {} bytes, above the configured limit of {} bytes",
                    source.name, source.size, limit
                ));
                log::warn!("{}", error);
                errors.push(ImportError::from(&error));
            }
        }

        self.report(ProcessingStage::Parsing, 20, "Decoding and normalizing", &source.name);
        let (raw, encoding) = self.decode_source(source, format, errors).await?;
        let text = normalize_with(&raw, format, self.preserve_formatting);
        log::debug!(
            "Normalized '{}' ({}, {}): {} bytes of text",
            source.name,
            format,
            encoding,
            text.len()
        );

        self.report(ProcessingStage::Splitting, 50, "Splitting into chapters", &source.name);
        let chapters = self.split(&text).await?;

        let FilterOutcome {
            chapters,
            flags,
            errors: filter_errors,
        } = if self.ai_processing {
            self.report(ProcessingStage::AiProcessing, 70, "Post-processing chapters", &source.name);
            self.post_process(chapters).await
        } else {
            FilterOutcome {
                chapters,
                ..FilterOutcome::default()
            }
        };
        errors.extend(filter_errors);

        self.report(ProcessingStage::Saving, 90, "Computing metadata", &source.name);
        let metadata = compute_import_metadata(&source.name, source.size, &text, &encoding, started);
        log::info!(
            "Imported '{}': {} chapter(s), {} words in {} ms",
            source.name,
            chapters.len(),
            metadata.total_words,
            metadata.processing_time
        );
        self.report(
            ProcessingStage::Saving,
            100,
            &format!("Imported {} chapter(s)", chapters.len()),
            &source.name,
        );

        Ok(ImportResult {
            success: true,
            chapters,
            errors: std::mem::take(errors),
            metadata,
            flags,
        })
    }

    /// Turns a source into raw text and the label of the encoding it was read with.
    async fn decode_source(
        &self,
        source: &SourceFile,
        format: FileFormat,
        errors: &mut Vec<ImportError>,
    ) -> Result<(String, String)> {
        match &source.data {
            SourceData::Text(text) => Ok((text.clone(), "utf-8".to_string())),
            SourceData::Bytes(bytes) if format.is_archive() => {
                let decoder = self.document_decoder.as_ref().ok_or_else(|| {
                    Error::Parse(format!("No decoder is available for {} files", format))
                })?;
                let text = decoder.decode(format, bytes).await.map_err(|e| {
                    Error::Parse(format!("Could not decode '{}': {}", source.name, e))
                })?;
                Ok((text, "utf-8".to_string()))
            }
            SourceData::Bytes(bytes) => self.decode_text_bytes(bytes, errors),
        }
    }

    fn decode_text_bytes(
        &self,
        bytes: &[u8],
        errors: &mut Vec<ImportError>,
    ) -> Result<(String, String)> {
        let detected = detect_encoding(&bytes[..bytes.len().min(ENCODING_SAMPLE_SIZE)]);

        let label = match &self.encoding {
            Some(requested) => {
                let requested_encoding = encoding_for_label(requested)?;
                let has_bom = matches!(detected, "utf-8-bom" | "utf-16be" | "utf-16le");
                if has_bom && encoding_for_label(detected)? != requested_encoding {
                    // The byte-order mark decides how the bytes are decoded
                    let error = Error::Encoding(format!(
                        "Configured encoding '{}' does not match the byte-order mark ({}); decoding as {}",
                        requested, detected, detected
                    ));
                    log::warn!("{}", error);
                    errors.push(ImportError::from(&error));
                    detected.to_string()
                } else {
                    requested.clone()
                }
            }
            None => detected.to_string(),
        };

        let decoded = decode_bytes(bytes, &label)?;
        if decoded.had_errors {
            let error = Error::Encoding(format!(
                "Malformed {} byte sequences were replaced",
                decoded.encoding
            ));
            log::warn!("{}", error);
            errors.push(ImportError::from(&error));
        }
        Ok((decoded.text, decoded.encoding))
    }

    /// Splits normalized text according to the configured options.
    async fn split(&self, text: &str) -> Result<Vec<ImportedChapter>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut options = self.split_options.clone();
        if !self.auto_split {
            options.method = SplitMethod::Manual;
        }

        if options.method == SplitMethod::Ai {
            if let Some(chapters) = self.split_with_processor(text).await {
                return Ok(chapters);
            }
        }

        ChapterSplitter::new(&self.pattern_library).split(text, &options)
    }

    /// Asks the text processor for chapters. `None` means the pattern fallback applies.
    async fn split_with_processor(&self, text: &str) -> Option<Vec<ImportedChapter>> {
        let processor = self.text_processor.as_ref()?;
        match processor.split_chapters(text).await {
            Ok(drafts) => {
                let chapters = chapters_from_drafts(drafts);
                if chapters.is_empty() {
                    log::warn!("Text processor proposed no chapters, using pattern splitting");
                    None
                } else {
                    Some(chapters)
                }
            }
            Err(e) => {
                log::warn!("AI splitting unavailable ({}), using pattern splitting", e);
                None
            }
        }
    }

    /// Moderation, then enhancement, then translation. Each step is skipped when its
    /// collaborator is missing or fails.
    async fn post_process(&self, chapters: Vec<ImportedChapter>) -> FilterOutcome {
        let options = &self.ai_processing_options;

        let mut outcome = if options.enable_content_moderation {
            ContentFilterPipeline::new(options.content_filters.clone())
                .with_rewriter(self.text_processor.clone())
                .apply(chapters)
                .await
        } else {
            FilterOutcome {
                chapters,
                ..FilterOutcome::default()
            }
        };

        let Some(processor) = &self.text_processor else {
            if options.enable_content_enhancement || options.enable_translation {
                log::debug!("No text processor configured, skipping enhancement and translation");
            }
            return outcome;
        };

        if options.enable_content_enhancement {
            for chapter in outcome.chapters.iter_mut() {
                match processor
                    .enhance(&chapter.content, options.enhancement_level, options.preserve_style)
                    .await
                {
                    Ok(text) => chapter.content = text,
                    Err(Error::Unsupported(_)) => {
                        log::debug!("Text processor does not support enhancement");
                        break;
                    }
                    Err(e) => log::warn!("Enhancement of '{}' failed: {}", chapter.title, e),
                }
            }
        }

        if options.enable_translation {
            match options.target_language.as_deref() {
                Some(target) => {
                    for chapter in outcome.chapters.iter_mut() {
                        match processor.translate(&chapter.content, target).await {
                            Ok(text) => chapter.content = text,
                            Err(Error::Unsupported(_)) => {
                                log::debug!("Text processor does not support translation");
                                break;
                            }
                            Err(e) => {
                                log::warn!("Translation of '{}' failed: {}", chapter.title, e)
                            }
                        }
                    }
                }
                None => log::warn!("Translation is enabled but no target language is set"),
            }
        }

        outcome
    }

    fn report(&self, stage: ProcessingStage, progress: u8, message: &str, item: &str) {
        log::debug!("[{:?} {}%] {}: {}", stage, progress, item, message);
        if let Some(callback) = &self.progress_callback {
            let mut report = ProcessingProgress::new(stage, progress, message);
            report.current_item = Some(item.to_string());
            callback(&report);
        }
    }

    // --- Batch ---

    /// Imports many files concurrently.
    ///
    /// Every file runs through [`import_file`](ImportConfig::import_file) on its own task,
    /// at most `max_concurrent_imports` at a time. Successful files become
    /// [`ImportedStory`](crate::types::ImportedStory)s, reported in input order; the errors
    /// of failed files are gathered in `errors`, tagged with the file name. The batch
    /// succeeds when at least one file was imported.
    ///
    /// The progress callback receives one report per completed file instead of the
    /// per-stage reports of single imports.
    pub async fn import_batch(&self, files: Vec<SourceFile>) -> BatchImportResult {
        let started = Instant::now();
        let total_files = files.len();
        if total_files == 0 {
            return BatchImportResult::default();
        }
        log::info!("Starting batch import of {} file(s)", total_files);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_imports.max(1)));
        let mut worker = self.clone();
        worker.progress_callback = None;
        let worker = Arc::new(worker);

        let mut tasks = FuturesUnordered::new();
        for (index, file) in files.into_iter().enumerate() {
            let name = file.name.clone();
            let semaphore = Arc::clone(&semaphore);
            let config = Arc::clone(&worker);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await?;
                Result::Ok(config.import_file(file).await)
            });
            tasks.push(async move { (index, name, handle.await) });
        }

        let mut outcomes: Vec<Option<(String, ImportResult)>> = (0..total_files).map(|_| None).collect();
        let mut completed = 0;

        while let Some((index, name, joined)) = tasks.next().await {
            let result = match joined.map_err(Error::from).and_then(|inner| inner) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("Import task for '{}' did not complete: {}", name, e);
                    ImportResult {
                        success: false,
                        chapters: Vec::new(),
                        errors: vec![ImportError::from(&e)],
                        metadata: compute_import_metadata(&name, 0, "", "unknown", started),
                        flags: Vec::new(),
                    }
                }
            };
            completed += 1;
            self.report_batch(started, completed, total_files, &name);
            outcomes[index] = Some((name, result));
        }

        let mut batch = BatchImportResult::default();
        for (name, result) in outcomes.into_iter().flatten() {
            if result.success {
                for advisory in &result.errors {
                    log::warn!("'{}': {}", name, advisory.message);
                }
                batch.stories.extend(result.into_story(name));
            } else {
                batch
                    .errors
                    .extend(result.errors.into_iter().map(|e| e.for_file(name.clone())));
                batch.summary.failed_files += 1;
            }
        }

        batch.summary = BatchSummary {
            total_files,
            successful_files: batch.stories.len(),
            failed_files: batch.summary.failed_files,
            total_processing_time: started.elapsed().as_millis() as u64,
        };
        batch.success = batch.summary.successful_files > 0;
        log::info!(
            "Batch import finished: {}/{} file(s) imported in {} ms",
            batch.summary.successful_files,
            total_files,
            batch.summary.total_processing_time
        );
        batch
    }

    fn report_batch(&self, started: Instant, completed: usize, total: usize, item: &str) {
        let Some(callback) = &self.progress_callback else {
            return;
        };
        let remaining = (total - completed) as u32;
        let estimated = started
            .elapsed()
            .checked_div(completed as u32)
            .map(|per_file| per_file * remaining);

        let mut report = ProcessingProgress::new(
            ProcessingStage::Parsing,
            (completed * 100 / total) as u8,
            format!("Imported {} of {} files", completed, total),
        );
        report.current_item = Some(item.to_string());
        report.estimated_time_remaining = estimated;
        callback(&report);
    }

    // --- Directory ---

    /// Imports every manuscript file (`.txt`, `.md`, `.docx`, `.epub`) of a directory.
    ///
    /// Files are read concurrently and imported as one batch, in natural name order.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchImportResult)` - The batch result
    /// * `Err(Error)` - The directory does not exist or a file could not be read
    pub async fn import_directory(&self, directory: &Path) -> Result<BatchImportResult> {
        let sources = Collector::new(directory)
            .with_max_concurrent_reads(self.max_concurrent_imports)
            .load_sources()
            .await?;
        Ok(self.import_batch(sources).await)
    }
}

/// Shared checks of the builder and [`ImportConfig::preflight_check`].
fn check_split_options(options: &SplitOptions) -> std::result::Result<(), String> {
    if options.word_count == Some(0) {
        return Err("word_count must be at least 1".to_string());
    }
    if let Some(pattern) = &options.pattern {
        ChapterPattern::from_user_pattern(pattern, options.title_group, options.content_group)
            .map_err(|e| e.to_string())?;
    } else if options.title_group.is_some() || options.content_group.is_some() {
        log::debug!("title_group/content_group only apply to an explicit split pattern");
    }
    Ok(())
}

impl ImportConfigBuilder {
    /// Removes the DOCX/EPUB decoder; such sources then fail with a `parse` error.
    pub fn no_document_decoder(&mut self) -> &mut Self {
        self.document_decoder = Some(None);
        self
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(options) = &self.split_options {
            check_split_options(options)?;
        }
        if let Some(0) = self.max_concurrent_imports {
            return Err("max_concurrent_imports must be at least 1".to_string());
        }
        if let Some(Some(label)) = &self.encoding {
            encoding_for_label(label).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
