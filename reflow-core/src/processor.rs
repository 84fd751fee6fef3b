use crate::cache::{CollaboratorState, ConversionCacheKey, ConversionCacheValue};
use crate::chapters::ChapterAssembler;
use crate::config::ReflowConfig;
use crate::error::{Phase, ReflowError, Result};
use crate::images::{AssetResolver, FsAssetResolver, ImageCorrelator};
use crate::markup::MarkupRenderer;
use crate::rules::validation::ChapterValidator;
use crate::rules::{engine::DebugConfig, LayoutEngine};
use crate::sources::source_for_path;
use crate::storage::{calculate_config_hash, calculate_input_hash, ConversionStorage, FileStorage, NoOpStorage};
use crate::translation::{languages, StructurePreservingTranslator, Translator};
use crate::types::*;
use anyhow::anyhow;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Shared flag checked at every phase boundary of a conversion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Err if cancelled before `phase` starts
    pub fn check(&self, phase: Phase) -> Result<()> {
        if self.is_cancelled() {
            info!("🛑 Conversion cancelled before {}", phase);
            return Err(ReflowError::Cancelled(phase));
        }
        Ok(())
    }
}

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics: lets you inspect/compare each boundary
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStages {
    pub font_statistics: FontStatistics,
    pub layouts: Vec<PageLayout>,
    pub chapters: Vec<Chapter>,
    pub rendered: Vec<RenderedChapter>,
    pub output: ConversionOutput,
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        info!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

pub struct DocumentConverter {
    storage: Box<dyn ConversionStorage + Send + Sync>,
    translator: Option<Box<dyn Translator>>,
    resolver: Box<dyn AssetResolver>,
    engine: LayoutEngine,
    validator: ChapterValidator,
}

impl DocumentConverter {
    /// Create DocumentConverter with full dependency injection
    pub fn new_with_dependencies(
        storage: Box<dyn ConversionStorage + Send + Sync>,
        translator: Option<Box<dyn Translator>>,
        resolver: Box<dyn AssetResolver>,
    ) -> Self {
        Self {
            storage,
            translator,
            resolver,
            engine: LayoutEngine::new(),
            validator: ChapterValidator::new(),
        }
    }

    /// No cache, no translator, assets resolved under the configured root
    pub fn new(config: &ReflowConfig) -> Self {
        Self::new_with_dependencies(
            Box::new(NoOpStorage::new()),
            None,
            Box::new(FsAssetResolver::new(config.images.asset_root.clone())),
        )
    }

    /// Convenience constructor for CLI usage with a file cache
    pub fn new_cli_with_cache(config: &ReflowConfig, cache_dir: &str) -> anyhow::Result<Self> {
        Ok(Self::new_with_dependencies(
            Box::new(FileStorage::new(cache_dir)?),
            None,
            Box::new(FsAssetResolver::new(config.images.asset_root.clone())),
        ))
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.engine.set_debug_config(debug_config);
    }

    /// Convert extractor output into chapters ready for packaging
    pub fn convert(
        &self,
        input: &DocumentInput,
        config: &ReflowConfig,
        cancel: &CancellationToken,
    ) -> Result<ConversionOutput> {
        let mut profiler = StepProfiler::new(false);
        Ok(self.run_stages(input, config, cancel, &mut profiler)?.output)
    }

    /// Process document and capture all intermediate stage outputs
    pub fn convert_capture_stages(
        &self,
        input: &DocumentInput,
        config: &ReflowConfig,
        cancel: &CancellationToken,
    ) -> Result<PipelineStages> {
        let mut profiler = StepProfiler::new(false);
        self.run_stages(input, config, cancel, &mut profiler)
    }

    /// Load a layout file, consult the cache, convert and store the result
    pub fn convert_file(
        &self,
        input_path: &str,
        config: &ReflowConfig,
        enable_profiling: bool,
        skip_cache: bool,
        cancel: &CancellationToken,
    ) -> Result<ConversionOutput> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(enable_profiling);

        let (bytes, input_hash, config_hash) = profiler.time_step("Input Hashing", || {
            let bytes = std::fs::read(input_path)?;
            let input_hash = calculate_input_hash(&bytes);
            let config_hash = calculate_config_hash(config)?;
            Ok::<_, anyhow::Error>((bytes, input_hash, config_hash))
        })?;

        let path = Path::new(input_path);
        let source = source_for_path(path, config.images.min_image_dimension)
            .ok_or_else(|| anyhow!("No layout source understands {}", input_path))?;

        let mut input = profiler.time_step("Load Layout", || source.load(&bytes))?;
        if input.metadata.source_file.is_none() {
            input.metadata.source_file = Some(input_path.to_string());
        }

        // The translator and asset availability shape the output as much as the config does
        let cache_key = profiler.time_step("Cache Key Generation", || {
            let collaborators = self.collaborator_state(&input, config);
            ConversionCacheKey::new(input_hash, config_hash, &collaborators)
        });

        let cached = if skip_cache {
            info!("🚫 Skipping cache lookup (--skip-cache enabled)");
            None
        } else {
            profiler.time_step("Cache Lookup", || self.storage.get_conversion(&cache_key))?
        };

        if let Some(cached) = cached {
            info!("🎯 Cache hit: found conversion for input + config + collaborators");
            profiler.print_summary();
            return Ok(cached.output);
        }

        info!("📄 Converting document: {}", input_path);
        let stages = self.run_stages(&input, config, cancel, &mut profiler)?;
        let output = stages.output;

        if !skip_cache {
            profiler.time_step("Cache Storage", || {
                let processing_time = start_time.elapsed().as_millis() as u64;
                let cache_value = ConversionCacheValue::new(output.clone(), processing_time);
                self.storage.store_conversion(&cache_key, &cache_value)
            })?;
        } else {
            info!("🚫 Skipping cache storage (--skip-cache enabled)");
        }

        profiler.print_summary();
        info!(
            "⏱️  Total processing time: {:.0}ms",
            start_time.elapsed().as_millis()
        );
        Ok(output)
    }

    fn run_stages(
        &self,
        input: &DocumentInput,
        config: &ReflowConfig,
        cancel: &CancellationToken,
        profiler: &mut StepProfiler,
    ) -> Result<PipelineStages> {
        if input.is_blank() {
            warn!("❌ Document has no text and no images");
            return Err(ReflowError::EmptyDocument);
        }

        // Stage 1: Segmentation + classification, page by page
        cancel.check(Phase::Segmentation)?;
        let font_statistics = profiler.time_step("1a. Font Analysis", || self.engine.analyze_fonts(&input.pages));
        let layouts = profiler.time_step("1b. Page Layout", || {
            self.engine.layout_document(&input.pages, &font_statistics, config)
        })?;

        // Stage 2: Chapter assembly + diagnostics
        cancel.check(Phase::Assembly)?;
        let mut chapters = profiler.time_step("2a. Chapter Assembly", || {
            ChapterAssembler::new(&config.assembly).assemble(&layouts)
        });
        if chapters.is_empty() {
            chapters.push(placeholder_chapter(input, config));
        }
        let validation = profiler.time_step("2b. Validation", || self.validator.validate(&chapters));

        // Stage 3: Rendering
        cancel.check(Phase::Rendering)?;
        let renderer = MarkupRenderer::new(&config.renderer, config.assembly.include_header_footer);
        let rendered: Vec<RenderedChapter> = profiler.time_step("3. Rendering", || {
            chapters.iter().map(|c| renderer.render_chapter(c)).collect()
        });

        // Stage 4: Translation (optional)
        let mut final_chapters = rendered.clone();
        let mut translation_stats = None;
        if config.translation.enabled {
            cancel.check(Phase::Translation)?;
            if let Some((translated, stats)) =
                profiler.time_step("4. Translation", || self.translate(&final_chapters, config))
            {
                final_chapters = translated;
                translation_stats = Some(stats);
            }
        }

        // Stage 5: Image correlation (optional)
        let mut cover = None;
        let mut images_inserted = 0;
        let mut images_skipped = 0;
        if config.images.enabled {
            cancel.check(Phase::Correlation)?;
            let outcome = profiler.time_step("5. Image Correlation", || {
                ImageCorrelator::new(&config.images, self.resolver.as_ref()).correlate(&final_chapters, &input.images)
            });
            images_inserted = outcome.inserted;
            images_skipped = outcome.skipped();
            cover = outcome.cover;
            final_chapters = outcome.chapters;
        }

        // Nothing partial leaves the converter, whichever optional phases ran
        cancel.check(Phase::Packaging)?;

        let metadata = package_metadata(input, config, &final_chapters, translation_stats.is_some(), cover);
        let report = ConversionReport {
            page_count: input.pages.len(),
            block_count: chapters.iter().map(|c| c.blocks.len()).sum(),
            chapter_count: final_chapters.len(),
            images_inserted,
            images_skipped,
            translation: translation_stats,
            validation,
        };

        info!(
            "✅ Converted \"{}\": {} pages → {} chapters, {} blocks, {} images",
            metadata.title, report.page_count, report.chapter_count, report.block_count, report.images_inserted
        );

        Ok(PipelineStages {
            font_statistics,
            layouts,
            chapters,
            rendered,
            output: ConversionOutput {
                metadata,
                chapters: final_chapters,
                report,
                created_at: Utc::now(),
            },
        })
    }

    fn collaborator_state(&self, input: &DocumentInput, config: &ReflowConfig) -> CollaboratorState {
        let translator = self.translator.as_deref().filter(|_| config.translation.enabled);
        let resolver: Option<&dyn AssetResolver> = config.images.enabled.then_some(self.resolver.as_ref());
        CollaboratorState::capture(input, translator, resolver)
    }

    /// `None` when translation cannot run for this conversion
    fn translate(
        &self,
        chapters: &[RenderedChapter],
        config: &ReflowConfig,
    ) -> Option<(Vec<RenderedChapter>, TranslationStats)> {
        let settings = &config.translation;
        let Some(translator) = self.translator.as_deref() else {
            warn!("⚠️  Translation enabled but no translator configured, skipping");
            return None;
        };
        if !languages::is_supported(&settings.target_language) {
            warn!(
                "⚠️  Unsupported target language '{}', skipping translation",
                settings.target_language
            );
            return None;
        }
        if !languages::is_valid_source(&settings.source_language) {
            warn!(
                "⚠️  Unsupported source language '{}', skipping translation",
                settings.source_language
            );
            return None;
        }

        info!(
            "🌐 Target language: {}",
            languages::language_name(&settings.target_language)
        );
        Some(StructurePreservingTranslator::new(translator, settings).translate_chapters(chapters))
    }
}

/// Text-free documents still hand one (empty) chapter downstream.
fn placeholder_chapter(input: &DocumentInput, config: &ReflowConfig) -> Chapter {
    let page_number = input
        .pages
        .iter()
        .map(|p| p.page_number)
        .min()
        .or_else(|| input.images.iter().map(|i| i.page_number).min())
        .unwrap_or(1);

    let title = if config.assembly.single_chapter {
        config.assembly.single_chapter_title.clone()
    } else {
        config
            .assembly
            .implicit_title_template
            .replace("{page}", &page_number.to_string())
    };

    info!("📭 No text blocks found, emitting placeholder chapter \"{}\"", title);
    Chapter {
        title,
        blocks: vec![Block {
            block_type: BlockType::Paragraph,
            importance: 0,
            text: String::new(),
            bounding_box: BoundingBox::default(),
            page_number,
            column_index: 0,
            font_size: 0.0,
            runs: Vec::new(),
        }],
    }
}

fn package_metadata(
    input: &DocumentInput,
    config: &ReflowConfig,
    chapters: &[RenderedChapter],
    translated: bool,
    cover: Option<String>,
) -> PackageMetadata {
    let non_empty = |value: &Option<String>| value.as_ref().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let title = non_empty(&input.metadata.title)
        .or_else(|| {
            chapters
                .first()
                .map(|c| c.title.trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| {
            input
                .metadata
                .source_file
                .as_deref()
                .and_then(|f| Path::new(f).file_stem())
                .map(|s| s.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "Document".to_string());

    let language = if translated {
        config.translation.target_language.clone()
    } else {
        non_empty(&input.metadata.language).unwrap_or_else(|| "en".to_string())
    };

    PackageMetadata {
        title,
        author: non_empty(&input.metadata.author).unwrap_or_else(|| "Unknown Author".to_string()),
        language,
        cover,
    }
}
