//! Structure-preserving translation of rendered chapter markup.
//!
//! Atomic constructs are swapped for placeholder tokens, leaf text containers
//! are lifted out and sent one by one to a [`Translator`], and the markup is
//! rebuilt around the results. A failing span keeps its original text; it
//! never aborts the chapter.

pub mod chunking;
pub mod languages;
pub mod placeholders;

use crate::config::TranslationConfig;
use crate::error::TranslationError;
use crate::types::{RenderedChapter, TranslationStats};
use placeholders::Skeleton;
use rayon::prelude::*;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// External text translation collaborator. May fail per call.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslationError>;

    fn name(&self) -> &str {
        "translator"
    }

    /// Distinguishes outputs of differently configured services in the conversion cache
    fn identity(&self) -> String {
        self.name().to_string()
    }
}

pub struct StructurePreservingTranslator<'a> {
    translator: &'a dyn Translator,
    config: &'a TranslationConfig,
}

impl<'a> StructurePreservingTranslator<'a> {
    pub fn new(translator: &'a dyn Translator, config: &'a TranslationConfig) -> Self {
        Self { translator, config }
    }

    /// Translate chapters, optionally in parallel. Chapter order is kept.
    pub fn translate_chapters(&self, chapters: &[RenderedChapter]) -> (Vec<RenderedChapter>, TranslationStats) {
        info!(
            "🌐 Translating {} chapters {} → {} via {}",
            chapters.len(),
            self.config.source_language,
            self.config.target_language,
            self.translator.name()
        );

        let results: Vec<(RenderedChapter, TranslationStats)> = if self.config.parallel_chapters {
            chapters.par_iter().map(|c| self.translate_chapter(c)).collect()
        } else {
            chapters.iter().map(|c| self.translate_chapter(c)).collect()
        };

        let mut stats = TranslationStats::default();
        let mut translated = Vec::with_capacity(results.len());
        for (chapter, chapter_stats) in results {
            stats.absorb(&chapter_stats);
            translated.push(chapter);
        }

        info!(
            "✅ Translation finished: {}/{} spans translated, {} kept original",
            stats.translated, stats.spans, stats.failed
        );
        (translated, stats)
    }

    /// Title and markup of one chapter.
    pub fn translate_chapter(&self, chapter: &RenderedChapter) -> (RenderedChapter, TranslationStats) {
        let mut stats = TranslationStats::default();
        let mut calls = 0usize;

        let title = if self.is_translatable(&chapter.title) {
            stats.spans += 1;
            match self.translate_span(&chapter.title, &mut calls) {
                Some(text) => {
                    stats.translated += 1;
                    text
                }
                None => {
                    stats.failed += 1;
                    chapter.title.clone()
                }
            }
        } else {
            chapter.title.clone()
        };

        let (markup, markup_stats) = self.translate_markup_counting(&chapter.markup, &mut calls);
        stats.absorb(&markup_stats);

        (RenderedChapter { title, markup }, stats)
    }

    /// Translate the text of `markup`, leaving every tag and attribute untouched.
    pub fn translate_markup(&self, markup: &str) -> (String, TranslationStats) {
        let mut calls = 0usize;
        self.translate_markup_counting(markup, &mut calls)
    }

    fn translate_markup_counting(&self, markup: &str, calls: &mut usize) -> (String, TranslationStats) {
        let skeleton = Skeleton::extract(markup, self.config.min_text_chars);
        let mut stats = TranslationStats::default();

        if skeleton.spans.is_empty() {
            return (markup.to_string(), stats);
        }

        let mut translations = Vec::with_capacity(skeleton.spans.len());
        for span in &skeleton.spans {
            stats.spans += 1;
            let translated = self.translate_span(&span.text, calls);
            if translated.is_some() {
                stats.translated += 1;
            } else {
                stats.failed += 1;
            }
            translations.push(translated);
        }

        (skeleton.reassemble(&translations), stats)
    }

    fn is_translatable(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.config.min_text_chars
    }

    /// One span, chunked when oversized. `None` means keep the original.
    fn translate_span(&self, text: &str, calls: &mut usize) -> Option<String> {
        let chunks = chunking::split_into_chunks(text, self.config.max_chunk_chars);
        let mut pieces = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            match self.call(&chunk.text, calls) {
                Ok(piece) => pieces.push(piece),
                Err(e) => {
                    warn!("⚠️  Keeping original text for span {:?}: {}", preview(text), e);
                    return None;
                }
            }
        }

        Some(chunking::join_chunks(&chunks, &pieces))
    }

    fn call(&self, text: &str, calls: &mut usize) -> Result<String, TranslationError> {
        if *calls > 0 && self.config.inter_call_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.inter_call_delay_ms));
        }
        *calls += 1;

        debug!("translating {} chars", text.chars().count());
        let translated = self.translator.translate(
            text,
            &self.config.source_language,
            &self.config.target_language,
        )?;

        if translated.trim().is_empty() {
            return Err(TranslationError::MalformedResponse(
                "empty translation".to_string(),
            ));
        }
        Ok(translated)
    }
}

fn preview(text: &str) -> String {
    let short: String = text.chars().take(40).collect();
    if short.len() < text.len() {
        format!("{}…", short)
    } else {
        short
    }
}
