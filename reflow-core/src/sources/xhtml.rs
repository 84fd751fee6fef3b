//! Positioned-span XHTML source.
//!
//! Reads the page-by-page XHTML that PDF extraction backends emit:
//! - `<div class="page" data-page data-width data-height>` per page
//! - `<span class="fN" data-bbox="x,y,w,h">` per glyph run
//! - `<img data-bbox="x,y,w,h" src="...">` per extracted image
//! - CSS font classes in a `<style>` block
//! - document metadata in `<meta name content>` tags

use super::source::{filter_small_images, has_extension, LayoutSource};
use crate::types::*;
use anyhow::{Context, Result};
use quick_xml::escape::unescape;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

static PAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<div\s+class="page"([^>]*)>(.*?)</div>"#).unwrap());

static SPAN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<span\b([^>]*)>([^<]*)</span>").unwrap());

static IMG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<img\b([^>]*?)/?>").unwrap());

static ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).unwrap());

static META_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+name="([^"]*)"[^>]*content="([^"]*)"[^>]*/?>"#).unwrap()
});

static STYLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<style[^>]*>(.*?)</style>").unwrap());

static FONT_CLASS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([\w-]+)\s*\{([^}]*)\}").unwrap());

const DEFAULT_PAGE_WIDTH: f32 = 612.0;
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;
const DEFAULT_FONT_SIZE: f32 = 12.0;

#[derive(Debug, Clone, PartialEq)]
struct FontClass {
    family: String,
    size: Option<f32>,
}

pub struct XhtmlLayoutSource {
    min_image_dimension: f32,
}

impl XhtmlLayoutSource {
    pub fn new(min_image_dimension: f32) -> Self {
        Self {
            min_image_dimension,
        }
    }

    pub fn parse(&self, xhtml: &str) -> Result<DocumentInput> {
        let metadata = extract_metadata(xhtml);
        let fonts = extract_font_classes(xhtml);

        let mut pages = Vec::new();
        let mut images = Vec::new();

        for (index, page_cap) in PAGE_REGEX.captures_iter(xhtml).enumerate() {
            let attrs = attributes(&page_cap[1]);
            let page_number = attrs
                .get("data-page")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(index as u32 + 1);
            let width = number_attr(&attrs, "data-width").unwrap_or(DEFAULT_PAGE_WIDTH);
            let height = number_attr(&attrs, "data-height").unwrap_or(DEFAULT_PAGE_HEIGHT);
            let body = &page_cap[2];

            let runs = extract_runs(body, page_number, &fonts);
            images.extend(extract_images(body, page_number));
            pages.push(PageContent {
                page_number,
                width,
                height,
                runs,
            });
        }

        let images = filter_small_images(images, self.min_image_dimension);

        info!(
            "✅ XHTML parsing complete: {} pages, {} runs, {} images, {} font classes",
            pages.len(),
            pages.iter().map(|p| p.runs.len()).sum::<usize>(),
            images.len(),
            fonts.len()
        );

        Ok(DocumentInput {
            metadata,
            pages,
            images,
        })
    }
}

impl LayoutSource for XhtmlLayoutSource {
    fn load(&self, bytes: &[u8]) -> Result<DocumentInput> {
        let xhtml = std::str::from_utf8(bytes).context("layout XHTML is not valid UTF-8")?;
        self.parse(xhtml)
    }

    fn name(&self) -> &str {
        "xhtml"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["xhtml", "html", "htm"])
    }
}

fn extract_runs(page_html: &str, page_number: u32, fonts: &HashMap<String, FontClass>) -> Vec<TextGlyphRun> {
    let mut runs = Vec::new();

    for cap in SPAN_REGEX.captures_iter(page_html) {
        let raw = cap[2].trim();
        if raw.is_empty() {
            continue;
        }
        let attrs = attributes(&cap[1]);
        let Some([x, y, width, height]) = attrs.get("data-bbox").and_then(|b| parse_bbox(b)) else {
            warn!("⚠️  Span without usable data-bbox on page {}: {:?}", page_number, raw);
            continue;
        };

        let font = attrs
            .get("class")
            .and_then(|classes| classes.split_whitespace().find_map(|c| fonts.get(c)));
        let font_size = font
            .and_then(|f| f.size)
            .or((height > 0.0).then_some(height))
            .unwrap_or(DEFAULT_FONT_SIZE);

        let text = unescape(raw).map(|t| t.into_owned()).unwrap_or_else(|_| raw.to_string());
        runs.push(TextGlyphRun {
            text,
            origin_x: x,
            origin_y: y,
            width,
            height,
            font_size,
            font_family: font.map(|f| f.family.clone()).unwrap_or_default(),
            page_number,
        });
    }

    runs
}

fn extract_images(page_html: &str, page_number: u32) -> Vec<ExtractedImage> {
    IMG_REGEX
        .captures_iter(page_html)
        .filter_map(|cap| {
            let attrs = attributes(&cap[1]);
            let src = attrs.get("src").filter(|s| !s.trim().is_empty())?;
            let [x, y, width, height] = attrs.get("data-bbox").and_then(|b| parse_bbox(b))?;
            Some(ExtractedImage {
                asset_path: src.clone(),
                page_number,
                origin_x: x,
                origin_y: y,
                width,
                height,
            })
        })
        .collect()
}

fn extract_metadata(xhtml: &str) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::default();

    for cap in META_REGEX.captures_iter(xhtml) {
        let content = unescape(&cap[2])
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| cap[2].to_string());
        if content.trim().is_empty() {
            continue;
        }
        match &cap[1] {
            "dc:title" | "title" => metadata.title = Some(content),
            "dc:creator" | "author" => metadata.author = Some(content),
            "dc:language" | "language" => metadata.language = Some(content),
            "resourceName" | "source" => metadata.source_file = Some(content),
            _ => {}
        }
    }

    metadata
}

fn extract_font_classes(xhtml: &str) -> HashMap<String, FontClass> {
    let mut fonts = HashMap::new();

    for style in STYLE_REGEX.captures_iter(xhtml) {
        for cap in FONT_CLASS_REGEX.captures_iter(&style[1]) {
            let mut family = String::new();
            let mut size = None;
            for declaration in cap[2].split(';') {
                let Some((property, value)) = declaration.split_once(':') else {
                    continue;
                };
                match property.trim() {
                    "font-family" => family = value.trim().trim_matches('\'').trim_matches('"').to_string(),
                    "font-size" => {
                        size = value
                            .trim()
                            .trim_end_matches("px")
                            .trim_end_matches("pt")
                            .parse::<f32>()
                            .ok()
                    }
                    _ => {}
                }
            }
            fonts.insert(cap[1].to_string(), FontClass { family, size });
        }
    }

    fonts
}

fn attributes(raw: &str) -> HashMap<String, String> {
    ATTR_REGEX
        .captures_iter(raw)
        .map(|cap| (cap[1].to_string(), cap[2].to_string()))
        .collect()
}

fn number_attr(attrs: &HashMap<String, String>, name: &str) -> Option<f32> {
    attrs.get(name).and_then(|v| v.trim().parse::<f32>().ok())
}

/// "x,y,width,height"
fn parse_bbox(raw: &str) -> Option<[f32; 4]> {
    let parts: Vec<f32> = raw
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [x, y, w, h] => Some([*x, *y, *w, *h]),
        _ => None,
    }
}
