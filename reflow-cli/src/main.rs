use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Import from reflow-core
use reflow_core::config::ParagraphStrategyKind;
use reflow_core::rules::DebugConfig;
use reflow_core::sources::source_for_path;
use reflow_core::{CancellationToken, ConversionOutput, DocumentConverter, LayoutSource, PipelineStages, ReflowConfig};

// Import CLI utilities
use reflow_cli::LibreTranslateClient;

#[derive(Parser)]
#[command(name = "reflow")]
#[command(about = "Rebuild chapters and reflowable markup from extracted PDF layout")]
struct Args {
    /// Path to the layout dump (.json or .xhtml) to convert
    #[arg(short, long)]
    input: String,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output format: json or xhtml
    #[arg(short = 'f', long, default_value = "json")]
    output_format: String,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,

    /// Output path (file for json, directory for xhtml; auto-generated if not specified)
    #[arg(short, long)]
    output: Option<String>,

    /// Paragraph strategy: column-aware or global-vertical
    #[arg(long)]
    strategy: Option<String>,

    /// Keep running headers and footers in the chapters
    #[arg(long)]
    include_header_footer: bool,

    /// Put everything in one chapter (fast mode)
    #[arg(long)]
    single_chapter: bool,

    /// Directory extracted image paths are resolved against
    #[arg(long)]
    asset_root: Option<String>,

    /// Skip image correlation
    #[arg(long)]
    no_images: bool,

    /// Translate chapters into this language (enables translation)
    #[arg(long)]
    translate_to: Option<String>,

    /// Source language for translation (default: auto)
    #[arg(long)]
    translate_from: Option<String>,

    /// Base URL of the LibreTranslate-compatible service
    #[arg(long, default_value = "http://localhost:5000")]
    translator_url: String,

    /// Per-request timeout for the translation service, in seconds
    #[arg(long, default_value_t = 30)]
    translator_timeout: u64,

    /// Log every block whose text contains this pattern (repeatable)
    #[arg(long = "debug-block")]
    debug_blocks: Vec<String>,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Skip cache and force fresh processing (useful for development/testing)
    #[arg(long)]
    skip_cache: bool,

    /// Directory for cached conversions
    #[arg(long, default_value = ".reflow-cache")]
    cache_dir: String,

    /// Dump all intermediate pipeline stage outputs to a directory
    /// Captures: font statistics, page layouts, chapters, rendered and final output
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output (default: test_outputs/stages)
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    println!("📖 Reflow Layout Converter");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    // Check if input file exists
    if !Path::new(&args.input).exists() {
        println!("⚠️  Input layout not found at: {}", args.input);
        println!("   Please check the file path.");
        return Ok(());
    }

    let mut config = ReflowConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }
    apply_overrides(&mut config, &args)?;

    let mut converter = DocumentConverter::new_cli_with_cache(&config, &args.cache_dir)?;
    if config.translation.enabled {
        println!("🌐 Translating via {}", args.translator_url);
        let client = LibreTranslateClient::new(&args.translator_url)
            .with_timeout(Duration::from_secs(args.translator_timeout));
        converter = converter.with_translator(Box::new(client));
    }
    if !args.debug_blocks.is_empty() {
        converter.set_debug_config(DebugConfig::new(true, args.debug_blocks.clone()));
    }

    let cancel = CancellationToken::new();
    println!("📄 Processing: {}", args.input);

    // Stage dump mode: capture and save all intermediates
    if args.dump_stages {
        println!("\n🔬 Pipeline stage dump mode");
        let source = source_for_path(Path::new(&args.input), config.images.min_image_dimension)
            .ok_or_else(|| anyhow::anyhow!("Unsupported input type: {}", args.input))?;
        let input = source.load_file(Path::new(&args.input))?;
        match converter.convert_capture_stages(&input, &config, &cancel) {
            Ok(stages) => {
                save_stages(&stages, &args.stages_dir, &args.input)?;
                println!("\n✅ All stages dumped to: {}", args.stages_dir);
            }
            Err(e) => {
                eprintln!("❌ Stage dump failed: {e}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    match converter.convert_file(&args.input, &config, args.profile, args.skip_cache, &cancel) {
        Ok(output) => {
            println!("✅ Successfully converted document");
            print_report(&output);

            let output_path = if let Some(output) = &args.output {
                output.clone()
            } else {
                default_output_path(&args)
            };
            save_output(&output, &output_path, &args.output_format)?;
        }
        Err(e) => {
            eprintln!("❌ Conversion failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut ReflowConfig, args: &Args) -> Result<()> {
    if let Some(strategy) = &args.strategy {
        config.classifier.strategy = match strategy.as_str() {
            "column-aware" | "column_aware" => ParagraphStrategyKind::ColumnAware,
            "global-vertical" | "global_vertical" => ParagraphStrategyKind::GlobalVertical,
            other => anyhow::bail!("Unknown strategy '{}': use column-aware or global-vertical", other),
        };
    }
    if args.include_header_footer {
        config.assembly.include_header_footer = true;
    }
    if args.single_chapter {
        config.assembly.single_chapter = true;
    }
    if let Some(root) = &args.asset_root {
        config.images.asset_root = Some(root.into());
    } else if config.images.asset_root.is_none() {
        // Extractors write image paths relative to the dump
        config.images.asset_root = Path::new(&args.input).parent().map(Path::to_path_buf);
    }
    if args.no_images {
        config.images.enabled = false;
    }
    if let Some(target) = &args.translate_to {
        config.translation.enabled = true;
        config.translation.target_language = target.clone();
    }
    if let Some(source) = &args.translate_from {
        config.translation.source_language = source.clone();
    }
    Ok(())
}

fn default_output_path(args: &Args) -> String {
    let input_name = Path::new(&args.input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let config_suffix = args
        .config
        .as_ref()
        .and_then(|p| Path::new(p).file_stem())
        .and_then(|s| s.to_str())
        .map(|s| format!("_{s}"))
        .unwrap_or_default();
    match args.output_format.as_str() {
        "xhtml" => format!("{input_name}{config_suffix}_reflow"),
        _ => format!("{input_name}{config_suffix}_reflow.json"),
    }
}

fn print_report(output: &ConversionOutput) {
    let report = &output.report;
    println!("📊 Conversion report:");
    println!("   - Title: {}", output.metadata.title);
    println!("   - Pages: {}", report.page_count);
    println!("   - Chapters: {}", report.chapter_count);
    println!("   - Blocks: {}", report.block_count);
    println!(
        "   - Images: {} inserted, {} skipped",
        report.images_inserted, report.images_skipped
    );
    if let Some(stats) = &report.translation {
        println!(
            "   - Translation: {}/{} spans ({} kept original)",
            stats.translated, stats.spans, stats.failed
        );
    }
    println!("   - Layout quality: {:.2}", report.validation.quality_score);
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --config <path>            Load custom config file");
    println!("  --input <path>             Layout dump to convert (.json or .xhtml)");
    println!("  --output <path>            Output path (auto-generated if not specified)");
    println!("  --output-format <fmt>      Output format: json or xhtml");
    println!("  --strategy <name>          column-aware (default) or global-vertical");
    println!("  --include-header-footer    Keep running headers and footers");
    println!("  --single-chapter           Put everything in one chapter");
    println!("  --asset-root <dir>         Resolve image paths against this directory");
    println!("  --no-images                Skip image correlation");
    println!("  --translate-to <lang>      Translate chapters (e.g. pt, es, de)");
    println!("  --translate-from <lang>    Source language (default: auto)");
    println!("  --translator-url <url>     LibreTranslate-compatible endpoint");
    println!("  --translator-timeout <s>   Per-request translation timeout (default: 30)");
    println!("  --cache-dir <dir>          Conversion cache directory");

    println!("\n📄 Output Formats:");
    println!("  json   - Metadata, chapters and conversion report in one file (default)");
    println!("  xhtml  - One XHTML document per chapter plus manifest.json");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i book.json");
    println!("  cargo run -- -i book.xhtml -f xhtml -o book_chapters");
    println!("  cargo run -- -i book.json --translate-to pt --translator-url http://localhost:5000");
    println!("  RUST_LOG=debug cargo run -- -i book.json --debug-block \"Chapter 3\"");
}

fn save_stages(stages: &PipelineStages, output_dir: &str, input_path: &str) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)?;

    // Stage 1a: Font statistics
    let fonts_path = format!("{}/stage1a_font_statistics.json", output_dir);
    fs::write(&fonts_path, serde_json::to_string_pretty(&stages.font_statistics)?)?;
    println!("  💾 {}", fonts_path);

    // Stage 1b: Page layouts
    let layout_path = format!("{}/stage1b_page_layouts.json", output_dir);
    fs::write(&layout_path, serde_json::to_string_pretty(&stages.layouts)?)?;
    println!("  💾 {} ({} pages)", layout_path, stages.layouts.len());

    // Stage 2: Chapters
    let chapters_path = format!("{}/stage2_chapters.json", output_dir);
    fs::write(&chapters_path, serde_json::to_string_pretty(&stages.chapters)?)?;
    println!("  💾 {} ({} chapters)", chapters_path, stages.chapters.len());

    // Stage 3: Rendered markup, before translation and images
    let rendered_path = format!("{}/stage3_rendered.json", output_dir);
    fs::write(&rendered_path, serde_json::to_string_pretty(&stages.rendered)?)?;
    println!("  💾 {}", rendered_path);

    // Stage 4: Final output
    let output_path = format!("{}/stage4_output.json", output_dir);
    stages.output.save_with_format(&output_path, "json")?;
    println!("  💾 {}", output_path);

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input": input_path,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "pages": stages.layouts.len(),
            "blocks": stages.layouts.iter().map(|l| l.blocks.len()).sum::<usize>(),
            "chapters": stages.chapters.len(),
            "images_inserted": stages.output.report.images_inserted,
        }
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}

fn save_output(output: &ConversionOutput, output_path: &str, format: &str) -> Result<()> {
    output.save_with_format(output_path, format)?;

    match format {
        "xhtml" => println!("💾 XHTML chapters saved to: {}/", output_path),
        "json" => println!("💾 JSON results saved to: {}", output_path),
        _ => {
            println!("⚠️  Unknown output format '{}', using json", format);
            println!("💾 JSON results saved to: {}", output_path);
        }
    }

    Ok(())
}
