use crate::config::{Config, load_config};
use crate::exercise::Exercise;
use crate::raster::rasterize_png;
use crate::render::write_output_svg;
use crate::sanitize::canonicalize;
use crate::{RenderResult, Renderer, Schema};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde_json::Value;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "geomr", version, about = "Render geometry figure schemas to SVG or PNG")]
pub struct Args {
    /// Input file (.json, or .md with ```geometry blocks) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png/json). Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme name, themeVariables, figure and raster overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Treat the input as exercise text and strip embedded schema fragments first
    #[arg(long = "text")]
    pub text: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    /// Render result (or exercise record with --text) as JSON
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
        }
    }
}

pub fn run(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let renderer = Renderer::new(config.clone());
    let (input, is_markdown) = read_input(args.input.as_deref())?;

    if args.text {
        return run_text(&input, args, &renderer, &config);
    }

    let documents = if is_markdown {
        extract_schema_blocks(&input)
    } else {
        vec![input]
    };
    if documents.is_empty() {
        return Err(anyhow::anyhow!("No geometry schemas found in input"));
    }

    let outputs = if documents.len() == 1 {
        vec![args.output.clone()]
    } else {
        resolve_multi_outputs(args.output.as_deref(), args.output_format, documents.len())?
            .into_iter()
            .map(Some)
            .collect()
    };
    for (document, output) in documents.iter().zip(outputs) {
        let schema = parse_schema(document)?;
        write_schema(&schema, &renderer, &config, args.output_format, output.as_deref())?;
    }
    Ok(())
}

fn run_text(input: &str, args: &Args, renderer: &Renderer, config: &Config) -> Result<()> {
    let exercise = Exercise::generate(input, None, renderer)?;
    match (args.output_format, exercise.schema()) {
        (OutputFormat::Json, _) => write_output_json(&serde_json::to_string_pretty(&exercise)?, args.output.as_deref()),
        (format, Some(schema)) => write_schema(schema, renderer, config, format, args.output.as_deref()),
        (_, None) => Err(anyhow::anyhow!("No geometry schema found in exercise text")),
    }
}

fn write_schema(
    schema: &Schema,
    renderer: &Renderer,
    config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let report = renderer.render_with_report(schema);
    if !report.degradations.is_empty() {
        info!(
            figure = schema.figure.name(),
            count = report.degradations.len();
            "rendered with fallbacks"
        );
    }
    match format {
        OutputFormat::Svg => write_output_svg(&report.result.vector_markup, output),
        OutputFormat::Png => {
            let output = ensure_output(output, "png")?;
            write_output_png(&report.result.vector_markup, &output, config)
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty::<RenderResult>(&report.result)?;
            write_output_json(&json, output)
        }
    }
}

fn write_output_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    let png = rasterize_png(svg, &config.raster)?;
    std::fs::write(output, png)?;
    Ok(())
}

fn write_output_json(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Strict JSON first, then JSON5 for hand-written files.
fn parse_schema(document: &str) -> Result<Schema> {
    let value: Value = match serde_json::from_str(document) {
        Ok(value) => value,
        Err(strict) => json5::from_str(document).map_err(|lenient| {
            warn!(error = lenient.to_string(); "JSON5 fallback failed");
            anyhow::anyhow!("Input is not valid JSON: {strict}")
        })?,
    };
    canonicalize(&value)?.ok_or_else(|| anyhow::anyhow!("Input schema is null"))
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)?;
        let is_md = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| matches!(ext, "md" | "markdown"))
            .unwrap_or(false);
        return Ok((content, is_md));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

fn ensure_output(output: Option<&Path>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.to_path_buf());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn extract_schema_blocks(input: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut in_block = false;
    let mut current = Vec::new();
    let mut fence = String::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if !in_block {
            if let Some(start_fence) = detect_schema_fence(trimmed) {
                in_block = true;
                fence = start_fence;
                continue;
            }
        } else if is_fence_end(trimmed, &fence) {
            in_block = false;
            blocks.push(current.join("\n"));
            current.clear();
            continue;
        }

        if in_block {
            current.push(line.to_string());
        }
    }

    blocks
}

fn detect_schema_fence(line: &str) -> Option<String> {
    for fence in ["```", "~~~"] {
        if let Some(rest) = line.strip_prefix(fence) {
            let tag = rest.trim_start_matches(&fence[..1]).trim();
            if tag.starts_with("geometry") || tag.starts_with("schema") {
                return Some(fence.to_string());
            }
        }
    }
    None
}

fn is_fence_end(line: &str, fence: &str) -> bool {
    if !line.starts_with(fence) {
        return false;
    }
    line[fence.len()..].trim().is_empty()
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for markdown input"))?;
    if base.is_dir() {
        let mut outputs = Vec::new();
        for idx in 0..count {
            outputs.push(base.join(format!("figure-{}.{}", idx + 1, ext)));
        }
        return Ok(outputs);
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("figure");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    let mut outputs = Vec::new();
    for idx in 0..count {
        outputs.push(parent.join(format!("{}-{}.{}", stem, idx + 1, ext)));
    }
    Ok(outputs)
}
