//! kidsdraw: turn a photo into a tracing sheet from the command line.
//!
//! Converts one image to the Outline, Sketch, or Cartoon style and writes
//! the result. Optionally saves the original/result pair into an image
//! store, writes a side-by-side share image, or runs the synchronous
//! pipeline with per-stage timing diagnostics instead.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin kidsdraw -- photo.jpg -o sheet.png --style sketch
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use kidsdraw_engine::{EngineError, StyleConversionEngine};
use kidsdraw_pipeline::diagnostics::{Clock, ConversionDiagnostics};
use kidsdraw_pipeline::{
    Bitmap, ConversionError, ConversionParameters, NoopObserver, ParameterError, StyleKind,
};
use kidsdraw_store::{ImageStore, StoreConfig, StoreError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str =
    "info,kidsdraw=debug,kidsdraw_engine=debug,kidsdraw_store=debug";

/// Convert a photo into an outline, pencil-sketch, or cartoon tracing
/// sheet.
#[derive(Parser)]
#[command(name = "kidsdraw", version)]
struct Cli {
    /// Input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Where to write the converted image. The format follows the
    /// extension.
    #[arg(short, long)]
    output: PathBuf,

    /// Conversion style.
    #[arg(long, value_enum, default_value_t = Style::Outline)]
    style: Style,

    /// Edge line weight.
    #[arg(long, default_value_t = ConversionParameters::DEFAULT_LINE_THICKNESS, value_parser = clap::value_parser!(i32).range(1..=5))]
    line_thickness: i32,

    /// Contrast percentage (50 is neutral).
    #[arg(long, default_value_t = ConversionParameters::DEFAULT_CONTRAST, value_parser = clap::value_parser!(i32).range(0..=100))]
    contrast: i32,

    /// Saturation percentage (50 is neutral, Cartoon only).
    #[arg(long, default_value_t = ConversionParameters::DEFAULT_SATURATION, value_parser = clap::value_parser!(i32).range(0..=100))]
    saturation: i32,

    /// Full parameter set as JSON. Overrides the individual flags.
    #[arg(long)]
    params_json: Option<String>,

    /// Run the pipeline synchronously and print per-stage timings.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a table.
    #[arg(long, requires = "diagnostics")]
    json: bool,

    /// Number of diagnostic runs to average.
    #[arg(long, default_value_t = 1, requires = "diagnostics", value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Also save the original and the result into an image store rooted
    /// here.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Also write a side-by-side share image here.
    #[arg(long)]
    share: Option<PathBuf>,
}

/// Style selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Style {
    /// Dark edge lines on white.
    Outline,
    /// Pencil sketch.
    Sketch,
    /// Flat color with dark outlines.
    Cartoon,
}

impl From<Style> for StyleKind {
    fn from(style: Style) -> Self {
        match style {
            Style::Outline => Self::Outline,
            Style::Sketch => Self::Sketch,
            Style::Cartoon => Self::Cartoon,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error parsing --params-json: {0}")]
    ParamsJson(#[source] serde_json::Error),

    #[error("error serializing output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid parameters: {0}")]
    Params(#[from] ParameterError),

    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error writing {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Build [`ConversionParameters`] from CLI arguments.
///
/// `--params-json` wins over the individual flags. Its values are
/// range-checked here since clap never saw them.
fn params_from_cli(cli: &Cli) -> Result<ConversionParameters, CliError> {
    if let Some(ref json) = cli.params_json {
        let params: ConversionParameters =
            serde_json::from_str(json).map_err(CliError::ParamsJson)?;
        params.validate()?;
        return Ok(params);
    }
    Ok(ConversionParameters::new(
        cli.line_thickness,
        cli.contrast,
        cli.saturation,
    ))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let params = params_from_cli(cli)?;
    let style = StyleKind::from(cli.style);

    let bytes = std::fs::read(&cli.input).map_err(|source| CliError::Read {
        path: cli.input.clone(),
        source,
    })?;
    let image = kidsdraw_pipeline::decode::decode(&bytes).map_err(ConversionError::from)?;
    tracing::info!(
        input = %cli.input.display(),
        width = image.width(),
        height = image.height(),
        %style,
        "loaded image"
    );

    let output = if cli.diagnostics {
        run_diagnostics(cli, &image, style, &params)?
    } else {
        convert_with_engine(image.clone(), style, params).await?
    };

    write_bitmap(&cli.output, &output)?;
    tracing::info!(output = %cli.output.display(), "wrote result");

    if let Some(ref root) = cli.store {
        let store = ImageStore::open(root)?;
        let record = store.save_artwork(&image, &output, style, params)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    if let Some(ref path) = cli.share {
        let share = kidsdraw_store::compose_share_image(&image, &output)?;
        write_bitmap(path, &share)?;
        tracing::info!(share = %path.display(), "wrote share image");
    }

    Ok(())
}

/// Convert on the background engine, logging each checkpoint.
async fn convert_with_engine(
    image: Bitmap,
    style: StyleKind,
    params: ConversionParameters,
) -> Result<Bitmap, EngineError> {
    let engine = StyleConversionEngine::new()?;
    let mut conversion = engine.submit(image, style, params)?;
    while let Some(fraction) = conversion.progress().next().await {
        tracing::info!(job = %conversion.id(), "{style}: {:>3.0}%", fraction * 100.0);
    }
    let result = conversion.result().await;
    // Dropping the engine joins its worker thread.
    if let Err(err) = tokio::task::spawn_blocking(move || drop(engine)).await {
        tracing::warn!(error = %err, "conversion worker did not shut down cleanly");
    }
    result
}

/// Run the synchronous pipeline `cli.runs` times, printing diagnostics.
/// Returns the first run's output.
fn run_diagnostics(
    cli: &Cli,
    image: &Bitmap,
    style: StyleKind,
    params: &ConversionParameters,
) -> Result<Bitmap, CliError> {
    let run_once = |run: usize| -> Result<(Bitmap, ConversionDiagnostics), CliError> {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }
        let (output, diagnostics) = kidsdraw_pipeline::convert_with_diagnostics(
            image,
            style,
            params,
            &NoopObserver,
            &StdClock,
        )?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        } else {
            println!("{}", diagnostics.report());
        }
        Ok((output, diagnostics))
    };

    let (output, first) = run_once(0)?;
    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    all_diagnostics.push(first);
    for run in 1..cli.runs {
        all_diagnostics.push(run_once(run)?.1);
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }
    Ok(output)
}

/// Encode by extension. JPEG goes through the store codec so alpha is
/// dropped instead of rejected.
fn write_bitmap(path: &Path, bitmap: &Bitmap) -> Result<(), CliError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let written = match extension.as_deref() {
        Some("jpg" | "jpeg") => {
            let bytes = kidsdraw_store::codec::encode_jpeg(bitmap, StoreConfig::DEFAULT_JPEG_QUALITY)?;
            std::fs::write(path, bytes).map_err(|e| e.to_string())
        }
        _ => bitmap.save(path).map_err(|e| e.to_string()),
    };

    written.map_err(|reason| CliError::Write {
        path: path.to_path_buf(),
        reason,
    })
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[ConversionDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<16} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(30));

    for stage in &first.stages {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.stage(&stage.name))
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();
        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len().max(1) as f64;
        println!("{:<16} {stage_mean:>10.3}ms", stage.name);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("kidsdraw").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_match_slider_defaults() {
        let cli = parse(&["in.png", "-o", "out.png"]).unwrap();
        assert_eq!(cli.style, Style::Outline);
        assert_eq!(
            params_from_cli(&cli).unwrap(),
            ConversionParameters::default()
        );
    }

    #[test]
    fn flags_build_parameters() {
        let cli = parse(&[
            "in.png",
            "-o",
            "out.png",
            "--style",
            "cartoon",
            "--line-thickness",
            "5",
            "--contrast",
            "0",
            "--saturation",
            "100",
        ])
        .unwrap();
        assert_eq!(StyleKind::from(cli.style), StyleKind::Cartoon);
        assert_eq!(
            params_from_cli(&cli).unwrap(),
            ConversionParameters::new(5, 0, 100)
        );
    }

    #[test]
    fn out_of_range_flags_are_rejected() {
        assert!(parse(&["in.png", "-o", "o.png", "--line-thickness", "6"]).is_err());
        assert!(parse(&["in.png", "-o", "o.png", "--contrast", "101"]).is_err());
        assert!(parse(&["in.png", "-o", "o.png", "--saturation", "-1"]).is_err());
    }

    #[test]
    fn params_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "-o",
            "out.png",
            "--contrast",
            "10",
            "--params-json",
            r#"{"line_thickness": 2, "contrast": 75}"#,
        ])
        .unwrap();
        assert_eq!(
            params_from_cli(&cli).unwrap(),
            ConversionParameters::new(2, 75, 50)
        );
    }

    #[test]
    fn params_json_is_range_checked() {
        let cli = parse(&[
            "in.png",
            "-o",
            "out.png",
            "--params-json",
            r#"{"line_thickness": 9}"#,
        ])
        .unwrap();
        assert!(matches!(
            params_from_cli(&cli),
            Err(CliError::Params(ParameterError::LineThickness(9)))
        ));
    }

    #[test]
    fn json_requires_diagnostics() {
        assert!(parse(&["in.png", "-o", "o.png", "--json"]).is_err());
        assert!(parse(&["in.png", "-o", "o.png", "--diagnostics", "--json", "--runs", "3"]).is_ok());
    }

    #[test]
    fn write_bitmap_picks_format_from_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let bitmap = Bitmap::from_pixel(4, 4, image::Rgba([10, 20, 30, 128]));

        let png = dir.join("out.png");
        write_bitmap(&png, &bitmap).unwrap();
        assert_eq!(image::open(&png).unwrap().into_rgba8(), bitmap);

        let jpg = dir.join("out.JPG");
        write_bitmap(&jpg, &bitmap).unwrap();
        assert_eq!(std::fs::read(&jpg).unwrap()[..2], [0xFF, 0xD8]);
    }
}
