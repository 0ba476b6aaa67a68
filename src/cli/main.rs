//! Colorization CLI tool
//!
//! Loads the model once, colorizes a single image on the worker pool while a
//! spinner runs, and saves the result.

use super::config::CliConfigBuilder;
use crate::{
    config::{ColorizerConfig, OutputFormat},
    processor::ModelState,
    services::OutputFormatHandler,
    tracing_config::{init_cli_tracing, spans},
    utils::ExecutionProviderManager,
    worker::ColorizeWorker,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Colorize black-and-white photos with a pretrained network
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "colorit")]
pub struct Cli {
    /// Input image (jpg, jpeg, png, bmp, tif, tiff)
    #[arg(value_name = "INPUT", required_unless_present = "show_providers")]
    pub input: Option<PathBuf>,

    /// Output file [default: colorized_<input name> next to the input]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format [default: from the output extension, else jpeg]
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// Directory holding colorization_release_v2.onnx and pts_in_hull.npy
    #[arg(short, long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// ONNX network file (overrides --model-dir for the network)
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Lookup table of ab bin centres, .npy or .json (overrides --model-dir for the table)
    #[arg(long, value_name = "FILE")]
    pub points: Option<PathBuf>,

    /// JSON configuration file [default: $COLORIT_CONFIG]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Execution provider in format backend:provider (e.g., onnx:auto, onnx:coreml, tract:cpu)
    #[arg(short, long)]
    pub execution_provider: Option<String>,

    /// JPEG quality (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub jpeg_quality: Option<u8>,

    /// Number of threads (0 = auto-detect optimal threading)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show execution provider diagnostics and exit
    #[arg(long)]
    pub show_providers: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    if cli.show_providers {
        show_provider_diagnostics();
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input image is required")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid CLI arguments")?;
    info!("Input: {}", input.display());
    info!(
        "Backend: {}",
        ExecutionProviderManager::provider_to_string(config.backend_type, config.execution_provider)
    );

    let start_time = Instant::now();
    let state = load_model_state(&config)?;
    let worker = ColorizeWorker::new(Arc::new(state), 1)?;

    let output = colorize_and_save(&worker, &cli, &input).await?;
    println!("✅ Saved colorized image to {}", output.display());

    info!(
        "Finished in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn load_model_state(config: &ColorizerConfig) -> Result<ModelState> {
    let provider =
        ExecutionProviderManager::provider_to_string(config.backend_type, config.execution_provider);
    let _span = spans::model_loading(&config.artifacts.model, &provider).entered();

    let spinner = spinner("Loading colorization model...")?;
    let state = ModelState::load(config);
    spinner.finish_and_clear();

    state.context("Failed to load the colorization model")
}

async fn colorize_and_save(worker: &ColorizeWorker, cli: &Cli, input: &Path) -> Result<PathBuf> {
    let config = worker.state().config();
    let explicit_format = cli.format.map(OutputFormat::from);
    let output = output_path(input, cli.output.as_deref(), explicit_format, config.output_format);
    let format = OutputFormatHandler::resolve(&output, explicit_format, config.output_format);
    let span = spans::file_processing(input, &format.to_string());

    let spinner = spinner(&format!("Colorizing {}...", input.display()))?;
    let result = worker.colorize_file(input).instrument(span.clone()).await;
    spinner.finish_and_clear();

    let result = result.with_context(|| format!("Failed to colorize '{}'", input.display()))?;
    debug!("{}", result.timing_summary());

    let _span = span.entered();
    result
        .save_with_format(&output, format, config.jpeg_quality)
        .with_context(|| format!("Failed to save '{}'", output.display()))?;
    Ok(output)
}

/// Explicit output path, or `colorized_<name>` next to the input
///
/// A default name whose extension cannot be written gets the extension of
/// the format it will be saved in.
fn output_path(
    input: &Path,
    explicit: Option<&Path>,
    explicit_format: Option<OutputFormat>,
    fallback: OutputFormat,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let mut path = OutputFormatHandler::default_output_path(input);
    let writable = OutputFormatHandler::from_path(&path).ok();
    if writable.is_none() || explicit_format.is_some_and(|f| Some(f) != writable) {
        let format = explicit_format.unwrap_or(fallback);
        path.set_extension(OutputFormatHandler::get_extension(format));
    }
    path
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .context("Invalid progress template")?,
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Display execution provider diagnostics
fn show_provider_diagnostics() {
    println!("🔍 Backend and Execution Provider Diagnostics");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cpu_count = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    println!("💻 System: {cpu_count} CPU cores detected");

    println!("\n🚀 Execution Providers:");
    for provider_info in ExecutionProviderManager::list_all_providers() {
        let status = if provider_info.available {
            "✅ Available"
        } else {
            "❌ Not Available"
        };
        println!(
            "  • {}: {} - {}",
            provider_info.name, status, provider_info.description
        );
    }

    println!("\n💡 Usage Examples:");
    println!("  --execution-provider onnx:auto    # Auto-select best ONNX provider (default)");
    println!("  --execution-provider onnx:cpu     # Force ONNX CPU execution");
    println!("  --execution-provider tract        # Pure Rust Tract backend (same as tract:cpu)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_input_required_unless_showing_providers() {
        assert!(Cli::try_parse_from(["colorit"]).is_err());
        assert!(Cli::try_parse_from(["colorit", "--show-providers"]).is_ok());
        assert!(Cli::try_parse_from(["colorit", "in.png", "--jpeg-quality", "101"]).is_err());
    }

    #[test]
    fn test_output_path_defaults() {
        let jpeg = OutputFormat::Jpeg;
        assert_eq!(
            output_path(Path::new("dir/old.png"), None, None, jpeg),
            PathBuf::from("dir/colorized_old.png")
        );
        assert_eq!(
            output_path(Path::new("dir/old.bmp"), None, None, jpeg),
            PathBuf::from("dir/colorized_old.jpg")
        );
        assert_eq!(
            output_path(Path::new("old.jpg"), None, Some(OutputFormat::Png), jpeg),
            PathBuf::from("colorized_old.png")
        );
        assert_eq!(
            output_path(Path::new("old.jpg"), Some(Path::new("x/out.jpeg")), None, jpeg),
            PathBuf::from("x/out.jpeg")
        );
    }
}
