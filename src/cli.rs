use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use clap_complete::{Shell, generate};

use crate::chunks::{Utf8Chunks, paced, split_text};
use crate::config::{ColorMode, LbqConfig, config_location_auto, read_config};
use crate::error::{LbqError, Result};
use crate::fetch;
use crate::stream::render_markdown_stream_to_stdout;
use crate::terminal::TerminalRenderer;
use crate::ui;

/// CLI argument parser definition.
#[derive(Parser)]
#[command(
    name = "lbq",
    version,
    about = "Render streamed Markdown to the terminal as it arrives",
    arg_required_else_help = true
)]
pub struct Cli {
    #[arg(long = "color", value_enum, global = true)]
    pub color: Option<ColorMode>,
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
pub enum Command {
    #[command(aliases = ["r", "cat"], about = "Render a Markdown file or stdin line by line")]
    Render(RenderArgs),
    #[command(aliases = ["get"], about = "Render a Markdown document streamed over HTTP")]
    Fetch(FetchArgs),
    #[command(aliases = ["completion"], about = "Generate shell completion scripts")]
    Completions(CompletionsArgs),
}

/// Arguments for `lbq render`.
#[derive(Args, Clone)]
pub struct RenderArgs {
    /// File to read; stdin when omitted or `-`.
    pub path: Option<PathBuf>,
    /// Re-split the input into fragments of this many characters.
    #[arg(long = "chunk-size")]
    pub chunk_size: Option<usize>,
    /// Pause between fragments, in milliseconds.
    #[arg(long = "delay-ms", default_value_t = 0)]
    pub delay_ms: u64,
}

/// Arguments for `lbq fetch`.
#[derive(Args, Clone)]
pub struct FetchArgs {
    pub url: String,
}

/// Arguments for `lbq completions`.
#[derive(Args, Clone)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Loads config and applies its colour mode, letting `--color` win.
pub fn load_config(color: Option<ColorMode>) -> Result<LbqConfig> {
    let location = config_location_auto()?;
    let config = read_config(&location.path)?;
    color.unwrap_or(config.render.color).apply();

    let unknown = config.render.unknown_colors();
    if !unknown.is_empty() {
        let scope = if location.is_global { "global" } else { "local" };
        ui::warn(&format!(
            "Ignoring unknown colour(s) in {} config {}: {}",
            scope,
            location.path.display(),
            unknown.join(", ")
        ));
    }
    Ok(config)
}

/// Renders a local document incrementally.
pub fn run_render(args: RenderArgs, config: &LbqConfig) -> Result<()> {
    let renderer = TerminalRenderer::new(config.render.clone());
    let delay = Duration::from_millis(args.delay_ms);
    let mut reader = open_input(args.path.as_ref())?;

    match args.chunk_size {
        Some(size) => {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            let fragments = split_text(&text, size).into_iter().map(Ok);
            render_markdown_stream_to_stdout(paced(fragments, delay), &renderer)
        }
        None => render_markdown_stream_to_stdout(paced(Utf8Chunks::new(reader), delay), &renderer),
    }
}

/// Streams a remote document through the renderer.
pub fn run_fetch(args: FetchArgs, config: &LbqConfig) -> Result<()> {
    let renderer = TerminalRenderer::new(config.render.clone());
    let spinner = ui::spinner(&format!("Connecting to {}...", args.url));
    let response = fetch::open(&args.url, &config.fetch);
    spinner.finish_and_clear();
    let response = response?;

    if let Some(length) = response.content_length() {
        ui::note(&format!("Receiving {} bytes from {}", length, args.url));
    }
    let fragments = fetch::fragments(response, config.fetch.chunk_size);
    render_markdown_stream_to_stdout(fragments, &renderer)
}

/// Prints shell completion scripts to stdout.
pub fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, bin_name, &mut io::stdout());
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path).map_err(|err| {
                LbqError::Message(format!("Cannot open {}: {}", path.display(), err))
            })?;
            Ok(Box::new(file))
        }
        _ => Ok(Box::new(io::stdin())),
    }
}
