pub mod chunks;
mod cli;
pub mod config;
mod error;
pub mod fetch;
pub mod stream;
pub mod terminal;
pub mod ui;

pub use error::{LbqError, Result};
pub use stream::{
    MarkdownRenderer, MarkdownStream, render_markdown_stream, render_markdown_stream_to_stdout,
};
pub use terminal::TerminalRenderer;

/// Entry point for the CLI command dispatch.
pub fn run() -> Result<()> {
    use clap::Parser;
    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Render(args) => cli::run_render(args, &cli::load_config(cli.color)?),
        cli::Command::Fetch(args) => cli::run_fetch(args, &cli::load_config(cli.color)?),
        cli::Command::Completions(args) => cli::run_completions(args),
    }
}
