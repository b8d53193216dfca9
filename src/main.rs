use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use docchat::tui;
use docchat::{
    AnthropicClient, ChatClient, ChatSession, MockChatClient, DEFAULT_BASE_URL,
    DEFAULT_SYSTEM_PROMPT,
};

#[derive(Parser)]
#[command(name = "docchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (written to the log file, never the terminal)
    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, default_value = "~/.docchat")]
    data_dir: String,

    /// Use the scripted offline client instead of the hosted service
    #[arg(long)]
    mock_client: bool,

    /// Model identifier (overrides ANTHROPIC_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// API base URL (overrides ANTHROPIC_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Replace the default system instruction
    #[arg(long)]
    system: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = expand_tilde(&cli.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    // The TUI owns the terminal for the whole run, so log lines go to a file.
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_path = PathBuf::from(&data_dir).join("docchat.log");
    let log_file = std::fs::File::create(&log_path)?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client: Arc<dyn ChatClient> = if cli.mock_client {
        info!("Using scripted mock client");
        Arc::new(MockChatClient::new())
    } else {
        let base_url = cli
            .base_url
            .unwrap_or_else(AnthropicClient::configured_base_url);
        let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        if api_key.is_empty() && base_url == DEFAULT_BASE_URL {
            warn!("ANTHROPIC_API_KEY is not set; the hosted service will reject requests");
        }
        let model = cli
            .model
            .or_else(|| std::env::var("ANTHROPIC_MODEL").ok())
            .unwrap_or_else(|| docchat::connector::DEFAULT_MODEL.to_string());
        let client = AnthropicClient::new(api_key, model, base_url);
        info!(model = client.model(), "Using hosted inference client");
        Arc::new(client)
    };

    let system_prompt = cli
        .system
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let session = ChatSession::new(client, system_prompt);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = tui::App::new(session).run(&mut terminal).await;
    tui::restore()?;
    result
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn mock_client_flag_parses() {
        let cli = Cli::try_parse_from(["docchat", "--mock-client"]).unwrap();
        assert!(cli.mock_client);
    }

    #[test]
    fn unknown_subcommands_are_rejected() {
        let res = Cli::try_parse_from(["docchat", "serve"]);
        assert!(res.is_err(), "positional arguments are not accepted");
    }
}
