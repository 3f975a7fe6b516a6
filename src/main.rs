//! Conversational agent that drives a PyMOL session through an LLM.
//!
//! `molpilot chat` runs the interactive loop; `molpilot state` prints one
//! session report and exits, as a quick wiring check.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use molpilot::chat::ChatLoop;
use molpilot::core::mode::Mode;
use molpilot::core::report::render_report;
use molpilot::io::config::load_config;
use molpilot::io::model::AnthropicClient;
use molpilot::io::presets::{Preset, apply_preset};
use molpilot::io::prompt::system_prompt;
use molpilot::io::pymol::PyMolSession;
use molpilot::io::session::VizSession;
use molpilot::logging;

#[derive(Parser)]
#[command(
    name = "molpilot",
    version,
    about = "Conversational agent that drives a PyMOL session through an LLM"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the interactive conversation loop.
    Chat {
        /// Start in expert mode (minimal explanations).
        #[arg(long)]
        expert: bool,
        /// Apply a publication preset before the first turn.
        #[arg(long)]
        preset: Option<Preset>,
        /// Path to the config file.
        #[arg(long, default_value = "molpilot.toml")]
        config: PathBuf,
    },
    /// Print the current session state report and exit.
    State {
        /// Path to the config file.
        #[arg(long, default_value = "molpilot.toml")]
        config: PathBuf,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Chat {
            expert,
            preset,
            config,
        } => cmd_chat(expert, preset, &config),
        Command::State { config } => cmd_state(&config),
    }
}

fn cmd_chat(expert: bool, preset: Option<Preset>, config_path: &std::path::Path) -> Result<()> {
    let cfg = load_config(config_path)?;
    let model = AnthropicClient::new(
        &cfg.api_base,
        &cfg.model,
        cfg.max_tokens,
        Duration::from_secs(cfg.request_timeout_secs),
    )?;
    let session = PyMolSession::spawn(&cfg)?;
    let mode = if expert { Mode::Expert } else { Mode::Guided };

    let mut chat = ChatLoop::new(model, session, system_prompt()?, mode);
    if let Some(preset) = preset {
        apply_preset(chat.session_mut(), preset).context("apply startup preset")?;
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    chat.run_repl(&mut input, &mut output)
}

fn cmd_state(config_path: &std::path::Path) -> Result<()> {
    let cfg = load_config(config_path)?;
    let mut session = PyMolSession::spawn(&cfg)?;
    let result = session.snapshot().map(|snapshot| render_report(&snapshot));
    let closed = session.close();
    println!("{}", result?);
    closed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chat_defaults() {
        let cli = Cli::parse_from(["molpilot", "chat"]);
        let Command::Chat {
            expert,
            preset,
            config,
        } = cli.command
        else {
            panic!("expected chat");
        };
        assert!(!expert);
        assert!(preset.is_none());
        assert_eq!(config, PathBuf::from("molpilot.toml"));
    }

    #[test]
    fn parse_chat_expert_with_preset() {
        let cli = Cli::parse_from(["molpilot", "chat", "--expert", "--preset", "presentation"]);
        let Command::Chat { expert, preset, .. } = cli.command else {
            panic!("expected chat");
        };
        assert!(expert);
        assert_eq!(preset, Some(Preset::Presentation));
    }

    #[test]
    fn parse_state_with_config_path() {
        let cli = Cli::parse_from(["molpilot", "state", "--config", "custom.toml"]);
        let Command::State { config } = cli.command else {
            panic!("expected state");
        };
        assert_eq!(config, PathBuf::from("custom.toml"));
    }
}
