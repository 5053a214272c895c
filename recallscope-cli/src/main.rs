// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! RecallScope CLI
//!
//! Analyzes how an assistant used, missed, or fabricated memory across a
//! dialogue transcript and writes a timeline report.

mod oracle;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use oracle::{OracleConfig, Provider};
use recallscope_evals::{AnalyzerConfig, DialogueAnalyzer};
use recallscope_memory::Dialogue;
use report::ReportGenerator;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Parser)]
#[command(name = "recallscope")]
#[command(about = "RecallScope - LLM memory usage and hallucination analysis", long_about = None)]
struct Cli {
    /// Dialogue JSON file
    dialogue_file: PathBuf,

    /// Output report path
    #[arg(short, long, default_value = "memory_report.md")]
    output: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value = "markdown")]
    format: ReportFormat,

    /// LLM oracle (default: heuristic analysis)
    #[arg(long = "llm-api", value_enum)]
    llm_api: Option<Provider>,

    /// LLM API key (falls back to OPENAI_API_KEY / ANTHROPIC_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, default_value = "gpt-4")]
    model: String,

    /// Override the provider's API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Analyzer configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Loading dialogue from {:?}", cli.dialogue_file);
    let dialogue = load_dialogue(&cli.dialogue_file)?;
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AnalyzerConfig::default(),
    };

    let analyzer = build_analyzer(&cli, config);
    info!(entries = dialogue.len(), "Analyzing dialogue");
    let state = analyzer.analyze_dialogue(&dialogue);

    match cli.format {
        ReportFormat::Markdown => ReportGenerator::new(&state).save_report(&cli.output)?,
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&state)?;
            std::fs::write(&cli.output, json)
                .with_context(|| format!("Failed to write report to {}", cli.output.display()))?;
        }
    }

    println!("✓ Report saved to {}", cli.output.display());
    println!("  Turns: {}", state.turn_count());
    println!("  Memories: {}", state.memory_count());
    println!("  Hallucinations: {}", state.total_hallucinations());
    info!(
        turns = state.turn_count(),
        memories = state.memory_count(),
        hallucinations = state.total_hallucinations(),
        "Analysis complete"
    );

    Ok(())
}

fn build_analyzer(cli: &Cli, config: AnalyzerConfig) -> DialogueAnalyzer {
    let Some(provider) = cli.llm_api else {
        return DialogueAnalyzer::heuristic(config);
    };

    let oracle = OracleConfig {
        provider,
        api_key: cli.api_key.clone(),
        model: cli.model.clone(),
        base_url: cli.base_url.clone(),
    };
    match oracle.build_client(|name| std::env::var(name).ok()) {
        Ok(client) => {
            info!(model = client.model_name(), "Using LLM oracle");
            DialogueAnalyzer::with_oracle(client, config)
        }
        Err(e) => {
            warn!("LLM client unavailable ({:#}), falling back to heuristic analysis", e);
            DialogueAnalyzer::heuristic(config)
        }
    }
}

fn load_dialogue(path: &Path) -> Result<Dialogue> {
    Dialogue::from_json_file(path)
        .with_context(|| format!("Failed to load dialogue file {}", path.display()))
}

fn load_config(path: &Path) -> Result<AnalyzerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}
