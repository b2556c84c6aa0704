//! Isolate Composer command line
//!
//! Runs elections and placements described in TOML scenario files and
//! prints their results as JSON.
//!
//! # Usage
//!
//! ```bash
//! composer elect ballots.toml
//! composer --config composer.toml place scenario.toml
//! RUST_LOG=composer=debug composer place scenario.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use composer::placement::{IsolateDescriptor, EVENT_ISOLATE_LOST};
use composer::vote::{EngineParameters, ALTERNATIVE_VOTE_KIND};
use composer::{
    AlternativeVoteEngine, Ballot, ComposerConfig, ComposerStatus, EligibleIsolate, Event,
    NodeComposer, PlacementContext, RawComponent, TableFsmFactory, VoteEngine, VoteResults,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Composer configuration file (defaults and COMPOSER_* variables otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count the ballots of an election scenario
    Elect {
        /// TOML file listing candidates and ballots
        scenario: PathBuf,
    },
    /// Replay events, then place a component
    Place {
        /// TOML file listing isolates, events and the component to place
        scenario: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct ElectionScenario {
    candidates: Vec<String>,
    #[serde(default)]
    ballots: Vec<ScenarioBallot>,
}

#[derive(Debug, Deserialize)]
struct ScenarioBallot {
    elector: String,
    #[serde(default)]
    preferences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlacementScenario {
    #[serde(default)]
    isolates: Vec<IsolateDescriptor>,
    #[serde(default)]
    events: Vec<ScenarioEvent>,
    subject: RawComponent,
}

#[derive(Debug, Deserialize)]
struct ScenarioEvent {
    source: String,
    kind: String,
    /// Defaults to false for lost isolates, true otherwise
    good: Option<bool>,
    #[serde(default)]
    components: Vec<RawComponent>,
}

impl ScenarioEvent {
    fn into_event(self) -> Event {
        let good = self.good.unwrap_or(self.kind != EVENT_ISOLATE_LOST);
        Event::new(self.source, self.kind, good).with_components(self.components)
    }
}

fn read_scenario<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid scenario {}", path.display()))
}

fn elect(config: &ComposerConfig, path: &Path) -> Result<()> {
    if config.engine_kind != ALTERNATIVE_VOTE_KIND {
        anyhow::bail!("Unknown vote engine kind: {}", config.engine_kind);
    }
    let scenario: ElectionScenario = read_scenario(path)?;

    let ballots: Vec<Ballot<String>> = scenario
        .ballots
        .into_iter()
        .map(|ballot| Ballot::ranked(ballot.elector, ballot.preferences))
        .collect();

    let mut results = VoteResults::new();
    let winner = AlternativeVoteEngine::new().analyze(
        1,
        &ballots,
        &scenario.candidates,
        &EngineParameters::new(),
        &mut results,
    )?;

    tracing::info!(winner = %winner, decision = ?results.decision(), "Election done");
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn place(config: &ComposerConfig, path: &Path) -> Result<()> {
    let scenario: PlacementScenario = read_scenario(path)?;

    let status = ComposerStatus::new(Arc::new(TableFsmFactory::new(config.lifecycle.clone())));
    let context = PlacementContext::new(config.node_name.clone(), status.shared());
    let mut composer = NodeComposer::from_config(config, context)?;

    for event in scenario.events {
        composer.handle_event(&event.into_event());
    }

    let mut candidates: Vec<EligibleIsolate> = scenario
        .isolates
        .iter()
        .map(EligibleIsolate::from_descriptor)
        .collect();
    let decision = composer.place(&mut candidates, scenario.subject)?;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    for (criterion, report) in composer.reports() {
        println!("\n{criterion}:\n{report}");
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("composer=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => ComposerConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ComposerConfig::from_env(),
    };
    tracing::debug!(?config, "Configuration loaded");

    match args.command {
        Command::Elect { scenario } => elect(&config, &scenario),
        Command::Place { scenario } => place(&config, &scenario),
    }
}
