//! Command-line interface.
//!
//! `serve` runs the HTTP API. The other commands work offline against the
//! catalog and never contact the oracle.

use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::api::{ApiState, EstimationApi};
use crate::config::Config;
use crate::conversation::classifier::ConversationClassifier;
use crate::conversation::{ConversationStep, ConversationTurn};
use crate::estimation::{Estimator, FeatureExtractor, ProjectFeatureRecord, ReferenceData};
use crate::llm::create_llm_provider;
use crate::service::EstimationService;

#[derive(Parser, Debug)]
#[command(name = "quotecraft", version, about = "Progressive project estimation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Override HTTP_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Estimate a project from a feature record
    Estimate {
        /// JSON file with the record, or `-` for stdin. Either the bare
        /// record or `{"analysis": ...}`.
        #[arg(short, long)]
        analysis: String,

        /// Conversation step (0-5)
        #[arg(short, long, default_value_t = ConversationStep::MAX)]
        step: u8,
    },

    /// Classify a conversation
    Classify {
        /// JSON file with the turns, or `-` for stdin. Either an array or
        /// `{"messages": [...]}`.
        #[arg(short, long)]
        messages: String,
    },

    /// List the historical project catalog
    Catalog,
}

/// Run a command.
pub async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Serve { port } => serve(config, port).await,
        Command::Estimate { analysis, step } => estimate(&config, &analysis, step),
        Command::Classify { messages } => classify(&messages),
        Command::Catalog => list_catalog(&config),
    }
}

fn load_reference(config: &Config) -> anyhow::Result<Arc<ReferenceData>> {
    let reference = ReferenceData::load(config.estimation.catalog_path.as_deref())
        .context("Failed to load project catalog")?;
    Ok(Arc::new(reference))
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    config.require_oracle_key()?;

    let reference = load_reference(&config)?;
    let llm = create_llm_provider(&config.oracle)?;
    let service = EstimationService::new(
        FeatureExtractor::new(llm, config.oracle.timeout),
        Estimator::new(reference, config.estimation.currency.clone()),
    );

    let host = config
        .http
        .host
        .parse()
        .with_context(|| format!("Invalid HTTP_HOST {:?}", config.http.host))?;
    let addr = SocketAddr::new(host, port.unwrap_or(config.http.port));

    EstimationApi::start(
        ApiState {
            service: Arc::new(service),
        },
        addr,
    )
    .await?;
    Ok(())
}

fn estimate(config: &Config, input: &str, step: u8) -> anyhow::Result<()> {
    let value = read_json(input)?;
    let analysis = value.get("analysis").unwrap_or(&value);
    let record = ProjectFeatureRecord::from_request_value(analysis)?;

    let estimator = Estimator::new(load_reference(config)?, config.estimation.currency.clone());
    let report = estimator.estimate(&record, ConversationStep::new(step));

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn classify(input: &str) -> anyhow::Result<()> {
    let value = read_json(input)?;
    let messages = value.get("messages").cloned().unwrap_or(value);
    let turns: Vec<ConversationTurn> =
        serde_json::from_value(messages).context("Expected a list of conversation turns")?;

    let classifier = ConversationClassifier::new();
    let kind = classifier.classify(&turns);
    let scores = classifier.score(&turns);
    let step = ConversationStep::from_turns(&turns);

    println!("Conversation type: {}", kind);
    println!("Step:              {}", step);
    println!(
        "Scores:            project {:.1}, estimate {:.1}, company {:.1}",
        scores.project, scores.estimate, scores.company
    );
    Ok(())
}

fn list_catalog(config: &Config) -> anyhow::Result<()> {
    let reference = load_reference(config)?;
    let projects = reference.catalog.projects();

    let key_width = projects.iter().map(|p| p.key.len()).max().unwrap_or(0);
    let type_width = projects
        .iter()
        .map(|p| p.project_type.len())
        .max()
        .unwrap_or(0);

    println!("Catalog ({} projects):", projects.len());
    println!();

    for project in projects {
        let platforms: Vec<&str> = project.platforms.iter().map(|p| p.as_str()).collect();
        println!(
            "  {:kw$}  {:tw$}  {:>5} h  {:>8}  {}",
            project.key,
            project.project_type,
            project.total_hours,
            crate::estimation::format_money(project.total_cost, &config.estimation.currency),
            platforms.join(", "),
            kw = key_width,
            tw = type_width,
        );
    }

    println!();
    println!("Phase distribution:");
    for share in reference.phases.shares() {
        println!("  {:16} {:>5}%", share.phase.as_str(), share.percentage.normalize());
    }

    Ok(())
}

/// Read JSON from a file, or from stdin when `input` is `-`.
fn read_json(input: &str) -> anyhow::Result<Value> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(input))
            .with_context(|| format!("Failed to read {}", input))?
    };

    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", input))
}
