//! Batch ingestion driver
//!
//! Processes every policy document in a directory, optionally checks country
//! eligibility for each, and exports a JSON report.

use anyhow::Context;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use policy_rag::analysis::EligibilityAnalyzer;
use policy_rag::batch::BatchProcessor;
use policy_rag::config::PolicyRagConfig;
use policy_rag::index::EmbeddingIndex;
use policy_rag::pipeline::PolicyPipeline;
use policy_rag::providers::{OllamaClient, OllamaEmbedder, OllamaLlm};
use policy_rag::retrieval::QaEngine;
use policy_rag::storage::PolicyRegistry;
use policy_rag::types::FileOutcome;

#[derive(Parser)]
#[command(name = "policy-rag-batch", about = "Batch-ingest policy documents and check country eligibility")]
struct Args {
    /// Directory containing policy documents (.pdf, .docx, .doc)
    directory: PathBuf,

    /// Countries to check eligibility for after ingestion
    countries: Vec<String>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the batch report to this path as JSON
    #[arg(long, default_value = "batch_report.json")]
    export: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policy_rag=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PolicyRagConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let config = PolicyRagConfig::default();
            config.validate()?;
            config
        }
    };

    let client = Arc::new(OllamaClient::new(&config.llm)?);
    if !client.health_check().await.unwrap_or(false) {
        eprintln!(
            "{} cannot reach Ollama at {}; start it with `ollama serve`",
            style("warning:").yellow().bold(),
            config.llm.base_url
        );
    }

    let embedder = Arc::new(OllamaEmbedder::new(Arc::clone(&client), &config.embeddings));
    let llm = Arc::new(OllamaLlm::new(Arc::clone(&client), &config.llm));

    let index = Arc::new(EmbeddingIndex::open(
        &config.index.data_dir,
        embedder,
        config.embeddings.batch_size,
    )?);
    let registry = Arc::new(PolicyRegistry::open(&config.index.registry_path)?);

    let pipeline = Arc::new(PolicyPipeline::new(
        config.ingestion.clone(),
        &config.chunking,
        &config.batch,
        Arc::clone(&index),
        registry,
    ));
    let qa = Arc::new(QaEngine::new(index, llm, config.retrieval.clone()));
    let analyzer = Arc::new(EligibilityAnalyzer::new(qa));
    let processor = BatchProcessor::new(&config.batch, pipeline, analyzer);

    let countries = (!args.countries.is_empty()).then_some(args.countries.as_slice());

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message(format!("processing {}", args.directory.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let report = processor.process_batch(&args.directory, countries).await?;
    spinner.finish_and_clear();

    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Indexed { file, policy_name, chunks, .. } => {
                println!("{} {} -> '{}' ({} chunks)", style("ok").green().bold(), file, policy_name, chunks);
            }
            FileOutcome::Unchanged { file, policy_name } => {
                println!("{} {} -> '{}' unchanged", style("skip").dim(), file, policy_name);
            }
            FileOutcome::Failed { file, reason } => {
                println!("{} {}: {}", style("fail").red().bold(), file, reason);
            }
            FileOutcome::Cancelled { file } => {
                println!("{} {}", style("cancelled").yellow(), file);
            }
        }
    }

    println!(
        "\n{} indexed, {} unchanged, {} failed ({} chunks total)",
        report.summary.indexed, report.summary.unchanged, report.summary.failed, report.summary.total_chunks
    );

    if let Some(eligibility) = &report.eligibility {
        for (policy, summary) in eligibility {
            println!("\n{}:", style(policy).bold());
            println!("  eligible: {}", summary.eligible.join(", "));
            println!("  not eligible: {}", summary.not_eligible.join(", "));
            if !summary.uncertain.is_empty() {
                println!("  uncertain: {}", summary.uncertain.join(", "));
            }
        }
    }

    BatchProcessor::export_results(&report, &args.export)?;
    println!("\nreport written to {}", args.export.display());

    Ok(())
}
