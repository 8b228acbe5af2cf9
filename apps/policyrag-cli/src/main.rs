use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use policyrag_core::config::{resolve_with_base, Config, Settings};
use policyrag_core::traits::{Embedder, Generator, VectorStore};
use policyrag_core::types::MetadataFilter;
use policyrag_embed::get_default_embedder;
use policyrag_hybrid::eval::{evaluate, load_cases};
use policyrag_hybrid::{HybridRetriever, SemanticRetriever};
use policyrag_llm::OpenAiGenerator;
use policyrag_pipeline::metrics::{low_confidence_queries, read_records, summarize};
use policyrag_pipeline::{sink_from_settings, AnswerPipeline, IngestPaths, Ingestor};
use policyrag_quality::evaluate_answer_relevance;
use policyrag_vector::LanceVectorStore;

#[derive(Parser)]
#[command(name = "policyrag", about = "Answer questions about insurance policies from your own documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct FilterArgs {
    /// Restrict to one policy type (homeowners, auto, ...)
    #[arg(long)]
    policy_type: Option<String>,
    #[arg(long)]
    policy_number: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> MetadataFilter { MetadataFilter::new(self.policy_type.as_deref(), self.policy_number.as_deref()) }
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the lexical and vector indexes from the document directories
    Ingest,
    /// Show the fused retrieval results for a query
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Boost personal policies regardless of the query wording
        #[arg(long)]
        personal: bool,
    },
    /// Answer a question with citations and a confidence level
    Query {
        question: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Also ask the model to grade the answer's relevance
        #[arg(long)]
        judge: bool,
        #[arg(long)]
        json: bool,
    },
    /// Check whether a claim scenario is covered
    Coverage {
        scenario: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Compare one aspect across policy types
    Compare {
        query: String,
        #[arg(long = "policy-type")]
        policy_types: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Score retrieval against a labelled JSON dataset
    Eval {
        cases: PathBuf,
        #[arg(short, long, default_value_t = 5)]
        k: usize,
    },
    /// Summarize the query log
    Metrics {
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// List successful queries below this confidence
        #[arg(long)]
        low_confidence: Option<f32>,
    },
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Self::Ingest => "Ingest",
            Self::Search { .. } => "Search",
            Self::Query { .. } => "Query",
            Self::Coverage { .. } => "Coverage check",
            Self::Compare { .. } => "Comparison",
            Self::Eval { .. } => "Evaluation",
            Self::Metrics { .. } => "Metrics",
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("policyrag=info,warn"));
    tracing_subscriber::registry().with(fmt::layer().with_target(false).with_writer(std::io::stderr)).with(filter).init();
}

struct App {
    settings: Settings,
    base: PathBuf,
}

impl App {
    fn load() -> anyhow::Result<Self> {
        let config = Config::load().context("loading configuration")?;
        let settings = config.settings()?;
        let base = std::env::current_dir()?;
        Ok(Self { settings, base })
    }

    fn path(&self, p: &str) -> PathBuf { resolve_with_base(&self.base, p) }

    fn embedder(&self) -> anyhow::Result<Arc<dyn Embedder>> { Ok(Arc::from(get_default_embedder(&self.settings.embedding)?)) }

    fn store(&self, dim: usize) -> anyhow::Result<Arc<dyn VectorStore>> {
        let data = &self.settings.data;
        Ok(Arc::new(LanceVectorStore::new(self.path(&data.vector_db_dir), &data.table_name, dim)?))
    }

    fn retriever(&self) -> anyhow::Result<HybridRetriever> {
        let embedder = self.embedder()?;
        let store = self.store(embedder.dim())?;
        let semantic = SemanticRetriever::new(embedder, store);
        Ok(HybridRetriever::open(&self.settings.retrieval, &self.path(&self.settings.data.lexical_index_dir), semantic)?)
    }

    fn generator(&self) -> anyhow::Result<Arc<dyn Generator>> { Ok(Arc::new(OpenAiGenerator::from_settings(&self.settings.llm)?)) }

    fn pipeline(&self) -> anyhow::Result<AnswerPipeline> {
        let metrics = sink_from_settings(&self.settings.monitoring, &self.base);
        Ok(AnswerPipeline::new(self.retriever()?, self.generator()?, metrics, &self.settings))
    }

    fn metrics_log(&self) -> Option<PathBuf> { self.settings.monitoring.log_path.as_deref().map(|p| self.path(p)) }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ingest(app: &App) -> anyhow::Result<()> {
    let data = &app.settings.data;
    let paths = IngestPaths {
        general_docs_dir: app.path(&data.general_docs_dir),
        personal_docs_dir: app.path(&data.personal_docs_dir),
        lexical_index_dir: app.path(&data.lexical_index_dir),
    };
    tracing::info!(general = %paths.general_docs_dir.display(), personal = %paths.personal_docs_dir.display(), "ingesting documents");
    let embedder = app.embedder()?;
    let store = app.store(embedder.dim())?;
    let report = Ingestor::new(paths, &app.settings.chunking, embedder, store)
        .with_lexical(app.settings.retrieval.hybrid_enabled)
        .with_batch_size(app.settings.embedding.batch_size)
        .ingest()?;
    println!("{}", report.message);
    if !report.policy_types_found.is_empty() {
        println!("Policy types: {}", report.policy_types_found.join(", "));
    }
    Ok(())
}

fn search(app: &App, query: &str, k: Option<usize>, filter: &MetadataFilter, personal: bool) -> anyhow::Result<()> {
    let retriever = app.retriever()?;
    let k = k.unwrap_or(app.settings.retrieval.default_k);
    let results = retriever.retrieve(query, k, filter, personal.then_some(true))?;
    if results.is_empty() {
        println!("No results.");
    }
    for (i, chunk) in results.iter().enumerate() {
        let preview: String = chunk.content.chars().take(160).collect();
        println!("{:>2}. [{:.3}] {} ({}) {}", i + 1, chunk.relevance(), chunk.source, chunk.metadata.document_class, preview.replace('\n', " "));
    }
    Ok(())
}

fn query(app: &App, question: &str, filter: &MetadataFilter, judge: bool, json: bool) -> anyhow::Result<()> {
    let response = app.pipeline()?.answer(question, filter)?;
    if json {
        print_json(&response)?;
    } else {
        println!("{}\n", response.answer);
        println!("Confidence: {}", response.confidence);
        if !response.sources.is_empty() {
            println!("Sources: {}", response.sources.join(", "));
        }
        for citation in &response.citations {
            println!("  - {} {}", citation.section, citation.page.as_deref().unwrap_or(""));
        }
    }
    if judge {
        let (score, explanation) = evaluate_answer_relevance(app.generator()?.as_ref(), question, &response.answer);
        println!("Answer relevance: {score:.2} ({explanation})");
    }
    Ok(())
}

fn coverage(app: &App, scenario: &str, filter: &MetadataFilter, json: bool) -> anyhow::Result<()> {
    let response = app.pipeline()?.check_coverage(scenario, filter)?;
    if json { return print_json(&response); }
    println!("Covered: {}", if response.is_covered { "yes" } else { "no" });
    println!("{}", response.coverage_determination);
    for (label, value) in [("Section", &response.policy_section), ("Limit", &response.coverage_limit), ("Deductible", &response.deductible), ("Conditions", &response.conditions)] {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    for exclusion in &response.exclusions_checked {
        println!("  - {} {}: {}", if exclusion.applies { "[applies]" } else { "[n/a]" }, exclusion.section, exclusion.description);
    }
    println!("Confidence: {}", response.confidence);
    Ok(())
}

fn compare(app: &App, query: &str, policy_types: &[String], json: bool) -> anyhow::Result<()> {
    let response = app.pipeline()?.compare(query, policy_types)?;
    if json { return print_json(&response); }
    println!("{}", response.comparison_type);
    for item in &response.comparison_items {
        let number = item.policy_number.as_deref().map(|n| format!(" #{n}")).unwrap_or_default();
        println!("  - {}{number}: {}", item.policy_type, item.value);
    }
    println!("\n{}", response.summary);
    Ok(())
}

fn eval(app: &App, cases: &Path, k: usize) -> anyhow::Result<()> {
    let cases = load_cases(cases).with_context(|| format!("reading {}", cases.display()))?;
    let report = evaluate(&app.retriever()?, &cases, k)?;
    print_json(&report)
}

fn metrics(app: &App, days: i64, low_confidence: Option<f32>) -> anyhow::Result<()> {
    let Some(path) = app.metrics_log() else {
        println!("No query log configured (monitoring.log_path).");
        return Ok(());
    };
    let records = read_records(&path)?;
    print_json(&summarize(&records, days, chrono::Utc::now()))?;
    if let Some(threshold) = low_confidence {
        for record in low_confidence_queries(&records, threshold, 20) {
            println!("{} [{:.2}] {}", record.timestamp, record.metrics.confidence_score.unwrap_or(0.0), record.metrics.question);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let app = App::load()?;
    match cli.command {
        Command::Ingest => ingest(&app),
        Command::Search { query, k, filter, personal } => search(&app, &query, k, &filter.filter(), personal),
        Command::Query { question, filter, judge, json } => query(&app, &question, &filter.filter(), judge, json),
        Command::Coverage { scenario, filter, json } => coverage(&app, &scenario, &filter.filter(), json),
        Command::Compare { query, policy_types, json } => compare(&app, &query, &policy_types, json),
        Command::Eval { cases, k } => eval(&app, &cases, k),
        Command::Metrics { days, low_confidence } => metrics(&app, days, low_confidence),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let label = cli.command.label();
    if let Err(e) = run(cli) {
        tracing::error!(command = label, "{label} failed: {e:#}");
        std::process::exit(1);
    }
}
