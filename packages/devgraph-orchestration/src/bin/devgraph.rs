//! devgraph CLI: run an ingestion job, query the windowed subgraph, or
//! validate the graph against a repository's working tree.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use devgraph_orchestration::{IngestOptions, IngestProfile, IngestionOrchestrator, JobRegistry};
use devgraph_storage::domain::SubgraphQuery;
use devgraph_storage::query::{commits_buckets, Granularity};
use devgraph_storage::{DataValidator, GraphClient, GraphConfig, SubgraphEngine};

#[derive(Parser)]
#[command(name = "devgraph", about = "Developer knowledge graph ingestion and query engine")]
struct Cli {
    /// Repository working tree (defaults to REPO_PATH or the current dir).
    #[arg(long)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full ingestion pipeline.
    Ingest {
        #[arg(long, default_value = "full")]
        profile: String,
        #[arg(long, default_value_t = 1000)]
        commit_limit: usize,
        #[arg(long)]
        doc_limit: Option<usize>,
        #[arg(long)]
        code_limit: Option<usize>,
        #[arg(long, default_value_t = 4)]
        workers: usize,
        #[arg(long)]
        subpath: Option<String>,
        /// Skip relationship derivation.
        #[arg(long)]
        no_derive: bool,
        /// Generate chunk embeddings.
        #[arg(long)]
        embeddings: bool,
        /// Keep existing graph contents.
        #[arg(long)]
        no_reset: bool,
    },
    /// Query a windowed subgraph page.
    Subgraph {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long)]
        counts: bool,
    },
    /// Commit timeline buckets.
    Timeline {
        #[arg(long, default_value = "day")]
        granularity: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Run the read-only validators.
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let repo_path = cli
        .repo
        .or_else(|| std::env::var("REPO_PATH").ok().map(PathBuf::from))
        .or_else(|| std::env::current_dir().ok())
        .context("cannot resolve repository path")?;

    let config = GraphConfig::from_env();
    let client = Arc::new(
        GraphClient::connect(&config)
            .await
            .context("cannot connect to the graph store")?,
    );

    match cli.command {
        Command::Ingest {
            profile,
            commit_limit,
            doc_limit,
            code_limit,
            workers,
            subpath,
            no_derive,
            embeddings,
            no_reset,
        } => {
            let profile = IngestProfile::parse(&profile)
                .with_context(|| format!("unknown profile: {}", profile))?;
            let registry = Arc::new(JobRegistry::new());
            let orchestrator = IngestionOrchestrator::new(client, registry, repo_path);

            let job = orchestrator
                .run_job(IngestOptions {
                    profile,
                    reset_graph: !no_reset,
                    commit_limit,
                    doc_limit,
                    code_limit,
                    derive_relationships: !no_derive,
                    include_embeddings: embeddings,
                    max_workers: workers,
                    subpath,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Subgraph {
            from,
            to,
            types,
            limit,
            cursor,
            counts,
        } => {
            let engine = SubgraphEngine::new(client);
            let page = engine
                .get_windowed_subgraph(&SubgraphQuery {
                    from_timestamp: from,
                    to_timestamp: to,
                    node_types: types,
                    limit,
                    cursor,
                    include_counts: counts,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Command::Timeline {
            granularity,
            from,
            to,
            limit,
        } => {
            let granularity = Granularity::parse(&granularity)
                .with_context(|| format!("unknown granularity: {}", granularity))?;
            let buckets =
                commits_buckets(&client, granularity, from.as_deref(), to.as_deref(), limit)
                    .await?;
            println!("{}", serde_json::to_string_pretty(&buckets)?);
        }
        Command::Validate => {
            let validator = DataValidator::new(&client);
            let schema = validator.validate_schema_completeness().await?;
            let temporal = validator.validate_temporal_consistency().await?;
            let integrity = validator.validate_relationship_integrity().await?;
            let duplicates = validator.detect_duplicate_relationships().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "schema": schema,
                    "temporal": temporal,
                    "integrity": integrity,
                    "duplicate_groups": duplicates.len(),
                }))?
            );
        }
    }

    Ok(())
}
