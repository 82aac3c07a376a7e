use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sonar_es::{ClusterHealthStatus, EsClient, EsClientConfig, Query, RequestBuilder};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sonar-es")]
#[command(about = "Inspect and maintain the Elasticsearch cluster behind the code-quality server")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SONAR_ES_CONFIG")]
    config: Option<PathBuf>,

    /// Cluster endpoints, overriding the configuration file
    #[arg(long, env = "SONAR_ES_HOSTS", value_delimiter = ',')]
    hosts: Vec<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show cluster health
    Health {
        /// Restrict to these indices
        indices: Vec<String>,
    },

    /// Block until the cluster reaches a status
    Wait {
        /// red, yellow or green
        #[arg(default_value = "yellow")]
        status: ClusterHealthStatus,
    },

    /// Print the highest value of a numeric field
    MaxValue {
        index: String,
        doc_type: String,
        field: String,
    },

    /// Refresh indices (all when none given)
    Refresh { indices: Vec<String> },

    /// Flush indices (all when none given)
    Flush {
        indices: Vec<String>,

        #[arg(long)]
        force: bool,
    },

    /// Force merge an index
    ForceMerge {
        index: String,

        /// Target segment count
        #[arg(long, default_value = "1")]
        max_num_segments: u32,
    },

    /// Check that indices exist
    Exists {
        #[arg(required = true)]
        indices: Vec<String>,
    },

    /// Count documents, optionally restricted to one type
    Count {
        indices: Vec<String>,

        #[arg(long = "type")]
        doc_type: Option<String>,
    },

    /// Show node statistics
    NodesStats {
        /// Sections such as jvm, os, fs
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<String>,
    },

    /// Show cluster statistics
    ClusterStats,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_config(cli: &Cli) -> Result<EsClientConfig> {
    let mut config = match &cli.config {
        Some(path) => EsClientConfig::load(path)?,
        None => EsClientConfig::default(),
    };
    if !cli.hosts.is_empty() {
        config.hosts = cli.hosts.clone();
        config.validate()?;
    }
    Ok(config)
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(client: &EsClient, command: Commands) -> Result<()> {
    match command {
        Commands::Health { indices } => {
            let health = client.prepare_health(&indices)?.execute().await?;
            print(&health)?;
        }
        Commands::Wait { status } => {
            tracing::info!("Waiting for cluster status {}", status);
            let health = client.wait_for_status(status).await?;
            if health.timed_out {
                anyhow::bail!("cluster is {} after waiting for {}", health.status, status);
            }
            print(&health)?;
        }
        Commands::MaxValue {
            index,
            doc_type,
            field,
        } => {
            let max = client
                .get_max_field_value(&index, &doc_type, &field)
                .await
                .with_context(|| format!("no max value for {}/{}.{}", index, doc_type, field))?;
            println!("{}", max);
        }
        Commands::Refresh { indices } => {
            let response = client.prepare_refresh(&indices)?.execute().await?;
            print(&response)?;
        }
        Commands::Flush { indices, force } => {
            let mut flush = client.prepare_flush(&indices)?;
            let response = flush.set_force(force)?.execute().await?;
            print(&response)?;
        }
        Commands::ForceMerge {
            index,
            max_num_segments,
        } => {
            tracing::info!("Force merging {} to {} segment(s)", index, max_num_segments);
            let mut merge = client.prepare_force_merge(&index)?;
            let response = merge
                .set_max_num_segments(max_num_segments)?
                .execute()
                .await?;
            print(&response)?;
        }
        Commands::Exists { indices } => {
            let response = client.prepare_indices_exist(&indices)?.execute().await?;
            print(&response)?;
        }
        Commands::Count { indices, doc_type } => {
            let mut count = client.prepare_count(&indices)?;
            count.set_query(Query::match_all())?;
            if let Some(doc_type) = doc_type {
                count.set_types(&[doc_type])?;
            }
            let response = count.execute().await?;
            print(&response)?;
        }
        Commands::NodesStats { metrics } => {
            let mut stats = client.prepare_nodes_stats::<&str>(&[])?;
            let response = stats.set_metrics(&metrics)?.execute().await?;
            print(&response)?;
        }
        Commands::ClusterStats => {
            let response = client.prepare_cluster_stats()?.execute().await?;
            print(&response)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(&cli)?;
    let client = EsClient::connect(&config).context("Failed to create ES client")?;
    client.start()?;

    let result = run(&client, cli.command).await;
    client.stop().await?;
    result
}
