//! rivetlink CLI - inspect and hot-reload Rivet project documents
//!
//! Usage:
//!   rivetlink inspect project.rivet-project
//!   rivetlink watch --config rivetlink.toml
//!   rivetlink dump-config > rivetlink.toml

use clap::{Parser, Subcommand};
use rivetlink_core::{extract_graph_data, AdapterConfig, Project};
use rivetlink_runtime::{
    spawn_reload_loop, DocumentParser, ProjectLoader, ProjectStore, ProjectWatcher,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "rivetlink",
    version = env!("CARGO_PKG_VERSION"),
    about = "Rivet project loader and graph metadata tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print each graph's inputs, outputs and partial-output node as JSON
    Inspect {
        /// Project document (YAML or JSON)
        file: PathBuf,
    },
    /// Load a project and reload it whenever the file changes
    Watch {
        /// Adapter config (TOML)
        #[arg(long, conflicts_with = "file")]
        config: Option<PathBuf>,

        /// Project document to watch, instead of a config file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Log every step at info level
        #[arg(long)]
        verbose: bool,
    },
    /// Dump default config as TOML and exit
    DumpConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = "rivetlink=info,rivetlink_core=info,rivetlink_runtime=info";
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Inspect { file } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {}", file.display(), e))?;
            let project = Project::from_document(&text)?;
            let graphs = extract_graph_data(&project);
            println!("{}", serde_json::to_string_pretty(&graphs)?);
        }
        Command::Watch {
            config,
            file,
            verbose,
        } => {
            let mut config = match (config, file) {
                (Some(path), _) => AdapterConfig::load(&path)?,
                (None, Some(file)) => AdapterConfig::new(file),
                (None, None) => anyhow::bail!("pass --config or --file"),
            };
            config.verbose |= verbose;
            watch(config).await?;
        }
        Command::DumpConfig => {
            println!("{}", AdapterConfig::new("project.rivet-project").to_toml());
        }
    }

    Ok(())
}

async fn watch(config: AdapterConfig) -> anyhow::Result<()> {
    let store = ProjectStore::new();
    let loader = ProjectLoader::new(
        config.filename.clone(),
        Arc::new(DocumentParser),
        store.clone(),
    );
    let watcher = ProjectWatcher::new(
        &config.filename,
        config.watch.poll_interval(),
        config.watch.stable_polls(),
    );

    if loader.reload().await.is_ok() {
        log_graphs(&store, config.verbose);
    }
    let handle = spawn_reload_loop(loader, watcher);

    // Summarize after each reload by watching the store's snapshot identity.
    let mut last = store.current();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = tokio::time::sleep(config.watch.poll_interval()) => {}
        }
        let current = store.current();
        let changed = match (&last, &current) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, Some(_)) => true,
            _ => false,
        };
        if changed {
            log_graphs(&store, config.verbose);
            last = current;
        }
    }

    info!("Shutting down");
    handle.shutdown().await;
    Ok(())
}

fn log_graphs(store: &ProjectStore, verbose: bool) {
    let Some(project) = store.current() else { return };
    for (name, data) in extract_graph_data(&project) {
        info!(
            "Graph '{}': inputs {:?}, outputs {:?}",
            name,
            data.inputs.keys().collect::<Vec<_>>(),
            data.outputs.keys().collect::<Vec<_>>()
        );
        if verbose {
            if let Some(node) = &data.partial_output_node_id {
                info!("Graph '{}': partial output node {}", name, node);
            }
        }
    }
}
