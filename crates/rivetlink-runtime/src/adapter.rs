//! Adapter lifecycle: initialization, hot reload, and graph runs

use crate::engine::{Credentials, EngineError, GraphEngine, ProcessorOptions};
use crate::host::{HostApi, HostError};
use crate::inputs::resolve_inputs;
use crate::loader::{LoadError, ProjectLoader, ProjectStore};
use crate::outputs::{publish_outputs, resolve_outputs};
use crate::watcher::{spawn_reload_loop, ProjectWatcher, WatchHandle};
use indexmap::IndexMap;
use rivetlink_core::{extract_graph_data, AdapterConfig, GraphData, OutputMap, Project};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("no project loaded")]
    NoProject,

    #[error("graph '{0}' not found in project")]
    GraphNotFound(String),

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("execution failed: {0}")]
    Execution(#[from] EngineError),
}

pub struct RivetAdapter {
    config: AdapterConfig,
    engine: Arc<dyn GraphEngine>,
    loader: ProjectLoader<dyn GraphEngine>,
}

impl RivetAdapter {
    pub fn new(config: AdapterConfig, engine: Arc<dyn GraphEngine>) -> Self {
        Self::with_store(config, engine, ProjectStore::new())
    }

    /// Build an adapter over an existing store (shared with other readers).
    pub fn with_store(
        config: AdapterConfig,
        engine: Arc<dyn GraphEngine>,
        store: ProjectStore,
    ) -> Self {
        let loader = ProjectLoader::new(config.filename.clone(), engine.clone(), store);
        Self {
            config,
            engine,
            loader,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn store(&self) -> &ProjectStore {
        self.loader.store()
    }

    /// Register the file watch and perform the first load. A failed first load
    /// is logged; runs fail with [`RunError::NoProject`] until a reload succeeds.
    ///
    /// Dropping the returned handle stops watching. Keep it for as long as
    /// hot reload should run, or [`detach`](WatchHandle::detach) it.
    #[must_use = "dropping the handle stops hot reload"]
    pub async fn on_initialize(&self) -> WatchHandle {
        info!(
            "Initializing with engine '{}' and project {}",
            self.engine.name(),
            self.config.filename.display()
        );

        // Baseline before the first load so the initial read never counts as a change.
        let watcher = self.config.watch.enabled.then(|| {
            ProjectWatcher::new(
                &self.config.filename,
                self.config.watch.poll_interval(),
                self.config.watch.stable_polls(),
            )
        });

        let _ = self.loader.reload().await;

        match watcher {
            Some(watcher) => spawn_reload_loop(self.loader.clone(), watcher),
            None => {
                info!("File watching disabled");
                WatchHandle::inactive()
            }
        }
    }

    pub async fn reload(&self) -> Result<Arc<Project>, LoadError> {
        self.loader.reload().await
    }

    /// Graph metadata of the current project, if one is loaded.
    pub fn graphs(&self) -> Option<IndexMap<String, GraphData>> {
        self.store().current().map(|p| extract_graph_data(&p))
    }

    /// Run `graph` against the current project: fetch inputs from the host,
    /// execute, then publish the flattened outputs back.
    pub async fn run_graph(&self, host: &dyn HostApi, graph: &str) -> Result<OutputMap, RunError> {
        let verbose = self.config.verbose;
        info!("Running graph: {}", graph);

        let project = self.store().current().ok_or(RunError::NoProject)?;
        let mut graphs = extract_graph_data(&project);
        let graph_data = graphs
            .swap_remove(graph)
            .ok_or_else(|| RunError::GraphNotFound(graph.to_string()))?;

        let inputs = resolve_inputs(&graph_data, host, verbose).await?;
        if verbose {
            let slots: Vec<_> = inputs.keys().collect();
            info!("Calling processor for graph '{}' with inputs: {:?}", graph, slots);
        }

        let options = ProcessorOptions {
            graph: graph.to_string(),
            inputs,
            credentials: self.credentials(),
        };
        let processor = self.engine.create_processor(project, options)?;
        let result = processor.run().await?;

        if verbose {
            let keys: Vec<_> = result.keys().collect();
            info!("Graph '{}' execution completed, processing outputs: {:?}", graph, keys);
        }

        let outputs = resolve_outputs(&result, verbose);
        let published = publish_outputs(&outputs, host, verbose).await;
        if published < outputs.len() {
            warn!(
                "Published {}/{} outputs for graph '{}'",
                published,
                outputs.len(),
                graph
            );
        }

        let keys: Vec<_> = outputs.keys().collect();
        info!("Graph '{}' completed with outputs: {:?}", graph, keys);
        Ok(outputs)
    }

    /// Host-facing variant of [`run_graph`](Self::run_graph): any failure is
    /// logged and an empty map returned.
    pub async fn run_graph_or_empty(&self, host: &dyn HostApi, graph: &str) -> OutputMap {
        match self.run_graph(host, graph).await {
            Ok(outputs) => outputs,
            Err(e) => {
                error!("Graph '{}' failed: {}", graph, e);
                OutputMap::new()
            }
        }
    }

    fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.config.api_key.clone(),
            endpoint_url: self.config.endpoint_url.clone(),
        }
    }
}
