//! Project loading and the shared active-project slot
//!
//! The store holds the last project that parsed cleanly. A reload either
//! swaps in a complete new project or leaves the old one in place.

use crate::engine::{EngineError, ProjectParser};
use rivetlink_core::Project;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] EngineError),
}

/// Cloneable handle to the active project. Readers get an `Arc` snapshot that
/// stays valid across later reloads.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    slot: Arc<RwLock<Option<Arc<Project>>>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Project>> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Swap in a new project, returning the previous one.
    pub fn replace(&self, project: Arc<Project>) -> Option<Arc<Project>> {
        self.slot.write().unwrap_or_else(|e| e.into_inner()).replace(project)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

/// Reads one project file through a parser into a [`ProjectStore`].
pub struct ProjectLoader<P: ProjectParser + ?Sized> {
    path: PathBuf,
    parser: Arc<P>,
    store: ProjectStore,
}

impl<P: ProjectParser + ?Sized> Clone for ProjectLoader<P> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            parser: self.parser.clone(),
            store: self.store.clone(),
        }
    }
}

impl<P: ProjectParser + ?Sized> ProjectLoader<P> {
    pub fn new(path: impl Into<PathBuf>, parser: Arc<P>, store: ProjectStore) -> Self {
        Self {
            path: path.into(),
            parser,
            store,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Read and parse the file, swapping it in on success. Failures are logged
    /// and leave the current project untouched.
    pub async fn reload(&self) -> Result<Arc<Project>, LoadError> {
        info!("Loading project from {}", self.path.display());
        match self.load().await {
            Ok(project) => {
                let project = Arc::new(project);
                self.store.replace(project.clone());
                info!(
                    "Project reloaded: {} graphs, {} nodes",
                    project.graphs.len(),
                    project.node_count()
                );
                Ok(project)
            }
            Err(e) => {
                error!("Error loading project from {}: {}", self.path.display(), e);
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Project, LoadError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(self.parser.parse_project(&text)?)
    }
}
