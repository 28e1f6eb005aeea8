//! Graph engine capability traits
//!
//! The engine is an external collaborator reduced to two operations: parse a
//! project document, and build a processor that runs one graph to completion.

use rivetlink_core::{InputMap, Project, ResultMap};
use std::sync::Arc;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("project parse failed: {0}")]
    Parse(String),

    #[error("processor failed: {0}")]
    Processor(String),

    #[error("graph not known to engine: {0}")]
    UnknownGraph(String),
}

impl From<rivetlink_core::Error> for EngineError {
    fn from(err: rivetlink_core::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Model-access credentials, passed through to the engine untouched.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Everything a processor is bound to besides the project.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub graph: String,
    pub inputs: InputMap,
    pub credentials: Credentials,
}

pub trait ProjectParser: Send + Sync {
    fn parse_project(&self, text: &str) -> EngineResult<Project>;
}

/// A single-use processor. Consumed by `run`.
#[async_trait::async_trait]
pub trait GraphProcessor: Send {
    async fn run(self: Box<Self>) -> EngineResult<ResultMap>;
}

pub trait GraphEngine: ProjectParser {
    fn name(&self) -> &str;

    fn create_processor(
        &self,
        project: Arc<Project>,
        options: ProcessorOptions,
    ) -> EngineResult<Box<dyn GraphProcessor>>;
}

/// Parser for the project document layouts understood by `rivetlink-core`.
/// Engines that read the same format can delegate to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentParser;

impl ProjectParser for DocumentParser {
    fn parse_project(&self, text: &str) -> EngineResult<Project> {
        Ok(Project::from_document(text)?)
    }
}
