//! Rivetlink Runtime - hot-reloading adapter between a host key/value API and
//! a graph engine
//!
//! Flow per run: graph metadata → sequential input fetch → one processor run →
//! output unwrapping → sequential publish. The project file is watched and
//! reloaded in the background; runs always see the last project that parsed.

pub mod adapter;
pub mod engine;
pub mod host;
pub mod inputs;
pub mod loader;
pub mod outputs;
pub mod watcher;

pub use adapter::{RivetAdapter, RunError};
pub use engine::{
    Credentials, DocumentParser, EngineError, EngineResult, GraphEngine, GraphProcessor,
    ProcessorOptions, ProjectParser,
};
pub use host::{HostApi, HostError, HostResult, MemoryHost};
pub use inputs::resolve_inputs;
pub use loader::{LoadError, ProjectLoader, ProjectStore};
pub use outputs::{publish_outputs, resolve_outputs};
pub use watcher::{spawn_reload_loop, FileChange, ProjectWatcher, WatchHandle};
