//! Error types for Rivetlink

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("project parse error: {0}")]
    ProjectParse(String),

    #[error("invalid node key: {0}")]
    InvalidNodeKey(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn project_parse(message: impl Into<String>) -> Self {
        Self::ProjectParse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
