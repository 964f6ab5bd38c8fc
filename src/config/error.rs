use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: Box<ConfigError>,
    },

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML document: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render TOML document: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("document root must be a mapping")]
    RootNotMapping,

    #[error("unsupported {kind} value at '{path}'")]
    UnsupportedValue { path: String, kind: &'static str },

    #[error("unsupported {kind} key at '{path}'")]
    UnsupportedKey { path: String, kind: &'static str },

    #[error("can't find '{path}': '{segment}' is not reachable through a mapping")]
    PathTraversal { path: String, segment: String },

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("value at '{0}' is not a mapping")]
    NotATree(String),

    #[error("invalid extends pointer at '{path}': {reason}")]
    InvalidExtends { path: String, reason: &'static str },

    #[error("failed loading {file}::{service}")]
    MissingService { file: String, service: String },

    #[error("cyclic extends: {file}::{service} was already visited")]
    CyclicExtends { file: String, service: String },

    #[error("environment entry '{key}' must be a string, found a {kind}")]
    InvalidEnvironment { key: String, kind: &'static str },
}
