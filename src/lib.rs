pub mod config;

pub use config::{
    load, load_raw, select, ConfigError, DocumentFormat, DocumentSource, Environment, FileSource,
    MemorySource, MergePolicy, Resolver, Selection, Tree, Value,
};
