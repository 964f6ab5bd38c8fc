//! Configuration documents and extends-chain resolution.

mod builder;
mod env;
mod error;
mod file;
mod format;
mod merge;
mod source;
mod template;
mod tree;

pub use builder::{select, Resolver, Selection};
pub use env::{Environment, ENV_KEY};
pub use error::ConfigError;
pub use file::{load, FileSource};
pub use format::{load_raw, DocumentFormat};
pub use merge::{merge_entry, merge_tree, MergePolicy};
pub use source::{DocumentSource, MemorySource};
pub use template::expand;
pub use tree::{Tree, Value};
