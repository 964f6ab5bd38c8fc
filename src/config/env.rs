use std::collections::btree_map;
use std::collections::BTreeMap;

use super::tree::{Tree, Value};
use super::ConfigError;

/// Key of the document-level environment block.
pub const ENV_KEY: &str = "_env";

/// Flat name → value bindings used for `${NAME}` templating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an environment from a mapping whose values are all strings.
    pub fn from_tree(tree: &Tree) -> Result<Self, ConfigError> {
        tree.iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key.clone(), s.clone())),
                other => Err(ConfigError::InvalidEnvironment {
                    key: key.clone(),
                    kind: other.kind(),
                }),
            })
            .collect()
    }

    /// Reads the `_env` block of a document, if it has one.
    pub fn from_document(document: &Tree) -> Result<Option<Self>, ConfigError> {
        match document.get(ENV_KEY) {
            Some(Value::Tree(block)) => Self::from_tree(block).map(Some),
            Some(other) => Err(ConfigError::InvalidEnvironment {
                key: ENV_KEY.to_string(),
                kind: other.kind(),
            }),
            None => Ok(None),
        }
    }

    /// Captures every variable of the current process.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Captures process variables starting with `prefix`, with the prefix removed.
    ///
    /// With prefix `APP_`, `APP_DB_HOST=x` becomes the binding `DB_HOST = x`.
    pub fn from_process_with_prefix(prefix: &str) -> Self {
        std::env::vars()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(prefix)?;
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value))
            })
            .collect()
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Binds `name`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates bindings in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.vars.iter()
    }

    /// Layers `top` over `self`; bindings in `top` win on collision.
    pub fn overlay(mut self, top: &Environment) -> Self {
        for (name, value) in top.iter() {
            self.vars.insert(name.clone(), value.clone());
        }
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Environment {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.vars
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}
