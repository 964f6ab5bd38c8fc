//! Text formats a [`Tree`] can be parsed from and rendered back to.

use std::path::Path;

use super::tree::{Tree, Value};
use super::ConfigError;

/// Supported document formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// Picks a format from a file extension: `.toml` is TOML, anything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Yaml,
        }
    }

    /// Parses document text into a [`Tree`].
    ///
    /// The root must be a mapping. Numbers, booleans and datetimes become
    /// strings; nulls, tagged values and non-scalar keys are rejected.
    pub fn parse(self, text: &str) -> Result<Tree, ConfigError> {
        match self {
            DocumentFormat::Yaml => {
                let raw: serde_yaml::Value = serde_yaml::from_str(text)?;
                match raw {
                    serde_yaml::Value::Mapping(mapping) => yaml_mapping(mapping, ""),
                    // An empty document is an empty tree.
                    serde_yaml::Value::Null => Ok(Tree::new()),
                    _ => Err(ConfigError::RootNotMapping),
                }
            }
            DocumentFormat::Toml => {
                let raw: toml::Table = toml::from_str(text)?;
                Ok(toml_table(raw))
            }
        }
    }

    /// Renders a [`Tree`] back to text.
    pub fn render(self, tree: &Tree) -> Result<String, ConfigError> {
        match self {
            DocumentFormat::Yaml => Ok(serde_yaml::to_string(tree)?),
            DocumentFormat::Toml => Ok(toml::to_string(tree)?),
        }
    }
}

impl Tree {
    /// Renders the tree as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        DocumentFormat::Yaml.render(self)
    }
}

/// Parses raw YAML bytes into a [`Tree`].
pub fn load_raw(data: &[u8]) -> Result<Tree, ConfigError> {
    let text = std::str::from_utf8(data)?;
    DocumentFormat::Yaml.parse(text)
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}/{key}")
    }
}

fn yaml_mapping(mapping: serde_yaml::Mapping, path: &str) -> Result<Tree, ConfigError> {
    let mut tree = Tree::new();
    for (key, value) in mapping {
        let key = yaml_key(key, path)?;
        let value = yaml_value(value, &child_path(path, &key))?;
        tree.insert(key, value);
    }
    Ok(tree)
}

fn yaml_key(key: serde_yaml::Value, path: &str) -> Result<String, ConfigError> {
    use serde_yaml::Value as Y;

    match key {
        Y::String(s) => Ok(s),
        Y::Number(n) => Ok(n.to_string()),
        Y::Bool(b) => Ok(b.to_string()),
        other => Err(ConfigError::UnsupportedKey {
            path: path.to_string(),
            kind: yaml_kind(&other),
        }),
    }
}

fn yaml_value(value: serde_yaml::Value, path: &str) -> Result<Value, ConfigError> {
    use serde_yaml::Value as Y;

    match value {
        Y::String(s) => Ok(Value::String(s)),
        Y::Number(n) => Ok(Value::String(n.to_string())),
        Y::Bool(b) => Ok(Value::String(b.to_string())),
        Y::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| yaml_value(item, &child_path(path, &i.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Y::Mapping(mapping) => yaml_mapping(mapping, path).map(Value::Tree),
        other => Err(ConfigError::UnsupportedValue {
            path: path.to_string(),
            kind: yaml_kind(&other),
        }),
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value as Y;

    match value {
        Y::Null => "null",
        Y::Bool(_) => "boolean",
        Y::Number(_) => "number",
        Y::String(_) => "string",
        Y::Sequence(_) => "sequence",
        Y::Mapping(_) => "mapping",
        Y::Tagged(_) => "tagged",
    }
}

fn toml_table(table: toml::Table) -> Tree {
    table
        .into_iter()
        .map(|(key, value)| (key, toml_value(value)))
        .collect()
}

fn toml_value(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::String(i.to_string()),
        toml::Value::Float(f) => Value::String(f.to_string()),
        toml::Value::Boolean(b) => Value::String(b.to_string()),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_value).collect()),
        toml::Value::Table(table) => Value::Tree(toml_table(table)),
    }
}
