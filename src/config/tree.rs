//! Nested key/value document model with `/`-delimited path lookup.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::Serialize;

use super::ConfigError;

/// A value stored in a [`Tree`].
///
/// Only three shapes are modelled. Numbers and booleans from the source
/// document are kept as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Array(Vec<Value>),
    Tree(Tree),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Value::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut Tree> {
        match self {
            Value::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Array(_) => "sequence",
            Value::Tree(_) => "mapping",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        Value::Tree(tree)
    }
}

/// A mapping of string keys to [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tree {
    entries: BTreeMap<String, Value>,
}

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns a mutable reference to the value under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates top-level keys in sorted order.
    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.entries.keys()
    }

    /// Iterates top-level entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Value> {
        self.entries.iter_mut()
    }

    /// Looks up a `/`-delimited path such as `extends/service`.
    ///
    /// An absent first segment yields `Ok(None)`. Every later segment must be
    /// reached through a mapping: descending from a string, a sequence, or a
    /// missing intermediate is a [`ConfigError::PathTraversal`]. An absent
    /// final key under a mapping is `Ok(None)`.
    pub fn find(&self, path: &str) -> Result<Option<&Value>, ConfigError> {
        let mut segments = path.split('/');
        let first = segments.next().unwrap_or_default();
        let Some(mut node) = self.entries.get(first) else {
            return Ok(None);
        };

        let mut segments = segments.peekable();
        while let Some(segment) = segments.next() {
            let traversal = || ConfigError::PathTraversal {
                path: path.to_string(),
                segment: segment.to_string(),
            };
            let tree = node.as_tree().ok_or_else(traversal)?;
            match tree.get(segment) {
                Some(next) => node = next,
                None if segments.peek().is_none() => return Ok(None),
                None => {
                    let missing = segments.next().unwrap_or(segment);
                    return Err(ConfigError::PathTraversal {
                        path: path.to_string(),
                        segment: missing.to_string(),
                    });
                }
            }
        }

        Ok(Some(node))
    }

    /// Mutable counterpart of [`find`](Self::find) with the same failure rules.
    pub fn find_mut(&mut self, path: &str) -> Result<Option<&mut Value>, ConfigError> {
        // Errors come from the shared lookup; the walk below cannot fail.
        if self.find(path)?.is_none() {
            return Ok(None);
        }

        let mut segments = path.split('/');
        let first = segments.next().unwrap_or_default();
        let mut node = self.entries.get_mut(first);
        for segment in segments {
            node = node
                .and_then(Value::as_tree_mut)
                .and_then(|tree| tree.get_mut(segment));
        }
        Ok(node)
    }

    /// Looks up `path` and requires the result to be a mapping.
    pub fn find_tree(&self, path: &str) -> Result<&Tree, ConfigError> {
        match self.find(path)? {
            Some(Value::Tree(tree)) => Ok(tree),
            Some(_) => Err(ConfigError::NotATree(path.to_string())),
            None => Err(ConfigError::PathNotFound(path.to_string())),
        }
    }

    /// Looks up `path` and returns it if it holds a string.
    pub fn find_str(&self, path: &str) -> Result<Option<&str>, ConfigError> {
        Ok(self.find(path)?.and_then(Value::as_str))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Tree {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Tree {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl std::ops::Index<&str> for Tree {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        &self.entries[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let c: Tree = [("c", "leaf")].into_iter().collect();
        let b: Tree = [("b", Value::Tree(c))].into_iter().collect();
        [
            ("a", Value::Tree(b)),
            ("list", Value::Array(vec!["x".into()])),
            ("name", "svc".into()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_index_and_kind() {
        let tree = sample();
        assert_eq!(tree["name"], Value::from("svc"));
        assert_eq!(tree["a"].kind(), "mapping");
        assert_eq!(tree["list"].kind(), "sequence");
    }

    #[test]
    fn test_find_nested_value() {
        let tree = sample();
        assert_eq!(tree.find("a/b/c").unwrap(), Some(&Value::from("leaf")));
    }

    #[test]
    fn test_find_absent_first_segment_is_none() {
        let tree = sample();
        assert_eq!(tree.find("missing/b/c").unwrap(), None);
        assert_eq!(tree.find("missing").unwrap(), None);
    }

    #[test]
    fn test_find_absent_last_segment_is_none() {
        let tree = sample();
        assert_eq!(tree.find("a/b/nope").unwrap(), None);
    }

    #[test]
    fn test_find_through_scalar_fails() {
        let tree = sample();
        let result = tree.find("name/inner");
        assert!(matches!(
            result,
            Err(ConfigError::PathTraversal { ref segment, .. }) if segment == "inner"
        ));
    }

    #[test]
    fn test_find_through_sequence_fails() {
        let tree = sample();
        assert!(matches!(
            tree.find("list/0"),
            Err(ConfigError::PathTraversal { .. })
        ));
    }

    #[test]
    fn test_find_through_absent_intermediate_fails() {
        let tree = sample();
        assert!(matches!(
            tree.find("a/nope/c"),
            Err(ConfigError::PathTraversal { ref segment, .. }) if segment == "c"
        ));
    }

    #[test]
    fn test_find_mut_writes_through() {
        let mut tree = sample();
        if let Some(Value::String(s)) = tree.find_mut("a/b/c").unwrap() {
            s.push_str("-changed");
        }
        assert_eq!(tree.find_str("a/b/c").unwrap(), Some("leaf-changed"));
        assert!(tree.find_mut("missing").unwrap().is_none());
    }

    #[test]
    fn test_find_tree_errors() {
        let tree = sample();
        assert!(tree.find_tree("a/b").is_ok());
        assert!(matches!(tree.find_tree("name"), Err(ConfigError::NotATree(_))));
        assert!(matches!(
            tree.find_tree("other"),
            Err(ConfigError::PathNotFound(_))
        ));
    }
}
