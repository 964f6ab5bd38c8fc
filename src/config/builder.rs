use std::collections::HashSet;

use tracing::debug;

use super::env::Environment;
use super::file::FileSource;
use super::merge::{merge_tree, MergePolicy};
use super::source::DocumentSource;
use super::tree::{Tree, Value};
use super::ConfigError;

/// The resolved subtree and the environment it was templated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub tree: Tree,
    pub env: Environment,
}

/// The `extends` pointer of a service node.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Extends {
    file: String,
    service: String,
}

impl Extends {
    /// Reads `extends/file` and `extends/service` from `node`.
    ///
    /// Returns `None` when there is no `file`, which ends the chain.
    fn read(node: &Tree, location: &str) -> Result<Option<Self>, ConfigError> {
        let invalid = |reason| ConfigError::InvalidExtends {
            path: location.to_string(),
            reason,
        };

        match (node.find("extends/file")?, node.find("extends/service")?) {
            (None, _) => Ok(None),
            (Some(Value::String(file)), Some(Value::String(service))) => Ok(Some(Self {
                file: file.clone(),
                service: service.clone(),
            })),
            (Some(Value::String(_)), None) => Err(invalid("`extends/service` is missing")),
            _ => Err(invalid("`extends/file` and `extends/service` must be strings")),
        }
    }
}

/// Resolves the node at `path` by walking its extends chain.
///
/// For every hop the ancestor document is loaded from `source`, its `service`
/// subtree is merged into the node with [`MergePolicy::KeepExisting`], and the
/// whole `tree` is templated with the ancestor's `_env` block overlaid by
/// `parent_env`. `tree` is modified in place. The chain ends at the first
/// ancestor without `extends/file`; revisiting a `file::service` pair is a
/// [`ConfigError::CyclicExtends`].
///
/// The returned environment is the one used by the last hop, and is empty
/// when the node has no `extends`.
pub fn select<S>(
    tree: &mut Tree,
    path: &str,
    parent_env: &Environment,
    source: &S,
) -> Result<Selection, ConfigError>
where
    S: DocumentSource + ?Sized,
{
    let mut next = Extends::read(tree.find_tree(path)?, path)?;
    let mut env = Environment::new();
    let mut visited = HashSet::new();

    while let Some(Extends { file, service }) = next {
        if !visited.insert((file.clone(), service.clone())) {
            return Err(ConfigError::CyclicExtends { file, service });
        }

        debug!(%file, %service, "extending {path}");
        let document = source.load(&file)?;
        let ancestor = match document.find(&service)? {
            Some(Value::Tree(ancestor)) => ancestor,
            Some(_) => return Err(ConfigError::NotATree(format!("{file}::{service}"))),
            None => return Err(ConfigError::MissingService { file, service }),
        };

        env = match Environment::from_document(&document)? {
            Some(own) => own.overlay(parent_env),
            None => parent_env.clone(),
        };

        let target = tree
            .find_mut(path)?
            .and_then(Value::as_tree_mut)
            .ok_or_else(|| ConfigError::NotATree(path.to_string()))?;
        merge_tree(ancestor, target, MergePolicy::KeepExisting);
        tree.templatize(&env);

        next = Extends::read(ancestor, &format!("{file}::{service}"))?;
    }

    Ok(Selection {
        tree: tree.find_tree(path)?.clone(),
        env,
    })
}

/// Resolves services against a [`DocumentSource`] with a parent environment.
///
/// ## Example
///
/// ```no_run
/// use extendconf::Resolver;
///
/// let selection = Resolver::builder()
///     .with_var("REGION", "eu-west-1")
///     .resolve("services.yaml", "api")?;
///
/// println!("{}", selection.tree.to_yaml()?);
/// # Ok::<(), extendconf::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Resolver<S = FileSource> {
    source: S,
    env: Environment,
}

impl Resolver<FileSource> {
    /// Creates a resolver that loads documents from the working directory.
    pub fn builder() -> Self {
        Self {
            source: FileSource::new(),
            env: Environment::new(),
        }
    }
}

impl Default for Resolver<FileSource> {
    fn default() -> Self {
        Self::builder()
    }
}

impl<S: DocumentSource> Resolver<S> {
    /// Replaces the document source.
    pub fn with_source<T: DocumentSource>(self, source: T) -> Resolver<T> {
        Resolver {
            source,
            env: self.env,
        }
    }

    /// Adds bindings to the parent environment. Later bindings win.
    #[must_use]
    pub fn with_env(mut self, env: &Environment) -> Self {
        self.env = self.env.overlay(env);
        self
    }

    /// Adds a single parent binding.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.set(name, value);
        self
    }

    /// Adds process environment variables starting with `prefix`, prefix removed.
    #[must_use]
    pub fn with_process_env(self, prefix: &str) -> Self {
        let vars = Environment::from_process_with_prefix(prefix);
        self.with_env(&vars)
    }

    /// Returns the document source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the parent environment handed to every resolution.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Resolves `path` inside an already loaded tree. See [`select`].
    pub fn select(&self, tree: &mut Tree, path: &str) -> Result<Selection, ConfigError> {
        select(tree, path, &self.env, &self.source)
    }

    /// Loads `identifier` through the source, then resolves `path` inside it.
    pub fn resolve(&self, identifier: &str, path: &str) -> Result<Selection, ConfigError> {
        let mut tree = self.source.load(identifier)?;
        self.select(&mut tree, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_raw, MemorySource};

    fn yaml(text: &str) -> Tree {
        load_raw(text.as_bytes()).unwrap()
    }

    fn chain_source() -> MemorySource {
        MemorySource::new().with_document(
            "B.yaml",
            yaml(
                r#"
base:
  port: "80"
  host: "${H}"
_env:
  H: b-host
"#,
            ),
        )
    }

    fn consumer() -> Tree {
        yaml(
            r#"
myservice:
  extends:
    file: B.yaml
    service: base
  port: "8080"
"#,
        )
    }

    #[test]
    fn test_consumer_wins_and_ancestor_is_templated() {
        let mut tree = consumer();
        let selection = select(&mut tree, "myservice", &Environment::new(), &chain_source()).unwrap();

        assert_eq!(selection.tree.find_str("port").unwrap(), Some("8080"));
        assert_eq!(selection.tree.find_str("host").unwrap(), Some("b-host"));
        assert_eq!(selection.env.get("H"), Some("b-host"));
        // The working tree was resolved in place.
        assert_eq!(tree.find_str("myservice/host").unwrap(), Some("b-host"));
    }

    #[test]
    fn test_parent_env_wins_over_document_env() {
        let mut tree = consumer();
        let parent: Environment = [("H", "parent-host")].into_iter().collect();
        let selection = select(&mut tree, "myservice", &parent, &chain_source()).unwrap();

        assert_eq!(selection.tree.find_str("host").unwrap(), Some("parent-host"));
        assert_eq!(selection.env.get("H"), Some("parent-host"));
    }

    #[test]
    fn test_without_extends_returns_node_and_empty_env() {
        let mut tree = yaml("svc:\n  url: '${X}'\n");
        let parent: Environment = [("X", "x")].into_iter().collect();
        let selection = select(&mut tree, "svc", &parent, &MemorySource::new()).unwrap();

        // No hop, so no templating pass and nothing accumulated.
        assert_eq!(selection.tree.find_str("url").unwrap(), Some("${X}"));
        assert!(selection.env.is_empty());
    }

    #[test]
    fn test_ancestor_without_env_block_uses_parent_env() {
        let source = MemorySource::new().with_document("B.yaml", yaml("base:\n  h: '${H}'\n"));
        let mut tree = yaml("svc:\n  extends: { file: B.yaml, service: base }\n");
        let parent: Environment = [("H", "p")].into_iter().collect();

        let selection = select(&mut tree, "svc", &parent, &source).unwrap();
        assert_eq!(selection.tree.find_str("h").unwrap(), Some("p"));
        assert_eq!(selection.env, parent);
    }

    #[test]
    fn test_boxed_source() {
        let source: Box<dyn DocumentSource> = Box::new(chain_source());
        let mut tree = consumer();

        let selection = select(&mut tree, "myservice", &Environment::new(), &source).unwrap();
        assert_eq!(selection.tree["host"], Value::from("b-host"));
    }

    #[test]
    fn test_multi_hop_chain() {
        let source = MemorySource::new()
            .with_document(
                "B.yaml",
                yaml(
                    r#"
mid:
  extends: { file: C.yaml, service: root }
  tags: [b]
  db:
    host: "${DB}"
_env:
  DB: b-db
"#,
                ),
            )
            .with_document(
                "C.yaml",
                yaml(
                    r#"
root:
  tags: [c, b]
  db:
    host: c-host
    port: "5432"
  level: "${LEVEL}"
_env:
  LEVEL: c-level
  DB: c-db
"#,
                ),
            );
        let mut tree = yaml("svc:\n  extends: { file: B.yaml, service: mid }\n  name: a\n");

        let selection = select(&mut tree, "svc", &Environment::new(), &source).unwrap();
        let resolved = &selection.tree;

        assert_eq!(resolved.find_str("name").unwrap(), Some("a"));
        assert_eq!(
            resolved.get("tags"),
            Some(&Value::Array(vec!["b".into(), "c".into()]))
        );
        assert_eq!(resolved.find_str("db/host").unwrap(), Some("b-db"));
        assert_eq!(resolved.find_str("db/port").unwrap(), Some("5432"));
        assert_eq!(resolved.find_str("level").unwrap(), Some("c-level"));
        // The consumer's own pointer is kept.
        assert_eq!(resolved.find_str("extends/file").unwrap(), Some("B.yaml"));
        assert_eq!(selection.env.get("DB"), Some("c-db"));
    }

    #[test]
    fn test_templating_covers_whole_tree() {
        let mut tree = consumer();
        tree.insert("other", yaml("url: '${H}'\n"));

        select(&mut tree, "myservice", &Environment::new(), &chain_source()).unwrap();
        assert_eq!(tree.find_str("other/url").unwrap(), Some("b-host"));
    }

    #[test]
    fn test_nested_target_path() {
        let mut tree = yaml(
            "services:\n  web:\n    extends: { file: B.yaml, service: base }\n",
        );
        let selection =
            select(&mut tree, "services/web", &Environment::new(), &chain_source()).unwrap();
        assert_eq!(selection.tree.find_str("port").unwrap(), Some("80"));
    }

    #[test]
    fn test_missing_service() {
        let mut tree = yaml("svc:\n  extends: { file: B.yaml, service: nope }\n");
        let err = select(&mut tree, "svc", &Environment::new(), &chain_source()).unwrap_err();

        assert!(matches!(err, ConfigError::MissingService { .. }));
        assert_eq!(err.to_string(), "failed loading B.yaml::nope");
    }

    #[test]
    fn test_missing_document() {
        let mut tree = yaml("svc:\n  extends: { file: X.yaml, service: base }\n");
        let result = select(&mut tree, "svc", &Environment::new(), &chain_source());
        assert!(matches!(result, Err(ConfigError::DocumentNotFound(_))));
    }

    #[test]
    fn test_cycle_is_detected() {
        let source = MemorySource::new()
            .with_document(
                "A.yaml",
                yaml("myservice:\n  extends: { file: B.yaml, service: base }\n  a: '1'\n"),
            )
            .with_document(
                "B.yaml",
                yaml("base:\n  extends: { file: A.yaml, service: myservice }\n  b: '2'\n"),
            );
        let mut tree = source.load("A.yaml").unwrap();

        let result = select(&mut tree, "myservice", &Environment::new(), &source);
        assert!(matches!(
            result,
            Err(ConfigError::CyclicExtends { ref file, ref service })
                if file == "B.yaml" && service == "base"
        ));
    }

    #[test]
    fn test_self_extension_is_a_cycle() {
        let source = MemorySource::new().with_document(
            "A.yaml",
            yaml("svc:\n  extends: { file: A.yaml, service: svc }\n"),
        );
        let mut tree = source.load("A.yaml").unwrap();

        let result = select(&mut tree, "svc", &Environment::new(), &source);
        assert!(matches!(result, Err(ConfigError::CyclicExtends { .. })));
    }

    #[test]
    fn test_invalid_target() {
        let mut tree = yaml("svc: plain\n");
        let source = MemorySource::new();

        assert!(matches!(
            select(&mut tree, "svc", &Environment::new(), &source),
            Err(ConfigError::NotATree(_))
        ));
        assert!(matches!(
            select(&mut tree, "other", &Environment::new(), &source),
            Err(ConfigError::PathNotFound(_))
        ));
        assert!(matches!(
            select(&mut tree, "svc/inner", &Environment::new(), &source),
            Err(ConfigError::PathTraversal { .. })
        ));
    }

    #[test]
    fn test_invalid_extends_pointer() {
        let source = MemorySource::new();

        let mut tree = yaml("svc:\n  extends: { file: B.yaml }\n");
        assert!(matches!(
            select(&mut tree, "svc", &Environment::new(), &source),
            Err(ConfigError::InvalidExtends { .. })
        ));

        let mut tree = yaml("svc:\n  extends: { file: [B.yaml], service: base }\n");
        assert!(matches!(
            select(&mut tree, "svc", &Environment::new(), &source),
            Err(ConfigError::InvalidExtends { .. })
        ));
    }

    #[test]
    fn test_resolver_builder() {
        let resolver = Resolver::builder()
            .with_source(chain_source().with_document("A.yaml", consumer()))
            .with_var("H", "from-builder");

        let selection = resolver.resolve("A.yaml", "myservice").unwrap();
        assert_eq!(selection.tree.find_str("host").unwrap(), Some("from-builder"));
        assert_eq!(resolver.env().get("H"), Some("from-builder"));
        assert!(resolver.source().load("B.yaml").is_ok());
    }

    #[test]
    fn test_resolver_with_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("A.yaml"),
            "myservice:\n  extends:\n    file: B.toml\n    service: base\n  port: 8080\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("B.toml"),
            "[base]\nport = 80\nhost = \"${H}\"\n\n[_env]\nH = \"b-host\"\n",
        )
        .unwrap();

        let selection = Resolver::builder()
            .with_source(FileSource::new().with_base_dir(dir.path()))
            .resolve("A.yaml", "myservice")
            .unwrap();

        assert_eq!(selection.tree.find_str("port").unwrap(), Some("8080"));
        assert_eq!(selection.tree.find_str("host").unwrap(), Some("b-host"));
    }
}
