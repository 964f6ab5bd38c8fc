//! `${NAME}` substitution from a flat [`Environment`].
//!
//! Substitution is applied to string values of a tree and recurses into
//! nested mappings. Sequence elements are left as they are. Placeholders whose
//! name is not bound in the environment are kept literally.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::trace;

use super::env::Environment;
use super::tree::{Tree, Value};

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

impl Tree {
    /// Replaces `${NAME}` placeholders in every string value, in place.
    pub fn templatize(&mut self, env: &Environment) {
        for (key, value) in self.iter_mut() {
            match value {
                Value::String(s) => {
                    if let Some(expanded) = expand(s, env) {
                        trace!(key = %key, "templated value");
                        *s = expanded;
                    }
                }
                Value::Tree(tree) => tree.templatize(env),
                Value::Array(_) => {}
            }
        }
    }
}

/// Expands the placeholders of `input` bound in `env`.
///
/// Returns `None` when nothing was substituted.
pub fn expand(input: &str, env: &Environment) -> Option<String> {
    let mut current: Option<String> = None;

    for caps in placeholder().captures_iter(input) {
        let (whole, name) = (&caps[0], &caps[1]);
        match env.get(name) {
            Some(replacement) => {
                let text = current.as_deref().unwrap_or(input);
                current = Some(text.replace(whole, replacement));
            }
            None => trace!(placeholder = name, "no binding, leaving placeholder unexpanded"),
        }
    }

    current
}
