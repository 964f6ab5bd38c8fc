//! Deep merge of one tree into another.
//!
//! - Mappings merge recursively, key by key.
//! - Sequences are unioned: destination order first, then unseen source items.
//! - Strings only replace the destination under [`MergePolicy::Override`].
//! - Keys missing from the destination are always inserted.

use super::tree::{Tree, Value};

/// Whether inherited strings may replace values already in the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// The destination's own values win. Used for extends chains.
    #[default]
    KeepExisting,
    /// Differing source values replace destination values.
    Override,
}

/// Merges every entry of `src` into `dst`, mutating `dst` in place.
pub fn merge_tree(src: &Tree, dst: &mut Tree, policy: MergePolicy) {
    for (key, value) in src {
        merge_entry(dst, key, value, policy);
    }
}

/// Merges a single `key`/`value` pair from a source tree into `dst`.
pub fn merge_entry(dst: &mut Tree, key: &str, value: &Value, policy: MergePolicy) {
    let Some(existing) = dst.get_mut(key) else {
        dst.insert(key, value.clone());
        return;
    };

    match (existing, value) {
        (Value::Tree(dst_tree), Value::Tree(src_tree)) => merge_tree(src_tree, dst_tree, policy),
        (Value::Array(dst_items), Value::Array(src_items)) => union_into(dst_items, src_items),
        // A sequence always lands, even over a non-sequence destination.
        (existing, Value::Array(_)) => *existing = value.clone(),
        (existing, _) => {
            if policy == MergePolicy::Override && existing != value {
                *existing = value.clone();
            }
        }
    }
}

fn union_into(dst: &mut Vec<Value>, src: &[Value]) {
    for item in src {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}
