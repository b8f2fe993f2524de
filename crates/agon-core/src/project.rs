//! Field projection: keep only the listed dotted paths before encoding.
//!
//! When a prompt needs three fields out of a forty-field API response,
//! projecting first is worth more than any encoding trick. Paths are dotted
//! (`"user.profile.name"`, `"quotes.symbol"`); arrays are transparent, so a
//! path into an array field applies to every element.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// A trie of path segments. A leaf keeps the whole subtree at that point; a
/// node with children narrows the walk further.
#[derive(Debug, Default)]
struct KeepTree {
    children: HashMap<String, KeepTree>,
}

impl KeepTree {
    fn build(paths: &[&str]) -> Self {
        let mut root = KeepTree::default();
        for path in paths {
            let mut node = &mut root;
            for segment in path.split('.').filter(|s| !s.is_empty()) {
                node = node.children.entry(segment.to_string()).or_default();
            }
        }
        root
    }
}

/// Project each object down to the given keep-paths.
///
/// Objects keep only the children named in the tree; a deeper path narrows
/// its prefix (requesting both `a` and `a.b` keeps just `a.b`). Arrays apply
/// the same tree to every element, and non-object values under a narrowing
/// path are preserved as-is. Empty paths and empty segments are discarded;
/// if nothing usable remains, the data is returned unchanged.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use agon_core::project_data;
///
/// let data = vec![json!({"id": 1, "name": "Ada", "extra": "x"})];
/// assert_eq!(project_data(&data, &["id"]), vec![json!({"id": 1})]);
/// ```
pub fn project_data(data: &[Value], keep_paths: &[&str]) -> Vec<Value> {
    let tree = KeepTree::build(keep_paths);
    if tree.children.is_empty() {
        return data.to_vec();
    }
    data.iter().map(|value| keep(value, &tree)).collect()
}

fn keep(value: &Value, tree: &KeepTree) -> Value {
    match value {
        Value::Object(map) => {
            let mut kept = Map::new();
            for (key, child) in map {
                let Some(sub) = tree.children.get(key) else {
                    continue;
                };
                if sub.children.is_empty() {
                    kept.insert(key.clone(), child.clone());
                } else {
                    kept.insert(key.clone(), keep(child, sub));
                }
            }
            Value::Object(kept)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|item| keep(item, tree)).collect()),
        other => other.clone(),
    }
}
