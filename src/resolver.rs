//! Dotted-path key resolution.
//!
//! Configuration authors use dotted names both as nested paths (`db: {port: 1}`) and as
//! single literal keys (`"db.port": 1`). `.` is therefore not only a nesting separator:
//! at every level the resolver first descends into the shortest candidate key
//! (nested-first) and, if that does not lead to a value, extends the candidate with the
//! next segment and tries again at the same level (literal fallback).
//!
//! ```text
//! key "a.b.c" against {"a.b": {"c": 1}}
//!     "a"     -> missing
//!     "a.b"   -> found, descend with ["c"]
//!     "c"     -> 1
//! ```

use serde_json::Value;

/// Resolve `key` inside `root`.
///
/// An empty key returns the root itself. `null` values are treated as absent.
pub fn resolve<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return Some(root);
    }
    let segments: Vec<&str> = key.split('.').collect();
    lookup(&segments, String::new(), root)
}

fn lookup<'a>(segments: &[&str], prefix: String, node: &'a Value) -> Option<&'a Value> {
    let Some((first, rest)) = segments.split_first() else {
        // every segment consumed; a dangling prefix means the literal key never matched
        if prefix.is_empty() && !node.is_null() {
            return Some(node);
        }
        return None;
    };

    let map = node.as_object()?;
    let candidate = format!("{}{}", prefix, first);

    if let Some(child) = map.get(&candidate) {
        if let Some(found) = lookup(rest, String::new(), child) {
            return Some(found);
        }
    }

    lookup(rest, candidate + ".", node)
}
