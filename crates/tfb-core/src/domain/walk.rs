//! Recursive visitor over a JSON value tree.
//!
//! The tree is the tagged-variant `serde_json::Value`; the visitor walks the
//! children of every container depth-first, handing the callback each
//! child's synthetic path together with a structural address that survives
//! the walk. Both cipher passes use the same visitor: they collect the
//! fields to transform, then apply the replacements through [`resolve_mut`].

use std::fmt::Write as _;

use serde_json::Value;

/// One step of a structural address into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// An object member, by key.
    Key(String),
    /// An array element, by index.
    Index(usize),
}

/// Whether to descend into the value just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// Walk every child of every container under `root`, depth-first.
///
/// The callback receives the synthetic path (`.key` appended for object
/// members, `[index]` for array elements, empty at the root), the child's
/// structural address, and the child value. The root value itself is never
/// visited: only named or indexed fields have a path.
pub fn visit_fields<F>(root: &Value, f: &mut F)
where
    F: FnMut(&str, &[Segment], &Value) -> Visit,
{
    let mut path = String::new();
    let mut segments = Vec::new();
    walk(root, &mut path, &mut segments, f);
}

fn walk<F>(node: &Value, path: &mut String, segments: &mut Vec<Segment>, f: &mut F)
where
    F: FnMut(&str, &[Segment], &Value) -> Visit,
{
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                let parent_len = path.len();
                path.push('.');
                path.push_str(key);
                segments.push(Segment::Key(key.clone()));
                if f(path, segments, child) == Visit::Descend {
                    walk(child, path, segments, f);
                }
                segments.pop();
                path.truncate(parent_len);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let parent_len = path.len();
                let _ = write!(path, "[{}]", index);
                segments.push(Segment::Index(index));
                if f(path, segments, child) == Visit::Descend {
                    walk(child, path, segments, f);
                }
                segments.pop();
                path.truncate(parent_len);
            }
        }
        _ => {}
    }
}

/// Navigate a structural address produced by [`visit_fields`] back to the
/// node it referred to. Returns `None` if the tree changed underneath it.
pub fn resolve_mut<'a>(root: &'a mut Value, segments: &[Segment]) -> Option<&'a mut Value> {
    let mut node = root;
    for segment in segments {
        node = match segment {
            Segment::Key(key) => node.as_object_mut()?.get_mut(key)?,
            Segment::Index(index) => node.as_array_mut()?.get_mut(*index)?,
        };
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collect_paths(value: &Value) -> Vec<String> {
        let mut paths = Vec::new();
        visit_fields(value, &mut |path, _, _| {
            paths.push(path.to_string());
            Visit::Descend
        });
        paths
    }

    #[test]
    fn builds_dotted_paths_for_objects() {
        let tree = json!({"a": {"b": 1}});
        assert_eq!(collect_paths(&tree), vec![".a", ".a.b"]);
    }

    #[test]
    fn builds_bracketed_paths_for_arrays() {
        let tree = json!({"tags": ["x", "y", "z"]});
        assert_eq!(
            collect_paths(&tree),
            vec![".tags", ".tags[0]", ".tags[1]", ".tags[2]"]
        );
    }

    #[test]
    fn nests_arrays_and_objects() {
        let tree = json!({"resources": [{"id": "i-1"}]});
        assert_eq!(
            collect_paths(&tree),
            vec![".resources", ".resources[0]", ".resources[0].id"]
        );
    }

    #[test]
    fn scalar_root_has_no_fields() {
        assert!(collect_paths(&json!("just a string")).is_empty());
        assert!(collect_paths(&json!(42)).is_empty());
    }

    #[test]
    fn skip_stops_descent_into_a_subtree() {
        let tree = json!({"a": {"b": 1}, "c": 2});
        let mut paths = Vec::new();
        visit_fields(&tree, &mut |path, _, _| {
            paths.push(path.to_string());
            if path == ".a" {
                Visit::Skip
            } else {
                Visit::Descend
            }
        });
        assert_eq!(paths, vec![".a", ".c"]);
    }

    #[test]
    fn resolve_mut_reaches_the_visited_node() {
        let mut tree = json!({"a": [{"b": "old"}]});
        let mut address = None;
        visit_fields(&tree, &mut |path, segments, _| {
            if path == ".a[0].b" {
                address = Some(segments.to_vec());
            }
            Visit::Descend
        });

        let slot = resolve_mut(&mut tree, &address.unwrap()).unwrap();
        *slot = json!("new");
        assert_eq!(tree, json!({"a": [{"b": "new"}]}));
    }

    #[test]
    fn resolve_mut_is_none_for_a_stale_address() {
        let mut tree = json!({"a": 1});
        let stale = [Segment::Key("gone".to_string())];
        assert!(resolve_mut(&mut tree, &stale).is_none());
    }
}
