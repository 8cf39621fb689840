//! # Operations
//!
//! The closed set of primitive edits. Every operation carries everything
//! needed to replay or invert it, so a log of operations is enough to
//! reconstruct (or rewind) a document.
//!
//! Operations serialize as plain JSON objects tagged by `type`:
//!
//! ```json
//! { "type": "insert_text", "path": [0, 0], "offset": 3, "text": "!" }
//! ```

use crate::node::{Node, Properties};
use crate::path::Path;
use crate::point::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Partial selection used by `set_selection`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<Point>,
}

impl SelectionProps {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self {
            anchor: Some(anchor),
            focus: Some(focus),
        }
    }
}

/// Primitive, invertible edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    InsertNode {
        path: Path,
        node: Node,
    },

    RemoveNode {
        path: Path,
        node: Node,
    },

    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },

    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },

    /// `properties` holds the previous values of every key in `new_properties`
    SetNode {
        path: Path,
        properties: Properties,
        #[serde(rename = "newProperties")]
        new_properties: Properties,
    },

    /// Merge the node at `path` into its previous sibling. `position` is the
    /// length of that sibling and `properties` are the merged node's own.
    MergeNode {
        path: Path,
        position: usize,
        properties: Properties,
    },

    /// Split the node at `path` at `position`; the new right-hand sibling
    /// gets `properties`.
    SplitNode {
        path: Path,
        position: usize,
        properties: Properties,
    },

    MoveNode {
        path: Path,
        #[serde(rename = "newPath")]
        new_path: Path,
    },

    SetSelection {
        properties: Option<SelectionProps>,
        #[serde(rename = "newProperties")]
        new_properties: Option<SelectionProps>,
    },
}

impl Operation {
    /// The `type` tag as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::InsertNode { .. } => "insert_node",
            Operation::RemoveNode { .. } => "remove_node",
            Operation::InsertText { .. } => "insert_text",
            Operation::RemoveText { .. } => "remove_text",
            Operation::SetNode { .. } => "set_node",
            Operation::MergeNode { .. } => "merge_node",
            Operation::SplitNode { .. } => "split_node",
            Operation::MoveNode { .. } => "move_node",
            Operation::SetSelection { .. } => "set_selection",
        }
    }

    /// Primary path the operation addresses; `None` for selection changes
    pub fn path(&self) -> Option<&Path> {
        match self {
            Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::SetNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MoveNode { path, .. } => Some(path),
            Operation::SetSelection { .. } => None,
        }
    }

    pub fn is_node_operation(&self) -> bool {
        !self.is_text_operation() && !self.is_selection_operation()
    }

    pub fn is_text_operation(&self) -> bool {
        matches!(
            self,
            Operation::InsertText { .. } | Operation::RemoveText { .. }
        )
    }

    pub fn is_selection_operation(&self) -> bool {
        matches!(self, Operation::SetSelection { .. })
    }

    /// The operation that undoes this one.
    ///
    /// `apply(apply(tree, op), op.inverse()) == tree` for every operation that
    /// applies cleanly to `tree`.
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::InsertNode { path, node } => Operation::RemoveNode {
                path: path.clone(),
                node: node.clone(),
            },

            Operation::RemoveNode { path, node } => Operation::InsertNode {
                path: path.clone(),
                node: node.clone(),
            },

            Operation::InsertText { path, offset, text } => Operation::RemoveText {
                path: path.clone(),
                offset: *offset,
                text: text.clone(),
            },

            Operation::RemoveText { path, offset, text } => Operation::InsertText {
                path: path.clone(),
                offset: *offset,
                text: text.clone(),
            },

            Operation::SetNode {
                path,
                properties,
                new_properties,
            } => Operation::SetNode {
                path: path.clone(),
                properties: new_properties.clone(),
                new_properties: properties.clone(),
            },

            Operation::SetSelection {
                properties,
                new_properties,
            } => Operation::SetSelection {
                properties: new_properties.clone(),
                new_properties: properties.clone(),
            },

            // The node that was merged away lived right after `previous`
            Operation::MergeNode {
                path,
                position,
                properties,
            } => Operation::SplitNode {
                path: path.previous().unwrap_or_else(|| path.clone()),
                position: *position,
                properties: properties.clone(),
            },

            Operation::SplitNode {
                path,
                position,
                properties,
            } => Operation::MergeNode {
                path: path.next().unwrap_or_else(|| path.clone()),
                position: *position,
                properties: properties.clone(),
            },

            Operation::MoveNode { path, new_path } => {
                if path == new_path {
                    return self.clone();
                }

                // Within one parent both paths stay valid relative to each
                // other, so swapping is enough.
                if path.is_sibling(new_path) {
                    return Operation::MoveNode {
                        path: new_path.clone(),
                        new_path: path.clone(),
                    };
                }

                // Across parents the move may shift the paths it reads from.
                // The moved node's real location is `path` run through the
                // move, and its old slot is wherever the node that followed
                // it ended up.
                let moved_to = path.transform_move(path, new_path);
                let old_slot = match path.next() {
                    Some(next) => next.transform_move(path, new_path),
                    None => path.clone(),
                };
                Operation::MoveNode {
                    path: moved_to,
                    new_path: old_slot,
                }
            }
        }
    }

    /// Structural check: `value` has a known `type` and the fields that type
    /// requires. Says nothing about whether it applies to a given tree.
    pub fn is_operation(value: &Value) -> bool {
        value.is_object() && serde_json::from_value::<Operation>(value.clone()).is_ok()
    }

    pub fn is_operation_list(value: &Value) -> bool {
        value
            .as_array()
            .is_some_and(|items| items.iter().all(Operation::is_operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let op = Operation::MoveNode {
            path: Path::from([0, 1]),
            new_path: Path::from([0, 3]),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value, json!({ "type": "move_node", "path": [0, 1], "newPath": [0, 3] }));
        assert_eq!(serde_json::from_value::<Operation>(value).unwrap(), op);
    }

    #[test]
    fn test_is_operation() {
        assert!(Operation::is_operation(&json!({
            "type": "insert_text", "path": [0, 0], "offset": 3, "text": "!"
        })));
        assert!(Operation::is_operation(&json!({
            "type": "insert_node", "path": [1], "node": { "text": "" }
        })));
        assert!(!Operation::is_operation(&json!({ "type": "insert_text", "path": [0] })));
        assert!(!Operation::is_operation(&json!({ "type": "explode", "path": [0] })));
        assert!(!Operation::is_operation(&json!("insert_text")));

        assert!(Operation::is_operation_list(&json!([])));
        assert!(Operation::is_operation_list(&json!([
            { "type": "set_selection", "properties": null, "newProperties": null }
        ])));
        assert!(!Operation::is_operation_list(&json!({ "type": "set_selection" })));
    }

    #[test]
    fn test_split_merge_inverse_paths() {
        let split = Operation::SplitNode {
            path: Path::from([0, 2]),
            position: 4,
            properties: Properties::new(),
        };
        let merge = split.inverse();
        assert_eq!(
            merge,
            Operation::MergeNode {
                path: Path::from([0, 3]),
                position: 4,
                properties: Properties::new(),
            }
        );
        assert_eq!(merge.inverse(), split);
    }

    #[test]
    fn test_move_inverse_across_parents() {
        let op = Operation::MoveNode {
            path: Path::from([0]),
            new_path: Path::from([1, 0]),
        };
        assert_eq!(
            op.inverse(),
            Operation::MoveNode {
                path: Path::from([0, 0]),
                new_path: Path::from([0]),
            }
        );
    }

    #[test]
    fn test_kind_matches_tag() {
        let op = Operation::SetSelection {
            properties: None,
            new_properties: Some(SelectionProps::new(Point::new([0, 0], 0), Point::new([0, 0], 1))),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], json!(op.kind()));
        assert!(op.is_selection_operation());
        assert!(!op.is_node_operation());
    }
}
