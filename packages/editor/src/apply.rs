//! # Applying operations
//!
//! Validation and tree surgery for the nine primitive operations.
//!
//! Every function here works on a private copy of the root `Arc`. Nodes are
//! copied lazily along the edited spine with [`node_mut`], so a rejected
//! operation simply drops the copy and the caller's snapshot is untouched.
//!
//! ## Validation
//!
//! - Addressed nodes must exist and have the right kind
//! - Offsets must sit on a UTF-16 boundary inside the text
//! - Recorded data (`remove_node` node, `remove_text` text, `merge_node`
//!   position and properties) must match the tree, so that the operation's
//!   inverse really restores what was there
//! - The root can never be inserted, removed, split, merged, moved or set

use std::sync::Arc;

use quire_model::node::{Element, Text};
use quire_model::text::{byte_index, utf16_len};
use quire_model::{
    node_mut, Affinity, Node, Operation, Path, Point, Range, SelectionProps, RESERVED_KEYS,
};

use crate::errors::InvalidOperation;

type ApplyResult<T> = Result<T, InvalidOperation>;

/// Apply a tree operation to `root`. `set_selection` leaves the tree alone.
pub(crate) fn apply_to_tree(root: &mut Arc<Node>, op: &Operation) -> ApplyResult<()> {
    let kind = op.kind();

    match op {
        Operation::InsertNode { path, node } => {
            let (parent_path, index) = split_path(kind, path)?;
            let children = children_mut(root, kind, &parent_path)?;
            if index > children.len() {
                return Err(InvalidOperation::IndexOutOfRange {
                    op: kind,
                    path: path.clone(),
                    index,
                });
            }
            children.insert(index, Arc::new(node.clone()));
            Ok(())
        }

        Operation::RemoveNode { path, node } => {
            let (parent_path, index) = split_path(kind, path)?;
            let existing = get(root, kind, path)?;
            if existing != node {
                return Err(mismatch(kind, path, "node"));
            }
            children_mut(root, kind, &parent_path)?.remove(index);
            Ok(())
        }

        Operation::InsertText { path, offset, text } => {
            let leaf = text_mut(root, kind, path)?;
            let at = byte_index(&leaf.text, *offset).ok_or_else(|| offset_error(kind, path, *offset))?;
            leaf.text.insert_str(at, text);
            Ok(())
        }

        Operation::RemoveText { path, offset, text } => {
            let current = get(root, kind, path)?
                .as_text()
                .ok_or_else(|| wrong_kind(kind, path, "text"))?;
            let start = byte_index(&current.text, *offset)
                .ok_or_else(|| offset_error(kind, path, *offset))?;
            let end = byte_index(&current.text, offset + utf16_len(text))
                .ok_or_else(|| mismatch(kind, path, "text"))?;
            if current.text[start..end] != **text {
                return Err(mismatch(kind, path, "text"));
            }
            text_mut(root, kind, path)?.text.replace_range(start..end, "");
            Ok(())
        }

        Operation::MergeNode {
            path,
            position,
            properties,
        } => {
            let (parent_path, index) = split_path(kind, path)?;
            let previous_index = index.checked_sub(1).ok_or(InvalidOperation::IndexOutOfRange {
                op: kind,
                path: path.clone(),
                index,
            })?;
            let node = get(root, kind, path)?;
            let previous_path = parent_path.child(previous_index);
            let previous = get(root, kind, &previous_path)?;
            if node.kind() != previous.kind() {
                let expected = if node.is_text() { "text" } else { "element" };
                return Err(wrong_kind(kind, &previous_path, expected));
            }
            if previous.content_len() != *position {
                return Err(mismatch(kind, path, "position"));
            }
            if node.properties() != properties {
                return Err(mismatch(kind, path, "properties"));
            }

            let merged = children_mut(root, kind, &parent_path)?.remove(index);
            let target = node_mut(root, &previous_path).ok_or_else(|| not_found(kind, &previous_path))?;
            match (target, merged.as_ref()) {
                (Node::Text(into), Node::Text(from)) => into.text.push_str(&from.text),
                (Node::Element(into), Node::Element(from)) => {
                    into.children.extend(from.children.iter().cloned())
                }
                _ => return Err(wrong_kind(kind, &previous_path, "matching kind")),
            }
            Ok(())
        }

        Operation::SplitNode {
            path,
            position,
            properties,
        } => {
            let (parent_path, index) = split_path(kind, path)?;
            let target = node_mut(root, path).ok_or_else(|| not_found(kind, path))?;
            let right = match target {
                Node::Text(text) => {
                    let at = byte_index(&text.text, *position)
                        .ok_or_else(|| offset_error(kind, path, *position))?;
                    Node::Text(Text {
                        text: text.text.split_off(at),
                        properties: properties.clone(),
                    })
                }
                Node::Element(element) => {
                    if *position > element.children.len() {
                        return Err(offset_error(kind, path, *position));
                    }
                    Node::Element(Element {
                        children: element.children.split_off(*position),
                        properties: properties.clone(),
                    })
                }
            };
            children_mut(root, kind, &parent_path)?.insert(index + 1, Arc::new(right));
            Ok(())
        }

        Operation::SetNode {
            path,
            properties,
            new_properties,
        } => {
            if path.is_root() {
                return Err(InvalidOperation::RootPath { op: kind });
            }
            if let Some(key) = new_properties
                .keys()
                .chain(properties.keys())
                .find(|key| RESERVED_KEYS.contains(&key.as_str()))
            {
                return Err(InvalidOperation::ReservedProperty {
                    op: kind,
                    key: key.clone(),
                });
            }

            let target = node_mut(root, path).ok_or_else(|| not_found(kind, path))?;
            let props = target.properties_mut();
            for (key, value) in new_properties {
                if value.is_null() {
                    props.remove(key);
                } else {
                    props.insert(key.clone(), value.clone());
                }
            }
            for key in properties.keys() {
                if !new_properties.contains_key(key) {
                    props.remove(key);
                }
            }
            Ok(())
        }

        Operation::MoveNode { path, new_path } => {
            if path.is_root() || new_path.is_root() {
                return Err(InvalidOperation::RootPath { op: kind });
            }
            get(root, kind, path)?;
            if path == new_path {
                return Ok(());
            }
            if path.is_ancestor(new_path) {
                return Err(InvalidOperation::MoveIntoSelf {
                    path: path.clone(),
                    new_path: new_path.clone(),
                });
            }

            let (parent_path, index) = split_path(kind, path)?;
            let moved = children_mut(root, kind, &parent_path)?.remove(index);

            // Where the node lands once its old slot is gone
            let landing = path
                .transform(op, Some(Affinity::Forward))
                .ok_or_else(|| not_found(kind, new_path))?;
            let (new_parent, new_index) = split_path(kind, &landing)?;
            let children = children_mut(root, kind, &new_parent)?;
            if new_index > children.len() {
                return Err(InvalidOperation::IndexOutOfRange {
                    op: kind,
                    path: new_path.clone(),
                    index: new_index,
                });
            }
            children.insert(new_index, moved);
            Ok(())
        }

        Operation::SetSelection { .. } => Ok(()),
    }
}

/// The selection after `op`, given the tree as it is after `op`
pub(crate) fn transform_selection(
    selection: Option<&Range>,
    op: &Operation,
    root_after: &Node,
) -> ApplyResult<Option<Range>> {
    if let Operation::SetSelection { new_properties, .. } = op {
        return set_selection(selection, new_properties.as_ref(), root_after);
    }

    let Some(selection) = selection else {
        return Ok(None);
    };

    let mut anchor = selection.anchor.transform(op, Some(Affinity::Forward));
    let mut focus = selection.focus.transform(op, Some(Affinity::Forward));

    if let Operation::RemoveNode { path, .. } = op {
        if anchor.is_none() {
            anchor = snap_after_remove(root_after, path);
        }
        if focus.is_none() {
            focus = snap_after_remove(root_after, path);
        }
    }

    Ok(match (anchor, focus) {
        (Some(anchor), Some(focus)) => Some(Range::new(anchor, focus)),
        _ => None,
    })
}

fn set_selection(
    selection: Option<&Range>,
    new_properties: Option<&SelectionProps>,
    root: &Node,
) -> ApplyResult<Option<Range>> {
    let Some(props) = new_properties else {
        return Ok(None);
    };

    let range = match selection {
        Some(current) => Range::new(
            props.anchor.clone().unwrap_or_else(|| current.anchor.clone()),
            props.focus.clone().unwrap_or_else(|| current.focus.clone()),
        ),
        None => match (&props.anchor, &props.focus) {
            (Some(anchor), Some(focus)) => Range::new(anchor.clone(), focus.clone()),
            _ => {
                return Err(InvalidOperation::Selection(
                    "an incomplete selection cannot be set when there is none",
                ))
            }
        },
    };

    check_point(root, &range.anchor)?;
    check_point(root, &range.focus)?;
    Ok(Some(range))
}

/// A selection point must address a text and sit on a character boundary
/// inside it
fn check_point(root: &Node, point: &Point) -> ApplyResult<()> {
    let kind = "set_selection";
    let text = root
        .get(&point.path)
        .ok_or_else(|| not_found(kind, &point.path))?
        .as_text()
        .ok_or_else(|| wrong_kind(kind, &point.path, "text"))?;
    if byte_index(&text.text, point.offset).is_none() {
        return Err(offset_error(kind, &point.path, point.offset));
    }
    Ok(())
}

/// Where a selection point lands when the text it was in is removed: the end
/// of the previous text or the start of the next one, whichever sits closer
/// to the removed node in the tree.
fn snap_after_remove(root: &Node, removed: &Path) -> Option<Point> {
    let mut previous: Option<(&Text, Path)> = None;
    let mut next: Option<(&Text, Path)> = None;
    for (text, path) in root.texts() {
        if path.is_before(removed) {
            previous = Some((text, path));
        } else {
            next = Some((text, path));
            break;
        }
    }

    let prefer_next = match (&previous, &next) {
        (Some((_, previous_path)), Some((_, next_path))) => {
            if next_path == removed {
                !next_path.has_previous()
            } else {
                previous_path.common(removed).len() < next_path.common(removed).len()
            }
        }
        _ => false,
    };

    match (previous, next) {
        (Some((text, path)), _) if !prefer_next => Some(Point::new(path, text.len_utf16())),
        (_, Some((_, path))) => Some(Point::new(path, 0)),
        _ => None,
    }
}

fn split_path(op: &'static str, path: &Path) -> ApplyResult<(Path, usize)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(index)) => Ok((parent, *index)),
        _ => Err(InvalidOperation::RootPath { op }),
    }
}

fn get<'a>(root: &'a Arc<Node>, op: &'static str, path: &Path) -> ApplyResult<&'a Node> {
    root.get(path).ok_or_else(|| not_found(op, path))
}

fn children_mut<'a>(
    root: &'a mut Arc<Node>,
    op: &'static str,
    path: &Path,
) -> ApplyResult<&'a mut Vec<Arc<Node>>> {
    match node_mut(root, path) {
        Some(Node::Element(element)) => Ok(&mut element.children),
        Some(Node::Text(_)) => Err(wrong_kind(op, path, "element")),
        None => Err(not_found(op, path)),
    }
}

fn text_mut<'a>(root: &'a mut Arc<Node>, op: &'static str, path: &Path) -> ApplyResult<&'a mut Text> {
    match node_mut(root, path) {
        Some(Node::Text(text)) => Ok(text),
        Some(Node::Element(_)) => Err(wrong_kind(op, path, "text")),
        None => Err(not_found(op, path)),
    }
}

fn not_found(op: &'static str, path: &Path) -> InvalidOperation {
    InvalidOperation::NodeNotFound {
        op,
        path: path.clone(),
    }
}

fn wrong_kind(op: &'static str, path: &Path, expected: &'static str) -> InvalidOperation {
    InvalidOperation::WrongKind {
        op,
        path: path.clone(),
        expected,
    }
}

fn offset_error(op: &'static str, path: &Path, offset: usize) -> InvalidOperation {
    InvalidOperation::OffsetOutOfRange {
        op,
        path: path.clone(),
        offset,
    }
}

fn mismatch(op: &'static str, path: &Path, field: &'static str) -> InvalidOperation {
    InvalidOperation::Mismatch {
        op,
        path: path.clone(),
        field,
    }
}
