//! # Normalization rules
//!
//! Edits may leave the tree structurally invalid. After each top-level edit
//! the document walks its dirty paths and asks [`check_node`] whether the
//! node there breaks a rule. Each violation comes back as a `Repair`: the
//! operations that fix it. The document applies them, which dirties the
//! affected paths again, until nothing is left to fix.
//!
//! ## Rules
//!
//! Checked in order; only the first violation of a node is reported.
//!
//! 1. An element without children gets an empty text (or is removed, per
//!    its schema empty policy). Voids and the root may be empty.
//! 2. Children of the root and of block containers are blocks; children of
//!    inline elements and of blocks holding text are texts or inlines.
//!    Inline elements are padded with text on both sides.
//! 3. Adjacent texts with equal properties are merged; otherwise an empty
//!    one is dropped.
//! 4. Schema property constraints on the node itself.
//! 5. Schema child constraints.
//! 6. Injected [`NodeValidator`]s.

use quire_model::node::Element;
use quire_model::{Node, Operation, Path, Properties};
use serde_json::Value;

use crate::config::DocumentConfig;
use crate::schema::{ChildRepair, Constraint, EmptyPolicy, Fix, NodeValidator, Schema};

/// One structural violation and the operations that repair it
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Repair {
    pub rule: &'static str,
    pub operations: Vec<Operation>,
}

impl Repair {
    fn new(rule: &'static str, operations: Vec<Operation>) -> Self {
        Self { rule, operations }
    }

    fn single(rule: &'static str, operation: Operation) -> Self {
        Self::new(rule, vec![operation])
    }
}

/// Everything the rules read besides the tree
pub(crate) struct Rules<'a> {
    pub schema: &'a Schema,
    pub config: &'a DocumentConfig,
    pub validators: &'a [Box<dyn NodeValidator>],
}

/// First rule the node at `path` breaks, if any
pub(crate) fn check_node(root: &Node, path: &Path, rules: &Rules<'_>) -> Option<Repair> {
    let node = root.get(path)?;

    if let Node::Element(element) = node {
        let repair = check_empty(node, element, path, rules.schema)
            .or_else(|| check_children(node, element, path, rules))
            .or_else(|| check_texts(element, path));
        if repair.is_some() {
            return repair;
        }
    }

    check_properties(node, path, rules.schema)
        .or_else(|| check_child_constraints(node, path, rules.schema))
        .or_else(|| check_validators(node, path, root, rules.validators))
}

fn check_empty(node: &Node, element: &Element, path: &Path, schema: &Schema) -> Option<Repair> {
    if !element.children.is_empty() || path.is_root() {
        return None;
    }

    match schema.empty_policy(node) {
        EmptyPolicy::Allow => None,
        EmptyPolicy::InsertText => Some(Repair::single(
            "empty-element",
            Operation::InsertNode {
                path: path.child(0),
                node: Node::text(""),
            },
        )),
        EmptyPolicy::Remove => Some(Repair::single(
            "empty-element",
            Operation::RemoveNode {
                path: path.clone(),
                node: node.clone(),
            },
        )),
    }
}

fn check_children(node: &Node, element: &Element, path: &Path, rules: &Rules<'_>) -> Option<Repair> {
    if !rules.config.enforce_block_inline {
        return None;
    }
    let schema = rules.schema;
    let children = &element.children;

    let should_have_inlines = !path.is_root()
        && (schema.is_inline(node)
            || children
                .first()
                .map_or(true, |first| first.is_text() || schema.is_inline(first)));

    for (index, child) in children.iter().enumerate() {
        let inline_or_text = child.is_text() || schema.is_inline(child);
        if inline_or_text != should_have_inlines {
            return Some(Repair::single(
                "block-inline",
                Operation::RemoveNode {
                    path: path.child(index),
                    node: child.as_ref().clone(),
                },
            ));
        }

        if child.is_element() && schema.is_inline(child) {
            let previous_is_text = index
                .checked_sub(1)
                .and_then(|previous| children.get(previous))
                .is_some_and(|previous| previous.is_text());
            let pad_at = if !previous_is_text {
                Some(index)
            } else if index + 1 == children.len() {
                Some(index + 1)
            } else {
                None
            };
            if let Some(at) = pad_at {
                return Some(Repair::single(
                    "inline-padding",
                    Operation::InsertNode {
                        path: path.child(at),
                        node: Node::text(""),
                    },
                ));
            }
        }
    }

    None
}

fn check_texts(element: &Element, path: &Path) -> Option<Repair> {
    for (index, pair) in element.children.windows(2).enumerate() {
        let (Some(previous), Some(current)) = (pair[0].as_text(), pair[1].as_text()) else {
            continue;
        };
        let current_index = index + 1;

        if current.loose_eq(previous) {
            return Some(Repair::single(
                "merge-texts",
                Operation::MergeNode {
                    path: path.child(current_index),
                    position: previous.len_utf16(),
                    properties: current.properties.clone(),
                },
            ));
        }
        if previous.text.is_empty() {
            return Some(Repair::single(
                "empty-text",
                Operation::RemoveNode {
                    path: path.child(index),
                    node: pair[0].as_ref().clone(),
                },
            ));
        }
        if current.text.is_empty() {
            return Some(Repair::single(
                "empty-text",
                Operation::RemoveNode {
                    path: path.child(current_index),
                    node: pair[1].as_ref().clone(),
                },
            ));
        }
    }

    None
}

fn check_properties(node: &Node, path: &Path, schema: &Schema) -> Option<Repair> {
    // Root properties cannot be set
    if path.is_root() {
        return None;
    }

    schema.constraints_for(node).find_map(|constraint| {
        let Constraint::Property {
            key,
            values,
            default,
        } = constraint
        else {
            return None;
        };
        let allowed =
            |value: &Value| !value.is_null() && (values.is_empty() || values.contains(value));
        let current = node.properties().get(key);
        // A default that breaks its own constraint would never settle
        if current.is_some_and(allowed) || !allowed(default) {
            return None;
        }

        let mut properties = Properties::new();
        if let Some(value) = current {
            properties.insert(key.clone(), value.clone());
        }
        let mut new_properties = Properties::new();
        new_properties.insert(key.clone(), default.clone());
        Some(Repair::single(
            "property",
            Operation::SetNode {
                path: path.clone(),
                properties,
                new_properties,
            },
        ))
    })
}

fn check_child_constraints(node: &Node, path: &Path, schema: &Schema) -> Option<Repair> {
    schema.constraints_for(node).find_map(|constraint| {
        let Constraint::Children { allowed, repair } = constraint else {
            return None;
        };
        let (index, child) = node
            .children()
            .iter()
            .enumerate()
            .find(|(_, child)| !allowed.iter().any(|rule| rule.matches(child)))?;
        let child_path = path.child(index);

        let operations = match repair {
            ChildRepair::Remove => remove(child, &child_path),
            ChildRepair::Unwrap => unwrap(child, &child_path).unwrap_or_else(|| remove(child, &child_path)),
            ChildRepair::Coerce { properties } => set_properties(child, &child_path, properties),
        };
        Some(Repair::new("children", operations))
    })
}

fn check_validators(
    node: &Node,
    path: &Path,
    root: &Node,
    validators: &[Box<dyn NodeValidator>],
) -> Option<Repair> {
    validators.iter().find_map(|validator| {
        let fix = validator.validate(node, path, root)?;
        let operations = match fix {
            Fix::Remove if path.is_root() => return None,
            Fix::Remove => remove(node, path),
            Fix::Unwrap => unwrap(node, path)?,
            Fix::SetProperties(properties) => set_properties(node, path, &properties),
            Fix::Operations(operations) => operations,
        };
        if operations.is_empty() {
            return None;
        }
        Some(Repair::new(validator.name(), operations))
    })
}

fn remove(node: &Node, path: &Path) -> Vec<Operation> {
    vec![Operation::RemoveNode {
        path: path.clone(),
        node: node.clone(),
    }]
}

/// Move each child of the element at `path` out to follow it, then remove
/// the emptied element. `None` for texts and the root.
fn unwrap(node: &Node, path: &Path) -> Option<Vec<Operation>> {
    let element = node.as_element()?;
    let index = *path.last()?;
    let parent = path.parent()?;

    let mut operations: Vec<Operation> = (0..element.children.len())
        .map(|offset| Operation::MoveNode {
            path: path.child(0),
            new_path: parent.child(index + 1 + offset),
        })
        .collect();
    operations.push(Operation::RemoveNode {
        path: path.clone(),
        node: Node::Element(Element {
            children: Vec::new(),
            properties: element.properties.clone(),
        }),
    });
    Some(operations)
}

fn set_properties(node: &Node, path: &Path, new_properties: &Properties) -> Vec<Operation> {
    let mut properties = Properties::new();
    for key in new_properties.keys() {
        if let Some(value) = node.properties().get(key) {
            properties.insert(key.clone(), value.clone());
        }
    }
    vec![Operation::SetNode {
        path: path.clone(),
        properties,
        new_properties: new_properties.clone(),
    }]
}
