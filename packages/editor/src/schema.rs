//! # Schema
//!
//! Declarative structure rules the normalizer enforces, plus a trait for the
//! few rules that need real code.
//!
//! Schemas are plain data and can ship as JSON:
//!
//! ```json
//! {
//!   "inlines": ["link"],
//!   "voids": ["image"],
//!   "rules": [
//!     {
//!       "match": { "kind": "element", "types": ["list"] },
//!       "constraints": [
//!         { "kind": "children", "allowed": [{ "types": ["list-item"] }], "repair": { "action": "coerce", "properties": { "type": "list-item" } } }
//!       ]
//!     }
//!   ]
//! }
//! ```

use quire_model::{Node, NodeKind, Operation, Path, Properties};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EditorResult;

/// Structure rules for one kind of document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Element types that render inline
    #[serde(default)]
    pub inlines: Vec<String>,

    /// Element types whose content is opaque; they may be empty and
    /// iteration can skip their subtree
    #[serde(default)]
    pub voids: Vec<String>,

    #[serde(default)]
    pub rules: Vec<SchemaRule>,
}

/// Constraints applied to every node the rule matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRule {
    #[serde(rename = "match", default)]
    pub matches: NodeMatch,

    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// Node predicate. Every field that is set must hold; an empty match
/// matches every node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,

    /// Element `type` is one of these
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    /// Properties that must be present with exactly these values
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Constraint {
    /// Every child must match one of `allowed`
    Children {
        allowed: Vec<NodeMatch>,
        #[serde(default)]
        repair: ChildRepair,
    },

    /// `key` must be set, and one of `values` when that list is non-empty.
    /// Violations are coerced to `default`. A `null` default, or one outside
    /// `values`, disables the constraint.
    Property {
        key: String,
        #[serde(default)]
        values: Vec<Value>,
        default: Value,
    },

    /// What to do when the element has no children
    Empty { policy: EmptyPolicy },
}

/// Repair for a child a `Children` constraint rejects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ChildRepair {
    #[default]
    Remove,
    /// Replace the child by its own children
    Unwrap,
    /// Set these properties on the child
    Coerce { properties: Properties },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyPolicy {
    /// Give the element an empty text child
    #[default]
    InsertText,
    /// Remove the element
    Remove,
    /// Leave it empty
    Allow,
}

impl NodeMatch {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn kind(kind: NodeKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn element_type(element_type: impl Into<String>) -> Self {
        Self {
            kind: Some(NodeKind::Element),
            types: vec![element_type.into()],
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.kind.map_or(true, |kind| node.kind() == kind)
            && (self.types.is_empty()
                || node
                    .element_type()
                    .is_some_and(|ty| self.types.iter().any(|allowed| allowed == ty)))
            && self
                .properties
                .iter()
                .all(|(key, value)| node.properties().get(key) == Some(value))
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(source: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_inline(mut self, element_type: impl Into<String>) -> Self {
        self.inlines.push(element_type.into());
        self
    }

    pub fn with_void(mut self, element_type: impl Into<String>) -> Self {
        self.voids.push(element_type.into());
        self
    }

    pub fn with_rule(mut self, matches: NodeMatch, constraints: Vec<Constraint>) -> Self {
        self.rules.push(SchemaRule {
            matches,
            constraints,
        });
        self
    }

    /// Inline element (texts are not elements and are never "inline" here)
    pub fn is_inline(&self, node: &Node) -> bool {
        Self::has_type(&self.inlines, node)
    }

    pub fn is_void(&self, node: &Node) -> bool {
        Self::has_type(&self.voids, node)
    }

    fn has_type(types: &[String], node: &Node) -> bool {
        node.element_type()
            .is_some_and(|ty| types.iter().any(|candidate| candidate == ty))
    }

    /// Constraints of every rule matching `node`, in declaration order
    pub fn constraints_for<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.matches.matches(node))
            .flat_map(|rule| rule.constraints.iter())
    }

    /// How an element without children is repaired
    pub fn empty_policy(&self, node: &Node) -> EmptyPolicy {
        if self.is_void(node) {
            return EmptyPolicy::Allow;
        }
        self.constraints_for(node)
            .find_map(|constraint| match constraint {
                Constraint::Empty { policy } => Some(*policy),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Repair requested by a [`NodeValidator`]
#[derive(Debug, Clone, PartialEq)]
pub enum Fix {
    /// Remove the node
    Remove,
    /// Replace the node by its children
    Unwrap,
    /// Merge these properties into the node's own
    SetProperties(Properties),
    /// Apply these operations as they are
    Operations(Vec<Operation>),
}

/// Rule that needs code rather than data.
///
/// Validators run after every built-in and schema rule is satisfied for a
/// node. Returning `Some` reports a violation; the document applies the fix
/// and checks the node again, so a validator must stop asking for a fix once
/// it has been applied.
pub trait NodeValidator: std::fmt::Debug {
    /// Unique identifier, used in diagnostics
    fn name(&self) -> &'static str;

    fn validate(&self, node: &Node, path: &Path, root: &Node) -> Option<Fix>;
}
