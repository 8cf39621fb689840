//! # Paths
//!
//! A path is the list of child indexes walked from the root to reach a node.
//! `[]` addresses the root itself.
//!
//! Paths are positional, not identities: any insert, removal, split, merge or
//! move that happens before or above a path makes it stale. [`Path::transform`]
//! re-projects a path across one operation.
//!
//! ## Ordering
//!
//! [`Path::compare`] only looks at the shared prefix. An ancestor and its
//! descendants therefore compare `Equal`, which is why `Path` does not
//! implement `Ord`.

use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// Tie-break for a reference sitting exactly at an edit boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    /// Stick to the content after the boundary
    Forward,
    /// Stick to the content before the boundary
    Backward,
}

/// Positional address of a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn new(indexes: Vec<usize>) -> Self {
        Self(indexes)
    }

    /// The root path `[]`
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }

    /// Path of the `index`th child of this path
    pub fn child(&self, index: usize) -> Path {
        let mut indexes = self.0.clone();
        indexes.push(index);
        Path(indexes)
    }

    /// Append another (relative) path
    pub fn concat(&self, rest: &[usize]) -> Path {
        let mut indexes = self.0.clone();
        indexes.extend_from_slice(rest);
        Path(indexes)
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Path> {
        let (_, head) = self.0.split_last()?;
        Some(Path(head.to_vec()))
    }

    /// Next sibling path, `None` for the root
    pub fn next(&self) -> Option<Path> {
        let (last, head) = self.0.split_last()?;
        let mut indexes = head.to_vec();
        indexes.push(last + 1);
        Some(Path(indexes))
    }

    /// Previous sibling path, `None` for the root or a first child
    pub fn previous(&self) -> Option<Path> {
        let (last, head) = self.0.split_last()?;
        let mut indexes = head.to_vec();
        indexes.push(last.checked_sub(1)?);
        Some(Path(indexes))
    }

    pub fn has_previous(&self) -> bool {
        self.0.last().is_some_and(|last| *last > 0)
    }

    /// All ancestors, root first, excluding the path itself
    pub fn ancestors(&self) -> Vec<Path> {
        (0..self.0.len()).map(|len| Path(self.0[..len].to_vec())).collect()
    }

    /// All ancestors, root first, including the path itself
    pub fn levels(&self) -> Vec<Path> {
        (0..=self.0.len()).map(|len| Path(self.0[..len].to_vec())).collect()
    }

    /// Longest shared prefix of two paths
    pub fn common(&self, other: &Path) -> Path {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Path(self.0[..shared].to_vec())
    }

    /// This path expressed relative to `ancestor`
    pub fn relative(&self, ancestor: &Path) -> Option<Path> {
        if ancestor.is_ancestor(self) || ancestor == self {
            Some(Path(self.0[ancestor.len()..].to_vec()))
        } else {
            None
        }
    }

    /// Compare over the shared prefix. Ancestors and descendants are `Equal`.
    pub fn compare(&self, other: &Path) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }

    pub fn is_ancestor(&self, other: &Path) -> bool {
        self.len() < other.len() && self.compare(other) == Ordering::Equal
    }

    pub fn is_descendant(&self, other: &Path) -> bool {
        other.is_ancestor(self)
    }

    pub fn is_parent(&self, other: &Path) -> bool {
        self.len() + 1 == other.len() && self.compare(other) == Ordering::Equal
    }

    pub fn is_child(&self, other: &Path) -> bool {
        other.is_parent(self)
    }

    /// Either path is a prefix of (or equal to) the other
    pub fn is_common(&self, other: &Path) -> bool {
        self.len() <= other.len() && self.compare(other) == Ordering::Equal
    }

    pub fn is_sibling(&self, other: &Path) -> bool {
        match (self.0.split_last(), other.0.split_last()) {
            (Some((a, a_parent)), Some((b, b_parent))) => a_parent == b_parent && a != b,
            _ => false,
        }
    }

    pub fn is_before(&self, other: &Path) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Path) -> bool {
        self.compare(other) == Ordering::Greater
    }

    /// This path's last index sits before the index `other` has at the same
    /// depth, under the same parent.
    pub fn ends_before(&self, other: &Path) -> bool {
        self.ends_with(other, Ordering::Less)
    }

    pub fn ends_after(&self, other: &Path) -> bool {
        self.ends_with(other, Ordering::Greater)
    }

    pub fn ends_at(&self, other: &Path) -> bool {
        self.ends_with(other, Ordering::Equal)
    }

    fn ends_with(&self, other: &Path, ordering: Ordering) -> bool {
        let Some((last, head)) = self.0.split_last() else {
            return false;
        };
        let depth = head.len();
        match other.0.get(depth) {
            Some(theirs) => other.0[..depth] == *head && last.cmp(theirs) == ordering,
            None => false,
        }
    }

    /// Re-project this path across `op`.
    ///
    /// Returns `None` when the addressed node no longer exists, or when a
    /// `split_node` hits this exact path and no affinity was given.
    pub fn transform(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Path> {
        let mut p = self.clone();

        match op {
            Operation::InsertNode { path: at, .. } => {
                if at.is_root() {
                    return Some(p);
                }
                if at == self || at.ends_before(self) || at.is_ancestor(self) {
                    p.0[at.len() - 1] += 1;
                }
            }

            Operation::RemoveNode { path: at, .. } => {
                if at == self || at.is_ancestor(self) {
                    return None;
                }
                if at.ends_before(self) {
                    p.0[at.len() - 1] -= 1;
                }
            }

            Operation::MergeNode { path: at, position, .. } => {
                if at.is_root() {
                    return Some(p);
                }
                let depth = at.len() - 1;
                if at == self || at.ends_before(self) {
                    p.0[depth] = p.0[depth].saturating_sub(1);
                } else if at.is_ancestor(self) {
                    p.0[depth] = p.0[depth].saturating_sub(1);
                    p.0[at.len()] += position;
                }
            }

            Operation::SplitNode { path: at, position, .. } => {
                if at.is_root() {
                    return Some(p);
                }
                let depth = at.len() - 1;
                if at == self {
                    match affinity {
                        Some(Affinity::Forward) => p.0[depth] += 1,
                        // Still the left half
                        Some(Affinity::Backward) => {}
                        None => return None,
                    }
                } else if at.ends_before(self) {
                    p.0[depth] += 1;
                } else if at.is_ancestor(self) && self.0[at.len()] >= *position {
                    p.0[depth] += 1;
                    p.0[at.len()] -= position;
                }
            }

            Operation::MoveNode { path: from, new_path: to } => {
                return Some(self.transform_move(from, to));
            }

            Operation::InsertText { .. }
            | Operation::RemoveText { .. }
            | Operation::SetNode { .. }
            | Operation::SetSelection { .. } => {}
        }

        Some(p)
    }

    /// Re-project this path across `move_node(from, to)`. Moves never
    /// delete anything, so the result always exists.
    pub(crate) fn transform_move(&self, from: &Path, to: &Path) -> Path {
        let mut p = self.clone();
        if from == to || from.is_root() || to.is_root() {
            return p;
        }

        if from.is_ancestor(self) || from == self {
            // Re-root under the destination as it reads once the source is gone
            let mut destination = to.clone();
            if from.ends_before(to) && from.len() < to.len() {
                destination.0[from.len() - 1] -= 1;
            }
            return destination.concat(&self.0[from.len()..]);
        }

        let from_depth = from.len() - 1;
        let to_depth = to.len() - 1;

        if from.is_sibling(to) && (to.is_ancestor(self) || to == self) {
            if from.ends_before(self) {
                p.0[from_depth] -= 1;
            } else {
                p.0[from_depth] += 1;
            }
        } else if to.ends_before(self) || to == self || to.is_ancestor(self) {
            if from.ends_before(self) {
                p.0[from_depth] -= 1;
            }
            p.0[to_depth] += 1;
        } else if from.ends_before(self) {
            p.0[from_depth] -= 1;
        }

        p
    }
}

impl Deref for Path {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(indexes: Vec<usize>) -> Self {
        Path(indexes)
    }
}

impl From<&[usize]> for Path {
    fn from(indexes: &[usize]) -> Self {
        Path(indexes.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indexes: [usize; N]) -> Self {
        Path(indexes.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "]")
    }
}
