//! Dirty paths: the nodes an operation may have left in need of
//! normalization.

use std::collections::HashSet;

use quire_model::{Affinity, Node, NodesOptions, Operation, Path};

/// Paths `op` may have invalidated, in the tree as it is after `op`
pub fn dirty_paths(op: &Operation) -> Vec<Path> {
    match op {
        Operation::InsertText { path, .. }
        | Operation::RemoveText { path, .. }
        | Operation::SetNode { path, .. } => path.levels(),

        Operation::InsertNode { path, node } => {
            let mut paths = path.levels();
            if node.is_element() {
                paths.extend(
                    node.nodes(NodesOptions::default())
                        .map(|(_, relative)| path.concat(&relative)),
                );
            }
            paths
        }

        Operation::MergeNode { path, .. } => {
            let mut paths = path.ancestors();
            paths.extend(path.previous());
            paths
        }

        Operation::MoveNode { path, new_path } => {
            if path == new_path {
                return Vec::new();
            }
            let moved = |at: &Path| at.transform(op, Some(Affinity::Forward));
            let old_ancestors: Vec<Path> = path.ancestors().iter().filter_map(moved).collect();
            let new_ancestors: Vec<Path> = new_path.ancestors().iter().filter_map(moved).collect();

            let landing = match (new_ancestors.last(), new_path.last()) {
                (Some(parent), Some(index)) => Some(parent.child(*index)),
                _ => None,
            };

            let mut paths = old_ancestors;
            paths.extend(new_ancestors);
            paths.extend(landing);
            paths
        }

        Operation::RemoveNode { path, .. } => path.ancestors(),

        Operation::SplitNode { path, .. } => {
            let mut paths = path.levels();
            paths.extend(path.next());
            paths
        }

        Operation::SetSelection { .. } => Vec::new(),
    }
}

/// Ordered, de-duplicated stack of dirty paths
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtySet {
    paths: Vec<Path>,
    keys: HashSet<Path>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn insert(&mut self, path: Path) {
        if self.keys.insert(path.clone()) {
            self.paths.push(path);
        }
    }

    /// Most recently marked path
    pub fn pop(&mut self) -> Option<Path> {
        let path = self.paths.pop()?;
        self.keys.remove(&path);
        Some(path)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.keys.clear();
    }

    /// Re-project every dirty path across `op`, then mark what `op` dirtied
    pub fn apply(&mut self, op: &Operation) {
        if !op.is_text_operation() && !op.is_selection_operation() {
            let old = std::mem::take(&mut self.paths);
            self.keys.clear();
            for path in old {
                if let Some(path) = path.transform(op, Some(Affinity::Forward)) {
                    self.insert(path);
                }
            }
        }

        for path in dirty_paths(op) {
            self.insert(path);
        }
    }

    /// Mark every node in `root`
    pub fn mark_all(&mut self, root: &Node) {
        for (_, path) in root.nodes(NodesOptions::default()) {
            self.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_model::Properties;

    #[test]
    fn test_text_ops_dirty_levels() {
        let op = Operation::InsertText {
            path: Path::from([1, 2]),
            offset: 0,
            text: "a".into(),
        };
        assert_eq!(
            dirty_paths(&op),
            vec![Path::root(), Path::from([1]), Path::from([1, 2])]
        );
    }

    #[test]
    fn test_insert_node_dirties_descendants() {
        let op = Operation::InsertNode {
            path: Path::from([1]),
            node: Node::element(vec![Node::text("a"), Node::text("b")]),
        };
        assert_eq!(
            dirty_paths(&op),
            vec![
                Path::root(),
                Path::from([1]),
                Path::from([1]),
                Path::from([1, 0]),
                Path::from([1, 1]),
            ]
        );
    }

    #[test]
    fn test_merge_and_split() {
        let merge = Operation::MergeNode {
            path: Path::from([0, 2]),
            position: 1,
            properties: Properties::new(),
        };
        assert_eq!(
            dirty_paths(&merge),
            vec![Path::root(), Path::from([0]), Path::from([0, 1])]
        );

        let split = Operation::SplitNode {
            path: Path::from([0, 2]),
            position: 1,
            properties: Properties::new(),
        };
        assert_eq!(
            dirty_paths(&split),
            vec![Path::root(), Path::from([0]), Path::from([0, 2]), Path::from([0, 3])]
        );
    }

    #[test]
    fn test_move_dirties_both_parents() {
        let op = Operation::MoveNode {
            path: Path::from([0, 1]),
            new_path: Path::from([2, 0]),
        };
        assert_eq!(
            dirty_paths(&op),
            vec![
                Path::root(),
                Path::from([0]),
                Path::root(),
                Path::from([2]),
                Path::from([2, 0]),
            ]
        );

        let noop = Operation::MoveNode {
            path: Path::from([0]),
            new_path: Path::from([0]),
        };
        assert!(dirty_paths(&noop).is_empty());
    }

    #[test]
    fn test_set_shifts_and_dedupes() {
        let mut dirty = DirtySet::new();
        dirty.insert(Path::from([0, 0]));
        dirty.insert(Path::from([1]));
        dirty.insert(Path::from([1]));
        assert_eq!(dirty.len(), 2);

        dirty.apply(&Operation::InsertNode {
            path: Path::from([0]),
            node: Node::text(""),
        });
        assert_eq!(
            dirty.paths(),
            &[Path::from([1, 0]), Path::from([2]), Path::root(), Path::from([0])]
        );

        dirty.apply(&Operation::RemoveNode {
            path: Path::from([1]),
            node: Node::text(""),
        });
        assert_eq!(dirty.paths(), &[Path::from([1]), Path::root(), Path::from([0])]);

        assert_eq!(dirty.pop(), Some(Path::from([0])));
        dirty.insert(Path::from([0]));
        assert_eq!(dirty.len(), 3);
    }
}
