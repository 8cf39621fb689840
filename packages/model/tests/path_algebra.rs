//! Exhaustive checks of the path algebra over small path sets.

use quire_model::{Affinity, Node, Operation, Path, Properties};
use std::cmp::Ordering;

/// Every path over `alphabet` with at most `depth` indexes, root included
fn all_paths(alphabet: usize, depth: usize) -> Vec<Path> {
    let mut out = vec![Path::root()];
    let mut frontier = vec![Path::root()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for path in &frontier {
            for index in 0..alphabet {
                next.push(path.child(index));
            }
        }
        out.extend(next.iter().cloned());
        frontier = next;
    }
    out
}

#[test]
fn test_relations_agree_up_to_depth_five() {
    let paths = all_paths(2, 5);
    assert_eq!(paths.len(), 63);

    for a in &paths {
        for b in &paths {
            let ordering = a.compare(b);
            assert_eq!(ordering, b.compare(a).reverse(), "{a} vs {b}");

            let common = a.common(b);
            assert!(common.is_common(a) && common.is_common(b), "{a} vs {b}");

            if a.is_ancestor(b) {
                assert_eq!(common, *a, "{a} ancestor of {b}");
                assert!(b.is_descendant(a));
                assert_eq!(ordering, Ordering::Equal);
            }
            if a.is_parent(b) {
                assert!(a.is_ancestor(b));
                assert_eq!(b.parent().as_ref(), Some(a));
            }
            if a.is_sibling(b) {
                assert!(b.is_sibling(a));
                assert_eq!(a.parent(), b.parent());
                assert_ne!(ordering, Ordering::Equal);
            }
            if a.ends_before(b) {
                assert!(a.is_before(b), "{a} ends before {b}");
                assert!(!a.ends_after(b));
            }

            // Exactly one of: before, after, or on the same branch
            let same_branch = a.is_common(b) || b.is_common(a);
            let count = [a.is_before(b), a.is_after(b), same_branch]
                .iter()
                .filter(|held| **held)
                .count();
            assert_eq!(count, 1, "{a} vs {b}");

            if a == b {
                assert!(a.is_common(b) && !a.is_ancestor(b) && !a.is_sibling(b));
            }
        }
    }
}

#[test]
fn test_insert_then_remove_restores_paths() {
    let paths = all_paths(2, 5);
    for at in paths.iter().filter(|p| !p.is_root()) {
        let insert = Operation::InsertNode {
            path: at.clone(),
            node: Node::text(""),
        };
        let remove = Operation::RemoveNode {
            path: at.clone(),
            node: Node::text(""),
        };
        for p in &paths {
            let shifted = p.transform(&insert, None).expect("inserts never delete");
            assert_eq!(shifted.transform(&remove, None).as_ref(), Some(p), "insert {at} then remove, {p}");
        }
    }
}

#[test]
fn test_remove_annihilates_exactly_the_subtree() {
    let paths = all_paths(2, 4);
    for at in paths.iter().filter(|p| !p.is_root()) {
        let remove = Operation::RemoveNode {
            path: at.clone(),
            node: Node::text(""),
        };
        for p in &paths {
            let inside = at == p || at.is_ancestor(p);
            assert_eq!(p.transform(&remove, None).is_none(), inside, "remove {at}, {p}");
        }
    }
}

#[test]
fn test_split_then_merge_restores_paths() {
    let paths = all_paths(3, 3);
    for at in paths.iter().filter(|p| !p.is_root()) {
        for position in 0..3 {
            let split = Operation::SplitNode {
                path: at.clone(),
                position,
                properties: Properties::new(),
            };
            let merge = split.inverse();
            for p in &paths {
                for affinity in [Affinity::Forward, Affinity::Backward] {
                    let moved = p.transform(&split, Some(affinity)).expect("affinity given");
                    assert_eq!(
                        moved.transform(&merge, None).as_ref(),
                        Some(p),
                        "split {at}@{position}, {p}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_move_matches_remove_then_insert() {
    let paths = all_paths(3, 3);
    for from in paths.iter().filter(|p| !p.is_root()) {
        for to in paths.iter().filter(|p| !p.is_root()) {
            if from == to || from.is_ancestor(to) {
                continue;
            }
            let op = Operation::MoveNode {
                path: from.clone(),
                new_path: to.clone(),
            };
            // Where the node actually lands once its old slot is gone
            let landing = from.transform(&op, None).expect("moves never delete");
            let remove = Operation::RemoveNode {
                path: from.clone(),
                node: Node::text(""),
            };
            let insert = Operation::InsertNode {
                path: landing.clone(),
                node: Node::text(""),
            };

            for p in &paths {
                if from == p || from.is_ancestor(p) {
                    continue;
                }
                let composed = p
                    .transform(&remove, None)
                    .and_then(|p| p.transform(&insert, None));
                assert_eq!(
                    p.transform(&op, None),
                    composed,
                    "move {from} -> {to} (lands {landing}), {p}"
                );
            }
        }
    }
}

#[test]
fn test_noop_move_changes_nothing() {
    let paths = all_paths(2, 4);
    for at in &paths {
        let op = Operation::MoveNode {
            path: at.clone(),
            new_path: at.clone(),
        };
        for p in &paths {
            assert_eq!(p.transform(&op, None).as_ref(), Some(p));
        }
        assert_eq!(op.inverse(), op);
    }
}

#[test]
fn test_move_subtree_rerooted() {
    let op = Operation::MoveNode {
        path: Path::from([0, 1]),
        new_path: Path::from([2, 0]),
    };
    assert_eq!(
        Path::from([0, 1, 4]).transform(&op, None),
        Some(Path::from([2, 0, 4]))
    );

    // Moving down into a later sibling: that sibling shifts left first
    let op = Operation::MoveNode {
        path: Path::from([0]),
        new_path: Path::from([1, 0]),
    };
    assert_eq!(Path::from([0, 3]).transform(&op, None), Some(Path::from([0, 0, 3])));
    assert_eq!(Path::from([1, 0]).transform(&op, None), Some(Path::from([0, 1])));
}
