//! Points: a text node path plus an offset into that text.

use crate::operation::Operation;
use crate::path::{Affinity, Path};
use crate::text::utf16_len;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Character position inside the text node at `path`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    /// UTF-16 code units from the start of the text
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    /// Order by path first, then offset
    pub fn compare(&self, other: &Point) -> Ordering {
        match self.path.compare(&other.path) {
            Ordering::Equal => self.offset.cmp(&other.offset),
            unequal => unequal,
        }
    }

    pub fn is_before(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Point) -> bool {
        self.compare(other) == Ordering::Greater
    }

    /// Re-project this point across `op`.
    ///
    /// Returns `None` when the text it pointed into is gone, or when a split
    /// lands exactly on it and no affinity was given.
    pub fn transform(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Point> {
        let mut point = self.clone();

        match op {
            Operation::InsertNode { .. } | Operation::MoveNode { .. } => {
                point.path = self.path.transform(op, affinity)?;
            }

            Operation::InsertText { path, offset, text } => {
                let moves = *offset < self.offset
                    || (*offset == self.offset && affinity == Some(Affinity::Forward));
                if *path == self.path && moves {
                    point.offset += utf16_len(text);
                }
            }

            Operation::RemoveText { path, offset, text } => {
                if *path == self.path && *offset <= self.offset {
                    point.offset -= (self.offset - offset).min(utf16_len(text));
                }
            }

            Operation::MergeNode { path, position, .. } => {
                if *path == self.path {
                    point.offset += position;
                }
                point.path = self.path.transform(op, affinity)?;
            }

            Operation::RemoveNode { path, .. } => {
                if *path == self.path || path.is_ancestor(&self.path) {
                    return None;
                }
                point.path = self.path.transform(op, affinity)?;
            }

            Operation::SplitNode { path, position, .. } => {
                if *path == self.path {
                    if *position == self.offset && affinity.is_none() {
                        return None;
                    }
                    let moves = *position < self.offset
                        || (*position == self.offset && affinity == Some(Affinity::Forward));
                    if moves {
                        point.offset -= position;
                        point.path = self.path.transform(op, Some(Affinity::Forward))?;
                    }
                } else {
                    point.path = self.path.transform(op, affinity)?;
                }
            }

            Operation::SetNode { .. } | Operation::SetSelection { .. } => {}
        }

        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare() {
        let a = Point::new([0, 1], 3);
        assert!(a.is_before(&Point::new([0, 1], 4)));
        assert!(a.is_after(&Point::new([0, 0], 9)));
        assert_eq!(a.compare(&Point::new([0, 1], 3)), Ordering::Equal);
    }

    #[test]
    fn test_insert_text_affinity() {
        let op = Operation::InsertText {
            path: Path::from([0, 0]),
            offset: 2,
            text: "ab".into(),
        };
        let at = Point::new([0, 0], 2);
        assert_eq!(at.transform(&op, Some(Affinity::Forward)), Some(Point::new([0, 0], 4)));
        assert_eq!(at.transform(&op, Some(Affinity::Backward)), Some(Point::new([0, 0], 2)));
        let before = Point::new([0, 0], 1);
        assert_eq!(before.transform(&op, Some(Affinity::Forward)), Some(before.clone()));
    }

    #[test]
    fn test_remove_text_clamps() {
        let op = Operation::RemoveText {
            path: Path::from([0, 0]),
            offset: 1,
            text: "bcd".into(),
        };
        assert_eq!(Point::new([0, 0], 3).transform(&op, None), Some(Point::new([0, 0], 1)));
        assert_eq!(Point::new([0, 0], 6).transform(&op, None), Some(Point::new([0, 0], 3)));
        assert_eq!(Point::new([0, 0], 0).transform(&op, None), Some(Point::new([0, 0], 0)));
    }

    #[test]
    fn test_split_moves_tail_points() {
        let op = Operation::SplitNode {
            path: Path::from([0, 0]),
            position: 2,
            properties: Default::default(),
        };
        assert_eq!(
            Point::new([0, 0], 3).transform(&op, Some(Affinity::Forward)),
            Some(Point::new([0, 1], 1))
        );
        assert_eq!(
            Point::new([0, 0], 2).transform(&op, Some(Affinity::Backward)),
            Some(Point::new([0, 0], 2))
        );
        assert_eq!(Point::new([0, 0], 2).transform(&op, None), None);
    }

    #[test]
    fn test_merge_rebases_offset() {
        let op = Operation::MergeNode {
            path: Path::from([0, 1]),
            position: 5,
            properties: Default::default(),
        };
        assert_eq!(
            Point::new([0, 1], 2).transform(&op, Some(Affinity::Forward)),
            Some(Point::new([0, 0], 7))
        );
    }
}
