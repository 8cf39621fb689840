//! # Reference registry
//!
//! Live references into a document. A reference is registered once and then
//! re-projected by the document across every operation it applies, so a
//! caller can hold on to a location while the tree changes underneath it.
//!
//! ```rust
//! use quire_editor::{Document, RefOptions};
//! use quire_model::{Element, Node, Operation, Path};
//!
//! let mut doc = Document::new(Element::new(vec![
//!     Element::typed("paragraph", vec![Node::text("one")]).into(),
//! ]));
//! let bookmark = doc.path_ref(Path::from([0]), RefOptions::default());
//!
//! doc.apply(Operation::InsertNode {
//!     path: Path::from([0]),
//!     node: Element::typed("paragraph", vec![Node::text("zero")]).into(),
//! })?;
//!
//! assert_eq!(doc.path_ref_current(bookmark), Some(Path::from([1])));
//! # Ok::<(), quire_editor::EditorError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;

use quire_model::{Affinity, Node, Operation, Path, Point, Range, RangeAffinity};
use serde::{Deserialize, Serialize};

/// Identity of a registered reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(u64);

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathRef(RefId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointRef(RefId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeRef(RefId);

impl PathRef {
    pub fn id(self) -> RefId {
        self.0
    }
}

impl PointRef {
    pub fn id(self) -> RefId {
        self.0
    }
}

impl RangeRef {
    pub fn id(self) -> RefId {
        self.0
    }
}

/// What a reference becomes when the node it points at is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Survival {
    /// The reference becomes unreachable for good
    #[default]
    Unset,
    /// Fall back to the closest ancestor that still exists (the start of it,
    /// for points and ranges)
    NearestAncestor,
}

/// Options for registering a reference. `A` is [`Affinity`] for path and
/// point references and [`RangeAffinity`] for range references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefOptions<A> {
    pub affinity: Option<A>,
    pub survival: Survival,
}

impl<A> RefOptions<A> {
    pub fn with_affinity(affinity: Option<A>) -> Self {
        Self {
            affinity,
            survival: Survival::Unset,
        }
    }

    pub fn survival(mut self, survival: Survival) -> Self {
        self.survival = survival;
        self
    }
}

impl Default for RefOptions<Affinity> {
    fn default() -> Self {
        Self::with_affinity(Some(Affinity::Forward))
    }
}

impl Default for RefOptions<RangeAffinity> {
    fn default() -> Self {
        Self::with_affinity(Some(RangeAffinity::Inward))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<V, A> {
    current: Option<V>,
    options: RefOptions<A>,
}

/// Every live reference of one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefRegistry {
    next_id: u64,
    paths: BTreeMap<RefId, Entry<Path, Affinity>>,
    points: BTreeMap<RefId, Entry<Point, Affinity>>,
    ranges: BTreeMap<RefId, Entry<Range, RangeAffinity>>,
}

impl RefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> RefId {
        self.next_id += 1;
        RefId(self.next_id)
    }

    pub fn len(&self) -> usize {
        self.paths.len() + self.points.len() + self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert_path(&mut self, path: Path, options: RefOptions<Affinity>) -> PathRef {
        let id = self.allocate();
        self.paths.insert(
            id,
            Entry {
                current: Some(path),
                options,
            },
        );
        PathRef(id)
    }

    pub fn insert_point(&mut self, point: Point, options: RefOptions<Affinity>) -> PointRef {
        let id = self.allocate();
        self.points.insert(
            id,
            Entry {
                current: Some(point),
                options,
            },
        );
        PointRef(id)
    }

    pub fn insert_range(&mut self, range: Range, options: RefOptions<RangeAffinity>) -> RangeRef {
        let id = self.allocate();
        self.ranges.insert(
            id,
            Entry {
                current: Some(range),
                options,
            },
        );
        RangeRef(id)
    }

    /// Current value, `None` once unreachable or released
    pub fn path(&self, r: PathRef) -> Option<&Path> {
        self.paths.get(&r.0)?.current.as_ref()
    }

    pub fn point(&self, r: PointRef) -> Option<&Point> {
        self.points.get(&r.0)?.current.as_ref()
    }

    pub fn range(&self, r: RangeRef) -> Option<&Range> {
        self.ranges.get(&r.0)?.current.as_ref()
    }

    /// Stop tracking and hand back the last value
    pub fn release_path(&mut self, r: PathRef) -> Option<Path> {
        self.paths.remove(&r.0)?.current
    }

    pub fn release_point(&mut self, r: PointRef) -> Option<Point> {
        self.points.remove(&r.0)?.current
    }

    pub fn release_range(&mut self, r: RangeRef) -> Option<Range> {
        self.ranges.remove(&r.0)?.current
    }

    /// Re-project every reference across `op`. `root_after` is the tree
    /// once `op` has been applied.
    pub fn transform(&mut self, op: &Operation, root_after: &Node) {
        for entry in self.paths.values_mut() {
            let Some(path) = &entry.current else { continue };
            let moved = path.transform(op, entry.options.affinity);
            entry.current = match (moved, entry.options.survival) {
                (Some(moved), _) => Some(moved),
                (None, Survival::Unset) => None,
                (None, Survival::NearestAncestor) => surviving_ancestor(path, op),
            };
        }

        for entry in self.points.values_mut() {
            let Some(point) = &entry.current else { continue };
            let moved = point.transform(op, entry.options.affinity);
            entry.current = match (moved, entry.options.survival) {
                (Some(moved), _) => Some(moved),
                (None, Survival::Unset) => None,
                (None, Survival::NearestAncestor) => fallback_point(&point.path, op, root_after),
            };
        }

        for entry in self.ranges.values_mut() {
            let Some(range) = &entry.current else { continue };
            let (anchor_affinity, focus_affinity) = match entry.options.affinity {
                Some(affinity) => affinity.for_points(range),
                None => (None, None),
            };
            let survive = |point: &Point, affinity: Option<Affinity>| {
                point.transform(op, affinity).or_else(|| match entry.options.survival {
                    Survival::Unset => None,
                    Survival::NearestAncestor => fallback_point(&point.path, op, root_after),
                })
            };
            let anchor = survive(&range.anchor, anchor_affinity);
            let focus = survive(&range.focus, focus_affinity);
            entry.current = match (anchor, focus) {
                (Some(anchor), Some(focus)) => Some(Range::new(anchor, focus)),
                _ => None,
            };
        }
    }
}

/// Closest ancestor of `path` that `op` does not delete, in post-`op` terms
fn surviving_ancestor(path: &Path, op: &Operation) -> Option<Path> {
    path.ancestors()
        .iter()
        .rev()
        .find_map(|ancestor| ancestor.transform(op, Some(Affinity::Forward)))
}

/// Start of the closest surviving ancestor of `path`
fn fallback_point(path: &Path, op: &Operation, root_after: &Node) -> Option<Point> {
    let ancestor = surviving_ancestor(path, op)?;
    let at = root_after.first_text_path(&ancestor).unwrap_or(ancestor);
    Some(Point::new(at, 0))
}
