//! Ranges: an anchor/focus pair of points.
//!
//! The anchor is where a selection started and the focus is where it ended,
//! so a range may be "backward" (focus before anchor). Use [`Range::edges`]
//! for document order.

use crate::operation::Operation;
use crate::path::{Affinity, Path};
use crate::point::Point;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

/// How the endpoints of a range react to edits at their exact position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeAffinity {
    Forward,
    Backward,
    /// Edits at the edges stay outside the range
    Inward,
    /// Edits at the edges are absorbed into the range
    Outward,
}

impl RangeAffinity {
    /// Point affinities for `(anchor, focus)` of `range`
    pub fn for_points(self, range: &Range) -> (Option<Affinity>, Option<Affinity>) {
        let forward = range.is_forward();
        match self {
            RangeAffinity::Forward => (Some(Affinity::Forward), Some(Affinity::Forward)),
            RangeAffinity::Backward => (Some(Affinity::Backward), Some(Affinity::Backward)),
            RangeAffinity::Inward => {
                let anchor = if forward {
                    Affinity::Forward
                } else {
                    Affinity::Backward
                };
                let focus = if range.is_collapsed() {
                    anchor
                } else if forward {
                    Affinity::Backward
                } else {
                    Affinity::Forward
                };
                (Some(anchor), Some(focus))
            }
            RangeAffinity::Outward => {
                if forward {
                    (Some(Affinity::Backward), Some(Affinity::Forward))
                } else {
                    (Some(Affinity::Forward), Some(Affinity::Backward))
                }
            }
        }
    }
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.anchor.is_after(&self.focus)
    }

    pub fn is_forward(&self) -> bool {
        !self.is_backward()
    }

    /// `(start, end)` in document order
    pub fn edges(&self) -> (&Point, &Point) {
        if self.is_backward() {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }

    pub fn start(&self) -> &Point {
        self.edges().0
    }

    pub fn end(&self) -> &Point {
        self.edges().1
    }

    /// The point lies within the range, edges included
    pub fn includes_point(&self, point: &Point) -> bool {
        let (start, end) = self.edges();
        point.compare(start) != Ordering::Less && point.compare(end) != Ordering::Greater
    }

    /// The path touches the range: between the edge paths or an ancestor of
    /// one of them
    pub fn includes_path(&self, path: &Path) -> bool {
        let (start, end) = self.edges();
        path.compare(&start.path) != Ordering::Less && path.compare(&end.path) != Ordering::Greater
    }

    /// This range fully contains `other`
    pub fn surrounds(&self, other: &Range) -> bool {
        let (start, end) = other.edges();
        self.includes_point(start) && self.includes_point(end)
    }

    /// Overlap of two ranges, in document order
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        let (s1, e1) = self.edges();
        let (s2, e2) = other.edges();
        let start = if s1.is_before(s2) { s2 } else { s1 };
        let end = if e1.is_before(e2) { e1 } else { e2 };
        if end.is_before(start) {
            None
        } else {
            Some(Range::new(start.clone(), end.clone()))
        }
    }

    /// Re-project both endpoints across `op`. If either endpoint is gone
    /// the whole range is.
    pub fn transform(&self, op: &Operation, affinity: Option<RangeAffinity>) -> Option<Range> {
        let (anchor_affinity, focus_affinity) = match affinity {
            Some(affinity) => affinity.for_points(self),
            None => (None, None),
        };
        let anchor = self.anchor.transform(op, anchor_affinity)?;
        let focus = self.focus.transform(op, focus_affinity)?;
        Some(Range { anchor, focus })
    }
}
