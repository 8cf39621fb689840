//! Depth-first node iteration.
//!
//! [`Nodes`] walks a tree lazily and yields `(node, path)` pairs. The walk is
//! driven by a cursor path rather than a stack, so it can start from an
//! arbitrary `from` path, stop at a `to` path, run backwards, and be cloned
//! or restarted at any point.

use crate::node::Node;
use crate::path::Path;
use std::fmt;
use std::rc::Rc;

/// Visit order of a walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Parents before their children
    #[default]
    Pre,
    /// Children before their parents
    Post,
}

/// Predicate deciding whether a walk skips the subtree below a node
pub type PassFn<'a> = Rc<dyn Fn(&Node, &Path) -> bool + 'a>;

/// Options for [`Node::nodes`]
#[derive(Clone, Default)]
pub struct NodesOptions<'a> {
    /// Start at this path. Its ancestors are yielded on the way down.
    pub from: Option<Path>,
    /// Stop once the walk moves past this path
    pub to: Option<Path>,
    /// Walk right to left
    pub reverse: bool,
    pub order: Order,
    /// Nodes for which this returns `true` are yielded but not descended into
    pub pass: Option<PassFn<'a>>,
}

impl<'a> NodesOptions<'a> {
    pub fn from(mut self, path: impl Into<Path>) -> Self {
        self.from = Some(path.into());
        self
    }

    pub fn to(mut self, path: impl Into<Path>) -> Self {
        self.to = Some(path.into());
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn post_order(mut self) -> Self {
        self.order = Order::Post;
        self
    }

    pub fn pass(mut self, pass: impl Fn(&Node, &Path) -> bool + 'a) -> Self {
        self.pass = Some(Rc::new(pass));
        self
    }
}

impl fmt::Debug for NodesOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodesOptions")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("reverse", &self.reverse)
            .field("order", &self.order)
            .field("pass", &self.pass.is_some())
            .finish()
    }
}

/// Lazy depth-first walk over a tree
#[derive(Clone, Debug)]
pub struct Nodes<'a> {
    root: &'a Node,
    options: NodesOptions<'a>,
    cursor: Option<Path>,
    /// The cursor was reached by climbing back up from a child
    ascending: bool,
}

impl<'a> Nodes<'a> {
    pub fn new(root: &'a Node, options: NodesOptions<'a>) -> Self {
        Self {
            root,
            options,
            cursor: Some(Path::root()),
            ascending: false,
        }
    }

    /// Rewind to the beginning of the walk
    pub fn restart(&mut self) {
        self.cursor = Some(Path::root());
        self.ascending = false;
    }

    fn skips(&self, node: &Node, path: &Path) -> bool {
        self.options
            .pass
            .as_ref()
            .is_some_and(|pass| pass(node, path))
    }

    fn advance(&mut self, node: &Node, path: &Path, descend: bool) {
        let reverse = self.options.reverse;

        if descend {
            let last = node.children().len() - 1;
            let mut index = if reverse { last } else { 0 };
            if let Some(from) = &self.options.from {
                if path.is_ancestor(from) {
                    index = from[path.len()].min(last);
                }
            }
            self.cursor = Some(path.child(index));
            self.ascending = false;
            return;
        }

        if !reverse {
            if let Some(next) = path.next() {
                if self.root.has(&next) {
                    self.cursor = Some(next);
                    self.ascending = false;
                    return;
                }
            }
        } else if let Some(previous) = path.previous() {
            self.cursor = Some(previous);
            self.ascending = false;
            return;
        }

        // Climbing past the root ends the walk
        self.cursor = path.parent();
        self.ascending = true;
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = (&'a Node, Path);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = self.cursor.clone()?;

            if let Some(to) = &self.options.to {
                let past = if self.options.reverse {
                    path.is_before(to)
                } else {
                    path.is_after(to)
                };
                if past {
                    self.cursor = None;
                    return None;
                }
            }

            let root = self.root;
            let Some(node) = root.get(&path) else {
                self.cursor = None;
                return None;
            };

            let descend = !self.ascending
                && !node.children().is_empty()
                && !self.skips(node, &path);
            let emit = match self.options.order {
                Order::Pre => !self.ascending,
                Order::Post => !descend,
            };

            self.advance(node, &path, descend);

            if emit {
                return Some((node, path));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Element;

    // root
    // ├── [0] a
    // │   ├── [0,0] "x"
    // │   └── [0,1] "y"
    // └── [1] b
    //     └── [1,0] "z"
    fn sample() -> Node {
        Node::element(vec![
            Element::typed("a", vec![Node::text("x"), Node::text("y")]).into(),
            Element::typed("b", vec![Node::text("z")]).into(),
        ])
    }

    fn paths(iter: Nodes<'_>) -> Vec<Vec<usize>> {
        iter.map(|(_, path)| path.into_inner()).collect()
    }

    #[test]
    fn test_pre_order() {
        let root = sample();
        assert_eq!(
            paths(root.nodes(NodesOptions::default())),
            vec![vec![], vec![0], vec![0, 0], vec![0, 1], vec![1], vec![1, 0]]
        );
    }

    #[test]
    fn test_post_order() {
        let root = sample();
        assert_eq!(
            paths(root.nodes(NodesOptions::default().post_order())),
            vec![vec![0, 0], vec![0, 1], vec![0], vec![1, 0], vec![1], vec![]]
        );
    }

    #[test]
    fn test_reverse() {
        let root = sample();
        assert_eq!(
            paths(root.nodes(NodesOptions::default().reverse())),
            vec![vec![], vec![1], vec![1, 0], vec![0], vec![0, 1], vec![0, 0]]
        );
    }

    #[test]
    fn test_window() {
        let root = sample();
        let walked = paths(root.nodes(NodesOptions::default().from([0, 1]).to([1])));
        assert_eq!(walked, vec![vec![], vec![0], vec![0, 1], vec![1], vec![1, 0]]);
    }

    #[test]
    fn test_pass_skips_subtree() {
        let root = sample();
        let options = NodesOptions::default().pass(|node, _| node.element_type() == Some("a"));
        assert_eq!(
            paths(root.nodes(options)),
            vec![vec![], vec![0], vec![1], vec![1, 0]]
        );
    }

    #[test]
    fn test_restart() {
        let root = sample();
        let mut iter = root.nodes(NodesOptions::default());
        assert_eq!(iter.by_ref().count(), 6);
        iter.restart();
        assert_eq!(iter.count(), 6);
    }
}
