//! # Quire Model
//!
//! Pure data types for structured documents: the node tree, addresses into
//! it, and the primitive operations that edit it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: Node tree + Path/Point/Range algebra │
//! │  - Operation set (9 primitives)             │
//! │  - Inverse + transform of locations         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document lifecycle                  │
//! │  - Apply operations with validation         │
//! │  - Live references, normalization, history  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate holds state. Every function is a value-in, value-out
//! computation so it can be shared between the editor, tests and tooling.
//!
//! ## Usage
//!
//! ```rust
//! use quire_model::{Affinity, Operation, Path, Point};
//!
//! let op = Operation::InsertText {
//!     path: Path::from([0, 0]),
//!     offset: 0,
//!     text: "Hi ".into(),
//! };
//! let caret = Point::new([0, 0], 2);
//! assert_eq!(caret.transform(&op, Some(Affinity::Forward)), Some(Point::new([0, 0], 5)));
//! ```

pub mod iter;
pub mod node;
pub mod operation;
pub mod path;
pub mod point;
pub mod range;
pub mod text;

pub use iter::{Nodes, NodesOptions, Order};
pub use node::{node_mut, Element, Node, NodeKind, Properties, Text, RESERVED_KEYS, TYPE_KEY};
pub use operation::{Operation, SelectionProps};
pub use path::{Affinity, Path};
pub use point::Point;
pub use range::{Range, RangeAffinity};
