//! # Quire Editor
//!
//! Stateful editing engine on top of [`quire_model`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: Node tree, locations, operations     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document                            │
//! │  - Apply operations with validation         │
//! │  - Re-project selection and live references │
//! │  - Normalize dirty paths against a schema   │
//! │  - Undo/redo history                        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Operations are the only way in**: every change, including repairs
//!    and undo, is a primitive operation and goes through the same path
//! 2. **Rejected means untouched**: a failed `apply` (or batch) leaves tree,
//!    selection, references, history and log exactly as they were
//! 3. **Normalization heals, never fails**: violations are repaired and
//!    reported to the error handler
//! 4. **Snapshots are immutable**: subtrees are shared and copied on write
//!
//! ## Usage
//!
//! ```rust
//! use quire_editor::{Document, Schema};
//! use quire_model::{Element, Node, Operation, Path, Point, Range};
//!
//! let mut doc = Document::new(Element::new(vec![
//!     Element::typed("paragraph", vec![Node::text("one")]).into(),
//! ]))
//! .with_schema(Schema::new().with_inline("link"));
//!
//! doc.select(Range::collapsed(Point::new([0, 0], 3)))?;
//! doc.apply(Operation::InsertText {
//!     path: Path::from([0, 0]),
//!     offset: 3,
//!     text: "!".into(),
//! })?;
//!
//! assert_eq!(doc.root().string(), "one!");
//! assert_eq!(doc.selection(), Some(&Range::collapsed(Point::new([0, 0], 4))));
//!
//! doc.undo()?;
//! assert_eq!(doc.root().string(), "one");
//! # Ok::<(), quire_editor::EditorError>(())
//! ```

mod apply;
mod config;
mod dirty;
mod document;
mod errors;
mod normalize;
mod refs;
mod schema;
mod undo_stack;

pub use config::{DocumentConfig, DEFAULT_CONFIG_NAME};
pub use dirty::{dirty_paths, DirtySet};
pub use document::Document;
pub use errors::{EditorError, EditorResult, InvalidOperation, NormalizeError};
pub use refs::{PathRef, PointRef, RangeRef, RefId, RefOptions, RefRegistry, Survival};
pub use schema::{
    ChildRepair, Constraint, EmptyPolicy, Fix, NodeMatch, NodeValidator, Schema, SchemaRule,
};
pub use undo_stack::{OperationBatch, UndoStack};

// Re-export the model for convenience
pub use quire_model;
