//! # Undo/Redo Stack
//!
//! Tracks operation history and enables undo/redo.
//!
//! ## Design
//!
//! - Operations are recorded as they are applied, grouped into batches
//! - Undo applies the inverses of a batch in reverse order
//! - Redo reapplies the original operations
//! - New edits clear the redo stack
//! - The document opens one batch per top-level edit, so the normalization
//!   operations an edit triggers are undone together with it
//!
//! The stack only stores batches; [`crate::Document::undo`] and
//! [`crate::Document::redo`] do the replaying.

use quire_model::{Operation, Range};

/// A group of operations that should be undone/redone together
#[derive(Debug, Clone, PartialEq)]
pub struct OperationBatch {
    /// The operations in this batch (in application order)
    pub operations: Vec<Operation>,

    /// Selection when the batch started
    pub selection_before: Option<Range>,

    /// Optional description of this batch
    pub description: Option<String>,
}

impl OperationBatch {
    pub fn new(selection_before: Option<Range>) -> Self {
        Self {
            operations: Vec::new(),
            selection_before,
            description: None,
        }
    }

    /// Create a single-operation batch
    pub fn single(operation: Operation, selection_before: Option<Range>) -> Self {
        Self {
            operations: vec![operation],
            selection_before,
            description: None,
        }
    }

    /// Inverses in the order they must be applied to undo the batch
    pub fn inverse_operations(&self) -> Vec<Operation> {
        self.operations.iter().rev().map(Operation::inverse).collect()
    }
}

/// Undo/redo stack for document editing
#[derive(Debug, Clone)]
pub struct UndoStack {
    /// Stack of applied batches (most recent last)
    undo_stack: Vec<OperationBatch>,

    /// Stack of undone batches (most recent last)
    redo_stack: Vec<OperationBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    current_batch: Option<OperationBatch>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record an applied operation
    pub fn record(&mut self, operation: Operation, selection_before: Option<&Range>) {
        if let Some(batch) = &mut self.current_batch {
            batch.operations.push(operation);
        } else {
            let batch = OperationBatch::single(operation, selection_before.cloned());
            self.push_batch(batch);
        }
    }

    /// Start a batch of operations (will be undone/redone together)
    pub fn begin_batch(&mut self, selection_before: Option<Range>) {
        self.current_batch = Some(OperationBatch::new(selection_before));
    }

    /// End the current batch and push to undo stack
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.operations.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    pub fn in_batch(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    /// Number of operations recorded in the open batch
    pub(crate) fn current_len(&self) -> Option<usize> {
        self.current_batch.as_ref().map(|batch| batch.operations.len())
    }

    /// Drop operations recorded in the open batch past `len`
    pub(crate) fn truncate_current(&mut self, len: usize) {
        if let Some(batch) = &mut self.current_batch {
            batch.operations.truncate(len);
        }
    }

    /// Push a batch to the undo stack
    fn push_batch(&mut self, batch: OperationBatch) {
        self.push_undo(batch);

        // Clear redo stack (new action invalidates future)
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, batch: OperationBatch) {
        self.undo_stack.push(batch);

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
    }

    /// Take the most recent batch for undoing
    pub(crate) fn pop_undo(&mut self) -> Option<OperationBatch> {
        self.undo_stack.pop()
    }

    /// Take the most recently undone batch for redoing
    pub(crate) fn pop_redo(&mut self) -> Option<OperationBatch> {
        self.redo_stack.pop()
    }

    /// Put back a batch that has been redone (or whose undo failed)
    pub(crate) fn restore_undo(&mut self, batch: OperationBatch) {
        self.push_undo(batch);
    }

    /// Park a batch that has been undone (or whose redo failed)
    pub(crate) fn push_redo(&mut self, batch: OperationBatch) {
        self.redo_stack.push(batch);
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Batches available to undo, oldest first
    pub fn undos(&self) -> &[OperationBatch] {
        &self.undo_stack
    }

    /// Batches available to redo, oldest first
    pub fn redos(&self) -> &[OperationBatch] {
        &self.redo_stack
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_model::Path;

    fn insert(offset: usize, text: &str) -> Operation {
        Operation::InsertText {
            path: Path::from([0, 0]),
            offset,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_record_outside_batch_is_single_level() {
        let mut stack = UndoStack::new();
        stack.record(insert(0, "a"), None);
        stack.record(insert(1, "b"), None);
        assert_eq!(stack.undo_levels(), 2);
    }

    #[test]
    fn test_batched_operations() {
        let mut stack = UndoStack::new();

        stack.begin_batch(None);
        stack.set_batch_description("Type greeting");
        stack.record(insert(0, "Hi"), None);
        stack.record(insert(2, "!"), None);
        stack.end_batch();

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Type greeting"));

        let batch = stack.pop_undo().unwrap();
        assert_eq!(
            batch.inverse_operations(),
            vec![
                Operation::RemoveText {
                    path: Path::from([0, 0]),
                    offset: 2,
                    text: "!".into(),
                },
                Operation::RemoveText {
                    path: Path::from([0, 0]),
                    offset: 0,
                    text: "Hi".into(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        let mut stack = UndoStack::new();
        stack.begin_batch(None);
        stack.end_batch();
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_new_batch_clears_redo() {
        let mut stack = UndoStack::new();
        stack.record(insert(0, "a"), None);
        let batch = stack.pop_undo().unwrap();
        stack.push_redo(batch);
        assert_eq!(stack.redo_levels(), 1);

        stack.record(insert(0, "b"), None);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_restore_keeps_redo() {
        let mut stack = UndoStack::new();
        stack.record(insert(0, "a"), None);
        stack.record(insert(1, "b"), None);
        let second = stack.pop_undo().unwrap();
        let first = stack.pop_undo().unwrap();
        stack.push_redo(second);
        stack.push_redo(first);

        let first = stack.pop_redo().unwrap();
        stack.restore_undo(first);
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.redo_levels(), 1);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut stack = UndoStack::with_max_levels(2);
        for i in 0..3 {
            stack.record(insert(i, "x"), None);
        }
        assert_eq!(stack.undo_levels(), 2);
        assert_eq!(stack.undos()[0].operations, vec![insert(1, "x")]);
    }

    #[test]
    fn test_truncate_open_batch() {
        let mut stack = UndoStack::new();
        stack.begin_batch(None);
        stack.record(insert(0, "a"), None);
        let mark = stack.current_len().unwrap();
        stack.record(insert(1, "b"), None);
        stack.truncate_current(mark);
        stack.end_batch();
        assert_eq!(stack.undos()[0].operations, vec![insert(0, "a")]);
    }
}
