//! # Document
//!
//! The stateful half of the editor. A [`Document`] owns the current tree,
//! the selection, every live reference, the dirty set, the undo history and
//! the operation log, and is the only place operations are applied.
//!
//! ## Lifecycle of an edit
//!
//! ```text
//! apply(op)
//!   ↓ validate + copy-on-write surgery     (rejected → state untouched)
//!   ↓ re-project selection and references
//!   ↓ mark dirty paths, record history, log
//!   ↓ outermost scope closes
//! normalize  →  repairs are applied the same way until nothing is dirty
//! ```
//!
//! Edits made inside [`Document::without_normalizing`] share one scope: the
//! tree may be invalid in between and is normalized once when the outermost
//! scope closes. The scope is closed by a drop guard, so early returns and
//! panics inside the closure cannot leave normalization suspended.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use quire_model::{
    Affinity, Element, Node, Nodes, NodesOptions, Operation, Path, Point, Range, RangeAffinity,
    SelectionProps,
};
use tracing::{debug, instrument, warn};

use crate::apply::{apply_to_tree, transform_selection};
use crate::config::DocumentConfig;
use crate::dirty::DirtySet;
use crate::errors::{EditorError, EditorResult, InvalidOperation, NormalizeError};
use crate::normalize::{check_node, Rules};
use crate::refs::{PathRef, PointRef, RangeRef, RefOptions, RefRegistry};
use crate::schema::{NodeValidator, Schema};
use crate::undo_stack::UndoStack;

type ErrorHandler = Box<dyn FnMut(&NormalizeError)>;

/// Editable structured document
pub struct Document {
    root: Arc<Node>,
    selection: Option<Range>,
    refs: RefRegistry,
    dirty: DirtySet,
    schema: Schema,
    config: DocumentConfig,
    validators: Vec<Box<dyn NodeValidator>>,
    history: UndoStack,

    /// Every applied operation, in order (when enabled by config)
    operations: Vec<Operation>,

    on_error: Option<ErrorHandler>,

    /// Incremented on each applied operation
    version: u64,

    /// Open `without_normalizing` scopes
    scope_depth: usize,

    /// Inside the normalization loop
    normalizing: bool,

    /// Replaying history; nothing is recorded
    replaying: bool,
}

/// State needed to roll back a sequence of operations
struct Checkpoint {
    root: Arc<Node>,
    selection: Option<Range>,
    refs: RefRegistry,
    dirty: DirtySet,
    operations: usize,
    version: u64,
    history: Option<usize>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self::with_config(root, DocumentConfig::default())
    }

    pub fn with_config(root: Element, config: DocumentConfig) -> Self {
        Self {
            root: Arc::new(Node::Element(root)),
            selection: None,
            refs: RefRegistry::new(),
            dirty: DirtySet::new(),
            schema: Schema::new(),
            history: UndoStack::with_max_levels(config.max_undo_levels),
            config,
            validators: Vec::new(),
            operations: Vec::new(),
            on_error: None,
            version: 0,
            scope_depth: 0,
            normalizing: false,
            replaying: false,
        }
    }

    /// Create a document from the JSON form of its root element
    pub fn from_json(source: &str) -> EditorResult<Self> {
        let root: Element = serde_json::from_str(source).map_err(EditorError::Document)?;
        Ok(Self::new(root))
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_validator(mut self, validator: impl NodeValidator + 'static) -> Self {
        self.add_validator(Box::new(validator));
        self
    }

    pub fn add_validator(&mut self, validator: Box<dyn NodeValidator>) {
        self.validators.push(validator);
    }

    pub fn set_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    /// Receive normalization diagnostics
    pub fn on_error(&mut self, handler: impl FnMut(&NormalizeError) + 'static) {
        self.on_error = Some(Box::new(handler));
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The current tree. Later edits never change a snapshot.
    pub fn snapshot(&self) -> Arc<Node> {
        Arc::clone(&self.root)
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Drain the operation log
    pub fn take_operations(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Paths waiting to be normalized, oldest first
    pub fn dirty_paths(&self) -> &[Path] {
        self.dirty.paths()
    }

    /// Inside a `without_normalizing` scope
    pub fn normalization_suspended(&self) -> bool {
        self.scope_depth > 0
    }

    /// Walk the tree. Unless `voids` is set, void elements are yielded but
    /// their content is skipped.
    pub fn nodes<'a>(&'a self, mut options: NodesOptions<'a>, voids: bool) -> Nodes<'a> {
        if !voids {
            let schema = &self.schema;
            let pass = options.pass.take();
            options = options.pass(move |node, path| {
                schema.is_void(node) || pass.as_ref().is_some_and(|pass| pass(node, path))
            });
        }
        self.root.nodes(options)
    }

    // ------------------------------------------------------------------
    // Applying operations
    // ------------------------------------------------------------------

    /// Apply one operation, then normalize (unless suspended)
    #[instrument(skip(self, op), fields(op = op.kind(), path = ?op.path()))]
    pub fn apply(&mut self, op: Operation) -> EditorResult<()> {
        let mut scope = Scope::open(self);
        scope.apply_operation(op).map_err(|error| {
            warn!(%error, "rejected operation");
            EditorError::from(error)
        })
    }

    /// Apply operations as a unit. If one is rejected, the ones before it
    /// are rolled back and the error carries its index.
    #[instrument(skip(self, ops), fields(count = ops.len()))]
    pub fn apply_batch(&mut self, ops: Vec<Operation>) -> EditorResult<()> {
        let mut scope = Scope::open(self);
        scope.apply_atomic(ops).map_err(|(index, source)| {
            warn!(index, error = %source, "rejected batch");
            EditorError::Batch { index, source }
        })
    }

    /// Run `f` with normalization deferred until the outermost scope closes.
    /// Everything applied inside is one undo step.
    pub fn without_normalizing<R>(&mut self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut scope = Scope::open(self);
        f(&mut *scope)
    }

    /// Like [`Document::without_normalizing`], and names the undo step the
    /// scope records. Nested inside another scope it names the enclosing
    /// step.
    pub fn labelled<R>(
        &mut self,
        description: impl Into<String>,
        f: impl FnOnce(&mut Document) -> R,
    ) -> R {
        let mut scope = Scope::open(self);
        scope.history.set_batch_description(description);
        f(&mut *scope)
    }

    fn apply_operation(&mut self, op: Operation) -> Result<(), InvalidOperation> {
        let mut root = Arc::clone(&self.root);
        apply_to_tree(&mut root, &op)?;
        let selection = transform_selection(self.selection.as_ref(), &op, &root)?;

        let selection_before = std::mem::replace(&mut self.selection, selection);
        self.root = root;
        self.refs.transform(&op, &self.root);
        self.dirty.apply(&op);
        self.version += 1;
        debug!(op = op.kind(), version = self.version, "applied");

        if self.config.history && !self.replaying && !op.is_selection_operation() {
            self.history.record(op.clone(), selection_before.as_ref());
        }
        if self.config.record_operations {
            self.operations.push(op);
        }
        Ok(())
    }

    /// Apply `ops` in order; on the first rejection restore the state from
    /// before the first one
    fn apply_atomic(&mut self, ops: Vec<Operation>) -> Result<(), (usize, InvalidOperation)> {
        let checkpoint = (ops.len() > 1).then(|| self.checkpoint());

        for (index, op) in ops.into_iter().enumerate() {
            if let Err(error) = self.apply_operation(op) {
                if let Some(checkpoint) = checkpoint {
                    self.restore(checkpoint);
                }
                return Err((index, error));
            }
        }
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            root: Arc::clone(&self.root),
            selection: self.selection.clone(),
            refs: self.refs.clone(),
            dirty: self.dirty.clone(),
            operations: self.operations.len(),
            version: self.version,
            history: self.history.current_len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.root = checkpoint.root;
        self.selection = checkpoint.selection;
        self.refs = checkpoint.refs;
        self.dirty = checkpoint.dirty;
        self.operations.truncate(checkpoint.operations);
        self.version = checkpoint.version;
        if let Some(len) = checkpoint.history {
            self.history.truncate_current(len);
        }
    }

    fn begin_scope(&mut self) {
        if self.scope_depth == 0 && self.config.history && !self.replaying {
            self.history.begin_batch(self.selection.clone());
        }
        self.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.scope_depth = self.scope_depth.saturating_sub(1);
        if self.scope_depth > 0 {
            return;
        }
        if !std::thread::panicking() {
            self.run_normalizer();
        }
        if self.config.history && !self.replaying {
            self.history.end_batch();
        }
    }

    // ------------------------------------------------------------------
    // Normalization
    // ------------------------------------------------------------------

    /// Normalize every dirty path now. Inside a `without_normalizing` scope
    /// this waits for the scope to close.
    pub fn normalize(&mut self) {
        drop(Scope::open(self));
    }

    /// Mark the whole tree dirty and normalize it
    pub fn normalize_force(&mut self) {
        self.dirty.mark_all(&self.root);
        self.normalize();
    }

    #[instrument(skip(self), fields(dirty = self.dirty.len()))]
    fn run_normalizer(&mut self) {
        if self.normalizing || self.dirty.is_empty() {
            return;
        }
        self.normalizing = true;

        let limit = self.dirty.len().max(1) * self.config.normalize_iteration_factor.max(1);
        let mut iterations = 0;

        while let Some(path) = self.dirty.pop() {
            if iterations >= limit {
                let remaining = self.dirty.len() + 1;
                self.dirty.clear();
                self.report(NormalizeError::IterationLimit {
                    iterations,
                    remaining,
                });
                break;
            }
            iterations += 1;

            let rules = Rules {
                schema: &self.schema,
                config: &self.config,
                validators: &self.validators,
            };
            let Some(repair) = check_node(&self.root, &path, &rules) else {
                continue;
            };

            debug!(rule = repair.rule, %path, ops = repair.operations.len(), "repairing");
            self.report(NormalizeError::StructuralViolation {
                rule: repair.rule,
                path: path.clone(),
                repair: repair.operations.clone(),
            });
            if let Err((_, source)) = self.apply_atomic(repair.operations) {
                self.report(NormalizeError::RepairRejected {
                    rule: repair.rule,
                    path,
                    source,
                });
            }
        }

        self.normalizing = false;
    }

    fn report(&mut self, error: NormalizeError) {
        match &error {
            NormalizeError::StructuralViolation { .. } => debug!(%error, "normalized"),
            _ => warn!(%error, "normalization failed"),
        }
        if let Some(handler) = self.on_error.as_mut() {
            handler(&error);
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select(&mut self, range: Range) -> EditorResult<()> {
        self.set_selection(Some(range))
    }

    pub fn deselect(&mut self) -> EditorResult<()> {
        self.set_selection(None)
    }

    fn set_selection(&mut self, target: Option<Range>) -> EditorResult<()> {
        match self.selection_operation(target) {
            Some(op) => self.apply(op),
            None => Ok(()),
        }
    }

    fn selection_operation(&self, target: Option<Range>) -> Option<Operation> {
        if self.selection == target {
            return None;
        }
        let props = |range: &Range| SelectionProps::new(range.anchor.clone(), range.focus.clone());
        Some(Operation::SetSelection {
            properties: self.selection.as_ref().map(props),
            new_properties: target.as_ref().map(props),
        })
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Revert the most recent undo step. Returns `false` when there is none.
    #[instrument(skip(self), fields(levels = self.history.undo_levels()))]
    pub fn undo(&mut self) -> EditorResult<bool> {
        let open = self.close_open_batch();
        let result = self.undo_step();
        self.reopen_batch(open);
        result
    }

    fn undo_step(&mut self) -> EditorResult<bool> {
        let Some(batch) = self.history.pop_undo() else {
            return Ok(false);
        };

        let ops = batch.inverse_operations();
        match self.replay(ops, batch.selection_before.clone(), false) {
            Ok(()) => {
                self.history.push_redo(batch);
                Ok(true)
            }
            Err(error) => {
                self.history.restore_undo(batch);
                Err(error)
            }
        }
    }

    /// Re-apply the most recently undone step. Returns `false` when there
    /// is none.
    #[instrument(skip(self), fields(levels = self.history.redo_levels()))]
    pub fn redo(&mut self) -> EditorResult<bool> {
        let open = self.close_open_batch();
        let result = self.redo_step();
        self.reopen_batch(open);
        result
    }

    fn redo_step(&mut self) -> EditorResult<bool> {
        let Some(batch) = self.history.pop_redo() else {
            return Ok(false);
        };

        let ops = batch.operations.clone();
        match self.replay(ops, batch.selection_before.clone(), true) {
            Ok(()) => {
                self.history.restore_undo(batch);
                Ok(true)
            }
            Err(error) => {
                self.history.push_redo(batch);
                Err(error)
            }
        }
    }

    /// Inside a scope, the operations recorded so far become their own undo
    /// step so that undo and redo see them. Returns whether a batch was open.
    fn close_open_batch(&mut self) -> bool {
        let open = self.history.in_batch();
        if open {
            self.history.end_batch();
        }
        open
    }

    fn reopen_batch(&mut self, open: bool) {
        if open {
            self.history.begin_batch(self.selection.clone());
        }
    }

    /// Apply history operations without recording them. `selection` is
    /// restored before the operations when `select_first` is set, after
    /// them otherwise. All or nothing.
    fn replay(
        &mut self,
        ops: Vec<Operation>,
        selection: Option<Range>,
        select_first: bool,
    ) -> EditorResult<()> {
        self.replaying = true;
        let result = self.without_normalizing(|doc| {
            let checkpoint = doc.checkpoint();
            let result = doc.replay_steps(ops, selection, select_first);
            if result.is_err() {
                doc.restore(checkpoint);
            }
            result
        });
        self.replaying = false;

        if let Err(error) = &result {
            warn!(%error, "history replay rejected");
        }
        result
    }

    fn replay_steps(
        &mut self,
        ops: Vec<Operation>,
        selection: Option<Range>,
        select_first: bool,
    ) -> EditorResult<()> {
        if select_first {
            self.restore_selection(selection.clone())?;
        }
        self.apply_atomic(ops)
            .map_err(|(index, source)| EditorError::Batch { index, source })?;
        if !select_first {
            self.restore_selection(selection)?;
        }
        Ok(())
    }

    fn restore_selection(&mut self, target: Option<Range>) -> Result<(), InvalidOperation> {
        match self.selection_operation(target) {
            Some(op) => self.apply_operation(op),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------

    pub fn path_ref(&mut self, path: Path, options: RefOptions<Affinity>) -> PathRef {
        self.refs.insert_path(path, options)
    }

    pub fn point_ref(&mut self, point: Point, options: RefOptions<Affinity>) -> PointRef {
        self.refs.insert_point(point, options)
    }

    pub fn range_ref(&mut self, range: Range, options: RefOptions<RangeAffinity>) -> RangeRef {
        self.refs.insert_range(range, options)
    }

    pub fn path_ref_current(&self, r: PathRef) -> Option<Path> {
        self.refs.path(r).cloned()
    }

    pub fn point_ref_current(&self, r: PointRef) -> Option<Point> {
        self.refs.point(r).cloned()
    }

    pub fn range_ref_current(&self, r: RangeRef) -> Option<Range> {
        self.refs.range(r).cloned()
    }

    /// Current path, or `UnreachableReference` once it has been deleted
    pub fn resolve_path(&self, r: PathRef) -> EditorResult<Path> {
        self.path_ref_current(r)
            .ok_or(EditorError::UnreachableReference(r.id()))
    }

    pub fn resolve_point(&self, r: PointRef) -> EditorResult<Point> {
        self.point_ref_current(r)
            .ok_or(EditorError::UnreachableReference(r.id()))
    }

    pub fn resolve_range(&self, r: RangeRef) -> EditorResult<Range> {
        self.range_ref_current(r)
            .ok_or(EditorError::UnreachableReference(r.id()))
    }

    /// Stop tracking a reference and return its final value
    pub fn release_path(&mut self, r: PathRef) -> Option<Path> {
        self.refs.release_path(r)
    }

    pub fn release_point(&mut self, r: PointRef) -> Option<Point> {
        self.refs.release_point(r)
    }

    pub fn release_range(&mut self, r: RangeRef) -> Option<Range> {
        self.refs.release_range(r)
    }

    /// Every live reference
    pub fn refs(&self) -> &RefRegistry {
        &self.refs
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("selection", &self.selection)
            .field("version", &self.version)
            .field("refs", &self.refs.len())
            .field("dirty", &self.dirty.len())
            .field("validators", &self.validators)
            .field("history", &self.history.undo_levels())
            .finish_non_exhaustive()
    }
}

/// Open `without_normalizing` scope; closing it (on drop) normalizes when it
/// is the outermost one
struct Scope<'a> {
    doc: &'a mut Document,
}

impl<'a> Scope<'a> {
    fn open(doc: &'a mut Document) -> Self {
        doc.begin_scope();
        Self { doc }
    }
}

impl Deref for Scope<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.doc
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.doc
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.doc.end_scope();
    }
}
