//! Undo/redo history scoped to a set of collections.

use log::{debug, warn};
use yrs::Doc;

use crate::collection::{Collection, SharedRef};
use crate::config::DocumentConfig;
use crate::error::DocError;

/// Local undo/redo over the collections it was created with.
///
/// Edits made within the capture timeout of each other collapse into one
/// step. Transactions without an origin are recorded until the first call to
/// [`track_origin`](Self::track_origin); from then on only tracked origins are.
pub struct UndoManager {
    inner: yrs::UndoManager,
    tracked: Vec<String>,
}

impl UndoManager {
    pub(crate) fn new(
        doc: &Doc,
        tracked: &[&dyn Collection],
        config: &DocumentConfig,
    ) -> Result<Self, DocError> {
        let (first, rest) = tracked.split_first().ok_or(DocError::EmptyUndoScope)?;
        let mut options = yrs::undo::Options::default();
        options.capture_timeout_millis = config.undo_capture_timeout_ms;
        let mut inner = match first.shared_ref() {
            SharedRef::Text(r) => yrs::UndoManager::with_scope_and_options(doc, &r, options),
            SharedRef::List(r) => yrs::UndoManager::with_scope_and_options(doc, &r, options),
            SharedRef::Map(r) => yrs::UndoManager::with_scope_and_options(doc, &r, options),
        };
        for collection in rest {
            match collection.shared_ref() {
                SharedRef::Text(r) => inner.expand_scope(&r),
                SharedRef::List(r) => inner.expand_scope(&r),
                SharedRef::Map(r) => inner.expand_scope(&r),
            }
        }
        let tracked: Vec<String> = tracked.iter().map(|c| c.name().to_owned()).collect();
        debug!("Undo manager tracking {:?}", tracked);
        Ok(Self { inner, tracked })
    }

    /// Names of the collections in scope.
    pub fn tracked(&self) -> &[String] {
        &self.tracked
    }

    /// Revert the latest step. Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.inner.try_undo() {
            Ok(changed) => changed,
            Err(e) => {
                warn!("Undo skipped: {}", e);
                false
            }
        }
    }

    /// Reapply the latest undone step. Returns `false` when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.inner.try_redo() {
            Ok(changed) => changed,
            Err(e) => {
                warn!("Redo skipped: {}", e);
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Close the current step so the next edit starts a new one,
    /// even inside the capture timeout.
    pub fn wrap(&mut self) {
        self.inner.reset();
    }

    /// Also record transactions carrying `origin`.
    pub fn track_origin(&mut self, origin: &str) {
        self.inner.include_origin(origin);
    }
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("tracked", &self.tracked)
            .field("can_undo", &self.can_undo())
            .field("can_redo", &self.can_redo())
            .finish()
    }
}
