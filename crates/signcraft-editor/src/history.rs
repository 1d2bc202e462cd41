//! Undo/redo history.
//!
//! Every edit is recorded as a pair of full scene snapshots (before, after)
//! encoded as MessagePack. Undo restores `before`, redo restores `after`.
//!
//! Drag gestures use **snapshot batching**: the scene is captured when the
//! gesture starts and again when it ends, so the whole gesture is a single
//! undo step no matter how many moves it contained.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encode a snapshot. Uses named fields so `skip_serializing_if` on model
/// types stays decodable.
pub fn encode<T: Serialize>(state: &T) -> Option<Vec<u8>> {
    match rmp_serde::to_vec_named(state) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("history: failed to encode snapshot: {e}");
            None
        }
    }
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    match rmp_serde::from_slice(bytes) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!("history: failed to decode snapshot: {e}");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub before: Vec<u8>,
    pub after: Vec<u8>,
    pub description: String,
}

/// Bounded undo/redo stacks with batch grouping.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Checkpoint>,
    redo_stack: Vec<Checkpoint>,
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Scene captured when the outermost batch opened.
    batch_snapshot: Option<Vec<u8>>,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Open a batch. Only the outermost call captures `current`.
    pub fn begin_batch(&mut self, current: Vec<u8>) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(current);
        }
        self.batch_depth += 1;
    }

    /// Close a batch. When the outermost batch closes and the scene changed,
    /// one checkpoint is pushed.
    pub fn end_batch(&mut self, current: Vec<u8>, description: &str) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0
            && let Some(before) = self.batch_snapshot.take()
        {
            self.push(before, current, description);
        }
    }

    /// Record a completed edit. Inside a batch this is absorbed into the
    /// batch step.
    pub fn record(&mut self, before: Vec<u8>, after: Vec<u8>, description: &str) {
        if self.batch_depth > 0 {
            return;
        }
        self.push(before, after, description);
    }

    fn push(&mut self, before: Vec<u8>, after: Vec<u8>, description: &str) {
        if before == after {
            return;
        }
        self.undo_stack.push(Checkpoint {
            before,
            after,
            description: description.to_string(),
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // New action invalidates redo
        self.redo_stack.clear();
    }

    /// Pop the last step; returns the scene to restore.
    pub fn undo(&mut self) -> Option<&Checkpoint> {
        let cp = self.undo_stack.pop()?;
        self.redo_stack.push(cp);
        self.redo_stack.last()
    }

    /// Re-apply the last undone step; returns the scene to restore.
    pub fn redo(&mut self) -> Option<&Checkpoint> {
        let cp = self.redo_stack.pop()?;
        self.undo_stack.push(cp);
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }
}
