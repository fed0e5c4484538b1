//! Handle table, reference counting, and the minor collector.
//!
//! The heap maps allocation ids to [`MemoryHandle`]s. Ids come from a
//! monotonically increasing counter and are never reused, so a handle value
//! stays a stable identifier for the whole process lifetime even though the
//! map may rehash and the backing storage may move.
//!
//! Reference counting is the cheap front end of the collector: whenever a
//! handle enters or leaves a reference slot the target's count moves by one,
//! and any count observed at or below zero puts the id on the candidate
//! list. [`Heap::minor_gc`] drains that list, re-reading each count before
//! deciding, so transient zero crossings (self-assignment, overwrite with
//! the same handle) are harmless. Members of a live cycle keep each other's
//! counts positive and are left for the major collector.
//!
//! Built with the `no-minor-gc` feature, every count stays at zero, the
//! candidate list is never fed, and `minor_gc` returns immediately; the
//! major collector becomes the sole reclaimer.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Result, RuntimeError};
use crate::value::{AllocId, Value};

/// Reachable in the current major-GC cycle. Remaining flag bits reserved.
const FLAG_MARKED: u32 = 1;

/// A heap object: a growable array of values plus collector bookkeeping.
#[derive(Debug)]
pub struct MemoryHandle {
    data: Vec<Value>,
    alloc_id: AllocId,
    ref_count: i32,
    flags: u32,
}

impl MemoryHandle {
    fn new(alloc_id: AllocId, size: usize) -> Self {
        Self {
            data: vec![Value::ZERO; size],
            alloc_id,
            ref_count: 0,
            flags: 0,
        }
    }

    pub fn alloc_id(&self) -> AllocId {
        self.alloc_id
    }

    /// Number of reference slots currently holding this handle. Signed: the
    /// sweep treats any count at or below zero as a reclaim candidate.
    pub fn ref_count(&self) -> i32 {
        self.ref_count
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The value stored at `index`. Panics if out of bounds; callers go
    /// through the bounds-checked heap operations.
    pub fn cell(&self, index: usize) -> Value {
        self.data[index]
    }

    /// Iterate the array contents in cell order.
    pub fn cells(&self) -> impl Iterator<Item = Value> + '_ {
        self.data.iter().copied()
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.flags & FLAG_MARKED != 0
    }

    pub(crate) fn set_marked(&mut self, marked: bool) {
        if marked {
            self.flags |= FLAG_MARKED;
        } else {
            self.flags &= !FLAG_MARKED;
        }
    }
}

/// The allocation table plus the minor collector's candidate list.
pub struct Heap {
    handles: FxHashMap<AllocId, MemoryHandle>,
    alloc_counter: AllocId,
    candidates: Vec<AllocId>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            handles: FxHashMap::default(),
            alloc_counter: 1,
            candidates: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Allocation and lookup
    // -----------------------------------------------------------------------

    /// Allocate an array of `size` zero cells and return its handle.
    ///
    /// The new object starts with a reference count of zero: it is not
    /// rooted until the caller stores the handle somewhere.
    pub fn alloc(&mut self, size: i64) -> Result<Value> {
        if size < 0 {
            return Err(RuntimeError::InvalidSize(size));
        }
        let id = self.alloc_counter;
        self.alloc_counter += 1;
        self.handles.insert(id, MemoryHandle::new(id, size as usize));
        log::trace!("alloc: id {id}, size {size}");
        Ok(Value::Handle(id))
    }

    pub fn get(&self, id: AllocId) -> Option<&MemoryHandle> {
        self.handles.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: AllocId) -> Option<&mut MemoryHandle> {
        self.handles.get_mut(&id)
    }

    pub fn contains(&self, id: AllocId) -> bool {
        self.handles.contains_key(&id)
    }

    /// Number of live heap objects.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Iterate the live heap objects in table order.
    pub fn objects(&self) -> impl Iterator<Item = &MemoryHandle> {
        self.handles.values()
    }

    /// Resolve a value to the id of a live heap object.
    pub(crate) fn expect_handle(&self, value: Value) -> Result<AllocId> {
        match value.handle_id() {
            Some(id) if self.handles.contains_key(&id) => Ok(id),
            _ => Err(RuntimeError::InvalidHandle),
        }
    }

    fn cell_index(index: i64, len: usize) -> Result<usize> {
        if index < 0 || index as usize >= len {
            return Err(RuntimeError::IndexOutOfBounds { index, len });
        }
        Ok(index as usize)
    }

    // -----------------------------------------------------------------------
    // Array operations
    // -----------------------------------------------------------------------

    /// Read a cell. The cell remains the owner of the value; no count moves.
    pub fn read(&self, array: Value, index: i64) -> Result<Value> {
        let id = self.expect_handle(array)?;
        let handle = &self.handles[&id];
        let idx = Self::cell_index(index, handle.len())?;
        Ok(handle.data[idx])
    }

    /// Overwrite a cell, dropping the old value's reference and taking one
    /// on the new value.
    pub fn write(&mut self, array: Value, index: i64, value: Value) -> Result<()> {
        let id = self.expect_handle(array)?;
        if value.is_handle() {
            self.expect_handle(value)?;
        }
        let idx = Self::cell_index(index, self.handles[&id].len())?;
        // Capture the outgoing cell before the overwrite; with the incref
        // below this keeps self-assignment balanced.
        let current = self.handles[&id].data[idx];
        if let Some(old) = current.handle_id() {
            self.decref(old);
        }
        if let Some(new) = value.handle_id() {
            self.incref(new);
        }
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.data[idx] = value;
        }
        Ok(())
    }

    /// Append a value to the array.
    pub fn push(&mut self, array: Value, value: Value) -> Result<()> {
        let id = self.expect_handle(array)?;
        if value.is_handle() {
            self.expect_handle(value)?;
        }
        if let Some(new) = value.handle_id() {
            self.incref(new);
        }
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.data.push(value);
        }
        Ok(())
    }

    /// Remove and return the last cell. The returned value carries no
    /// reference on behalf of the caller; keeping it alive means storing it
    /// in a reference slot.
    pub fn pop(&mut self, array: Value) -> Result<Value> {
        let id = self.expect_handle(array)?;
        let Some(&last) = self.handles[&id].data.last() else {
            return Err(RuntimeError::EmptyPop);
        };
        if let Some(old) = last.handle_id() {
            self.decref(old);
        }
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.data.pop();
        }
        Ok(last)
    }

    // -----------------------------------------------------------------------
    // Reference counting
    // -----------------------------------------------------------------------

    pub(crate) fn incref(&mut self, id: AllocId) {
        if cfg!(feature = "no-minor-gc") {
            return;
        }
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.ref_count += 1;
            log::trace!("incref: {id} -> {}", handle.ref_count);
        }
    }

    /// Drop one reference. A count observed at or below zero only nominates
    /// the id as a candidate; destruction is deferred to the next minor
    /// sweep, which re-reads the count.
    pub(crate) fn decref(&mut self, id: AllocId) {
        if cfg!(feature = "no-minor-gc") {
            return;
        }
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.ref_count -= 1;
            log::trace!("decref: {id} -> {}", handle.ref_count);
            if handle.ref_count <= 0 {
                self.candidates.push(id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Release and the minor collector
    // -----------------------------------------------------------------------

    /// Release a batch of doomed objects: filter, decouple all, then destroy
    /// all. Shared by both collectors.
    ///
    /// Decoupling every member before destroying any keeps the "target still
    /// exists" predicate well-defined against the pre-destroy snapshot, so
    /// cycles inside the batch settle their peers' counts before the first
    /// removal.
    pub(crate) fn release(&mut self, garbage: &[AllocId]) {
        // Filter ids a previous pass already reclaimed, and duplicates: the
        // candidate list may carry an id more than once, and decoupling it
        // twice would over-decrement its peers.
        let mut seen = FxHashSet::default();
        let doomed: Vec<AllocId> = garbage
            .iter()
            .copied()
            .filter(|id| self.handles.contains_key(id) && seen.insert(*id))
            .collect();

        for &id in &doomed {
            let out_edges: Vec<AllocId> = self.handles[&id]
                .cells()
                .filter_map(Value::handle_id)
                .collect();
            for target in out_edges {
                self.decref(target);
            }
        }

        for &id in &doomed {
            self.handles.remove(&id);
            log::trace!("release: destroyed {id}");
        }
    }

    /// Minor collection: sweep the candidate list against current counts.
    ///
    /// The list is snapshotted first; ids nominated by the decoupling
    /// decrefs inside this sweep land on the fresh list and are handled by
    /// the next call.
    pub fn minor_gc(&mut self) {
        if cfg!(feature = "no-minor-gc") {
            return;
        }
        let candidates = std::mem::take(&mut self.candidates);
        let garbage: Vec<AllocId> = candidates
            .iter()
            .copied()
            .filter(|id| self.handles.get(id).is_some_and(|h| h.ref_count <= 0))
            .collect();
        if !candidates.is_empty() {
            log::debug!(
                "minor gc: {} candidate(s), releasing {}",
                candidates.len(),
                garbage.len()
            );
        }
        self.release(&garbage);
    }

    // -----------------------------------------------------------------------
    // Major-collector support
    // -----------------------------------------------------------------------

    pub(crate) fn clear_marks(&mut self) {
        for handle in self.handles.values_mut() {
            handle.set_marked(false);
        }
    }

    pub(crate) fn unmarked_ids(&self) -> Vec<AllocId> {
        self.handles
            .values()
            .filter(|h| !h.is_marked())
            .map(MemoryHandle::alloc_id)
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn candidate_list(&self) -> &[AllocId] {
        &self.candidates
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
