//! Incremental mark-and-sweep: the major collector.
//!
//! Reference counting cannot reclaim cycles, so the heap is periodically
//! traced from the variable root set and everything unreached is released.
//! The trace is resumable: a call with a finite step budget suspends inside
//! the mark phase and a later call picks up where it left off.
//!
//! # Phases
//!
//! ```text
//!          +---------------- cycle complete ----------------+
//!          v                                                |
//!        Idle --call--> ResetFlags --> SeedRoots --> Mark --> Finalize
//!                                                    ^  |
//!                                                    |  | budget hit
//!                                                    +--+ (state kept)
//! ```
//!
//! - **ResetFlags**: clear the mark bit on every object. Unbudgeted.
//! - **SeedRoots**: queue the target of every handle-valued variable.
//!   Unbudgeted.
//! - **Mark**: breadth-first waves over the frontier. One budget step is one
//!   array cell scanned; only targets not yet visited are queued for the
//!   next wave. Suspends mid-handle when the budget runs out, recording a
//!   cursor pair.
//! - **Finalize**: release every object left unmarked, then reset all
//!   traversal state. Unbudgeted; runs only once the mark is fully drained,
//!   so no budget-starved call ever destroys anything.
//!
//! # Interleaved mutation
//!
//! Mutators run between calls, never within one. Two rules keep objects
//! that appear mid-cycle alive without a write barrier:
//!
//! - every resuming call re-seeds the current root set into the next wave,
//!   catching handles assigned to variables since the last call;
//! - allocations made while a cycle is in flight are queued for scanning
//!   ("allocate gray", [`MajorGc::note_allocation`]), so whatever the
//!   mutator stores into them before the next call still reaches the scan.
//!
//! A minor sweep between calls may reclaim an id that is already queued;
//! the mark loop skips ids no longer present in the heap.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::VarId;
use crate::gc::heap::Heap;
use crate::value::{AllocId, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Idle,
    ResetFlags,
    SeedRoots,
    Mark,
    Finalize,
}

/// Mark-phase work budget. One unit is one array cell scanned; negative
/// means unlimited.
struct StepBudget {
    remaining: i64,
    unlimited: bool,
}

impl StepBudget {
    fn new(max_steps: i64) -> Self {
        Self {
            remaining: max_steps.max(0),
            unlimited: max_steps < 0,
        }
    }

    fn exhausted(&self) -> bool {
        !self.unlimited && self.remaining <= 0
    }

    fn spend(&mut self) {
        if !self.unlimited {
            self.remaining -= 1;
        }
    }
}

/// Traversal state of the major collector, persisted across calls.
///
/// The frontier is an ordered vector and the cursor a pair of indices into
/// it, so resuming mid-handle is O(1) instead of a linear skip over an
/// unordered set.
#[derive(Default)]
pub(crate) struct MajorGc {
    phase: Phase,
    visited: FxHashSet<AllocId>,
    frontier: Vec<AllocId>,
    next_frontier: FxHashSet<AllocId>,
    handle_cursor: usize,
    cell_cursor: usize,
}

impl MajorGc {
    /// Run one collector call. `max_steps < 0` drives a whole cycle to
    /// completion; otherwise the call resumes the persisted state and
    /// returns once the budget is spent or the cycle finishes.
    pub(crate) fn run(
        &mut self,
        heap: &mut Heap,
        roots: &FxHashMap<VarId, Value>,
        max_steps: i64,
    ) {
        let mut budget = StepBudget::new(max_steps);

        if self.phase == Phase::Mark {
            // Roots assigned since the last call must reach the scan even
            // though earlier waves are already drained.
            self.seed_roots(roots);
            log::debug!("major gc: resuming mark phase");
        }

        loop {
            match self.phase {
                Phase::Idle => {
                    self.phase = Phase::ResetFlags;
                }
                Phase::ResetFlags => {
                    heap.clear_marks();
                    self.reset_traversal();
                    self.phase = Phase::SeedRoots;
                }
                Phase::SeedRoots => {
                    self.seed_roots(roots);
                    log::debug!(
                        "major gc: seeded {} root target(s)",
                        self.next_frontier.len()
                    );
                    self.phase = Phase::Mark;
                }
                Phase::Mark => {
                    if !self.mark(heap, &mut budget) {
                        log::debug!(
                            "major gc: budget exhausted at handle {}/{}",
                            self.handle_cursor,
                            self.frontier.len()
                        );
                        return;
                    }
                    self.phase = Phase::Finalize;
                }
                Phase::Finalize => {
                    let garbage = heap.unmarked_ids();
                    log::debug!(
                        "major gc: sweeping {} unreachable object(s), {} marked",
                        garbage.len(),
                        self.visited.len()
                    );
                    heap.release(&garbage);
                    self.reset_traversal();
                    self.phase = Phase::Idle;
                    return;
                }
            }
        }
    }

    /// A cycle is in flight; state persists into the next call.
    pub(crate) fn in_progress(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Queue an object allocated while a cycle is in flight, keeping it and
    /// anything later stored into it ahead of the sweep.
    pub(crate) fn note_allocation(&mut self, id: AllocId) {
        if !self.visited.contains(&id) {
            self.next_frontier.insert(id);
        }
    }

    fn seed_roots(&mut self, roots: &FxHashMap<VarId, Value>) {
        for value in roots.values() {
            if let Some(id) = value.handle_id() {
                if !self.visited.contains(&id) {
                    self.next_frontier.insert(id);
                }
            }
        }
    }

    /// Scan frontier waves until drained or out of budget. Returns true
    /// when the mark phase is complete.
    fn mark(&mut self, heap: &mut Heap, budget: &mut StepBudget) -> bool {
        loop {
            if self.handle_cursor >= self.frontier.len() {
                if self.next_frontier.is_empty() {
                    return true;
                }
                // Next wave: everything queued becomes visited up front so
                // intra-wave edges are not re-queued.
                self.frontier.clear();
                self.frontier.extend(self.next_frontier.drain());
                self.visited.extend(self.frontier.iter().copied());
                self.handle_cursor = 0;
                self.cell_cursor = 0;
            }

            let id = self.frontier[self.handle_cursor];
            let Some(handle) = heap.get_mut(id) else {
                // Reclaimed by a minor sweep after being queued.
                self.handle_cursor += 1;
                self.cell_cursor = 0;
                continue;
            };
            handle.set_marked(true);

            while self.cell_cursor < handle.len() {
                if budget.exhausted() {
                    return false;
                }
                let cell = handle.cell(self.cell_cursor);
                self.cell_cursor += 1;
                budget.spend();
                if let Some(target) = cell.handle_id() {
                    if !self.visited.contains(&target) {
                        self.next_frontier.insert(target);
                    }
                }
            }

            self.handle_cursor += 1;
            self.cell_cursor = 0;
        }
    }

    fn reset_traversal(&mut self) {
        self.visited.clear();
        self.frontier.clear();
        self.next_frontier.clear();
        self.handle_cursor = 0;
        self.cell_cursor = 0;
    }
}
