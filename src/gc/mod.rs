//! The hybrid garbage collector.
//!
//! # Architecture
//!
//! Two collectors share one heap and divide the work by garbage shape:
//!
//! - **Reference counting ("minor GC")**: every store into a reference slot
//!   adjusts the target's count, so acyclic garbage is found at
//!   operation-local cost. Counts that reach zero only nominate candidates;
//!   [`Heap::minor_gc`] re-reads the counts and releases what is still
//!   dead. Deferral keeps slot mutation constant-time and avoids recursive
//!   destruction chains.
//!
//! - **Incremental mark-and-sweep ("major GC")**: traces the heap from the
//!   variable root set, under a caller-supplied step budget, and sweeps
//!   whatever the trace never reached. This is the only collector that
//!   reclaims cycles, and the only operation in the runtime that can return
//!   with work pending.
//!
//! The split is cooperative: minor sweeps may run between major-GC calls
//! without invalidating the suspended traversal, and major-GC releases
//! decouple their victims' out-edges so the counts stay honest for the next
//! minor sweep.

pub mod heap;
pub(crate) mod major;


pub use heap::{Heap, MemoryHandle};
