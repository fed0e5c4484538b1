//! Memory-management core of the TLC runtime.
//!
//! TLC ("typeless caml") is a small dynamically-typed language. This crate
//! implements its execution context: named variables, named functions, and
//! a heap of variable-length arrays of tagged [`Value`]s. Arrays may hold
//! handles to other arrays, so heap graphs are arbitrary, cycles included.
//!
//! Storage is reclaimed by a hybrid collector:
//!
//! - a reference-counting front end reclaims acyclic garbage at
//!   operation-local cost ([`Context::minor_gc`]);
//! - an incremental mark-and-sweep back end reclaims cycles and bounds
//!   pause time via a caller-supplied step budget
//!   ([`Context::major_gc`]).
//!
//! Handles are allocation ids, never addresses: the heap may reorganize
//! freely without invalidating a handle, and a destroyed object's id is
//! never reissued.
//!
//! The whole context is single-threaded by construction; every operation
//! takes `&self` or `&mut self` and runs to completion, except a budgeted
//! [`Context::major_gc`] call, which may return with its cycle suspended.

pub mod context;
pub mod error;
pub mod gc;
pub mod value;

pub use context::{Context, FunId, NativeFn, VarId};
pub use error::{Result, RuntimeError};
pub use value::{AllocId, Value};
