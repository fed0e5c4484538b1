//! The execution context: root set, mutators, and collector entry points.

use rustc_hash::FxHashMap;

use crate::error::{Result, RuntimeError};
use crate::gc::heap::Heap;
use crate::gc::major::MajorGc;
use crate::value::Value;

/// Variable identifier. Variable slots are the collector's root set.
pub type VarId = i64;

/// Function identifier. Function slots are opaque to the collector.
pub type FunId = i64;

/// Function reference stored in a function slot. The runtime only stores
/// it; execution belongs to the host interpreter.
pub type NativeFn = fn(&[Value]) -> Value;

/// A single-threaded TLC execution context.
///
/// Owns the variable and function maps, the heap, and all collector state.
/// Nothing here is thread-safe; an embedding that shares a context across
/// threads must serialize access externally.
#[derive(Default)]
pub struct Context {
    variables: FxHashMap<VarId, Value>,
    functions: FxHashMap<FunId, NativeFn>,
    heap: Heap,
    major: MajorGc,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    /// Store a value in a variable slot, dropping the reference held by the
    /// old content and taking one on the new. A previously undefined slot
    /// behaves as integer zero.
    pub fn assign(&mut self, id: VarId, value: Value) -> Result<()> {
        if value.is_handle() {
            self.heap.expect_handle(value)?;
        }
        let current = self.variables.get(&id).copied().unwrap_or(Value::ZERO);
        if let Some(old) = current.handle_id() {
            self.heap.decref(old);
        }
        if let Some(new) = value.handle_id() {
            self.heap.incref(new);
        }
        self.variables.insert(id, value);
        Ok(())
    }

    /// Remove a variable slot, dropping its reference if it held a handle.
    pub fn erase(&mut self, id: VarId) -> Result<()> {
        let Some(value) = self.variables.remove(&id) else {
            return Err(RuntimeError::UndefinedVariable(id));
        };
        if let Some(old) = value.handle_id() {
            self.heap.decref(old);
        }
        Ok(())
    }

    pub fn var_is_defined(&self, id: VarId) -> bool {
        self.variables.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    /// Define or redefine a function slot.
    pub fn define_function(&mut self, id: FunId, fun: NativeFn) {
        self.functions.insert(id, fun);
    }

    pub fn erase_function(&mut self, id: FunId) -> Result<()> {
        if self.functions.remove(&id).is_none() {
            return Err(RuntimeError::UndefinedFunction(id));
        }
        Ok(())
    }

    pub fn fun_is_defined(&self, id: FunId) -> bool {
        self.functions.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // Heap operations
    // -----------------------------------------------------------------------

    /// Allocate an array of `size` zero cells. The result is unrooted until
    /// assigned somewhere.
    pub fn alloc(&mut self, size: i64) -> Result<Value> {
        let value = self.heap.alloc(size)?;
        if self.major.in_progress() {
            if let Some(id) = value.handle_id() {
                self.major.note_allocation(id);
            }
        }
        Ok(value)
    }

    pub fn read(&self, array: Value, index: i64) -> Result<Value> {
        self.heap.read(array, index)
    }

    pub fn write(&mut self, array: Value, index: i64, value: Value) -> Result<()> {
        self.heap.write(array, index, value)
    }

    pub fn push(&mut self, array: Value, value: Value) -> Result<()> {
        self.heap.push(array, value)
    }

    pub fn pop(&mut self, array: Value) -> Result<Value> {
        self.heap.pop(array)
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    /// Sweep the reference-count candidate list. A no-op when the crate is
    /// built with the `no-minor-gc` feature.
    pub fn minor_gc(&mut self) {
        self.heap.minor_gc();
    }

    /// Run the major collector. `max_steps < 0` drives a full cycle in this
    /// call; `max_steps >= 0` bounds the mark work and may return with the
    /// cycle suspended, to be resumed by the next call.
    pub fn major_gc(&mut self, max_steps: i64) {
        self.major.run(&mut self.heap, &self.variables, max_steps);
    }

    /// A budgeted major-GC cycle is suspended and will resume on the next
    /// [`Context::major_gc`] call.
    pub fn major_gc_in_progress(&self) -> bool {
        self.major.in_progress()
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Read-only view of the heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Number of live heap objects.
    pub fn handle_count(&self) -> usize {
        self.heap.handle_count()
    }

    #[cfg(test)]
    pub(crate) fn variables(&self) -> &FxHashMap<VarId, Value> {
        &self.variables
    }
}
