//! Runtime error taxonomy.
//!
//! Every fallible context operation surfaces one of these kinds
//! synchronously. Mutators validate all preconditions before touching any
//! reference count, so an error return never leaves the context partially
//! mutated.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::context::{FunId, VarId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    /// Allocation requested with a negative size.
    InvalidSize(i64),
    /// Operand was not a handle, or its allocation id is not in the heap.
    InvalidHandle,
    /// Array access outside `[0, len)`.
    IndexOutOfBounds { index: i64, len: usize },
    /// Pop from an empty array.
    EmptyPop,
    /// Erase of a variable that has no slot.
    UndefinedVariable(VarId),
    /// Erase of a function id that has no definition.
    UndefinedFunction(FunId),
    /// Integer operator applied to a handle operand.
    TypeMismatch,
    /// Integer division or remainder the host cannot represent.
    ArithmeticFault,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize(size) => {
                write!(f, "size {size} is not allowed in allocation")
            }
            Self::InvalidHandle => write!(f, "invalid memory handle"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "invalid index {index} for array of length {len}")
            }
            Self::EmptyPop => write!(f, "cannot pop from empty array"),
            Self::UndefinedVariable(id) => {
                write!(f, "tried to erase undefined variable {id}")
            }
            Self::UndefinedFunction(id) => {
                write!(f, "tried to erase undefined function {id}")
            }
            Self::TypeMismatch => {
                write!(f, "incompatible types of operation operands")
            }
            Self::ArithmeticFault => write!(f, "integer arithmetic fault"),
        }
    }
}

impl Error for RuntimeError {}

pub type Result<T> = std::result::Result<T, RuntimeError>;
