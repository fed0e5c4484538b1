//! Tagged runtime values and the integer operator set.

use crate::error::{Result, RuntimeError};

/// Identifier of a heap allocation. Assigned once from a monotonically
/// increasing counter and never reused within a process lifetime.
pub type AllocId = u64;

/// A TLC runtime value: a signed 64-bit integer or a handle naming a heap
/// allocation.
///
/// Values are plain data. Copying one never touches reference counts;
/// counts change only when a handle enters or leaves a reference slot
/// (a variable slot or an array cell).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Handle(AllocId),
}

impl Value {
    /// Integer zero: the content of freshly allocated cells and of
    /// previously undefined variable slots.
    pub const ZERO: Value = Value::Integer(0);

    pub fn is_handle(self) -> bool {
        matches!(self, Value::Handle(_))
    }

    /// The allocation id, if this value is a handle.
    pub fn handle_id(self) -> Option<AllocId> {
        match self {
            Value::Handle(id) => Some(id),
            Value::Integer(_) => None,
        }
    }

    /// Reinterpret the payload as an integer, whatever the tag.
    pub fn to_integer(self) -> Value {
        match self {
            Value::Integer(v) => Value::Integer(v),
            Value::Handle(id) => Value::Integer(id as i64),
        }
    }

    fn int_pair(self, other: Value) -> Result<(i64, i64)> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok((a, b)),
            _ => Err(RuntimeError::TypeMismatch),
        }
    }

    fn int_operand(self) -> Result<i64> {
        match self {
            Value::Integer(v) => Ok(v),
            Value::Handle(_) => Err(RuntimeError::TypeMismatch),
        }
    }
}

/// Wrapping two's-complement arithmetic, defined only on integer operands.
macro_rules! int_arith {
    ($name:ident, $method:ident) => {
        pub fn $name(self, other: Value) -> Result<Value> {
            let (a, b) = self.int_pair(other)?;
            Ok(Value::Integer(a.$method(b)))
        }
    };
}

/// Bitwise operators, defined only on integer operands.
macro_rules! int_bitop {
    ($name:ident, $op:tt) => {
        pub fn $name(self, other: Value) -> Result<Value> {
            let (a, b) = self.int_pair(other)?;
            Ok(Value::Integer(a $op b))
        }
    };
}

/// Comparison and logical operators; the result is integer 0 or 1.
macro_rules! int_predicate {
    ($name:ident, |$a:ident, $b:ident| $test:expr) => {
        pub fn $name(self, other: Value) -> Result<Value> {
            let ($a, $b) = self.int_pair(other)?;
            Ok(Value::Integer(($test) as i64))
        }
    };
}

impl Value {
    int_arith!(add, wrapping_add);
    int_arith!(sub, wrapping_sub);
    int_arith!(mul, wrapping_mul);

    /// Integer division; division by zero (and the one unrepresentable
    /// quotient of two's-complement division) is an arithmetic fault.
    pub fn div(self, other: Value) -> Result<Value> {
        let (a, b) = self.int_pair(other)?;
        a.checked_div(b)
            .map(Value::Integer)
            .ok_or(RuntimeError::ArithmeticFault)
    }

    /// Integer remainder, with the same fault conditions as [`Value::div`].
    pub fn rem(self, other: Value) -> Result<Value> {
        let (a, b) = self.int_pair(other)?;
        a.checked_rem(b)
            .map(Value::Integer)
            .ok_or(RuntimeError::ArithmeticFault)
    }

    int_bitop!(bit_and, &);
    int_bitop!(bit_or, |);
    int_bitop!(bit_xor, ^);

    int_predicate!(logic_and, |a, b| a != 0 && b != 0);
    int_predicate!(logic_or, |a, b| a != 0 || b != 0);
    int_predicate!(lt, |a, b| a < b);
    int_predicate!(gt, |a, b| a > b);
    int_predicate!(le, |a, b| a <= b);
    int_predicate!(ge, |a, b| a >= b);
    int_predicate!(eq_val, |a, b| a == b);
    int_predicate!(ne_val, |a, b| a != b);

    /// Logical negation: nonzero becomes 0, zero becomes 1.
    pub fn logic_not(self) -> Result<Value> {
        let v = self.int_operand()?;
        Ok(Value::Integer((v == 0) as i64))
    }

    /// Bitwise complement.
    pub fn bit_not(self) -> Result<Value> {
        let v = self.int_operand()?;
        Ok(Value::Integer(!v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Value {
        Value::Integer(v)
    }

    #[test]
    fn arithmetic_on_integers() {
        assert_eq!(int(10).add(int(20)), Ok(int(30)));
        assert_eq!(int(5).mul(int(6)), Ok(int(30)));
        assert_eq!(int(7).sub(int(9)), Ok(int(-2)));
        assert_eq!(int(17).div(int(5)), Ok(int(3)));
        assert_eq!(int(17).rem(int(5)), Ok(int(2)));
    }

    #[test]
    fn comparisons_yield_zero_or_one() {
        assert_eq!(int(1).lt(int(2)), Ok(int(1)));
        assert_eq!(int(2).lt(int(1)), Ok(int(0)));
        assert_eq!(int(3).ge(int(3)), Ok(int(1)));
        assert_eq!(int(3).eq_val(int(3)), Ok(int(1)));
        assert_eq!(int(3).ne_val(int(3)), Ok(int(0)));
    }

    #[test]
    fn logical_operators() {
        assert_eq!(int(2).logic_and(int(-1)), Ok(int(1)));
        assert_eq!(int(2).logic_and(int(0)), Ok(int(0)));
        assert_eq!(int(0).logic_or(int(0)), Ok(int(0)));
        assert_eq!(int(0).logic_not(), Ok(int(1)));
        assert_eq!(int(5).logic_not(), Ok(int(0)));
        assert_eq!(int(0).bit_not(), Ok(int(-1)));
    }

    #[test]
    fn handle_operands_are_rejected() {
        let h = Value::Handle(1);
        assert_eq!(int(1).add(h), Err(RuntimeError::TypeMismatch));
        assert_eq!(h.add(int(1)), Err(RuntimeError::TypeMismatch));
        assert_eq!(h.logic_not(), Err(RuntimeError::TypeMismatch));
        assert_eq!(h.bit_not(), Err(RuntimeError::TypeMismatch));
    }

    #[test]
    fn division_faults() {
        assert_eq!(int(1).div(int(0)), Err(RuntimeError::ArithmeticFault));
        assert_eq!(int(1).rem(int(0)), Err(RuntimeError::ArithmeticFault));
        assert_eq!(
            int(i64::MIN).div(int(-1)),
            Err(RuntimeError::ArithmeticFault)
        );
    }

    #[test]
    fn payload_reinterpretation() {
        assert_eq!(Value::Handle(7).to_integer(), int(7));
        assert_eq!(int(7).to_integer(), int(7));
    }
}
