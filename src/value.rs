// File: src/value.rs
//
// Runtime value types (spec.md §3). Strings are immutable byte
// sequences (`Rc<str>`, cheap to clone); arrays are the one mutable
// aggregate and share storage through `Rc<RefCell<_>>` so `append`'s
// mutation is observable to every holder of the array.

use crate::errors::HopeError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type NativeFn = fn(&[Value]) -> Result<Value, HopeError>;

#[derive(Clone)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: u16,
    pub num_params: u8,
    /// Name this function was last bound to by `Define`, if any — used
    /// only for diagnostics (Frame unwinding, `Display`), never for
    /// dispatch.
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub func: NativeFn,
}

#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    CompiledFunction(Rc<CompiledFunction>),
    Builtin(Rc<Builtin>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Boolean(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::CompiledFunction(_) => "function",
            Value::Builtin(_) => "function",
        }
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Deep value equality (spec.md §4.3 "Hope"): arrays compare
/// element-wise rather than by shared-storage identity, and functions
/// are never considered equal to anything (including themselves) since
/// the language has no function-value comparison semantics.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, e) in elements.borrow().iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Value::CompiledFunction(func) => {
                write!(f, "func({} paras, {} locals)", func.num_params, func.num_locals)
            }
            Value::Builtin(b) => write!(f, "builtin function {}", b.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_compare_by_value_not_identity() {
        let a = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(a, b);
    }

    #[test]
    fn append_mutation_is_observable_through_shared_handle() {
        let arr = Value::array(vec![Value::Integer(1)]);
        let handle = arr.clone();
        if let Value::Array(cell) = &arr {
            cell.borrow_mut().push(Value::Integer(2));
        }
        assert_eq!(handle.to_string(), "[1, 2]");
    }

    #[test]
    fn display_matches_canonical_representation() {
        assert_eq!(Value::Integer(-5).to_string(), "-5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::Integer(2)]).to_string(),
            "[1, 2]"
        );
    }
}
