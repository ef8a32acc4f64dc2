// File: src/builtins.rs
//
// Built-in native functions (spec.md §6 "Builtins"): `len` and
// `append`. Anything beyond these two is out of scope.

use crate::errors::HopeError;
use crate::value::{Builtin, Value};

fn len(args: &[Value]) -> Result<Value, HopeError> {
    match args {
        [Value::String(s)] => Ok(Value::Integer(s.len() as i64)),
        [Value::Array(elements)] => Ok(Value::Integer(elements.borrow().len() as i64)),
        [other] => Err(HopeError::illegal_operator("len", other.type_name())),
        _ => Err(HopeError::illegal_operator("len", "wrong number of arguments")),
    }
}

fn append(args: &[Value]) -> Result<Value, HopeError> {
    match args {
        [Value::Array(elements), value] => {
            elements.borrow_mut().push(value.clone());
            Ok(Value::Array(elements.clone()))
        }
        [other, _] => Err(HopeError::illegal_operator("append", other.type_name())),
        _ => Err(HopeError::illegal_operator("append", "wrong number of arguments")),
    }
}

/// The builtin table, in binding order. Each entry occupies the next
/// global slot before any user-level `Define` runs (§4.8).
pub fn table() -> Vec<Builtin> {
    vec![Builtin { name: "len", func: len }, Builtin { name: "append", func: append }]
}
