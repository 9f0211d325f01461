// File: src/value.rs
//
// The runtime value model. Arrays and maps are reference types
// (`Rc<RefCell<_>>`) so indexed assignment writes through the same
// allocation every binding of that value shares — the same pattern the
// rest of this codebase uses for captured closure environments.

use crate::code::Instructions;
use crate::errors::RuntimeError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Rc<str>),
    Null,
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<ValueMap>>),
    Slice(Rc<SliceValue>),
    CompiledFunction(Rc<CompiledFunction>),
    Builtin(Rc<BuiltinFn>),
    /// A method bound to a receiver, produced by `OpLoadMethod` and
    /// invoked by `OpCallMethod`.
    Method(Rc<MethodFn>),
    Error(Rc<str>),
}

/// Built by `OpMakeSlice`/`OpSlice`; each field is `Int` or `Null` (an
/// omitted component, e.g. the `::-1` in `xs[::-1]`).
pub struct SliceValue {
    pub start: Value,
    pub end: Value,
    pub step: Value,
}

pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: u16,
    pub num_parameters: u16,
    pub name: String,
}

pub struct BuiltinFn {
    pub name: &'static str,
    pub func: fn(&[Value]) -> Result<Value, RuntimeError>,
}

/// A method's implementation receives the receiver as the first argument
/// and returns `[possibly-mutated receiver, result]`, mirroring how
/// mutating array/string methods communicate both effects back to the VM.
pub struct MethodFn {
    pub name: &'static str,
    pub func: fn(&Value, &[Value]) -> Result<[Value; 2], RuntimeError>,
}

/// Key-value storage keyed by a computed hash rather than by the key's
/// own equality. Two keys that hash equal occupy the same slot: this is
/// a deliberate trade-off (see DESIGN.md), not an oversight.
#[derive(Default)]
pub struct ValueMap {
    pub store: HashMap<i64, (Value, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        ValueMap { store: HashMap::new() }
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        let hash = hash_value(&key);
        self.store.insert(hash, (key, value));
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.store.get(&hash_value(key)).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// DJBX33-style hash (`hash = hash*33 + byte`) over a string's bytes,
/// seeded at 5381 to match the Time33 algorithm this is ported from.
fn time33(s: &str) -> i64 {
    let mut hash: i64 = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as i64);
    }
    hash
}

/// Per-type offsets keep numerically-equal-but-differently-typed values
/// (the int `1`, the float `1.0`, the string `"1"`) from colliding in map
/// storage even though their inspect forms could otherwise coincide.
const INT_OFFSET: i64 = 193_460_240;
const FLOAT_OFFSET: i64 = 221_172_091;
const STRING_OFFSET: i64 = 1_374_591_964;
const BOOL_OFFSET: i64 = 1_732_606_053;

pub fn hash_value(value: &Value) -> i64 {
    match value {
        Value::Int(i) => i.wrapping_add(INT_OFFSET),
        Value::Float(f) => time33(&inspect(&Value::Float(*f))).wrapping_add(FLOAT_OFFSET),
        Value::Str(s) => time33(s).wrapping_add(STRING_OFFSET),
        Value::Bool(b) => time33(&b.to_string()).wrapping_add(BOOL_OFFSET),
        other => time33(&inspect(other)),
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Bool(_) => "bool",
        Value::Str(_) => "string",
        Value::Null => "none",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Slice(_) => "slice",
        Value::CompiledFunction(_) => "function",
        Value::Builtin(_) => "builtin",
        Value::Method(_) => "method",
        Value::Error(_) => "error",
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        _ => true,
    }
}

/// Renders a value the way it should appear in `print` output and map/
/// array display: strings unquoted at top level, quoted when nested
/// inside an array or map so the container's shape stays legible.
pub fn inspect(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{:.1}", f)
            } else {
                f.to_string()
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Str(s) => s.to_string(),
        Value::Null => "none".to_string(),
        Value::Array(elements) => {
            let inner: Vec<String> = elements.borrow().iter().map(inspect_nested).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Map(map) => {
            let inner: Vec<String> = map
                .borrow()
                .store
                .values()
                .map(|(k, v)| format!("{}: {}", inspect_nested(k), inspect_nested(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        Value::Slice(s) => format!("{}:{}:{}", inspect(&s.start), inspect(&s.end), inspect(&s.step)),
        Value::CompiledFunction(f) => format!("<function {}>", f.name),
        Value::Builtin(b) => format!("<builtin {}>", b.name),
        Value::Method(m) => format!("<method {}>", m.name),
        Value::Error(e) => format!("error: {}", e),
    }
}

fn inspect_nested(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{:?}", s.as_ref()),
        other => inspect(other),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", inspect(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_string_keys_use_different_offsets() {
        let int_hash = hash_value(&Value::Int(1));
        let str_hash = hash_value(&Value::Str("1".into()));
        assert_ne!(int_hash, str_hash);
    }

    #[test]
    fn truthiness_matches_expected_rules() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&Value::Bool(false)));
        assert!(!is_truthy(&Value::Int(0)));
        assert!(is_truthy(&Value::Int(1)));
        assert!(!is_truthy(&Value::Str("".into())));
        assert!(is_truthy(&Value::Str("x".into())));
    }

    #[test]
    fn inspect_quotes_strings_only_when_nested() {
        let top = Value::Str("hi".into());
        assert_eq!(inspect(&top), "hi");
        let arr = Value::Array(Rc::new(RefCell::new(vec![Value::Str("hi".into())])));
        assert_eq!(inspect(&arr), "[\"hi\"]");
    }

    #[test]
    fn map_insert_and_get_round_trip() {
        let mut map = ValueMap::new();
        map.insert(Value::Str("k".into()), Value::Int(42));
        match map.get(&Value::Str("k".into())) {
            Some(Value::Int(42)) => {}
            _ => panic!("expected stored value back"),
        }
    }
}
