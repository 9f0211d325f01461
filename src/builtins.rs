// File: src/builtins.rs
//
// Free functions (print/len/type/int/float) and the per-type method
// tables (Array: append/pop/reverse/index; String: split/upper/lower).
// Grounded in original_source/object/{arrayobject,stringobject,methods}.go:
// a method receives the receiver plus its argument list and returns
// `[new_receiver, return_value]`, matching `value::MethodFn`'s signature.

use crate::errors::RuntimeError;
use crate::symbol_table::SymbolTable;
use crate::value::{hash_value, inspect, type_name, BuiltinFn, MethodFn, Value};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::rc::Rc;

pub struct BuiltinDef {
    pub name: &'static str,
    pub func: fn(&[Value]) -> Result<Value, RuntimeError>,
}

/// Order fixes the external builtin-table index `OpGetBuiltin` addresses;
/// never reorder without also updating any already-compiled bytecode
/// (there is none persisted across runs, but keep the order stable
/// within one process).
pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef { name: "print", func: builtin_print },
    BuiltinDef { name: "len", func: builtin_len },
    BuiltinDef { name: "type", func: builtin_type },
    BuiltinDef { name: "int", func: builtin_int },
    BuiltinDef { name: "float", func: builtin_float },
];

/// Defines every builtin into `table` at the external index matching its
/// position in `BUILTINS`, so `OpGetBuiltin <index>` and this list always
/// agree.
pub fn register(table: &SymbolTable) {
    for (i, b) in BUILTINS.iter().enumerate() {
        table.borrow_mut().define_builtin(i as u16, b.name);
    }
}

/// `Rc`-wrapped builtins in the same order as `BUILTINS`, for the VM to
/// push as `Value::Builtin` by index.
pub static BUILTIN_VALUES: Lazy<Vec<Rc<BuiltinFn>>> = Lazy::new(|| {
    BUILTINS
        .iter()
        .map(|b| Rc::new(BuiltinFn { name: b.name, func: b.func }))
        .collect()
});

fn builtin_print(args: &[Value]) -> Result<Value, RuntimeError> {
    let rendered: Vec<String> = args.iter().map(inspect).collect();
    println!("{}", rendered.join(" "));
    Ok(Value::Null)
}

fn builtin_len(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::wrong_arg_count(1, args.len()));
    }
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::Array(a) => a.borrow().len(),
        Value::Map(m) => m.borrow().len(),
        other => return Err(RuntimeError::new(format!("object of type '{}' has no len()", type_name(other)))),
    };
    Ok(Value::Int(n as i64))
}

fn builtin_type(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::wrong_arg_count(1, args.len()));
    }
    Ok(Value::Str(format!("<class '{}'>", type_name(&args[0])).into()))
}

fn builtin_int(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::wrong_arg_count(1, args.len()));
    }
    let v = match &args[0] {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        Value::Bool(b) => *b as i64,
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RuntimeError::new(format!("invalid literal for int(): '{}'", s)))?,
        other => return Err(RuntimeError::new(format!("cannot convert '{}' to int", type_name(other)))),
    };
    Ok(Value::Int(v))
}

fn builtin_float(args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::wrong_arg_count(1, args.len()));
    }
    let v = match &args[0] {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RuntimeError::new(format!("invalid literal for float(): '{}'", s)))?,
        other => return Err(RuntimeError::new(format!("cannot convert '{}' to float", type_name(other)))),
    };
    Ok(Value::Float(v))
}

/// Method names this language recognizes at all, regardless of receiver
/// type — checked at parse time so `x.frobnicate()` is a compile error,
/// not a runtime surprise on every type it's tried against.
const KNOWN_METHODS: &[&str] = &["append", "pop", "reverse", "index", "split", "upper", "lower"];

pub fn is_known_method(name: &str) -> bool {
    KNOWN_METHODS.contains(&name)
}

pub static ARRAY_METHODS: Lazy<Vec<(&'static str, Rc<MethodFn>)>> = Lazy::new(|| {
    vec![
        ("append", Rc::new(MethodFn { name: "append", func: array_append })),
        ("pop", Rc::new(MethodFn { name: "pop", func: array_pop })),
        ("reverse", Rc::new(MethodFn { name: "reverse", func: array_reverse })),
        ("index", Rc::new(MethodFn { name: "index", func: array_index })),
    ]
});

pub static STRING_METHODS: Lazy<Vec<(&'static str, Rc<MethodFn>)>> = Lazy::new(|| {
    vec![
        ("split", Rc::new(MethodFn { name: "split", func: string_split })),
        ("upper", Rc::new(MethodFn { name: "upper", func: string_upper })),
        ("lower", Rc::new(MethodFn { name: "lower", func: string_lower })),
    ]
});

/// Looks up `name` in the method table for `receiver`'s runtime type.
pub fn find_method(receiver: &Value, name: &str) -> Option<Rc<MethodFn>> {
    let table: &[(&str, Rc<MethodFn>)] = match receiver {
        Value::Array(_) => &ARRAY_METHODS,
        Value::Str(_) => &STRING_METHODS,
        _ => return None,
    };
    table.iter().find(|(n, _)| *n == name).map(|(_, m)| Rc::clone(m))
}

/// Method names valid for `receiver`'s runtime type, used only for
/// "did you mean?" runtime error suggestions.
pub fn method_names_for(receiver: &Value) -> Vec<&'static str> {
    let table: &[(&str, Rc<MethodFn>)] = match receiver {
        Value::Array(_) => &ARRAY_METHODS,
        Value::Str(_) => &STRING_METHODS,
        _ => return Vec::new(),
    };
    table.iter().map(|(n, _)| *n).collect()
}

fn array_append(receiver: &Value, args: &[Value]) -> Result<[Value; 2], RuntimeError> {
    let Value::Array(a) = receiver else {
        return Err(RuntimeError::new("append is only defined on array"));
    };
    a.borrow_mut().extend_from_slice(args);
    Ok([receiver.clone(), Value::Null])
}

fn array_pop(receiver: &Value, _args: &[Value]) -> Result<[Value; 2], RuntimeError> {
    let Value::Array(a) = receiver else {
        return Err(RuntimeError::new("pop is only defined on array"));
    };
    let popped = a.borrow_mut().pop();
    match popped {
        Some(v) => Ok([receiver.clone(), v]),
        None => Ok([receiver.clone(), Value::Error("index out of range: array is empty".into())]),
    }
}

fn array_reverse(receiver: &Value, _args: &[Value]) -> Result<[Value; 2], RuntimeError> {
    let Value::Array(a) = receiver else {
        return Err(RuntimeError::new("reverse is only defined on array"));
    };
    a.borrow_mut().reverse();
    Ok([receiver.clone(), Value::Null])
}

fn array_index(receiver: &Value, args: &[Value]) -> Result<[Value; 2], RuntimeError> {
    let Value::Array(a) = receiver else {
        return Err(RuntimeError::new("index is only defined on array"));
    };
    if args.len() != 1 {
        return Err(RuntimeError::wrong_arg_count(1, args.len()));
    }
    let target_hash = hash_value(&args[0]);
    let found = a.borrow().iter().position(|v| hash_value(v) == target_hash);
    let idx = found.map(|i| i as i64).unwrap_or(-1);
    Ok([receiver.clone(), Value::Int(idx)])
}

fn string_split(receiver: &Value, args: &[Value]) -> Result<[Value; 2], RuntimeError> {
    let Value::Str(s) = receiver else {
        return Err(RuntimeError::new("split is only defined on string"));
    };
    if args.len() != 1 {
        return Err(RuntimeError::wrong_arg_count(1, args.len()));
    }
    let Value::Str(sep) = &args[0] else {
        return Err(RuntimeError::unsupported_types("split", "string", type_name(&args[0])));
    };
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::Str(c.to_string().into())).collect()
    } else {
        s.split(sep.as_ref()).map(|p| Value::Str(p.into())).collect()
    };
    Ok([receiver.clone(), Value::Array(Rc::new(RefCell::new(parts)))])
}

fn string_upper(receiver: &Value, _args: &[Value]) -> Result<[Value; 2], RuntimeError> {
    let Value::Str(s) = receiver else {
        return Err(RuntimeError::new("upper is only defined on string"));
    };
    let upper = Value::Str(s.to_uppercase().into());
    Ok([upper.clone(), upper])
}

fn string_lower(receiver: &Value, _args: &[Value]) -> Result<[Value; 2], RuntimeError> {
    let Value::Str(s) = receiver else {
        return Err(RuntimeError::new("lower is only defined on string"));
    };
    let lower = Value::Str(s.to_lowercase().into());
    Ok([lower.clone(), lower])
}
