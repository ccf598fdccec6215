//! Builtin global functions
//!
//! - `error(value)`: raise `value`
//! - `assert(value, message?)`: raise unless `value` is truthy
//! - `type(value)`: type name
//! - `tostring(value)`: textual form
//! - `pcall(f, ...)`: protected call returning a status flag and results
//! - `select(n | "#", ...)`: argument selection
//! - `rawequal(a, b)`, `rawlen(t)`
//!
//! `traceback` is not a global; it is the message handler the binding layer
//! installs for every call.

use tether_sdk::{Machine, Results};

use crate::engine::Engine;
use crate::error::Raised;
use crate::value::Value;

type Builtin = fn(&Engine) -> Result<usize, Raised>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("error", error),
    ("assert", assert),
    ("type", type_name),
    ("tostring", tostring),
    ("pcall", pcall),
    ("select", select),
    ("rawequal", rawequal),
    ("rawlen", rawlen),
];

/// Bind every builtin into the engine's global table
pub(crate) fn install(engine: &Engine) {
    for (name, func) in BUILTINS {
        engine.register(name, *func);
    }
}

fn arg_error(position: usize, function: &str, message: &str) -> Raised {
    Raised::from(format!(
        "bad argument #{} to '{}' ({})",
        position, function, message
    ))
}

fn check_any(engine: &Engine, position: usize, function: &str) -> Result<Value, Raised> {
    if engine.arg_count() < position {
        return Err(arg_error(position, function, "value expected"));
    }
    Ok(engine.value_at(position as i32))
}

fn error(engine: &Engine) -> Result<usize, Raised> {
    Err(Raised::new(engine.value_at(1)))
}

fn assert(engine: &Engine) -> Result<usize, Raised> {
    let value = check_any(engine, 1, "assert")?;
    if value.is_truthy() {
        return Ok(engine.arg_count());
    }
    if engine.arg_count() >= 2 {
        Err(Raised::new(engine.value_at(2)))
    } else {
        Err(Raised::from("assertion failed!"))
    }
}

fn type_name(engine: &Engine) -> Result<usize, Raised> {
    let value = check_any(engine, 1, "type")?;
    engine.push(Value::string(value.type_name()));
    Ok(1)
}

fn tostring(engine: &Engine) -> Result<usize, Raised> {
    let value = check_any(engine, 1, "tostring")?;
    engine.push(Value::string(&value.to_string()));
    Ok(1)
}

fn pcall(engine: &Engine) -> Result<usize, Raised> {
    check_any(engine, 1, "pcall")?;
    let nargs = engine.arg_count() as i32 - 1;

    let ok = engine.protected_call(nargs, Results::All, 0).is_ok();
    engine.push_boolean(ok);
    engine.insert(1);
    Ok(engine.arg_count())
}

fn select(engine: &Engine) -> Result<usize, Raised> {
    let selector = check_any(engine, 1, "select")?;
    let rest = engine.arg_count() - 1;

    if let Value::String(s) = &selector {
        if &**s == "#" {
            engine.push(Value::Integer(rest as i64));
            return Ok(1);
        }
    }

    let n = selector
        .as_integer()
        .ok_or_else(|| arg_error(1, "select", "number expected"))?;
    let start = if n < 0 {
        let back = n.unsigned_abs() as usize;
        if back > rest {
            return Err(arg_error(1, "select", "index out of range"));
        }
        rest - back + 1
    } else if n == 0 {
        return Err(arg_error(1, "select", "index out of range"));
    } else {
        (n as usize).min(rest + 1)
    };

    // Arguments `start..=rest` are already the top of the frame
    Ok(rest + 1 - start)
}

fn rawequal(engine: &Engine) -> Result<usize, Raised> {
    let a = check_any(engine, 1, "rawequal")?;
    let b = check_any(engine, 2, "rawequal")?;
    engine.push(Value::Boolean(a.raw_equal(&b)));
    Ok(1)
}

fn rawlen(engine: &Engine) -> Result<usize, Raised> {
    let len = match engine.value_at(1) {
        Value::Table(t) => t.borrow().sequence_len(),
        Value::String(s) => s.len() as i64,
        _ => return Err(arg_error(1, "rawlen", "table or string expected")),
    };
    engine.push(Value::Integer(len));
    Ok(1)
}

/// Message handler: append the active call chain to the error message
pub(crate) fn traceback(engine: &Engine) -> Result<usize, Raised> {
    let message = match engine.value_at(1) {
        value @ (Value::String(_) | Value::Integer(_) | Value::Number(_)) => value.to_string(),
        other => format!("(error object is a {} value)", other.type_name()),
    };

    // Level 1 skips the handler's own frame
    let text = engine.traceback(&message, 1);
    engine.push(Value::string(&text));
    Ok(1)
}
