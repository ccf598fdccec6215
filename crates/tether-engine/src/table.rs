//! Hash tables
//!
//! Keys are normalized before hashing: a float with an exact integer value
//! is the same key as that integer. Nil values are never stored, so assigning
//! nil removes the entry.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tether_sdk::{BindResult, Error};

use crate::value::{float_to_integer, FunctionRef, TableRef, Value};

/// Normalized table key
#[derive(Clone)]
enum Key {
    Boolean(bool),
    Integer(i64),
    // Non-integral, non-NaN floats, by bit pattern
    Number(u64),
    String(Rc<str>),
    Table(TableRef),
    Function(FunctionRef),
}

impl Key {
    /// `Err` carries the reason the value cannot be a key
    fn from_value(value: &Value) -> Result<Self, &'static str> {
        Ok(match value {
            Value::Nil => return Err("nil"),
            Value::Boolean(b) => Key::Boolean(*b),
            Value::Integer(i) => Key::Integer(*i),
            Value::Number(n) if n.is_nan() => return Err("NaN"),
            Value::Number(n) => match float_to_integer(*n) {
                Some(i) => Key::Integer(i),
                // -0.0 is integral, so every remaining float has one encoding
                None => Key::Number(n.to_bits()),
            },
            Value::String(s) => Key::String(s.clone()),
            Value::Table(t) => Key::Table(t.clone()),
            Value::Function(f) => Key::Function(f.clone()),
        })
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Boolean(a), Key::Boolean(b)) => a == b,
            (Key::Integer(a), Key::Integer(b)) => a == b,
            (Key::Number(a), Key::Number(b)) => a == b,
            (Key::String(a), Key::String(b)) => a == b,
            (Key::Table(a), Key::Table(b)) => Rc::ptr_eq(a, b),
            (Key::Function(a), Key::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::Boolean(b) => b.hash(state),
            Key::Integer(i) => i.hash(state),
            Key::Number(bits) => bits.hash(state),
            Key::String(s) => s.hash(state),
            Key::Table(t) => Rc::as_ptr(t).hash(state),
            Key::Function(f) => Rc::as_ptr(f).hash(state),
        }
    }
}

/// A machine table
#[derive(Default)]
pub struct Table {
    entries: FxHashMap<Key, Value>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// `self[key]`; nil for missing entries and for keys that cannot exist
    pub fn get(&self, key: &Value) -> Value {
        match Key::from_value(key) {
            Ok(key) => self.entries.get(&key).cloned().unwrap_or_default(),
            Err(_) => Value::Nil,
        }
    }

    /// Field lookup by string key
    pub fn get_str(&self, key: &str) -> Value {
        self.entries
            .get(&Key::String(key.into()))
            .cloned()
            .unwrap_or_default()
    }

    /// `self[key] = value`; assigning nil removes the entry
    pub fn set(&mut self, key: Value, value: Value) -> BindResult<()> {
        let key = Key::from_value(&key).map_err(|reason| Error::InvalidKey { reason })?;
        if value.is_nil() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
        Ok(())
    }

    /// Number of stored entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Border of the sequence part: the largest `n` such that `1..=n` are all
    /// present
    pub fn sequence_len(&self) -> i64 {
        let mut n = 0;
        while self.entries.contains_key(&Key::Integer(n + 1)) {
            n += 1;
        }
        n
    }
}
