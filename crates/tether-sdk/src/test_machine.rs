//! Minimal in-memory machine for unit tests.
//!
//! Supports values, tables and the reference table. It has no callables:
//! every protected call fails with an "attempt to call" error.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{BindResult, Error};
use crate::machine::{Fault, Kind, Machine, Ref, Results};

#[derive(Clone)]
enum Val {
    Nil,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(Rc<str>),
    Table(Rc<RefCell<Vec<(Val, Val)>>>),
    Handler,
}

impl Val {
    fn kind(&self) -> Kind {
        match self {
            Val::Nil => Kind::Nil,
            Val::Bool(_) => Kind::Boolean,
            Val::Int(_) | Val::Num(_) => Kind::Number,
            Val::Str(_) => Kind::String,
            Val::Table(_) => Kind::Table,
            Val::Handler => Kind::Function,
        }
    }

    fn same(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Num(a), Val::Num(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Table(a), Val::Table(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

pub(crate) struct VecMachine {
    stack: RefCell<Vec<Val>>,
    refs: RefCell<Vec<Option<Val>>>,
    globals: Val,
    registry: Val,
}

impl VecMachine {
    pub(crate) fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
            refs: RefCell::new(Vec::new()),
            globals: Val::Table(Rc::default()),
            registry: Val::Table(Rc::default()),
        }
    }

    /// Number of occupied reference slots
    pub(crate) fn live_refs(&self) -> usize {
        self.refs.borrow().iter().filter(|slot| slot.is_some()).count()
    }

    fn slot(&self, index: i32) -> Option<usize> {
        let len = self.stack.borrow().len() as i32;
        let abs = if index > 0 { index } else { len + index + 1 };
        (abs >= 1 && abs <= len).then(|| (abs - 1) as usize)
    }

    fn at(&self, index: i32) -> Val {
        self.slot(index)
            .map(|i| self.stack.borrow()[i].clone())
            .unwrap_or(Val::Nil)
    }

    fn push(&self, value: Val) {
        self.stack.borrow_mut().push(value);
    }

    fn pop_value(&self) -> Val {
        self.stack.borrow_mut().pop().unwrap_or(Val::Nil)
    }
}

impl Machine for VecMachine {
    fn top(&self) -> i32 {
        self.stack.borrow().len() as i32
    }

    fn set_top(&self, index: i32) {
        let len = self.top();
        let new_len = if index >= 0 { index } else { len + index + 1 };
        self.stack.borrow_mut().resize(new_len.max(0) as usize, Val::Nil);
    }

    fn push_value(&self, index: i32) {
        let value = self.at(index);
        self.push(value);
    }

    fn insert(&self, index: i32) {
        let value = self.pop_value();
        if let Some(i) = self.slot(index) {
            self.stack.borrow_mut().insert(i, value);
        } else {
            self.push(value);
        }
    }

    fn kind(&self, index: i32) -> Kind {
        match self.slot(index) {
            Some(i) => self.stack.borrow()[i].kind(),
            None => Kind::None,
        }
    }

    fn to_boolean(&self, index: i32) -> bool {
        !matches!(self.at(index), Val::Nil | Val::Bool(false))
    }

    fn to_integer(&self, index: i32) -> Option<i64> {
        match self.at(index) {
            Val::Int(i) => Some(i),
            Val::Num(n) if n.fract() == 0.0 => Some(n as i64),
            _ => None,
        }
    }

    fn to_number(&self, index: i32) -> Option<f64> {
        match self.at(index) {
            Val::Int(i) => Some(i as f64),
            Val::Num(n) => Some(n),
            _ => None,
        }
    }

    fn to_string_value(&self, index: i32) -> Option<String> {
        match self.at(index) {
            Val::Int(i) => Some(i.to_string()),
            Val::Num(n) => Some(n.to_string()),
            Val::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }

    fn describe(&self, index: i32) -> String {
        self.to_string_value(index)
            .unwrap_or_else(|| self.kind(index).name().to_string())
    }

    fn push_nil(&self) {
        self.push(Val::Nil);
    }

    fn push_boolean(&self, value: bool) {
        self.push(Val::Bool(value));
    }

    fn push_integer(&self, value: i64) {
        self.push(Val::Int(value));
    }

    fn push_number(&self, value: f64) {
        self.push(Val::Num(value));
    }

    fn push_string(&self, value: &str) {
        self.push(Val::Str(value.into()));
    }

    fn push_globals(&self) {
        self.push(self.globals.clone());
    }

    fn push_registry(&self) {
        self.push(self.registry.clone());
    }

    fn new_table(&self) {
        self.push(Val::Table(Rc::default()));
    }

    fn push_traceback(&self) {
        self.push(Val::Handler);
    }

    fn get_table(&self, index: i32) {
        let table = self.at(index);
        let key = self.pop_value();
        let value = match table {
            Val::Table(entries) => entries
                .borrow()
                .iter()
                .find(|(k, _)| k.same(&key))
                .map(|(_, v)| v.clone())
                .unwrap_or(Val::Nil),
            _ => Val::Nil,
        };
        self.push(value);
    }

    fn set_table(&self, index: i32) -> BindResult<()> {
        let table = self.at(index);
        let value = self.pop_value();
        let key = self.pop_value();

        let Val::Table(entries) = table else {
            return Err(Error::NotIndexable { kind: table.kind() });
        };
        if matches!(key, Val::Nil) {
            return Err(Error::InvalidKey { reason: "nil" });
        }

        let mut entries = entries.borrow_mut();
        entries.retain(|(k, _)| !k.same(&key));
        if !matches!(value, Val::Nil) {
            entries.push((key, value));
        }
        Ok(())
    }

    fn reference(&self) -> Ref {
        let value = self.pop_value();
        if matches!(value, Val::Nil) {
            return Ref::Nil;
        }
        let mut refs = self.refs.borrow_mut();
        refs.push(Some(value));
        Ref::Slot(refs.len() as u32)
    }

    fn unreference(&self, reference: Ref) {
        if let Ref::Slot(id) = reference {
            if let Some(slot) = self.refs.borrow_mut().get_mut(id as usize - 1) {
                *slot = None;
            }
        }
    }

    fn push_ref(&self, reference: Ref) {
        let value = match reference {
            Ref::Nil => Val::Nil,
            Ref::Slot(id) => self
                .refs
                .borrow()
                .get(id as usize - 1)
                .cloned()
                .flatten()
                .unwrap_or(Val::Nil),
        };
        self.push(value);
    }

    fn protected_call(&self, nargs: i32, _results: Results, _handler: i32) -> Result<(), Fault> {
        let callee = self.at(-nargs - 1);
        let message = format!("attempt to call a {} value", callee.kind());
        self.set_top(-nargs - 2);
        self.push_string(&message);
        Err(Fault::Runtime)
    }
}
