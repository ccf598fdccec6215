//! Engine state and the `Machine` implementation
//!
//! # Memory Layout
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ results / temporaries (top)         │
//! │ arg₁ … argₙ                         │  ← frame base (index 1)
//! │ callee                              │
//! ├─────────────────────────────────────┤
//! │ caller frame                        │
//! │   ...                               │
//! └─────────────────────────────────────┘
//! ```
//!
//! Positive indices count from the current frame base; negative indices
//! count down from the top. The host runs in an implicit bottom frame whose
//! base is slot 0.
//!
//! Every interior borrow is released before a native function runs, so
//! natives can re-enter the engine through the `Machine` trait (and through
//! `tether-sdk` handles built on it).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tether_sdk::{BindResult, Error, Fault, Kind, Machine, Ref, Results};

use crate::builtins;
use crate::config::EngineConfig;
use crate::error::{ConfigError, HandlerState, Raised};
use crate::function::Function;
use crate::refs::RefTable;
use crate::table::Table;
use crate::value::{FunctionRef, TableRef, Value};

/// Extra frames and slots a message handler may use beyond the configured
/// limits, so that a stack overflow can still be reported
const HANDLER_HEADROOM: usize = 8;

/// Activation record of a running native function
struct Frame {
    /// Absolute stack position of the first argument
    base: usize,
    function: FunctionRef,
}

/// An embedded stack machine
pub struct Engine {
    config: EngineConfig,
    stack: RefCell<Vec<Value>>,
    frames: RefCell<Vec<Frame>>,
    // Message handler of each active protected call, innermost last (nil = none)
    handlers: RefCell<Vec<Value>>,
    refs: RefCell<RefTable>,
    globals: TableRef,
    registry: TableRef,
    traceback: FunctionRef,
}

impl Engine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Create an engine with custom limits, rejecting unusable ones
    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let engine = Engine {
            config,
            stack: RefCell::new(Vec::with_capacity(64)),
            frames: RefCell::new(Vec::with_capacity(16)),
            handlers: RefCell::new(Vec::new()),
            refs: RefCell::new(RefTable::new()),
            globals: Rc::new(RefCell::new(Table::new())),
            registry: Rc::new(RefCell::new(Table::new())),
            traceback: Rc::new(Function::new("traceback", builtins::traceback)),
        };
        builtins::install(&engine);
        engine
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Native function support
    // ========================================================================

    /// Bind a native function to a global name
    pub fn register(
        &self,
        name: &str,
        func: impl Fn(&Engine) -> Result<usize, Raised> + 'static,
    ) {
        let function = Value::Function(Rc::new(Function::new(name, func)));
        self.set_global(name, function);
    }

    /// Push a new native function
    pub fn create_function(
        &self,
        name: &str,
        func: impl Fn(&Engine) -> Result<usize, Raised> + 'static,
    ) {
        self.push(Value::Function(Rc::new(Function::new(name, func))));
    }

    /// Number of arguments of the running native function (the frame size)
    pub fn arg_count(&self) -> usize {
        self.stack.borrow().len() - self.base()
    }

    /// Push a value
    pub fn push(&self, value: Value) {
        self.stack.borrow_mut().push(value);
    }

    /// Copy of the value at `index` (nil when out of range)
    pub fn value_at(&self, index: i32) -> Value {
        match self.slot(index) {
            Some(pos) => self.stack.borrow()[pos].clone(),
            None => Value::Nil,
        }
    }

    /// Read a global
    pub fn global(&self, name: &str) -> Value {
        self.globals.borrow().get_str(name)
    }

    /// Write a global
    pub fn set_global(&self, name: &str, value: Value) {
        // A string key is always valid
        let _ = self.globals.borrow_mut().set(Value::string(name), value);
    }

    /// Nesting depth of native calls in progress
    pub fn call_depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Number of values anchored in the reference table
    pub fn live_refs(&self) -> usize {
        self.refs.borrow().live()
    }

    /// Render `message` followed by the active call chain, skipping the
    /// `level` innermost frames
    pub fn traceback(&self, message: &str, level: usize) -> String {
        let frames = self.frames.borrow();
        let names: Vec<&str> = frames
            .iter()
            .rev()
            .skip(level)
            .map(|frame| frame.function.name())
            .collect();

        let mut out = format!("{}\nstack traceback:", message);
        let limit = self.config.traceback_levels;
        let head = (limit - 1) / 2;
        let tail = limit - 1 - head;

        for (i, name) in names.iter().enumerate() {
            if names.len() > limit && i == head {
                out.push_str(&format!(
                    "\n\t...\t(skipping {} levels)",
                    names.len() - head - tail
                ));
            }
            if names.len() > limit && i >= head && i < names.len() - tail {
                continue;
            }
            out.push_str(&format!("\n\t[native]: in function '{}'", name));
        }
        out.push_str("\n\t[host]: in ?");
        out
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn base(&self) -> usize {
        self.frames.borrow().last().map_or(0, |frame| frame.base)
    }

    /// Absolute stack position of a frame index
    fn slot(&self, index: i32) -> Option<usize> {
        let len = self.stack.borrow().len();
        let base = self.base();
        if index > 0 {
            let pos = base + index as usize - 1;
            (pos < len).then_some(pos)
        } else if index < 0 {
            let back = index.unsigned_abs() as usize;
            (back <= len - base).then(|| len - back)
        } else {
            None
        }
    }

    fn pop_value(&self) -> Value {
        let base = self.base();
        let mut stack = self.stack.borrow_mut();
        if stack.len() > base {
            stack.pop().unwrap_or_default()
        } else {
            Value::Nil
        }
    }

    /// Call the value at absolute `func_pos` with everything above it as
    /// arguments. On success the callee and arguments are replaced by the
    /// results and their count is returned.
    fn call_at(&self, func_pos: usize, headroom: usize) -> Result<usize, Raised> {
        let callee = self.stack.borrow()[func_pos].clone();
        let function = match callee {
            Value::Function(function) => function,
            other => {
                let message = format!("attempt to call a {} value", other.type_name());
                return Err(self.handle(Raised::from(message)));
            }
        };

        let overflow = self.frames.borrow().len() >= self.config.max_call_depth + headroom
            || self.stack.borrow().len() >= self.config.max_stack_slots + headroom;
        if overflow {
            return Err(self.handle(Raised::from("stack overflow")));
        }

        let frame = FrameGuard::push(self, func_pos + 1, function.clone());

        // The failing frame must still be active while the handler runs
        let outcome = function
            .invoke(self)
            .map_err(|raised| self.handle(raised));

        drop(frame);
        let count = outcome?;

        let mut stack = self.stack.borrow_mut();
        let len = stack.len();
        let count = count.min(len - func_pos - 1);
        stack.drain(func_pos..len - count);
        Ok(count)
    }

    /// Run the innermost message handler over a freshly raised error
    fn handle(&self, raised: Raised) -> Raised {
        if raised.state() != HandlerState::Pending {
            return raised;
        }

        let handler = self.handlers.borrow().last().cloned().unwrap_or_default();
        let value = raised.into_value();
        if handler.is_nil() {
            return Raised::with_state(value, HandlerState::Handled);
        }

        let pos = self.stack.borrow().len();
        self.push(handler);
        self.push(value);

        // Errors inside the handler are not handled again
        let guard = HandlerGuard::push(self, Value::Nil);
        let outcome = self.call_at(pos, HANDLER_HEADROOM);
        drop(guard);

        let result = match outcome {
            Ok(count) => {
                let value = if count > 0 {
                    self.stack.borrow()[pos].clone()
                } else {
                    Value::Nil
                };
                Raised::with_state(value, HandlerState::Handled)
            }
            Err(_) => Raised::with_state(
                Value::string("error in error handling"),
                HandlerState::Failed,
            ),
        };
        self.stack.borrow_mut().truncate(pos);
        result
    }
}

/// Keeps a call frame active until dropped, including during a panic unwind
struct FrameGuard<'e> {
    engine: &'e Engine,
}

impl<'e> FrameGuard<'e> {
    fn push(engine: &'e Engine, base: usize, function: FunctionRef) -> Self {
        engine.frames.borrow_mut().push(Frame { base, function });
        Self { engine }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.engine.frames.borrow_mut().pop();
    }
}

/// Keeps a message handler installed until dropped
struct HandlerGuard<'e> {
    engine: &'e Engine,
}

impl<'e> HandlerGuard<'e> {
    fn push(engine: &'e Engine, handler: Value) -> Self {
        engine.handlers.borrow_mut().push(handler);
        Self { engine }
    }
}

impl Drop for HandlerGuard<'_> {
    fn drop(&mut self) {
        self.engine.handlers.borrow_mut().pop();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("stack_len", &self.stack.borrow().len())
            .field("call_depth", &self.call_depth())
            .field("live_refs", &self.live_refs())
            .finish()
    }
}

impl Machine for Engine {
    fn top(&self) -> i32 {
        self.arg_count() as i32
    }

    fn set_top(&self, index: i32) {
        let base = self.base();
        let mut stack = self.stack.borrow_mut();
        let new_len = if index >= 0 {
            base + index as usize
        } else {
            let drop = (index.unsigned_abs() - 1) as usize;
            stack.len().saturating_sub(drop).max(base)
        };
        stack.resize(new_len, Value::Nil);
    }

    fn push_value(&self, index: i32) {
        let value = self.value_at(index);
        self.push(value);
    }

    fn insert(&self, index: i32) {
        let Some(pos) = self.slot(index) else {
            return;
        };
        let mut stack = self.stack.borrow_mut();
        if let Some(value) = stack.pop() {
            stack.insert(pos, value);
        }
    }

    fn kind(&self, index: i32) -> Kind {
        match self.slot(index) {
            Some(pos) => self.stack.borrow()[pos].kind(),
            None => Kind::None,
        }
    }

    fn to_boolean(&self, index: i32) -> bool {
        self.value_at(index).is_truthy()
    }

    fn to_integer(&self, index: i32) -> Option<i64> {
        self.value_at(index).as_integer()
    }

    fn to_number(&self, index: i32) -> Option<f64> {
        self.value_at(index).as_number()
    }

    fn to_string_value(&self, index: i32) -> Option<String> {
        self.value_at(index).as_text()
    }

    fn describe(&self, index: i32) -> String {
        self.value_at(index).to_string()
    }

    fn push_nil(&self) {
        self.push(Value::Nil);
    }

    fn push_boolean(&self, value: bool) {
        self.push(Value::Boolean(value));
    }

    fn push_integer(&self, value: i64) {
        self.push(Value::Integer(value));
    }

    fn push_number(&self, value: f64) {
        self.push(Value::Number(value));
    }

    fn push_string(&self, value: &str) {
        self.push(Value::string(value));
    }

    fn push_globals(&self) {
        self.push(Value::Table(self.globals.clone()));
    }

    fn push_registry(&self) {
        self.push(Value::Table(self.registry.clone()));
    }

    fn new_table(&self) {
        self.push(Value::new_table());
    }

    fn push_traceback(&self) {
        self.push(Value::Function(self.traceback.clone()));
    }

    fn get_table(&self, index: i32) {
        let table = self.value_at(index);
        let key = self.pop_value();
        let value = match table.as_table() {
            Some(table) => table.borrow().get(&key),
            None => Value::Nil,
        };
        self.push(value);
    }

    fn set_table(&self, index: i32) -> BindResult<()> {
        let table = self.value_at(index);
        let value = self.pop_value();
        let key = self.pop_value();
        match table.as_table() {
            Some(table) => table.borrow_mut().set(key, value),
            None => Err(Error::NotIndexable { kind: table.kind() }),
        }
    }

    fn reference(&self) -> Ref {
        let value = self.pop_value();
        self.refs.borrow_mut().anchor(value)
    }

    fn unreference(&self, reference: Ref) {
        self.refs.borrow_mut().release(reference);
    }

    fn push_ref(&self, reference: Ref) {
        let value = self.refs.borrow().get(reference);
        self.push(value);
    }

    fn protected_call(&self, nargs: i32, results: Results, handler: i32) -> Result<(), Fault> {
        let handler = if handler != 0 {
            self.value_at(handler)
        } else {
            Value::Nil
        };
        let func_pos = self.stack.borrow().len() - nargs as usize - 1;

        let guard = HandlerGuard::push(self, handler);
        let outcome = self.call_at(func_pos, 0);
        drop(guard);

        match outcome {
            Ok(count) => {
                let mut stack = self.stack.borrow_mut();
                match results {
                    Results::None => stack.truncate(func_pos),
                    Results::Exact(n) => stack.resize(func_pos + n as usize, Value::Nil),
                    Results::All => debug_assert_eq!(stack.len(), func_pos + count),
                }
                Ok(())
            }
            Err(raised) => {
                let fault = match raised.state() {
                    HandlerState::Failed => Fault::Handler,
                    _ => Fault::Runtime,
                };
                tracing::debug!(%fault, error = %raised, "protected call failed");

                self.stack.borrow_mut().truncate(func_pos);
                self.push(raised.into_value());
                Err(fault)
            }
        }
    }
}
