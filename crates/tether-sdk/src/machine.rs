//! Machine trait - abstract stack-machine operations
//!
//! Defines the interface an embedded machine implements. The binding layer
//! (`Object`, `Node`, the call protocol) programs against this trait only and
//! never depends on engine internals.
//!
//! # Stack indices
//!
//! Indices follow the usual embedded-interpreter convention:
//!
//! ```text
//! positive:  1 = first slot of the current frame, counting upwards
//! negative: -1 = top of the stack, -2 = just below it, ...
//! ```
//!
//! Index `0` is never a valid slot.

use std::fmt;

use crate::error::BindResult;

/// Runtime type of a stack slot or referenced value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Index outside the stack (no value at all)
    None,
    /// The machine's "no value" singleton
    Nil,
    /// Boolean
    Boolean,
    /// Integer or floating-point number
    Number,
    /// Immutable string
    String,
    /// Table (shared by reference)
    Table,
    /// Callable (shared by reference)
    Function,
}

impl Kind {
    /// Machine-facing type name, as used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Kind::None => "no value",
            Kind::Nil => "nil",
            Kind::Boolean => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Table => "table",
            Kind::Function => "function",
        }
    }

    /// `true` for `Nil` and `None`
    pub fn is_nil_or_none(self) -> bool {
        matches!(self, Kind::Nil | Kind::None)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of an anchored value in the machine's reference table.
///
/// Nil is never stored: anchoring nil yields [`Ref::Nil`], which owns nothing
/// and needs no release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
    /// The nil sentinel (no slot allocated)
    Nil,
    /// A live slot
    Slot(u32),
}

/// How many results a protected call should leave on the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Results {
    /// Discard every result
    None,
    /// Keep exactly `n` results, padding with nil
    Exact(u32),
    /// Keep every result the callee produced
    All,
}

/// Why a protected call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// An error was raised while running the callee
    Runtime,
    /// The message handler itself raised while handling an error
    Handler,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Runtime => f.write_str("runtime error"),
            Fault::Handler => f.write_str("error in error handling"),
        }
    }
}

/// Abstract embedded machine.
///
/// Every method takes `&self`: handles share one machine and the machine is
/// single-threaded, so implementations use interior mutability. Implementations
/// must not hold an interior borrow while running a native function, because
/// native functions may re-enter the machine through this trait.
pub trait Machine {
    // ========================================================================
    // Stack depth
    // ========================================================================

    /// Index of the top slot in the current frame (0 when the frame is empty)
    fn top(&self) -> i32;

    /// Grow (with nil) or truncate the current frame to `index` slots.
    ///
    /// A negative index is relative to the top: `set_top(-2)` pops one slot.
    fn set_top(&self, index: i32);

    /// Pop `n` slots
    fn pop(&self, n: i32) {
        self.set_top(-n - 1);
    }

    /// Convert a relative index into an absolute frame index
    fn abs_index(&self, index: i32) -> i32 {
        if index > 0 {
            index
        } else {
            self.top() + index + 1
        }
    }

    // ========================================================================
    // Stack manipulation
    // ========================================================================

    /// Push a copy of the value at `index`
    fn push_value(&self, index: i32);

    /// Move the top value into `index`, shifting the slots above it up
    fn insert(&self, index: i32);

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Runtime type of the value at `index` (`Kind::None` when out of range)
    fn kind(&self, index: i32) -> Kind;

    /// Truthiness of the value at `index` (only nil and false are falsy)
    fn to_boolean(&self, index: i32) -> bool;

    /// The value at `index` as an integer, if it is one or is a float with an
    /// exact integral value
    fn to_integer(&self, index: i32) -> Option<i64>;

    /// The value at `index` as a float, if it is a number
    fn to_number(&self, index: i32) -> Option<f64>;

    /// The value at `index` as text, if it is a string or a number
    fn to_string_value(&self, index: i32) -> Option<String>;

    /// Describe any value (including error objects) as text
    fn describe(&self, index: i32) -> String;

    // ========================================================================
    // Pushing values
    // ========================================================================

    /// Push nil
    fn push_nil(&self);

    /// Push a boolean
    fn push_boolean(&self, value: bool);

    /// Push an integer
    fn push_integer(&self, value: i64);

    /// Push a float
    fn push_number(&self, value: f64);

    /// Push a string
    fn push_string(&self, value: &str);

    /// Push the global table
    fn push_globals(&self);

    /// Push the host-private registry table
    fn push_registry(&self);

    /// Push a fresh, empty table
    fn new_table(&self);

    /// Push the message handler that appends a traceback to an error object
    fn push_traceback(&self);

    // ========================================================================
    // Tables
    // ========================================================================

    /// Pop a key and push `t[key]`, where `t` is the value at `index`.
    ///
    /// Reading through a value that is not a table pushes nil.
    fn get_table(&self, index: i32);

    /// Pop a value and a key (value on top) and perform `t[key] = value`,
    /// where `t` is the value at `index`.
    ///
    /// Both slots are popped even when the write fails.
    fn set_table(&self, index: i32) -> BindResult<()>;

    /// Push `t[name]`, where `t` is the value at `index`
    fn get_field(&self, index: i32, name: &str) {
        let table = self.abs_index(index);
        self.push_string(name);
        self.get_table(table);
    }

    // ========================================================================
    // Reference table
    // ========================================================================

    /// Pop the top value and anchor it in the reference table
    fn reference(&self) -> Ref;

    /// Release an anchored value; releasing `Ref::Nil` does nothing
    fn unreference(&self, reference: Ref);

    /// Push the value anchored under `reference`
    fn push_ref(&self, reference: Ref);

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call the value sitting below the top `nargs` slots.
    ///
    /// `handler` is the absolute index of a message handler, or `0` for none.
    /// On success the callable and arguments are replaced by the results
    /// (trimmed or padded according to `results`). On failure they are
    /// replaced by a single error object, already passed through the handler.
    fn protected_call(&self, nargs: i32, results: Results, handler: i32) -> Result<(), Fault>;
}
