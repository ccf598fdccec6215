//! Native functions
//!
//! A native function runs with its arguments at frame indices
//! `1..=engine.arg_count()` and returns how many results it left on top of
//! the stack. Raising is returning `Err(Raised)`.

use std::fmt;

use crate::engine::Engine;
use crate::error::Raised;

/// Native function signature
pub type NativeFn = dyn Fn(&Engine) -> Result<usize, Raised>;

/// A named native function
pub struct Function {
    name: String,
    func: Box<NativeFn>,
}

impl Function {
    /// Create a function; `name` shows up in tracebacks
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Engine) -> Result<usize, Raised> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self, engine: &Engine) -> Result<usize, Raised> {
        (self.func)(engine)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}
