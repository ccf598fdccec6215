//! Stack discipline guards
//!
//! RAII helpers that put the machine's evaluation stack back where it was,
//! whichever way the enclosing scope exits.
//!
//! # Example
//!
//! ```ignore
//! fn read_field(machine: &dyn Machine) -> Option<i64> {
//!     let _guard = StackGuard::new(machine);
//!     machine.push_globals();
//!     machine.get_field(-1, "answer");
//!     machine.to_integer(-1)
//! } // both pushed slots are gone here
//! ```

use crate::machine::Machine;

/// Restores the stack to the depth observed at construction.
pub struct StackGuard<'m> {
    machine: &'m dyn Machine,
    depth: i32,
}

impl<'m> StackGuard<'m> {
    /// Record the current depth
    #[inline]
    pub fn new(machine: &'m dyn Machine) -> Self {
        Self {
            depth: machine.top(),
            machine,
        }
    }

    /// The recorded depth (absolute index of the slot below anything pushed
    /// inside the guarded scope)
    #[inline]
    pub fn depth(&self) -> i32 {
        self.depth
    }
}

impl Drop for StackGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.machine.set_top(self.depth);
    }
}

/// Pops a fixed number of slots on drop.
///
/// Cheaper to reason about than [`StackGuard`] when the scope pushes a known
/// number of values and cannot fail halfway.
pub struct StackPop<'m> {
    machine: &'m dyn Machine,
    count: i32,
}

impl<'m> StackPop<'m> {
    /// Pop `count` slots when dropped
    #[inline]
    pub fn new(machine: &'m dyn Machine, count: i32) -> Self {
        Self { machine, count }
    }
}

impl Drop for StackPop<'_> {
    #[inline]
    fn drop(&mut self) {
        self.machine.pop(self.count);
    }
}
