//! Object - owning handle to a machine value
//!
//! An `Object` anchors one value in the machine's reference table for as long
//! as the handle lives. It borrows the machine (`&'m dyn Machine`) and never
//! owns it.
//!
//! # States
//!
//! - *invalid*: not bound to any machine (default-constructed, released, or
//!   moved out of with [`Object::take`])
//! - *nil*: bound, and the value is the machine's nil (no slot is allocated)
//! - *bound*: holds exactly one live reference-table slot
//!
//! # Cloning
//!
//! Cloning re-anchors the same value under a new slot. Tables and functions
//! are reference values inside the machine, so both handles observe the same
//! table; primitive values are simply copied. The two handles are released
//! independently.

use std::fmt;

use crate::error::{BindResult, Error};
use crate::guard::{StackGuard, StackPop};
use crate::machine::{Kind, Machine, Ref};
use crate::marshal::{CallReturn, FromStack, PushArgs, ToStack};
use crate::node::Node;

/// Owning handle to a value in the machine's reference table
pub struct Object<'m> {
    binding: Option<(&'m dyn Machine, Ref)>,
}

impl<'m> Object<'m> {
    /// An invalid handle
    pub const fn invalid() -> Self {
        Self { binding: None }
    }

    /// Anchor the value at stack `index`. The stack is left unchanged.
    pub fn from_stack(machine: &'m dyn Machine, index: i32) -> Self {
        machine.push_value(index);
        let reference = machine.reference();
        Self {
            binding: Some((machine, reference)),
        }
    }

    /// The machine this handle is bound to
    pub fn machine(&self) -> Option<&'m dyn Machine> {
        self.binding.map(|(machine, _)| machine)
    }

    pub(crate) fn reference(&self) -> Option<Ref> {
        self.binding.map(|(_, reference)| reference)
    }

    /// `true` if bound to a machine
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.binding.is_some()
    }

    /// `true` if bound and the value is nil. Never fails.
    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self.binding, Some((_, Ref::Nil)))
    }

    /// Runtime type of the value (`Kind::None` for an invalid handle)
    pub fn kind(&self) -> Kind {
        match self.binding {
            None => Kind::None,
            Some((_, Ref::Nil)) => Kind::Nil,
            Some((machine, reference)) => {
                let _pop = StackPop::new(machine, 1);
                machine.push_ref(reference);
                machine.kind(-1)
            }
        }
    }

    /// Push the value onto the top of the stack.
    ///
    /// The handle must be valid; pushing an invalid handle is a caller error
    /// and leaves the stack untouched.
    pub fn push(&self) {
        debug_assert!(self.is_valid(), "push on an invalid handle");
        if let Some((machine, reference)) = self.binding {
            machine.push_ref(reference);
        }
    }

    /// Release the slot. Idempotent.
    pub fn release(&mut self) {
        if let Some((machine, reference)) = self.binding.take() {
            machine.unreference(reference);
        }
    }

    /// Move the binding out, leaving `self` invalid. Does not touch the machine.
    pub fn take(&mut self) -> Self {
        Self {
            binding: self.binding.take(),
        }
    }

    /// Convert the value to `T`, or return `default` when it is not
    /// compatible (or the handle is invalid). Never fails.
    pub fn value<T: FromStack<'m>>(&self, default: T) -> T {
        let Some((machine, reference)) = self.binding else {
            return default;
        };

        let _pop = StackPop::new(machine, 1);
        machine.push_ref(reference);

        if T::matches(machine, -1) {
            T::pull(machine, -1)
        } else {
            default
        }
    }

    /// Convert the value to `T`, falling back to `T::default()`
    pub fn get<T: FromStack<'m> + Default>(&self) -> T {
        self.value(T::default())
    }

    /// Deferred `self[key]`
    pub fn index<K: ToStack>(&self, key: K) -> Node<'m, K> {
        Node::new(self.clone(), key)
    }

    /// Call the value with `args`, converting the first result to `R`.
    ///
    /// `R = ()` discards every result.
    pub fn call<R, A>(&self, args: A) -> BindResult<R>
    where
        R: CallReturn<'m>,
        A: PushArgs,
    {
        let (machine, _) = self.binding.ok_or(Error::InvalidHandle)?;
        let guard = StackGuard::new(machine);

        self.push();
        let argc = args.push_args(machine);

        crate::call::invoke(machine, guard.depth(), argc)
    }

    /// Call `self[name]` as a method: the table itself is passed as the first
    /// argument, followed by `args`.
    pub fn call_field<R, A>(&self, name: &str, args: A) -> BindResult<R>
    where
        R: CallReturn<'m>,
        A: PushArgs,
    {
        let (machine, _) = self.binding.ok_or(Error::InvalidHandle)?;
        let guard = StackGuard::new(machine);

        self.push();
        machine.get_field(-1, name);
        machine.insert(-2);
        let argc = args.push_args(machine);

        crate::call::invoke(machine, guard.depth(), argc + 1)
    }
}

impl Default for Object<'_> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Clone for Object<'_> {
    fn clone(&self) -> Self {
        match self.binding {
            None => Self::invalid(),
            Some((machine, reference)) => {
                machine.push_ref(reference);
                Self {
                    binding: Some((machine, machine.reference())),
                }
            }
        }
    }
}

impl Drop for Object<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<'m, K: ToStack> From<Node<'m, K>> for Object<'m> {
    fn from(node: Node<'m, K>) -> Self {
        node.get()
    }
}

impl fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.binding {
            None => write!(f, "Object::Invalid"),
            Some((_, reference)) => f
                .debug_struct("Object")
                .field("ref", &reference)
                .field("kind", &self.kind())
                .finish(),
        }
    }
}

impl fmt::Display for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((machine, reference)) = self.binding else {
            return f.write_str("<invalid>");
        };

        let _pop = StackPop::new(machine, 1);
        machine.push_ref(reference);
        f.write_str(&machine.describe(-1))
    }
}

// ============================================================================
// Root handles
// ============================================================================

/// Handle to the machine's global table
pub fn globals(machine: &dyn Machine) -> Object<'_> {
    machine.push_globals();
    let object = Object::from_stack(machine, -1);
    machine.pop(1);
    object
}

/// Handle to the machine's host-private registry table
pub fn registry(machine: &dyn Machine) -> Object<'_> {
    machine.push_registry();
    let object = Object::from_stack(machine, -1);
    machine.pop(1);
    object
}

/// Handle to a fresh, empty table
pub fn new_table(machine: &dyn Machine) -> Object<'_> {
    machine.new_table();
    let object = Object::from_stack(machine, -1);
    machine.pop(1);
    object
}
