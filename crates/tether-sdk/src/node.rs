//! Node - deferred `table[key]` expression
//!
//! A `Node` owns a handle to the indexed table and the key, and does nothing
//! until it is read ([`Node::get`]) or written ([`Node::set`]). Reads produce a
//! fresh [`Object`]; writes mutate the table in place without anchoring
//! anything in the reference table.

use crate::error::{BindResult, Error};
use crate::guard::StackGuard;
use crate::machine::Machine;
use crate::marshal::{CallReturn, FromStack, PushArgs, ToStack};
use crate::object::Object;

/// Deferred table index
pub struct Node<'m, K> {
    table: Object<'m>,
    key: K,
}

impl<'m, K: ToStack> Node<'m, K> {
    pub(crate) fn new(table: Object<'m>, key: K) -> Self {
        Self { table, key }
    }

    /// The key this node indexes with
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Read `table[key]` into a new handle.
    ///
    /// Reading through a non-table yields a nil handle; reading through an
    /// invalid table handle yields an invalid handle.
    pub fn get(&self) -> Object<'m> {
        let Some(machine) = self.table.machine() else {
            return Object::invalid();
        };
        let _guard = StackGuard::new(machine);

        self.table.push();
        self.key.push(machine);
        machine.get_table(-2);

        Object::from_stack(machine, -1)
    }

    /// Read `table[key]` and convert it, or return `default`
    pub fn value<T: FromStack<'m>>(&self, default: T) -> T {
        self.get().value(default)
    }

    /// Read `table[key]` and convert it, falling back to `T::default()`
    pub fn get_as<T: FromStack<'m> + Default>(&self) -> T {
        self.get().get()
    }

    /// Write `table[key] = value`. Net stack effect is zero.
    pub fn set<V: ToStack>(&self, value: V) -> BindResult<()> {
        let machine = self.table.machine().ok_or(Error::InvalidHandle)?;
        let _guard = StackGuard::new(machine);

        self.table.push();
        self.key.push(machine);
        value.push(machine);
        machine.set_table(-3)?;

        machine.pop(1);
        Ok(())
    }

    /// Read this node, then index the result. Never cached.
    pub fn index<K2: ToStack>(&self, key: K2) -> Node<'m, K2> {
        Node::new(self.get(), key)
    }

    /// Read this node and call the result
    pub fn call<R, A>(&self, args: A) -> BindResult<R>
    where
        R: CallReturn<'m>,
        A: PushArgs,
    {
        self.get().call(args)
    }

    /// Read this node and call the method `name` on the result
    pub fn call_field<R, A>(&self, name: &str, args: A) -> BindResult<R>
    where
        R: CallReturn<'m>,
        A: PushArgs,
    {
        self.get().call_field(name, args)
    }
}

impl<K: ToStack> ToStack for Node<'_, K> {
    fn push(&self, machine: &dyn Machine) {
        ToStack::push(&self.get(), machine);
    }
}
