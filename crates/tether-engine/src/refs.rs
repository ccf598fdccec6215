//! Reference table
//!
//! Anchors values held by the host so they outlive their stack slots. Released
//! ids go on a free list and are handed out again before the table grows.

use tether_sdk::Ref;

use crate::value::Value;

/// Slot storage for anchored values
#[derive(Default)]
pub struct RefTable {
    slots: Vec<Option<Value>>,
    free: Vec<u32>,
}

impl RefTable {
    /// Create an empty reference table
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor `value`. Nil is never stored.
    pub fn anchor(&mut self, value: Value) -> Ref {
        if value.is_nil() {
            return Ref::Nil;
        }

        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(value);
                id
            }
            None => {
                self.slots.push(Some(value));
                (self.slots.len() - 1) as u32
            }
        };

        tracing::trace!(id, "reference anchored");
        Ref::Slot(id)
    }

    /// Release a slot. Releasing `Ref::Nil` or an already free id is a no-op.
    pub fn release(&mut self, reference: Ref) {
        let Ref::Slot(id) = reference else {
            return;
        };

        if let Some(slot) = self.slots.get_mut(id as usize) {
            if slot.take().is_some() {
                self.free.push(id);
                tracing::trace!(id, "reference released");
            }
        }
    }

    /// The anchored value (nil for `Ref::Nil` and released ids)
    pub fn get(&self, reference: Ref) -> Value {
        match reference {
            Ref::Nil => Value::Nil,
            Ref::Slot(id) => self
                .slots
                .get(id as usize)
                .and_then(|slot| slot.clone())
                .unwrap_or_default(),
        }
    }

    /// Number of live anchors
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of slots ever allocated (live + free)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
