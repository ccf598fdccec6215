//! Tether SDK - host-side handles to values inside an embedded stack machine
//!
//! This crate lets native code hold, index and call machine values without
//! managing the machine's evaluation stack or reference table by hand. It
//! programs against the [`Machine`] trait only; the machine itself (for
//! example `tether-engine`) is an external collaborator.
//!
//! # Example
//!
//! ```ignore
//! use tether_sdk::{globals, new_table};
//!
//! let table = new_table(&engine);
//! table.index("x").set(42)?;
//! assert_eq!(table.index("x").value(0), 42);
//!
//! let sum: i64 = globals(&engine).index("add").call((3, 4))?;
//! assert_eq!(sum, 7);
//! ```
//!
//! # Modules
//!
//! - [`guard`]: stack depth restoration on every exit path
//! - [`marshal`]: statically dispatched native ↔ machine conversions
//! - [`object`]: owning value handles
//! - [`node`]: deferred `table[key]` reads and writes
//! - [`machine`]: the collaborator contract a machine implements

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod call;
pub mod error;
pub mod guard;
pub mod machine;
pub mod marshal;
pub mod node;
pub mod object;

#[cfg(test)]
mod test_machine;

pub use error::{BindResult, Error};
pub use guard::{StackGuard, StackPop};
pub use machine::{Fault, Kind, Machine, Ref, Results};
pub use marshal::{CallReturn, FromStack, Nil, PushArgs, ToStack};
pub use node::Node;
pub use object::{globals, new_table, registry, Object};
