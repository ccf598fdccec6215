//! Tether Engine
//!
//! A small embedded stack machine implementing the `tether_sdk::Machine`
//! contract:
//! - **Values**: nil, booleans, integers, floats, strings, tables, native
//!   functions (`value` module)
//! - **Tables**: hash tables with normalized keys (`table` module)
//! - **References**: slot table anchoring host-held values (`refs` module)
//! - **Calls**: frames, protected calls, message handlers and tracebacks
//!   (`engine` module)
//! - **Builtins**: `error`, `assert`, `type`, `tostring`, `pcall`, `select`,
//!   `rawequal`, `rawlen`
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_engine::{Engine, Machine};
//! use tether_sdk::globals;
//!
//! let engine = Engine::new();
//! engine.register("add", |engine| {
//!     let sum = engine.to_integer(1).unwrap_or(0) + engine.to_integer(2).unwrap_or(0);
//!     engine.push_integer(sum);
//!     Ok(1)
//! });
//!
//! let sum: i64 = globals(&engine).index("add").call((3, 4))?;
//! assert_eq!(sum, 7);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod builtins;

/// Engine limits and TOML loading
pub mod config;

/// Engine state, frames and protected calls
pub mod engine;

/// Raised errors and configuration errors
pub mod error;

/// Native functions
pub mod function;

/// Reference table
pub mod refs;

/// Hash tables
pub mod table;

/// Machine values
pub mod value;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ConfigError, Raised};
pub use function::{Function, NativeFn};
pub use refs::RefTable;
pub use table::Table;
pub use value::{FunctionRef, TableRef, Value};

pub use tether_sdk::{Fault, Kind, Machine, Ref, Results};
