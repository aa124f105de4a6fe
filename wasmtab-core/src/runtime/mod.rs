//! Lua runtime glue for wasmtab-core.
//!
//! Responsibilities:
//! - Create a Lua state and load its standard library (`runtime::LuaHost`).
//! - Track how far a state is through bootstrap in its type (`Runtime<Created>`,
//!   `Runtime<LibraryLoaded>`, `Runtime<Ready>`).
//! - Inject table sets into a state through the `TableProvider` capability (`registrar`).
//!
//! The state is released when the `Runtime` is dropped, on success and failure paths alike.

pub mod registrar;
pub mod runtime;

pub use registrar::{GeneratedTables, TableProvider};
pub use runtime::{Created, LibraryLoaded, LuaHost, Ready, Runtime, RuntimeHost};
