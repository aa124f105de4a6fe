//! wasmtab-core: bootstraps a Lua 5.4 runtime preloaded with WebAssembly structure tables.
//!
//! Bootstrap is three steps, each consuming the result of the one before:
//! - create a runtime (`RuntimeHost::create_runtime`)
//! - load its standard library (`RuntimeHost::load_standard_library`)
//! - register the generated tables (`Runtime::register` with a `TableProvider`)
//!
//! Each generated table becomes a global class. Scripts build records with `T.new(...)` or
//! `T(...)`, read fields with `r:field()` and update them with `r:set_field(v)`.
//!
//! The table set is described in JSON (`tables/wasm.json`), compiled in, and validated once
//! on first use (`tables::builtin`).
//!
//! The `wasmtab` binary is a shim over [`run`]; embedders call [`bootstrap`] or
//! [`bootstrap_with`] directly and bring their own entry point.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod runtime;
pub mod schema;
pub mod tables;

pub use bootstrap::{bootstrap, bootstrap_with, run, run_with};
pub use config::RuntimeConfig;
pub use error::{BootstrapError, RegistrationError, SchemaError};
pub use runtime::{
    Created, GeneratedTables, LibraryLoaded, LuaHost, Ready, Runtime, RuntimeHost, TableProvider,
};
pub use schema::TableSet;
