//! The built-in WebAssembly table set.
//!
//! The definitions are compiled into the binary from `tables/wasm.json` and resolved once,
//! on first use. They describe the structures of the WebAssembly binary format: one `W_*`
//! table per module section, plus the entry types those sections hold.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::error::SchemaError;
use crate::schema::TableSet;

/// Source of the built-in definitions.
pub const WASM_TABLES_JSON: &str = include_str!("../tables/wasm.json");

lazy_static! {
    static ref BUILTIN: Result<Arc<TableSet>, SchemaError> =
        TableSet::from_json(WASM_TABLES_JSON).map(Arc::new);
}

/// The built-in table set.
pub fn builtin() -> Result<Arc<TableSet>, SchemaError> {
    BUILTIN.clone()
}
