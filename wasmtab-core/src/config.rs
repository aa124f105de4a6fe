//! Runtime configuration.
//!
//! Limits and library selection for a bootstrapped runtime. Configuration only describes the
//! runtime; `runtime::LuaHost` applies it.

use mlua::StdLib;

/// Module name under which the generated tables can be `require`d.
pub const DEFAULT_MODULE_NAME: &str = "wasm";

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Standard libraries loaded before table registration.
    pub libraries: StdLib,

    /// Upper bound on Lua heap usage in bytes; `None` leaves it unbounded.
    pub memory_limit: Option<usize>,

    /// When set, `require(<name>)` returns a table of every generated class.
    pub module_name: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            libraries: StdLib::ALL_SAFE,
            memory_limit: None,
            module_name: Some(DEFAULT_MODULE_NAME.to_string()),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_libraries(mut self, libraries: StdLib) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    pub fn with_module_name(mut self, name: Option<&str>) -> Self {
        self.module_name = name.map(str::to_string);
        self
    }
}
