//! Runtime instances and the host that creates them.
//!
//! A [`Runtime`] owns one Lua state. Its type parameter records the bootstrap step it has
//! reached, so each step only accepts the output of the step before it:
//!
//! ```text
//! RuntimeHost::create_runtime   -> Runtime<Created>
//! Runtime::open_libraries       -> Runtime<LibraryLoaded>
//! Runtime::register             -> Runtime<Ready>
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::panic;

use log::debug;
use mlua::{FromLuaMulti, Lua, LuaOptions, StdLib, Value};

use crate::config::RuntimeConfig;
use crate::error::BootstrapError;

use super::registrar::TableProvider;

/// Fresh state; only the base library may be present.
pub struct Created;
/// Standard library loaded; tables not yet registered.
pub struct LibraryLoaded;
/// Tables registered; scripts may run.
pub struct Ready;

/// Owns the Lua state and closes it on drop.
struct Instance {
    lua: Lua,
}

impl Drop for Instance {
    fn drop(&mut self) {
        debug!(
            "releasing runtime instance ({} bytes in use)",
            self.lua.used_memory()
        );
    }
}

/// A Lua runtime at bootstrap step `S`.
pub struct Runtime<S = Ready> {
    instance: Instance,
    _state: PhantomData<S>,
}

impl<S> Runtime<S> {
    pub fn lua(&self) -> &Lua {
        &self.instance.lua
    }

    /// Sorted names of every string key in the global namespace.
    pub fn global_names(&self) -> mlua::Result<Vec<String>> {
        let mut names = Vec::new();
        for pair in self.lua().globals().pairs::<Value, Value>() {
            let (key, _) = pair?;
            if let Value::String(s) = key {
                names.push(s.to_str()?.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn advance<T>(self) -> Runtime<T> {
        Runtime {
            instance: self.instance,
            _state: PhantomData,
        }
    }
}

impl Runtime<Created> {
    pub fn new(lua: Lua) -> Self {
        Runtime {
            instance: Instance { lua },
            _state: PhantomData,
        }
    }

    /// Load the given standard libraries into the state.
    pub fn open_libraries(self, libraries: StdLib) -> Result<Runtime<LibraryLoaded>, BootstrapError> {
        self.lua()
            .load_std_libs(libraries)
            .map_err(BootstrapError::StandardLibrary)?;
        Ok(self.advance())
    }
}

impl Runtime<LibraryLoaded> {
    /// Inject a provider's tables. On failure the runtime is dropped with the error.
    pub fn register<P>(self, provider: &P) -> Result<Runtime<Ready>, BootstrapError>
    where
        P: TableProvider + ?Sized,
    {
        provider.inject(&self)?;
        Ok(self.advance())
    }
}

impl Runtime<Ready> {
    /// Run a chunk for its side effects.
    pub fn exec(&self, source: &str) -> mlua::Result<()> {
        self.lua().load(source).exec()
    }

    /// Run a chunk and convert its result.
    pub fn eval<R: FromLuaMulti>(&self, source: &str) -> mlua::Result<R> {
        self.lua().load(source).eval()
    }
}

/// Creates runtimes and loads their standard library.
///
/// `LuaHost` is the production implementation; harnesses wrap or replace it to observe or
/// fail individual steps.
pub trait RuntimeHost {
    fn create_runtime(&mut self) -> Result<Runtime<Created>, BootstrapError>;

    fn load_standard_library(
        &mut self,
        runtime: Runtime<Created>,
    ) -> Result<Runtime<LibraryLoaded>, BootstrapError>;
}

/// Host backed by a vendored Lua 5.4.
///
/// The configured memory limit is applied once the standard library is loaded; a limit below
/// what the loaded state already uses is a `StandardLibrary` error.
#[derive(Clone, Debug, Default)]
pub struct LuaHost {
    config: RuntimeConfig,
}

impl LuaHost {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl RuntimeHost for LuaHost {
    fn create_runtime(&mut self) -> Result<Runtime<Created>, BootstrapError> {
        // mlua panics instead of returning an error when the state itself cannot be allocated.
        let lua = panic::catch_unwind(|| Lua::new_with(StdLib::NONE, LuaOptions::default()))
            .map_err(|payload| BootstrapError::Allocation(panic_message(payload.as_ref())))?
            .map_err(creation_error)?;
        Ok(Runtime::new(lua))
    }

    fn load_standard_library(
        &mut self,
        runtime: Runtime<Created>,
    ) -> Result<Runtime<LibraryLoaded>, BootstrapError> {
        let runtime = runtime.open_libraries(self.config.libraries)?;
        if let Some(limit) = self.config.memory_limit {
            apply_memory_limit(runtime.lua(), limit)?;
        }
        Ok(runtime)
    }
}

fn apply_memory_limit(lua: &Lua, limit: usize) -> Result<(), BootstrapError> {
    let used = lua.used_memory();
    if limit < used {
        return Err(BootstrapError::StandardLibrary(mlua::Error::MemoryError(format!(
            "memory limit of {limit} bytes is below the {used} bytes already in use"
        ))));
    }
    lua.set_memory_limit(limit)
        .map_err(BootstrapError::StandardLibrary)?;
    debug!("memory limit set to {limit} bytes ({used} in use)");
    Ok(())
}

fn creation_error(err: mlua::Error) -> BootstrapError {
    match err {
        mlua::Error::MemoryError(msg) => BootstrapError::Allocation(msg),
        other => BootstrapError::Runtime(other),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "runtime state could not be allocated".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_runtime_has_no_standard_library() {
        let runtime = LuaHost::default().create_runtime().unwrap();
        let globals = runtime.lua().globals();
        assert!(!globals.contains_key("string").unwrap());
        assert!(!globals.contains_key("math").unwrap());
    }

    #[test]
    fn opening_libraries_installs_them() {
        let runtime = LuaHost::default().create_runtime().unwrap();
        let runtime = runtime.open_libraries(StdLib::STRING | StdLib::MATH).unwrap();
        let names = runtime.global_names().unwrap();
        assert!(names.iter().any(|n| n == "string"));
        assert!(names.iter().any(|n| n == "math"));
        assert!(!names.iter().any(|n| n == "io"));
    }

    #[test]
    fn unsafe_libraries_are_refused() {
        let runtime = LuaHost::default().create_runtime().unwrap();
        let err = runtime.open_libraries(StdLib::DEBUG).err().unwrap();
        assert!(matches!(err, BootstrapError::StandardLibrary(_)));
    }

    #[test]
    fn memory_errors_are_allocation_failures() {
        let err = creation_error(mlua::Error::MemoryError("out of memory".into()));
        assert!(matches!(err, BootstrapError::Allocation(_)));
        let err = creation_error(mlua::Error::runtime("boom"));
        assert!(matches!(err, BootstrapError::Runtime(_)));
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(&"no memory"), "no memory");
        assert_eq!(panic_message(&String::from("boom")), "boom");
        assert_eq!(panic_message(&7u8), "runtime state could not be allocated");
    }

    #[test]
    fn tiny_memory_limit_fails_library_loading() {
        let mut host = LuaHost::new(RuntimeConfig::new().with_memory_limit(1));
        let runtime = host.create_runtime().unwrap();
        let err = host.load_standard_library(runtime).err().unwrap();
        assert!(matches!(
            err,
            BootstrapError::StandardLibrary(mlua::Error::MemoryError(_))
        ));
    }

    #[test]
    fn memory_limit_applies_to_scripts() {
        let mut host = LuaHost::new(RuntimeConfig::new().with_memory_limit(4 << 20));
        let runtime = host.create_runtime().unwrap();
        let runtime = host.load_standard_library(runtime).unwrap();
        let result = runtime
            .lua()
            .load("local s = string.rep('x', 16 << 20)")
            .exec();
        assert!(matches!(result, Err(mlua::Error::MemoryError(_))));
    }
}
