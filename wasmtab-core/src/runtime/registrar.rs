//! Table registration.
//!
//! [`TableProvider`] is the capability the bootstrap depends on: given a runtime with its
//! standard library loaded, put a fixed set of names into the global namespace.
//! [`GeneratedTables`] is the provider for a [`TableSet`]; each table becomes a class:
//!
//! ```text
//! T.new(v1, ..., vn)    record constructor, values in field order
//! T(v1, ..., vn)        lazy constructor (`__call`), same as `T.new`
//! T.f(r)   / r:f()      getter
//! T.set_f(r, v) / r:set_f(v)   validating setter, returns `r`
//! ```

use std::sync::Arc;

use log::{debug, info, warn};
use mlua::{AnyUserData, Lua, MultiValue, Table, Value, Variadic};

use crate::error::{RegistrationError, SchemaError};
use crate::record::{self, class_key};
use crate::schema::{TableDef, TableSet};
use crate::tables;

use super::runtime::{LibraryLoaded, Runtime};

/// Injects named values into a runtime's global namespace.
pub trait TableProvider {
    /// Globals this provider defines.
    fn names(&self) -> Vec<String>;

    /// Define every name in [`names`](Self::names). Nothing is defined if a name is taken.
    fn inject(&self, runtime: &Runtime<LibraryLoaded>) -> Result<(), RegistrationError>;
}

/// Provider for a generated [`TableSet`].
#[derive(Clone, Debug)]
pub struct GeneratedTables {
    set: Arc<TableSet>,
    module: Option<String>,
}

impl GeneratedTables {
    pub fn new(set: Arc<TableSet>) -> Self {
        Self { set, module: None }
    }

    /// Provider for the built-in WebAssembly tables.
    pub fn builtin() -> Result<Self, SchemaError> {
        tables::builtin().map(Self::new)
    }

    /// Also make the classes available as `require(name)`.
    pub fn with_module(mut self, name: impl Into<String>) -> Self {
        self.module = Some(name.into());
        self
    }

    pub fn table_set(&self) -> &Arc<TableSet> {
        &self.set
    }
}

impl TableProvider for GeneratedTables {
    fn names(&self) -> Vec<String> {
        self.set.names().map(str::to_string).collect()
    }

    fn inject(&self, runtime: &Runtime<LibraryLoaded>) -> Result<(), RegistrationError> {
        let lua = runtime.lua();
        let globals = lua.globals();

        // Checked up front so a collision leaves the namespace untouched.
        for name in self.set.names() {
            if globals.contains_key(name)? {
                return Err(RegistrationError::NameCollision(name.to_string()));
            }
        }

        let mut classes = Vec::with_capacity(self.set.len());
        for table in self.set.tables() {
            classes.push((table.name.as_str(), define_class(lua, table)?));
            debug!("defined class {}", table.name);
        }

        let module = lua.create_table()?;
        for (name, class) in classes {
            globals.raw_set(name, class.clone())?;
            module.raw_set(name, class)?;
        }

        if let Some(name) = &self.module {
            preload_module(lua, name, module)?;
        }

        info!("registered {} tables", self.set.len());
        Ok(())
    }
}

fn define_class(lua: &Lua, table: &Arc<TableDef>) -> mlua::Result<Table> {
    let class = lua.create_table()?;

    let def = Arc::clone(table);
    class.raw_set(
        "new",
        lua.create_function(move |lua, args: Variadic<Value>| record::construct(lua, &def, args))?,
    )?;

    for (index, field) in table.fields.iter().enumerate() {
        let def = Arc::clone(table);
        class.raw_set(
            field.name.as_str(),
            lua.create_function(move |lua, ud: AnyUserData| {
                record::get_field(lua, &def, index, ud)
            })?,
        )?;

        let def = Arc::clone(table);
        class.raw_set(
            field.setter_name(),
            lua.create_function(move |lua, (ud, value): (AnyUserData, Value)| {
                record::set_field(lua, &def, index, ud, value)
            })?,
        )?;
    }

    let meta = lua.create_table()?;
    let def = Arc::clone(table);
    meta.raw_set(
        "__call",
        lua.create_function(move |lua, (_class, args): (Table, Variadic<Value>)| {
            record::construct(lua, &def, args)
        })?,
    )?;
    meta.raw_set("__name", table.name.as_str())?;
    // Hides the metatable from scripts and blocks `setmetatable` on the class.
    meta.raw_set("__metatable", table.name.as_str())?;
    class.set_metatable(Some(meta));

    lua.set_named_registry_value(&class_key(&table.name), class.clone())?;
    Ok(class)
}

/// Register `package.preload[name]`. Skipped when the package library is not loaded.
fn preload_module(lua: &Lua, name: &str, module: Table) -> mlua::Result<()> {
    let Some(package) = lua.globals().get::<Option<Table>>("package")? else {
        warn!("package library not loaded; `require(\"{name}\")` will be unavailable");
        return Ok(());
    };
    let preload: Table = package.get("preload")?;
    let loader = lua.create_function(move |_, _: MultiValue| Ok(module.clone()))?;
    preload.set(name, loader)?;
    debug!("module `{name}` preloaded");
    Ok(())
}
