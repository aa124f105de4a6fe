//! wasmtab-gen: renders reference material for a wasmtab table set.
//!
//! - [`render_markdown`]: one section per table listing getters, setters and constructors.
//! - [`render_lua_module`]: a Lua file that gathers the registered classes into one module
//!   table, for hosts that load modules from `package.path` instead of the built-in preload.
//!
//! Both render tables in set order (definitions, then read tables) and fields in declaration
//! order.

use std::fmt::{self, Write};

use wasmtab_core::schema::{Arity, Field, LuaType, Origin, TableDef, TableSet, ValueType};

/// Markdown reference for every table in `set`.
pub fn render_markdown(set: &TableSet) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_markdown(&mut out, set);
    out
}

/// Lua source of a module returning every class in `set` under `module`.
pub fn render_lua_module(set: &TableSet, module: &str) -> String {
    let mut out = String::new();
    let _ = write_lua_module(&mut out, set, module);
    out
}

pub fn write_markdown<W: Write>(out: &mut W, set: &TableSet) -> fmt::Result {
    writeln!(out, "# Generated tables")?;
    writeln!(out)?;
    writeln!(out, "Every table below is a global class once the runtime is bootstrapped.")?;
    writeln!(
        out,
        "The classes are also gathered in the `wasm` module (`wasm.lua`, or the built-in preload):"
    )?;
    writeln!(out)?;
    writeln!(out, "```lua")?;
    writeln!(out, "local wasm = require(\"wasm\")")?;
    writeln!(out, "local limit = wasm.resizable_limit_t(1, 1, 16)")?;
    writeln!(out, "print(limit:set_maximum(32):maximum())")?;
    writeln!(out, "```")?;
    writeln!(out)?;
    for table in set.tables() {
        write_table_markdown(out, table)?;
    }
    Ok(())
}

fn write_table_markdown<W: Write>(out: &mut W, table: &TableDef) -> fmt::Result {
    let name = &table.name;
    writeln!(out, "## __{name}__:")?;
    writeln!(out)?;
    let origin = match table.origin {
        Origin::Read => "read table",
        Origin::Definition => "definition table",
    };
    writeln!(out, "_{origin}, tag `{}`_", table.tag)?;
    writeln!(out)?;

    writeln!(out, "### _getter fields_:")?;
    for field in &table.fields {
        writeln!(
            out,
            "{name}:{}() -- return type: {}<br/>",
            field.name,
            describe_field(table, field)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "### _setter fields_:")?;
    for field in &table.fields {
        writeln!(
            out,
            "{name}:{}(v) -- arg type: {}, returns the record<br/>",
            field.setter_name(),
            describe_field(table, field)
        )?;
    }
    writeln!(out)?;

    let args = argument_list(table);
    writeln!(out, "### _constructors_:")?;
    writeln!(out, "{name}.new({args}) -- missing args take defaults<br/>")?;
    writeln!(out, "{name}({args}) -- lazy constructor<br/>")?;
    writeln!(out)?;
    Ok(())
}

/// Human-readable type of a field, e.g. `table of uint8 (length in size)`.
pub fn describe_field(table: &TableDef, field: &Field) -> String {
    if let Some(condition) = &field.condition {
        let selector = &table.fields[condition.field].name;
        let cases = condition
            .cases
            .iter()
            .map(|c| format!("{} => {}", c.when, describe_single(c.lua_type, &c.value_type)))
            .collect::<Vec<_>>()
            .join(", ");
        return format!("by {selector} ({cases})");
    }

    let Some(value_type) = &field.value_type else {
        return field.lua_type.as_str().to_string();
    };
    match &field.arity {
        Arity::One => describe_single(field.lua_type, value_type),
        Arity::Fixed(n) => format!("table of {n} {}", value_type.describe()),
        Arity::Counted(index) => format!(
            "table of {} (length in {})",
            value_type.describe(),
            table.fields[*index].name
        ),
        Arity::Unbounded => format!("table of {}", value_type.describe()),
    }
}

fn describe_single(lua_type: LuaType, value_type: &ValueType) -> String {
    match value_type {
        ValueType::Table(name) => name.clone(),
        ValueType::Scalar(s) if s.as_str() == lua_type.as_str() => lua_type.as_str().to_string(),
        other => format!("{} ({})", lua_type.as_str(), other.describe()),
    }
}

fn argument_list(table: &TableDef) -> String {
    table
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn write_lua_module<W: Write>(out: &mut W, set: &TableSet, module: &str) -> fmt::Result {
    writeln!(out, "-- generated by wasmtab-gen; do not edit")?;
    writeln!(out, "local {module} = {{}}")?;
    writeln!(out)?;
    for table in set.tables() {
        writeln!(out, "-- {}({})", table.name, argument_list(table))?;
        writeln!(out, "{module}.{0} = {0}", table.name)?;
    }
    writeln!(out)?;
    writeln!(out, "return {module}")?;
    Ok(())
}
