//! Records: the userdata behind every generated table.
//!
//! All tables share one userdata type, [`Record`], which only remembers its table
//! definition. Field values live in a plain Lua table attached as the userdata's user value,
//! so records may reference other records without Rust-side reference cycles.
//!
//! Method lookup (`r:field()`, `r:set_field(v)`) goes through `__index`, which forwards to the
//! class table registered for the record's table under [`class_key`].

use std::sync::Arc;

use mlua::{AnyUserData, Error, Lua, MetaMethod, Table, UserData, UserDataMethods, Value, Variadic};

use crate::schema::{Arity, Field, LuaType, ScalarType, TableDef, ValueType};

/// Registry key of the class table for `name`.
pub fn class_key(name: &str) -> String {
    format!("wasmtab.class.{name}")
}

pub struct Record {
    table: Arc<TableDef>,
}

impl Record {
    pub fn table(&self) -> &TableDef {
        &self.table
    }
}

impl UserData for Record {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_function(
            MetaMethod::Index,
            |lua, (ud, key): (AnyUserData, Value)| {
                let name = ud.borrow::<Record>()?.table.name.clone();
                let class: Table = lua.named_registry_value(&class_key(&name))?;
                class.raw_get::<Value>(key)
            },
        );

        methods.add_meta_function(MetaMethod::ToString, |_, ud: AnyUserData| describe(&ud));
    }
}

/// `T.new(...)` / `T(...)`: positional arguments in field order.
pub(crate) fn construct(
    lua: &Lua,
    table: &Arc<TableDef>,
    args: Variadic<Value>,
) -> mlua::Result<AnyUserData> {
    let values = lua.create_table()?;
    let arg = |index: usize| args.get(index).cloned().unwrap_or(Value::Nil);
    let mut provided = vec![false; table.fields.len()];

    for (index, field) in table.fields.iter().enumerate() {
        if field.lua_type == LuaType::Conditional {
            continue;
        }
        let value = arg(index);
        let value = if value.is_nil() {
            default_value(field)
        } else {
            provided[index] = true;
            check_field(lua, &context(table, field), field, value)?
        };
        values.raw_set(field.name.as_str(), value)?;
    }

    // A counted sequence without its count fills the count in.
    for field in &table.fields {
        let Arity::Counted(count_index) = field.arity else {
            continue;
        };
        let Some(sequence) = values.raw_get::<Option<Table>>(field.name.as_str())? else {
            continue;
        };
        if provided[count_index] {
            check_count(table, field, &values, sequence.raw_len())?;
        } else {
            let count_field = &table.fields[count_index];
            let count = check_field(
                lua,
                &context(table, count_field),
                count_field,
                Value::Integer(sequence.raw_len() as i64),
            )?;
            values.raw_set(count_field.name.as_str(), count)?;
            provided[count_index] = true;
        }
    }

    // Derived counts may also be selectors, so conditionals go last.
    for (index, field) in table.fields.iter().enumerate() {
        if field.lua_type != LuaType::Conditional {
            continue;
        }
        let value = arg(index);
        if !value.is_nil() {
            let value = check_conditional(table, field, &values, value)?;
            values.raw_set(field.name.as_str(), value)?;
        }
    }

    let ud = lua.create_userdata(Record {
        table: Arc::clone(table),
    })?;
    ud.set_user_value(values)?;
    Ok(ud)
}

/// `T.field(r)` / `r:field()`. Sequences come back as fresh tables.
pub(crate) fn get_field(
    lua: &Lua,
    table: &TableDef,
    index: usize,
    ud: AnyUserData,
) -> mlua::Result<Value> {
    let values = receiver(table, &ud)?;
    match values.raw_get::<Value>(table.fields[index].name.as_str())? {
        Value::Table(sequence) => copy_sequence(lua, &sequence).map(Value::Table),
        value => Ok(value),
    }
}

/// `T.set_field(r, v)` / `r:set_field(v)`. Returns the record for chaining.
pub(crate) fn set_field(
    lua: &Lua,
    table: &TableDef,
    index: usize,
    ud: AnyUserData,
    value: Value,
) -> mlua::Result<AnyUserData> {
    let values = receiver(table, &ud)?;
    let field = &table.fields[index];
    let ctx = context(table, field);

    let value = if value.is_nil() {
        match field.lua_type {
            LuaType::Integer | LuaType::Number | LuaType::Boolean => {
                return Err(Error::runtime(format!("{ctx}: value cannot be nil")));
            }
            _ => Value::Nil,
        }
    } else if field.lua_type == LuaType::Conditional {
        check_conditional(table, field, &values, value)?
    } else {
        check_field(lua, &ctx, field, value)?
    };

    if let Value::Table(sequence) = &value {
        check_count(table, field, &values, sequence.raw_len())?;
    }

    let previous = values.raw_get::<Value>(field.name.as_str())?;
    values.raw_set(field.name.as_str(), value.clone())?;

    if !same_integer(&previous, &value) {
        clear_stale_conditionals(table, index, &values)?;
    }
    Ok(ud)
}

fn context(table: &TableDef, field: &Field) -> String {
    format!("{}.{}", table.name, field.name)
}

fn receiver(table: &TableDef, ud: &AnyUserData) -> mlua::Result<Table> {
    let matches = ud.borrow::<Record>()?.table.name == table.name;
    if !matches {
        return Err(Error::runtime(format!("expected a {} record", table.name)));
    }
    ud.user_value::<Table>()
}

fn default_value(field: &Field) -> Value {
    match (field.lua_type, &field.arity) {
        (LuaType::Integer, Arity::One) => Value::Integer(0),
        (LuaType::Number, Arity::One) => Value::Number(0.0),
        (LuaType::Boolean, Arity::One) => Value::Boolean(false),
        _ => Value::Nil,
    }
}

fn type_error(ctx: &str, expected: &str, value: &Value) -> Error {
    Error::runtime(format!(
        "{ctx}: expected {expected}, got {}",
        value.type_name()
    ))
}

fn check_field(lua: &Lua, ctx: &str, field: &Field, value: Value) -> mlua::Result<Value> {
    let Some(value_type) = field.value_type.as_ref() else {
        return Err(Error::runtime(format!("{ctx}: field has no declared type")));
    };
    if field.arity.is_sequence() {
        check_sequence(lua, ctx, &field.arity, value_type, value).map(Value::Table)
    } else {
        check_single(ctx, field.lua_type, value_type, value)
    }
}

fn check_single(
    ctx: &str,
    lua_type: LuaType,
    value_type: &ValueType,
    value: Value,
) -> mlua::Result<Value> {
    match lua_type {
        LuaType::Integer => {
            let scalar = match value_type {
                ValueType::Scalar(s) => Some(*s),
                _ => None,
            };
            let i = to_integer(&value, scalar == Some(ScalarType::Bool))
                .ok_or_else(|| type_error(ctx, "integer", &value))?;
            if let Some((lo, hi)) = scalar.and_then(ScalarType::integer_bounds) {
                if i < lo || i > hi {
                    return Err(Error::runtime(format!(
                        "{ctx}: {i} is out of range for {}",
                        value_type.describe()
                    )));
                }
            }
            Ok(Value::Integer(i))
        }
        LuaType::Number => match value {
            Value::Integer(i) => Ok(Value::Number(i as f64)),
            Value::Number(_) => Ok(value),
            _ => Err(type_error(ctx, "number", &value)),
        },
        LuaType::String => match value {
            Value::String(_) => Ok(value),
            _ => Err(type_error(ctx, "string", &value)),
        },
        LuaType::Boolean => match value {
            Value::Boolean(_) => Ok(value),
            _ => Err(type_error(ctx, "boolean", &value)),
        },
        LuaType::LightUserData => match value {
            Value::LightUserData(_) | Value::Nil => Ok(value),
            _ => Err(type_error(ctx, "lightuserdata", &value)),
        },
        LuaType::Table => match value_type {
            ValueType::Table(name) => check_record(ctx, name, value),
            _ => Err(type_error(ctx, value_type.describe(), &value)),
        },
        LuaType::Conditional => Err(Error::runtime(format!(
            "{ctx}: nested conditional values are not supported"
        ))),
    }
}

fn to_integer(value: &Value, allow_bool: bool) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Number(n) if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 => {
            Some(*n as i64)
        }
        Value::Boolean(b) if allow_bool => Some(*b as i64),
        _ => None,
    }
}

fn check_record(ctx: &str, expected: &str, value: Value) -> mlua::Result<Value> {
    let actual = match &value {
        Value::UserData(ud) => ud.borrow::<Record>().ok().map(|r| r.table.name.clone()),
        _ => None,
    };
    match actual {
        Some(name) if name == expected => Ok(value),
        Some(name) => Err(Error::runtime(format!(
            "{ctx}: expected {expected}, got {name}"
        ))),
        None => Err(type_error(ctx, expected, &value)),
    }
}

/// Validate a Lua sequence element by element and return a private copy of it.
fn check_sequence(
    lua: &Lua,
    ctx: &str,
    arity: &Arity,
    value_type: &ValueType,
    value: Value,
) -> mlua::Result<Table> {
    let source = match value {
        Value::Table(t) => t,
        other => return Err(type_error(ctx, "table", &other)),
    };

    let len = source.raw_len();
    if let Arity::Fixed(expected) = arity {
        if len != *expected {
            return Err(Error::runtime(format!(
                "{ctx}: expected {expected} values, got {len}"
            )));
        }
    }

    let items = lua.create_table()?;
    for i in 1..=len {
        let item = source.raw_get::<Value>(i)?;
        let item_ctx = format!("{ctx}[{i}]");
        let item = match value_type {
            ValueType::Scalar(s) => check_single(&item_ctx, s.natural_lua_type(), value_type, item)?,
            ValueType::Table(name) => check_record(&item_ctx, name, item)?,
            ValueType::Opaque(name) => return Err(type_error(&item_ctx, name, &item)),
        };
        items.raw_set(i, item)?;
    }
    Ok(items)
}

fn check_count(table: &TableDef, field: &Field, values: &Table, len: usize) -> mlua::Result<()> {
    let Arity::Counted(count_index) = field.arity else {
        return Ok(());
    };
    let count_field = &table.fields[count_index];
    let count = values
        .raw_get::<Option<i64>>(count_field.name.as_str())?
        .unwrap_or(0);
    if count != len as i64 {
        return Err(Error::runtime(format!(
            "{}: `{}` is {count} but {len} values were given",
            context(table, field),
            count_field.name
        )));
    }
    Ok(())
}

fn check_conditional(
    table: &TableDef,
    field: &Field,
    values: &Table,
    value: Value,
) -> mlua::Result<Value> {
    let ctx = context(table, field);
    let Some(condition) = field.condition.as_ref() else {
        return Err(Error::runtime(format!("{ctx}: field has no condition")));
    };
    let selector_field = &table.fields[condition.field];
    let selector = values
        .raw_get::<Option<i64>>(selector_field.name.as_str())?
        .ok_or_else(|| {
            Error::runtime(format!("{ctx}: `{}` must be set first", selector_field.name))
        })?;
    let case = condition.case_for(selector).ok_or_else(|| {
        Error::runtime(format!(
            "{ctx}: no case for {} = {selector}",
            selector_field.name
        ))
    })?;
    check_single(&ctx, case.lua_type, &case.value_type, value)
}

/// Drop conditional values whose selector (the field at `index`) now picks another case.
fn clear_stale_conditionals(table: &TableDef, index: usize, values: &Table) -> mlua::Result<()> {
    let selector = match values.raw_get::<Value>(table.fields[index].name.as_str())? {
        Value::Integer(i) => Some(i),
        _ => None,
    };
    for field in &table.fields {
        let Some(condition) = field.condition.as_ref() else {
            continue;
        };
        if condition.field != index {
            continue;
        }
        let current = values.raw_get::<Value>(field.name.as_str())?;
        if current.is_nil() {
            continue;
        }
        let ctx = context(table, field);
        let still_valid = selector
            .and_then(|s| condition.case_for(s))
            .is_some_and(|case| {
                check_single(&ctx, case.lua_type, &case.value_type, current.clone()).is_ok()
            });
        if !still_valid {
            log::debug!("{ctx}: cleared after its selector changed");
            values.raw_set(field.name.as_str(), Value::Nil)?;
        }
    }
    Ok(())
}

fn same_integer(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Integer(x), Value::Integer(y)) if x == y)
}

fn copy_sequence(lua: &Lua, source: &Table) -> mlua::Result<Table> {
    let len = source.raw_len();
    let copy = lua.create_table()?;
    for i in 1..=len {
        copy.raw_set(i, source.raw_get::<Value>(i)?)?;
    }
    Ok(copy)
}

fn describe(ud: &AnyUserData) -> mlua::Result<String> {
    let record = ud.borrow::<Record>()?;
    let values = ud.user_value::<Table>()?;
    let mut parts = Vec::with_capacity(record.table.fields.len());
    for field in &record.table.fields {
        let value = values.raw_get::<Value>(field.name.as_str())?;
        parts.push(format!("{} = {}", field.name, render(&value)));
    }
    Ok(format!("{} {{ {} }}", record.table.name, parts.join(", ")))
}

fn render(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{:?}", s.to_string_lossy()),
        Value::Table(t) => format!("<{} values>", t.raw_len()),
        Value::UserData(ud) => ud
            .borrow::<Record>()
            .map(|r| r.table.name.clone())
            .unwrap_or_else(|_| "userdata".to_string()),
        other => other.type_name().to_string(),
    }
}
