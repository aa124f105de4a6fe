//! Table definitions.
//!
//! A table set is a JSON document with two lists:
//! - `read`: top-level structures (one per WebAssembly section),
//! - `definition`: structures those reference.
//!
//! Each table becomes a Lua class and each field a getter plus a `set_` setter (see
//! `crate::record`). Raw documents are deserialized with serde and then resolved into a
//! [`TableSet`]: `self::<tag>` references are bound to tables or sibling fields, and every
//! field's Lua type is checked against its declared type.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::SchemaError;

/// Prefix of references to another table's tag or a sibling field's tag.
const SELF_PREFIX: &str = "self::";

/// `count` value marking a sequence without a length field.
const UNBOUNDED_COUNT: &str = "*";

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
    "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

// --- Raw (serde) form ---

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTableSet {
    #[serde(default)]
    pub read: Vec<RawTable>,
    #[serde(default)]
    pub definition: Vec<RawTable>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTable {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawField {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    pub luatype: LuaType,
    #[serde(default)]
    pub count: Option<RawCount>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub cases: Vec<RawCase>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Fixed(u32),
    Reference(String),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCase {
    pub when: i64,
    #[serde(rename = "type")]
    pub ty: String,
    pub luatype: LuaType,
}

// --- Resolved form ---

/// How a field is represented on the Lua side.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuaType {
    Integer,
    Number,
    String,
    Boolean,
    LightUserData,
    Table,
    Conditional,
}

impl LuaType {
    pub fn as_str(self) -> &'static str {
        match self {
            LuaType::Integer => "integer",
            LuaType::Number => "number",
            LuaType::String => "string",
            LuaType::Boolean => "boolean",
            LuaType::LightUserData => "lightuserdata",
            LuaType::Table => "table",
            LuaType::Conditional => "conditional",
        }
    }
}

/// Scalar C-level types a field may declare.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Bool,
    UChar,
    SChar,
    String,
}

impl ScalarType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "int8" => ScalarType::Int8,
            "uint8" => ScalarType::UInt8,
            "int16" => ScalarType::Int16,
            "uint16" => ScalarType::UInt16,
            "int32" => ScalarType::Int32,
            "uint32" => ScalarType::UInt32,
            "int64" => ScalarType::Int64,
            "uint64" => ScalarType::UInt64,
            "float" => ScalarType::Float,
            "double" => ScalarType::Double,
            "bool" => ScalarType::Bool,
            "uchar" => ScalarType::UChar,
            "schar" => ScalarType::SChar,
            "string" => ScalarType::String,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::Int8 => "int8",
            ScalarType::UInt8 => "uint8",
            ScalarType::Int16 => "int16",
            ScalarType::UInt16 => "uint16",
            ScalarType::Int32 => "int32",
            ScalarType::UInt32 => "uint32",
            ScalarType::Int64 => "int64",
            ScalarType::UInt64 => "uint64",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Bool => "bool",
            ScalarType::UChar => "uchar",
            ScalarType::SChar => "schar",
            ScalarType::String => "string",
        }
    }

    /// Inclusive range for integral types. Lua integers are 64-bit signed, so `uint64`
    /// tops out at `i64::MAX`.
    pub fn integer_bounds(self) -> Option<(i64, i64)> {
        Some(match self {
            ScalarType::Int8 | ScalarType::SChar => (i8::MIN as i64, i8::MAX as i64),
            ScalarType::UInt8 | ScalarType::UChar => (0, u8::MAX as i64),
            ScalarType::Int16 => (i16::MIN as i64, i16::MAX as i64),
            ScalarType::UInt16 => (0, u16::MAX as i64),
            ScalarType::Int32 => (i32::MIN as i64, i32::MAX as i64),
            ScalarType::UInt32 => (0, u32::MAX as i64),
            ScalarType::Int64 => (i64::MIN, i64::MAX),
            ScalarType::UInt64 => (0, i64::MAX),
            ScalarType::Bool => (0, 1),
            ScalarType::Float | ScalarType::Double | ScalarType::String => return None,
        })
    }

    pub fn is_integral(self) -> bool {
        self.integer_bounds().is_some()
    }

    pub fn is_numeric(self) -> bool {
        self != ScalarType::String
    }

    /// The Lua type a value of this scalar takes inside a sequence.
    pub fn natural_lua_type(self) -> LuaType {
        match self {
            ScalarType::Float | ScalarType::Double => LuaType::Number,
            ScalarType::String => LuaType::String,
            _ => LuaType::Integer,
        }
    }
}

/// Declared type of a field after reference resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    Scalar(ScalarType),
    /// Record of another table, by table name.
    Table(String),
    /// Any other C type name; only meaningful as `lightuserdata`.
    Opaque(String),
}

impl ValueType {
    pub fn describe(&self) -> &str {
        match self {
            ValueType::Scalar(s) => s.as_str(),
            ValueType::Table(name) | ValueType::Opaque(name) => name,
        }
    }
}

/// Number of values a field holds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Arity {
    One,
    Fixed(usize),
    /// Length held by the sibling field at this index.
    Counted(usize),
    Unbounded,
}

impl Arity {
    pub fn is_sequence(&self) -> bool {
        *self != Arity::One
    }
}

#[derive(Clone, Debug)]
pub struct Case {
    pub when: i64,
    pub lua_type: LuaType,
    pub value_type: ValueType,
}

/// Selects a field's type from the value of a sibling integer field.
#[derive(Clone, Debug)]
pub struct Condition {
    pub field: usize,
    pub cases: Vec<Case>,
}

impl Condition {
    pub fn case_for(&self, selector: i64) -> Option<&Case> {
        self.cases.iter().find(|c| c.when == selector)
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub tag: String,
    pub lua_type: LuaType,
    /// `None` only for conditional fields.
    pub value_type: Option<ValueType>,
    pub arity: Arity,
    pub condition: Option<Condition>,
}

impl Field {
    pub fn setter_name(&self) -> String {
        format!("set_{}", self.name)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Origin {
    Read,
    Definition,
}

#[derive(Clone, Debug)]
pub struct TableDef {
    pub tag: String,
    pub name: String,
    pub origin: Origin,
    pub fields: Vec<Field>,
}

impl TableDef {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A validated, immutable collection of table definitions.
#[derive(Clone, Debug, Default)]
pub struct TableSet {
    tables: Vec<Arc<TableDef>>,
}

impl TableSet {
    pub fn from_json(source: &str) -> Result<Self, SchemaError> {
        let raw: RawTableSet = serde_json::from_str(source)?;
        Self::from_raw(raw)
    }

    /// Resolve and validate raw definitions. Definitions come before read tables, in
    /// document order.
    pub fn from_raw(raw: RawTableSet) -> Result<Self, SchemaError> {
        let ordered: Vec<(Origin, RawTable)> = raw
            .definition
            .into_iter()
            .map(|t| (Origin::Definition, t))
            .chain(raw.read.into_iter().map(|t| (Origin::Read, t)))
            .collect();

        let mut names = HashSet::new();
        let mut tags: HashMap<String, String> = HashMap::new();
        for (_, table) in &ordered {
            if !is_identifier(&table.name) {
                return Err(SchemaError::InvalidName(table.name.clone()));
            }
            if !names.insert(table.name.clone()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            if tags.insert(table.tag.clone(), table.name.clone()).is_some() {
                return Err(SchemaError::DuplicateTable(table.tag.clone()));
            }
        }

        let tables = ordered
            .into_iter()
            .map(|(origin, table)| resolve_table(origin, table, &tags).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[Arc<TableDef>] {
        &self.tables
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TableDef>> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn resolve_table(
    origin: Origin,
    raw: RawTable,
    table_tags: &HashMap<String, String>,
) -> Result<TableDef, SchemaError> {
    let table = raw.name.as_str();

    // Sibling tags first: counts and conditions may point forward.
    let mut field_tags: HashMap<&str, usize> = HashMap::new();
    let mut field_names = HashSet::new();
    for (index, field) in raw.fields.iter().enumerate() {
        let dup = || SchemaError::DuplicateField {
            table: table.to_string(),
            field: field.name.clone(),
        };
        if !is_identifier(&field.name) {
            return Err(SchemaError::InvalidName(format!("{table}.{}", field.name)));
        }
        if field.name == "new" {
            return Err(SchemaError::ReservedName {
                table: table.to_string(),
                field: field.name.clone(),
            });
        }
        if !field_names.insert(field.name.as_str()) {
            return Err(dup());
        }
        let tag = field.tag.as_deref().unwrap_or(&field.name);
        if field_tags.insert(tag, index).is_some() {
            return Err(dup());
        }
    }
    for field in &raw.fields {
        if field_names.contains(format!("set_{}", field.name).as_str()) {
            return Err(SchemaError::ReservedName {
                table: table.to_string(),
                field: format!("set_{}", field.name),
            });
        }
    }

    let mut fields = Vec::with_capacity(raw.fields.len());
    for raw_field in &raw.fields {
        let ctx = FieldCtx {
            table,
            field: &raw_field.name,
        };
        let arity = resolve_arity(&ctx, raw_field.count.as_ref(), &field_tags, &raw.fields)?;

        let (value_type, condition) = if raw_field.luatype == LuaType::Conditional {
            if raw_field.count.is_some() {
                return Err(ctx.condition("conditional fields hold a single value"));
            }
            let condition = resolve_condition(&ctx, raw_field, &field_tags, &raw.fields, table_tags)?;
            (None, Some(condition))
        } else {
            if raw_field.condition.is_some() || !raw_field.cases.is_empty() {
                return Err(ctx.condition("only conditional fields take a condition"));
            }
            let ty = raw_field.ty.as_deref().ok_or_else(|| SchemaError::MissingType {
                table: table.to_string(),
                field: raw_field.name.clone(),
            })?;
            let value_type = resolve_type(&ctx, ty, table_tags)?;
            check_compatible(&ctx, raw_field.luatype, &value_type, &arity)?;
            (Some(value_type), None)
        };

        fields.push(Field {
            name: raw_field.name.clone(),
            tag: raw_field.tag.clone().unwrap_or_else(|| raw_field.name.clone()),
            lua_type: raw_field.luatype,
            value_type,
            arity,
            condition,
        });
    }

    Ok(TableDef {
        tag: raw.tag,
        name: raw.name,
        origin,
        fields,
    })
}

struct FieldCtx<'a> {
    table: &'a str,
    field: &'a str,
}

impl FieldCtx<'_> {
    fn incompatible(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::IncompatibleType {
            table: self.table.to_string(),
            field: self.field.to_string(),
            reason: reason.into(),
        }
    }

    fn condition(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidCondition {
            table: self.table.to_string(),
            field: self.field.to_string(),
            reason: reason.into(),
        }
    }

    fn unresolved_field(&self, target: &str) -> SchemaError {
        SchemaError::UnresolvedField {
            table: self.table.to_string(),
            field: self.field.to_string(),
            target: target.to_string(),
        }
    }
}

fn resolve_type(
    ctx: &FieldCtx<'_>,
    ty: &str,
    table_tags: &HashMap<String, String>,
) -> Result<ValueType, SchemaError> {
    if let Some(tag) = ty.strip_prefix(SELF_PREFIX) {
        return table_tags
            .get(tag)
            .map(|name| ValueType::Table(name.clone()))
            .ok_or_else(|| SchemaError::UnresolvedType {
                table: ctx.table.to_string(),
                field: ctx.field.to_string(),
                ty: ty.to_string(),
            });
    }
    Ok(ScalarType::parse(ty)
        .map(ValueType::Scalar)
        .unwrap_or_else(|| ValueType::Opaque(ty.to_string())))
}

/// Resolve a `self::<tag>` reference to a sibling that holds a single integer.
fn resolve_sibling_integer(
    ctx: &FieldCtx<'_>,
    reference: &str,
    field_tags: &HashMap<&str, usize>,
    siblings: &[RawField],
) -> Result<usize, SchemaError> {
    let tag = reference
        .strip_prefix(SELF_PREFIX)
        .ok_or_else(|| ctx.unresolved_field(reference))?;
    let index = *field_tags
        .get(tag)
        .ok_or_else(|| ctx.unresolved_field(reference))?;
    let sibling = &siblings[index];
    if sibling.luatype != LuaType::Integer || sibling.count.is_some() {
        return Err(ctx.incompatible(format!(
            "`{}` must be a single integer field",
            sibling.name
        )));
    }
    if sibling.name == ctx.field {
        return Err(ctx.incompatible("a field cannot refer to itself"));
    }
    Ok(index)
}

fn resolve_arity(
    ctx: &FieldCtx<'_>,
    count: Option<&RawCount>,
    field_tags: &HashMap<&str, usize>,
    siblings: &[RawField],
) -> Result<Arity, SchemaError> {
    match count {
        None | Some(RawCount::Fixed(1)) => Ok(Arity::One),
        Some(RawCount::Fixed(0)) => Err(ctx.incompatible("count must be at least 1")),
        Some(RawCount::Fixed(n)) => Ok(Arity::Fixed(*n as usize)),
        Some(RawCount::Reference(r)) if r == UNBOUNDED_COUNT => Ok(Arity::Unbounded),
        Some(RawCount::Reference(r)) => {
            resolve_sibling_integer(ctx, r, field_tags, siblings).map(Arity::Counted)
        }
    }
}

fn resolve_condition(
    ctx: &FieldCtx<'_>,
    raw: &RawField,
    field_tags: &HashMap<&str, usize>,
    siblings: &[RawField],
    table_tags: &HashMap<String, String>,
) -> Result<Condition, SchemaError> {
    let reference = raw
        .condition
        .as_deref()
        .ok_or_else(|| ctx.condition("missing `condition`"))?;
    let field = resolve_sibling_integer(ctx, reference, field_tags, siblings)?;
    if raw.cases.is_empty() {
        return Err(ctx.condition("no cases"));
    }

    let mut seen = HashSet::new();
    let mut cases = Vec::with_capacity(raw.cases.len());
    for case in &raw.cases {
        if !seen.insert(case.when) {
            return Err(ctx.condition(format!("case {} appears twice", case.when)));
        }
        if case.luatype == LuaType::Conditional {
            return Err(ctx.condition("cases cannot be conditional"));
        }
        let value_type = resolve_type(ctx, &case.ty, table_tags)?;
        check_compatible(ctx, case.luatype, &value_type, &Arity::One)?;
        cases.push(Case {
            when: case.when,
            lua_type: case.luatype,
            value_type,
        });
    }
    Ok(Condition { field, cases })
}

fn check_compatible(
    ctx: &FieldCtx<'_>,
    lua_type: LuaType,
    value_type: &ValueType,
    arity: &Arity,
) -> Result<(), SchemaError> {
    let mismatch = || {
        ctx.incompatible(format!(
            "`{}` cannot be represented as {}",
            value_type.describe(),
            lua_type.as_str()
        ))
    };

    if arity.is_sequence() {
        if lua_type != LuaType::Table {
            return Err(ctx.incompatible("sequences must use luatype `table`"));
        }
        if let ValueType::Opaque(_) = value_type {
            return Err(mismatch());
        }
        return Ok(());
    }

    let ok = match (lua_type, value_type) {
        (LuaType::LightUserData, _) => true,
        (LuaType::Integer, ValueType::Scalar(s)) => s.is_integral(),
        (LuaType::Number, ValueType::Scalar(s)) => s.is_numeric(),
        (LuaType::String, ValueType::Scalar(s)) => *s == ScalarType::String,
        (LuaType::Boolean, ValueType::Scalar(s)) => *s == ScalarType::Bool,
        (LuaType::Table, ValueType::Table(_)) => true,
        _ => false,
    };
    if ok { Ok(()) } else { Err(mismatch()) }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !LUA_KEYWORDS.contains(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<TableSet, SchemaError> {
        TableSet::from_json(json)
    }

    const LIMITS: &str = r#"{
        "definition": [
            { "tag": "limit", "name": "limit_t", "fields": [
                { "name": "flags", "type": "uint32", "luatype": "integer" },
                { "name": "initial", "type": "uint32", "luatype": "integer" }
            ]}
        ],
        "read": [
            { "tag": "memory", "name": "memory_t", "fields": [
                { "name": "count", "type": "uint32", "luatype": "integer" },
                { "name": "entries", "type": "self::limit", "luatype": "table", "count": "self::count" },
                { "name": "raw", "type": "uint8", "luatype": "table", "count": "*" },
                { "name": "pair", "type": "int16", "luatype": "table", "count": 2 }
            ]}
        ]
    }"#;

    #[test]
    fn definitions_come_before_read_tables() {
        let set = parse(LIMITS).unwrap();
        let names: Vec<_> = set.names().collect();
        assert_eq!(names, ["limit_t", "memory_t"]);
        assert_eq!(set.get("limit_t").unwrap().origin, Origin::Definition);
        assert_eq!(set.get("memory_t").unwrap().origin, Origin::Read);
    }

    #[test]
    fn resolves_references_and_arities() {
        let set = parse(LIMITS).unwrap();
        let memory = set.get("memory_t").unwrap();

        let entries = memory.field("entries").unwrap();
        assert_eq!(entries.arity, Arity::Counted(0));
        assert_eq!(entries.value_type, Some(ValueType::Table("limit_t".into())));

        assert_eq!(memory.field("raw").unwrap().arity, Arity::Unbounded);
        assert_eq!(memory.field("pair").unwrap().arity, Arity::Fixed(2));
        assert_eq!(memory.field("count").unwrap().arity, Arity::One);
    }

    #[test]
    fn resolves_conditional_cases() {
        let set = parse(
            r#"{ "definition": [
                { "tag": "g", "name": "g_t", "fields": [
                    { "name": "v", "type": "int8", "luatype": "integer" }
                ]},
                { "tag": "imp", "name": "imp_t", "fields": [
                    { "name": "kind", "type": "uint8", "luatype": "integer" },
                    { "name": "desc", "luatype": "conditional", "condition": "self::kind", "cases": [
                        { "when": 0, "type": "uint32", "luatype": "integer" },
                        { "when": 3, "type": "self::g", "luatype": "table" }
                    ]}
                ]}
            ]}"#,
        )
        .unwrap();
        let desc = set.get("imp_t").unwrap().field("desc").unwrap();
        let condition = desc.condition.as_ref().unwrap();
        assert_eq!(condition.field, 0);
        assert_eq!(
            condition.case_for(3).unwrap().value_type,
            ValueType::Table("g_t".into())
        );
        assert!(condition.case_for(1).is_none());
        assert!(desc.value_type.is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse("{ \"read\": 3 }"), Err(SchemaError::Parse(_))));
        assert!(matches!(parse("{ \"bogus\": [] }"), Err(SchemaError::Parse(_))));
    }

    #[test]
    fn rejects_duplicate_tables() {
        let err = parse(
            r#"{ "read": [
                { "tag": "a", "name": "t", "fields": [] },
                { "tag": "b", "name": "t", "fields": [] }
            ]}"#,
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateTable("t".into()));
    }

    #[test]
    fn rejects_keywords_as_names() {
        let err = parse(r#"{ "read": [ { "tag": "a", "name": "end", "fields": [] } ] }"#)
            .unwrap_err();
        assert_eq!(err, SchemaError::InvalidName("end".into()));
    }

    #[test]
    fn rejects_accessor_collisions() {
        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "x", "type": "int8", "luatype": "integer" },
                { "name": "set_x", "type": "int8", "luatype": "integer" }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::ReservedName { .. }));

        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "new", "type": "int8", "luatype": "integer" }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::ReservedName { .. }));
    }

    #[test]
    fn rejects_unknown_references() {
        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "x", "type": "self::missing", "luatype": "table" }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedType { .. }));

        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "x", "type": "uint8", "luatype": "table", "count": "self::n" }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedField { .. }));
    }

    #[test]
    fn rejects_incompatible_lua_types() {
        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "x", "type": "string", "luatype": "integer" }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::IncompatibleType { .. }));

        // Counts must come from a single integer field.
        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "n", "type": "string", "luatype": "string" },
                { "name": "xs", "type": "uint8", "luatype": "table", "count": "self::n" }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::IncompatibleType { .. }));
    }

    #[test]
    fn rejects_broken_conditions() {
        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "k", "type": "uint8", "luatype": "integer" },
                { "name": "d", "luatype": "conditional", "condition": "self::k", "cases": [] }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidCondition { .. }));

        let err = parse(
            r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                { "name": "k", "type": "uint8", "luatype": "integer", "condition": "self::k" }
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidCondition { .. }));
    }

    #[test]
    fn opaque_types_only_as_lightuserdata() {
        assert!(
            parse(
                r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                    { "name": "p", "type": "void*", "luatype": "lightuserdata" }
                ]}]}"#,
            )
            .is_ok()
        );
        assert!(
            parse(
                r#"{ "read": [ { "tag": "a", "name": "t", "fields": [
                    { "name": "p", "type": "void*", "luatype": "integer" }
                ]}]}"#,
            )
            .is_err()
        );
    }

    #[test]
    fn integer_bounds_follow_c_types() {
        assert_eq!(ScalarType::UInt8.integer_bounds(), Some((0, 255)));
        assert_eq!(ScalarType::Int8.integer_bounds(), Some((-128, 127)));
        assert_eq!(ScalarType::UInt64.integer_bounds(), Some((0, i64::MAX)));
        assert_eq!(ScalarType::Double.integer_bounds(), None);
        assert_eq!(ScalarType::Bool.natural_lua_type(), LuaType::Integer);
    }
}
