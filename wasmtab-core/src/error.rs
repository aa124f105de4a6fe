//! Error types for bootstrapping and table registration.
//!
//! Every bootstrap step returns a `Result`; the first failure stops the sequence and is
//! reported by the caller. Errors raised from inside Lua (bad constructor arguments, wrong
//! record types) stay `mlua::Error` values and surface in the script that caused them.

/// Failure of one bootstrap step.
#[derive(Debug)]
pub enum BootstrapError {
    /// The runtime could not allocate its internal state.
    Allocation(String),
    /// Runtime creation failed for a reason other than memory.
    Runtime(mlua::Error),
    /// Loading the standard library failed.
    StandardLibrary(mlua::Error),
    /// Injecting the generated tables failed.
    Registration(RegistrationError),
}

impl core::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BootstrapError::Allocation(msg) => {
                write!(f, "failed to allocate runtime state: {msg}")
            }
            BootstrapError::Runtime(e) => write!(f, "failed to create runtime: {e}"),
            BootstrapError::StandardLibrary(e) => {
                write!(f, "failed to load standard library: {e}")
            }
            BootstrapError::Registration(e) => write!(f, "failed to register tables: {e}"),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Allocation(_) => None,
            BootstrapError::Runtime(e) | BootstrapError::StandardLibrary(e) => Some(e),
            BootstrapError::Registration(e) => Some(e),
        }
    }
}

impl From<RegistrationError> for BootstrapError {
    fn from(err: RegistrationError) -> Self {
        BootstrapError::Registration(err)
    }
}

/// Failure while injecting a table set into a runtime.
#[derive(Debug)]
pub enum RegistrationError {
    /// The table set itself is invalid.
    Schema(SchemaError),
    /// A table name is already bound in the global namespace.
    NameCollision(String),
    /// The runtime rejected an operation during injection.
    Lua(mlua::Error),
}

impl core::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RegistrationError::Schema(e) => write!(f, "invalid table set: {e}"),
            RegistrationError::NameCollision(name) => {
                write!(f, "global `{name}` is already defined")
            }
            RegistrationError::Lua(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for RegistrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistrationError::Schema(e) => Some(e),
            RegistrationError::NameCollision(_) => None,
            RegistrationError::Lua(e) => Some(e),
        }
    }
}

impl From<mlua::Error> for RegistrationError {
    fn from(err: mlua::Error) -> Self {
        RegistrationError::Lua(err)
    }
}

impl From<SchemaError> for RegistrationError {
    fn from(err: SchemaError) -> Self {
        RegistrationError::Schema(err)
    }
}

/// A table definition document that cannot be turned into a [`TableSet`](crate::schema::TableSet).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// The document is not valid JSON or does not have the expected shape.
    Parse(String),
    /// A table name is not usable as a Lua identifier.
    InvalidName(String),
    /// Two tables share a name or a tag.
    DuplicateTable(String),
    DuplicateField { table: String, field: String },
    /// The field name clashes with a generated accessor (`new`, `set_*`).
    ReservedName { table: String, field: String },
    /// A non-conditional field has no `type`.
    MissingType { table: String, field: String },
    /// A `self::` type names no table tag.
    UnresolvedType { table: String, field: String, ty: String },
    /// A `count` names no sibling field.
    UnresolvedField { table: String, field: String, target: String },
    IncompatibleType { table: String, field: String, reason: String },
    InvalidCondition { table: String, field: String, reason: String },
}

impl core::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SchemaError::Parse(msg) => write!(f, "malformed table definitions: {msg}"),
            SchemaError::InvalidName(name) => write!(f, "`{name}` is not a valid Lua name"),
            SchemaError::DuplicateTable(name) => write!(f, "table `{name}` is defined twice"),
            SchemaError::DuplicateField { table, field } => {
                write!(f, "{table}.{field} is defined twice")
            }
            SchemaError::ReservedName { table, field } => {
                write!(f, "{table}.{field} collides with a generated accessor")
            }
            SchemaError::MissingType { table, field } => {
                write!(f, "{table}.{field} has no type")
            }
            SchemaError::UnresolvedType { table, field, ty } => {
                write!(f, "{table}.{field} refers to unknown table `{ty}`")
            }
            SchemaError::UnresolvedField {
                table,
                field,
                target,
            } => write!(f, "{table}.{field} refers to unknown field `{target}`"),
            SchemaError::IncompatibleType {
                table,
                field,
                reason,
            } => write!(f, "{table}.{field}: {reason}"),
            SchemaError::InvalidCondition {
                table,
                field,
                reason,
            } => write!(f, "{table}.{field}: bad condition: {reason}"),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Parse(err.to_string())
    }
}
