//! Type, field and schema definitions.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

/// Reference-counted schema shared between registry and stores.
pub type SchemaRef = Arc<Schema>;

// =============================================================================
// TypeName
// =============================================================================

/// Name of a column type as written in a schema description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeName {
    /// Boolean.
    Boolean,
    /// Signed 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Short,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Long,
    /// Unsigned 8-bit integer.
    UByte,
    /// Unsigned 16-bit integer.
    UShort,
    /// Unsigned 32-bit integer.
    UInt,
    /// Unsigned 64-bit integer.
    ULong,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Opaque binary.
    Bytes,
    /// UTF-8 string.
    Utf8,
    /// Days since the epoch.
    Date,
    /// List of a nested element type.
    Array,
    /// Ordered list of nested fields.
    Structure,
}

impl TypeName {
    /// Returns true for names that carry no nested type.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        !matches!(self, Self::Array | Self::Structure)
    }

    /// Returns the name as written in schema descriptions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::UByte => "ubyte",
            Self::UShort => "ushort",
            Self::UInt => "uint",
            Self::ULong => "ulong",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::Utf8 => "utf8",
            Self::Date => "date",
            Self::Array => "array",
            Self::Structure => "structure",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ScalarType
// =============================================================================

/// A [`TypeName`] without nested parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarType(TypeName);

impl ScalarType {
    /// Wraps `name` unless it is `array` or `structure`.
    #[must_use]
    pub const fn new(name: TypeName) -> Option<Self> {
        if name.is_scalar() {
            Some(Self(name))
        } else {
            None
        }
    }

    /// The wrapped type name.
    #[must_use]
    pub const fn name(self) -> TypeName {
        self.0
    }
}

// =============================================================================
// Type
// =============================================================================

/// A column type.
///
/// The nested part always matches the tag: scalars carry nothing, arrays
/// carry exactly one element type and structures exactly one field list.
/// Deserialization enforces this, so a loaded schema is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawType", into = "RawType")]
pub enum Type {
    /// A type without nested parts.
    Scalar(ScalarType),
    /// A list of values of the element type.
    Array(Box<Type>),
    /// A record of named fields.
    Structure(Vec<Field>),
}

impl Type {
    /// Creates a scalar type, rejecting `array` and `structure`.
    pub fn scalar(name: TypeName) -> SchemaResult<Self> {
        ScalarType::new(name)
            .map(Self::Scalar)
            .ok_or_else(|| SchemaError::InvalidType {
                name: name.to_string(),
                reason: "nested types need an element type or fields".to_string(),
            })
    }

    /// Creates an array type.
    #[must_use]
    pub fn array(element: Type) -> Self {
        Self::Array(Box::new(element))
    }

    /// Creates a structure type, validating its field list.
    pub fn structure(fields: Vec<Field>) -> SchemaResult<Self> {
        check_field_list(TypeName::Structure.as_str(), &fields)?;
        Ok(Self::Structure(fields))
    }

    /// Returns the tag of this type.
    #[must_use]
    pub fn name(&self) -> TypeName {
        match self {
            Self::Scalar(scalar) => scalar.name(),
            Self::Array(_) => TypeName::Array,
            Self::Structure(_) => TypeName::Structure,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{}", scalar.name()),
            Self::Array(element) => write!(f, "array<{element}>"),
            Self::Structure(fields) => {
                write!(f, "structure<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Wire form of [`Type`]: a tag plus optional nested parts.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawType {
    name: TypeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Box<Type>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<Field>>,
}

impl TryFrom<RawType> for Type {
    type Error = SchemaError;

    fn try_from(raw: RawType) -> SchemaResult<Self> {
        let name = raw.name;
        let invalid = |reason: &str| SchemaError::InvalidType {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        match (name, raw.values.is_some(), raw.fields.is_some()) {
            (TypeName::Array, true, false) => {
                Ok(Self::Array(raw.values.ok_or_else(|| invalid("missing element type"))?))
            }
            (TypeName::Array, _, _) => Err(invalid("expected an element type and no fields")),
            (TypeName::Structure, false, true) => {
                let fields = raw.fields.ok_or_else(|| invalid("missing fields"))?;
                Self::structure(fields)
            }
            (TypeName::Structure, _, _) => Err(invalid("expected fields and no element type")),
            (scalar, false, false) => Self::scalar(scalar),
            (_, _, _) => Err(invalid("scalar types take no nested type")),
        }
    }
}

impl From<Type> for RawType {
    fn from(value: Type) -> Self {
        match value {
            Type::Scalar(scalar) => Self {
                name: scalar.name(),
                values: None,
                fields: None,
            },
            Type::Array(element) => Self {
                name: TypeName::Array,
                values: Some(element),
                fields: None,
            },
            Type::Structure(fields) => Self {
                name: TypeName::Structure,
                values: None,
                fields: Some(fields),
            },
        }
    }
}

// =============================================================================
// Field
// =============================================================================

/// A named column. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    name: String,
    #[serde(default)]
    nullable: bool,
    #[serde(rename = "type")]
    data_type: Type,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl Field {
    /// Creates a field without metadata.
    pub fn new(name: impl Into<String>, data_type: Type, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
            data_type,
            metadata: BTreeMap::new(),
        }
    }

    /// Returns a copy of this field carrying `metadata`.
    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the column accepts nulls.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Column type.
    #[must_use]
    pub fn data_type(&self) -> &Type {
        &self.data_type
    }

    /// Free-form string metadata.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Ordered list of fields describing one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    fields: Vec<Field>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchema {
    fields: Vec<Field>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = SchemaError;

    fn try_from(raw: RawSchema) -> SchemaResult<Self> {
        Self::try_new(raw.fields)
    }
}

impl Schema {
    /// Creates a schema, rejecting empty and duplicate field lists.
    pub fn try_new(fields: Vec<Field>) -> SchemaResult<Self> {
        check_field_list("schema", &fields)?;
        Ok(Self { fields })
    }

    /// Fields in column order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of top-level columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a validated schema.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field at `index`.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Returns the column position of the field named `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

fn check_field_list(owner: &str, fields: &[Field]) -> SchemaResult<()> {
    if fields.is_empty() {
        return Err(SchemaError::EmptyFields(owner.to_string()));
    }
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField(field.name.clone()));
        }
    }
    Ok(())
}
