//! Mapping between the schema model and arrow's physical schema.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arrow::datatypes::{
    DataType, Field as ArrowField, Fields as ArrowFields, Schema as ArrowSchema,
};

use super::schema::{Field, ScalarType, Schema, Type, TypeName};
use crate::error::{SchemaError, SchemaResult};

/// Name of the element field inside arrow list types.
const LIST_ITEM: &str = "item";

impl Type {
    /// Returns the arrow data type backing this type.
    #[must_use]
    pub fn to_arrow(&self) -> DataType {
        match self {
            Self::Scalar(scalar) => scalar_to_arrow(*scalar),
            Self::Array(element) => {
                DataType::List(Arc::new(ArrowField::new(LIST_ITEM, element.to_arrow(), true)))
            }
            Self::Structure(fields) => {
                DataType::Struct(fields.iter().map(Field::to_arrow).collect::<ArrowFields>())
            }
        }
    }

    fn try_from_arrow(field: &str, data_type: &DataType) -> SchemaResult<Self> {
        let name = match data_type {
            DataType::Boolean => TypeName::Boolean,
            DataType::Int8 => TypeName::Byte,
            DataType::Int16 => TypeName::Short,
            DataType::Int32 => TypeName::Int,
            DataType::Int64 => TypeName::Long,
            DataType::UInt8 => TypeName::UByte,
            DataType::UInt16 => TypeName::UShort,
            DataType::UInt32 => TypeName::UInt,
            DataType::UInt64 => TypeName::ULong,
            DataType::Float32 => TypeName::Float,
            DataType::Float64 => TypeName::Double,
            DataType::Binary => TypeName::Bytes,
            DataType::Utf8 => TypeName::Utf8,
            DataType::Date32 => TypeName::Date,
            DataType::List(item) => {
                return Ok(Self::array(Self::try_from_arrow(field, item.data_type())?));
            }
            DataType::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|f| Field::try_from_arrow(f))
                    .collect::<SchemaResult<Vec<_>>>()?;
                return Self::structure(fields);
            }
            other => {
                return Err(SchemaError::UnsupportedArrowType {
                    field: field.to_string(),
                    data_type: format!("{other:?}"),
                })
            }
        };
        Self::scalar(name)
    }
}

fn scalar_to_arrow(scalar: ScalarType) -> DataType {
    match scalar.name() {
        TypeName::Boolean => DataType::Boolean,
        TypeName::Byte => DataType::Int8,
        TypeName::Short => DataType::Int16,
        TypeName::Int => DataType::Int32,
        TypeName::Long => DataType::Int64,
        TypeName::UByte => DataType::UInt8,
        TypeName::UShort => DataType::UInt16,
        TypeName::UInt => DataType::UInt32,
        TypeName::ULong => DataType::UInt64,
        TypeName::Float => DataType::Float32,
        TypeName::Double => DataType::Float64,
        TypeName::Bytes => DataType::Binary,
        TypeName::Utf8 => DataType::Utf8,
        TypeName::Date => DataType::Date32,
        // `ScalarType::new` never wraps these.
        TypeName::Array | TypeName::Structure => DataType::Null,
    }
}

impl Field {
    /// Returns the arrow field for this column, metadata included.
    #[must_use]
    pub fn to_arrow(&self) -> ArrowField {
        let field = ArrowField::new(self.name(), self.data_type().to_arrow(), self.is_nullable());
        if self.metadata().is_empty() {
            field
        } else {
            let metadata: HashMap<String, String> = self
                .metadata()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            field.with_metadata(metadata)
        }
    }

    /// Converts an arrow field back into the schema model.
    pub fn try_from_arrow(field: &ArrowField) -> SchemaResult<Self> {
        let data_type = Type::try_from_arrow(field.name(), field.data_type())?;
        let metadata: BTreeMap<String, String> = field
            .metadata()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Self::new(field.name().clone(), data_type, field.is_nullable()).with_metadata(metadata))
    }
}

impl Schema {
    /// Returns the arrow schema of batches materialized for this schema.
    #[must_use]
    pub fn to_arrow(&self) -> ArrowSchema {
        ArrowSchema::new(self.fields().iter().map(Field::to_arrow).collect::<Vec<_>>())
    }

    /// Converts an arrow schema back into the schema model.
    ///
    /// Fails on arrow types that have no counterpart, such as timestamps
    /// or dictionaries.
    pub fn try_from_arrow(schema: &ArrowSchema) -> SchemaResult<Self> {
        let fields = schema
            .fields()
            .iter()
            .map(|f| Field::try_from_arrow(f))
            .collect::<SchemaResult<Vec<_>>>()?;
        Self::try_new(fields)
    }
}
