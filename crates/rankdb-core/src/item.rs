//! Items: named, typed field collections keyed by kind and id.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::keys;

/// The runtime type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Int64,
    Float64,
    String,
    Opaque,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int64 => "int64",
            ValueType::Float64 => "float64",
            ValueType::String => "string",
            ValueType::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// A field value. The variant tag is preserved exactly across encode/decode:
/// an `Int64` never decodes as `Float64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemValue {
    Int64(i64),
    Float64(f64),
    String(String),
    Opaque(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl ItemValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ItemValue::Int64(_) => ValueType::Int64,
            ItemValue::Float64(_) => ValueType::Float64,
            ItemValue::String(_) => ValueType::String,
            ItemValue::Opaque(_) => ValueType::Opaque,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ItemValue::Int64(_) | ItemValue::Float64(_))
    }

    /// The value as an index score, for numeric variants only.
    ///
    /// Scores are `f64` (the sorted-set score type), so `Int64` values beyond
    /// 2^53 lose precision in the index ordering — never in the stored value.
    pub fn as_score(&self) -> Option<f64> {
        match self {
            ItemValue::Int64(v) => Some(*v as f64),
            ItemValue::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

/// A named field's value together with its indexed status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemField {
    pub value: ItemValue,
    pub indexed: bool,
}

/// An item: a `(kind, id)`-keyed collection of typed fields.
///
/// Field names are unique within the item; setting a field twice keeps the
/// last value. The `indexed` flag on a non-numeric field is representable but
/// rejected when the item is added to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    kind: String,
    id: String,
    fields: BTreeMap<String, ItemField>,
}

impl Item {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set a field with an explicit [`ItemField`].
    pub fn set_field(&mut self, name: impl Into<String>, field: ItemField) {
        self.fields.insert(name.into(), field);
    }

    pub fn with_i64(self, name: &str, value: i64) -> Self {
        self.with_value(name, ItemValue::Int64(value), false)
    }

    pub fn with_i64_indexed(self, name: &str, value: i64) -> Self {
        self.with_value(name, ItemValue::Int64(value), true)
    }

    pub fn with_f64(self, name: &str, value: f64) -> Self {
        self.with_value(name, ItemValue::Float64(value), false)
    }

    pub fn with_f64_indexed(self, name: &str, value: f64) -> Self {
        self.with_value(name, ItemValue::Float64(value), true)
    }

    pub fn with_string(self, name: &str, value: impl Into<String>) -> Self {
        self.with_value(name, ItemValue::String(value.into()), false)
    }

    /// Set an opaque byte field. Opaque values carry no structural guarantee
    /// beyond byte-for-byte equality across encode/decode.
    pub fn with_opaque(self, name: &str, value: impl Into<Vec<u8>>) -> Self {
        self.with_value(name, ItemValue::Opaque(value.into()), false)
    }

    fn with_value(mut self, name: &str, value: ItemValue, indexed: bool) -> Self {
        self.fields
            .insert(name.to_string(), ItemField { value, indexed });
        self
    }

    /// Look up a field by name, regardless of type.
    pub fn field(&self, name: &str) -> Option<&ItemField> {
        self.fields.get(name)
    }

    /// The field's value if present **and** of type `Int64`; a type mismatch
    /// reports absent, not an error.
    pub fn i64_field(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(ItemField {
                value: ItemValue::Int64(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn f64_field(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(ItemField {
                value: ItemValue::Float64(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn string_field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(ItemField {
                value: ItemValue::String(v),
                ..
            }) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn opaque_field(&self, name: &str) -> Option<&[u8]> {
        match self.fields.get(name) {
            Some(ItemField {
                value: ItemValue::Opaque(v),
                ..
            }) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, ItemField> {
        &self.fields
    }

    /// Check the item against the store's naming rules: non-empty kind and
    /// id, non-empty field names, no `:` in kind or field names (`:` is the
    /// key-namespace separator).
    pub fn validate(&self) -> Result<(), ValidationError> {
        keys::validate_kind(&self.kind)?;
        keys::validate_id(&self.id)?;
        for name in self.fields.keys() {
            keys::validate_field_name(name)?;
        }
        Ok(())
    }
}
