//! Key namespace: deterministic mapping from item, index and descriptor
//! coordinates to engine key strings.
//!
//! Three disjoint segments under a caller-supplied base prefix keep primary
//! records, index entries and kind descriptors from ever colliding:
//!
//! ```text
//! <base>item:<kind>:<id>
//! <base>index:<kind>:<field>
//! <base>type:<kind>
//! ```
//!
//! The mapping is injective because `:` is forbidden in kind and field names
//! (enforced by [`validate_kind`] / [`validate_field_name`]); ids occupy the
//! final segment and are unconstrained.

use crate::error::ValidationError;

const ITEM_SEGMENT: &str = "item:";
const INDEX_SEGMENT: &str = "index:";
const TYPE_SEGMENT: &str = "type:";

/// Pure key construction under a fixed base prefix. Distinct base prefixes
/// isolate independent logical stores sharing one backing engine.
#[derive(Debug, Clone)]
pub struct KeySpace {
    base: String,
}

impl KeySpace {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Key of the primary record for `(kind, id)`.
    pub fn item_key(&self, kind: &str, id: &str) -> String {
        format!("{}{ITEM_SEGMENT}{kind}:{id}", self.base)
    }

    /// Key of the score-ordered index for `(kind, field)`.
    pub fn index_key(&self, kind: &str, field: &str) -> String {
        format!("{}{INDEX_SEGMENT}{kind}:{field}", self.base)
    }

    /// Key of the kind's descriptor hash (declared or registered indexed
    /// field names).
    pub fn type_key(&self, kind: &str) -> String {
        format!("{}{TYPE_SEGMENT}{kind}", self.base)
    }
}

pub(crate) fn validate_kind(kind: &str) -> Result<(), ValidationError> {
    if kind.is_empty() {
        return Err(ValidationError::EmptyKind);
    }
    if kind.contains(':') {
        return Err(ValidationError::InvalidKindName(kind.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    Ok(())
}

pub(crate) fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyFieldName);
    }
    if name.contains(':') {
        return Err(ValidationError::InvalidFieldName(name.to_string()));
    }
    Ok(())
}
