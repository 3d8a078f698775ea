// crates/omf-sender-core/src/core/message.rs
// ============================================================================
// Module: OMF Messages
// Description: Message kinds, actions, and the type/container/data catalog.
// Purpose: Carry untyped OMF JSON records with the minimal shape checks delivery needs.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! OMF bodies are kept as raw JSON so arbitrary schemas pass through
//! untouched. [`MessageCatalog`] only checks the fields delivery depends on:
//! type `id`, container `id`/`typeid`, and data `containerid`/`values`.
//! Invariants:
//! - Catalog order is declaration order and is the send order.
//! - [`MessageCatalog::validate_references`] reports containers whose type
//!   is not declared and data templates whose container is not declared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ContainerId;

// ============================================================================
// SECTION: Message Kinds
// ============================================================================

/// OMF message type header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Schema definition.
    Type,
    /// Stream bound to a type.
    Container,
    /// Values bound to a container.
    Data,
}

impl MessageKind {
    /// Returns the `messagetype` header value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Container => "container",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OMF action header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create the entity or append the values.
    #[default]
    Create,
    /// Delete the entity.
    Delete,
}

impl Action {
    /// Returns the `action` header value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by catalog shape and reference checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Entry is not a JSON object.
    #[error("{kind} message {index} must be a json object")]
    NotAnObject {
        /// Message kind of the entry.
        kind: MessageKind,
        /// Position in declaration order.
        index: usize,
    },
    /// Entry lacks a required string field.
    #[error("{kind} message {index} is missing string field `{field}`")]
    MissingField {
        /// Message kind of the entry.
        kind: MessageKind,
        /// Position in declaration order.
        index: usize,
        /// Missing field name.
        field: &'static str,
    },
    /// Data template has no value objects.
    #[error("data message {index} must carry a non-empty `values` array of objects")]
    InvalidValues {
        /// Position in declaration order.
        index: usize,
    },
    /// Entry references an id that the catalog does not declare.
    #[error("{kind} `{id}` references undeclared id `{reference}`")]
    UnknownReference {
        /// Message kind of the referencing entry.
        kind: MessageKind,
        /// Identifier of the referencing entry.
        id: String,
        /// Undeclared referenced identifier.
        reference: String,
    },
}

// ============================================================================
// SECTION: Data Templates
// ============================================================================

/// Data message template bound to one container.
///
/// # Invariants
/// - `record` is an object with a string `containerid` and a non-empty
///   `values` array of objects.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTemplate {
    /// Target container.
    container_id: ContainerId,
    /// Full data record as declared.
    record: Value,
}

impl DataTemplate {
    /// Checks the record shape and captures its container id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the record is malformed.
    pub fn new(index: usize, record: Value) -> Result<Self, CatalogError> {
        let container_id =
            ContainerId::new(string_field(&record, MessageKind::Data, index, "containerid")?);
        let has_values = record
            .get("values")
            .and_then(Value::as_array)
            .is_some_and(|values| !values.is_empty() && values.iter().all(Value::is_object));
        if !has_values {
            return Err(CatalogError::InvalidValues {
                index,
            });
        }
        Ok(Self {
            container_id,
            record,
        })
    }

    /// Returns the target container id.
    #[must_use]
    pub const fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    /// Returns the declared record.
    #[must_use]
    pub const fn record(&self) -> &Value {
        &self.record
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Ordered type, container, and data declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageCatalog {
    /// Type messages in declaration order.
    types: Vec<Value>,
    /// Container messages in declaration order.
    containers: Vec<Value>,
    /// Data templates in declaration order.
    data: Vec<DataTemplate>,
}

impl MessageCatalog {
    /// Builds a catalog after checking each entry's shape.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for the first malformed entry.
    pub fn new(
        types: Vec<Value>,
        containers: Vec<Value>,
        data: Vec<Value>,
    ) -> Result<Self, CatalogError> {
        for (index, entry) in types.iter().enumerate() {
            string_field(entry, MessageKind::Type, index, "id")?;
        }
        for (index, entry) in containers.iter().enumerate() {
            string_field(entry, MessageKind::Container, index, "id")?;
            string_field(entry, MessageKind::Container, index, "typeid")?;
        }
        let data = data
            .into_iter()
            .enumerate()
            .map(|(index, record)| DataTemplate::new(index, record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            types,
            containers,
            data,
        })
    }

    /// Returns type messages.
    #[must_use]
    pub fn types(&self) -> &[Value] {
        &self.types
    }

    /// Returns container messages.
    #[must_use]
    pub fn containers(&self) -> &[Value] {
        &self.containers
    }

    /// Returns data templates.
    #[must_use]
    pub fn data(&self) -> &[DataTemplate] {
        &self.data
    }

    /// Checks that every container names a declared type and every data
    /// template names a declared container.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownReference`] for the first dangling reference.
    pub fn validate_references(&self) -> Result<(), CatalogError> {
        let type_ids: BTreeSet<&str> =
            self.types.iter().filter_map(|entry| entry.get("id").and_then(Value::as_str)).collect();
        let mut container_ids = BTreeSet::new();
        for entry in &self.containers {
            let id = entry.get("id").and_then(Value::as_str).unwrap_or_default();
            let type_id = entry.get("typeid").and_then(Value::as_str).unwrap_or_default();
            if !type_ids.contains(type_id) {
                return Err(CatalogError::UnknownReference {
                    kind: MessageKind::Container,
                    id: id.to_string(),
                    reference: type_id.to_string(),
                });
            }
            container_ids.insert(id);
        }
        for (index, template) in self.data.iter().enumerate() {
            let container = template.container_id.as_str();
            if !container_ids.contains(container) {
                return Err(CatalogError::UnknownReference {
                    kind: MessageKind::Data,
                    id: format!("#{index}"),
                    reference: container.to_string(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts a required string field from a message object.
fn string_field<'a>(
    entry: &'a Value,
    kind: MessageKind,
    index: usize,
    field: &'static str,
) -> Result<&'a str, CatalogError> {
    let Value::Object(map) = entry else {
        return Err(CatalogError::NotAnObject {
            kind,
            index,
        });
    };
    map.get(field).and_then(Value::as_str).filter(|value| !value.is_empty()).ok_or(
        CatalogError::MissingField {
            kind,
            index,
            field,
        },
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
