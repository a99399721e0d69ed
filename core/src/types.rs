//! Response envelopes and entity models for the Airtable API.
//!
//! # Design
//! Every endpoint answers with a JSON:API-style document: a `data` member
//! holding one [`Record`] or a list of them, plus `links` and `meta`. The
//! record body lives under `fields` and is entity specific; the envelope is
//! generic over it.
//!
//! Parsing is two steps. Serde enforces structure (required fields, JSON
//! types), then [`Validate`] checks that each record's `type` tag names the
//! entity the caller asked for. Optional members that are absent stay absent
//! when an envelope is serialized again.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Link name (`self`, `related`, ...) to URL.
pub type Links = BTreeMap<String, String>;

/// Free-form metadata object.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// An entity served by the API.
pub trait Resource {
    /// JSON:API `type` tag carried by every record of this entity.
    const TYPE: &'static str;
}

/// A single-record response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Record<T>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: Meta,
}

/// A list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<Record<T>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: Meta,
}

impl<T> ListEnvelope<T> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record<T>> {
        self.data.iter()
    }
}

/// One row of an Airtable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub fields: T,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: Links,
}

impl<T> Record<T> {
    /// Ids linked under relationship `name`, in document order.
    pub fn related_ids(&self, name: &str) -> Vec<&str> {
        match self.relationships.get(name).and_then(|r| r.data.as_ref()) {
            Some(RelationshipData::One(ident)) => vec![ident.id.as_str()],
            Some(RelationshipData::Many(idents)) => idents.iter().map(|i| i.id.as_str()).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RelationshipData>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: Links,
}

/// To-one or to-many linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub name: String,
}

impl Resource for Hub {
    const TYPE: &'static str = "hubs";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
}

impl Resource for Pod {
    const TYPE: &'static str = "pods";
}

/// A Wildflower partner; regional site entrepreneurs are partners too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Resource for Partner {
    const TYPE: &'static str = "partners";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance_model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ages_served: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_address: Option<String>,
}

impl Resource for School {
    const TYPE: &'static str = "schools";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Educator {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Resource for Educator {
    const TYPE: &'static str = "educators";
}

/// The Wildflower contact responsible for a geographic area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationContact {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_rse_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_name: Option<String>,
}

impl Resource for LocationContact {
    const TYPE: &'static str = "location_contacts";
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Parse-and-validate for an envelope type.
pub trait Validate: Sized {
    /// Entity tag used in error messages.
    const ENTITY: &'static str;

    /// Structural checks beyond what deserialization enforces.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Deserialize `value` and validate it.
    fn parse(value: serde_json::Value) -> Result<Self, ValidationError>
    where
        Self: DeserializeOwned,
    {
        let parsed: Self = serde_json::from_value(value).map_err(|source| ValidationError::Shape {
            entity: Self::ENTITY,
            source,
        })?;
        parsed.validate()?;
        Ok(parsed)
    }
}

fn check_kind<T: Resource>(record: &Record<T>) -> Result<(), ValidationError> {
    if record.kind == T::TYPE {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            expected: T::TYPE,
            found: record.kind.clone(),
            id: record.id.clone(),
        })
    }
}

impl<T: Resource> Validate for Envelope<T> {
    const ENTITY: &'static str = T::TYPE;

    fn validate(&self) -> Result<(), ValidationError> {
        check_kind(&self.data)
    }
}

impl<T: Resource> Validate for ListEnvelope<T> {
    const ENTITY: &'static str = T::TYPE;

    fn validate(&self) -> Result<(), ValidationError> {
        self.data.iter().try_for_each(check_kind)
    }
}
