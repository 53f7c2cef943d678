//! Raw wire items as delivered by the remote platform.
//!
//! Both platforms are read into the same JSON:API resource shape
//! (`{id, type, attributes, relationships}`) before normalization.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single remote resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub id: String,

    /// Declared resource type (e.g. "pledge", "reward", "user")
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: HashMap<String, Relationship>,
}

impl RawItem {
    /// Create an item with no attributes or relationships.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            attributes: Map::new(),
            relationships: HashMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style to-one relationship setter.
    pub fn with_relation(mut self, name: &str, kind: &str, id: &str) -> Self {
        self.relationships.insert(
            name.to_string(),
            Relationship {
                data: Some(Linkage::One(ResourceRef {
                    id: id.to_string(),
                    kind: kind.to_string(),
                })),
            },
        );
        self
    }

    /// Classify the declared type.
    pub fn item_kind(&self) -> ItemKind {
        ItemKind::classify(&self.kind)
    }

    /// Id of a to-one relationship, if present and non-null.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        match self.relationships.get(name)?.data.as_ref()? {
            Linkage::One(r) => Some(r.id.as_str()),
            Linkage::Many(_) => None,
        }
    }

    /// String attribute, ignoring nulls and empty strings.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Non-negative integer attribute.
    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attributes.get(name).and_then(Value::as_u64)
    }

    /// Whether the attribute is present with a non-null value.
    pub fn attr_is_set(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|v| !v.is_null())
    }
}

/// A relationship entry (`{"data": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<Linkage>,
}

/// Resource linkage: to-one or to-many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    One(ResourceRef),
    Many(Vec<ResourceRef>),
}

/// Reference to another resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Canonical item categories understood by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Contribution,
    RewardDefinition,
    Supporter,
    Unknown,
}

impl ItemKind {
    /// Map a declared resource type onto a canonical category.
    pub fn classify(kind: &str) -> Self {
        match kind {
            "pledge" | "member" | "subscription" => ItemKind::Contribution,
            "reward" | "tier" => ItemKind::RewardDefinition,
            "user" => ItemKind::Supporter,
            _ => ItemKind::Unknown,
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub data: Vec<RawItem>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub included: Vec<RawItem>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub links: PageLinks,
}

impl Page {
    /// Server-issued link to the following page.
    pub fn next_link(&self) -> Option<&str> {
        self.links.next.as_deref().filter(|s| !s.is_empty())
    }

    /// Total number of raw items carried by this page.
    pub fn item_count(&self) -> usize {
        self.data.len() + self.included.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

/// Body of a push-update event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub data: RawItem,

    #[serde(default, deserialize_with = "null_as_default")]
    pub included: Vec<RawItem>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
