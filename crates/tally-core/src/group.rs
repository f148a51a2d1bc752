//! Inventory groups: read-mostly collections of product references.

use crate::unit::UnitTag;
use crate::wire;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

/// How a member entered its group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// Linked from the product catalog.
    Catalog,
    /// Entered manually, outside the catalog.
    Manual,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Catalog => "catalog",
            MemberKind::Manual => "manual",
        }
    }

    pub fn parse_lenient(raw: Option<&str>) -> MemberKind {
        match raw {
            Some("manual") => MemberKind::Manual,
            Some("catalog") | None => MemberKind::Catalog,
            Some(other) => {
                warn!(kind = other, "unknown member kind, treating as catalog");
                MemberKind::Catalog
            }
        }
    }
}

/// One member reference inside a group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupMember {
    pub product_id: String,
    /// Denormalized at the time the member was added.
    pub product_name: String,
    pub unit: UnitTag,
    pub added_at: DateTime<Utc>,
    pub kind: MemberKind,
}

impl GroupMember {
    fn from_value(raw: &Value) -> Option<GroupMember> {
        let obj = raw.as_object()?;
        Some(GroupMember {
            product_id: wire::str_field(obj, "product_id")?,
            product_name: wire::str_field(obj, "product_name").unwrap_or_default(),
            unit: UnitTag::parse_lenient(obj.get("unit").and_then(Value::as_str)),
            added_at: wire::ts_field(obj, "added_at").unwrap_or(DateTime::UNIX_EPOCH),
            kind: MemberKind::parse_lenient(obj.get("kind").and_then(Value::as_str)),
        })
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("product_id".into(), Value::String(self.product_id.clone()));
        obj.insert(
            "product_name".into(),
            Value::String(self.product_name.clone()),
        );
        obj.insert("unit".into(), Value::String(self.unit.as_str().to_string()));
        obj.insert("added_at".into(), wire::to_millis(self.added_at).into());
        obj.insert("kind".into(), Value::String(self.kind.as_str().to_string()));
        Value::Object(obj)
    }
}

/// A named, ordered collection of member references.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_ref: Option<String>,
    pub members: Vec<GroupMember>,
}

impl InventoryGroup {
    pub fn from_value(id: &str, raw: &Value) -> Option<InventoryGroup> {
        let obj = raw.as_object()?;
        let members = obj
            .get("members")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(GroupMember::from_value)
                    .collect()
            })
            .unwrap_or_default();

        Some(InventoryGroup {
            id: id.to_string(),
            name: wire::str_field(obj, "name").unwrap_or_default(),
            description: wire::str_field(obj, "description"),
            image_ref: wire::str_field(obj, "image"),
            members,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), Value::String(self.name.clone()));
        if let Some(description) = &self.description {
            obj.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(image) = &self.image_ref {
            obj.insert("image".into(), Value::String(image.clone()));
        }
        obj.insert(
            "members".into(),
            Value::Array(self.members.iter().map(GroupMember::to_value).collect()),
        );
        Value::Object(obj)
    }
}

/// Decode a full group-collection snapshot, skipping malformed records.
pub fn decode_group_map(raw: &Value) -> Vec<InventoryGroup> {
    let Some(map) = raw.as_object() else {
        if !raw.is_null() {
            warn!("group collection snapshot is not an object, ignoring");
        }
        return Vec::new();
    };
    map.iter()
        .filter_map(|(id, record)| {
            let group = InventoryGroup::from_value(id, record);
            if group.is_none() {
                warn!(group = id.as_str(), "skipping malformed group record");
            }
            group
        })
        .collect()
}

/// Read-side domain filter: retain groups with at least one member of the
/// requested kind, pruning non-matching members from the retained groups.
///
/// Pure and recomputed from the raw records on every call; the pruning is
/// never persisted back to the store.
pub fn filter_groups(groups: &[InventoryGroup], domain: MemberKind) -> Vec<InventoryGroup> {
    groups
        .iter()
        .filter_map(|group| {
            let members: Vec<GroupMember> = group
                .members
                .iter()
                .filter(|m| m.kind == domain)
                .cloned()
                .collect();
            if members.is_empty() {
                return None;
            }
            Some(InventoryGroup {
                members,
                ..group.clone()
            })
        })
        .collect()
}
