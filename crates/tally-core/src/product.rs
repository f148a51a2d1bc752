//! Product records and their boundary normalization.

use crate::unit::UnitTag;
use crate::wire;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

/// A catalog product. `stock` is the denormalized aggregate derived from
/// the product's transaction history; readers must never observe it
/// negative.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    /// Stable key assigned by the store.
    pub id: String,
    pub name: String,
    pub unit: UnitTag,
    pub stock: f64,
    pub rate: Option<f64>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Normalize a raw store record into a `Product`.
    ///
    /// Missing optional fields are default-filled: absent unit maps to the
    /// canonical unit, absent stock to zero, absent timestamps to the
    /// epoch. A non-object record is malformed and yields `None`.
    pub fn from_value(id: &str, raw: &Value) -> Option<Product> {
        let obj = raw.as_object()?;

        let mut stock = wire::f64_field(obj, "stock").unwrap_or(0.0);
        if !stock.is_finite() || stock < 0.0 {
            warn!(product = id, stock, "clamping malformed stock to zero");
            stock = 0.0;
        }

        Some(Product {
            id: id.to_string(),
            name: wire::str_field(obj, "name").unwrap_or_default(),
            unit: UnitTag::parse_lenient(obj.get("unit").and_then(Value::as_str)),
            stock,
            rate: wire::f64_field(obj, "rate"),
            notes: wire::str_field(obj, "notes"),
            category: wire::str_field(obj, "category"),
            image_ref: wire::str_field(obj, "image"),
            created_at: wire::ts_field(obj, "created_at").unwrap_or(DateTime::UNIX_EPOCH),
            updated_at: wire::ts_field(obj, "updated_at").unwrap_or(DateTime::UNIX_EPOCH),
        })
    }

    /// Encode the record body (keyed externally by `id`).
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), Value::String(self.name.clone()));
        obj.insert("unit".into(), Value::String(self.unit.as_str().to_string()));
        obj.insert("stock".into(), self.stock.into());
        if let Some(rate) = self.rate {
            obj.insert("rate".into(), rate.into());
        }
        if let Some(notes) = &self.notes {
            obj.insert("notes".into(), Value::String(notes.clone()));
        }
        if let Some(category) = &self.category {
            obj.insert("category".into(), Value::String(category.clone()));
        }
        if let Some(image) = &self.image_ref {
            obj.insert("image".into(), Value::String(image.clone()));
        }
        obj.insert("created_at".into(), wire::to_millis(self.created_at).into());
        obj.insert("updated_at".into(), wire::to_millis(self.updated_at).into());
        Value::Object(obj)
    }
}

/// Decode a full product-collection snapshot, skipping malformed records.
///
/// `Null` (absent collection) decodes to an empty list.
pub fn decode_product_map(raw: &Value) -> Vec<Product> {
    let Some(map) = raw.as_object() else {
        if !raw.is_null() {
            warn!("product collection snapshot is not an object, ignoring");
        }
        return Vec::new();
    };

    map.iter()
        .filter_map(|(id, record)| {
            let product = Product::from_value(id, record);
            if product.is_none() {
                warn!(product = id.as_str(), "skipping malformed product record");
            }
            product
        })
        .collect()
}

/// Sort products by last update, newest first. Stable, so equal
/// timestamps keep their store order.
pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
