//! Ledger entries: immutable signed quantity deltas.

use crate::unit::UnitTag;
use crate::wire;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

/// Where an adjustment originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxSource {
    Manual,
    Quotation,
    Purchase,
}

impl TxSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxSource::Manual => "manual",
            TxSource::Quotation => "quotation",
            TxSource::Purchase => "purchase",
        }
    }

    pub fn parse_lenient(raw: Option<&str>) -> TxSource {
        match raw {
            Some("manual") | None => TxSource::Manual,
            Some("quotation") => TxSource::Quotation,
            Some("purchase") => TxSource::Purchase,
            Some(other) => {
                warn!(source = other, "unknown transaction source, treating as manual");
                TxSource::Manual
            }
        }
    }
}

/// One append-only ledger entry under a product's history path.
///
/// Product name and unit are denormalized at write time and never
/// re-derived. Entries are never edited or deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct StockTransaction {
    /// Store-generated key.
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit: UnitTag,
    /// Signed delta: positive increases stock, negative decreases it.
    pub delta: f64,
    pub source: TxSource,
    pub note: String,
    pub actor: Option<String>,
    /// Correlating quotation/purchase identifier, when applicable.
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    pub fn from_value(id: &str, raw: &Value) -> Option<StockTransaction> {
        let obj = raw.as_object()?;
        Some(StockTransaction {
            id: id.to_string(),
            product_id: wire::str_field(obj, "product_id").unwrap_or_default(),
            product_name: wire::str_field(obj, "product_name").unwrap_or_default(),
            unit: UnitTag::parse_lenient(obj.get("unit").and_then(Value::as_str)),
            delta: wire::f64_field(obj, "delta").unwrap_or(0.0),
            source: TxSource::parse_lenient(obj.get("source").and_then(Value::as_str)),
            note: wire::str_field(obj, "note").unwrap_or_default(),
            actor: wire::str_field(obj, "actor"),
            reference: wire::str_field(obj, "reference"),
            created_at: wire::ts_field(obj, "created_at").unwrap_or(DateTime::UNIX_EPOCH),
        })
    }

    /// Encode the record body (the store supplies the key on append).
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("product_id".into(), Value::String(self.product_id.clone()));
        obj.insert(
            "product_name".into(),
            Value::String(self.product_name.clone()),
        );
        obj.insert("unit".into(), Value::String(self.unit.as_str().to_string()));
        obj.insert("delta".into(), self.delta.into());
        obj.insert(
            "source".into(),
            Value::String(self.source.as_str().to_string()),
        );
        obj.insert("note".into(), Value::String(self.note.clone()));
        if let Some(actor) = &self.actor {
            obj.insert("actor".into(), Value::String(actor.clone()));
        }
        if let Some(reference) = &self.reference {
            obj.insert("reference".into(), Value::String(reference.clone()));
        }
        obj.insert("created_at".into(), wire::to_millis(self.created_at).into());
        Value::Object(obj)
    }
}

/// Decode one product's history subtree. `Null` decodes to empty.
pub fn decode_history(raw: &Value) -> Vec<StockTransaction> {
    let Some(map) = raw.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(id, record)| {
            let tx = StockTransaction::from_value(id, record);
            if tx.is_none() {
                warn!(transaction = id.as_str(), "skipping malformed ledger entry");
            }
            tx
        })
        .collect()
}

/// Display order: newest first, ties broken by store key (descending, so
/// later-generated keys sort first). The key order is stable.
pub fn sort_newest_first(transactions: &mut [StockTransaction]) {
    transactions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
