//! Unit-of-measure tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Closed enumeration of unit-of-measure tags.
///
/// The tag is set once per product and never mutated by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitTag {
    Piece,
    Meter,
    Foot,
    Length,
    Box,
    Sqft,
    Pcs,
    Kgs,
    Pkt,
    Roll,
    Set,
    Carton,
    Bundle,
    Dozen,
    Kg,
    Inch,
    Cm,
    Mm,
}

impl UnitTag {
    /// The canonical default for records missing a unit.
    pub const CANONICAL: UnitTag = UnitTag::Piece;

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitTag::Piece => "piece",
            UnitTag::Meter => "meter",
            UnitTag::Foot => "foot",
            UnitTag::Length => "length",
            UnitTag::Box => "box",
            UnitTag::Sqft => "sqft",
            UnitTag::Pcs => "pcs",
            UnitTag::Kgs => "kgs",
            UnitTag::Pkt => "pkt",
            UnitTag::Roll => "roll",
            UnitTag::Set => "set",
            UnitTag::Carton => "carton",
            UnitTag::Bundle => "bundle",
            UnitTag::Dozen => "dozen",
            UnitTag::Kg => "kg",
            UnitTag::Inch => "inch",
            UnitTag::Cm => "cm",
            UnitTag::Mm => "mm",
        }
    }

    /// Strict parse of a wire tag.
    pub fn parse(raw: &str) -> Option<UnitTag> {
        let tag = match raw {
            "piece" => UnitTag::Piece,
            "meter" => UnitTag::Meter,
            "foot" => UnitTag::Foot,
            "length" => UnitTag::Length,
            "box" => UnitTag::Box,
            "sqft" => UnitTag::Sqft,
            "pcs" => UnitTag::Pcs,
            "kgs" => UnitTag::Kgs,
            "pkt" => UnitTag::Pkt,
            "roll" => UnitTag::Roll,
            "set" => UnitTag::Set,
            "carton" => UnitTag::Carton,
            "bundle" => UnitTag::Bundle,
            "dozen" => UnitTag::Dozen,
            "kg" => UnitTag::Kg,
            "inch" => UnitTag::Inch,
            "cm" => UnitTag::Cm,
            "mm" => UnitTag::Mm,
            _ => return None,
        };
        Some(tag)
    }

    /// Lenient boundary parse: absent or unknown tags normalize to the
    /// canonical unit.
    pub fn parse_lenient(raw: Option<&str>) -> UnitTag {
        match raw {
            None => UnitTag::CANONICAL,
            Some(s) => UnitTag::parse(s).unwrap_or_else(|| {
                warn!(unit = s, "unknown unit tag, normalizing to canonical");
                UnitTag::CANONICAL
            }),
        }
    }
}

impl Default for UnitTag {
    fn default() -> Self {
        UnitTag::CANONICAL
    }
}

impl fmt::Display for UnitTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
