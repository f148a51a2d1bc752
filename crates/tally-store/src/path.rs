//! Logical key paths into the remote store.
//!
//! Paths are `/`-separated and hierarchical. The engine consumes a small,
//! fixed set of top-level collections plus per-product history subtrees.

use std::fmt;

/// Top-level collection holding catalog products.
pub const PRODUCTS: &str = "products";
/// Parallel collection of manually-entered products; same shape, same
/// ledger contract.
pub const MANUAL_PRODUCTS: &str = "manual_products";
/// Top-level collection holding inventory groups.
pub const GROUPS: &str = "groups";
/// Root of the per-product transaction history subtrees.
pub const TRANSACTIONS: &str = "transactions";

/// A slash-separated key path into the remote store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(String);

impl StorePath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The catalog product collection.
    pub fn products() -> Self {
        Self::new(PRODUCTS)
    }

    /// The manually-entered product collection.
    pub fn manual_products() -> Self {
        Self::new(MANUAL_PRODUCTS)
    }

    /// The inventory group collection.
    pub fn groups() -> Self {
        Self::new(GROUPS)
    }

    /// The root containing every product's history subtree.
    pub fn history_root() -> Self {
        Self::new(TRANSACTIONS)
    }

    /// The transaction history subtree for one product.
    pub fn history(product_id: &str) -> Self {
        Self(format!("{}/{}", TRANSACTIONS, product_id))
    }

    /// A child key under this path.
    pub fn child(&self, key: &str) -> Self {
        Self(format!("{}/{}", self.0, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate the path's segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Whether a write at `changed` affects the value observed at `self`.
    ///
    /// True when either path is a segment-prefix of the other: a write
    /// below a watched path changes the watched subtree, and a write above
    /// it replaces the subtree wholesale.
    pub fn is_affected_by(&self, changed: &StorePath) -> bool {
        self == changed
            || changed.0.starts_with(&format!("{}/", self.0))
            || self.0.starts_with(&format!("{}/", changed.0))
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_path_shape() {
        assert_eq!(StorePath::history("p-1").as_str(), "transactions/p-1");
        assert_eq!(
            StorePath::history_root().child("p-1"),
            StorePath::history("p-1")
        );
    }

    #[test]
    fn test_affected_by_prefix_both_ways() {
        let products = StorePath::products();
        let product = products.child("p-1");

        assert!(products.is_affected_by(&product));
        assert!(product.is_affected_by(&products));
        assert!(products.is_affected_by(&products));
    }

    #[test]
    fn test_unrelated_paths_not_affected() {
        let products = StorePath::products();
        let groups = StorePath::groups();

        assert!(!products.is_affected_by(&groups));
        // Sibling keys sharing a string prefix are still unrelated.
        let a = StorePath::new("transactions/p-1");
        let b = StorePath::new("transactions/p-10");
        assert!(!a.is_affected_by(&b));
    }
}
