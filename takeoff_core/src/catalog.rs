//! # Pay-Item Catalog
//!
//! The BOQ mapper only needs to look pay items up: by exact item number, or
//! by trade. [`PayItemCatalog`] is that contract; where the items come from is
//! up to the caller.
//!
//! [`InMemoryCatalog::standard`] carries the DPWH items the default settings
//! refer to, plus common finishing, roofing, and schedule items.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::catalog::{InMemoryCatalog, PayItemCatalog};
//!
//! let catalog = InMemoryCatalog::standard();
//! let item = catalog.find_by_item_number("900 (1) a").unwrap();
//! assert_eq!(item.unit.symbol(), "cu.m");
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::takeoff::Trade;
use crate::units::Unit;

/// One pay item of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_number: String,
    pub description: String,
    pub unit: Unit,
    pub trade: Trade,
    #[serde(default)]
    pub category: String,
}

impl CatalogItem {
    pub fn new(
        item_number: impl Into<String>,
        description: impl Into<String>,
        unit: Unit,
        trade: Trade,
        category: impl Into<String>,
    ) -> Self {
        CatalogItem {
            item_number: item_number.into(),
            description: description.into(),
            unit,
            trade,
            category: category.into(),
        }
    }
}

/// Read-only pay-item lookup
pub trait PayItemCatalog: Sync {
    fn find_by_item_number(&self, item_number: &str) -> Option<&CatalogItem>;

    fn filter_by_trade(&self, trade: Trade) -> Vec<&CatalogItem>;

    fn contains(&self, item_number: &str) -> bool {
        self.find_by_item_number(item_number).is_some()
    }
}

/// Catalog held in memory, indexed by item number.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<CatalogItem>,
    index: HashMap<String, usize>,
}

impl InMemoryCatalog {
    /// Build a catalog. A later duplicate item number replaces the earlier entry.
    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        let mut catalog = InMemoryCatalog::default();
        for item in items {
            match catalog.index.get(&item.item_number) {
                Some(&i) => {
                    tracing::warn!("catalog: duplicate item number '{}' replaced", item.item_number);
                    catalog.items[i] = item;
                }
                None => {
                    catalog.index.insert(item.item_number.clone(), catalog.items.len());
                    catalog.items.push(item);
                }
            }
        }
        catalog
    }

    /// Parse a JSON array of catalog items.
    pub fn from_json(json: &str) -> CalcResult<Self> {
        let items: Vec<CatalogItem> =
            serde_json::from_str(json).map_err(|e| CalcError::SerializationError { reason: e.to_string() })?;
        Ok(Self::from_items(items))
    }

    /// The built-in catalog
    pub fn standard() -> &'static InMemoryCatalog {
        &STANDARD_CATALOG
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PayItemCatalog for InMemoryCatalog {
    fn find_by_item_number(&self, item_number: &str) -> Option<&CatalogItem> {
        self.index.get(item_number).map(|&i| &self.items[i])
    }

    fn filter_by_trade(&self, trade: Trade) -> Vec<&CatalogItem> {
        self.items.iter().filter(|item| item.trade == trade).collect()
    }
}

static STANDARD_CATALOG: Lazy<InMemoryCatalog> = Lazy::new(|| {
    use Trade::*;
    use Unit::*;
    InMemoryCatalog::from_items(vec![
        CatalogItem::new("900 (1) a", "Structural Concrete, Class A, 28 days", CubicMeter, Concrete, "Concrete"),
        CatalogItem::new("900 (1) c", "Structural Concrete, Class C, 28 days", CubicMeter, Concrete, "Concrete"),
        CatalogItem::new("902 (1) a1", "Reinforcing Steel, Grade 40", Kilogram, Rebar, "Reinforcement"),
        CatalogItem::new("902 (1) a2", "Reinforcing Steel, Grade 60", Kilogram, Rebar, "Reinforcement"),
        CatalogItem::new("903 (2)", "Formworks and Falseworks", SquareMeter, Formwork, "Formwork"),
        CatalogItem::new("1003 (1)", "Carpentry and Joinery Works", SquareMeter, Finishes, "Carpentry"),
        CatalogItem::new("1018 (1)", "Glazed Tiles and Trims", SquareMeter, Finishes, "Tiles"),
        CatalogItem::new("1027 (1)", "Cement Plaster Finish", SquareMeter, Finishes, "Plaster"),
        CatalogItem::new("1032 (1) a", "Painting Works, Masonry/Concrete", SquareMeter, Finishes, "Painting"),
        CatalogItem::new("1014 (1) b", "Pre-painted Metal Sheets, Long Span", SquareMeter, Roofing, "Roof covering"),
        CatalogItem::new("1047 (3)", "Structural Steel, Roof Framing", Kilogram, Roofing, "Roof framing"),
        CatalogItem::new("1008 (1) a", "Aluminum Glass Windows", SquareMeter, ScheduleItems, "Windows"),
        CatalogItem::new("1009 (1)", "Finishing Hardware", Set, ScheduleItems, "Hardware"),
        CatalogItem::new("1010 (2) a", "Wooden Doors, Flush Type", Set, ScheduleItems, "Doors"),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_has_defaults() {
        let catalog = InMemoryCatalog::standard();
        for item in ["900 (1) a", "902 (1) a1", "902 (1) a2", "903 (2)"] {
            assert!(catalog.contains(item), "{} missing", item);
        }
        assert!(!catalog.contains("999"));
    }

    #[test]
    fn test_filter_by_trade() {
        let rebar = InMemoryCatalog::standard().filter_by_trade(Trade::Rebar);
        assert_eq!(rebar.len(), 2);
        assert!(rebar.iter().all(|item| item.unit == Unit::Kilogram));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"item_number": "900 (1) a", "description": "Concrete", "unit": "cu.m", "trade": "Concrete"},
            {"item_number": "1009 (1)", "description": "Hardware", "unit": "set", "trade": "Schedule Items", "category": "Hardware"}
        ]"#;
        let catalog = InMemoryCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find_by_item_number("1009 (1)").unwrap().trade, Trade::ScheduleItems);
    }

    #[test]
    fn test_duplicate_replaces() {
        let catalog = InMemoryCatalog::from_items(vec![
            CatalogItem::new("X", "first", Unit::Lot, Trade::Concrete, ""),
            CatalogItem::new("X", "second", Unit::Lot, Trade::Concrete, ""),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find_by_item_number("X").unwrap().description, "second");
    }

    #[test]
    fn test_malformed_json() {
        assert!(InMemoryCatalog::from_json("{}").is_err());
    }
}
