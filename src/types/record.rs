//! Normalized catalog records and the raw upstream wire types.
//!
//! Handles the `/catalog/item/{id}` response from the upstream catalog
//! service and converts it into [`Record`]. Catalog entries vary in
//! completeness, so every field except `id` deserializes with a default
//! and normalization never fails once the body parses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A normalized catalog item.
///
/// `id` is the stable identity key; everything else is best-effort.
/// Fields absent upstream come through as empty collections or `None`,
/// never as a failure of the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Category names, in upstream order.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Numeric stats keyed by stat name (e.g. "hp" → 44.0).
    #[serde(default)]
    pub numeric_attributes: BTreeMap<String, f64>,
    /// Named attribute groups, each an ordered list of names
    /// (e.g. "abilities" → ["torrent", "rain-dish"]).
    #[serde(default)]
    pub attribute_groups: BTreeMap<String, Vec<String>>,
    /// Image URLs keyed by variant name. A variant may be present with a
    /// null URL; both are preserved as `None`-tolerant entries.
    #[serde(default)]
    pub images: BTreeMap<String, Option<String>>,
}

/// A raw catalog item as returned by `GET /catalog/item/{id}`.
///
/// Only `id` is required; every other field defaults when missing.
#[derive(Debug, Deserialize)]
pub(crate) struct RawItem {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<RawCategoryEntry>,
    #[serde(default)]
    pub stats: Vec<RawStatEntry>,
    #[serde(default)]
    pub attributes: Vec<RawAttributeGroup>,
    #[serde(default)]
    pub images: BTreeMap<String, Option<String>>,
}

/// Nested category reference: `{ "category": { "name": "water" } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawCategoryEntry {
    #[serde(default)]
    pub category: Option<RawNamed>,
}

/// Nested stat entry: `{ "value": 44, "stat": { "name": "hp" } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawStatEntry {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub stat: Option<RawNamed>,
}

/// Nested attribute group:
/// `{ "group": { "name": "abilities" }, "entries": [ { "name": ... } ] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawAttributeGroup {
    #[serde(default)]
    pub group: Option<RawNamed>,
    #[serde(default)]
    pub entries: Vec<RawNamed>,
}

/// The `{ "name": ... }` leaf the catalog nests everywhere.
#[derive(Debug, Deserialize)]
pub(crate) struct RawNamed {
    #[serde(default)]
    pub name: String,
}

impl RawItem {
    /// Normalize a raw catalog item into a [`Record`].
    ///
    /// Entries with a missing nested name are dropped rather than
    /// surfaced as empty keys; a stat without a value is skipped.
    pub(crate) fn into_record(self) -> Record {
        let categories = self
            .categories
            .into_iter()
            .filter_map(|c| c.category.map(|n| n.name))
            .filter(|name| !name.is_empty())
            .collect();

        let numeric_attributes = self
            .stats
            .into_iter()
            .filter_map(|s| match (s.stat, s.value) {
                (Some(stat), Some(value)) if !stat.name.is_empty() => Some((stat.name, value)),
                _ => None,
            })
            .collect();

        let attribute_groups = self
            .attributes
            .into_iter()
            .filter_map(|g| {
                let group = g.group.map(|n| n.name).filter(|name| !name.is_empty())?;
                let entries: Vec<String> = g
                    .entries
                    .into_iter()
                    .map(|e| e.name)
                    .filter(|name| !name.is_empty())
                    .collect();
                Some((group, entries))
            })
            .collect();

        Record {
            id: self.id,
            name: self.name,
            categories,
            numeric_attributes,
            attribute_groups,
            images: self.images,
        }
    }
}
