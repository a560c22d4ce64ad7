//! Watch entry data models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque id of the conversation that owns a watch entry.
pub type OwnerId = i64;

/// Storage-assigned primary key of a watch entry.
pub type WatchId = i64;

/// A location as resolved by the listing source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub id: String,
}

impl Location {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Optional numeric filters of a standing query. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchFilters {
    pub price: Option<u64>,
    pub rooms: Option<u64>,
    pub area: Option<u64>,
    pub radius: Option<u64>,
}

/// Everything needed to persist a new entry; the id and count are assigned
/// by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWatch {
    pub owner_id: OwnerId,
    pub location: Location,
    pub filters: WatchFilters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    pub id: WatchId,
    pub owner_id: OwnerId,
    pub location: Location,
    pub filters: WatchFilters,
    /// `None` until the poller records the first observation.
    pub last_count: Option<u64>,
}

impl WatchEntry {
    /// One-line description used in listings, choices and alerts.
    pub fn summary(&self) -> String {
        format!("{} ({})", self.location.name, self.filters)
    }
}

impl fmt::Display for WatchFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            self.price.map(|price| format!("{price}€")),
            self.area.map(|area| format!("{area}m²")),
            self.rooms.map(|rooms| format!("{rooms} rooms")),
            self.radius.map(|radius| format!("{radius}km")),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            f.write_str("no filters")
        } else {
            f.write_str(&parts.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_skips_unset_filters() {
        let entry = WatchEntry {
            id: 3,
            owner_id: 9,
            location: Location::new("Berlin", "1276003001"),
            filters: WatchFilters {
                price: Some(900),
                rooms: None,
                area: Some(60),
                radius: None,
            },
            last_count: None,
        };

        assert_eq!(entry.summary(), "Berlin (900€/60m²)");
    }

    #[test]
    fn test_summary_without_filters() {
        let entry = WatchEntry {
            id: 1,
            owner_id: 9,
            location: Location::new("Köln", "1276005001"),
            filters: WatchFilters::default(),
            last_count: Some(12),
        };

        assert_eq!(entry.summary(), "Köln (no filters)");
    }
}
