//! Adapter for the external listing-count service.

use async_trait::async_trait;

use crate::{
    db::{Location, WatchFilters},
    error::SourceError,
};

mod immoscout;

pub use immoscout::ImmoScoutClient;

#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Candidate locations for a free-text query, in upstream order.
    async fn resolve_locations(&self, query: &str) -> Result<Vec<Location>, SourceError>;

    /// Number of listings currently matching the location and filters.
    async fn count(&self, location: &Location, filters: &WatchFilters) -> Result<u64, SourceError>;
}

/// Form fields of a count query. Absent filters and zero values are left
/// out entirely.
pub fn count_form(location: &Location, filters: &WatchFilters) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("world", "LIVING".to_string()),
        ("location", location.name.clone()),
        ("gacId", location.id.clone()),
    ];

    let present = |value: Option<u64>| value.filter(|value| *value != 0);

    if let Some(price) = present(filters.price) {
        form.push(("price", price.to_string()));
    }
    if let Some(rooms) = present(filters.rooms) {
        form.push(("noOfRooms", rooms.to_string()));
    }
    if let Some(area) = present(filters.area) {
        form.push(("area", area.to_string()));
    }
    if let Some(radius) = present(filters.radius) {
        form.push(("radius", format!("Km{radius}")));
    }

    form
}


#[cfg(test)]
mod tests {
    use super::*;

    fn keys(form: &[(&'static str, String)]) -> Vec<&'static str> {
        form.iter().map(|(key, _)| *key).collect()
    }

    #[test]
    fn test_count_form_without_filters() {
        let form = count_form(&Location::new("Berlin", "1276003001"), &WatchFilters::default());
        assert_eq!(keys(&form), vec!["world", "location", "gacId"]);
        assert_eq!(form[2].1, "1276003001");
    }

    #[test]
    fn test_count_form_with_all_filters() {
        let filters = WatchFilters {
            price: Some(800),
            rooms: Some(2),
            area: Some(55),
            radius: Some(10),
        };
        let form = count_form(&Location::new("Köln", "1276005001"), &filters);

        assert_eq!(
            form[3..].to_vec(),
            vec![
                ("price", "800".to_string()),
                ("noOfRooms", "2".to_string()),
                ("area", "55".to_string()),
                ("radius", "Km10".to_string()),
            ]
        );
    }

    #[test]
    fn test_count_form_treats_zero_as_absent() {
        let filters = WatchFilters {
            price: Some(0),
            rooms: Some(3),
            area: Some(0),
            radius: Some(0),
        };
        let form = count_form(&Location::new("Bonn", "x"), &filters);
        assert_eq!(keys(&form), vec!["world", "location", "gacId", "noOfRooms"]);
    }
}
