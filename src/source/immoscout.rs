use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    db::{Location, WatchFilters},
    error::SourceError,
    settings::SourceSettings,
};

use super::{count_form, ListingSource};

/// REST client for the ImmobilienScout24 search endpoints.
pub struct ImmoScoutClient {
    locations_url: String,
    count_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct LocationHit {
    entity: LocationEntity,
}

#[derive(Debug, Deserialize)]
struct LocationEntity {
    label: String,
    id: Value,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    error: Option<Value>,
}

impl ImmoScoutClient {
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            locations_url: settings.locations_url.clone(),
            count_url: settings.count_url.clone(),
            http,
        })
    }
}

#[async_trait]
impl ListingSource for ImmoScoutClient {
    async fn resolve_locations(&self, query: &str) -> Result<Vec<Location>, SourceError> {
        let resp = self
            .http
            .get(&self.locations_url)
            .query(&[("i", query)])
            .send()
            .await?;

        let body = success_body(resp).await?;
        parse_locations(&body)
    }

    async fn count(&self, location: &Location, filters: &WatchFilters) -> Result<u64, SourceError> {
        let form = count_form(location, filters);
        debug!("Count query for {}: {:?}", location.name, form);

        let resp = self.http.post(&self.count_url).form(&form).send().await?;

        let body = success_body(resp).await?;
        parse_count(&body)
    }
}

async fn success_body(resp: Response) -> Result<String, SourceError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status,
            body: truncate(&body),
        });
    }

    Ok(resp.text().await?)
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

fn parse_locations(body: &str) -> Result<Vec<Location>, SourceError> {
    let hits: Vec<LocationHit> = serde_json::from_str(body)
        .map_err(|e| SourceError::Decode(format!("location list: {e}")))?;

    hits.into_iter()
        .map(|hit| {
            let id = match hit.entity.id {
                Value::String(id) => id,
                Value::Number(id) => id.to_string(),
                other => {
                    return Err(SourceError::Decode(format!(
                        "location id for {} is not a scalar: {other}",
                        hit.entity.label
                    )))
                }
            };
            Ok(Location::new(hit.entity.label, id))
        })
        .collect()
}

fn parse_count(body: &str) -> Result<u64, SourceError> {
    let parsed: CountResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::Decode(format!("count response: {e}")))?;

    if let Some(flag) = parsed.error.as_ref().filter(|flag| error_flag_set(flag)) {
        return Err(SourceError::Upstream(flag.to_string()));
    }

    parsed
        .count
        .ok_or_else(|| SourceError::Decode(format!("count missing in {}", truncate(body))))
}

fn error_flag_set(flag: &Value) -> bool {
    match flag {
        Value::Null => false,
        Value::Bool(set) => *set,
        Value::String(message) => !message.is_empty(),
        Value::Number(code) => code.as_i64() != Some(0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations_keeps_upstream_order() {
        let body = r#"[
            {"entity": {"label": "Berlin", "id": "1276003001", "type": "city"}},
            {"entity": {"label": "Berlin-Mitte", "id": 1276003001001}}
        ]"#;

        let locations = parse_locations(body).unwrap();
        assert_eq!(
            locations,
            vec![
                Location::new("Berlin", "1276003001"),
                Location::new("Berlin-Mitte", "1276003001001"),
            ]
        );
    }

    #[test]
    fn test_parse_locations_empty() {
        assert!(parse_locations("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(r#"{"count": 17}"#).unwrap(), 17);
        assert_eq!(parse_count(r#"{"count": 3, "error": false}"#).unwrap(), 3);
    }

    #[test]
    fn test_parse_count_error_flag() {
        let err = parse_count(r#"{"count": 0, "error": true}"#).unwrap_err();
        assert!(matches!(err, SourceError::Upstream(_)));

        let err = parse_count(r#"{"error": "invalid gacId"}"#).unwrap_err();
        assert!(matches!(err, SourceError::Upstream(_)));
    }

    #[test]
    fn test_parse_count_garbage() {
        assert!(matches!(
            parse_count("<html>maintenance</html>").unwrap_err(),
            SourceError::Decode(_)
        ));
        assert!(matches!(
            parse_count("{}").unwrap_err(),
            SourceError::Decode(_)
        ));
    }
}
