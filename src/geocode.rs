// src/geocode.rs

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::task::JoinSet;

use crate::geo::GeoPoint;

/// Default reverse-geocoding endpoint (OpenStreetMap Nominatim).
pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Placeholder name for entities that have no position at all.
pub const UNKNOWN_LOCATION: &str = "Location not specified";

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedName {
    point: GeoPoint,
    name: String,
}

/// Resolves coordinates to human-readable place names, with graceful
/// degradation and per-entity caching.
///
/// A lookup failure of any kind (network error, non-success status,
/// malformed body, missing field) degrades to the fixed-precision
/// `"lat, lon"` string; it is never surfaced as an error. An entity with
/// no position resolves to [`UNKNOWN_LOCATION`].
///
/// The cache is keyed by entity id and lives as long as the geocoder
/// value; a cached name is reused only while the entity's position is
/// unchanged, so a refreshed entity that moved is resolved again.
pub struct ReverseGeocoder {
    http_client: Client,
    base_url: String,
    cache: HashMap<String, CachedName>,
}

impl ReverseGeocoder {
    pub fn new() -> Self {
        Self::with_base_url(NOMINATIM_REVERSE_URL)
    }

    /// Creates a geocoder against a custom lookup endpoint. The endpoint
    /// must accept Nominatim-style `format/lat/lon` query parameters and
    /// answer with a JSON object carrying `display_name`.
    pub fn with_base_url(base_url: &str) -> Self {
        // Nominatim's usage policy rejects requests without a User-Agent.
        let http_client = Client::builder()
            .user_agent(concat!("emeloc-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        ReverseGeocoder {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: HashMap::new(),
        }
    }

    /// Resolves a single point, bypassing the cache.
    pub async fn resolve(&self, point: &GeoPoint) -> String {
        lookup(&self.http_client, &self.base_url, point)
            .await
            .unwrap_or_else(|| point.to_fixed_string())
    }

    /// Resolves a batch of entities concurrently.
    ///
    /// All uncached lookups are issued at once and the result map is
    /// returned only after every one of them has settled, so a consumer
    /// renders a complete set of names instead of a flickering partial one.
    pub async fn resolve_batch(
        &mut self,
        entities: &[(String, Option<GeoPoint>)],
    ) -> HashMap<String, String> {
        let mut results = HashMap::new();
        let mut pending = Vec::new();

        for (id, point) in entities {
            match point {
                None => {
                    results.insert(id.clone(), UNKNOWN_LOCATION.to_string());
                }
                Some(point) => match self.cache.get(id) {
                    Some(cached) if cached.point == *point => {
                        results.insert(id.clone(), cached.name.clone());
                    }
                    _ => pending.push((id.clone(), *point)),
                },
            }
        }

        let mut lookups = JoinSet::new();
        for (id, point) in pending {
            let http_client = self.http_client.clone();
            let base_url = self.base_url.clone();
            lookups.spawn(async move {
                let name = lookup(&http_client, &base_url, &point)
                    .await
                    .unwrap_or_else(|| point.to_fixed_string());
                (id, point, name)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            if let Ok((id, point, name)) = joined {
                self.cache
                    .insert(id.clone(), CachedName { point, name: name.clone() });
                results.insert(id, name);
            }
        }

        results
    }

    /// Returns the cached name for an entity, if one is held.
    pub fn cached(&self, id: &str) -> Option<&str> {
        self.cache.get(id).map(|c| c.name.as_str())
    }

    /// Drops all cached names, forcing the next batch to re-resolve.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for ReverseGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

async fn lookup(http_client: &Client, base_url: &str, point: &GeoPoint) -> Option<String> {
    let url = format!(
        "{}?format=jsonv2&lat={}&lon={}",
        base_url, point.latitude, point.longitude
    );

    let response = match http_client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("Reverse geocoding request failed: {}", e);
            return None;
        }
    };

    if !response.status().is_success() {
        log::warn!(
            "Reverse geocoding returned status {} for {}",
            response.status(),
            url
        );
        return None;
    }

    match response.json::<ReverseResponse>().await {
        Ok(body) => body.display_name,
        Err(e) => {
            log::warn!("Reverse geocoding response was not usable JSON: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on the discard port, so every lookup fails fast and
    // exercises the degradation path without touching the network.
    fn unreachable_geocoder() -> ReverseGeocoder {
        ReverseGeocoder::with_base_url("http://127.0.0.1:9/reverse")
    }

    #[tokio::test]
    async fn failed_lookup_falls_back_to_fixed_precision_coordinates() {
        let geocoder = unreachable_geocoder();
        let name = geocoder.resolve(&GeoPoint::new(12.345678, 77.123456)).await;
        assert_eq!(name, "12.345678, 77.123456");
    }

    #[tokio::test]
    async fn absent_position_resolves_to_placeholder() {
        let mut geocoder = unreachable_geocoder();
        let names = geocoder
            .resolve_batch(&[("case-1".to_string(), None)])
            .await;
        assert_eq!(names["case-1"], UNKNOWN_LOCATION);
        // No point means nothing worth caching.
        assert_eq!(geocoder.cached("case-1"), None);
    }

    #[tokio::test]
    async fn batch_settles_every_entity() {
        let mut geocoder = unreachable_geocoder();
        let entities = vec![
            ("amb-1".to_string(), Some(GeoPoint::new(17.4, 78.5))),
            ("amb-2".to_string(), Some(GeoPoint::new(12.9, 77.6))),
            ("amb-3".to_string(), None),
        ];
        let names = geocoder.resolve_batch(&entities).await;
        assert_eq!(names.len(), 3);
        assert_eq!(names["amb-1"], "17.400000, 78.500000");
        assert_eq!(names["amb-2"], "12.900000, 77.600000");
        assert_eq!(names["amb-3"], UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn cache_is_keyed_by_entity_id_and_position() {
        let mut geocoder = unreachable_geocoder();
        let first = vec![("amb-1".to_string(), Some(GeoPoint::new(17.4, 78.5)))];
        let names = geocoder.resolve_batch(&first).await;
        assert_eq!(names["amb-1"], "17.400000, 78.500000");
        assert_eq!(geocoder.cached("amb-1"), Some("17.400000, 78.500000"));

        // Same id, same position: served from cache.
        let names = geocoder.resolve_batch(&first).await;
        assert_eq!(names["amb-1"], "17.400000, 78.500000");

        // Same id, new position: re-resolved, cache replaced.
        let moved = vec![("amb-1".to_string(), Some(GeoPoint::new(17.5, 78.6)))];
        let names = geocoder.resolve_batch(&moved).await;
        assert_eq!(names["amb-1"], "17.500000, 78.600000");
        assert_eq!(geocoder.cached("amb-1"), Some("17.500000, 78.600000"));
    }

    #[tokio::test]
    async fn clear_forces_re_resolution() {
        let mut geocoder = unreachable_geocoder();
        let entities = vec![("amb-1".to_string(), Some(GeoPoint::new(17.4, 78.5)))];
        geocoder.resolve_batch(&entities).await;
        assert!(geocoder.cached("amb-1").is_some());
        geocoder.clear();
        assert_eq!(geocoder.cached("amb-1"), None);
    }
}
