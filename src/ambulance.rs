// src/ambulance.rs

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EmelocError;
use crate::geo::{decode_point_hex, GeoPoint};
use crate::poller::{PollerHandle, PositionPoller};
use crate::Emeloc;

/// Operational status of an ambulance. Wire values the client does not
/// recognize deserialize as `Unknown` rather than failing the whole list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbulanceStatus {
    Available,
    Busy,
    Maintenance,
    #[default]
    Unknown,
}

impl AmbulanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmbulanceStatus::Available => "available",
            AmbulanceStatus::Busy => "busy",
            AmbulanceStatus::Maintenance => "maintenance",
            AmbulanceStatus::Unknown => "unknown",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "available" => AmbulanceStatus::Available,
            "busy" => AmbulanceStatus::Busy,
            "maintenance" => AmbulanceStatus::Maintenance,
            _ => AmbulanceStatus::Unknown,
        }
    }
}

impl Serialize for AmbulanceStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AmbulanceStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(AmbulanceStatus::from_wire(&value))
    }
}

/// Position fields as the backend reports them: coordinates it already
/// decoded, plus an optional resolved place name.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AmbulanceLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "placeName", skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
}

/// An ambulance record as returned by the backend.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ambulance {
    pub id: String,
    pub license_plate: String,
    #[serde(default)]
    pub status: AmbulanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<AmbulanceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkb: Option<String>,

    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

impl Ambulance {
    /// Resolves the ambulance's raw position into usable coordinates.
    ///
    /// Coordinates the backend already decoded win when they are in range;
    /// otherwise the raw WKB hex is decoded. `None` means the ambulance has
    /// no displayable position yet, which is an expected state, not an error.
    pub fn position(&self) -> Option<GeoPoint> {
        if let Some(location) = &self.location {
            if let (Some(latitude), Some(longitude)) = (location.latitude, location.longitude) {
                let point = GeoPoint::new(latitude, longitude);
                if point.is_valid() {
                    return Some(point);
                }
            }
        }
        self.wkb.as_deref().and_then(decode_point_hex)
    }

    /// Builds the map-renderer input for this ambulance, if it has a
    /// resolvable position.
    pub fn marker(&self) -> Option<MapMarker> {
        self.position().map(|point| MapMarker {
            latitude: point.latitude,
            longitude: point.longitude,
            status: self.status,
        })
    }
}

/// Input for an external map renderer: a positioned, status-colored pin.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub status: AmbulanceStatus,
}

/// Resolves a fetched entity list down to the markers worth rendering,
/// dropping entities without a usable position.
pub fn resolve_markers(ambulances: &[Ambulance]) -> Vec<MapMarker> {
    ambulances.iter().filter_map(Ambulance::marker).collect()
}

/// Fields accepted when registering or editing an ambulance.
#[derive(Serialize, Debug)]
pub struct AmbulancePayload<'a> {
    pub license_plate: &'a str,
    pub status: AmbulanceStatus,
}

#[derive(Debug, Deserialize)]
struct AmbulancesResponse {
    #[serde(default)]
    ambulances: Vec<Ambulance>,
}

#[derive(Serialize, Debug)]
struct StatusUpdate {
    status: AmbulanceStatus,
}

/// Provides methods for managing and observing the ambulance fleet.
pub struct AmbulanceHandle<'a> {
    client: &'a Emeloc,
}

impl<'a> AmbulanceHandle<'a> {
    pub(crate) fn new(client: &'a Emeloc) -> Self {
        AmbulanceHandle { client }
    }

    /// Lists the whole fleet.
    /// Corresponds to GET api/ambulances.
    pub async fn list(&self) -> Result<Vec<Ambulance>, EmelocError> {
        let response: AmbulancesResponse = self
            .client
            ._request(Method::GET, "ambulances", None::<&Value>)
            .await?;
        Ok(response.ambulances)
    }

    /// Lists ambulances currently available for assignment.
    pub async fn available(&self) -> Result<Vec<Ambulance>, EmelocError> {
        let mut ambulances = self.list().await?;
        ambulances.retain(|a| a.status == AmbulanceStatus::Available);
        Ok(ambulances)
    }

    /// Registers a new ambulance.
    pub async fn create(&self, ambulance: &AmbulancePayload<'_>) -> Result<Value, EmelocError> {
        self.client
            ._request(Method::POST, "ambulances", Some(ambulance))
            .await
    }

    /// Updates an ambulance record.
    pub async fn update(
        &self,
        id: &str,
        ambulance: &AmbulancePayload<'_>,
    ) -> Result<Value, EmelocError> {
        let endpoint = format!("ambulances/{}", id);
        self.client
            ._request(Method::PUT, &endpoint, Some(ambulance))
            .await
    }

    /// Sets just the status of an ambulance, e.g. marking it busy when a
    /// case is assigned and available again when the case closes.
    pub async fn set_status(
        &self,
        id: &str,
        status: AmbulanceStatus,
    ) -> Result<(), EmelocError> {
        let endpoint = format!("ambulances/{}", id);
        let _: Value = self
            .client
            ._request(Method::PUT, &endpoint, Some(&StatusUpdate { status }))
            .await?;
        Ok(())
    }

    /// Removes an ambulance from the fleet.
    pub async fn delete(&self, id: &str) -> Result<(), EmelocError> {
        let endpoint = format!("ambulances/{}", id);
        let _: Value = self
            .client
            ._request(Method::DELETE, &endpoint, None::<&Value>)
            .await?;
        Ok(())
    }

    /// Starts a live poller that refreshes the fleet's map markers every
    /// `period`. The poller keeps its own clone of the client; stop the
    /// returned handle when the consuming view goes away.
    pub fn poll_markers(&self, period: Duration) -> PollerHandle<MapMarker> {
        let client = self.client.clone();
        PositionPoller::spawn(period, move || {
            let client = client.clone();
            async move {
                let response: AmbulancesResponse = client
                    ._request(Method::GET, "ambulances", None::<&Value>)
                    .await?;
                Ok(resolve_markers(&response.ambulances))
            }
        })
    }
}
