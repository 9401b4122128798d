// src/case.rs

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ambulance::AmbulanceStatus;
use crate::client::ServiceTarget;
use crate::error::EmelocError;
use crate::geo::{decode_point_hex, GeoPoint};
use crate::Emeloc;

/// Lifecycle status of an emergency case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseStatus {
    Active,
    Closed,
    #[default]
    Unknown,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Active => "active",
            CaseStatus::Closed => "closed",
            CaseStatus::Unknown => "unknown",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "active" => CaseStatus::Active,
            "closed" => CaseStatus::Closed,
            _ => CaseStatus::Unknown,
        }
    }
}

impl Serialize for CaseStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CaseStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(CaseStatus::from_wire(&value))
    }
}

/// An emergency case as returned by the backend.
///
/// The backend packs patient name and emergency type into the free-form
/// `description` field (`"Patient: X, Type: Y"`); the accessor methods
/// unpack them, preferring dedicated fields when the backend provides them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Case {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambulance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

fn patient_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Patient: ([^,]+)").expect("static pattern"))
}

fn emergency_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Type: ([^,]+)").expect("static pattern"))
}

impl Case {
    /// Resolves the case's raw position, preferring coordinates the backend
    /// already decoded and falling back to the WKB hex field.
    pub fn position(&self) -> Option<GeoPoint> {
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            let point = GeoPoint::new(latitude, longitude);
            if point.is_valid() {
                return Some(point);
            }
        }
        self.wkb.as_deref().and_then(decode_point_hex)
    }

    /// The patient's name, from the dedicated field or the packed
    /// description.
    pub fn patient(&self) -> Option<String> {
        if let Some(name) = &self.patient_name {
            if !name.is_empty() {
                return Some(name.clone());
            }
        }
        let description = self.description.as_deref()?;
        patient_regex()
            .captures(description)
            .map(|captures| captures[1].trim().to_string())
    }

    /// The emergency type packed into the description, if any.
    pub fn emergency_type(&self) -> Option<String> {
        let description = self.description.as_deref()?;
        emergency_type_regex()
            .captures(description)
            .map(|captures| captures[1].trim().to_string())
    }

    /// An OpenStreetMap link for the case position, for sharing outside the
    /// product's own map.
    pub fn map_url(&self) -> Option<String> {
        let point = self.position()?;
        Some(format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map=18/{lat}/{lon}",
            lat = point.latitude,
            lon = point.longitude
        ))
    }
}

/// Payload for case creation through the dispatch service, which persists
/// the case and emails the patient a location-share link.
#[derive(Serialize, Debug)]
pub struct CaseDispatch<'a> {
    pub operator_id: &'a str,
    #[serde(rename = "to")]
    pub patient_email: &'a str,
    pub status: CaseStatus,
    #[serde(rename = "patientName")]
    pub patient_name: &'a str,
    pub description: &'a str,
    pub license_plate: &'a str,
}

/// Result of a dispatch: the created case and the link the patient was
/// emailed for sharing their live location.
#[derive(Debug, Clone)]
pub struct DispatchedCase {
    pub case_id: String,
    pub share_url: String,
}

#[derive(Debug, Deserialize)]
struct DispatchResponse {
    #[serde(rename = "caseId")]
    case_id: String,
}

/// Fields accepted when editing an existing case.
#[derive(Serialize, Debug, Default)]
pub struct CaseUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambulance_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CasesResponse {
    #[serde(default)]
    cases: Vec<Case>,
}

/// Provides methods for managing emergency cases.
pub struct CaseHandle<'a> {
    client: &'a Emeloc,
}

impl<'a> CaseHandle<'a> {
    pub(crate) fn new(client: &'a Emeloc) -> Self {
        CaseHandle { client }
    }

    /// Lists all cases.
    /// Corresponds to GET api/cases.
    pub async fn list(&self) -> Result<Vec<Case>, EmelocError> {
        let response: CasesResponse = self
            .client
            ._request(Method::GET, "cases", None::<&Value>)
            .await?;
        Ok(response.cases)
    }

    /// Lists cases still in the `active` state.
    pub async fn active(&self) -> Result<Vec<Case>, EmelocError> {
        let mut cases = self.list().await?;
        cases.retain(|c| c.status == CaseStatus::Active);
        Ok(cases)
    }

    /// Updates an existing case.
    pub async fn update(&self, id: &str, update: &CaseUpdate<'_>) -> Result<Value, EmelocError> {
        let endpoint = format!("cases/{}", id);
        self.client
            ._request(Method::PUT, &endpoint, Some(update))
            .await
    }

    /// Deletes a case.
    pub async fn delete(&self, id: &str) -> Result<(), EmelocError> {
        let endpoint = format!("cases/{}", id);
        let _: Value = self
            .client
            ._request(Method::DELETE, &endpoint, None::<&Value>)
            .await?;
        Ok(())
    }

    /// Creates a case through the dispatch service and returns the share
    /// link the patient receives by email.
    ///
    /// Requires the client to have been constructed with a dispatch URL.
    pub async fn dispatch(
        &self,
        case: &CaseDispatch<'_>,
    ) -> Result<DispatchedCase, EmelocError> {
        let response: DispatchResponse = self
            .client
            ._request_to(ServiceTarget::Dispatch, Method::POST, "live-location", Some(case))
            .await?;

        // The dispatch URL is known to be present: the request above would
        // have failed with DispatchUnconfigured otherwise.
        let share_url = match &self.client.dispatch_url {
            Some(base) => format!("{}/share-location/{}", base, response.case_id),
            None => String::new(),
        };
        Ok(DispatchedCase {
            case_id: response.case_id,
            share_url,
        })
    }

    /// Creates a case with an ambulance assignment.
    ///
    /// The chosen ambulance is marked busy before the dispatch request so a
    /// concurrent operator cannot assign it twice; if dispatch then fails,
    /// the ambulance is reverted to available and the dispatch error is
    /// returned.
    pub async fn dispatch_with_assignment(
        &self,
        case: &CaseDispatch<'_>,
        ambulance_id: &str,
    ) -> Result<DispatchedCase, EmelocError> {
        let ambulances = self.client.ambulances();
        ambulances
            .set_status(ambulance_id, AmbulanceStatus::Busy)
            .await?;

        match self.dispatch(case).await {
            Ok(dispatched) => Ok(dispatched),
            Err(dispatch_error) => {
                if let Err(revert_error) = ambulances
                    .set_status(ambulance_id, AmbulanceStatus::Available)
                    .await
                {
                    log::error!(
                        "failed to revert ambulance {} after dispatch failure: {}",
                        ambulance_id,
                        revert_error
                    );
                }
                Err(dispatch_error)
            }
        }
    }

    /// Reports a patient's shared location for a case.
    /// Corresponds to PUT api/cases/{id}/location.
    pub async fn share_location(
        &self,
        id: &str,
        point: &GeoPoint,
    ) -> Result<(), EmelocError> {
        let endpoint = format!("cases/{}/location", id);
        let body = serde_json::json!({
            "latitude": point.latitude,
            "longitude": point.longitude,
        });
        let _: Value = self
            .client
            ._request(Method::PUT, &endpoint, Some(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case_from(value: Value) -> Case {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn unpacks_patient_and_type_from_description() {
        let case = case_from(json!({
            "id": "case-1",
            "description": "Patient: Ravi Kumar, Type: Hospitalization",
            "status": "active"
        }));
        assert_eq!(case.patient().as_deref(), Some("Ravi Kumar"));
        assert_eq!(case.emergency_type().as_deref(), Some("Hospitalization"));
    }

    #[test]
    fn dedicated_patient_field_wins_over_description() {
        let case = case_from(json!({
            "id": "case-1",
            "description": "Patient: Someone Else, Type: Fire",
            "patient_name": "Ravi Kumar",
            "status": "active"
        }));
        assert_eq!(case.patient().as_deref(), Some("Ravi Kumar"));
    }

    #[test]
    fn missing_markers_yield_no_extraction() {
        let case = case_from(json!({
            "id": "case-1",
            "description": "road accident near the flyover",
            "status": "active"
        }));
        assert_eq!(case.patient(), None);
        assert_eq!(case.emergency_type(), None);
    }

    #[test]
    fn position_decodes_wkb_when_coordinates_are_absent() {
        let case = case_from(json!({
            "id": "case-1",
            "status": "active",
            "wkb": "01010000000000000000A053406666666666663140"
        }));
        let point = case.position().unwrap();
        assert_eq!(point.latitude, 17.4);
        assert_eq!(point.longitude, 78.5);
    }

    #[test]
    fn map_url_requires_a_position() {
        let with_position = case_from(json!({
            "id": "case-1",
            "status": "active",
            "latitude": 17.4,
            "longitude": 78.5
        }));
        assert_eq!(
            with_position.map_url().as_deref(),
            Some("https://www.openstreetmap.org/?mlat=17.4&mlon=78.5#map=18/17.4/78.5")
        );

        let without = case_from(json!({"id": "case-2", "status": "closed"}));
        assert_eq!(without.map_url(), None);
    }

    #[test]
    fn unknown_status_values_do_not_fail_the_list() {
        let case = case_from(json!({"id": "case-1", "status": "escalated"}));
        assert_eq!(case.status, CaseStatus::Unknown);
    }
}
