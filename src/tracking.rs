// src/tracking.rs

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::client::ServiceTarget;
use crate::error::EmelocError;
use crate::geo::GeoPoint;
use crate::session::SessionStore;
use crate::Emeloc;

/// How long a device position read may take before it is abandoned.
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// A source of device positions (GPS receiver, platform location service).
///
/// Implementations should request the highest accuracy the platform offers
/// and report denial as [`EmelocError::GeolocationDenied`] and missing
/// hardware support as [`EmelocError::GeolocationUnsupported`]. Timeouts are
/// applied by the caller via [`acquire_position`], not by the locator.
pub trait DeviceLocator {
    fn current_position(&self) -> impl Future<Output = Result<GeoPoint, EmelocError>> + Send;
}

/// Reads the device position with the explicit [`GEOLOCATION_TIMEOUT`].
///
/// An expired timeout surfaces as [`EmelocError::GeolocationTimeout`] so the
/// caller can show the user an actionable message instead of hanging. This
/// and permission denial are the only failures in the crate meant to block
/// the calling flow (location sharing cannot proceed without a coordinate).
pub async fn acquire_position<L: DeviceLocator>(locator: &L) -> Result<GeoPoint, EmelocError> {
    match tokio::time::timeout(GEOLOCATION_TIMEOUT, locator.current_position()).await {
        Ok(result) => result,
        Err(_) => Err(EmelocError::GeolocationTimeout(GEOLOCATION_TIMEOUT.as_secs())),
    }
}

/// Shares the device's current position for a case, once.
///
/// Returns `Ok(false)` without touching the device or the network when the
/// session store says this case was already shared. On a successful share
/// the case is flagged and the sent position is recorded in the store with
/// its capture time; on any failure the flag is left unset so the patient
/// can retry.
pub async fn share_current_location<L: DeviceLocator>(
    client: &Emeloc,
    store: &mut SessionStore,
    case_id: &str,
    locator: &L,
) -> Result<bool, EmelocError> {
    if store.is_shared(case_id) {
        return Ok(false);
    }

    let point = acquire_position(locator).await?;
    client.cases().share_location(case_id, &point).await?;

    store.mark_shared(case_id);
    store.record_position(case_id, point);
    Ok(true)
}

/// Request body for tracking-email initiation on the dispatch service.
#[derive(Serialize, Debug)]
pub struct TrackingRequest<'a> {
    #[serde(rename = "caseId")]
    pub case_id: &'a str,
    #[serde(rename = "ambulanceId")]
    pub ambulance_id: &'a str,
    #[serde(rename = "patientEmail")]
    pub patient_email: &'a str,
    #[serde(rename = "driverEmail")]
    pub driver_email: &'a str,
}

/// Provides methods for the live-tracking email flow.
pub struct TrackingHandle<'a> {
    client: &'a Emeloc,
}

impl<'a> TrackingHandle<'a> {
    pub(crate) fn new(client: &'a Emeloc) -> Self {
        TrackingHandle { client }
    }

    /// Asks the dispatch service to email tracking links to the patient and
    /// the ambulance driver for an assigned case.
    ///
    /// Corresponds to POST tracking/initiate on the dispatch service and
    /// requires the client to have been constructed with a dispatch URL.
    pub async fn initiate(&self, request: &TrackingRequest<'_>) -> Result<Value, EmelocError> {
        self.client
            ._request_to(
                ServiceTarget::Dispatch,
                Method::POST,
                "api/tracking/initiate",
                Some(request),
            )
            .await
    }
}
