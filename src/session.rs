use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::geo::GeoPoint;

/// The signed-in identity, as returned by the sign-in endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub role: String,
    pub name: Option<String>,
}

/// A device position recorded for a case, with its capture time.
///
/// Coordinates are rounded to eight decimal places before storage, matching
/// the precision the backend accepts for shared locations.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct StoredPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
}

/// Process-wide client state for one user session.
///
/// Centralizes the state that would otherwise be read through ad hoc keys
/// scattered across views, behind explicit operations. It holds three
/// things:
///
/// - the signed-in identity (begun on sign-in, dropped on [`clear`](Self::clear)),
/// - per-case "location already shared" flags,
/// - the last known device position per case.
///
/// The store is plain serializable data; an embedding application that wants
/// the state to survive restarts persists it however it likes. Writes come
/// from a single user session, so last-write-wins is acceptable.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct SessionStore {
    session: Option<Session>,
    shared_cases: HashSet<String>,
    positions: HashMap<String, StoredPosition>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a session, replacing any previous one.
    pub fn begin(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Drops the signed-in identity.
    ///
    /// Shared-case flags and recorded positions are kept: a patient who
    /// already shared a location for a case must not be asked again just
    /// because an operator signed out on the same device.
    pub fn clear(&mut self) {
        self.session = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn role(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.role.as_str())
    }

    /// Marks a case's location as already shared.
    pub fn mark_shared(&mut self, case_id: &str) {
        self.shared_cases.insert(case_id.to_string());
    }

    pub fn is_shared(&self, case_id: &str) -> bool {
        self.shared_cases.contains(case_id)
    }

    /// Records the device position sent for a case, stamped with the current
    /// time and rounded to eight decimal places.
    pub fn record_position(&mut self, case_id: &str, point: GeoPoint) {
        self.positions.insert(
            case_id.to_string(),
            StoredPosition {
                latitude: round8(point.latitude),
                longitude: round8(point.longitude),
                updated_at: Utc::now(),
            },
        );
    }

    pub fn last_position(&self, case_id: &str) -> Option<&StoredPosition> {
        self.positions.get(case_id)
    }
}

fn round8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}
