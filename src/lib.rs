pub mod ambulance;
pub mod case;
pub mod client;
pub mod error;
pub mod geo;
pub mod geocode;
pub mod poller;
mod requests;
pub mod session;
pub mod tracking;
pub mod user;

pub use client::EmelocClient as Emeloc; // Alias for convenience
pub use error::EmelocError;

pub use ambulance::{Ambulance, AmbulanceStatus, MapMarker};
pub use case::{Case, CaseStatus};
pub use geo::{decode_point_hex, GeoPoint};
pub use geocode::ReverseGeocoder;
pub use poller::{PollerHandle, PositionPoller};
pub use session::{Session, SessionStore};
pub use user::User;
