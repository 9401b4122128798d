use emeloc_rs::session::{Session, SessionStore};
use emeloc_rs::GeoPoint;
use uuid::Uuid;

// Helper to generate unique case ids for each test run
fn generate_case_id() -> String {
    format!("case-{}", Uuid::new_v4().simple())
}

fn operator_session() -> Session {
    Session {
        token: "tok-abc".to_string(),
        email: "operator@emeloc.example".to_string(),
        role: "operator".to_string(),
        name: Some("Meera".to_string()),
    }
}

#[test]
fn shared_flags_are_tracked_per_case() {
    let mut store = SessionStore::new();
    let shared_case = generate_case_id();
    let other_case = generate_case_id();

    assert!(!store.is_shared(&shared_case));
    store.mark_shared(&shared_case);
    assert!(store.is_shared(&shared_case));
    assert!(!store.is_shared(&other_case));

    // Marking twice is harmless.
    store.mark_shared(&shared_case);
    assert!(store.is_shared(&shared_case));
}

#[test]
fn last_positions_are_tracked_per_case() {
    let mut store = SessionStore::new();
    let case_a = generate_case_id();
    let case_b = generate_case_id();

    store.record_position(&case_a, GeoPoint::new(17.4, 78.5));
    store.record_position(&case_b, GeoPoint::new(12.9, 77.6));

    assert_eq!(store.last_position(&case_a).unwrap().latitude, 17.4);
    assert_eq!(store.last_position(&case_b).unwrap().longitude, 77.6);

    // A later share for the same case overwrites the previous position.
    store.record_position(&case_a, GeoPoint::new(17.5, 78.6));
    assert_eq!(store.last_position(&case_a).unwrap().latitude, 17.5);
}

#[test]
fn whole_store_survives_persistence_round_trip() {
    let mut store = SessionStore::new();
    let case_id = generate_case_id();
    store.begin(operator_session());
    store.mark_shared(&case_id);
    store.record_position(&case_id, GeoPoint::new(17.4, 78.5));

    let persisted = serde_json::to_vec(&store).unwrap();
    let restored: SessionStore = serde_json::from_slice(&persisted).unwrap();

    assert_eq!(restored.token(), Some("tok-abc"));
    assert_eq!(restored.role(), Some("operator"));
    assert!(restored.is_shared(&case_id));
    assert_eq!(
        restored.last_position(&case_id),
        store.last_position(&case_id)
    );
}
