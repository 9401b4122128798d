use std::sync::Once;
use std::time::Duration;

use emeloc_rs::ambulance::{resolve_markers, Ambulance, AmbulanceStatus, MapMarker};
use emeloc_rs::geocode::{ReverseGeocoder, UNKNOWN_LOCATION};
use emeloc_rs::Emeloc;

static INIT_LOGGER: Once = Once::new();

fn initialize_logger_once() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

// A fleet list as the backend serves it: one positioned ambulance (WKB for
// lat 17.4, lon 78.5), one without any position yet.
fn fleet_body() -> serde_json::Value {
    serde_json::json!([
        {
            "id": "amb-1",
            "license_plate": "TS09 1234",
            "status": "available",
            "wkb": "01010000000000000000A053406666666666663140"
        },
        {
            "id": "amb-2",
            "license_plate": "TS10 5678",
            "status": "maintenance"
        }
    ])
}

#[tokio::test]
async fn fleet_list_resolves_to_markers_and_names() {
    initialize_logger_once();
    let ambulances: Vec<Ambulance> = serde_json::from_value(fleet_body()).unwrap();

    // Only the positioned ambulance becomes a marker, with the exact
    // decoded coordinates and its wire status.
    let markers = resolve_markers(&ambulances);
    assert_eq!(
        markers,
        vec![MapMarker {
            latitude: 17.4,
            longitude: 78.5,
            status: AmbulanceStatus::Available,
        }]
    );

    // Name resolution settles for the whole batch even with the lookup
    // service unreachable: positioned entities fall back to coordinates,
    // unpositioned ones to the placeholder.
    let mut geocoder = ReverseGeocoder::with_base_url("http://127.0.0.1:9/reverse");
    let entities: Vec<_> = ambulances
        .iter()
        .map(|a| (a.id.clone(), a.position()))
        .collect();
    let names = geocoder.resolve_batch(&entities).await;
    assert_eq!(names["amb-1"], "17.400000, 78.500000");
    assert_eq!(names["amb-2"], UNKNOWN_LOCATION);
}

#[tokio::test]
async fn marker_poller_survives_an_unreachable_backend() {
    initialize_logger_once();
    // Nothing listens on the discard port, so every tick fails; the poller
    // must keep its (empty) snapshot and keep running.
    let client = Emeloc::new("http://127.0.0.1:9", None).unwrap();
    let handle = client.ambulances().poll_markers(Duration::from_millis(20));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(handle.snapshot().is_empty());
    assert!(handle.is_running());
    handle.stop();
}
