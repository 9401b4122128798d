// src/geo.rs

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair.
///
/// Latitude must lie in [-90, 90] and longitude in [-180, 180]; values
/// outside those ranges mean the position is unusable and are treated as
/// absent everywhere in this crate.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Formats the point as `"lat, lon"` with six decimal places, the
    /// presentation used when a place name cannot be resolved.
    pub fn to_fixed_string(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Header of a little-endian WKB point carrying an EPSG:4326 SRID, as
/// emitted by PostGIS `geometry` columns.
pub const SRID_POINT_PREFIX: &str = "0101000020E6100000";

/// Header of a little-endian WKB point without an SRID.
pub const BARE_POINT_PREFIX: &str = "0101000000";

// Two 8-byte doubles: 32 hex characters.
const COORD_PAYLOAD_LEN: usize = 32;

/// Decodes a hex-encoded WKB 2D point into a [`GeoPoint`].
///
/// Exactly two layouts are recognized: the 18-character SRID-tagged header
/// and the 10-character bare header, each followed by two little-endian
/// IEEE-754 doubles encoding longitude first, then latitude.
///
/// Returns `None` for anything else: unrecognized or truncated input,
/// non-hex payload characters, NaN coordinates, or coordinates outside the
/// valid WGS84 ranges. Many entities simply have no position yet, so an
/// undecodable value is an expected case, not an error.
pub fn decode_point_hex(hex: &str) -> Option<GeoPoint> {
    let payload = strip_prefix_ascii_case(hex, SRID_POINT_PREFIX)
        .or_else(|| strip_prefix_ascii_case(hex, BARE_POINT_PREFIX))?;
    if payload.len() < COORD_PAYLOAD_LEN {
        return None;
    }

    let longitude = parse_f64_le(&payload[..16])?;
    let latitude = parse_f64_le(&payload[16..32])?;
    if latitude.is_nan() || longitude.is_nan() {
        return None;
    }

    let point = GeoPoint::new(latitude, longitude);
    if point.is_valid() {
        Some(point)
    } else {
        None
    }
}

// Hex digits carry no case information, so the header comparison must not
// depend on how the backend happens to render them.
fn strip_prefix_ascii_case<'a>(input: &'a str, prefix: &str) -> Option<&'a [u8]> {
    let input = input.as_bytes();
    let prefix = prefix.as_bytes();
    if input.len() >= prefix.len() && input[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&input[prefix.len()..])
    } else {
        None
    }
}

// Interprets 16 hex characters as an IEEE-754 binary64 in little-endian
// byte order (least significant byte first in the stream).
fn parse_f64_le(hex: &[u8]) -> Option<f64> {
    let mut bytes = [0u8; 8];
    for (i, pair) in hex.chunks_exact(2).enumerate() {
        bytes[i] = hex_digit(pair[0])? << 4 | hex_digit(pair[1])?;
    }
    Some(f64::from_le_bytes(bytes))
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
