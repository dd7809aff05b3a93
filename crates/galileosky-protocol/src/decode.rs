//! Per-tag value decoding (§4.3): turns a [`crate::tags::ParsedTag`]'s raw
//! bytes into a typed [`DecodedValue`]. Every decoder is total — there is
//! no tag whose value cannot be decoded, only tags that fall back to a
//! raw hex string when no specific numeric shape applies.

use crate::mercury::{self, MercuryRecord};

/// The decoded value family a tag can resolve to. Mirrors the reference
/// decoder's duck-typed return values (int, float, dict, Mercury object,
/// or raw hex string) as an explicit tagged sum so callers can match
/// exhaustively instead of probing a dynamic type.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Integer(i64),
    Real(f64),
    Coord { lat: f64, lon: f64, satellites: u8, correctness: u8 },
    SpeedDir { speed_kmh: f64, direction_deg: f64 },
    Mercury(MercuryRecord),
    Raw(String),
}

fn raw_hex(data: &[u8]) -> DecodedValue {
    let mut hex = String::with_capacity(data.len() * 2);
    for byte in data {
        hex.push_str(&format!("{byte:02X}"));
    }
    DecodedValue::Raw(hex)
}

/// Decodes a single tag's raw payload according to §4.3's table. Tags not
/// listed there (e.g. `0x63`, `0x45`, `0x46`, `0xD4`, `0xFE`) fall back to
/// raw hex, same as any value a specific decoder below rejects.
pub fn decode_tag(id: u8, data: &[u8]) -> DecodedValue {
    match id {
        0x10 | 0x21 | 0x40 | 0x41 | 0x42 | 0x48 | 0x50..=0x55 | 0x70..=0x77 if data.len() == 2 => {
            DecodedValue::Integer(u16::from_le_bytes([data[0], data[1]]) as i64)
        }
        0x20 if data.len() == 4 => {
            DecodedValue::Integer(u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as i64)
        }
        0x34 if data.len() == 2 => {
            DecodedValue::Integer(i16::from_le_bytes([data[0], data[1]]) as i64)
        }
        0x35 | 0x49 if data.len() == 1 => DecodedValue::Integer(data[0] as i64),
        0x43 if data.len() == 1 => DecodedValue::Integer(data[0] as i8 as i64),
        0x30 if data.len() == 9 => {
            let lat_raw = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            let lon_raw = i32::from_le_bytes([data[4], data[5], data[6], data[7]]);
            DecodedValue::Coord {
                lat: lat_raw as f64 / 1_000_000.0,
                lon: lon_raw as f64 / 1_000_000.0,
                satellites: data[8] & 0x0F,
                correctness: (data[8] >> 4) & 0x0F,
            }
        }
        0x33 if data.len() == 4 => {
            let speed = u16::from_le_bytes([data[0], data[1]]);
            let direction = u16::from_le_bytes([data[2], data[3]]);
            DecodedValue::SpeedDir {
                speed_kmh: speed as f64 / 10.0,
                direction_deg: direction as f64 / 10.0,
            }
        }
        0xEA => match mercury::decode(data) {
            Some(record) => DecodedValue::Mercury(record),
            None => raw_hex(data),
        },
        _ => raw_hex(data),
    }
}

impl DecodedValue {
    /// Converts to a `serde_json::Value`, for sink records and tests.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            DecodedValue::Integer(v) => serde_json::json!(v),
            DecodedValue::Real(v) => serde_json::json!(v),
            DecodedValue::Coord { lat, lon, satellites, correctness } => serde_json::json!({
                "lat": lat,
                "lon": lon,
                "satellites": satellites,
                "correctness": correctness,
            }),
            DecodedValue::SpeedDir { speed_kmh, direction_deg } => serde_json::json!({
                "speed_kmh": speed_kmh,
                "direction_deg": direction_deg,
            }),
            DecodedValue::Mercury(_) => serde_json::Value::Null, // flattened separately by record::build_record
            DecodedValue::Raw(hex) => serde_json::json!(hex),
        }
    }
}
