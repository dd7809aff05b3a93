//! Packet-to-record transformation (§9 design note: "model the
//! packet-to-record transformation as a pure function over the parsed
//! packet, not as implicit state on the session").
//!
//! [`build_record`] walks one [`ParsedPacket`]'s tags and assembles the
//! flat schema the sink and the metrics exporter both consume. It takes
//! no session state and performs no IO; everything it needs is the
//! packet itself plus the peer address and optional IMEI the caller
//! already knows.

use serde_json::{Map, Value};

use crate::decode::{decode_tag, DecodedValue};
use crate::mercury::MercuryRecord;
use crate::tags::ParsedPacket;

/// Mercury's "no data on this register" sentinel: `0xFFFFFFFF / 1000`.
/// Reverse-flow energy registers on a unidirectional installation always
/// read this; the sink renders it as `null` rather than as a number that
/// looks like almost 4.3 million kWh.
const ENERGY_NO_DATA_SENTINEL: f64 = 4_294_967.295;
const ENERGY_SENTINEL_EPSILON: f64 = 1e-3;

/// A power factor occasionally reads back around this value when the
/// meter's internal scaling overflows; dividing by 4096 recovers a sane
/// `0..1` reading. Grounded in the original storage layer's formatting
/// step, which applied the same correction before writing a record out.
const POWER_FACTOR_OVERFLOW_MARKER: f64 = 4195.3;
const POWER_FACTOR_OVERFLOW_EPSILON: f64 = 0.1;
const POWER_FACTOR_OVERFLOW_DIVISOR: f64 = 4096.0;

fn normalize_energy(value: f64) -> Option<f64> {
    if (value - ENERGY_NO_DATA_SENTINEL).abs() < ENERGY_SENTINEL_EPSILON {
        None
    } else {
        Some(value)
    }
}

fn normalize_power_factor(value: f64) -> f64 {
    if value > 1.0 {
        if (value - POWER_FACTOR_OVERFLOW_MARKER).abs() < POWER_FACTOR_OVERFLOW_EPSILON {
            return value / POWER_FACTOR_OVERFLOW_DIVISOR;
        }
        return 1.0;
    }
    value
}

/// The flat set of fields assembled from one parsed packet, ready to be
/// hand to a [`crate::sink`]-shaped consumer or a metrics exporter. Kept
/// as a plain struct rather than a `serde_json::Value` so callers that
/// only need a handful of fields (the metrics exporter) don't have to
/// re-parse JSON to get them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFields {
    pub mercury_id: Option<String>,
    pub imei: Option<String>,

    pub mercury_state: Option<i64>,
    pub mercury_f: Option<f64>,
    pub mercury_u: [Option<f64>; 3],
    pub mercury_i: [Option<f64>; 3],
    pub mercury_a12: Option<f64>,
    pub mercury_a23: Option<f64>,
    pub mercury_a13: Option<f64>,
    pub mercury_p: [Option<f64>; 3],
    pub mercury_ps: Option<f64>,
    /// Forward active energy only. The Mercury 230 decoder also exposes
    /// reverse active and both reactive energy registers, but the sink
    /// schema (§6) names only `galileosky_mercury_pa_plus`; the other
    /// three are read off the meter and discarded at this projection
    /// step rather than invented as extra sink keys.
    pub mercury_pa_plus: Option<f64>,
    pub mercury_ks: [Option<f64>; 3],
    pub mercury_kss: Option<f64>,
    pub mercury_kg: [Option<f64>; 3],

    /// Derived apparent-power-like value (§6): `(i1*u1*pf1 + i2*u2*pf2 +
    /// i3*u3*pf3) * 300 / 1000`. Distinct from `mercury_ps`, which is the
    /// meter's own reported active power sum.
    pub mercury_ps_derived: Option<f64>,

    pub enter: [Option<i64>; 4],
    pub field_0x45: Option<i64>,
    pub field_0x46: Option<i64>,
    pub temps: [Option<i64>; 8],
}

impl RecordFields {
    /// Renders the record as the flat JSON object the sink writes.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();

        map.insert("mercury_id".into(), opt_string(&self.mercury_id));
        map.insert("imei".into(), opt_string(&self.imei));

        map.insert("galileosky_mercury_state".into(), opt_num(self.mercury_state));
        map.insert("galileosky_mercury_f".into(), opt_num(self.mercury_f));

        for (i, v) in self.mercury_u.iter().enumerate() {
            map.insert(format!("galileosky_mercury_u{}", i + 1), opt_num(*v));
        }
        for (i, v) in self.mercury_i.iter().enumerate() {
            map.insert(format!("galileosky_mercury_i{}", i + 1), opt_num(*v));
        }

        map.insert("galileosky_mercury_a12".into(), opt_num(self.mercury_a12));
        map.insert("galileosky_mercury_a23".into(), opt_num(self.mercury_a23));
        map.insert("galileosky_mercury_a13".into(), opt_num(self.mercury_a13));

        for (i, v) in self.mercury_p.iter().enumerate() {
            map.insert(format!("galileosky_mercury_p{}", i + 1), opt_num(*v));
        }
        map.insert("galileosky_mercury_ps".into(), opt_num(self.mercury_ps));

        map.insert("galileosky_mercury_pa_plus".into(), opt_num(self.mercury_pa_plus));

        for (i, v) in self.mercury_ks.iter().enumerate() {
            map.insert(format!("galileosky_mercury_ks{}", i + 1), opt_num(*v));
        }
        map.insert("galileosky_mercury_kss".into(), opt_num(self.mercury_kss));

        for (i, v) in self.mercury_kg.iter().enumerate() {
            map.insert(format!("galileosky_mercury_kg{}", i + 1), opt_num(*v));
        }

        map.insert("mercury_ps".into(), opt_num(self.mercury_ps_derived));

        for (i, v) in self.enter.iter().enumerate() {
            map.insert(format!("enter{i}"), opt_num(*v));
        }
        map.insert("0x45".into(), opt_num(self.field_0x45));
        map.insert("0x46".into(), opt_num(self.field_0x46));

        for (i, v) in self.temps.iter().enumerate() {
            map.insert(format!("galileosky_temp{i}"), opt_num(*v));
        }

        Value::Object(map)
    }
}

fn opt_num<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn apply_mercury(fields: &mut RecordFields, mercury: &MercuryRecord) {
    fields.mercury_id = Some(mercury.address.to_string());
    fields.mercury_state = Some(mercury.status as i64);
    fields.mercury_f = Some(mercury.frequency_hz);

    fields.mercury_u = [Some(mercury.voltage_1), Some(mercury.voltage_2), Some(mercury.voltage_3)];
    fields.mercury_i = [Some(mercury.current_1), Some(mercury.current_2), Some(mercury.current_3)];

    fields.mercury_a12 = Some(mercury.angle_12);
    fields.mercury_a23 = Some(mercury.angle_23);
    fields.mercury_a13 = Some(mercury.angle_13);

    fields.mercury_p = [
        Some(mercury.active_power_p1),
        Some(mercury.active_power_p2),
        Some(mercury.active_power_p3),
    ];
    fields.mercury_ps = Some(mercury.active_power_sum);

    fields.mercury_pa_plus = normalize_energy(mercury.energy_active_fwd);

    let ks = [
        normalize_power_factor(mercury.power_factor_p1),
        normalize_power_factor(mercury.power_factor_p2),
        normalize_power_factor(mercury.power_factor_p3),
    ];
    fields.mercury_ks = ks.map(Some);
    fields.mercury_kss = Some(normalize_power_factor(mercury.power_factor_sum));

    fields.mercury_kg = [
        Some(mercury.distortion_p1),
        Some(mercury.distortion_p2),
        Some(mercury.distortion_p3),
    ];

    fields.mercury_ps_derived = Some(
        (mercury.current_1 * mercury.voltage_1 * ks[0]
            + mercury.current_2 * mercury.voltage_2 * ks[1]
            + mercury.current_3 * mercury.voltage_3 * ks[2])
            * 300.0
            / 1000.0,
    );
}

/// Builds the flat record a parsed packet contributes to the sink and the
/// metrics exporter. `imei` is the caller's best current identity for the
/// originating device, if known; the packet format carries no IMEI field
/// of its own.
pub fn build_record(packet: &ParsedPacket, imei: Option<String>) -> RecordFields {
    let mut fields = RecordFields { imei, ..Default::default() };

    for tag in &packet.tags {
        match tag.id {
            0xEA => {
                if let DecodedValue::Mercury(mercury) = decode_tag(tag.id, &tag.data) {
                    apply_mercury(&mut fields, &mercury);
                }
            }
            0x50..=0x53 => {
                if let DecodedValue::Integer(v) = decode_tag(tag.id, &tag.data) {
                    fields.enter[(tag.id - 0x50) as usize] = Some(v);
                }
            }
            0x45 => {
                if let DecodedValue::Integer(v) = decode_tag(tag.id, &tag.data) {
                    fields.field_0x45 = Some(v);
                }
            }
            0x46 => {
                if let DecodedValue::Integer(v) = decode_tag(tag.id, &tag.data) {
                    fields.field_0x46 = Some(v);
                }
            }
            0x70..=0x77 => {
                if let DecodedValue::Integer(v) = decode_tag(tag.id, &tag.data) {
                    fields.temps[(tag.id - 0x70) as usize] = Some(v);
                }
            }
            _ => {}
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::tags::parse_packet;

    fn mercury_blob() -> Vec<u8> {
        let mut blob = vec![0u8; crate::mercury::MERCURY_BLOB_LEN];
        blob[0] = 0x02;
        blob[1] = 0x5D;
        blob
    }

    #[test]
    fn record_pulls_enter_and_thermometer_tags_from_same_packet() {
        // A payload containing 0x50 (enter0), 0x70 (temp0), and an
        // EA-wrapped mercury blob, parsed as the session would.
        let blob = mercury_blob();
        let mut full_payload = vec![0x50, 0x01, 0x00, 0x70, 0x02, 0x00, 0xEA, blob.len() as u8];
        full_payload.extend(blob);

        let packet = parse_packet(&Bytes::from(full_payload));
        let record = build_record(&packet, None);

        assert_eq!(record.enter[0], Some(1));
        assert_eq!(record.temps[0], Some(2));
        assert_eq!(record.mercury_id.as_deref(), Some("93"));
    }

    #[test]
    fn energy_sentinel_is_normalized_to_null() {
        let mercury = crate::mercury::decode(&{
            let mut blob = mercury_blob();
            // energy_active_fwd occupies bytes 77..81; set bytes so
            // energy4 decodes to 0xFFFFFFFF.
            blob[77] = 0xFF;
            blob[78] = 0xFF;
            blob[79] = 0xFF;
            blob[80] = 0xFF;
            blob
        })
        .unwrap();
        let mut fields = RecordFields::default();
        apply_mercury(&mut fields, &mercury);
        assert_eq!(fields.mercury_pa_plus, None);
    }

    #[test]
    fn power_factor_overflow_is_divided_down() {
        assert!((normalize_power_factor(4195.3) - (4195.3 / 4096.0)).abs() < 1e-9);
        assert_eq!(normalize_power_factor(2.0), 1.0);
        assert_eq!(normalize_power_factor(0.87), 0.87);
    }
}
