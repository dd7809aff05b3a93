//! Operational metrics: mirrors every numeric field of an assembled
//! [`galileosky_protocol::RecordFields`] as a Prometheus gauge labelled by
//! `(imei, mercury_id)`, with the extra sub-labels the original
//! `MercuryMetrics` class used (`phase`, `phase_pair`, `input_id`,
//! `sensor_id`).
//!
//! This is an optional collaborator (§6, "Operational metrics (optional
//! collaborator)"): a session that has no [`MercuryMetrics`] configured
//! simply never calls `update`, and a failure inside the metrics registry
//! (there isn't really one — `metrics::gauge!` can't fail) never aborts
//! the session either way.

use galileosky_protocol::RecordFields;
use metrics::gauge;

/// Installs the process-wide Prometheus recorder and starts its exporter
/// HTTP listener. Call once at startup; cheap to skip in tests, which
/// construct a [`MercuryMetrics`] directly and call [`MercuryMetrics::update`]
/// without an exporter attached.
pub fn install_exporter() -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new().install()?;
    Ok(())
}

/// Stateless gauge updater. Holds no data of its own — `metrics::gauge!`
/// writes into the global recorder installed by [`install_exporter`] — so
/// this type exists purely to group the update logic under one name
/// callers can pass around, the same role `MercuryMetrics` played in the
/// original listener.
#[derive(Debug, Default, Clone, Copy)]
pub struct MercuryMetrics;

impl MercuryMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Updates every gauge this record has data for. Mirrors the field
    /// coverage of the original `MercuryMetrics.update`: inputs, thermometers,
    /// mercury status/frequency/voltage/current/angle/power/energy/power
    /// factor/distortion. Fields the record left `None` (tag absent from
    /// the packet) are simply not set this round, leaving the gauge at its
    /// last reported value rather than resetting it to zero.
    pub fn update(&self, imei: &str, mercury_id: &str, fields: &RecordFields) {
        let imei = imei.to_string();
        let mercury_id = mercury_id.to_string();

        for (i, value) in fields.enter.iter().enumerate() {
            if let Some(v) = value {
                gauge!("galileosky_enter_voltage", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "input_id" => i.to_string())
                    .set(*v as f64);
            }
        }

        for (i, value) in fields.temps.iter().enumerate() {
            if let Some(v) = value {
                gauge!("galileosky_temperature", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "sensor_id" => i.to_string())
                    .set(*v as f64);
            }
        }

        if let Some(state) = fields.mercury_state {
            gauge!("galileosky_mercury_status", "imei" => imei.clone(), "mercury_id" => mercury_id.clone())
                .set(state as f64);
        }
        if let Some(f) = fields.mercury_f {
            gauge!("galileosky_mercury_frequency", "imei" => imei.clone(), "mercury_id" => mercury_id.clone())
                .set(f);
        }

        for (i, value) in fields.mercury_u.iter().enumerate() {
            if let Some(v) = value {
                gauge!("galileosky_mercury_voltage", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "phase" => (i + 1).to_string())
                    .set(*v);
            }
        }
        for (i, value) in fields.mercury_i.iter().enumerate() {
            if let Some(v) = value {
                gauge!("galileosky_mercury_current", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "phase" => (i + 1).to_string())
                    .set(*v);
            }
        }

        for (pair, value) in [
            ("1-2", fields.mercury_a12),
            ("2-3", fields.mercury_a23),
            ("1-3", fields.mercury_a13),
        ] {
            if let Some(v) = value {
                gauge!("galileosky_mercury_angle", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "phase_pair" => pair)
                    .set(v);
            }
        }

        for (i, value) in fields.mercury_p.iter().enumerate() {
            if let Some(v) = value {
                gauge!("galileosky_mercury_active_power", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "phase" => (i + 1).to_string())
                    .set(*v);
            }
        }
        if let Some(ps) = fields.mercury_ps {
            gauge!("galileosky_mercury_active_power", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "phase" => "sum")
                .set(ps);
        }

        if let Some(pa_plus) = fields.mercury_pa_plus {
            gauge!("galileosky_mercury_active_energy_fwd", "imei" => imei.clone(), "mercury_id" => mercury_id.clone())
                .set(pa_plus);
        }

        for (i, value) in fields.mercury_ks.iter().enumerate() {
            if let Some(v) = value {
                gauge!("galileosky_mercury_power_factor", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "phase" => (i + 1).to_string())
                    .set(*v);
            }
        }
        if let Some(kss) = fields.mercury_kss {
            gauge!("galileosky_mercury_power_factor", "imei" => imei.clone(), "mercury_id" => mercury_id.clone(), "phase" => "sum")
                .set(kss);
        }

        for (i, value) in fields.mercury_kg.iter().enumerate() {
            if let Some(v) = value {
                gauge!("galileosky_mercury_distortion", "imei" => imei, "mercury_id" => mercury_id.clone(), "phase" => (i + 1).to_string())
                    .set(*v);
            }
        }
    }
}
