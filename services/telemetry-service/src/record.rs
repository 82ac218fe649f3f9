//! Stored vitals readings and the loose field reconciliation applied to
//! device uploads.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::UploadRequest;

/// Blood-pressure placeholder written by the upload path.
pub const LEGACY_BP: f64 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub long: f64,
}

/// One immutable telemetry reading. Changes are new records, never edits.
#[derive(Clone, Debug, PartialEq)]
pub struct VitalsRecord {
    pub device_id: String,
    pub heartbeat: f64,
    /// Doubles as an SpO2 placeholder for simulated readings.
    pub bp: f64,
    pub temp: f64,
    pub location: Location,
    pub timestamp: DateTime<Utc>,
}

/// Server-side fallbacks for fields a device leaves out.
#[derive(Clone, Debug)]
pub struct RecordDefaults {
    pub device_id: String,
    pub reference: Location,
}

pub fn from_upload(
    request: &UploadRequest,
    defaults: &RecordDefaults,
    timestamp: DateTime<Utc>,
) -> VitalsRecord {
    let heartbeat = reconcile("heartbeat", &request.heartbeat, "heartRate", &request.heart_rate)
        .map(coerce_number)
        .unwrap_or(0.0);
    let temp = reconcile("temp", &request.temp, "temperature", &request.temperature)
        .map(coerce_number)
        .unwrap_or(0.0);
    let lat = request
        .lat
        .as_ref()
        .map(coerce_number)
        .unwrap_or(defaults.reference.lat);
    let long = reconcile("long", &request.long, "lon", &request.lon)
        .map(coerce_number)
        .unwrap_or(defaults.reference.long);

    VitalsRecord {
        device_id: device_id_or(request.device_id.as_ref(), &defaults.device_id),
        heartbeat,
        bp: LEGACY_BP,
        temp,
        location: Location { lat, long },
        timestamp,
    }
}

/// Canonical field wins; the deprecated alias is only read when it is absent.
fn reconcile<'a>(
    canonical_name: &str,
    canonical: &'a Option<Value>,
    alias_name: &str,
    alias: &'a Option<Value>,
) -> Option<&'a Value> {
    if let Some(value) = canonical.as_ref() {
        return Some(value);
    }
    let value = alias.as_ref()?;
    tracing::debug!(
        field = canonical_name,
        alias = alias_name,
        "deprecated field alias used"
    );
    Some(value)
}

fn device_id_or(value: Option<&Value>, sentinel: &str) -> String {
    match value {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => sentinel.to_string(),
    }
}

/// Loose numeric cast. Malformed input becomes NaN instead of an error.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => parse_loose(text),
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// String form of the loose cast. Only decimal literals, `Infinity` and
/// unsigned `0x`/`0o`/`0b` integers are numbers; `inf` or `NaN` spelled out
/// are not.
fn parse_loose(text: &str) -> f64 {
    let text = text.trim();
    match text {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(value) = parse_radix(text) {
        return value;
    }
    let decimal = text
        .bytes()
        .all(|byte| byte.is_ascii_digit() || matches!(byte, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(text: &str) -> Option<f64> {
    let radix = match text.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() {
        return Some(f64::NAN);
    }
    let value = digits.chars().try_fold(0.0f64, |acc, digit| {
        digit
            .to_digit(radix)
            .map(|digit| acc * f64::from(radix) + f64::from(digit))
    });
    Some(value.unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> RecordDefaults {
        RecordDefaults {
            device_id: "SOLDIER_UNIT_01".to_string(),
            reference: Location {
                lat: 23.0225,
                long: 72.5714,
            },
        }
    }

    fn upload(body: Value) -> UploadRequest {
        serde_json::from_value(body).expect("upload body")
    }

    #[test]
    fn canonical_names_win_over_aliases() {
        let request = upload(json!({
            "heartbeat": 70,
            "heartRate": 80,
            "temp": 36.6,
            "temperature": 39.0,
            "long": 10.5,
            "lon": 11.5,
        }));
        let record = from_upload(&request, &defaults(), Utc::now());
        assert_eq!(record.heartbeat, 70.0);
        assert_eq!(record.temp, 36.6);
        assert_eq!(record.location.long, 10.5);
    }

    #[test]
    fn aliases_fill_in_for_missing_canonical_fields() {
        let request = upload(json!({
            "deviceId": "UNIT_7",
            "heartRate": "81",
            "temperature": 37.1,
            "lat": "12.5",
            "lon": 77.25,
        }));
        let record = from_upload(&request, &defaults(), Utc::now());
        assert_eq!(record.device_id, "UNIT_7");
        assert_eq!(record.heartbeat, 81.0);
        assert_eq!(record.temp, 37.1);
        assert_eq!(record.location, Location { lat: 12.5, long: 77.25 });
        assert_eq!(record.bp, LEGACY_BP);
    }

    #[test]
    fn empty_body_falls_back_to_defaults() {
        let record = from_upload(&upload(json!({})), &defaults(), Utc::now());
        assert_eq!(record.device_id, "SOLDIER_UNIT_01");
        assert_eq!(record.heartbeat, 0.0);
        assert_eq!(record.temp, 0.0);
        assert_eq!(record.location, defaults().reference);
    }

    #[test]
    fn empty_device_id_uses_sentinel() {
        let request = upload(json!({ "deviceId": "" }));
        let record = from_upload(&request, &defaults(), Utc::now());
        assert_eq!(record.device_id, "SOLDIER_UNIT_01");

        let request = upload(json!({ "deviceId": 42 }));
        let record = from_upload(&request, &defaults(), Utc::now());
        assert_eq!(record.device_id, "42");
    }

    #[test]
    fn non_numeric_input_becomes_nan() {
        let request = upload(json!({ "heartbeat": "fast", "temp": [36.5] }));
        let record = from_upload(&request, &defaults(), Utc::now());
        assert!(record.heartbeat.is_nan());
        assert!(record.temp.is_nan());
    }

    #[test]
    fn coercion_follows_loose_cast_rules() {
        assert_eq!(coerce_number(&json!(" 72 ")), 72.0);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert_eq!(coerce_number(&json!(false)), 0.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
        assert!(coerce_number(&json!({ "bpm": 70 })).is_nan());
    }

    #[test]
    fn string_coercion_handles_special_spellings() {
        assert_eq!(coerce_number(&json!("0x1A")), 26.0);
        assert_eq!(coerce_number(&json!("0b101")), 5.0);
        assert_eq!(coerce_number(&json!("0o17")), 15.0);
        assert_eq!(coerce_number(&json!("Infinity")), f64::INFINITY);
        assert_eq!(coerce_number(&json!("-Infinity")), f64::NEG_INFINITY);
        assert_eq!(coerce_number(&json!("1e2")), 100.0);
        assert_eq!(coerce_number(&json!(".5")), 0.5);
        for text in ["inf", "infinity", "NaN", "-inf", "0x", "0xZZ", "-0x1A", "12abc"] {
            assert!(coerce_number(&json!(text)).is_nan(), "{text}");
        }
    }
}
