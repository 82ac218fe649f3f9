use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Device upload body. Values stay raw JSON so they can be coerced loosely.
#[derive(Deserialize, Default)]
pub struct UploadRequest {
    #[serde(rename = "deviceId")]
    pub device_id: Option<Value>,
    pub heartbeat: Option<Value>,
    #[serde(rename = "heartRate")]
    pub heart_rate: Option<Value>,
    pub temp: Option<Value>,
    pub temperature: Option<Value>,
    pub lat: Option<Value>,
    pub long: Option<Value>,
    pub lon: Option<Value>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
}

#[derive(Deserialize, Default)]
pub struct SimulateRequest {
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub status: Option<Value>,
}

#[derive(Serialize)]
pub struct SimulateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

/// Lenient body decoding: content type is ignored, an empty body or a
/// non-object JSON value yields the defaults. Only malformed JSON fails.
pub fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    match serde_json::from_slice::<Value>(body)? {
        value @ Value::Object(_) => serde_json::from_value(value),
        _ => Ok(T::default()),
    }
}
