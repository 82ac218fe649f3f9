use axum::http::StatusCode;
use chrono::Utc;

use crate::models::{
    parse_body, ErrorResponse, SimulateRequest, SimulateResponse, UploadRequest, UploadResponse,
};
use crate::record::{self, VitalsRecord};
use crate::simulate::{self, Command, Outcome, Readings};
use crate::state::AppState;

const DEVICE_OFF_MESSAGE: &str = "Device is off, no data recorded";

pub struct ServiceError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ServiceError {
    pub fn new(status: StatusCode, error: &'static str) -> Self {
        Self {
            status,
            body: ErrorResponse { error },
        }
    }
}

fn decode<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> Result<T, ServiceError> {
    parse_body(body).map_err(|err| {
        tracing::warn!(error = %err, "malformed json body");
        ServiceError::new(StatusCode::BAD_REQUEST, "Invalid JSON body")
    })
}

pub async fn upload(
    state: &AppState,
    api_key: Option<&str>,
    body: &[u8],
) -> Result<UploadResponse, ServiceError> {
    if !state.config.authorizes(api_key) {
        tracing::warn!(key_present = api_key.is_some(), "upload rejected: api key mismatch");
        return Err(ServiceError::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized access",
        ));
    }

    // The key is checked before the body is looked at.
    let payload: UploadRequest = decode(body)?;
    let record = record::from_upload(&payload, &state.config.record_defaults(), Utc::now());
    if let Err(err) = state.store.insert_one(&record).await {
        tracing::error!(
            error = %err,
            device_id = record.device_id.as_str(),
            "save vitals failed"
        );
        return Err(ServiceError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database Save Error",
        ));
    }

    tracing::info!(
        device_id = record.device_id.as_str(),
        heartbeat = record.heartbeat,
        temp = record.temp,
        "vitals saved"
    );
    Ok(UploadResponse { status: "Success" })
}

pub async fn simulate(
    state: &AppState,
    body: &[u8],
) -> Result<SimulateResponse, ServiceError> {
    let payload: SimulateRequest = decode(body)?;
    let command = Command::from_request(&payload);
    let device_id = state.config.device_id.as_str();

    // Hold the device lock across the read and the insert.
    let lock = state.device_lock(device_id).await;
    let _guard = lock.lock().await;

    let prior = state.store.find_latest(device_id).await.map_err(|err| {
        tracing::error!(error = %err, device_id, "load latest vitals failed");
        ServiceError::new(StatusCode::INTERNAL_SERVER_ERROR, "DB Error")
    })?;

    let outcome = {
        let mut rng = rand::thread_rng();
        simulate::apply(Readings::carried_from(prior.as_ref()), command, &mut rng)
    };

    let readings = match outcome {
        Outcome::PoweredOff => {
            tracing::info!(device_id, "simulated device powered off");
            return Ok(SimulateResponse {
                success: true,
                message: Some(DEVICE_OFF_MESSAGE),
            });
        }
        Outcome::Record(readings) => readings,
    };

    let record = VitalsRecord {
        device_id: device_id.to_string(),
        heartbeat: readings.heartbeat,
        bp: readings.bp,
        temp: readings.temp,
        location: state.config.reference,
        timestamp: Utc::now(),
    };
    if let Err(err) = state.store.insert_one(&record).await {
        tracing::error!(error = %err, device_id, "save simulated vitals failed");
        return Err(ServiceError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "DB Error",
        ));
    }

    tracing::info!(
        device_id,
        channel = ?command.channel,
        switch = ?command.switch,
        heartbeat = record.heartbeat,
        temp = record.temp,
        "simulated vitals saved"
    );
    Ok(SimulateResponse {
        success: true,
        message: None,
    })
}
