use vitals_common::{env_opt, env_or};

use crate::record::{Location, RecordDefaults};

pub const DEFAULT_DEVICE_ID: &str = "SOLDIER_UNIT_01";
pub const DEFAULT_PORT: u16 = 3010;
const DEFAULT_REFERENCE: Location = Location {
    lat: 23.0225,
    long: 72.5714,
};

#[derive(Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// Shared secret expected in `x-api-key`. Unset rejects every upload.
    pub api_key: Option<String>,
    pub device_id: String,
    pub reference: Location,
    pub database_url: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", DEFAULT_PORT),
            api_key: env_opt("API_KEY"),
            device_id: env_opt("DEVICE_ID").unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string()),
            reference: Location {
                lat: env_or("REFERENCE_LAT", DEFAULT_REFERENCE.lat),
                long: env_or("REFERENCE_LONG", DEFAULT_REFERENCE.long),
            },
            database_url: env_opt("DATABASE_URL"),
        }
    }

    pub fn record_defaults(&self) -> RecordDefaults {
        RecordDefaults {
            device_id: self.device_id.clone(),
            reference: self.reference,
        }
    }

    /// Exact string match, no constant-time comparison.
    pub fn authorizes(&self, presented: Option<&str>) -> bool {
        match (self.api_key.as_deref(), presented) {
            (Some(expected), Some(presented)) => expected == presented,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> ServiceConfig {
        ServiceConfig {
            port: DEFAULT_PORT,
            api_key: api_key.map(str::to_string),
            device_id: DEFAULT_DEVICE_ID.to_string(),
            reference: DEFAULT_REFERENCE,
            database_url: None,
        }
    }

    #[test]
    fn key_must_match_exactly() {
        let config = config(Some("field-secret"));
        assert!(config.authorizes(Some("field-secret")));
        assert!(!config.authorizes(Some("field-secret ")));
        assert!(!config.authorizes(Some("FIELD-SECRET")));
        assert!(!config.authorizes(None));
    }

    #[test]
    fn unset_secret_rejects_everything() {
        let config = config(None);
        assert!(!config.authorizes(None));
        assert!(!config.authorizes(Some("")));
    }
}
