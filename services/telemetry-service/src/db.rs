use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::{Client, NoTls, Row};

use crate::record::{Location, VitalsRecord};
use crate::store::{StoreError, VitalsStore};

const SQL_CREATE_VITALS: &str = "CREATE TABLE IF NOT EXISTS vitals (\
id BIGSERIAL PRIMARY KEY, \
device_id TEXT NOT NULL, \
heartbeat DOUBLE PRECISION NOT NULL, \
bp DOUBLE PRECISION NOT NULL, \
temp DOUBLE PRECISION NOT NULL, \
lat DOUBLE PRECISION NOT NULL, \
long DOUBLE PRECISION NOT NULL, \
\"timestamp\" TIMESTAMPTZ NOT NULL); \
CREATE INDEX IF NOT EXISTS vitals_device_latest \
ON vitals (device_id, \"timestamp\" DESC, id DESC);";
const SQL_INSERT_VITALS: &str = "INSERT INTO vitals \
(device_id, heartbeat, bp, temp, lat, long, \"timestamp\") \
VALUES ($1, $2, $3, $4, $5, $6, $7)";
const SQL_SELECT_LATEST: &str = "SELECT device_id, heartbeat, bp, temp, lat, long, \"timestamp\" \
FROM vitals WHERE device_id = $1 \
ORDER BY \"timestamp\" DESC, id DESC LIMIT 1";
const SQL_PING: &str = "SELECT 1";

pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        tokio::spawn(async move {
            // Drive the connection in the background.
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "database connection error");
            }
        });

        client.batch_execute(SQL_CREATE_VITALS).await?;
        tracing::info!("vitals table ready");
        Ok(Self { client })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.client.is_closed() {
            return Err(StoreError::Unavailable(
                "database connection closed".to_string(),
            ));
        }
        Ok(())
    }
}

fn record_from_row(row: &Row) -> Result<VitalsRecord, StoreError> {
    let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
    Ok(VitalsRecord {
        device_id: row.try_get("device_id")?,
        heartbeat: row.try_get("heartbeat")?,
        bp: row.try_get("bp")?,
        temp: row.try_get("temp")?,
        location: Location {
            lat: row.try_get("lat")?,
            long: row.try_get("long")?,
        },
        timestamp,
    })
}

#[async_trait]
impl VitalsStore for PgStore {
    async fn insert_one(&self, record: &VitalsRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.client
            .execute(
                SQL_INSERT_VITALS,
                &[
                    &record.device_id,
                    &record.heartbeat,
                    &record.bp,
                    &record.temp,
                    &record.location.lat,
                    &record.location.long,
                    &record.timestamp,
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_latest(&self, device_id: &str) -> Result<Option<VitalsRecord>, StoreError> {
        self.ensure_open()?;
        let row = self.client.query_opt(SQL_SELECT_LATEST, &[&device_id]).await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.client.query_one(SQL_PING, &[]).await?;
        Ok(())
    }
}
