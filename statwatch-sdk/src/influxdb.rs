//! InfluxDB v2 client using the HTTP write API.
//!
//! Points are written in line protocol with second precision to
//! `POST /api/v2/write?org=..&bucket=..&precision=s`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use statwatch_sdk::{InfluxDbClient, ServerConfiguration, StatisticsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfiguration {
//!         enabled: true,
//!         server: "http://localhost:8086".to_string(),
//!         token: "my-token".to_string(),
//!         organization: "home".to_string(),
//!         bucket: "game".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let client = InfluxDbClient::new(&config)?;
//!     assert!(client.enabled());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use statwatch_types::Measurement;

use crate::cancel::CancellationToken;
use crate::client::StatisticsClient;
use crate::config::{RemoteType, ServerConfiguration};
use crate::error::{BackendError, ConnectionStatus, TestError};
use crate::line_protocol::LineEncoder;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for an InfluxDB v2 server.
#[derive(Debug)]
pub struct InfluxDbClient {
    http: Option<Client>,
    server: String,
    token: String,
    organization: String,
    bucket: String,
}

impl InfluxDbClient {
    /// Create a client. The HTTP client is only built when the configuration
    /// is complete.
    pub fn new(config: &ServerConfiguration) -> Result<Self, BackendError> {
        let http = if Self::is_configured(config) {
            Some(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
        } else {
            None
        };

        Ok(Self {
            http,
            server: config.server.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            organization: config.organization.clone(),
            bucket: config.bucket.clone(),
        })
    }

    /// Whether `config` describes a usable InfluxDB target.
    pub fn is_configured(config: &ServerConfiguration) -> bool {
        config.enabled
            && config.remote_type == RemoteType::InfluxDb
            && (config.server.starts_with("http://") || config.server.starts_with("https://"))
            && !config.token.is_empty()
            && !config.organization.is_empty()
            && !config.bucket.is_empty()
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.token)
    }

    async fn write(&self, http: &Client, body: String) -> Result<(), BackendError> {
        let response = http
            .post(format!("{}/api/v2/write", self.server))
            .query(&[
                ("org", self.organization.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .header("Authorization", self.authorization())
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Auth(format!("InfluxDB returned status {}", status)));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Http(format!(
                "InfluxDB returned status {}: {}",
                status, detail
            )));
        }
        Ok(())
    }

    async fn run_test(&self, http: &Client) -> ConnectionStatus {
        let ping = http.get(format!("{}/ping", self.server)).send().await;
        match ping {
            Ok(r) if r.status().is_success() => {}
            Ok(r) => {
                debug!("InfluxDB ping returned status {}", r.status());
                return unreachable_status();
            }
            Err(e) => {
                debug!("InfluxDB ping failed: {}", e);
                return unreachable_status();
            }
        }

        let buckets = match self.find_buckets(http).await {
            Ok(Some(buckets)) => buckets,
            Ok(None) => {
                return ConnectionStatus::Failed(TestError::Unauthorized(
                    "InfluxDB rejected the token".to_string(),
                ))
            }
            Err(e) => {
                warn!("Failed to load buckets: {}", e);
                return ConnectionStatus::Failed(TestError::StorageTarget(
                    "Failed to load buckets from InfluxDB server".to_string(),
                ));
            }
        };

        if buckets.is_empty() {
            return ConnectionStatus::Caveat(
                "Could not check if bucket exists (the token might not have permissions to query buckets)"
                    .to_string(),
            );
        }
        if !buckets.iter().any(|b| b.name == self.bucket) {
            return ConnectionStatus::Failed(TestError::StorageTarget(format!(
                "Bucket '{}' not found",
                self.bucket
            )));
        }
        ConnectionStatus::Ok
    }

    /// Buckets visible to the token, `None` when the token is rejected.
    async fn find_buckets(&self, http: &Client) -> Result<Option<Vec<Bucket>>, BackendError> {
        let response = http
            .get(format!("{}/api/v2/buckets", self.server))
            .query(&[("org", self.organization.as_str())])
            .header("Authorization", self.authorization())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        // A token without read access to buckets cannot list them.
        if status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND {
            return Ok(Some(Vec::new()));
        }
        if !status.is_success() {
            return Err(BackendError::Http(format!("API returned status {}", status)));
        }

        let list: BucketList = response.json().await?;
        Ok(Some(list.buckets))
    }
}

fn unreachable_status() -> ConnectionStatus {
    ConnectionStatus::Failed(TestError::Unreachable(
        "Failed to ping InfluxDB server".to_string(),
    ))
}

#[async_trait]
impl StatisticsClient for InfluxDbClient {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    fn enabled(&self) -> bool {
        self.http.is_some()
    }

    async fn save(&self, points: Vec<Measurement>) -> Result<(), BackendError> {
        let Some(http) = &self.http else {
            return Ok(());
        };
        if points.is_empty() {
            return Ok(());
        }

        let body = LineEncoder::INFLUXDB.encode_all(&points)?;
        self.write(http, body).await
    }

    async fn test_connection(&self, token: CancellationToken) -> ConnectionStatus {
        let Some(http) = &self.http else {
            return ConnectionStatus::Failed(TestError::NotConfigured);
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => ConnectionStatus::Cancelled,
            status = self.run_test(http) => status,
        }
    }
}

/// Response of `GET /api/v2/buckets`.
#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    name: String,
}
