//! QuestDB client speaking InfluxDB line protocol over HTTP or raw TCP.
//!
//! The endpoint scheme selects the transport:
//!
//! | scheme  | transport          | default port |
//! |---------|--------------------|--------------|
//! | `http`  | `POST /write`      | 80           |
//! | `https` | `POST /write`      | 443          |
//! | `tcp`   | ILP socket         | 9009         |
//!
//! Points are grouped per table and each table is written as its own
//! transaction.
//!
//! Credentials are sent as HTTP basic auth. The TCP transport has no
//! authentication here, so a `tcp` endpoint with a username, or a `tcps`
//! endpoint, leaves the client disabled with a logged reason.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use statwatch_types::Measurement;

use crate::cancel::CancellationToken;
use crate::client::StatisticsClient;
use crate::config::{RemoteType, ServerConfiguration};
use crate::error::{BackendError, ConnectionStatus, TestError};
use crate::line_protocol::{EncodeError, LineEncoder};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport selected by the endpoint scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Https,
    Tcp,
}

impl Transport {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(Transport::Http),
            "https" => Some(Transport::Https),
            "tcp" => Some(Transport::Tcp),
            _ => None,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Transport::Http => 80,
            Transport::Https => 443,
            Transport::Tcp => 9009,
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Https => "https",
            Transport::Tcp => "tcp",
        }
    }
}

/// A parsed QuestDB endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parse `scheme://host[:port][/]`. Returns `None` for anything else.
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.trim().split_once("://")?;
        let transport = Transport::from_scheme(scheme)?;

        let authority = rest.split('/').next().unwrap_or_default();
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (authority, transport.default_port()),
        };
        if host.is_empty() {
            return None;
        }

        Some(Self {
            transport,
            host: host.to_string(),
            port,
        })
    }

    fn base_url(&self) -> String {
        format!("{}://{}:{}", self.transport.scheme(), self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

/// Lines buffered for one table, sent only when committed.
struct TableTransaction<'a> {
    table: &'a str,
    buffer: String,
    lines: usize,
}

impl<'a> TableTransaction<'a> {
    fn begin(table: &'a str) -> Self {
        Self {
            table,
            buffer: String::new(),
            lines: 0,
        }
    }

    fn append(&mut self, point: &Measurement) -> Result<(), EncodeError> {
        LineEncoder::QUESTDB.encode(self.table, point, &mut self.buffer)?;
        self.lines += 1;
        Ok(())
    }

    fn commit(self) -> String {
        debug!("Committing {} rows to {}", self.lines, self.table);
        self.buffer
    }

    fn rollback(self) {
        debug!("Rolling back {} rows for {}", self.lines, self.table);
    }
}

/// Client for a QuestDB server.
#[derive(Debug)]
pub struct QuestDbClient {
    endpoint: Option<Endpoint>,
    http: Option<Client>,
    username: String,
    password: String,
    table_prefix: String,
}

impl QuestDbClient {
    pub fn new(config: &ServerConfiguration) -> Result<Self, BackendError> {
        let selected = config.enabled && config.remote_type == RemoteType::QuestDb;
        let endpoint = if selected {
            usable_endpoint(config)
        } else {
            None
        };

        let http = match &endpoint {
            Some(e) if e.transport != Transport::Tcp => {
                Some(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
            }
            _ => None,
        };

        Ok(Self {
            endpoint,
            http,
            username: config.username.clone(),
            password: config.password.clone(),
            table_prefix: config.table_prefix.clone(),
        })
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Table name for a measurement.
    pub fn table_name(&self, measurement: &str) -> String {
        if self.table_prefix.is_empty() {
            measurement.to_string()
        } else {
            format!("{}_{}", self.table_prefix, measurement)
        }
    }

    /// Encode each table as a transaction. Any encoding failure rolls that
    /// table back and aborts the batch.
    fn encode_tables(&self, points: &[Measurement]) -> Result<Vec<(String, String)>, EncodeError> {
        let mut tables: BTreeMap<String, Vec<&Measurement>> = BTreeMap::new();
        for point in points {
            tables
                .entry(self.table_name(point.name()))
                .or_default()
                .push(point);
        }

        let mut payloads = Vec::with_capacity(tables.len());
        for (table, rows) in &tables {
            let mut tx = TableTransaction::begin(table);
            for row in rows {
                if let Err(e) = tx.append(row) {
                    tx.rollback();
                    return Err(e);
                }
            }
            payloads.push((table.clone(), tx.commit()));
        }
        Ok(payloads)
    }

    async fn send_http(
        &self,
        http: &Client,
        endpoint: &Endpoint,
        payloads: Vec<(String, String)>,
    ) -> Result<(), BackendError> {
        for (table, body) in payloads {
            let mut request = http
                .post(format!("{}/write", endpoint.base_url()))
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(body);
            if !self.username.is_empty() {
                request = request.basic_auth(&self.username, Some(&self.password));
            }

            let response = request.send().await?;
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(BackendError::Auth(format!("QuestDB returned status {}", status)));
            }
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(BackendError::Http(format!(
                    "QuestDB rejected table '{}' with status {}: {}",
                    table, status, detail
                )));
            }
        }
        Ok(())
    }

    async fn send_tcp(
        &self,
        endpoint: &Endpoint,
        payloads: Vec<(String, String)>,
    ) -> Result<(), BackendError> {
        let mut stream = connect(endpoint).await?;
        for (table, body) in payloads {
            stream.write_all(body.as_bytes()).await?;
            stream.flush().await?;
            debug!("Flushed table {}", table);
        }
        stream.shutdown().await?;
        Ok(())
    }

    async fn check_reachable(&self, endpoint: &Endpoint) -> ConnectionStatus {
        let reachable = match (&self.http, endpoint.transport) {
            (_, Transport::Tcp) => connect(endpoint).await.is_ok(),
            (Some(http), _) => {
                let ping = http.get(format!("{}/ping", endpoint.base_url()));
                match ping.send().await {
                    Ok(r) => r.status().is_success(),
                    Err(e) => {
                        debug!("QuestDB ping failed: {}", e);
                        false
                    }
                }
            }
            (None, _) => false,
        };

        if reachable {
            ConnectionStatus::Caveat(
                "Server is reachable, but credentials cannot be verified without writing data"
                    .to_string(),
            )
        } else {
            ConnectionStatus::Failed(TestError::Unreachable(format!(
                "Failed to reach QuestDB server at {}",
                endpoint
            )))
        }
    }
}

/// The configured endpoint, if this client can deliver to it.
fn usable_endpoint(config: &ServerConfiguration) -> Option<Endpoint> {
    let server = config.server.trim();
    if server.get(..7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("tcps://")) {
        warn!("QuestDB over TLS (tcps) is not supported, use https instead");
        return None;
    }

    let Some(endpoint) = Endpoint::parse(server) else {
        warn!("Invalid QuestDB endpoint '{}'", config.server);
        return None;
    };
    if endpoint.transport == Transport::Tcp && !config.username.is_empty() {
        warn!("QuestDB TCP authentication is not supported, use http(s) for {}", endpoint);
        return None;
    }
    Some(endpoint)
}

async fn connect(endpoint: &Endpoint) -> Result<TcpStream, BackendError> {
    let connecting = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    match tokio::time::timeout(CONNECT_TIMEOUT, connecting).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(BackendError::Connection(e.to_string())),
        Err(_) => Err(BackendError::Timeout),
    }
}

#[async_trait]
impl StatisticsClient for QuestDbClient {
    fn name(&self) -> &'static str {
        "questdb"
    }

    fn enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn save(&self, points: Vec<Measurement>) -> Result<(), BackendError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        if points.is_empty() {
            return Ok(());
        }

        let payloads = self.encode_tables(&points)?;
        match (&self.http, endpoint.transport) {
            (_, Transport::Tcp) => self.send_tcp(endpoint, payloads).await,
            (Some(http), _) => self.send_http(http, endpoint, payloads).await,
            (None, _) => Err(BackendError::Unsupported(endpoint.to_string())),
        }
    }

    async fn test_connection(&self, token: CancellationToken) -> ConnectionStatus {
        let Some(endpoint) = &self.endpoint else {
            return ConnectionStatus::Failed(TestError::NotConfigured);
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => ConnectionStatus::Cancelled,
            status = self.check_reachable(endpoint) => status,
        }
    }
}
