use std::io;
use std::time::Duration;

use relay_logging::relay_debug;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

pub const APRS_IS_HOST: &str = "cwop.aprs.net";
pub const APRS_IS_PORT: u16 = 14580;

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// Reported in the login line as `vers {client_name}`.
    pub client_name: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            host: APRS_IS_HOST.to_string(),
            port: APRS_IS_PORT,
            connect_timeout: Duration::from_secs(30),
            client_name: format!("cwop-relay {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("cannot connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("connect to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },
    #[error("{written} of {expected} bytes written")]
    ShortWrite { written: usize, expected: usize },
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

/// Receive-only login: passcode -1, no filter.
pub fn login_line(cwop_id: &str, client_name: &str) -> String {
    format!("user {cwop_id} pass -1 vers {client_name}\r")
}

/// Login line followed by the packet, each terminated by `\r`.
pub fn session_payload(cwop_id: &str, client_name: &str, packet: &str) -> String {
    let mut payload = login_line(cwop_id, client_name);
    payload.push_str(packet);
    payload.push('\r');
    payload
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Delivers one packet. Returns the number of bytes written.
    async fn upload(&self, cwop_id: &str, packet: &str) -> Result<usize, DeliveryError>;
}

/// Fire-and-forget APRS-IS client: connect, one write, close. Nothing is read
/// back from the server.
#[derive(Debug, Clone, Default)]
pub struct AprsIsUploader {
    settings: UploadSettings,
}

impl AprsIsUploader {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    async fn connect(&self) -> Result<TcpStream, DeliveryError> {
        let UploadSettings {
            host,
            port,
            connect_timeout,
            ..
        } = &self.settings;
        match tokio::time::timeout(*connect_timeout, TcpStream::connect((host.as_str(), *port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(DeliveryError::Connect {
                host: host.clone(),
                port: *port,
                source,
            }),
            Err(_) => Err(DeliveryError::ConnectTimeout {
                host: host.clone(),
                port: *port,
                timeout: *connect_timeout,
            }),
        }
    }
}

#[async_trait::async_trait]
impl Uploader for AprsIsUploader {
    async fn upload(&self, cwop_id: &str, packet: &str) -> Result<usize, DeliveryError> {
        let payload = session_payload(cwop_id, &self.settings.client_name, packet);
        let mut stream = self.connect().await?;
        relay_debug!(
            "Connected to {}:{}, sending {} bytes",
            self.settings.host,
            self.settings.port,
            payload.len()
        );

        let written = stream
            .write(payload.as_bytes())
            .await
            .map_err(DeliveryError::Write)?;
        // Close errors do not change what was already handed to the socket.
        let _ = stream.shutdown().await;

        if written != payload.len() {
            return Err(DeliveryError::ShortWrite {
                written,
                expected: payload.len(),
            });
        }
        Ok(written)
    }
}
