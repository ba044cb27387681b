use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::config::VendorConfig;
use crate::error::{PodcastError, Result};

/// Bidirectional binary message pipe to the vendor
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, data: Vec<u8>) -> Result<()>;

    /// Next binary message; `None` once the peer has closed
    async fn next_message(&mut self) -> Option<Result<Vec<u8>>>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens one transport per connection attempt
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, connect_id: &str) -> Result<Box<dyn Transport>>;
}

/// Connects to the vendor podcast endpoint over WebSocket
pub struct WsConnector {
    config: VendorConfig,
}

impl WsConnector {
    pub fn new(config: VendorConfig) -> Self {
        Self { config }
    }

    fn header(value: &str, name: &str) -> Result<HeaderValue> {
        HeaderValue::from_str(value)
            .map_err(|e| PodcastError::InvalidConfig(format!("invalid {} header: {}", name, e)))
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(&self, connect_id: &str) -> Result<Box<dyn Transport>> {
        if self.config.app_id.is_empty() || self.config.access_key.is_empty() {
            return Err(PodcastError::InvalidConfig(
                "vendor app_id and access_key must be set".to_string(),
            ));
        }

        let mut request = self.config.ws_url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert("X-Api-App-Id", Self::header(&self.config.app_id, "app id")?);
        headers.insert(
            "X-Api-Access-Key",
            Self::header(&self.config.access_key, "access key")?,
        );
        headers.insert(
            "X-Api-Resource-Id",
            Self::header(&self.config.resource_id, "resource id")?,
        );
        headers.insert("X-Api-App-Key", Self::header(&self.config.app_key, "app key")?);
        headers.insert("X-Api-Connect-Id", Self::header(connect_id, "connect id")?);

        let (stream, response) = connect_async(request).await?;
        let log_id = response
            .headers()
            .get("X-Tt-Logid")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        info!(
            "WebSocket connected: connect_id={}, logid={}",
            connect_id, log_id
        );

        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, data: Vec<u8>) -> Result<()> {
        self.stream.send(Message::Binary(data.into())).await?;
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<Vec<u8>>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(data.to_vec())),
                Ok(Message::Text(text)) => {
                    return Some(Err(PodcastError::protocol(
                        None,
                        format!("unexpected text message: {}", text.as_str()),
                    )))
                }
                Ok(Message::Close(frame)) => {
                    debug!("WebSocket closed by peer: {:?}", frame);
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        use tokio_tungstenite::tungstenite::Error;

        match self.stream.close(None).await {
            Ok(()) | Err(Error::ConnectionClosed) | Err(Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
