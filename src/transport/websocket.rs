use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::error::{TransportError, ValidationError};

use super::{Connection, ConnectionFactory, MessageSink, MessageSource};

/// Chat endpoint used when no URL is configured.
pub const DEFAULT_URL: &str = "ws://localhost:8080/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Normalizes a user supplied endpoint into a `ws`/`wss` URL.
///
/// # Errors
///
/// Returns an error when the URL cannot be parsed, has no host or uses a
/// scheme other than ws, wss, http or https.
pub fn resolve_websocket_url(raw_url: &str) -> Result<Url, ValidationError> {
    let mut url = Url::parse(raw_url).map_err(|source| ValidationError::InvalidUrl {
        url: raw_url.to_owned(),
        source,
    })?;

    let target_scheme = match url.scheme() {
        "ws" | "wss" => None,
        "http" => Some("ws"),
        "https" => Some("wss"),
        other => {
            return Err(ValidationError::UnsupportedUrlScheme {
                scheme: other.to_owned(),
            });
        }
    };
    if let Some(scheme) = target_scheme {
        url.set_scheme(scheme)
            .map_err(|()| ValidationError::UnsupportedUrlScheme {
                scheme: url.scheme().to_owned(),
            })?;
    }

    if url.host_str().is_none() {
        return Err(ValidationError::UrlMissingHost);
    }
    Ok(url)
}

pub struct WebSocketConnector {
    url: Url,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    #[must_use]
    pub const fn new(url: Url, connect_timeout: Duration) -> Self {
        Self {
            url,
            connect_timeout,
        }
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ConnectionFactory for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let connect = timeout(self.connect_timeout, connect_async(self.url.as_str())).await;
        let (stream, _response) = match connect {
            Ok(Ok(values)) => values,
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    url: self.url.to_string(),
                    source: Box::new(source),
                });
            }
            Err(_elapsed) => {
                return Err(TransportError::ConnectTimedOut {
                    url: self.url.to_string(),
                    timeout_ms: self.connect_timeout.as_millis(),
                });
            }
        };

        let (sink, source) = stream.split();
        Ok(Connection::new(
            Box::new(WebSocketSink { sink }),
            Box::new(WebSocketSource { source }),
        ))
    }
}

struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl MessageSink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|source| TransportError::Write {
                source: Box::new(source),
            })
    }

    async fn close(&mut self) {
        drop(self.sink.close().await);
    }
}

struct WebSocketSource {
    source: SplitStream<WsStream>,
}

#[async_trait]
impl MessageSource for WebSocketSource {
    async fn next_text(&mut self) -> Result<String, TransportError> {
        loop {
            match self.source.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                Some(Err(source)) => {
                    return Err(TransportError::Read {
                        source: Box::new(source),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use std::future::Future;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;

    const TEST_TIMEOUT: Duration = Duration::from_secs(2);

    fn run_async_test<F>(future: F) -> AppResult<()>
    where
        F: Future<Output = AppResult<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
        runtime.block_on(future)
    }

    fn permission_denied(err: &std::io::Error) -> bool {
        err.kind() == std::io::ErrorKind::PermissionDenied
    }

    async fn spawn_websocket_echo_server()
    -> AppResult<Option<(std::net::SocketAddr, JoinHandle<AppResult<()>>)>> {
        let listener = match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(err) if permission_denied(&err) => return Ok(None),
            Err(err) => {
                return Err(AppError::validation(format!(
                    "Failed to bind websocket server: {}",
                    err
                )));
            }
        };
        let addr = listener.local_addr().map_err(|err| {
            AppError::validation(format!("Failed to read websocket server addr: {}", err))
        })?;

        let task = tokio::spawn(async move {
            let (stream, _) = timeout(TEST_TIMEOUT, listener.accept())
                .await
                .map_err(|_err| AppError::validation("Websocket accept timed out"))?
                .map_err(|err| AppError::validation(format!("Websocket accept failed: {}", err)))?;
            let mut ws = timeout(TEST_TIMEOUT, accept_async(stream))
                .await
                .map_err(|_err| AppError::validation("Websocket handshake timed out"))?
                .map_err(|err| {
                    AppError::validation(format!("Websocket handshake failed: {}", err))
                })?;

            while let Some(incoming) = ws.next().await {
                let Ok(message) = incoming else {
                    break;
                };
                if message.is_text() || message.is_binary() {
                    if ws.send(message).await.is_err() {
                        break;
                    }
                } else if message.is_close() {
                    break;
                }
            }
            Ok(())
        });
        Ok(Some((addr, task)))
    }

    #[test]
    fn resolve_rewrites_http_schemes() -> AppResult<()> {
        let url = resolve_websocket_url("http://localhost:8080/ws")?;
        if url.as_str() != "ws://localhost:8080/ws" {
            return Err(AppError::validation(format!("Unexpected url: {}", url)));
        }
        let url = resolve_websocket_url("https://chat.example.com/ws")?;
        if url.scheme() != "wss" {
            return Err(AppError::validation(format!("Unexpected scheme: {}", url)));
        }
        let url = resolve_websocket_url(DEFAULT_URL)?;
        if url.port() != Some(8080) || url.path() != "/ws" {
            return Err(AppError::validation(format!("Unexpected default: {}", url)));
        }
        Ok(())
    }

    #[test]
    fn resolve_rejects_other_schemes() -> AppResult<()> {
        match resolve_websocket_url("ftp://localhost/ws") {
            Err(ValidationError::UnsupportedUrlScheme { scheme }) if scheme == "ftp" => Ok(()),
            other => Err(AppError::validation(format!(
                "Expected UnsupportedUrlScheme, got {:?}",
                other
            ))),
        }
    }

    #[test]
    fn resolve_rejects_unparsable_urls() -> AppResult<()> {
        match resolve_websocket_url("not a url") {
            Err(ValidationError::InvalidUrl { .. }) => Ok(()),
            other => Err(AppError::validation(format!(
                "Expected InvalidUrl, got {:?}",
                other
            ))),
        }
    }

    #[test]
    fn websocket_connection_round_trips_text() -> AppResult<()> {
        run_async_test(async {
            let Some((addr, server)) = spawn_websocket_echo_server().await? else {
                return Ok(());
            };
            let url = resolve_websocket_url(&format!("ws://{}/ws", addr))?;
            let connector = WebSocketConnector::new(url, TEST_TIMEOUT);
            let connection = connector.connect().await?;
            let (mut writer, mut reader, closer) = connection.split();

            writer.send("ping".to_owned()).await?;
            let echoed = timeout(TEST_TIMEOUT, reader.receive())
                .await
                .map_err(|_err| AppError::validation("Timed out waiting for echo"))??;
            if echoed != "ping" {
                return Err(AppError::validation(format!("Unexpected echo: {}", echoed)));
            }

            closer.close();
            if !matches!(
                writer.send("late".to_owned()).await,
                Err(TransportError::Closed)
            ) {
                return Err(AppError::validation("Expected Closed after close"));
            }
            timeout(TEST_TIMEOUT, server)
                .await
                .map_err(|_err| AppError::validation("Echo server did not stop"))??
        })
    }

    #[test]
    fn connect_to_closed_port_reports_connect_error() -> AppResult<()> {
        run_async_test(async {
            let listener = match TcpListener::bind("127.0.0.1:0").await {
                Ok(listener) => listener,
                Err(err) if permission_denied(&err) => return Ok(()),
                Err(err) => return Err(AppError::validation(format!("Bind failed: {}", err))),
            };
            let addr = listener
                .local_addr()
                .map_err(|err| AppError::validation(format!("Addr failed: {}", err)))?;
            drop(listener);

            let url = resolve_websocket_url(&format!("ws://{}/ws", addr))?;
            let connector = WebSocketConnector::new(url, TEST_TIMEOUT);
            match connector.connect().await {
                Err(TransportError::Connect { .. } | TransportError::ConnectTimedOut { .. }) => {
                    Ok(())
                }
                Err(other) => Err(AppError::validation(format!(
                    "Unexpected error: {}",
                    other
                ))),
                Ok(_) => Err(AppError::validation("Expected connect failure")),
            }
        })
    }
}
