//! Callback listener
//!
//! A loopback HTTP listener the VirtualHere server posts bind/unbind events
//! to. The surface is deliberately tiny: two fixed POST paths, JSON bodies,
//! status-only responses (the server fires and forgets, checking only the
//! status code). Requests are served sequentially in the accept loop, which
//! matches the event source: a device transitions bound/unbound through one
//! server process, so deliveries never overlap.
//!
//! The listener owns its own start/stop lifecycle, independent of the server
//! process it receives callbacks from.

use common::{Error, Result};
use events::types::MAX_PAYLOAD_SIZE;
use events::{BindEvent, ON_BIND_PATH, ON_UNBIND_PATH, UnbindEvent, decode_bind, decode_unbind};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Receives the parsed, typed callback events
///
/// Implemented by the supervisor; registered once at listener construction.
/// The listener awaits handler completion before answering the server, so a
/// handler error turns into a 500 on the wire.
pub trait CallbackHandler: Send + Sync + 'static {
    fn on_bind(&self, event: BindEvent) -> impl Future<Output = Result<()>> + Send;
    fn on_unbind(&self, event: UnbindEvent) -> impl Future<Output = Result<()>> + Send;
}

/// Loopback HTTP listener for server callbacks
///
/// Lifecycle: stopped -> running -> stopped. `start` while running is an
/// error; `stop` is idempotent; a stopped listener can be started again on a
/// fresh ephemeral port.
pub struct CallbackListener<H: CallbackHandler> {
    handler: Arc<H>,
    port: Option<u16>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl<H: CallbackHandler> CallbackListener<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            port: None,
            shutdown: None,
            task: None,
        }
    }

    /// Bind an OS-assigned port on loopback and start accepting callbacks
    ///
    /// Returns the bound port, which the server process must be launched
    /// with so its callbacks reach this listener.
    pub async fn start(&mut self) -> Result<u16> {
        if self.task.is_some() {
            return Err(Error::Other(
                "callback listener already running".to_string(),
            ));
        }

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| Error::PortBind(format!("failed to bind callback listener: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| Error::PortBind(format!("failed to read bound address: {}", e)))?
            .port();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handler = Arc::clone(&self.handler);

        let task = tokio::spawn(async move {
            info!("Callback listener accepting on 127.0.0.1:{}", port);
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((mut stream, _addr)) => {
                            serve_connection(&mut stream, handler.as_ref()).await;
                        }
                        Err(e) => warn!("Callback accept failed: {}", e),
                    },
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Callback accept loop exited");
        });

        self.port = Some(port);
        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        Ok(port)
    }

    /// Shut the listener down and release the port. Idempotent.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Err(e) = task.await {
            warn!("Callback listener task failed: {}", e);
        }
        self.port = None;
        info!("Callback listener stopped");
    }

    pub fn is_up(&self) -> bool {
        self.task.is_some()
    }

    /// Bound port while running
    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

/// Serve one callback request on an accepted connection
///
/// Response mapping: 200 on handler success, 400 for anything malformed
/// (body, path, method), 500 when the handler itself fails. State is only
/// touched by the handler, so a 400 never changes supervisor state.
async fn serve_connection<H: CallbackHandler>(stream: &mut TcpStream, handler: &H) {
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);

    let request = match read_request(&mut reader).await {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected callback request: {}", e);
            respond(&mut write_half, 400, "Bad Request").await;
            return;
        }
    };

    match dispatch(&request, handler).await {
        Ok(()) => respond(&mut write_half, 200, "OK").await,
        Err(Error::BadRequest(msg)) => {
            warn!(
                "Rejected callback {} {}: {}",
                request.method, request.path, msg
            );
            respond(&mut write_half, 400, "Bad Request").await;
        }
        Err(e) => {
            error!("Callback handler failed for {}: {}", request.path, e);
            respond(&mut write_half, 500, "Internal Server Error").await;
        }
    }
}

async fn dispatch<H: CallbackHandler>(request: &HttpRequest, handler: &H) -> Result<()> {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", p) if p == ON_BIND_PATH => {
            let event = decode_bind(&request.body)?;
            debug!(
                client_ip = %event.client_ip,
                connection_id = %event.connection_id,
                "Received bind callback"
            );
            handler.on_bind(event).await
        }
        ("POST", p) if p == ON_UNBIND_PATH => {
            let event = decode_unbind(&request.body)?;
            debug!(
                client_ip = %event.client_ip,
                surprise = event.surprise_unbound,
                "Received unbind callback"
            );
            handler.on_unbind(event).await
        }
        _ => Err(Error::BadRequest(format!(
            "unsupported request: {} {}",
            request.method, request.path
        ))),
    }
}

/// Read one HTTP/1.1 request: request line, headers, Content-Length body
///
/// This is not a general HTTP parser; it reads exactly what the callback
/// shell scripts produce and rejects everything else.
async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<HttpRequest> {
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| Error::BadRequest("empty request line".to_string()))?
        .to_string();
    let path = parts
        .next()
        .ok_or_else(|| Error::BadRequest("request line missing path".to_string()))?
        .to_string();
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Err(Error::BadRequest(format!(
            "not an HTTP request line: {}",
            line.trim_end()
        )));
    }

    let mut content_length: usize = 0;
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        if n == 0 {
            return Err(Error::BadRequest(
                "connection closed mid-headers".to_string(),
            ));
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().map_err(|_| {
                    Error::BadRequest(format!("invalid Content-Length: {}", value.trim()))
                })?;
            }
        }
    }

    if content_length > MAX_PAYLOAD_SIZE {
        return Err(Error::BadRequest(format!(
            "payload too large: {} bytes",
            content_length
        )));
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(HttpRequest { method, path, body })
}

async fn respond<W: AsyncWrite + Unpin>(writer: &mut W, status: u16, reason: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status, reason
    );
    if let Err(e) = writer.write_all(response.as_bytes()).await {
        warn!("Failed to write callback response: {}", e);
        return;
    }
    if let Err(e) = writer.shutdown().await {
        debug!("Failed to shut down callback connection: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(raw: &str) -> Result<HttpRequest> {
        let mut reader = BufReader::new(raw.as_bytes());
        read_request(&mut reader).await
    }

    #[tokio::test]
    async fn test_read_post_with_body() {
        let raw = "POST /onBind HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: 4\r\n\r\nbody";
        let request = parse(raw).await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/onBind");
        assert_eq!(request.body, b"body");
    }

    #[tokio::test]
    async fn test_read_post_without_body() {
        let raw = "POST /onBind HTTP/1.1\r\n\r\n";
        let request = parse(raw).await.unwrap();
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_http() {
        assert!(matches!(
            parse("hello there\r\n").await,
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(parse("\r\n").await, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_content_length() {
        let raw = "POST /onBind HTTP/1.1\r\nContent-Length: many\r\n\r\n";
        assert!(matches!(parse(raw).await, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_rejects_oversized_body() {
        let raw = format!(
            "POST /onBind HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_PAYLOAD_SIZE + 1
        );
        assert!(matches!(parse(&raw).await, Err(Error::BadRequest(_))));
    }
}
