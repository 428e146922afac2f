//! Transport layer - stdio and WebSocket
//!
//! - stdio: for native editors
//! - WebSocket: for browser editors, which speak raw JSON-RPC frames
//!
//! The WebSocket side adds and strips the `Content-Length` framing that
//! tower-lsp expects, so the backend sees the same byte stream either way.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::SendError, OwnedPermit};
use tokio_tungstenite::tungstenite::Message;
use tower_lsp::{LspService, Server};
use tracing::{debug, info, warn};

use super::backend::{BackendConfig, PromBackend};

/// Run the language server over stdio until the client disconnects.
pub async fn run_stdio(config: BackendConfig) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(move |client| PromBackend::new(client, config));

    Server::new(stdin, stdout, socket).serve(service).await;
}

/// Accept WebSocket connections on `addr`, one backend per connection.
pub async fn run_websocket(addr: SocketAddr, config: BackendConfig) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "websocket server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "websocket connection");

        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_websocket_connection(stream, config).await {
                warn!(%peer, error = %e, "websocket connection failed");
            }
        });
    }
}

async fn handle_websocket_connection(
    stream: TcpStream,
    config: BackendConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let (input_tx, input_rx) = mpsc::channel::<Vec<u8>>(32);
    let (output_tx, mut output_rx) = mpsc::channel::<Vec<u8>>(32);

    let (service, socket) = LspService::new(move |client| PromBackend::new(client, config));
    let input = ChannelReader::new(input_rx);
    let output = ChannelWriter::new(output_tx);

    let server_handle = tokio::spawn(async move {
        Server::new(input, output, socket).serve(service).await;
    });

    let ws_to_lsp = {
        let input_tx = input_tx.clone();
        async move {
            while let Some(msg) = ws_read.next().await {
                let body = match msg {
                    Ok(Message::Text(text)) => frame(text.as_bytes()),
                    Ok(Message::Binary(data)) => frame(&data),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "websocket read failed");
                        break;
                    }
                };
                if input_tx.send(body).await.is_err() {
                    break;
                }
            }
        }
    };

    let lsp_to_ws = async move {
        let mut buffer = Vec::new();
        while let Some(data) = output_rx.recv().await {
            buffer.extend_from_slice(&data);
            while let Some(json) = extract_lsp_message(&mut buffer) {
                if ws_write.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
        }
    };

    tokio::select! {
        _ = ws_to_lsp => {}
        _ = lsp_to_ws => {}
    }

    drop(input_tx);
    let _ = server_handle.await;

    Ok(())
}

/// Prefix a JSON-RPC body with its `Content-Length` header.
fn frame(body: &[u8]) -> Vec<u8> {
    let mut message = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    message.extend_from_slice(body);
    message
}

/// Pop one complete message off the buffer, without its headers.
fn extract_lsp_message(buffer: &mut Vec<u8>) -> Option<String> {
    let header_end = find_header_end(buffer)?;
    let header = std::str::from_utf8(&buffer[..header_end]).ok()?;
    let content_length = parse_content_length(header)?;

    let body_start = header_end + 4;
    let message_end = body_start + content_length;
    if buffer.len() < message_end {
        return None;
    }

    let body = std::str::from_utf8(&buffer[body_start..message_end])
        .ok()?
        .to_string();
    buffer.drain(..message_end);
    Some(body)
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_content_length(header: &str) -> Option<usize> {
    header
        .lines()
        .find_map(|line| line.strip_prefix("Content-Length:"))
        .and_then(|value| value.trim().parse().ok())
}

/// Async reader fed by a channel of byte chunks.
struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    buffer: Vec<u8>,
    position: usize,
}

impl ChannelReader {
    fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            buffer: Vec::new(),
            position: 0,
        }
    }
}

impl AsyncRead for ChannelReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.position < self.buffer.len() {
            let remaining = &self.buffer[self.position..];
            let to_copy = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..to_copy]);
            self.position += to_copy;

            if self.position >= self.buffer.len() {
                self.buffer.clear();
                self.position = 0;
            }
            return Poll::Ready(Ok(()));
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(data)) => {
                let to_copy = data.len().min(buf.remaining());
                buf.put_slice(&data[..to_copy]);
                if to_copy < data.len() {
                    self.buffer = data;
                    self.position = to_copy;
                }
                Poll::Ready(Ok(()))
            }
            // Closed channel reads as EOF
            Poll::Ready(None) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}

type ReserveFuture =
    Pin<Box<dyn Future<Output = Result<OwnedPermit<Vec<u8>>, SendError<()>>> + Send>>;

/// Async writer that forwards each write as one channel message.
///
/// A full channel parks the writer on a stored reservation future, so the
/// waker registered by that future survives until capacity frees up.
struct ChannelWriter {
    tx: mpsc::Sender<Vec<u8>>,
    reserve: Option<ReserveFuture>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx, reserve: None }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "channel closed")
}

impl AsyncWrite for ChannelWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.reserve.is_none() {
            match self.tx.clone().try_reserve_owned() {
                Ok(permit) => {
                    permit.send(buf.to_vec());
                    return Poll::Ready(Ok(buf.len()));
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let tx = self.tx.clone();
                    self.reserve = Some(Box::pin(tx.reserve_owned()));
                }
                Err(mpsc::error::TrySendError::Closed(_)) => return Poll::Ready(Err(closed())),
            }
        }

        let Some(reserve) = self.reserve.as_mut() else {
            return Poll::Pending;
        };
        match reserve.as_mut().poll(cx) {
            Poll::Ready(Ok(permit)) => {
                self.reserve = None;
                permit.send(buf.to_vec());
                Poll::Ready(Ok(buf.len()))
            }
            Poll::Ready(Err(_)) => {
                self.reserve = None;
                Poll::Ready(Err(closed()))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
