use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use cloudshell_api::{ConsoleClient, ConsoleError, TerminalHandle};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::geometry::WindowSize;
use crate::heartbeat::{Heartbeat, HeartbeatAction, HEARTBEAT_INTERVAL};
use crate::resize::ResizeCoordinator;

/// Attempts to create the remote terminal before giving up.
pub const CONNECT_ATTEMPTS: u32 = 10;

/// Attempts to open the terminal socket, spaced 500 ms apart.
pub const SOCKET_OPEN_ATTEMPTS: u32 = 30;
const SOCKET_OPEN_RETRY: Duration = Duration::from_millis(500);

type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a relay session ended.
///
/// The relay reports the outcome instead of exiting the process; the driver
/// decides what a clean close means (normally exit 0) and leaves error
/// closes to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The socket closed gracefully with no prior error.
    CleanClose,
    /// The socket errored, timed out, or closed after an error.
    ErrorClose,
}

/// An open relay between the local terminal and a cloud shell
/// pseudo-terminal.
pub struct TerminalRelay {
    client: ConsoleClient,
    console_uri: String,
    handle: TerminalHandle,
    socket: SocketStream,
    resize: ResizeCoordinator,
}

/// Create the remote terminal and open its socket.
///
/// Terminal creation retries transient failures (503/504) up to
/// [`CONNECT_ATTEMPTS`] times with `1000 * attempt` ms of backoff. Failures
/// are soft: they are logged and `Ok(None)` is returned so the caller can
/// proceed without a session. Once the socket reports open, a timestamped
/// readiness marker is written to `marker_path` (when supplied) to signal
/// the shell is interactive-ready.
pub async fn connect_terminal(
    client: ConsoleClient,
    console_uri: &str,
    marker_path: Option<&Path>,
) -> Result<Option<TerminalRelay>> {
    eprintln!("Connecting terminal...");

    let handle = match initialize_with_retry(&client, console_uri).await? {
        Some(handle) => handle,
        None => return Ok(None),
    };

    let socket = match open_socket(&handle.socket_uri).await {
        Some(socket) => socket,
        None => {
            eprintln!("Failed to connect to the terminal.");
            return Ok(None);
        }
    };

    if let Some(path) = marker_path {
        write_ready_marker(path)?;
    }

    Ok(Some(TerminalRelay {
        client,
        console_uri: console_uri.to_string(),
        handle,
        socket,
        resize: ResizeCoordinator::new(),
    }))
}

async fn initialize_with_retry(
    client: &ConsoleClient,
    console_uri: &str,
) -> Result<Option<TerminalHandle>, ConsoleError> {
    for attempt in 1..=CONNECT_ATTEMPTS {
        let size = WindowSize::current();
        let response = client
            .initialize_terminal(console_uri, size.cols, size.rows)
            .await?;

        if response.is_success() {
            let handle: TerminalHandle = serde_json::from_value(response.body)?;
            return Ok(Some(handle));
        }
        if response.is_transient() {
            sleep(Duration::from_millis(1000 * u64::from(attempt))).await;
            continue;
        }
        eprintln!("{}", response.error_message());
        return Ok(None);
    }

    eprintln!("Failed to connect to the terminal.");
    Ok(None)
}

async fn open_socket(socket_uri: &str) -> Option<SocketStream> {
    for _ in 0..SOCKET_OPEN_ATTEMPTS {
        match connect_async(socket_uri).await {
            Ok((socket, _)) => return Some(socket),
            Err(_) => sleep(SOCKET_OPEN_RETRY).await,
        }
    }
    None
}

/// Single line another process watches for to know the shell is ready.
fn write_ready_marker(path: &Path) -> std::io::Result<()> {
    let line = format!(
        "{}: Cloud Shell web socket opened.\n",
        Utc::now().timestamp_millis()
    );
    std::fs::write(path, line)
}

impl TerminalRelay {
    /// The pseudo-terminal this relay is attached to.
    pub fn handle(&self) -> &TerminalHandle {
        &self.handle
    }

    /// Relay bytes between `input`/`output` and the remote terminal until
    /// the socket closes.
    ///
    /// Runs a single event loop over local input, socket messages, the
    /// 60-second heartbeat and window-change signals. Input bytes are
    /// forwarded verbatim as binary frames; socket text/binary payloads are
    /// written verbatim to `output`. A missed pong tears the connection
    /// down once and the close is reported as an error. Resize signals
    /// spawn debounced resize attempts gated by the session's generation
    /// counter.
    pub async fn run<I, O>(self, mut input: I, mut output: O) -> Result<RelayOutcome>
    where
        I: AsyncRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let TerminalRelay {
            client,
            console_uri,
            handle,
            socket,
            resize,
        } = self;
        let (mut sink, mut stream) = socket.split();

        let mut heartbeat = Heartbeat::new();
        let mut ticker = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
        let mut winch = resize_signal()?;
        let mut buf = vec![0u8; 4096];
        let mut input_open = true;
        let mut errored = false;

        loop {
            tokio::select! {
                read = input.read(&mut buf), if input_open => match read {
                    // Local input ending is not a session end; keep relaying
                    // remote output until the socket closes.
                    Ok(0) | Err(_) => input_open = false,
                    Ok(n) => {
                        if let Err(err) = sink.send(Message::Binary(buf[..n].to_vec())).await {
                            eprintln!("socket write failed: {err}");
                            errored = true;
                            break;
                        }
                    }
                },
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        output.write_all(text.as_bytes()).await?;
                        output.flush().await?;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        output.write_all(&data).await?;
                        output.flush().await?;
                    }
                    Some(Ok(Message::Pong(_))) => heartbeat.pong(),
                    // Pings are answered by the protocol layer; a close
                    // frame drains the stream to None.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        eprintln!("socket error: {err}");
                        errored = true;
                        break;
                    }
                    None => break,
                },
                _ = ticker.tick() => match heartbeat.tick() {
                    HeartbeatAction::Ping => {
                        let _ = sink.send(Message::Ping(Vec::new())).await;
                    }
                    HeartbeatAction::Timeout => {
                        eprintln!("Socket timeout");
                        errored = true;
                        let _ = sink.close().await;
                        break;
                    }
                    HeartbeatAction::Idle => {}
                },
                _ = next_resize(&mut winch) => {
                    let generation = resize.begin();
                    let coordinator = resize.clone();
                    let client = client.clone();
                    let console_uri = console_uri.clone();
                    let terminal_id = handle.id.clone();
                    tokio::spawn(async move {
                        coordinator
                            .run(&client, &console_uri, &terminal_id, generation)
                            .await;
                    });
                }
            }
        }

        Ok(if errored {
            RelayOutcome::ErrorClose
        } else {
            RelayOutcome::CleanClose
        })
    }
}

#[cfg(unix)]
type ResizeSignal = tokio::signal::unix::Signal;

#[cfg(unix)]
fn resize_signal() -> std::io::Result<ResizeSignal> {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change())
}

#[cfg(unix)]
async fn next_resize(signal: &mut ResizeSignal) {
    if signal.recv().await.is_none() {
        std::future::pending::<()>().await
    }
}

#[cfg(not(unix))]
type ResizeSignal = ();

#[cfg(not(unix))]
fn resize_signal() -> std::io::Result<ResizeSignal> {
    Ok(())
}

#[cfg(not(unix))]
async fn next_resize(_signal: &mut ResizeSignal) {
    std::future::pending::<()>().await
}
