//! TCP transport carrying length-prefixed text frames

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use controlify_shared::codec::{self, FrameDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::traits::{Transport, TransportEvent};

/// Handle to an active TCP connection. The io loop runs on its own task;
/// inbound frames and the close notification arrive on the event channel
/// returned by [`TcpTransport::connect`].
pub struct TcpTransport {
    outbound_tx: mpsc::Sender<String>,
    shutdown_tx: watch::Sender<bool>,
}

impl TcpTransport {
    /// Connect to the server and start the io loop
    pub async fn connect(addr: &str) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let stream = TcpStream::connect(addr).await?;

        let (outbound_tx, outbound_rx) = mpsc::channel::<String>(100);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(100);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(io_loop(stream, outbound_rx, event_tx, shutdown_rx));

        Ok((
            Self {
                outbound_tx,
                shutdown_tx,
            },
            event_rx,
        ))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, frame: &str) -> Result<()> {
        self.outbound_tx
            .send(frame.to_string())
            .await
            .map_err(|_| anyhow!("Connection closed"))
    }

    async fn close(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Drive one connection until either side closes it
async fn io_loop(
    stream: TcpStream,
    mut outbound_rx: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<TransportEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let (mut reader, mut writer) = stream.into_split();

    let mut decoder = FrameDecoder::new();
    let mut read_buf = vec![0u8; 4096];

    let closed = 'io: loop {
        tokio::select! {
            // Locally requested close
            _ = shutdown_rx.changed() => {
                let _ = writer.shutdown().await;
                break 'io TransportEvent::Closed { code: 0, reason: None };
            }

            // Send outbound frames
            Some(frame) = outbound_rx.recv() => {
                let encoded = match codec::encode(&frame) {
                    Ok(encoded) => encoded,
                    Err(e) => break 'io TransportEvent::Closed { code: 1, reason: Some(e.to_string()) },
                };
                if let Err(e) = writer.write_all(&encoded).await {
                    break 'io TransportEvent::Closed { code: 1, reason: Some(e.to_string()) };
                }
            }

            // Read incoming frames
            result = reader.read(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        break 'io TransportEvent::Closed {
                            code: 0,
                            reason: Some("server closed connection".to_string()),
                        };
                    }
                    Ok(n) => {
                        decoder.extend(&read_buf[..n]);

                        // Deliver all complete frames
                        loop {
                            match decoder.decode_next() {
                                Ok(Some(frame)) => {
                                    let _ = event_tx.send(TransportEvent::Frame(frame)).await;
                                }
                                Ok(None) => break,
                                Err(e) => {
                                    break 'io TransportEvent::Closed {
                                        code: 1,
                                        reason: Some(e.to_string()),
                                    };
                                }
                            }
                        }
                    }
                    Err(e) => {
                        break 'io TransportEvent::Closed { code: 1, reason: Some(e.to_string()) };
                    }
                }
            }
        }
    };

    debug!("transport io loop finished");
    let _ = event_tx.send(closed).await;
}
