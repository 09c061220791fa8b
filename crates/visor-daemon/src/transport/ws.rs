//! WebSocket transport: broadcasts the same framed packets to every
//! connected client.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::broadcast;
use visor_engine::proto::{Packet, CMD_SET_BRIGHTNESS};

/// Packets a slow client may fall behind before it starts skipping.
const BROADCAST_DEPTH: usize = 16;

/// Fan-out hub. The loop task publishes each packed frame once; every
/// client task forwards from its own subscription.
#[derive(Clone)]
pub struct WsHub {
    tx: broadcast::Sender<Vec<u8>>,
    brightness: Arc<AtomicU8>,
}

impl WsHub {
    pub fn new(brightness: Arc<AtomicU8>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_DEPTH);
        Self { tx, brightness }
    }

    /// Publish a packed packet to all connected clients.
    pub fn broadcast(&self, bytes: Vec<u8>) {
        // Error just means nobody is connected right now.
        let _ = self.tx.send(bytes);
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Serve one client until it disconnects. Sends the current
    /// brightness immediately so new clients can calibrate.
    pub async fn handle_socket(&self, socket: WebSocket) {
        let (mut sink, mut stream) = socket.split();
        let mut rx = self.tx.subscribe();
        info!("ws client connected ({} total)", self.client_count());

        let hello =
            Packet::cmd(CMD_SET_BRIGHTNESS, &[self.brightness.load(Ordering::Relaxed)], 0).pack();
        if sink.send(Message::Binary(hello)).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                outbound = rx.recv() => match outbound {
                    Ok(bytes) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("ws client lagged, skipped {skipped} packets");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Binary(data))) => match Packet::unpack(&data) {
                        Ok(packet) => debug!("ws packet type {:#04x}", packet.ptype),
                        Err(e) => warn!("dropping malformed ws packet: {e}"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("ws receive error: {e}");
                        break;
                    }
                },
            }
        }
        info!("ws client disconnected");
    }
}
