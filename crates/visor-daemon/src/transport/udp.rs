//! UDP transport to the panel hardware, plus the receive task that
//! turns inbound packets into events.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::json;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use visor_engine::proto::{Packet, TYPE_BUTTON, TYPE_INFO};
use visor_engine::Event;

use crate::control::{Control, ControlSender};

/// Connected datagram socket toward the device.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub async fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect((host, port)).await?;
        info!("udp transport connected to {host}:{port}");
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Shared handle for the receive task.
    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    /// Fire-and-forget datagram send; failures are logged, never fatal.
    pub async fn send(&self, bytes: &[u8]) {
        if let Err(e) = self.socket.send(bytes).await {
            error!("udp send failed: {e}");
        }
    }
}

/// Receive loop: parse inbound packets, enqueue button presses as
/// events, track device-reported brightness, drop everything malformed.
pub fn spawn_receiver(
    socket: Arc<UdpSocket>,
    ctrl: ControlSender,
    brightness: Arc<AtomicU8>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            let n = match socket.recv(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    error!("udp receive failed: {e}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            let packet = match Packet::unpack(&buf[..n]) {
                Ok(p) => p,
                Err(e) => {
                    warn!("dropping malformed packet: {e}");
                    continue;
                }
            };

            match packet.ptype {
                TYPE_BUTTON => match packet.parse_button() {
                    Ok(button_id) => {
                        info!("button press {button_id}");
                        let event = Event::new("button", json!({ "button_id": button_id }));
                        if ctrl.send(Control::Event(event)).is_err() {
                            return; // loop task is gone, nothing to feed
                        }
                    }
                    Err(e) => warn!("dropping button packet: {e}"),
                },
                TYPE_INFO => match packet.parse_info() {
                    Ok((fw_ver, level)) => {
                        debug!("device info: fw={fw_ver:#06x} brightness={level}");
                        brightness.store(level, Ordering::Relaxed);
                    }
                    Err(e) => warn!("dropping info packet: {e}"),
                },
                other => debug!("ignoring packet type {other:#04x}"),
            }
        }
    })
}
