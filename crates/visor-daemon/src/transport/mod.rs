//! Outbound transport: packs pipeline output into protocol packets and
//! fans them out to the configured endpoints.

mod udp;
mod ws;

pub use udp::{spawn_receiver, UdpTransport};
pub use ws::WsHub;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use visor_engine::proto::{Packet, CMD_SET_BRIGHTNESS};

/// Default brightness before anything is configured or reported.
pub const DEFAULT_BRIGHTNESS: u8 = 150;

/// Packs each frame once and hands the same bytes to UDP and WS, so
/// per-stream ordering is the send order. Owns the sequence counters
/// and the brightness state.
pub struct Driver {
    udp: Option<UdpTransport>,
    ws: Option<WsHub>,
    seq: u16,
    led_seq: u16,
    brightness: Arc<AtomicU8>,
}

impl Driver {
    pub fn new(udp: Option<UdpTransport>, ws: Option<WsHub>, brightness: Arc<AtomicU8>) -> Self {
        Self {
            udp,
            ws,
            seq: 0,
            led_seq: 0,
            brightness,
        }
    }

    /// Send a full panel frame (RGB bytes, 128·32·3).
    pub async fn send_frame(&mut self, pixels: &[u8]) {
        let packet = Packet::frame(self.seq, pixels, self.seq, true);
        self.seq = self.seq.wrapping_add(1);
        self.dispatch(packet.pack()).await;
    }

    /// Send the LED strip pixels (RGB bytes, led_count·3).
    pub async fn send_strip(&mut self, pixels: &[u8]) {
        let packet = Packet::led_strip_frame(self.led_seq, pixels, self.led_seq, true);
        self.led_seq = self.led_seq.wrapping_add(1);
        self.dispatch(packet.pack()).await;
    }

    /// Store and transmit a new brightness level.
    pub async fn send_brightness(&mut self, level: u8) {
        self.brightness.store(level, Ordering::Relaxed);
        let packet = Packet::cmd(CMD_SET_BRIGHTNESS, &[level], self.seq);
        self.seq = self.seq.wrapping_add(1);
        self.dispatch(packet.pack()).await;
    }

    pub fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::Relaxed)
    }

    async fn dispatch(&self, bytes: Vec<u8>) {
        if let Some(udp) = &self.udp {
            udp.send(&bytes).await;
        }
        if let Some(ws) = &self.ws {
            ws.broadcast(bytes);
        }
    }
}
