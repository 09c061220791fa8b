//! Wire protocol: framed packets with a CRC8-protected header and
//! RLE-compressed RGB payloads.
//!
//! Header layout (9 bytes, little-endian):
//! `SYNC(u16) | VER(u8) | TYPE(u8) | LEN(u16) | SEQ(u16) | CRC8(u8)`
//! where CRC8 (SMBus, polynomial 0x07, init 0x00) covers the preceding
//! eight bytes.

use thiserror::Error;

pub const SYNC: u16 = 0xAA55;
pub const PROTOCOL_VERSION: u8 = 0x04;

pub const TYPE_CMD: u8 = 0x01;
pub const TYPE_FRAME: u8 = 0x02;
pub const TYPE_INFO: u8 = 0x03;
pub const TYPE_LED_STRIP_FRAME: u8 = 0x05;
pub const TYPE_BUTTON: u8 = 0x06;

/// Frame payload flag bit 0: pixels are RLE-compressed.
pub const FRAME_FLAG_COMPRESSED: u8 = 1 << 0;

/// CMD id: set panel brightness (one u8 argument).
pub const CMD_SET_BRIGHTNESS: u8 = 0x01;

pub const HEADER_SIZE: usize = 9;

/// Matrix panel geometry carried by FRAME packets.
pub const MATRIX_WIDTH: usize = 128;
pub const MATRIX_HEIGHT: usize = 32;
pub const MATRIX_PIXELS: usize = MATRIX_WIDTH * MATRIX_HEIGHT;

/// Longest run or literal group one control byte can encode.
const RLE_MAX_GROUP: usize = 128;

/// Shortest repetition worth emitting as a run (a run of 2 is 4 bytes
/// against 7 as literals).
const RLE_MIN_RUN: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("data too short for header ({0} bytes)")]
    TooShortForHeader(usize),
    #[error("header CRC8 mismatch: got {got:#04x}, calculated {calc:#04x}")]
    CrcMismatch { got: u8, calc: u8 },
    #[error("bad SYNC: {0:#06x}")]
    BadSync(u16),
    #[error("data too short for full packet: header says {expected} payload bytes, {got} present")]
    TooShortForPayload { expected: usize, got: usize },
    #[error("{0} payload too short")]
    PayloadTooShort(&'static str),
}

/// CRC-8, SMBus variant: polynomial 0x07, init 0x00, no reflection.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Length of the identical-pixel run starting at `i`, capped at the
/// group limit.
fn run_length(pixels: &[[u8; 3]], i: usize) -> usize {
    let first = pixels[i];
    let mut len = 1;
    while i + len < pixels.len() && len < RLE_MAX_GROUP && pixels[i + len] == first {
        len += 1;
    }
    len
}

/// RLE-compress RGB pixel triples. Control byte: bit 7 set = run of
/// `(len−1)+1` repeats of the following triple; clear = that many raw
/// triples follow. Buffers that are not a whole number of triples pass
/// through unchanged.
pub fn rle_encode(pixels: &[u8]) -> Vec<u8> {
    if pixels.is_empty() || pixels.len() % 3 != 0 {
        return pixels.to_vec();
    }

    let triples: &[[u8; 3]] = bytemuck::cast_slice(pixels);
    let mut out = Vec::with_capacity(pixels.len() / 2);
    let mut i = 0;

    while i < triples.len() {
        let run = run_length(triples, i);
        if run >= RLE_MIN_RUN {
            out.push(0x80 | (run - 1) as u8);
            out.extend_from_slice(&triples[i]);
            i += run;
            continue;
        }

        // Collect literals until the next worthwhile run begins.
        let literal_start = i;
        let mut literal_count = 0;
        while i < triples.len() && literal_count < RLE_MAX_GROUP {
            if literal_count > 0 && run_length(triples, i) >= RLE_MIN_RUN {
                break;
            }
            literal_count += 1;
            i += 1;
        }
        out.push((literal_count - 1) as u8);
        for px in &triples[literal_start..literal_start + literal_count] {
            out.extend_from_slice(px);
        }
    }
    out
}

/// Decode RLE data until `expected_pixels` triples are produced or the
/// input runs out. Truncated groups end decoding early.
pub fn rle_decode(data: &[u8], expected_pixels: usize) -> Vec<u8> {
    let expected_bytes = expected_pixels * 3;
    let mut out = Vec::with_capacity(expected_bytes);
    let mut offset = 0;

    while offset < data.len() && out.len() < expected_bytes {
        let control = data[offset];
        offset += 1;
        let count = usize::from(control & 0x7F) + 1;

        if control & 0x80 != 0 {
            if offset + 3 > data.len() {
                break;
            }
            let px = [data[offset], data[offset + 1], data[offset + 2]];
            offset += 3;
            for _ in 0..count {
                if out.len() >= expected_bytes {
                    break;
                }
                out.extend_from_slice(&px);
            }
        } else {
            let literal_bytes = count * 3;
            if offset + literal_bytes > data.len() {
                break;
            }
            let wanted = literal_bytes.min(expected_bytes - out.len());
            out.extend_from_slice(&data[offset..offset + wanted]);
            offset += literal_bytes;
        }
    }
    out
}

/// A protocol packet: type, sequence number, payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub ptype: u8,
    pub version: u8,
    pub seq: u16,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(ptype: u8, seq: u16, payload: Vec<u8>) -> Self {
        Self {
            ptype,
            version: PROTOCOL_VERSION,
            seq,
            payload,
        }
    }

    /// CMD packet: `cmd_id` followed by its arguments.
    pub fn cmd(cmd_id: u8, args: &[u8], seq: u16) -> Self {
        let mut payload = Vec::with_capacity(1 + args.len());
        payload.push(cmd_id);
        payload.extend_from_slice(args);
        Self::new(TYPE_CMD, seq, payload)
    }

    /// FRAME packet for the full panel. Compression is kept only when
    /// it actually shrinks the pixels.
    pub fn frame(frame_id: u16, pixels: &[u8], seq: u16, compress: bool) -> Self {
        Self::pixel_packet(TYPE_FRAME, frame_id, pixels, seq, compress)
    }

    /// LED_STRIP_FRAME packet; same layout as FRAME with arbitrary
    /// pixel count.
    pub fn led_strip_frame(frame_id: u16, pixels: &[u8], seq: u16, compress: bool) -> Self {
        Self::pixel_packet(TYPE_LED_STRIP_FRAME, frame_id, pixels, seq, compress)
    }

    fn pixel_packet(ptype: u8, frame_id: u16, pixels: &[u8], seq: u16, compress: bool) -> Self {
        let mut flags = 0u8;
        let mut pixel_data = pixels;
        let compressed;
        if compress {
            compressed = rle_encode(pixels);
            if compressed.len() < pixels.len() {
                pixel_data = &compressed;
                flags |= FRAME_FLAG_COMPRESSED;
            }
        }

        let mut payload = Vec::with_capacity(3 + pixel_data.len());
        payload.extend_from_slice(&frame_id.to_le_bytes());
        payload.push(flags);
        payload.extend_from_slice(pixel_data);
        Self::new(ptype, seq, payload)
    }

    /// INFO packet (device→host): firmware version and brightness.
    pub fn info(fw_ver: u16, brightness: u8, seq: u16) -> Self {
        let mut payload = Vec::with_capacity(3);
        payload.extend_from_slice(&fw_ver.to_le_bytes());
        payload.push(brightness);
        Self::new(TYPE_INFO, seq, payload)
    }

    /// BUTTON packet (device→host).
    pub fn button(button_id: u8, seq: u16) -> Self {
        Self::new(TYPE_BUTTON, seq, vec![button_id])
    }

    /// Serialize: header (with computed CRC8) then payload.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&SYNC.to_le_bytes());
        out.push(self.version);
        out.push(self.ptype);
        out.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.seq.to_le_bytes());
        out.push(crc8(&out[..HEADER_SIZE - 1]));
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse raw bytes. The header CRC is checked before anything else
    /// is trusted; trailing bytes beyond the declared length are
    /// ignored.
    pub fn unpack(data: &[u8]) -> Result<Self, ProtoError> {
        if data.len() < HEADER_SIZE {
            return Err(ProtoError::TooShortForHeader(data.len()));
        }

        let got = data[HEADER_SIZE - 1];
        let calc = crc8(&data[..HEADER_SIZE - 1]);
        if got != calc {
            return Err(ProtoError::CrcMismatch { got, calc });
        }

        let sync = u16::from_le_bytes([data[0], data[1]]);
        if sync != SYNC {
            return Err(ProtoError::BadSync(sync));
        }

        let version = data[2];
        let ptype = data[3];
        let len = usize::from(u16::from_le_bytes([data[4], data[5]]));
        let seq = u16::from_le_bytes([data[6], data[7]]);

        if data.len() < HEADER_SIZE + len {
            return Err(ProtoError::TooShortForPayload {
                expected: len,
                got: data.len() - HEADER_SIZE,
            });
        }

        Ok(Self {
            ptype,
            version,
            seq,
            payload: data[HEADER_SIZE..HEADER_SIZE + len].to_vec(),
        })
    }

    /// CMD payload: `(cmd_id, args)`.
    pub fn parse_cmd(&self) -> Result<(u8, &[u8]), ProtoError> {
        match self.payload.split_first() {
            Some((&id, args)) => Ok((id, args)),
            None => Err(ProtoError::PayloadTooShort("cmd")),
        }
    }

    /// FRAME/LED_STRIP_FRAME payload: `(frame_id, flags, pixels)`,
    /// decompressed when the flag is set.
    pub fn parse_frame(&self, expected_pixels: usize) -> Result<(u16, u8, Vec<u8>), ProtoError> {
        if self.payload.len() < 3 {
            return Err(ProtoError::PayloadTooShort("frame"));
        }
        let frame_id = u16::from_le_bytes([self.payload[0], self.payload[1]]);
        let flags = self.payload[2];
        let pixel_data = &self.payload[3..];
        let pixels = if flags & FRAME_FLAG_COMPRESSED != 0 {
            rle_decode(pixel_data, expected_pixels)
        } else {
            pixel_data.to_vec()
        };
        Ok((frame_id, flags, pixels))
    }

    /// INFO payload: `(fw_ver, brightness)`.
    pub fn parse_info(&self) -> Result<(u16, u8), ProtoError> {
        if self.payload.len() < 3 {
            return Err(ProtoError::PayloadTooShort("info"));
        }
        Ok((
            u16::from_le_bytes([self.payload[0], self.payload[1]]),
            self.payload[2],
        ))
    }

    /// BUTTON payload: the button id.
    pub fn parse_button(&self) -> Result<u8, ProtoError> {
        self.payload
            .first()
            .copied()
            .ok_or(ProtoError::PayloadTooShort("button"))
    }
}
