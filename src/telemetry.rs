//! Debug telemetry for a host plotting tool.
//!
//! Inbound frames are always 7 bytes: `0x0A, index, f32 (LE), 0x0B`, each
//! one updating one of [`RX_VARS`] tunable variables. Outbound frames are
//! the marker `00 00 80 7F` followed by any number of little endian `f32`.

use core::fmt;

use crate::transport::RxSink;

pub const RX_HEAD: u8 = 0x0A;
pub const RX_TAIL: u8 = 0x0B;
pub const RX_FRAME_LEN: usize = 7;
/// Number of variables the host can write.
pub const RX_VARS: usize = 8;
pub const TX_MARKER: [u8; 4] = [0x00, 0x00, 0x80, 0x7F];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Inbound frame was not exactly [`RX_FRAME_LEN`] bytes.
    Length(usize),
    /// Head or tail byte did not match.
    Delimiter,
    /// Variable index out of range.
    Index(u8),
    /// Nothing to send.
    Empty,
    /// Output buffer cannot hold the encoded frame.
    BufferTooSmall { needed: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Length(len) => write!(f, "expected {RX_FRAME_LEN} bytes, got {len}"),
            FrameError::Delimiter => f.write_str("bad frame delimiter"),
            FrameError::Index(index) => write!(f, "variable index {index} out of range"),
            FrameError::Empty => f.write_str("no values to send"),
            FrameError::BufferTooSmall { needed } => {
                write!(f, "buffer too small, {needed} bytes needed")
            }
        }
    }
}

/// Variables written by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryVars {
    vars: [f32; RX_VARS],
}

impl TelemetryVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound frame. Returns the index of the updated variable.
    pub fn on_frame(&mut self, frame: &[u8]) -> Result<usize, FrameError> {
        let frame: &[u8; RX_FRAME_LEN] = frame
            .try_into()
            .map_err(|_| FrameError::Length(frame.len()))?;
        if frame[0] != RX_HEAD || frame[6] != RX_TAIL {
            return Err(FrameError::Delimiter);
        }
        let index = usize::from(frame[1]);
        if index >= RX_VARS {
            return Err(FrameError::Index(frame[1]));
        }

        self.vars[index] = f32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.vars.get(index).copied()
    }

    pub fn vars(&self) -> &[f32; RX_VARS] {
        &self.vars
    }
}

impl RxSink for TelemetryVars {
    fn on_data_received(&mut self, data: &[u8]) {
        if let Err(err) = self.on_frame(data) {
            log::debug!("dropped telemetry frame: {:?}", err);
        }
    }
}

/// Bytes needed to send `count` values.
pub const fn frame_len(count: usize) -> usize {
    TX_MARKER.len() + count * 4
}

/// Encode an outbound frame into `buf`, returning the number of bytes used.
pub fn encode_frame(values: &[f32], buf: &mut [u8]) -> Result<usize, FrameError> {
    if values.is_empty() {
        return Err(FrameError::Empty);
    }
    let needed = frame_len(values.len());
    let out = buf
        .get_mut(..needed)
        .ok_or(FrameError::BufferTooSmall { needed })?;

    let (marker, payload) = out.split_at_mut(TX_MARKER.len());
    marker.copy_from_slice(&TX_MARKER);
    for (chunk, value) in payload.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    Ok(needed)
}

/// Snapshot of the controller's internal state, in stream order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Telemetry {
    pub ud: f32,
    pub uq: f32,
    pub ua: f32,
    pub ub: f32,
    pub uc: f32,
    pub alpha: f32,
    pub beta: f32,
    pub angle_mechanical: f32,
    pub angle_electrical: f32,
}

impl Telemetry {
    pub const LEN: usize = 9;
    pub const NAMES: [&'static str; Self::LEN] = [
        "ud",
        "uq",
        "ua",
        "ub",
        "uc",
        "alpha",
        "beta",
        "angle_mechanical",
        "angle_electrical",
    ];

    pub fn to_array(&self) -> [f32; Self::LEN] {
        [
            self.ud,
            self.uq,
            self.ua,
            self.ub,
            self.uc,
            self.alpha,
            self.beta,
            self.angle_mechanical,
            self.angle_electrical,
        ]
    }

    /// Encode the snapshot as one outbound frame.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, FrameError> {
        encode_frame(&self.to_array(), buf)
    }
}
