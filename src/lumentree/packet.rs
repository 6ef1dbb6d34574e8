use crate::prelude::*;

/// Device address + read-holding-registers function code, the fixed header of
/// every read command and the prefix every valid response echoes back.
const FRAME_PREFIX: &str = "0103";

/// "++++" in ASCII; the transport injects this as a keepalive/separator and
/// anything before it (inclusive) is noise.
const KEEPALIVE_MARKER: &str = "2b2b2b2b";

/// Responses shorter than this many hex characters are battery-cell frames.
/// Length classification is a heuristic tied to the two request shapes we
/// send (95 registers for device info, 50 for battery cells); there is no
/// request/response correlation on the wire to do better.
const BATTERY_FRAME_MAX_HEX_LEN: usize = 300;

/// CRC-16/MODBUS: seed 0xFFFF, reflected polynomial 0xA001, low byte first.
pub fn checksum(data: &[u8]) -> [u8; 2] {
    crc16::State::<crc16::MODBUS>::calculate(data).to_le_bytes()
}

/// An outbound read-holding-registers request. Always serializes to 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCommand {
    pub start: u16,
    pub count: u16,
}

impl ReadCommand {
    pub fn new(start: u16, count: u16) -> Self {
        Self { start, count }
    }

    /// The full device telemetry block.
    pub fn device_info() -> Self {
        Self::new(0, 95)
    }

    /// The per-cell battery voltage block.
    pub fn battery_cells() -> Self {
        Self::new(250, 50)
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = 0x01;
        out[1] = 0x03;
        out[2..4].copy_from_slice(&self.start.to_be_bytes());
        out[4..6].copy_from_slice(&self.count.to_be_bytes());
        let crc = checksum(&out[..6]);
        out[6..8].copy_from_slice(&crc);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    DeviceTelemetry,
    BatteryCells,
}

impl FrameKind {
    fn classify(hex_len: usize) -> Self {
        if hex_len < BATTERY_FRAME_MAX_HEX_LEN {
            Self::BatteryCells
        } else {
            Self::DeviceTelemetry
        }
    }
}

/// A candidate response frame, held as a lowercase hex string after transport
/// noise has been stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    hex: String,
    kind: FrameKind,
}

impl Frame {
    /// Recover a frame from a raw transport payload. Returns None when no
    /// valid frame is present; that is routine (keepalives, error echoes)
    /// and never fatal.
    pub fn extract(payload: &[u8]) -> Option<Self> {
        Self::from_hex(&hex::encode(payload))
    }

    /// As `extract`, but starting from an already hex-rendered payload.
    /// Upstream payloads may mix case, so comparison is done lowercased.
    pub fn from_hex(payload: &str) -> Option<Self> {
        let payload = payload.to_ascii_lowercase();

        let candidate = match payload.find(KEEPALIVE_MARKER) {
            Some(at) => &payload[at + KEEPALIVE_MARKER.len()..],
            None => payload.as_str(),
        };

        if !candidate.starts_with(FRAME_PREFIX) {
            debug!("no frame in payload: {}", payload);
            return None;
        }

        Some(Self {
            kind: FrameKind::classify(candidate.len()),
            hex: candidate.to_owned(),
        })
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Split the frame's data section into the ordered register table.
    ///
    /// Byte 3 of the frame declares the data length in bytes; the data
    /// section follows the 3-byte header. A declared length running past the
    /// end of the frame is clamped, and a trailing partial cell is dropped.
    pub fn registers(&self) -> RegisterTable {
        let declared = match self.hex.get(4..6).and_then(|s| u8::from_str_radix(s, 16).ok()) {
            Some(len) => usize::from(len) * 2,
            None => return RegisterTable::default(),
        };

        let end = usize::min(6 + declared, self.hex.len());
        let data = self.hex.get(6..end).unwrap_or_default();

        RegisterTable::from_hex(data)
    }
}

/// The ordered sequence of 16-bit register cells decoded from one response.
/// Cells keep their raw 4-char hex form so text registers (the model name)
/// can be reassembled verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterTable {
    cells: Vec<String>,
}

impl RegisterTable {
    pub fn from_hex(data: &str) -> Self {
        let cells = data
            .as_bytes()
            .chunks_exact(4)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();

        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The raw 4-char hex cell at `index`, if the table reaches that far.
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// The register at `index` as an unsigned value. None both when the
    /// table is too short and when the cell is not parsable hex; either way
    /// the field is simply absent.
    pub fn value(&self, index: usize) -> Option<u16> {
        self.cells
            .get(index)
            .and_then(|cell| u16::from_str_radix(cell, 16).ok())
    }

    /// The register at `index` as a signed 16-bit two's-complement value:
    /// raw values above 32767 come out as `raw - 65536`.
    pub fn signed(&self, index: usize) -> Option<i32> {
        self.value(index).map(|v| i32::from(v as i16))
    }
}
