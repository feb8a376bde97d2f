use tracing::{debug, warn};

pub const ACK: u8 = 0x06;
pub const TERMINATOR: u8 = 0x0a;
/// Largest chunk taken from the transport in one read.
pub const FRAME_BUFFER_SIZE: usize = 1024;

/// Structural view of a projector reply: `<ack> <unit id:2> <command id:2> ... 0A`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub ack: bool,
    pub unit_id: Option<String>,
    pub command_id: Option<String>,
    pub terminated: bool,
}

impl ResponseFrame {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let last = *bytes.last()?;

        let unit_id = bytes.get(1..3).map(hex::encode_upper);
        let command_id = bytes
            .get(3..5)
            .map(|id| String::from_utf8_lossy(id).trim().to_string());

        Some(Self {
            ack: bytes[0] == ACK,
            unit_id,
            command_id,
            terminated: last == TERMINATOR,
        })
    }

    /// Emits the decomposition of `bytes` to the log.
    pub(crate) fn trace(bytes: &[u8]) -> Option<Self> {
        let frame = match Self::parse(bytes) {
            Some(frame) => frame,
            None => {
                debug!("received an empty response");
                return None;
            }
        };

        debug!(raw = %hex::encode_upper(bytes), "received raw response");
        if frame.ack {
            debug!("ACK: command accepted");
        } else {
            debug!("NAK: command not acknowledged");
        }
        if let Some(unit_id) = &frame.unit_id {
            debug!(%unit_id, "unit id");
        }
        if let Some(command_id) = &frame.command_id {
            debug!(%command_id, "command id");
        }
        if !frame.terminated {
            warn!("expected newline at end of response");
        }

        Some(frame)
    }
}

/// Splits transport reads into frames.
///
/// One read is one frame unless it holds a terminator followed by more bytes,
/// in which case the remainder is held back for the next frame.
#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// A complete frame left over from an earlier read, if any.
    pub fn next_buffered(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|b| *b == TERMINATOR)?;
        Some(self.pending.drain(..=end).collect())
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(chunk);
        match self.next_buffered() {
            Some(frame) => frame,
            None => std::mem::take(&mut self.pending),
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
