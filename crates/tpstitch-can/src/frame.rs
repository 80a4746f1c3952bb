//! ISO 15765-2 frame classification
//!
//! Every ISO-TP frame starts with a Protocol Control Information (PCI) byte. The high nibble selects
//! the frame type, and the low nibble carries type-specific data.
//!
//! | PCI high nibble | Frame             | Low nibble          | Following bytes                 |
//! |-----------------|-------------------|---------------------|---------------------------------|
//! | `0x0`           | Single Frame      | payload length      | payload                         |
//! | `0x1`           | First Frame       | length bits 11..8   | length bits 7..0, then payload  |
//! | `0x2`           | Consecutive Frame | sequence number     | payload                         |
//! | `0x3`           | Flow Control      |                     | status, block size, STmin       |

/// Classic CAN frames carry at most 8 data bytes
pub const CAN_MAX_DATA: usize = 8;
/// Bytes of message data carried by a First Frame
pub const FIRST_FRAME_PAYLOAD: usize = CAN_MAX_DATA - 2;
/// Bytes of message data carried by a Consecutive Frame
pub const CONSECUTIVE_FRAME_PAYLOAD: usize = CAN_MAX_DATA - 1;

/// An undecoded CAN frame; an identifier and its data field
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub id: u16,
    data: Vec<u8>,
}

impl RawFrame {
    /// Create a new [RawFrame], keeping at most [CAN_MAX_DATA] bytes of `data`
    pub fn new(id: u16, data: &[u8]) -> Self {
        let len = data.len().min(CAN_MAX_DATA);
        Self {
            id,
            data: data[..len].to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A decoded ISO-TP frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub id: u16,
    pub kind: FrameKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// The frame had no data bytes at all
    Empty,
    /// A complete message that fits in one frame
    Single { payload: Vec<u8> },
    /// The start of a multi-frame message
    First {
        /// Total message length, including the bytes in this frame
        length: u16,
        payload: Vec<u8>,
    },
    /// A continuation of a multi-frame message
    Consecutive { sequence: u8, payload: Vec<u8> },
    /// Receiver to sender pacing. Recognized, but not acted on during reassembly
    FlowControl {
        flow_status: u8,
        block_size: u8,
        separation_time: u8,
    },
    /// The frame couldn't be classified
    Unknown(Unrecognized),
}

/// Why a frame was classified as [FrameKind::Unknown]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unrecognized {
    /// PCI high nibble outside of `0x0..=0x3`
    ReservedPci(u8),
    /// The Single Frame declared more payload than the frame carries
    SingleFrameOverrun { declared: usize, available: usize },
    /// The First Frame is missing its low length byte
    FirstFrameTruncated,
    /// The Flow Control frame is missing some of its three fields
    FlowControlTruncated { available: usize },
}

impl std::fmt::Display for Unrecognized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unrecognized::ReservedPci(nibble) => write!(f, "reserved PCI type {nibble:#X}"),
            Unrecognized::SingleFrameOverrun {
                declared,
                available,
            } => write!(
                f,
                "single frame declares {declared} bytes but carries {available}"
            ),
            Unrecognized::FirstFrameTruncated => write!(f, "first frame is missing its length"),
            Unrecognized::FlowControlTruncated { available } => {
                write!(f, "flow control frame carries {available}/3 fields")
            }
        }
    }
}

impl FrameKind {
    /// The number of message bytes announced by this frame
    ///
    /// For Single and First Frames, this is the length of the whole message. For Consecutive
    /// Frames, it's the length of this one segment.
    #[must_use]
    pub fn payload_length(&self) -> Option<usize> {
        match self {
            FrameKind::Single { payload } | FrameKind::Consecutive { payload, .. } => {
                Some(payload.len())
            }
            FrameKind::First { length, .. } => Some(*length as usize),
            _ => None,
        }
    }
}

/// Decode the PCI of the given [RawFrame]
///
/// This never fails; frames that can't be classified decode to [FrameKind::Unknown], and frames
/// with no data decode to [FrameKind::Empty].
pub fn decode(raw: &RawFrame) -> Frame {
    let id = raw.id;
    let data = raw.data();
    let Some(&pci) = data.first() else {
        return Frame {
            id,
            kind: FrameKind::Empty,
        };
    };

    let kind = match pci >> 4 {
        0x0 => {
            let declared = (pci & 0x0F) as usize;
            let available = data.len() - 1;
            if declared > available {
                tracing::error!("{id:#X}: Invalid frame data size");
                FrameKind::Unknown(Unrecognized::SingleFrameOverrun {
                    declared,
                    available,
                })
            } else {
                FrameKind::Single {
                    payload: data[1..=declared].to_vec(),
                }
            }
        }
        0x1 => match data.get(1) {
            Some(&low) => FrameKind::First {
                length: (((pci & 0x0F) as u16) << 8) | low as u16,
                payload: data[2..].to_vec(),
            },
            None => FrameKind::Unknown(Unrecognized::FirstFrameTruncated),
        },
        0x2 => FrameKind::Consecutive {
            sequence: pci & 0x0F,
            payload: data[1..].to_vec(),
        },
        0x3 => match data[1..] {
            [status, block_size, separation_time, ..] => FrameKind::FlowControl {
                flow_status: (status >> 5) & 0x07,
                block_size,
                separation_time,
            },
            _ => FrameKind::Unknown(Unrecognized::FlowControlTruncated {
                available: data.len() - 1,
            }),
        },
        nibble => FrameKind::Unknown(Unrecognized::ReservedPci(nibble)),
    };

    Frame { id, kind }
}
