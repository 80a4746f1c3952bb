//! ISO 15765-2 (ISO-TP) reassembly of CAN transport layer messages
//!
//! Raw frames go through [decode] to get classified by their PCI, and then through a
//! [Reassembler] that stitches Single, First, and Consecutive Frames back into whole
//! [CanMessage]s, tracking one in-flight message per CAN identifier.
mod frame;
mod message;
mod session;
mod transcript;

pub use frame::{
    CAN_MAX_DATA, CONSECUTIVE_FRAME_PAYLOAD, FIRST_FRAME_PAYLOAD, Frame, FrameKind, RawFrame,
    Unrecognized, decode,
};
pub use message::CanMessage;
pub use session::{ReassemblyError, Reassembler, Reassembly, Session, reassemble};
pub use transcript::{ParseError, TranscriptParser, parse_line};

#[cfg(test)]
#[ctor::ctor]
fn setup_test_logging() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .with_ansi(true)
        .init();
}
