use std::collections::HashMap;

use crate::frame::{CONSECUTIVE_FRAME_PAYLOAD, FIRST_FRAME_PAYLOAD, Unrecognized};
use crate::{CanMessage, Frame, FrameKind, RawFrame, decode};

/// Protocol violations detected while reassembling messages
///
/// None of these are fatal. The offending frame is dropped (and for [ReassemblyError::MessageReset]
/// the in-flight session too), and reassembly carries on with the next frame.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReassemblyError {
    /// A Single Frame arrived while a multi-frame message was in flight
    #[error("{id:#X}: Message reset!")]
    MessageReset { id: u16 },
    /// A Consecutive Frame arrived without a preceding First Frame
    #[error("{id:#X}: Invalid CF Frame!")]
    UnexpectedConsecutiveFrame { id: u16 },
    #[error("{id:#X}: invalid CF frame sequence (expected {expected:#X}, got {actual:#X})")]
    SequenceMismatch { id: u16, expected: u8, actual: u8 },
    #[error("{id:#X}: Unknown frame type ({cause})")]
    UnknownFrameType { id: u16, cause: Unrecognized },
}

impl ReassemblyError {
    /// The CAN identifier of the frame that caused the error
    #[must_use]
    pub fn id(&self) -> u16 {
        match self {
            ReassemblyError::MessageReset { id }
            | ReassemblyError::UnexpectedConsecutiveFrame { id }
            | ReassemblyError::SequenceMismatch { id, .. }
            | ReassemblyError::UnknownFrameType { id, .. } => *id,
        }
    }
}

/// An in-flight multi-frame message for one CAN identifier
///
/// Created by a First Frame, extended by each in-sequence Consecutive Frame, and dropped once the
/// announced length has been received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    id: u16,
    buffer: Vec<u8>,
    total_length: u16,
    expected_sequence: u8,
}

impl Session {
    fn start(id: u16, total_length: u16, payload: &[u8]) -> Self {
        let copy_len = FIRST_FRAME_PAYLOAD
            .min(total_length as usize)
            .min(payload.len());
        let mut buffer = Vec::with_capacity(total_length as usize);
        buffer.extend_from_slice(&payload[..copy_len]);
        Self {
            id,
            buffer,
            total_length,
            // Consecutive Frame sequence numbers start at 1; the First Frame is implicitly 0
            expected_sequence: 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// The bytes received so far
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    #[must_use]
    pub fn received(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    #[must_use]
    pub fn total_length(&self) -> usize {
        self.total_length as usize
    }

    /// The sequence number the next Consecutive Frame must carry
    #[inline]
    #[must_use]
    pub fn expected_sequence(&self) -> u8 {
        self.expected_sequence
    }

    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.received() >= self.total_length()
    }

    fn remaining(&self) -> usize {
        self.total_length().saturating_sub(self.received())
    }

    /// Append a Consecutive Frame's payload, truncating anything past the announced length
    fn extend(&mut self, payload: &[u8]) {
        let copy_len = CONSECUTIVE_FRAME_PAYLOAD
            .min(self.remaining())
            .min(payload.len());
        self.buffer.extend_from_slice(&payload[..copy_len]);
        self.expected_sequence = (self.expected_sequence + 1) & 0x0F;
    }

    fn into_message(self) -> CanMessage {
        CanMessage::new(self.id, self.buffer)
    }
}

/// ISO 15765-2 reassembly for any number of CAN identifiers
///
/// Each identifier gets at most one in-flight [Session]. Sessions for different identifiers never
/// interact.
#[derive(Debug, Default)]
pub struct Reassembler {
    sessions: HashMap<u16, Session>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the in-flight session for the given identifier, if there is one
    #[must_use]
    pub fn session(&self, id: u16) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// The identifiers with an in-flight session, in ascending order
    #[must_use]
    pub fn in_flight(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Apply one decoded frame
    ///
    /// Returns `Ok(Some(msg))` when the frame finishes a message, `Ok(None)` when there's nothing
    /// to report yet, and `Err(e)` on a protocol violation.
    pub fn handle_frame(&mut self, frame: Frame) -> Result<Option<CanMessage>, ReassemblyError> {
        let id = frame.id;
        match frame.kind {
            FrameKind::Empty => Ok(None),
            FrameKind::Single { payload } => self.handle_single_frame(id, payload),
            FrameKind::First { length, payload } => Ok(self.handle_first_frame(id, length, payload)),
            FrameKind::Consecutive { sequence, payload } => {
                self.handle_consecutive_frame(id, sequence, &payload)
            }
            FrameKind::FlowControl {
                flow_status,
                block_size,
                separation_time,
            } => {
                tracing::trace!(
                    "Ignoring FC frame. id: {id:#X} status: {flow_status:#X} bs: {block_size} st: {separation_time:#X}"
                );
                Ok(None)
            }
            FrameKind::Unknown(cause) => Err(ReassemblyError::UnknownFrameType { id, cause }),
        }
    }

    /// Decode and apply one raw frame
    pub fn handle_raw_frame(
        &mut self,
        raw: &RawFrame,
    ) -> Result<Option<CanMessage>, ReassemblyError> {
        self.handle_frame(decode(raw))
    }

    fn handle_single_frame(
        &mut self,
        id: u16,
        payload: Vec<u8>,
    ) -> Result<Option<CanMessage>, ReassemblyError> {
        if let Some(session) = self.sessions.remove(&id) {
            tracing::debug!(
                "Aborting session on SF. id: {id:#X} len: {}/{}",
                session.received(),
                session.total_length()
            );
            return Err(ReassemblyError::MessageReset { id });
        }
        Ok(Some(CanMessage::new(id, payload)))
    }

    fn handle_first_frame(&mut self, id: u16, length: u16, payload: Vec<u8>) -> Option<CanMessage> {
        let session = Session::start(id, length, &payload);
        tracing::debug!(
            "Start session. id: {id:#X} len: {}/{}",
            session.received(),
            session.total_length()
        );
        if let Some(old) = self.sessions.remove(&id) {
            tracing::debug!(
                "FF replaced in-flight session. id: {id:#X} len: {}/{}",
                old.received(),
                old.total_length()
            );
        }

        if session.is_complete() {
            tracing::debug!("Finished session on FF. id: {id:#X} len: {}", session.received());
            return Some(session.into_message());
        }
        self.sessions.insert(id, session);
        None
    }

    fn handle_consecutive_frame(
        &mut self,
        id: u16,
        sequence: u8,
        payload: &[u8],
    ) -> Result<Option<CanMessage>, ReassemblyError> {
        let Some(session) = self.sessions.get_mut(&id) else {
            return Err(ReassemblyError::UnexpectedConsecutiveFrame { id });
        };
        let expected = session.expected_sequence();
        if sequence != expected {
            return Err(ReassemblyError::SequenceMismatch {
                id,
                expected,
                actual: sequence,
            });
        }

        session.extend(payload);
        tracing::trace!(
            "Received CF. id: {id:#X} seq: {sequence:#X} len: {}/{}",
            session.received(),
            session.total_length()
        );
        if !session.is_complete() {
            return Ok(None);
        }

        let Some(session) = self.sessions.remove(&id) else {
            unreachable!("Session {id:#X} was just updated");
        };
        tracing::debug!("Finished session. id: {id:#X} len: {}", session.received());
        Ok(Some(session.into_message()))
    }
}

/// Reassemble ISO-TP messages from a stream of [RawFrame]s
///
/// Frames that don't finish a message are consumed silently. Protocol violations are yielded as
/// errors, and don't stop the stream.
pub fn reassemble<I: Iterator<Item = RawFrame>>(frames: I) -> Reassembly<I> {
    Reassembly {
        frames,
        reassembler: Reassembler::new(),
    }
}

pub struct Reassembly<I: Iterator<Item = RawFrame>> {
    frames: I,
    reassembler: Reassembler,
}

impl<I: Iterator<Item = RawFrame>> Reassembly<I> {
    /// The underlying [Reassembler], to peek at in-flight sessions
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }
}

impl<I: Iterator<Item = RawFrame>> Iterator for Reassembly<I> {
    type Item = Result<CanMessage, ReassemblyError>;

    fn next(&mut self) -> Option<Self::Item> {
        for raw in self.frames.by_ref() {
            match self.reassembler.handle_raw_frame(&raw) {
                Ok(None) => continue,
                Ok(Some(msg)) => return Some(Ok(msg)),
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

impl<I: Iterator<Item = RawFrame>> Drop for Reassembly<I> {
    fn drop(&mut self) {
        let in_flight = self.reassembler.in_flight();
        if !in_flight.is_empty() {
            tracing::warn!("Reassembly ended with still-active sessions: {in_flight:X?}");
        }
    }
}
