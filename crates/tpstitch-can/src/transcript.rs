//! Utilities for parsing hex transcripts of CAN frames
//!
//! Each line holds one frame: three hex digits of identifier followed by up to eight hex-encoded
//! data bytes.
//!
//! ```text
//! 7E803123456
//! 1FF1008112233445566
//! 1FF 21 77 88 99
//! ```
use std::io::{BufRead, Lines};

use eyre::WrapErr;

use crate::RawFrame;
use crate::frame::CAN_MAX_DATA;

/// Number of hex digits in the identifier prefix
const ID_DIGITS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line:?} is too short to hold a 3 digit identifier")]
    TooShort { line: String },
    #[error("invalid hex digit {character:?} at position {position}")]
    InvalidHex { character: char, position: usize },
}

impl From<hex::FromHexError> for ParseError {
    fn from(e: hex::FromHexError) -> Self {
        match e {
            hex::FromHexError::InvalidHexCharacter { c, index } => ParseError::InvalidHex {
                character: c,
                position: ID_DIGITS + index,
            },
            // Only even-length runs of ASCII digits are ever handed to hex::decode
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                unreachable!("hex::decode given a malformed slice: {e}")
            }
        }
    }
}

fn hex_digit(character: char, position: usize) -> Result<u16, ParseError> {
    character
        .to_digit(16)
        .map(|d| d as u16)
        .ok_or(ParseError::InvalidHex {
            character,
            position,
        })
}

/// Parse a single transcript line into a [RawFrame]
///
/// ASCII whitespace is ignored everywhere in the line. Data is consumed two digits at a time,
/// stopping after [CAN_MAX_DATA] bytes. A trailing unpaired digit is ignored.
pub fn parse_line(line: &str) -> Result<RawFrame, ParseError> {
    let digits: Vec<char> = line.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if digits.len() < ID_DIGITS {
        return Err(ParseError::TooShort {
            line: line.to_string(),
        });
    }

    let mut id: u16 = 0;
    for (position, character) in digits[..ID_DIGITS].iter().enumerate() {
        id = (id << 4) | hex_digit(*character, position)?;
    }

    let data = &digits[ID_DIGITS..];
    let pairs = (data.len() / 2).min(CAN_MAX_DATA);
    let data = &data[..pairs * 2];
    if let Some(position) = data.iter().position(|c| !c.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidHex {
            character: data[position],
            position: ID_DIGITS + position,
        });
    }
    let data: String = data.iter().collect();
    let data = hex::decode(data)?;

    Ok(RawFrame::new(id, &data))
}

/// Parse [RawFrame]s from the given reader
///
/// Blank lines are skipped. There will be one Item for each remaining line; a line that fails to
/// parse yields an error, but doesn't end the iterator.
pub struct TranscriptParser<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> TranscriptParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for TranscriptParser<R> {
    type Item = eyre::Result<RawFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(e).wrap_err(format!(
                        "Failed to read line {}",
                        self.line_number
                    )));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                parse_line(&line).wrap_err(format!("Failed to parse line {}", self.line_number)),
            );
        }
    }
}
