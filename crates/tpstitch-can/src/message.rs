use std::io::Write;

use serde::ser::SerializeStruct;

/// A fully reassembled ISO-TP message
///
/// [RawFrame](crate::RawFrame)s are restricted to 8 bytes, [CanMessage]s may be up to 4095 bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CanMessage {
    pub id: u16,
    pub data: Vec<u8>,
}

impl CanMessage {
    pub fn new(id: u16, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// Write the message as `ID: DATA` with uppercase hex and no separators
    ///
    /// ```text
    /// 7E8: 123456
    /// ```
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", self)
    }
}

impl std::fmt::Display for CanMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:X}: {}", self.id, hex::encode_upper(&self.data))
    }
}

impl serde::Serialize for CanMessage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CanMessage", 3)?;
        state.serialize_field("id", &format!("{:#X}", self.id))?;
        state.serialize_field("len", &self.data.len())?;
        state.serialize_field("data", &hex::encode_upper(&self.data))?;
        state.end()
    }
}
