//! Byte layouts of the parameter transfer protocol.
//!
//! Every request is a fixed 13-byte frame:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 1    | message type |
//! | 1      | 4    | parameter id (big-endian) |
//! | 5      | 8    | payload |
//!
//! Read and write replies are 8 bytes. Integers and booleans occupy the first
//! 4 bytes in big-endian order; doubles use all 8 bytes in native byte order
//! and are never swapped.
//!
//! Enumeration replies start with a big-endian entry count followed by
//! fixed-size entry records (see [`EntryRecord`]).

use bytes::{Buf, BufMut, BytesMut};
use tracing::warn;

use crate::parameter::{ParameterDescriptor, ParameterId, ParameterType, ParameterValue};

/// Protocol version this client speaks.
pub const PROTOCOL_VERSION: u32 = 5;

/// Default TCP port of the parameter service.
pub const DEFAULT_PORT: u16 = 7683;

/// Size of every request frame.
pub const REQUEST_FRAME_LEN: usize = 13;

/// Size of a read or write reply.
pub const REPLY_LEN: usize = 8;

/// Size of the version word sent by the device after connecting.
pub const HANDSHAKE_LEN: usize = 4;

/// Size of the entry count preceding the enumeration records.
pub const ENTRY_COUNT_LEN: usize = 4;

/// Size of one enumeration record: id, type and flags words plus four
/// 8-byte value slots.
pub const ENTRY_RECORD_LEN: usize = 3 * 4 + 4 * VALUE_SLOT_LEN;

/// Default capacity of the enumeration receive buffer.
pub const DEFAULT_RECEIVE_BUFFER_CAPACITY: usize = 16 * 1024;

const VALUE_SLOT_LEN: usize = 8;

/// Flag bit marking a parameter as writable.
pub const FLAG_WRITABLE: u32 = 0x1;

/// Request message type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Read an integer parameter.
    ReadInt = 0x01,
    /// Read a double parameter.
    ReadDouble = 0x02,
    /// Read a boolean parameter.
    ReadBool = 0x03,
    /// Write an integer parameter.
    WriteInt = 0x04,
    /// Write a double parameter.
    WriteDouble = 0x05,
    /// Write a boolean parameter.
    WriteBool = 0x06,
    /// Request the full parameter list.
    Enumerate = 0x07,
}

impl MessageType {
    /// Decode a message type byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(MessageType::ReadInt),
            0x02 => Some(MessageType::ReadDouble),
            0x03 => Some(MessageType::ReadBool),
            0x04 => Some(MessageType::WriteInt),
            0x05 => Some(MessageType::WriteDouble),
            0x06 => Some(MessageType::WriteBool),
            0x07 => Some(MessageType::Enumerate),
            _ => None,
        }
    }

    /// The read request for parameters of type `ty`.
    pub fn read_for(ty: ParameterType) -> Self {
        match ty {
            ParameterType::Int => MessageType::ReadInt,
            ParameterType::Double => MessageType::ReadDouble,
            ParameterType::Bool => MessageType::ReadBool,
        }
    }

    /// The write request for parameters of type `ty`.
    pub fn write_for(ty: ParameterType) -> Self {
        match ty {
            ParameterType::Int => MessageType::WriteInt,
            ParameterType::Double => MessageType::WriteDouble,
            ParameterType::Bool => MessageType::WriteBool,
        }
    }

    /// The value type a read or write message carries, `None` for
    /// enumeration.
    pub fn value_type(self) -> Option<ParameterType> {
        match self {
            MessageType::ReadInt | MessageType::WriteInt => Some(ParameterType::Int),
            MessageType::ReadDouble | MessageType::WriteDouble => Some(ParameterType::Double),
            MessageType::ReadBool | MessageType::WriteBool => Some(ParameterType::Bool),
            MessageType::Enumerate => None,
        }
    }

    /// Whether this is a write request.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            MessageType::WriteInt | MessageType::WriteDouble | MessageType::WriteBool
        )
    }
}

// =============================================================================
// Value slots
// =============================================================================

/// Encode `value` into an 8-byte slot.
pub fn encode_value(value: ParameterValue) -> [u8; VALUE_SLOT_LEN] {
    let mut slot = BytesMut::with_capacity(VALUE_SLOT_LEN);
    match value {
        ParameterValue::Int(v) => {
            slot.put_i32(v);
            slot.put_bytes(0, 4);
        }
        ParameterValue::Bool(v) => {
            slot.put_u32(u32::from(v));
            slot.put_bytes(0, 4);
        }
        ParameterValue::Double(v) => slot.put_f64_ne(v),
    }
    let mut out = [0u8; VALUE_SLOT_LEN];
    out.copy_from_slice(&slot);
    out
}

/// Decode an 8-byte slot as type `ty`.
pub fn decode_value(slot: &[u8; VALUE_SLOT_LEN], ty: ParameterType) -> ParameterValue {
    let mut cur = &slot[..];
    match ty {
        ParameterType::Int => ParameterValue::Int(cur.get_i32()),
        ParameterType::Bool => ParameterValue::Bool(cur.get_u32() != 0),
        ParameterType::Double => ParameterValue::Double(cur.get_f64_ne()),
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A 13-byte request frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestFrame {
    /// Message type.
    pub message_type: MessageType,
    /// Raw parameter id, zero for enumeration.
    pub parameter_id: u32,
    /// Value slot, all zero for reads and enumeration.
    pub payload: [u8; VALUE_SLOT_LEN],
}

impl RequestFrame {
    /// Read the parameter `id` as wire type `ty`.
    pub fn read(id: ParameterId, ty: ParameterType) -> Self {
        Self {
            message_type: MessageType::read_for(ty),
            parameter_id: id.raw(),
            payload: [0; VALUE_SLOT_LEN],
        }
    }

    /// Write `value` to parameter `id`; the message type follows the
    /// value's tag.
    pub fn write(id: ParameterId, value: ParameterValue) -> Self {
        Self {
            message_type: MessageType::write_for(value.ty()),
            parameter_id: id.raw(),
            payload: encode_value(value),
        }
    }

    /// Request the full parameter list.
    pub fn enumerate() -> Self {
        Self {
            message_type: MessageType::Enumerate,
            parameter_id: 0,
            payload: [0; VALUE_SLOT_LEN],
        }
    }

    /// Serialize into the on-wire representation.
    pub fn encode(&self) -> [u8; REQUEST_FRAME_LEN] {
        let mut buf = BytesMut::with_capacity(REQUEST_FRAME_LEN);
        buf.put_u8(self.message_type as u8);
        buf.put_u32(self.parameter_id);
        buf.put_slice(&self.payload);

        let mut out = [0u8; REQUEST_FRAME_LEN];
        out.copy_from_slice(&buf);
        out
    }

    /// Parse a frame, as a device would.
    pub fn decode(data: &[u8]) -> Result<Self, String> {
        if data.len() < REQUEST_FRAME_LEN {
            return Err(format!(
                "Insufficient data for request frame: {} of {} bytes",
                data.len(),
                REQUEST_FRAME_LEN
            ));
        }

        let mut cur = &data[..REQUEST_FRAME_LEN];
        let code = cur.get_u8();
        let message_type =
            MessageType::from_u8(code).ok_or_else(|| format!("Invalid message type {code:#04x}"))?;
        let parameter_id = cur.get_u32();
        let mut payload = [0u8; VALUE_SLOT_LEN];
        cur.copy_to_slice(&mut payload);

        Ok(Self {
            message_type,
            parameter_id,
            payload,
        })
    }

    /// The written value for write frames.
    pub fn value(&self) -> Option<ParameterValue> {
        if !self.message_type.is_write() {
            return None;
        }
        self.message_type
            .value_type()
            .map(|ty| decode_value(&self.payload, ty))
    }
}

// =============================================================================
// Replies
// =============================================================================

/// Decode the reply to a read request of type `ty`.
pub fn decode_read_reply(reply: &[u8; REPLY_LEN], ty: ParameterType) -> ParameterValue {
    decode_value(reply, ty)
}

/// Encode the reply to a read request.
pub fn encode_read_reply(value: ParameterValue) -> [u8; REPLY_LEN] {
    encode_value(value)
}

/// Whether a write reply reports success. Any nonzero status counts.
pub fn write_succeeded(reply: &[u8; REPLY_LEN]) -> bool {
    let mut cur = &reply[..];
    cur.get_u32() != 0
}

/// Encode a write status reply.
pub fn encode_write_status(status: u32) -> [u8; REPLY_LEN] {
    let mut buf = BytesMut::with_capacity(REPLY_LEN);
    buf.put_u32(status);
    buf.put_bytes(0, REPLY_LEN - 4);
    let mut out = [0u8; REPLY_LEN];
    out.copy_from_slice(&buf);
    out
}

/// Decode the version word sent by the device after connecting.
pub fn decode_u32(word: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*word)
}

// =============================================================================
// Enumeration
// =============================================================================

/// One fixed-size enumeration record as it appears on the wire.
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0      | 4    | parameter id (big-endian) |
/// | 4      | 4    | type code (big-endian, 0=int 1=bool 2=double) |
/// | 8      | 4    | flags (big-endian, bit 0 = writable) |
/// | 12     | 8    | value slot |
/// | 20     | 8    | minimum slot |
/// | 28     | 8    | maximum slot |
/// | 36     | 8    | increment slot |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryRecord {
    /// Raw parameter id.
    pub raw_id: u32,
    /// Raw type code.
    pub type_code: u32,
    /// Flag bits, see [`FLAG_WRITABLE`].
    pub flags: u32,
    /// Current value slot.
    pub value: [u8; VALUE_SLOT_LEN],
    /// Minimum slot.
    pub min: [u8; VALUE_SLOT_LEN],
    /// Maximum slot.
    pub max: [u8; VALUE_SLOT_LEN],
    /// Increment slot.
    pub increment: [u8; VALUE_SLOT_LEN],
}

impl EntryRecord {
    /// Build a record from typed values, as a device would.
    pub fn new(
        raw_id: u32,
        ty: ParameterType,
        writable: bool,
        value: ParameterValue,
        min: ParameterValue,
        max: ParameterValue,
        increment: ParameterValue,
    ) -> Self {
        Self {
            raw_id,
            type_code: ty.to_wire(),
            flags: if writable { FLAG_WRITABLE } else { 0 },
            value: encode_value(value.coerce(ty)),
            min: encode_value(min.coerce(ty)),
            max: encode_value(max.coerce(ty)),
            increment: encode_value(increment.coerce(ty)),
        }
    }

    /// Append the wire form to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u32(self.raw_id);
        buf.put_u32(self.type_code);
        buf.put_u32(self.flags);
        buf.put_slice(&self.value);
        buf.put_slice(&self.min);
        buf.put_slice(&self.max);
        buf.put_slice(&self.increment);
    }

    /// Parse one record. `data` must hold at least [`ENTRY_RECORD_LEN`] bytes.
    pub fn decode(data: &[u8]) -> Result<Self, String> {
        if data.len() < ENTRY_RECORD_LEN {
            return Err(format!(
                "Insufficient data for entry record: {} of {} bytes",
                data.len(),
                ENTRY_RECORD_LEN
            ));
        }
        let mut cur = &data[..ENTRY_RECORD_LEN];
        let raw_id = cur.get_u32();
        let type_code = cur.get_u32();
        let flags = cur.get_u32();
        let mut slots = [[0u8; VALUE_SLOT_LEN]; 4];
        for slot in &mut slots {
            cur.copy_to_slice(slot);
        }
        let [value, min, max, increment] = slots;
        Ok(Self {
            raw_id,
            type_code,
            flags,
            value,
            min,
            max,
            increment,
        })
    }

    /// Turn the record into a descriptor, or `None` if the id or type code is
    /// not known to this client.
    pub fn to_descriptor(&self) -> Option<ParameterDescriptor> {
        let id = ParameterId::from_raw(self.raw_id)?;
        let ty = ParameterType::from_wire(self.type_code)?;
        Some(ParameterDescriptor::new(
            id,
            ty,
            self.flags & FLAG_WRITABLE != 0,
            decode_value(&self.value, ty),
            decode_value(&self.min, ty),
            decode_value(&self.max, ty),
            decode_value(&self.increment, ty),
        ))
    }
}

/// Encode a complete enumeration reply: count followed by records.
pub fn encode_enumeration(records: &[EntryRecord]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(ENTRY_COUNT_LEN + records.len() * ENTRY_RECORD_LEN);
    buf.put_u32(records.len() as u32);
    for record in records {
        record.encode_into(&mut buf);
    }
    buf.to_vec()
}

/// Decode `count` records from `payload`, skipping any this client does not
/// recognise.
pub fn decode_entries(payload: &[u8], count: usize) -> Result<Vec<ParameterDescriptor>, String> {
    let needed = count
        .checked_mul(ENTRY_RECORD_LEN)
        .ok_or_else(|| format!("Entry count {count} overflows"))?;
    if payload.len() < needed {
        return Err(format!(
            "Enumeration payload truncated: {} of {} bytes",
            payload.len(),
            needed
        ));
    }

    let mut descriptors = Vec::with_capacity(count);
    for chunk in payload[..needed].chunks_exact(ENTRY_RECORD_LEN) {
        let record = EntryRecord::decode(chunk)?;
        match record.to_descriptor() {
            Some(descriptor) => descriptors.push(descriptor),
            None => warn!(
                raw_id = record.raw_id,
                type_code = record.type_code,
                "Skipping unrecognized parameter in enumeration"
            ),
        }
    }
    Ok(descriptors)
}
