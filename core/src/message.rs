//! Framed message codec (C1).
//!
//! Wire layout is a fixed 6-byte header followed by a type-dependent
//! payload:
//!
//! ```text
//! offset  0..2   CRC-16/CCITT-FALSE over the rest of the datagram with
//!                this field zeroed
//! offset  2..4   sequence number, big-endian, scoped per (Type, Subtype)
//! offset  4      Type
//! offset  5      Subtype
//! offset  6..    payload
//! ```
//!
//! `Ack` reuses the payload to carry the acked Type/Subtype/CRC at offsets
//! 6, 7 and 8..10 respectively (see [`Message::acked_full_type`]).

use byteorder::{BigEndian, ByteOrder};
use crc::{Crc, CRC_16_IBM_3740};

use crate::error::CodecError;

/// Type values `>= HIGH_PRIORITY_LIMIT` are low-priority: fire-and-forget,
/// never stored in a resend slot, never ACKed.
pub const HIGH_PRIORITY_LIMIT: u8 = 64;

/// Debug payloads longer than this are truncated before encoding.
pub const DEBUG_MAX_LEN: usize = 256;

const HEADER_LEN: usize = 6;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Named subtype constants lifted from the original `MessageSubtype`
/// namespace. The wire format treats subtypes as opaque `u8`s; these exist
/// so callers don't have to hand-roll the magic numbers.
pub mod well_known {
    pub const NONE: u8 = 0;
    pub const ENABLE_LED: u8 = 1;
    pub const ENABLE_VIDEO: u8 = 2;
    pub const ENABLE_AUDIO: u8 = 3;
    pub const VIDEO_SOURCE: u8 = 4;
    pub const CAMERA_XY: u8 = 5;
    pub const CAMERA_ZOOM: u8 = 6;
    pub const CAMERA_FOCUS: u8 = 7;
    pub const SPEED_TURN: u8 = 8;
    pub const BATTERY_CURRENT: u8 = 9;
    pub const BATTERY_VOLTAGE: u8 = 10;
    pub const DISTANCE: u8 = 11;
    pub const TEMPERATURE: u8 = 12;
    pub const SIGNAL_STRENGTH: u8 = 13;
    pub const CPU_USAGE: u8 = 14;
    pub const VIDEO_QUALITY: u8 = 15;
    pub const UPTIME: u8 = 16;
}

/// Human-readable name for a `well_known` subtype, mirroring the original's
/// `Message::getSubTypeStr`. Subtypes outside the `well_known` table (the
/// format is opaque to the codec) report as `"Unknown"`.
pub fn subtype_name(subtype: Subtype) -> &'static str {
    match subtype {
        well_known::NONE => "None",
        well_known::ENABLE_LED => "EnableLed",
        well_known::ENABLE_VIDEO => "EnableVideo",
        well_known::ENABLE_AUDIO => "EnableAudio",
        well_known::VIDEO_SOURCE => "VideoSource",
        well_known::CAMERA_XY => "CameraXY",
        well_known::CAMERA_ZOOM => "CameraZoom",
        well_known::CAMERA_FOCUS => "CameraFocus",
        well_known::SPEED_TURN => "SpeedTurn",
        well_known::BATTERY_CURRENT => "BatteryCurrent",
        well_known::BATTERY_VOLTAGE => "BatteryVoltage",
        well_known::DISTANCE => "Distance",
        well_known::TEMPERATURE => "Temperature",
        well_known::SIGNAL_STRENGTH => "SignalStrength",
        well_known::CPU_USAGE => "CpuUsage",
        well_known::VIDEO_QUALITY => "VideoQuality",
        well_known::UPTIME => "Uptime",
        _ => "Unknown",
    }
}

/// A datagram's subtype. Opaque to the codec; application-defined meaning.
pub type Subtype = u8;

/// `(Type, Subtype)` packed as `Type << 8 | Subtype`, the key resend slots,
/// sequence counters and resend timers are scoped by.
pub type FullType = u16;

#[inline]
pub fn full_type(message_type: u8, subtype: Subtype) -> FullType {
    (u16::from(message_type) << 8) | u16::from(subtype)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum MessageType {
    None = 0,
    Ping = 1,
    Value = 3,
    Stats = 65,
    Video = 66,
    Audio = 67,
    Debug = 68,
    PeriodicValue = 69,
    Ack = 255,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Result<MessageType, CodecError> {
        match value {
            0 => Ok(MessageType::None),
            1 => Ok(MessageType::Ping),
            3 => Ok(MessageType::Value),
            65 => Ok(MessageType::Stats),
            66 => Ok(MessageType::Video),
            67 => Ok(MessageType::Audio),
            68 => Ok(MessageType::Debug),
            69 => Ok(MessageType::PeriodicValue),
            255 => Ok(MessageType::Ack),
            other => Err(CodecError::UnknownType(other)),
        }
    }

    #[inline]
    pub fn is_high_priority(self) -> bool {
        (self as u8) < HIGH_PRIORITY_LIMIT
    }

    /// Minimum total datagram length (header + mandatory payload) for this type.
    fn min_length(self) -> usize {
        match self {
            MessageType::Ping | MessageType::None | MessageType::Stats => HEADER_LEN,
            MessageType::Video | MessageType::Audio | MessageType::Debug => HEADER_LEN,
            MessageType::Value | MessageType::PeriodicValue => HEADER_LEN + 2,
            MessageType::Ack => HEADER_LEN + 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::None => "None",
            MessageType::Ping => "Ping",
            MessageType::Value => "Value",
            MessageType::Stats => "Stats",
            MessageType::Video => "Video",
            MessageType::Audio => "Audio",
            MessageType::Debug => "Debug",
            MessageType::PeriodicValue => "PeriodicValue",
            MessageType::Ack => "Ack",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded (or about-to-be-encoded) datagram. Owns its wire bytes; all
/// accessors read directly out of the byte buffer rather than duplicating
/// state, mirroring the original `Message` class.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    /// Builds and encodes a new datagram. `seq` is supplied by the caller
    /// (the per-`FullType` counter lives on `Transport`, not here).
    pub fn encode(message_type: MessageType, subtype: Subtype, seq: u16, payload: &[u8]) -> Message {
        let mut bytes = vec![0u8; HEADER_LEN + payload.len()];
        BigEndian::write_u16(&mut bytes[2..4], seq);
        bytes[4] = message_type as u8;
        bytes[5] = subtype;
        bytes[HEADER_LEN..].copy_from_slice(payload);
        let crc = CRC16.checksum(&bytes);
        BigEndian::write_u16(&mut bytes[0..2], crc);
        Message { bytes }
    }

    /// Builds an ACK datagram for `incoming`, byte-copying its
    /// Type/Subtype/CRC into the acked-fields of the payload.
    pub fn encode_ack(seq: u16, incoming: &Message) -> Message {
        let mut payload = [0u8; 4];
        payload[0] = incoming.bytes[4];
        payload[1] = incoming.bytes[5];
        payload[2..4].copy_from_slice(&incoming.bytes[0..2]);
        Message::encode(MessageType::Ack, 0, seq, &payload)
    }

    /// Parses and validates `bytes` as a complete datagram.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Message, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::TooShort);
        }
        let message_type = MessageType::from_u8(bytes[4])?;
        if bytes.len() < message_type.min_length() {
            return Err(CodecError::TooShortForType);
        }
        let embedded_crc = BigEndian::read_u16(&bytes[0..2]);
        let mut zeroed = bytes.clone();
        zeroed[0] = 0;
        zeroed[1] = 0;
        if CRC16.checksum(&zeroed) != embedded_crc {
            return Err(CodecError::CrcMismatch);
        }
        Ok(Message { bytes })
    }

    #[inline]
    pub fn crc(&self) -> u16 {
        BigEndian::read_u16(&self.bytes[0..2])
    }

    #[inline]
    pub fn sequence(&self) -> u16 {
        BigEndian::read_u16(&self.bytes[2..4])
    }

    #[inline]
    pub fn type_byte(&self) -> u8 {
        self.bytes[4]
    }

    pub fn message_type(&self) -> Result<MessageType, CodecError> {
        MessageType::from_u8(self.bytes[4])
    }

    #[inline]
    pub fn subtype(&self) -> Subtype {
        self.bytes[5]
    }

    #[inline]
    pub fn full_type(&self) -> FullType {
        full_type(self.bytes[4], self.bytes[5])
    }

    #[inline]
    pub fn is_high_priority(&self) -> bool {
        self.bytes[4] < HIGH_PRIORITY_LIMIT
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    /// Reads the payload as a big-endian `u16` (`Value`/`PeriodicValue`).
    pub fn payload16(&self) -> u16 {
        BigEndian::read_u16(&self.bytes[HEADER_LEN..HEADER_LEN + 2])
    }

    /// `Ack`-only: the `FullType` the ACK is acknowledging.
    pub fn acked_full_type(&self) -> FullType {
        full_type(self.bytes[HEADER_LEN], self.bytes[HEADER_LEN + 1])
    }

    /// `Ack`-only: the CRC of the datagram being acknowledged.
    pub fn acked_crc(&self) -> u16 {
        BigEndian::read_u16(&self.bytes[HEADER_LEN + 2..HEADER_LEN + 4])
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_ping() {
        let msg = Message::encode(MessageType::Ping, 0, 7, &[]);
        let decoded = Message::from_bytes(msg.as_bytes().to_vec()).unwrap();
        assert_eq!(decoded.message_type().unwrap(), MessageType::Ping);
        assert_eq!(decoded.sequence(), 7);
        assert_eq!(decoded.payload().len(), 0);
    }

    #[test]
    fn round_trips_a_value() {
        let msg = Message::encode(MessageType::Value, well_known::SPEED_TURN, 1, &300u16.to_be_bytes());
        let decoded = Message::from_bytes(msg.into_bytes()).unwrap();
        assert_eq!(decoded.subtype(), well_known::SPEED_TURN);
        assert_eq!(decoded.payload16(), 300);
    }

    #[test]
    fn rejects_short_buffers() {
        assert_eq!(Message::from_bytes(vec![0u8; 3]), Err(CodecError::TooShort));
    }

    #[test]
    fn rejects_unknown_type() {
        let mut bytes = Message::encode(MessageType::Ping, 0, 0, &[]).into_bytes();
        bytes[4] = 200;
        let crc = CRC16.checksum(&{
            let mut z = bytes.clone();
            z[0] = 0;
            z[1] = 0;
            z
        });
        BigEndian::write_u16(&mut bytes[0..2], crc);
        assert_eq!(Message::from_bytes(bytes), Err(CodecError::UnknownType(200)));
    }

    #[test]
    fn rejects_too_short_for_declared_type() {
        // Value needs 8 bytes minimum but claims only the 6-byte header.
        let mut bytes = vec![0u8; 6];
        bytes[4] = MessageType::Value as u8;
        let crc = CRC16.checksum(&bytes);
        BigEndian::write_u16(&mut bytes[0..2], crc);
        assert_eq!(Message::from_bytes(bytes), Err(CodecError::TooShortForType));
    }

    #[test]
    fn detects_single_bit_flip() {
        let mut bytes = Message::encode(MessageType::Debug, 0, 0, b"hello").into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert_eq!(Message::from_bytes(bytes), Err(CodecError::CrcMismatch));
    }

    #[test]
    fn ack_copies_type_subtype_crc_byte_exact() {
        let original = Message::encode(MessageType::Video, 4, 12, &[1, 2, 3]);
        let ack = Message::encode_ack(0, &original);
        assert_eq!(ack.acked_full_type(), original.full_type());
        assert_eq!(ack.acked_crc(), original.crc());
    }

    #[test]
    fn zero_byte_video_payload_is_legal() {
        let msg = Message::encode(MessageType::Video, 0, 0, &[]);
        assert!(Message::from_bytes(msg.into_bytes()).is_ok());
    }

    #[test]
    fn sequence_numbers_are_independent_per_full_type() {
        let a = full_type(MessageType::Value as u8, 1);
        let b = full_type(MessageType::Value as u8, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn subtype_name_covers_the_well_known_table() {
        assert_eq!(subtype_name(well_known::BATTERY_VOLTAGE), "BatteryVoltage");
        assert_eq!(subtype_name(well_known::SPEED_TURN), "SpeedTurn");
        assert_eq!(subtype_name(200), "Unknown");
    }
}
