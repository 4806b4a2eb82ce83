//! Packet serialization and deserialization
//!
//! Wire layout (all numbers big-endian):
//!
//! ```text
//! RRQ/WRQ | opcode | filename | 0 | mode | 0 |
//! DATA    | 3      | block#   | payload (0..512) |
//! ACK     | 4      | block#   |
//! ERROR   | 5      | code     | message | 0 |
//! ```

use std::fmt;

use super::error::{Error, Result};

/// Payload size of a full DATA block
pub const BLOCK_SIZE: usize = 512;

/// Largest datagram the client expects: a full DATA block plus its header
pub const MAX_PACKET_SIZE: usize = BLOCK_SIZE + 4;

/// Binary transfer mode, the only one the client requests
pub const OCTET: &str = "octet";

/// TFTP opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Rrq = 1,
    Wrq = 2,
    Data = 3,
    Ack = 4,
    Error = 5,
}

impl Opcode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Rrq),
            2 => Some(Self::Wrq),
            3 => Some(Self::Data),
            4 => Some(Self::Ack),
            5 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rrq => "RRQ",
            Self::Wrq => "WRQ",
            Self::Data => "DATA",
            Self::Ack => "ACK",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error codes defined by RFC 1350
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotDefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileExists = 6,
    NoSuchUser = 7,
}

impl ErrorCode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::NotDefined),
            1 => Some(Self::FileNotFound),
            2 => Some(Self::AccessViolation),
            3 => Some(Self::DiskFull),
            4 => Some(Self::IllegalOperation),
            5 => Some(Self::UnknownTransferId),
            6 => Some(Self::FileExists),
            7 => Some(Self::NoSuchUser),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Human-readable reason for the code
    pub fn reason(self) -> &'static str {
        match self {
            Self::NotDefined => "Not defined, see error message (if any).",
            Self::FileNotFound => "File not found.",
            Self::AccessViolation => "Access violation.",
            Self::DiskFull => "Disk full or allocation exceeded.",
            Self::IllegalOperation => "Illegal TFTP operation.",
            Self::UnknownTransferId => "Unknown transfer ID.",
            Self::FileExists => "File already exists.",
            Self::NoSuchUser => "No such user.",
        }
    }
}

/// Reason text for a raw error code, "Unknown error" outside 0..=7
pub fn describe(code: u16) -> &'static str {
    ErrorCode::from_u16(code)
        .map(ErrorCode::reason)
        .unwrap_or("Unknown error")
}

/// A single TFTP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq { filename: String, mode: String },
    Wrq { filename: String, mode: String },
    Data { block_num: u16, data: Vec<u8> },
    Ack(u16),
    Error { code: u16, msg: String },
}

impl Packet {
    pub fn opcode(&self) -> Opcode {
        match self {
            Packet::Rrq { .. } => Opcode::Rrq,
            Packet::Wrq { .. } => Opcode::Wrq,
            Packet::Data { .. } => Opcode::Data,
            Packet::Ack(_) => Opcode::Ack,
            Packet::Error { .. } => Opcode::Error,
        }
    }

    /// Encode the packet into its wire form
    pub fn serialize(&self) -> Result<Vec<u8>> {
        match self {
            Packet::Rrq { filename, mode } | Packet::Wrq { filename, mode } => {
                if filename.is_empty() {
                    return Err(Error::Encoding("filename is empty".into()));
                }
                check_field("filename", filename)?;
                check_field("mode", mode)?;

                let mut buf = Vec::with_capacity(4 + filename.len() + mode.len());
                buf.extend_from_slice(&self.opcode().as_u16().to_be_bytes());
                buf.extend_from_slice(filename.as_bytes());
                buf.push(0);
                buf.extend_from_slice(mode.as_bytes());
                buf.push(0);
                Ok(buf)
            }
            Packet::Data { block_num, data } => {
                if data.len() > BLOCK_SIZE {
                    return Err(Error::Encoding(format!(
                        "payload of {} bytes exceeds block size {}",
                        data.len(),
                        BLOCK_SIZE
                    )));
                }
                let mut buf = Vec::with_capacity(4 + data.len());
                buf.extend_from_slice(&Opcode::Data.as_u16().to_be_bytes());
                buf.extend_from_slice(&block_num.to_be_bytes());
                buf.extend_from_slice(data);
                Ok(buf)
            }
            Packet::Ack(block_num) => {
                let mut buf = Vec::with_capacity(4);
                buf.extend_from_slice(&Opcode::Ack.as_u16().to_be_bytes());
                buf.extend_from_slice(&block_num.to_be_bytes());
                Ok(buf)
            }
            Packet::Error { code, msg } => {
                check_field("error message", msg)?;
                let mut buf = Vec::with_capacity(5 + msg.len());
                buf.extend_from_slice(&Opcode::Error.as_u16().to_be_bytes());
                buf.extend_from_slice(&code.to_be_bytes());
                buf.extend_from_slice(msg.as_bytes());
                buf.push(0);
                Ok(buf)
            }
        }
    }

    /// Decode a received datagram
    pub fn deserialize(buf: &[u8]) -> Result<Packet> {
        if buf.len() < 4 {
            return Err(Error::Decoding(format!(
                "packet too short ({} bytes)",
                buf.len()
            )));
        }

        let raw = u16::from_be_bytes([buf[0], buf[1]]);
        let opcode =
            Opcode::from_u16(raw).ok_or_else(|| Error::Decoding(format!("unknown opcode {raw}")))?;
        let body = &buf[2..];

        match opcode {
            Opcode::Rrq | Opcode::Wrq => {
                let (filename, rest) = read_string(body, "filename")?;
                let (mode, _) = read_string(rest, "mode")?;
                if opcode == Opcode::Rrq {
                    Ok(Packet::Rrq { filename, mode })
                } else {
                    Ok(Packet::Wrq { filename, mode })
                }
            }
            Opcode::Data => {
                let data = &body[2..];
                if data.len() > BLOCK_SIZE {
                    return Err(Error::Decoding(format!(
                        "DATA payload of {} bytes exceeds block size",
                        data.len()
                    )));
                }
                Ok(Packet::Data {
                    block_num: u16::from_be_bytes([body[0], body[1]]),
                    data: data.to_vec(),
                })
            }
            Opcode::Ack => Ok(Packet::Ack(u16::from_be_bytes([body[0], body[1]]))),
            Opcode::Error => {
                let code = u16::from_be_bytes([body[0], body[1]]);
                let text = &body[2..];
                let end = text
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or_else(|| Error::Decoding("error message not terminated".into()))?;
                // Message text is not required to be UTF-8
                let msg = String::from_utf8_lossy(&text[..end]).into_owned();
                Ok(Packet::Error { code, msg })
            }
        }
    }
}

fn check_field(name: &str, value: &str) -> Result<()> {
    if value.as_bytes().contains(&0) {
        return Err(Error::Encoding(format!("{name} contains a NUL byte")));
    }
    Ok(())
}

/// Split a NUL-terminated string off the front of `buf`
fn read_string<'a>(buf: &'a [u8], name: &str) -> Result<(String, &'a [u8])> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::Decoding(format!("{name} not terminated")))?;
    let value = std::str::from_utf8(&buf[..end])
        .map_err(|e| Error::Decoding(format!("{name} is not valid UTF-8: {e}")))?;
    Ok((value.to_string(), &buf[end + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_conversion() {
        assert_eq!(Opcode::from_u16(1), Some(Opcode::Rrq));
        assert_eq!(Opcode::from_u16(5), Some(Opcode::Error));
        assert_eq!(Opcode::from_u16(6), None);
        assert_eq!(Opcode::Ack.as_u16(), 4);
        assert_eq!(Opcode::Data.to_string(), "DATA");
    }

    #[test]
    fn test_error_code_catalog() {
        assert_eq!(describe(0), "Not defined, see error message (if any).");
        assert_eq!(describe(1), "File not found.");
        assert_eq!(describe(3), "Disk full or allocation exceeded.");
        assert_eq!(describe(5), "Unknown transfer ID.");
        assert_eq!(describe(7), "No such user.");
        assert_eq!(describe(8), "Unknown error");
        assert_eq!(describe(u16::MAX), "Unknown error");
        assert_eq!(ErrorCode::from_u16(6), Some(ErrorCode::FileExists));
    }

    #[test]
    fn test_serialize_rrq() {
        let packet = Packet::Rrq {
            filename: "boot.img".into(),
            mode: OCTET.into(),
        };
        assert_eq!(
            packet.serialize().unwrap(),
            b"\x00\x01boot.img\x00octet\x00".to_vec()
        );
    }

    #[test]
    fn test_request_round_trip() {
        let cases = [("a", "octet"), ("dir/file.bin", "NetASCII"), ("ünïcode", "mail")];
        for (filename, mode) in cases {
            let rrq = Packet::Rrq {
                filename: filename.into(),
                mode: mode.into(),
            };
            let decoded = Packet::deserialize(&rrq.serialize().unwrap()).unwrap();
            assert_eq!(decoded, rrq);
            assert_eq!(decoded.opcode(), Opcode::Rrq);

            let wrq = Packet::Wrq {
                filename: filename.into(),
                mode: mode.into(),
            };
            let decoded = Packet::deserialize(&wrq.serialize().unwrap()).unwrap();
            assert_eq!(decoded, wrq);
            assert_eq!(decoded.opcode(), Opcode::Wrq);
        }
    }

    #[test]
    fn test_serialize_request_rejects_nul() {
        let packet = Packet::Rrq {
            filename: "bad\0name".into(),
            mode: OCTET.into(),
        };
        assert!(matches!(packet.serialize(), Err(Error::Encoding(_))));

        let packet = Packet::Wrq {
            filename: "name".into(),
            mode: "oc\0tet".into(),
        };
        assert!(matches!(packet.serialize(), Err(Error::Encoding(_))));

        let packet = Packet::Rrq {
            filename: String::new(),
            mode: OCTET.into(),
        };
        assert!(matches!(packet.serialize(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_serialize_ack() {
        assert_eq!(Packet::Ack(0x0102).serialize().unwrap(), vec![0, 4, 1, 2]);
    }

    #[test]
    fn test_data_round_trip() {
        for block_num in [0u16, 1, 255, 256, 65535] {
            for len in [0usize, 1, 511, 512] {
                let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
                let packet = Packet::Data { block_num, data };
                let bytes = packet.serialize().unwrap();
                assert_eq!(bytes.len(), 4 + len);
                assert_eq!(&bytes[2..4], &block_num.to_be_bytes());
                assert_eq!(Packet::deserialize(&bytes).unwrap(), packet);
            }
        }
    }

    #[test]
    fn test_serialize_data_rejects_oversized_payload() {
        let packet = Packet::Data {
            block_num: 1,
            data: vec![0; BLOCK_SIZE + 1],
        };
        assert!(matches!(packet.serialize(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_deserialize_error() {
        let packet = Packet::deserialize(b"\x00\x05\x00\x01File not found\x00").unwrap();
        assert_eq!(
            packet,
            Packet::Error {
                code: 1,
                msg: "File not found".into()
            }
        );

        let empty = Packet::deserialize(b"\x00\x05\x00\x00\x00").unwrap();
        assert_eq!(
            empty,
            Packet::Error {
                code: 0,
                msg: String::new()
            }
        );
    }

    #[test]
    fn test_deserialize_error_latin1_message() {
        let packet = Packet::deserialize(b"\x00\x05\x00\x01Datei nicht gefunden \xe4\x00").unwrap();
        match packet {
            Packet::Error { code, msg } => {
                assert_eq!(code, 1);
                assert_eq!(msg, "Datei nicht gefunden \u{FFFD}");
                assert_eq!(describe(code), "File not found.");
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_error_requires_terminator() {
        assert!(matches!(
            Packet::deserialize(b"\x00\x05\x00\x01oops"),
            Err(Error::Decoding(_))
        ));
        assert!(matches!(
            Packet::deserialize(b"\x00\x05\x00\x01"),
            Err(Error::Decoding(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_short_and_unknown() {
        assert!(matches!(Packet::deserialize(&[]), Err(Error::Decoding(_))));
        assert!(matches!(Packet::deserialize(&[0, 4, 0]), Err(Error::Decoding(_))));
        assert!(matches!(Packet::deserialize(&[0, 6, 0, 0]), Err(Error::Decoding(_))));
        assert!(matches!(Packet::deserialize(&[0, 0, 0, 1]), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_deserialize_rejects_oversized_data() {
        let mut buf = vec![0, 3, 0, 1];
        buf.extend(std::iter::repeat_n(7u8, BLOCK_SIZE + 1));
        assert!(matches!(Packet::deserialize(&buf), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_deserialize_unterminated_request() {
        assert!(matches!(
            Packet::deserialize(b"\x00\x01file\x00octet"),
            Err(Error::Decoding(_))
        ));
    }
}
