//! TFTP core protocol implementation
//!
//! This module contains the core components of the TFTP protocol:
//! - `packet`: Packet serialization and deserialization
//! - `socket`: Transport abstraction and its UDP implementation
//! - `error`: Error kinds shared by the codec and the client

mod error;
mod packet;
mod socket;

// Public core types
pub use error::{Error, Result};
pub use packet::{BLOCK_SIZE, ErrorCode, MAX_PACKET_SIZE, OCTET, Opcode, Packet, describe};
pub use socket::{Transport, bind_for};
