//! TFTP (Trivial File Transfer Protocol) client
//!
//! Implements the client side of [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350)
//! in binary (octet) mode, without option extensions.
//!
//! ## Module Structure
//!
//! ```text
//! tftp/
//! ├── core/           # Core protocol implementation
//! │   ├── packet      # Packet serialization/deserialization
//! │   ├── socket      # Transport abstraction layer
//! │   └── error       # Error kinds
//! │
//! └── client/         # TFTP client
//!     ├── client      # get/put state machine
//!     ├── session     # Per-transfer state
//!     └── config      # Client configuration
//! ```
//!
//! ## Usage Examples
//!
//! ### Download a file
//!
//! ```rust,no_run
//! use xtftp::tftp::client::{self, ClientConfig, Operation};
//!
//! let config = ClientConfig::default();
//! client::run("192.168.1.100", Operation::Get, "pxelinux.0", None, config).unwrap();
//! ```

// Submodules
pub mod client;
pub mod core;
