use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::config::ClientConfig;
use super::session::{Direction, TransferSession};
use crate::tftp::core::{BLOCK_SIZE, Error, ErrorCode, MAX_PACKET_SIZE, Packet, Result, Transport};

/// Counters reported when a transfer finishes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    /// Payload bytes moved
    pub bytes: u64,
    /// DATA blocks accepted (download) or acknowledged (upload)
    pub blocks: u64,
    /// Packets sent again after a timeout or a mismatched ACK
    pub retransmits: u32,
}

/// TFTP client
///
/// Supports file upload (PUT) and download (GET) operations over any
/// [`Transport`]. One request is in flight at a time.
///
/// # Example
///
/// ```rust,no_run
/// use xtftp::tftp::client::{Client, ClientConfig};
/// use std::net::UdpSocket;
///
/// let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
/// let server = "192.168.1.100:69".parse().unwrap();
/// let mut client = Client::new(socket, server, ClientConfig::default());
///
/// // Download file
/// let mut content = Vec::new();
/// client.get("remote.txt", &mut content).unwrap();
///
/// // Upload file
/// client.put(&mut &content[..], "copy.txt").unwrap();
/// ```
pub struct Client<T: Transport> {
    transport: T,
    server: SocketAddr,
    config: ClientConfig,
}

impl<T: Transport> Client<T> {
    /// Create a client that sends requests to `server`
    pub fn new(transport: T, server: SocketAddr, config: ClientConfig) -> Self {
        Self {
            transport,
            server,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Give back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Download a file from the server (RRQ - Read Request)
    ///
    /// # Arguments
    ///
    /// * `remote_file` - File name on the server
    /// * `sink` - Receives the file content block by block
    pub fn get<W: Write + ?Sized>(
        &mut self,
        remote_file: &str,
        sink: &mut W,
    ) -> Result<TransferSummary> {
        log::info!("Downloading {} from {}", remote_file, self.server);

        let mut session = TransferSession::new(Direction::Download, remote_file, self.server);
        let mut summary = TransferSummary::default();

        let rrq = Packet::Rrq {
            filename: remote_file.to_string(),
            mode: self.config.mode.clone(),
        };
        let request = self.send(&rrq, session.destination())?;
        let mut last = Outstanding::new(request, self.config.timeout);

        while !session.terminal {
            match self.await_reply(&mut session, &mut last, &mut summary)? {
                Packet::Data { block_num, data } if block_num == session.block => {
                    sink.write_all(&data)?;
                    summary.bytes += data.len() as u64;
                    summary.blocks += 1;

                    let ack = self.send(&Packet::Ack(block_num), session.destination())?;
                    last = Outstanding::new(ack, self.config.timeout);
                    log::debug!("Block {} received ({} bytes)", block_num, data.len());

                    // If data is less than block size, transfer is complete
                    if data.len() < BLOCK_SIZE {
                        session.terminal = true;
                    } else {
                        session.advance();
                    }
                }
                Packet::Data { block_num, .. } => {
                    let behind = session.block.wrapping_sub(block_num);
                    if behind < 0x8000 {
                        log::warn!(
                            "Received duplicate block {}, expected {}; acknowledging again",
                            block_num,
                            session.block
                        );
                        self.send(&Packet::Ack(block_num), session.destination())?;
                    } else {
                        log::warn!(
                            "Received block {} ahead of expected {}; ignoring",
                            block_num,
                            session.block
                        );
                    }
                }
                Packet::Error { code, msg } => return Err(Error::remote(code, msg)),
                other => {
                    return Err(Error::ProtocolViolation(format!(
                        "unexpected {} packet during download",
                        other.opcode()
                    )));
                }
            }
        }

        sink.flush()?;
        log::info!(
            "Download complete: {} ({} bytes in {} blocks)",
            remote_file,
            summary.bytes,
            summary.blocks
        );
        Ok(summary)
    }

    /// Upload a file to the server (WRQ - Write Request)
    ///
    /// # Arguments
    ///
    /// * `source` - File content, read in 512-byte chunks
    /// * `remote_file` - File name on the server
    pub fn put<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        remote_file: &str,
    ) -> Result<TransferSummary> {
        log::info!("Uploading {} to {}", remote_file, self.server);

        let mut session = TransferSession::new(Direction::Upload, remote_file, self.server);
        let mut summary = TransferSummary::default();

        let wrq = Packet::Wrq {
            filename: remote_file.to_string(),
            mode: self.config.mode.clone(),
        };
        let request = self.send(&wrq, session.destination())?;
        let mut last = Outstanding::new(request, self.config.timeout);
        let mut mismatches: u32 = 0;
        let mut sending = false;

        // session.block is the last block sent; the WRQ is answered by ACK 0
        loop {
            match self.await_reply(&mut session, &mut last, &mut summary)? {
                Packet::Ack(ack_block) if ack_block == session.block => {
                    log::debug!("Received ACK for block {}", ack_block);
                    if sending {
                        summary.blocks += 1;
                    }
                    if session.terminal {
                        break;
                    }

                    let chunk = read_block(source)?;
                    session.advance();
                    if chunk.len() < BLOCK_SIZE {
                        session.terminal = true;
                    }
                    summary.bytes += chunk.len() as u64;

                    let data = Packet::Data {
                        block_num: session.block,
                        data: chunk,
                    };
                    let bytes = self.send(&data, session.destination())?;
                    last = Outstanding::new(bytes, self.config.timeout);
                    sending = true;
                    mismatches = 0;
                }
                Packet::Ack(ack_block) if ack_block == session.block.wrapping_sub(1) => {
                    // Duplicate ACK, never resend (Sorcerer's Apprentice)
                    log::debug!("Ignoring duplicate ACK for block {}", ack_block);
                }
                Packet::Ack(ack_block) => {
                    if mismatches >= self.config.retries {
                        return Err(Error::ProtocolViolation(format!(
                            "ACK for block {} does not match block {}",
                            ack_block, session.block
                        )));
                    }
                    mismatches += 1;
                    summary.retransmits += 1;
                    log::warn!(
                        "Received ACK for block {}, expected {}; resending",
                        ack_block,
                        session.block
                    );
                    self.transport.send_to(&last.bytes, session.destination())?;
                }
                Packet::Error { code, msg } => return Err(Error::remote(code, msg)),
                other => {
                    return Err(Error::ProtocolViolation(format!(
                        "unexpected {} packet during upload",
                        other.opcode()
                    )));
                }
            }
        }

        log::info!(
            "Upload complete: {} ({} bytes in {} blocks)",
            remote_file,
            summary.bytes,
            summary.blocks
        );
        Ok(summary)
    }

    /// Encode and send a packet, returning the bytes for retransmission
    fn send(&mut self, packet: &Packet, to: SocketAddr) -> Result<Vec<u8>> {
        let bytes = packet.serialize()?;
        self.transport.send_to(&bytes, to)?;
        Ok(bytes)
    }

    /// Wait for the next packet from the session's peer
    ///
    /// Stray and duplicate datagrams do not extend `last.deadline`; it is only
    /// renewed when `last` is sent again, until the retry budget is spent.
    fn await_reply(
        &mut self,
        session: &mut TransferSession,
        last: &mut Outstanding,
        summary: &mut TransferSummary,
    ) -> Result<Packet> {
        // One spare byte so an oversized datagram fails to decode instead of being truncated
        let mut buf = [0u8; MAX_PACKET_SIZE + 1];

        loop {
            let remaining = last.deadline.saturating_duration_since(Instant::now());
            let received = if remaining.is_zero() {
                None
            } else {
                self.transport.recv_from(&mut buf, remaining)?
            };

            let Some((amt, from)) = received else {
                if last.attempts >= self.config.retries {
                    return Err(Error::Timeout {
                        attempts: last.attempts + 1,
                        timeout: self.config.timeout,
                    });
                }
                last.attempts += 1;
                summary.retransmits += 1;
                log::warn!(
                    "No response within {:?} during {} of {}, retransmitting ({}/{})",
                    self.config.timeout,
                    session.direction,
                    session.filename,
                    last.attempts,
                    self.config.retries
                );
                self.transport.send_to(&last.bytes, session.destination())?;
                last.deadline = Instant::now() + self.config.timeout;
                continue;
            };

            if !session.accept_from(from) {
                log::warn!("Ignoring packet from unknown endpoint {}", from);
                self.reject(from);
                continue;
            }

            return Packet::deserialize(&buf[..amt]);
        }
    }

    /// Tell a stray sender it is not part of this transfer
    fn reject(&mut self, to: SocketAddr) {
        let code = ErrorCode::UnknownTransferId;
        let packet = Packet::Error {
            code: code.as_u16(),
            msg: code.reason().to_string(),
        };
        let sent = packet
            .serialize()
            .and_then(|bytes| self.transport.send_to(&bytes, to).map_err(Error::from));
        if let Err(e) = sent {
            log::debug!("Failed to reject {}: {}", to, e);
        }
    }
}

/// Last packet sent, kept for retransmission
struct Outstanding {
    bytes: Vec<u8>,
    /// When the current wait for its reply ends
    deadline: Instant,
    /// Retransmissions so far
    attempts: u32,
}

impl Outstanding {
    fn new(bytes: Vec<u8>, timeout: Duration) -> Self {
        Self {
            bytes,
            deadline: Instant::now() + timeout,
            attempts: 0,
        }
    }
}

/// Read up to one block from the source; short only at end of input
fn read_block<R: Read + ?Sized>(source: &mut R) -> Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(BLOCK_SIZE);
    source.take(BLOCK_SIZE as u64).read_to_end(&mut chunk)?;
    Ok(chunk)
}
