use std::fmt;
use std::net::SocketAddr;

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => f.write_str("download"),
            Direction::Upload => f.write_str("upload"),
        }
    }
}

/// State of one get/put invocation
///
/// The server answers a request from a fresh port (its transfer ID), so the
/// session records the endpoint of the first reply and talks only to it from
/// then on.
#[derive(Debug)]
pub struct TransferSession {
    pub direction: Direction,
    pub filename: String,
    /// Block expected (download) or last sent (upload)
    pub block: u16,
    /// Set once the short final block has been seen
    pub terminal: bool,
    /// Where the request was sent
    pub server: SocketAddr,
    /// Endpoint of the first reply
    pub peer: Option<SocketAddr>,
}

impl TransferSession {
    pub fn new(direction: Direction, filename: impl Into<String>, server: SocketAddr) -> Self {
        Self {
            direction,
            filename: filename.into(),
            block: match direction {
                Direction::Download => 1,
                Direction::Upload => 0,
            },
            terminal: false,
            server,
            peer: None,
        }
    }

    /// Address for outgoing packets
    pub fn destination(&self) -> SocketAddr {
        self.peer.unwrap_or(self.server)
    }

    /// Check a reply's source, locking onto it if it is the first one
    ///
    /// Returns false for a datagram from a foreign endpoint.
    pub fn accept_from(&mut self, from: SocketAddr) -> bool {
        match self.peer {
            Some(peer) => peer == from,
            None => {
                if from != self.server {
                    log::debug!("Server replied from {}, locking on", from);
                }
                self.peer = Some(from);
                true
            }
        }
    }

    pub fn advance(&mut self) {
        self.block = self.block.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_initial_block() {
        let server = addr("10.0.0.1:69");
        assert_eq!(
            TransferSession::new(Direction::Download, "f", server).block,
            1
        );
        assert_eq!(
            TransferSession::new(Direction::Upload, "f", server).block,
            0
        );
    }

    #[test]
    fn test_locks_onto_first_reply() {
        let mut session = TransferSession::new(Direction::Download, "f", addr("10.0.0.1:69"));
        assert_eq!(session.destination(), addr("10.0.0.1:69"));

        assert!(session.accept_from(addr("10.0.0.1:50123")));
        assert_eq!(session.destination(), addr("10.0.0.1:50123"));

        assert!(session.accept_from(addr("10.0.0.1:50123")));
        assert!(!session.accept_from(addr("10.0.0.1:69")));
        assert!(!session.accept_from(addr("10.0.0.2:50123")));
        assert_eq!(session.destination(), addr("10.0.0.1:50123"));
    }

    #[test]
    fn test_block_wraps() {
        let mut session = TransferSession::new(Direction::Upload, "f", addr("10.0.0.1:69"));
        session.block = u16::MAX;
        session.advance();
        assert_eq!(session.block, 0);
    }
}
