use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

/// Datagram transport used by the transfer state machine
///
/// The client never creates sockets itself; anything that can send a
/// datagram to an endpoint and wait a bounded time for one can drive it.
pub trait Transport {
    /// Send `buf` as one datagram to `addr`
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> io::Result<()>;

    /// Wait up to `timeout` for one datagram
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>>;
}

impl Transport for UdpSocket {
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> io::Result<()> {
        let sent = UdpSocket::send_to(self, buf, addr)?;
        if sent != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, buf.len()),
            ));
        }
        Ok(())
    }

    fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        // A zero read timeout is rejected by the OS
        self.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        match UdpSocket::recv_from(self, buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Bind an unconnected UDP socket on an ephemeral port matching the family of `server`
pub fn bind_for(server: SocketAddr) -> io::Result<UdpSocket> {
    let local = if server.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };
    UdpSocket::bind(local)
}
