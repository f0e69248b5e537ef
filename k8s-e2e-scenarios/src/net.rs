use std::io;
use std::net::{IpAddr, UdpSocket};

/// Discover the caller's outbound IPv4 address.
///
/// Connecting a UDP socket only selects a route; no datagram is sent. The
/// resulting local address is the one a single-node cluster on this host
/// reports as its node internal IP.
pub fn local_ipv4() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}
