//! Response serialization and partial-write-tolerant sending.
//!
//! Used by worker handlers for real responses and by listener error paths for
//! status-only replies. A send error abandons the connection (the peer is
//! assumed gone); bytes that did make it out are still accounted.

use crate::protocol::{self, StatusKind, WireMessage};
use crate::stats::Stats;
use std::io::{self, Write};
use std::net::TcpStream;
use tracing::debug;

/// Send a wire-order message: header first, then payload, each with a
/// retry-until-complete loop.
pub fn respond(stream: &mut TcpStream, stats: &Stats, msg: &WireMessage) {
    if let Err(e) = send_all(stream, msg.header_bytes(), stats) {
        debug!(error = %e, "send failed while writing header, abandoning connection");
        return;
    }

    if let Err(e) = send_all(stream, msg.payload(), stats) {
        debug!(error = %e, "send failed while writing payload, abandoning connection");
    }
}

/// Send a status-only response with an empty payload.
pub fn respond_error(stream: &mut TcpStream, stats: &Stats, status: StatusKind) {
    let msg = protocol::encode_response(status, Vec::new());
    respond(stream, stats, &msg);
}

/// Write all of `buf`, accounting every partial write before the next attempt.
fn send_all(stream: &mut TcpStream, buf: &[u8], stats: &Stats) -> io::Result<()> {
    let mut sent = 0;
    while sent < buf.len() {
        match stream.write(&buf[sent..]) {
            Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0")),
            Ok(n) => {
                sent += n;
                stats.add_sent(n);
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HEADER_SIZE, MAGIC_NUMBER};
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    /// Loopback socket pair for exercising the real send path.
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || TcpStream::connect(addr).unwrap());
        let (server_side, _) = listener.accept().unwrap();
        (server_side, client.join().unwrap())
    }

    #[test]
    fn test_respond_writes_header_and_payload() {
        let (mut server_side, mut client) = socket_pair();
        let stats = Stats::new();

        let msg = protocol::encode_response(StatusKind::Ok, b"3abbc".to_vec());
        respond(&mut server_side, &stats, &msg);
        drop(server_side);

        let mut received = Vec::new();
        client.read_to_end(&mut received).unwrap();

        assert_eq!(received.len(), HEADER_SIZE + 5);
        assert_eq!(&received[0..4], &MAGIC_NUMBER.to_be_bytes());
        assert_eq!(&received[4..6], &[0x00, 0x05]);
        assert_eq!(&received[6..8], &[0x00, 0x00]);
        assert_eq!(&received[8..], b"3abbc");

        assert_eq!(stats.snapshot().bytes_sent as usize, received.len());
    }

    #[test]
    fn test_respond_error_is_header_only() {
        let (mut server_side, mut client) = socket_pair();
        let stats = Stats::new();

        respond_error(&mut server_side, &stats, StatusKind::TooLarge);
        drop(server_side);

        let mut received = Vec::new();
        client.read_to_end(&mut received).unwrap();

        assert_eq!(received.len(), HEADER_SIZE);
        assert_eq!(&received[4..6], &[0x00, 0x00]);
        assert_eq!(&received[6..8], &[0x00, 0x02]);
        assert_eq!(stats.snapshot().bytes_sent as usize, HEADER_SIZE);
    }

    #[test]
    fn test_send_to_closed_peer_does_not_panic() {
        let (mut server_side, client) = socket_pair();
        let stats = Stats::new();
        drop(client);

        // First send may succeed into the socket buffer; keep sending until
        // the error path is taken. Either way this must not panic.
        for _ in 0..64 {
            respond_error(&mut server_side, &stats, StatusKind::UnknownError);
        }
    }
}
