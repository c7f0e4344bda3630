//! Listener pool: shared readiness multiplexer plus the per-connection
//! accept/read state machine.
//!
//! All listener threads share ONE [`Multiplexer`] behind a mutex. A thread
//! holds the lock across `poll()` and event dispatch, which is what makes
//! dispatch exclusive: a ready client socket is deregistered and pulled out of
//! the slab before the lock is released, so no other thread can be woken for
//! it. Framing reads then happen outside the lock on plain blocking sockets,
//! so a slow peer stalls only the thread that owns it while the remaining
//! listeners keep draining the poller.

use crate::protocol::{self, Header, Message, StatusKind, HEADER_SIZE, MAX_MESSAGE};
use crate::server::responder::respond_error;
use crate::server::{Job, Shared};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use slab::Slab;
use std::io::{self, Read};
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use tracing::{debug, trace, warn};

/// Token reserved for the listening socket; client tokens are slab keys.
const LISTENER_TOKEN: Token = Token(usize::MAX);

/// Maximum readiness events drained per poll call.
const MAX_EVENTS: usize = 10;

/// The shared readiness multiplexer: one poller, one listening socket, and
/// the client sockets currently waiting to become readable.
///
/// Client sockets are registered through [`SourceFd`] and stay in blocking
/// mode; the poller only decides *which* connection a listener thread picks
/// up, the framing reads themselves are ordinary blocking reads.
pub(crate) struct Multiplexer {
    poll: Poll,
    listener: TcpListener,
    clients: Slab<TcpStream>,
}

impl Multiplexer {
    /// Wrap an already-bound nonblocking listener and register it.
    pub(crate) fn new(listener: TcpListener) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry().register(
            &mut SourceFd(&listener.as_raw_fd()),
            LISTENER_TOKEN,
            Interest::READABLE,
        )?;

        Ok(Self {
            poll,
            listener,
            clients: Slab::new(),
        })
    }

    /// Block until readiness, then return every client socket this call took
    /// ownership of. New connections are accepted and registered in place.
    ///
    /// Must be called with exclusive access (the servicewide mutex); taken
    /// sockets are deregistered before this returns, so a concurrent caller
    /// can never be handed the same connection.
    fn wait(&mut self, events: &mut Events) -> io::Result<Vec<TcpStream>> {
        self.poll.poll(events, None)?;

        let mut ready = Vec::new();
        for event in events.iter() {
            match event.token() {
                LISTENER_TOKEN => self.accept_clients()?,
                Token(key) => {
                    if let Some(stream) = self.take_client(key) {
                        ready.push(stream);
                    }
                }
            }
        }

        Ok(ready)
    }

    /// Accept until the listener would block, registering each new socket.
    ///
    /// An accept failure is fatal to the calling listener thread; recovery
    /// from descriptor exhaustion is out of scope.
    fn accept_clients(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    // The listening socket is nonblocking; accepted sockets
                    // must block for the framing reads.
                    stream.set_nonblocking(false)?;

                    let fd = stream.as_raw_fd();
                    let entry = self.clients.vacant_entry();
                    let token = Token(entry.key());
                    self.poll
                        .registry()
                        .register(&mut SourceFd(&fd), token, Interest::READABLE)?;
                    entry.insert(stream);

                    debug!(peer = %peer_addr, token = token.0, "accepted connection");
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Deregister and remove a ready client, transferring ownership to the
    /// caller. Returns `None` if another event in the same batch already
    /// claimed it.
    fn take_client(&mut self, key: usize) -> Option<TcpStream> {
        let stream = self.clients.try_remove(key)?;
        if let Err(e) = self
            .poll
            .registry()
            .deregister(&mut SourceFd(&stream.as_raw_fd()))
        {
            warn!(error = %e, token = key, "failed to deregister client socket");
        }
        Some(stream)
    }
}

/// Outcome of an exact-length socket read.
enum RecvError {
    /// Peer closed the connection; close silently.
    Closed,
    /// OS-level read failure; a best-effort error response precedes closing.
    Io(io::Error),
}

/// Body of one listener thread: wait on the shared poller, then run the
/// framing state machine for every connection this wakeup handed us.
///
/// Returns only on a fatal multiplexer or accept error.
pub(crate) fn listener_loop(id: usize, shared: &Shared) -> io::Result<()> {
    let mut events = Events::with_capacity(MAX_EVENTS);
    // One reusable scratch buffer per listener thread, sized for the largest
    // possible message.
    let mut scratch = vec![0u8; MAX_MESSAGE];

    debug!(listener = id, "listener started");

    loop {
        let ready = {
            let mut mux = shared.mux.lock().unwrap();
            mux.wait(&mut events)?
        };

        for stream in ready {
            handle_client(stream, shared, &mut scratch);
        }
    }
}

/// Read and validate one request, then hand it to the worker pool.
///
/// Every early return drops `stream`, closing the connection; ownership only
/// survives this function by moving into a [`Job`].
fn handle_client(mut stream: TcpStream, shared: &Shared, scratch: &mut [u8]) {
    let header = match read_header(&mut stream, shared, scratch) {
        Some(header) => header,
        None => return,
    };

    let message = match read_message(&mut stream, shared, header, scratch) {
        Some(message) => message,
        None => return,
    };

    trace!(kind = ?message.header.kind, len = message.header.payload_length, "enqueuing job");
    shared.queue.push(Job { message, stream });
}

/// Read exactly 8 header bytes and validate them.
///
/// On validation failure the matching status is sent and `None` returned.
fn read_header(stream: &mut TcpStream, shared: &Shared, scratch: &mut [u8]) -> Option<Header> {
    if let Err(e) = recv_exact(stream, &mut scratch[..HEADER_SIZE], shared) {
        match e {
            RecvError::Closed => trace!("peer closed before header"),
            RecvError::Io(e) => {
                debug!(error = %e, "read error on header");
                respond_error(stream, &shared.stats, StatusKind::UnknownError);
            }
        }
        return None;
    }

    let raw: &[u8; HEADER_SIZE] = scratch[..HEADER_SIZE].try_into().unwrap();
    match protocol::decode_header(raw) {
        Ok(header) => Some(header),
        Err(e) => {
            debug!(error = %e, "invalid header");
            respond_error(stream, &shared.stats, e.status());
            None
        }
    }
}

/// Enforce the payload rule and read the payload if one is expected.
fn read_message(
    stream: &mut TcpStream,
    shared: &Shared,
    header: Header,
    scratch: &mut [u8],
) -> Option<Message> {
    if let Err(e) = protocol::check_payload(&header) {
        debug!(error = %e, "rejected payload");
        respond_error(stream, &shared.stats, e.status());
        return None;
    }

    let len = header.payload_length as usize;
    if len > 0 {
        if let Err(e) = recv_exact(stream, &mut scratch[..len], shared) {
            match e {
                RecvError::Closed => trace!("peer closed mid-payload"),
                RecvError::Io(e) => {
                    debug!(error = %e, "read error on payload");
                    respond_error(stream, &shared.stats, StatusKind::UnknownError);
                }
            }
            return None;
        }
    }

    Some(Message {
        header,
        payload: scratch[..len].to_vec(),
    })
}

/// Blocking retry-until-complete read of exactly `buf.len()` bytes.
///
/// Bytes received are accounted as they arrive, so the counter reflects
/// partial progress even when the read ultimately fails.
fn recv_exact(stream: &mut TcpStream, buf: &mut [u8], shared: &Shared) -> Result<(), RecvError> {
    let mut read = 0;
    while read < buf.len() {
        match stream.read(&mut buf[read..]) {
            Ok(0) => return Err(RecvError::Closed),
            Ok(n) => {
                read += n;
                shared.stats.add_received(n);
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RecvError::Io(e)),
        }
    }
    Ok(())
}
