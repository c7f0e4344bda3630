//! Service assembly: socket setup and the listener/worker thread pools.
//!
//! Control flow: listener pool -> job queue -> worker pool -> responder. The
//! only cross-thread mutable state is the shared multiplexer, the job queue,
//! and the statistics store, each behind its own coarse lock held only for
//! the read-modify-write.

mod listener;
mod queue;
mod responder;
mod worker;

use crate::config::Config;
use crate::protocol::Message;
use crate::stats::Stats;
use self::listener::Multiplexer;
use self::queue::JobQueue;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{error, info};

/// One decoded request plus exclusive ownership of the connection that
/// produced it. Created by a listener thread, consumed by exactly one worker;
/// dropping it closes the socket.
pub(crate) struct Job {
    pub message: Message,
    pub stream: TcpStream,
}

/// State shared between the listener and worker pools.
pub(crate) struct Shared {
    pub mux: Mutex<Multiplexer>,
    pub queue: JobQueue<Job>,
    pub stats: Stats,
}

/// The server: a bound listening socket plus the configuration needed to
/// start both thread pools.
pub struct Service {
    listeners: usize,
    workers: usize,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl Service {
    /// Bind the listening socket and set up the shared multiplexer.
    ///
    /// Setup failure here is fatal; nothing has been spawned yet.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let listener = create_listener(&config.host, config.port, config.backlog)?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            mux: Mutex::new(Multiplexer::new(listener)?),
            queue: JobQueue::new(config.max_pending),
            stats: Stats::new(),
        });

        Ok(Self {
            listeners: config.listeners,
            workers: config.workers,
            local_addr,
            shared,
        })
    }

    /// The address the service is bound to. With port 0 in the config this is
    /// where the ephemeral port shows up.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawn both pools and block for the process lifetime.
    ///
    /// There is no shutdown path; the service runs until the process is
    /// terminated externally.
    pub fn start(self) -> io::Result<()> {
        info!(
            addr = %self.local_addr,
            listeners = self.listeners,
            workers = self.workers,
            "service starting"
        );

        let mut handles = Vec::with_capacity(self.listeners + self.workers);

        for id in 0..self.listeners {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("listener-{id}"))
                .spawn(move || {
                    if let Err(e) = listener::listener_loop(id, &shared) {
                        error!(listener = id, error = %e, "listener thread failed");
                    }
                })?;
            handles.push(handle);
        }

        for id in 0..self.workers {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker::worker_loop(id, &shared))?;
            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.join();
        }

        Ok(())
    }
}

/// Create the listening socket: reuse-addr, nonblocking, bound, listening.
///
/// Nonblocking because the socket is driven by the readiness multiplexer;
/// accepted client sockets are switched back to blocking mode.
fn create_listener(host: &str, port: u16, backlog: i32) -> io::Result<TcpListener> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}
