//! stry: a multi-threaded TCP service speaking a fixed binary protocol.
//!
//! Four request kinds: liveness check, statistics query, statistics reset,
//! and run-length payload compression. A pool of listener threads shares one
//! readiness multiplexer to accept and frame requests; decoded requests flow
//! through a FIFO job queue to a pool of worker threads that execute them and
//! respond on the originating connection.
//!
//! The **binary** (`main.rs`) is a thin launcher: it loads configuration,
//! initializes logging, and calls [`server::Service::bind`] + `start()`. The
//! library is everything else, so integration tests can drive a live server.

pub mod compression;
pub mod config;
pub mod protocol;
pub mod server;
pub mod stats;
