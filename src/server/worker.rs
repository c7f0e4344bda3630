//! Worker pool: dequeue one job at a time and run its request handler.
//!
//! A worker owns the job's connection for exactly one response; the stream is
//! dropped (and the socket closed) when the handler returns, on every path.

use crate::compression;
use crate::protocol::{self, RequestKind, StatusKind};
use crate::server::responder::{respond, respond_error};
use crate::server::{Job, Shared};
use std::net::TcpStream;
use tracing::{debug, trace};

/// Body of one worker thread. Never returns.
pub(crate) fn worker_loop(id: usize, shared: &Shared) {
    debug!(worker = id, "worker started");

    loop {
        let job = shared.queue.pop();
        trace!(worker = id, kind = ?job.message.header.kind, "dispatching job");
        dispatch(job, shared);
    }
}

/// Run the handler for one decoded request, then close the connection.
fn dispatch(job: Job, shared: &Shared) {
    let Job { message, mut stream } = job;

    match message.header.kind {
        RequestKind::Ping => ping(&mut stream, shared),
        RequestKind::GetStats => get_stats(&mut stream, shared),
        RequestKind::ResetStats => reset_stats(&mut stream, shared),
        RequestKind::Compress => compress(&mut stream, &message.payload, shared),
    }
    // stream dropped here; the descriptor closes whatever the handler did
}

fn ping(stream: &mut TcpStream, shared: &Shared) {
    let msg = protocol::encode_response(StatusKind::Ok, Vec::new());
    respond(stream, &shared.stats, &msg);
}

fn get_stats(stream: &mut TcpStream, shared: &Shared) {
    let snap = shared.stats.snapshot();
    let payload = protocol::encode_stats(snap.bytes_received, snap.bytes_sent, snap.compression_ratio);
    let msg = protocol::encode_response(StatusKind::Ok, payload);
    respond(stream, &shared.stats, &msg);
}

fn reset_stats(stream: &mut TcpStream, shared: &Shared) {
    shared.stats.reset();
    let msg = protocol::encode_response(StatusKind::Ok, Vec::new());
    respond(stream, &shared.stats, &msg);
}

fn compress(stream: &mut TcpStream, payload: &[u8], shared: &Shared) {
    match compression::compress(payload) {
        Some(output) => {
            shared.stats.record_compression(payload.len(), output.len());
            let msg = protocol::encode_response(StatusKind::Ok, output);
            respond(stream, &shared.stats, &msg);
        }
        None => {
            debug!("compression rejected input outside lowercase alphabet");
            respond_error(stream, &shared.stats, StatusKind::UnknownError);
        }
    }
}
