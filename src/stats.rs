//! Process-wide transfer statistics.
//!
//! Three counters shared by the listener and worker pools: cumulative bytes
//! received, cumulative bytes sent, and the ratio of the most recent
//! successful compression. One mutex guards all three so a snapshot or reset
//! always observes them together.

use std::sync::Mutex;

/// A consistent view of all three counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub bytes_received: u32,
    pub bytes_sent: u32,
    pub compression_ratio: u8,
}

/// Shared statistics store.
///
/// The lock is held only for the read-modify-write, never across I/O.
#[derive(Debug, Default)]
pub struct Stats {
    inner: Mutex<StatsSnapshot>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account bytes read off a client socket. Wraps on overflow like the
    /// 32-bit counters on the wire.
    pub fn add_received(&self, n: usize) {
        let mut stats = self.inner.lock().unwrap();
        stats.bytes_received = stats.bytes_received.wrapping_add(n as u32);
    }

    /// Account bytes written to a client socket.
    pub fn add_sent(&self, n: usize) {
        let mut stats = self.inner.lock().unwrap();
        stats.bytes_sent = stats.bytes_sent.wrapping_add(n as u32);
    }

    /// Record the ratio of the most recent successful compression.
    ///
    /// The ratio is `output_len / input_len` truncated to an integer. Empty
    /// input is defined as ratio 0.
    pub fn record_compression(&self, input_len: usize, output_len: usize) {
        let ratio = if input_len == 0 {
            0
        } else {
            (output_len / input_len) as u8
        };
        self.inner.lock().unwrap().compression_ratio = ratio;
    }

    /// Read all three counters atomically.
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock().unwrap()
    }

    /// Zero all three counters atomically.
    pub fn reset(&self) {
        *self.inner.lock().unwrap() = StatsSnapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_accounting() {
        let stats = Stats::new();
        stats.add_received(8);
        stats.add_received(100);
        stats.add_sent(9);

        let snap = stats.snapshot();
        assert_eq!(snap.bytes_received, 108);
        assert_eq!(snap.bytes_sent, 9);
        assert_eq!(snap.compression_ratio, 0);
    }

    #[test]
    fn test_reset_zeros_everything() {
        let stats = Stats::new();
        stats.add_received(42);
        stats.add_sent(17);
        stats.record_compression(10, 10);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_compression_ratio_truncates() {
        let stats = Stats::new();
        stats.record_compression(5, 2);
        assert_eq!(stats.snapshot().compression_ratio, 0);

        stats.record_compression(4, 4);
        assert_eq!(stats.snapshot().compression_ratio, 1);
    }

    #[test]
    fn test_compression_ratio_empty_input() {
        let stats = Stats::new();
        stats.record_compression(0, 0);
        assert_eq!(stats.snapshot().compression_ratio, 0);
    }

    #[test]
    fn test_received_counter_wraps() {
        let stats = Stats::new();
        stats.add_received(u32::MAX as usize);
        stats.add_received(2);
        assert_eq!(stats.snapshot().bytes_received, 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let stats = Arc::new(Stats::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    stats.add_received(1);
                    stats.add_sent(2);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.bytes_received, 8000);
        assert_eq!(snap.bytes_sent, 16000);
    }
}
