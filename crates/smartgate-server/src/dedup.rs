//! Anti-flood deduplication.
//!
//! One [`DedupWindow`] holds the last observed `(code, params, sender)`
//! tuple with its timestamp. A request is a duplicate when all three
//! match the previous record positionally and the elapsed wall-clock
//! time is below the window. The record is overwritten on every observe,
//! duplicate or not, so a sustained flood keeps refreshing the window.
//!
//! The sender address is part of the key by design: this suppresses
//! double-clicks and single-sender floods, not the aggregate request
//! rate. Different senders issuing the identical command within the
//! window all execute.
//!
//! The record is process-wide shared state, not per-connection; it is
//! resolved last-writer-wins under its mutex. Whether both transports
//! share one record is a configuration choice (`DedupScope`).

use smartgate_protocol::CommandCode;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct DedupRecord {
    code: CommandCode,
    params: Vec<String>,
    sender: SocketAddr,
    at: Instant,
}

/// Mutex-guarded last-request record.
#[derive(Debug)]
pub struct DedupWindow {
    window: Duration,
    last: Mutex<Option<DedupRecord>>,
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Record the request and report whether it duplicates the previous
    /// one within the window.
    pub fn observe(
        &self,
        code: CommandCode,
        params: &[String],
        sender: SocketAddr,
        now: Instant,
    ) -> bool {
        let mut last = self.last.lock().expect("dedup lock poisoned");

        let duplicate = last.as_ref().is_some_and(|record| {
            record.code == code
                && record.sender == sender
                && record.params.len() == params.len()
                && record.params.iter().zip(params).all(|(a, b)| a == b)
                && now.duration_since(record.at) < self.window
        });

        *last = Some(DedupRecord {
            code,
            params: params.to_vec(),
            sender,
            at: now,
        });

        duplicate
    }
}
