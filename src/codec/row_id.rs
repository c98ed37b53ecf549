//! Row ID generation
//!
//! IDs are time-ordered: the number of 10µs ticks since 2022-01-01 UTC,
//! shifted left 15 bits and XORed with the node ID. Within one generator
//! IDs are strictly increasing even when the clock stalls or goes back.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// 2022-01-01T00:00:00Z in seconds since the Unix epoch
const START_SECS: u64 = 1_640_995_200;
const TICK_NANOS: u128 = 10_000;
const NODE_BITS: u32 = 15;

#[derive(Debug, Default)]
pub struct RowIdGenerator {
    previous: Mutex<u64>,
}

impl RowIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, node_id: u64) -> u64 {
        let start = UNIX_EPOCH + Duration::from_secs(START_SECS);
        let elapsed = SystemTime::now()
            .duration_since(start)
            .unwrap_or(Duration::ZERO);
        let mut ts = (elapsed.as_nanos() / TICK_NANOS) as u64;

        let mut previous = self.previous.lock();
        if ts <= *previous {
            ts = *previous + 1;
        }
        *previous = ts;
        drop(previous);

        (ts << NODE_BITS) ^ node_id
    }
}
