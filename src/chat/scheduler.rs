//! Timed, one-at-a-time delivery of reply chunks.
//!
//! Each chunk waits for a "typing" delay proportional to its length. Delays
//! stack: chunk `i` appears at the sum of the delays of chunks `0..=i`,
//! measured from the moment delivery starts.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Typing-delay parameters, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub base_ms: u64,
    pub per_unit_ms: u64,
    pub max_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self { base_ms: 800, per_unit_ms: 30, max_ms: 2000 }
    }
}

impl Pacing {
    /// Delay before `chunk` appears. Length is counted in UTF-16 code units.
    pub fn typing_delay(&self, chunk: &str) -> Duration {
        let units = chunk.encode_utf16().count() as u64;
        let ms = self
            .base_ms
            .saturating_add(self.per_unit_ms.saturating_mul(units))
            .min(self.max_ms);
        Duration::from_millis(ms)
    }

    /// Offsets from delivery start at which each chunk is emitted.
    pub fn offsets<S: AsRef<str>>(&self, chunks: &[S]) -> Vec<Duration> {
        chunks
            .iter()
            .scan(Duration::ZERO, |elapsed, chunk| {
                *elapsed += self.typing_delay(chunk.as_ref());
                Some(*elapsed)
            })
            .collect()
    }
}

/// Receives chunks as they come due.
pub trait DeliverySink: Send + Sync {
    /// Called once per chunk, in order.
    fn emit(&self, chunk: String);

    /// Called exactly once, after the last chunk (or immediately when there
    /// are none).
    fn complete(&self, chips: Vec<String>);
}

/// Emits `chunks` into `sink` on the cumulative schedule, then completes with
/// `chips`. Not cancellable: every chunk is eventually emitted.
pub async fn deliver<S>(pacing: Pacing, chunks: Vec<String>, chips: Vec<String>, sink: &S)
where
    S: DeliverySink + ?Sized,
{
    let start = Instant::now();
    let offsets = pacing.offsets(&chunks);
    for (chunk, offset) in chunks.into_iter().zip(offsets) {
        sleep_until(start + offset).await;
        sink.emit(chunk);
    }
    sink.complete(chips);
}
