use crate::error::{AnalyticsError, Result, Stream};
use crate::network::PostOutcome;

/// Local buffer plus the part number the next flush will carry.
#[derive(Debug)]
pub struct Batch<T> {
    entries: Vec<T>,
    part: u32,
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Batch<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            part: 1,
        }
    }

    /// Append and return the new length.
    pub fn push(&mut self, entry: T) -> usize {
        self.entries.push(entry);
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn part(&self) -> u32 {
        self.part
    }

    /// Take the buffered entries with the part they ship under, advancing the counter.
    pub fn drain(&mut self) -> (Vec<T>, u32) {
        let part = self.part;
        self.part += 1;
        (std::mem::take(&mut self.entries), part)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.part = 1;
    }
}

/// What a successful flush did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Sent { part: u32, count: usize },
    /// Nothing buffered; no request was made.
    Empty,
    /// Transport reported no connectivity; the batch was dropped.
    Offline(String),
}

impl FlushOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, FlushOutcome::Sent { .. })
    }
}

/// Map a collector response onto a flush result: only HTTP 200 counts as delivered.
pub fn settle(stream: Stream, outcome: PostOutcome, part: u32, count: usize) -> Result<FlushOutcome> {
    match outcome {
        PostOutcome::Sent(200) => Ok(FlushOutcome::Sent { part, count }),
        PostOutcome::Sent(status) => {
            log::warn!("{} batch part {} rejected with status {}", stream, part, status);
            Err(AnalyticsError::HttpStatus(status))
        }
        PostOutcome::Offline(message) => Ok(FlushOutcome::Offline(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_advances_part_and_empties() {
        let mut batch = Batch::new();
        batch.push("a");
        batch.push("b");
        let (entries, part) = batch.drain();
        assert_eq!(entries, vec!["a", "b"]);
        assert_eq!(part, 1);
        assert!(batch.is_empty());
        assert_eq!(batch.part(), 2);
    }

    #[test]
    fn reset_restores_first_part() {
        let mut batch = Batch::new();
        batch.push(1);
        batch.drain();
        batch.drain();
        batch.push(2);
        batch.reset();
        assert_eq!(batch.part(), 1);
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn settle_only_accepts_200() {
        assert!(settle(Stream::Gaze, PostOutcome::Sent(200), 1, 3).unwrap().is_sent());
        assert!(matches!(
            settle(Stream::Gaze, PostOutcome::Sent(201), 1, 3),
            Err(AnalyticsError::HttpStatus(201))
        ));
        assert!(matches!(
            settle(Stream::Gaze, PostOutcome::Offline("x".into()), 1, 3),
            Ok(FlushOutcome::Offline(_))
        ));
    }
}
