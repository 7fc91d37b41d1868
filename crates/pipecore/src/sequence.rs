use serde::{Deserialize, Serialize};
use std::fmt;

/// Global emission tag. Defines the total delivery order of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence(pub u64);

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out strictly increasing sequence numbers, never reusing one.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    next: u64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current value and advance the counter.
    pub fn allocate(&mut self) -> Sequence {
        let seq = Sequence(self.next);
        self.next += 1;
        seq
    }

    /// Number of sequence numbers handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next
    }
}
