use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` source range in character offsets.
///
/// `(-1, -1)` is reserved for forward-declared or otherwise unpositioned
/// entries; it behaves as a single point at offset `-1`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextRange {
    pub start: i32,
    pub end: i32,
}

impl TextRange {
    pub const SENTINEL: TextRange = TextRange { start: -1, end: -1 };

    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// Zero-width ranges still occupy their start offset.
    fn effective_end(&self) -> i32 {
        self.end.max(self.start.saturating_add(1))
    }

    pub fn contains(&self, offset: i32) -> bool {
        self.start <= offset && offset < self.effective_end()
    }

    /// Whether this range shares at least one offset with `[start, end)`.
    pub fn intersects(&self, start: i32, end: i32) -> bool {
        self.start < end && start < self.effective_end()
    }
}
