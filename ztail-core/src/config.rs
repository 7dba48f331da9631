//! Configuration for the line window and the streaming pipeline.

/// Default number of retained lines, matching `tail`.
pub const DEFAULT_LINE_CAPACITY: usize = 10;

/// Default per-line pre-reserve hint in bytes.
pub const DEFAULT_LINE_RESERVE: usize = 1024;

/// Smallest storage region derived from a line-capacity hint.
pub const STORAGE_FLOOR: usize = 64 * 1024;

/// Default read-chunk size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Default emission aggregation threshold.
pub const DEFAULT_EMIT_THRESHOLD: usize = 256 * 1024;

/// Sizing policy for a [`crate::LineWindow`].
///
/// `line_capacity` bounds the number of retained lines; the storage region
/// holding their bytes is either set explicitly or derived from the
/// per-line reserve hint. `bytes_budget` optionally caps the sum of stored
/// line lengths independently of the line count (0 means unlimited).
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Maximum number of retained lines. 0 turns the window into a no-op
    /// sink.
    pub line_capacity: usize,
    /// Per-line pre-reserve hint used to derive the storage size. A pure
    /// performance knob, not a correctness constraint.
    pub line_reserve: usize,
    /// Explicit storage size in bytes, overriding derivation.
    pub byte_capacity: Option<usize>,
    /// Cap on the sum of stored line lengths, excluding terminators.
    /// 0 means unlimited.
    pub bytes_budget: usize,
}

impl WindowConfig {
    /// Config retaining the last `line_capacity` lines with default sizing.
    pub fn new(line_capacity: usize) -> Self {
        Self {
            line_capacity,
            line_reserve: DEFAULT_LINE_RESERVE,
            byte_capacity: None,
            bytes_budget: 0,
        }
    }

    /// Set the per-line pre-reserve hint.
    pub fn line_reserve(mut self, bytes: usize) -> Self {
        self.line_reserve = bytes;
        self
    }

    /// Fix the storage region size instead of deriving it.
    pub fn byte_capacity(mut self, bytes: usize) -> Self {
        self.byte_capacity = Some(bytes);
        self
    }

    /// Cap the total bytes of retained line content.
    pub fn bytes_budget(mut self, bytes: usize) -> Self {
        self.bytes_budget = bytes;
        self
    }

    /// Storage size the window will actually allocate.
    ///
    /// Derived as `max(STORAGE_FLOOR, line_capacity * line_reserve)` unless
    /// set explicitly, and clamped to `bytes_budget + 1` when a budget is
    /// in effect (content beyond the budget can never be retained anyway).
    pub fn resolved_byte_capacity(&self) -> usize {
        if self.line_capacity == 0 {
            return 0;
        }
        match self.byte_capacity {
            Some(bytes) => bytes,
            None => {
                let derived = STORAGE_FLOOR
                    .max(self.line_capacity.saturating_mul(self.line_reserve.max(1)));
                if self.bytes_budget > 0 {
                    derived.min(self.bytes_budget.saturating_add(1))
                } else {
                    derived
                }
            }
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_CAPACITY)
    }
}

/// Execution policy for a [`crate::StreamingPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Initial read-chunk size in bytes.
    pub chunk_size: usize,
    /// Overlap reading and splitting on two threads. Even when enabled the
    /// pipeline falls back to single-threaded mode under memory pressure.
    pub threaded: bool,
    /// Aggregation threshold for the final emission.
    pub emit_threshold: usize,
}

impl PipelineConfig {
    /// Set the initial read-chunk size.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Enable or disable the two-thread mode.
    pub fn threaded(mut self, enabled: bool) -> Self {
        self.threaded = enabled;
        self
    }

    /// Set the emission aggregation threshold.
    pub fn emit_threshold(mut self, bytes: usize) -> Self {
        self.emit_threshold = bytes;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            threaded: true,
            emit_threshold: DEFAULT_EMIT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_capacity_uses_floor_for_small_windows() {
        let config = WindowConfig::new(10);
        assert_eq!(config.resolved_byte_capacity(), STORAGE_FLOOR);
    }

    #[test]
    fn derived_capacity_scales_with_line_reserve() {
        let config = WindowConfig::new(1000).line_reserve(4096);
        assert_eq!(config.resolved_byte_capacity(), 1000 * 4096);
    }

    #[test]
    fn budget_clamps_derived_capacity() {
        let config = WindowConfig::new(10).bytes_budget(16);
        assert_eq!(config.resolved_byte_capacity(), 17);
    }

    #[test]
    fn explicit_capacity_wins() {
        let config = WindowConfig::new(10).byte_capacity(123).bytes_budget(16);
        assert_eq!(config.resolved_byte_capacity(), 123);
    }

    #[test]
    fn zero_lines_mean_zero_storage() {
        let config = WindowConfig::new(0).byte_capacity(1 << 20);
        assert_eq!(config.resolved_byte_capacity(), 0);
    }
}
