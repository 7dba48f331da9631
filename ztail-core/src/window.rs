//! Bounded FIFO store of the most recently seen lines.
//!
//! [`LineWindow`] retains the last `line_capacity` lines inside one fixed
//! contiguous byte region used as a circular buffer, plus a ring of
//! line-start offsets, so a gigabyte stream can be scanned while holding
//! only the window in memory and without per-line heap allocation.
//!
//! Lines are built either incrementally ([`append`](LineWindow::append)
//! segment by segment, then [`commit`](LineWindow::commit)) or in one shot
//! via [`add_line`](LineWindow::add_line). Both entry points run through
//! the same admission and eviction routine, so the two paths cannot drift
//! apart: `add_line` is literally append-then-commit.

use std::io::{self, Write};
use std::mem;

use crate::config::WindowConfig;

/// Ring of line-start offsets into the storage region.
///
/// The entry width is picked once at construction: 32-bit offsets address
/// up to 4 GiB of storage and are preferred for memory density, 64-bit
/// entries are used beyond that. Both widths behave identically.
#[derive(Debug)]
enum OffsetRing {
    Narrow(Box<[u32]>),
    Wide(Box<[u64]>),
}

impl OffsetRing {
    fn new(line_capacity: usize, byte_capacity: usize) -> Self {
        if byte_capacity <= u32::MAX as usize {
            OffsetRing::Narrow(vec![0u32; line_capacity].into_boxed_slice())
        } else {
            OffsetRing::Wide(vec![0u64; line_capacity].into_boxed_slice())
        }
    }

    fn get(&self, index: usize) -> usize {
        match self {
            OffsetRing::Narrow(slots) => slots[index] as usize,
            OffsetRing::Wide(slots) => slots[index] as usize,
        }
    }

    fn set(&mut self, index: usize, value: usize) {
        match self {
            OffsetRing::Narrow(slots) => slots[index] = value as u32,
            OffsetRing::Wide(slots) => slots[index] = value as u64,
        }
    }

    fn byte_size(&self) -> usize {
        match self {
            OffsetRing::Narrow(slots) => slots.len() * mem::size_of::<u32>(),
            OffsetRing::Wide(slots) => slots.len() * mem::size_of::<u64>(),
        }
    }
}

/// State of the line currently under incremental construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// No line is open.
    None,
    /// A line is open: `start` is its first byte in storage, `len` the
    /// bytes written so far. Invisible to emission and eviction counts.
    Open { start: usize, len: usize },
    /// The open line outgrew the admission limit. Its bytes were already
    /// reclaimed; remaining segments and the closing commit are ignored.
    Doomed,
}

/// Fixed-capacity, FIFO-eviction store of the most recent lines.
pub struct LineWindow {
    /// Circular byte storage. Empty when the window is a no-op sink.
    storage: Box<[u8]>,
    offsets: OffsetRing,
    line_capacity: usize,
    /// Ring index of the oldest retained line's offset entry.
    offset_head: usize,
    /// Number of committed lines, `<= line_capacity`.
    count: usize,
    /// First byte of the oldest retained line.
    write_start: usize,
    /// One past the last written byte.
    write_end: usize,
    /// Sum of retained line lengths, excluding terminators.
    committed_bytes: usize,
    /// 0 means unlimited.
    bytes_budget: usize,
    pending: Pending,
}

impl LineWindow {
    /// Create a window sized by `config`.
    pub fn new(config: WindowConfig) -> Self {
        let byte_capacity = config.resolved_byte_capacity();
        Self {
            storage: vec![0u8; byte_capacity].into_boxed_slice(),
            offsets: OffsetRing::new(config.line_capacity, byte_capacity),
            line_capacity: config.line_capacity,
            offset_head: 0,
            count: 0,
            write_start: 0,
            write_end: 0,
            committed_bytes: 0,
            bytes_budget: config.bytes_budget,
            pending: Pending::None,
        }
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when no line is retained.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of retained lines.
    pub fn line_capacity(&self) -> usize {
        self.line_capacity
    }

    /// Size of the storage region in bytes.
    pub fn byte_capacity(&self) -> usize {
        self.storage.len()
    }

    /// Current storage plus index memory use. Diagnostic only.
    pub fn memory_footprint(&self) -> usize {
        mem::size_of::<Self>() + self.storage.len() + self.offsets.byte_size()
    }

    /// Append `segment` as a continuation of the pending line, opening one
    /// if none is open. Oldest committed lines are evicted as needed to
    /// make room. A running total that can no longer be admitted dooms the
    /// whole line: bytes already written for it are reclaimed and the line
    /// is dropped in its entirety at commit, never partially stored.
    pub fn append(&mut self, segment: &[u8]) {
        if self.is_sink() || segment.is_empty() || self.pending == Pending::Doomed {
            return;
        }
        let (start, written) = match self.pending {
            Pending::Open { start, len } => (start, len),
            _ => (self.write_end, 0),
        };
        let total = written.saturating_add(segment.len());
        if !self.admissible(total) {
            // Retroactive drop: reclaim what this line already wrote.
            self.write_end = start;
            self.pending = Pending::Doomed;
            return;
        }
        while self.free_bytes() < segment.len() && self.count > 0 {
            self.evict_oldest(start);
        }
        debug_assert!(self.free_bytes() >= segment.len());
        self.write_end = self.copy_in(self.write_end, segment);
        self.pending = Pending::Open {
            start,
            len: total,
        };
    }

    /// Finalize the pending line as a retained line. With no pending line
    /// open an empty line is committed; a doomed line is dropped. Evicts
    /// for the byte budget first, then for the line capacity.
    pub fn commit(&mut self) {
        if self.is_sink() {
            self.pending = Pending::None;
            return;
        }
        let (start, len) = match mem::replace(&mut self.pending, Pending::None) {
            Pending::Doomed => return,
            Pending::Open { start, len } => (start, len),
            Pending::None => (self.write_end, 0),
        };
        if self.bytes_budget > 0 {
            while self.count > 0 && self.committed_bytes + len > self.bytes_budget {
                self.evict_oldest(start);
            }
        }
        if self.count == self.line_capacity {
            self.evict_oldest(start);
        }
        let slot = (self.offset_head + self.count) % self.line_capacity;
        self.offsets.set(slot, start);
        if self.count == 0 {
            self.write_start = start;
        }
        self.count += 1;
        self.committed_bytes += len;
    }

    /// Add a complete line in one call. Equivalent to [`append`] followed
    /// by [`commit`] and subject to exactly the same eviction and budget
    /// policy; an oversize line is dropped without evicting anything.
    ///
    /// Must not be interleaved with an open pending line.
    ///
    /// [`append`]: LineWindow::append
    /// [`commit`]: LineWindow::commit
    pub fn add_line(&mut self, line: &[u8]) {
        debug_assert!(
            matches!(self.pending, Pending::None),
            "add_line while a pending line is open"
        );
        self.append(line);
        self.commit();
    }

    /// Write the retained lines, oldest to newest, each followed by one
    /// `\n`, to `out`. Output is gathered into blocks of at most
    /// `aggregation_threshold` bytes to bound peak memory for very large
    /// windows; a single line larger than the threshold bypasses the block
    /// buffer. Nothing is written for an empty window.
    pub fn emit<W: Write>(&self, out: &mut W, aggregation_threshold: usize) -> io::Result<()> {
        if self.count == 0 {
            return Ok(());
        }
        let total = self.committed_bytes + self.count;
        let block_capacity = if total <= aggregation_threshold {
            total
        } else {
            aggregation_threshold
        };
        let mut block: Vec<u8> = Vec::with_capacity(block_capacity);
        for index in 0..self.count {
            let (start, len) = self.line_bounds(index);
            let (first, rest) = self.line_slices(start, len);
            if len + 1 > aggregation_threshold {
                // Oversized for the block buffer: flush and write through.
                if !block.is_empty() {
                    out.write_all(&block)?;
                    block.clear();
                }
                out.write_all(first)?;
                out.write_all(rest)?;
                out.write_all(b"\n")?;
                continue;
            }
            if block.len() + len + 1 > block_capacity {
                out.write_all(&block)?;
                block.clear();
            }
            block.extend_from_slice(first);
            block.extend_from_slice(rest);
            block.push(b'\n');
        }
        if !block.is_empty() {
            out.write_all(&block)?;
        }
        Ok(())
    }

    /// True when the window can never retain anything.
    fn is_sink(&self) -> bool {
        self.line_capacity == 0 || self.storage.is_empty()
    }

    /// A line totalling `len` bytes may be admitted. Strictly smaller than
    /// the storage region: the one byte of ring slack keeps equal
    /// consecutive offsets meaning "empty line" unambiguously.
    fn admissible(&self, len: usize) -> bool {
        len < self.storage.len() && (self.bytes_budget == 0 || len <= self.bytes_budget)
    }

    fn pending_len(&self) -> usize {
        match self.pending {
            Pending::Open { len, .. } => len,
            _ => 0,
        }
    }

    fn free_bytes(&self) -> usize {
        self.storage.len() - self.committed_bytes - self.pending_len()
    }

    /// Directed distance from `from` forward to `to`, wrapping.
    fn ring_dist(&self, from: usize, to: usize) -> usize {
        (to + self.storage.len() - from) % self.storage.len()
    }

    /// Drop the oldest committed line. `committed_end` marks where the
    /// committed region stops: the pending line's start while one is open
    /// (or being committed), otherwise the write cursor.
    fn evict_oldest(&mut self, committed_end: usize) {
        debug_assert!(self.count > 0);
        let next_start = if self.count > 1 {
            self.offsets.get((self.offset_head + 1) % self.line_capacity)
        } else {
            committed_end
        };
        let len = self.ring_dist(self.write_start, next_start);
        self.write_start = next_start;
        self.committed_bytes -= len;
        self.offset_head = (self.offset_head + 1) % self.line_capacity;
        self.count -= 1;
    }

    /// Copy `bytes` into storage at `pos`, wrapping past the physical end.
    fn copy_in(&mut self, pos: usize, bytes: &[u8]) -> usize {
        let capacity = self.storage.len();
        let first = (capacity - pos).min(bytes.len());
        self.storage[pos..pos + first].copy_from_slice(&bytes[..first]);
        let rest = bytes.len() - first;
        if rest > 0 {
            self.storage[..rest].copy_from_slice(&bytes[first..]);
        }
        (pos + bytes.len()) % capacity
    }

    /// Start offset and length of the `index`-th retained line.
    fn line_bounds(&self, index: usize) -> (usize, usize) {
        let start = self.offsets.get((self.offset_head + index) % self.line_capacity);
        let end = if index + 1 < self.count {
            self.offsets
                .get((self.offset_head + index + 1) % self.line_capacity)
        } else {
            match self.pending {
                Pending::Open { start, .. } => start,
                _ => self.write_end,
            }
        };
        (start, self.ring_dist(start, end))
    }

    /// The line's bytes as up to two slices (it may wrap the region end).
    fn line_slices(&self, start: usize, len: usize) -> (&[u8], &[u8]) {
        let first = (self.storage.len() - start).min(len);
        (&self.storage[start..start + first], &self.storage[..len - first])
    }
}

impl std::fmt::Debug for LineWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineWindow")
            .field("line_capacity", &self.line_capacity)
            .field("byte_capacity", &self.storage.len())
            .field("count", &self.count)
            .field("committed_bytes", &self.committed_bytes)
            .field("bytes_budget", &self.bytes_budget)
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(window: &LineWindow) -> Vec<u8> {
        let mut out = Vec::new();
        window.emit(&mut out, usize::MAX).unwrap();
        out
    }

    fn window(lines: usize) -> LineWindow {
        LineWindow::new(WindowConfig::new(lines))
    }

    #[test]
    fn retains_last_n_lines() {
        let mut w = window(3);
        for line in ["Line 1", "Line 2", "Line 3", "Line 4"] {
            w.add_line(line.as_bytes());
        }
        assert_eq!(collect(&w), b"Line 2\nLine 3\nLine 4\n");
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn byte_budget_evicts_oldest() {
        let mut w = LineWindow::new(WindowConfig::new(10).bytes_budget(16));
        w.add_line(b"12345678");
        w.add_line(b"abcdefgh");
        w.add_line(b"ijkl");
        assert_eq!(collect(&w), b"abcdefgh\nijkl\n");
    }

    #[test]
    fn zero_line_capacity_is_a_sink() {
        let mut w = window(0);
        w.add_line(b"anything");
        w.append(b"more");
        w.commit();
        assert_eq!(collect(&w), b"");
        assert!(w.is_empty());
    }

    #[test]
    fn zero_byte_capacity_behaves_empty() {
        let mut w = LineWindow::new(WindowConfig::new(5).byte_capacity(0));
        w.add_line(b"anything");
        w.commit();
        assert_eq!(collect(&w), b"");
    }

    #[test]
    fn space_eviction_is_fifo() {
        let mut w = LineWindow::new(WindowConfig::new(10).byte_capacity(17));
        w.add_line(b"12345678");
        w.add_line(b"abcdefgh");
        w.add_line(b"ABCDEFGH");
        assert_eq!(collect(&w), b"abcdefgh\nABCDEFGH\n");
    }

    #[test]
    fn oversize_line_is_dropped_without_evicting() {
        let mut w = LineWindow::new(WindowConfig::new(4).byte_capacity(16));
        w.add_line(b"keep me");
        w.add_line(b"0123456789abcdefXX");
        assert_eq!(collect(&w), b"keep me\n");
    }

    #[test]
    fn line_of_exactly_byte_capacity_is_dropped() {
        let mut w = LineWindow::new(WindowConfig::new(4).byte_capacity(16));
        w.add_line(b"0123456789abcdef");
        assert_eq!(collect(&w), b"");
    }

    #[test]
    fn line_over_budget_is_dropped() {
        let mut w = LineWindow::new(WindowConfig::new(4).byte_capacity(32).bytes_budget(10));
        w.add_line(b"ok");
        w.add_line(b"abcdefghijkl"); // 12 > budget, still below byte capacity
        w.add_line(b"abcd");
        assert_eq!(collect(&w), b"ok\nabcd\n");
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut streamed = LineWindow::new(WindowConfig::new(3).byte_capacity(64));
        let mut one_shot = LineWindow::new(WindowConfig::new(3).byte_capacity(64));
        for chunk in [&b"Hel"[..], b"lo ", b"wor", b"ld"] {
            streamed.append(chunk);
        }
        streamed.commit();
        one_shot.add_line(b"Hello world");
        assert_eq!(collect(&streamed), collect(&one_shot));
        assert_eq!(collect(&streamed), b"Hello world\n");
    }

    #[test]
    fn oversize_running_total_discards_written_segments() {
        let mut w = LineWindow::new(WindowConfig::new(4).byte_capacity(16));
        w.add_line(b"early");
        w.append(b"abcdef");
        w.append(b"ghijklmnopq"); // running total 17 > capacity
        w.append(b"ignored");
        w.commit();
        // The oversize line vanished entirely; nothing truncated leaked.
        assert_eq!(collect(&w), b"early\n");
        // The reclaimed space is usable again.
        w.add_line(b"after");
        assert_eq!(collect(&w), b"early\nafter\n");
    }

    #[test]
    fn wraparound_emission_is_exact() {
        let mut w = LineWindow::new(WindowConfig::new(3).byte_capacity(32));
        for i in 0..20 {
            let line = format!("line-{i:02}");
            w.add_line(line.as_bytes());
        }
        assert_eq!(collect(&w), b"line-17\nline-18\nline-19\n");
    }

    #[test]
    fn commit_without_pending_is_an_empty_line() {
        let mut w = window(3);
        w.add_line(b"a");
        w.commit();
        w.add_line(b"b");
        assert_eq!(collect(&w), b"a\n\nb\n");
    }

    #[test]
    fn empty_lines_round_trip() {
        let mut w = window(5);
        w.add_line(b"a");
        w.add_line(b"");
        w.add_line(b"");
        w.add_line(b"b");
        assert_eq!(collect(&w), b"a\n\n\nb\n");
    }

    #[test]
    fn pending_line_is_invisible_until_commit() {
        let mut w = window(3);
        w.add_line(b"done");
        w.append(b"in flight");
        assert_eq!(collect(&w), b"done\n");
        assert_eq!(w.len(), 1);
        w.commit();
        assert_eq!(collect(&w), b"done\nin flight\n");
    }

    #[test]
    fn blocked_emission_matches_unblocked() {
        let mut w = LineWindow::new(WindowConfig::new(8).byte_capacity(128));
        for line in ["alpha", "beta", "gamma", "a-rather-long-line", "x"] {
            w.add_line(line.as_bytes());
        }
        let whole = collect(&w);
        for threshold in [0, 1, 4, 8, 17, 64] {
            let mut blocked = Vec::new();
            w.emit(&mut blocked, threshold).unwrap();
            assert_eq!(blocked, whole, "threshold {threshold}");
        }
    }

    #[test]
    fn eviction_during_append_keeps_newest() {
        let mut w = LineWindow::new(WindowConfig::new(8).byte_capacity(17));
        w.add_line(b"oldest12");
        w.add_line(b"middle12");
        // 16 of 17 bytes used; this append must push both lines out.
        w.append(b"abcdefgh");
        w.append(b"ijklmnop");
        w.commit();
        assert_eq!(collect(&w), b"abcdefghijklmnop\n");
    }

    #[test]
    fn memory_footprint_covers_storage_and_index() {
        let w = LineWindow::new(WindowConfig::new(4).byte_capacity(1024));
        assert!(w.memory_footprint() >= 1024 + 4 * mem::size_of::<u32>());
    }

    #[test]
    fn offset_ring_widths_agree() {
        let mut narrow = OffsetRing::new(4, 1024);
        let mut wide = OffsetRing::new(4, u32::MAX as usize + 1);
        assert!(matches!(narrow, OffsetRing::Narrow(_)));
        assert!(matches!(wide, OffsetRing::Wide(_)));
        for (i, value) in [0usize, 17, 1023, 5].into_iter().enumerate() {
            narrow.set(i, value);
            wide.set(i, value);
            assert_eq!(narrow.get(i), wide.get(i));
        }
        assert!(wide.byte_size() > narrow.byte_size());
    }
}
