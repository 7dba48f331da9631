//! Producer/consumer pipeline overlapping reads with line splitting.
//!
//! In threaded mode one thread pulls chunks from the source (file, stdin,
//! or decompressor) while the other splits them into the window; the two
//! exchange exactly two reusable buffer slots in strict alternation under
//! a single mutex/condvar pair, which gives FIFO chunk ordering with one
//! chunk of look-ahead and no sequence numbers. The producer halves its
//! buffer when the consumer keeps catching up, and the pipeline drops to
//! plain single-threaded reads when doubling the buffer footprint would
//! eat too much of the machine's available memory.

use std::io::{self, Read, Write};
use std::mem;
use std::sync::{Condvar, Mutex};
use std::thread;

use sysinfo::{System, SystemExt};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::splitter::LineSplitter;

/// Floor for adaptive buffer halving.
const MIN_CHUNK_SIZE: usize = 64 * 1024;

/// Consecutive idle observations (both slots free when the producer claims
/// one) before the buffer size is halved.
const IDLE_OBSERVATIONS: u32 = 4;

/// Reusable buffer slot handed between producer and consumer.
struct Slot {
    buf: Vec<u8>,
    len: usize,
    ready: bool,
}

impl Slot {
    fn new(chunk_size: usize) -> Self {
        Self {
            buf: vec![0u8; chunk_size],
            len: 0,
            ready: false,
        }
    }
}

struct PairState {
    slots: [Slot; 2],
    finished: bool,
}

/// The only state shared between the two threads.
struct SlotPair {
    state: Mutex<PairState>,
    cond: Condvar,
}

impl SlotPair {
    fn new(chunk_size: usize) -> Self {
        Self {
            state: Mutex::new(PairState {
                slots: [Slot::new(chunk_size), Slot::new(chunk_size)],
                finished: false,
            }),
            cond: Condvar::new(),
        }
    }
}

/// Drives a source through a [`LineSplitter`] and emits the window.
#[derive(Debug, Default)]
pub struct StreamingPipeline {
    config: PipelineConfig,
}

impl StreamingPipeline {
    /// Create a pipeline with the given execution policy.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Consume `source` to exhaustion, split it into `splitter`, then
    /// finalize and emit the window to `out`.
    ///
    /// A source failure aborts before emission; lines already committed
    /// stay in the window, so the caller may still inspect or emit it.
    pub fn run<R, W>(&self, source: R, splitter: &mut LineSplitter, out: &mut W) -> Result<()>
    where
        R: Read + Send,
        W: Write,
    {
        let chunk_size = self.config.chunk_size.max(1);
        if self.config.threaded && !memory_pressured(chunk_size) {
            self.run_threaded(source, splitter, chunk_size)?;
        } else {
            self.run_single(source, splitter, chunk_size)?;
        }
        splitter.finalize();
        splitter
            .window()
            .emit(out, self.config.emit_threshold)
            .map_err(PipelineError::Emit)
    }

    fn run_single<R: Read>(
        &self,
        mut source: R,
        splitter: &mut LineSplitter,
        chunk_size: usize,
    ) -> io::Result<()> {
        let mut buf = vec![0u8; chunk_size];
        loop {
            let n = read_chunk(&mut source, &mut buf)?;
            if n == 0 {
                return Ok(());
            }
            splitter.feed(&buf[..n]);
        }
    }

    fn run_threaded<R: Read + Send>(
        &self,
        mut source: R,
        splitter: &mut LineSplitter,
        chunk_size: usize,
    ) -> io::Result<()> {
        let shared = SlotPair::new(chunk_size);
        thread::scope(|scope| {
            let producer = scope.spawn(|| produce(&shared, &mut source, chunk_size));
            consume(&shared, splitter);
            producer.join().expect("producer thread panicked")
        })
    }
}

/// Producer role: pull chunks into the slot whose turn it is, in strict
/// 0,1,0,1 alternation, shrinking the buffer under sustained idleness.
fn produce<R: Read>(shared: &SlotPair, source: &mut R, initial_chunk: usize) -> io::Result<()> {
    let floor = initial_chunk.min(MIN_CHUNK_SIZE);
    let mut chunk_size = initial_chunk;
    let mut turn = 0usize;
    let mut idle_streak = 0u32;
    loop {
        let mut buf = {
            let mut state = shared.state.lock().expect("pipeline state poisoned");
            while state.slots[turn].ready {
                state = shared.cond.wait(state).expect("pipeline state poisoned");
            }
            // Consumer caught up entirely: neither slot pending.
            if state.slots[turn ^ 1].ready {
                idle_streak = 0;
            } else {
                idle_streak += 1;
            }
            mem::take(&mut state.slots[turn].buf)
        };
        if idle_streak >= IDLE_OBSERVATIONS && chunk_size > floor {
            chunk_size = (chunk_size / 2).max(floor);
            idle_streak = 0;
        }
        // Buffers shrink over a run, never grow back.
        if buf.len() > chunk_size {
            buf.truncate(chunk_size);
            buf.shrink_to_fit();
        }
        let read = read_chunk(source, &mut buf);
        let mut state = shared.state.lock().expect("pipeline state poisoned");
        let slot = &mut state.slots[turn];
        slot.buf = buf;
        match read {
            Ok(0) => {
                state.finished = true;
                shared.cond.notify_all();
                return Ok(());
            }
            Ok(n) => {
                slot.len = n;
                slot.ready = true;
                shared.cond.notify_all();
            }
            Err(err) => {
                state.finished = true;
                shared.cond.notify_all();
                return Err(err);
            }
        }
        turn ^= 1;
    }
}

/// Consumer role: wait for the slot whose turn it is, feed it to the
/// splitter outside the lock, hand the buffer back, repeat until the
/// producer finishes with no chunk left in order.
fn consume(shared: &SlotPair, splitter: &mut LineSplitter) {
    let mut turn = 0usize;
    loop {
        let (buf, len) = {
            let mut state = shared.state.lock().expect("pipeline state poisoned");
            while !state.slots[turn].ready && !state.finished {
                state = shared.cond.wait(state).expect("pipeline state poisoned");
            }
            if !state.slots[turn].ready {
                return;
            }
            let slot = &mut state.slots[turn];
            (mem::take(&mut slot.buf), slot.len)
        };
        splitter.feed(&buf[..len]);
        {
            let mut state = shared.state.lock().expect("pipeline state poisoned");
            let slot = &mut state.slots[turn];
            slot.buf = buf;
            slot.ready = false;
            shared.cond.notify_all();
        }
        turn ^= 1;
    }
}

/// Read one chunk, retrying on interruption. 0 means end of stream.
fn read_chunk<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(buf) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Threaded mode doubles the read-buffer footprint; refuse when that would
/// consume more than half of the currently available system memory.
fn memory_pressured(chunk_size: usize) -> bool {
    let mut system = System::new();
    system.refresh_memory();
    let available = system.available_memory();
    available > 0 && (chunk_size as u64).saturating_mul(2) > available / 2
}
