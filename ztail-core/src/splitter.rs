//! Splits raw byte chunks into lines and forwards them to the window.

use memchr::memchr;

use crate::window::LineWindow;

/// Line terminator this crate splits on and emits.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Turns arbitrary byte chunks into discrete lines.
///
/// A chunk may end in the middle of a line; the partial tail is carried as
/// the window's pending line, so the residual shares the window's storage
/// and needs no separate cap. Completed lines with no carried residual use
/// the window's one-shot path; both paths produce byte-identical results.
#[derive(Debug)]
pub struct LineSplitter {
    window: LineWindow,
    /// A partial line is open in the window.
    residual: bool,
}

impl LineSplitter {
    /// Create a splitter feeding `window`.
    pub fn new(window: LineWindow) -> Self {
        Self {
            window,
            residual: false,
        }
    }

    /// Scan `chunk` for terminators, committing each completed line to the
    /// window in stream order and retaining any unterminated tail for the
    /// next call.
    pub fn feed(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while let Some(at) = memchr(LINE_TERMINATOR, rest) {
            let line = &rest[..at];
            if self.residual {
                self.window.append(line);
                self.window.commit();
                self.residual = false;
            } else {
                self.window.add_line(line);
            }
            rest = &rest[at + 1..];
        }
        if !rest.is_empty() {
            self.window.append(rest);
            self.residual = true;
        }
    }

    /// Commit a trailing line left open when the stream ends without a
    /// final terminator. Idempotent.
    pub fn finalize(&mut self) {
        if self.residual {
            self.window.commit();
            self.residual = false;
        }
    }

    /// The window being fed.
    pub fn window(&self) -> &LineWindow {
        &self.window
    }

    /// Take the window back, e.g. to emit it.
    pub fn into_window(mut self) -> LineWindow {
        self.finalize();
        self.window
    }
}
