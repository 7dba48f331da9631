//! Property tests: how a stream is cut into chunks must never change the
//! retained lines.

use proptest::prelude::*;

use ztail_core::{LineSplitter, LineWindow, WindowConfig};

fn emit(splitter: &LineSplitter) -> Vec<u8> {
    let mut out = Vec::new();
    splitter.window().emit(&mut out, usize::MAX).unwrap();
    out
}

/// Lines short enough to always be admissible, so eviction order is the
/// only thing segmentation could disturb.
fn line_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        any::<u8>().prop_map(|b| if b == b'\n' { b'x' } else { b }),
        0..40,
    )
}

proptest! {
    #[test]
    fn segmentation_is_transparent(
        lines in proptest::collection::vec(line_strategy(), 0..30),
        terminated in any::<bool>(),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let mut stream = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            stream.extend_from_slice(line);
            if terminated || i + 1 < lines.len() {
                stream.push(b'\n');
            }
        }

        let window = || LineWindow::new(WindowConfig::new(5).byte_capacity(256));

        let mut whole = LineSplitter::new(window());
        whole.feed(&stream);
        whole.finalize();

        let mut cut_points: Vec<usize> = cuts.iter().map(|c| c.index(stream.len() + 1)).collect();
        cut_points.sort_unstable();
        let mut segmented = LineSplitter::new(window());
        let mut from = 0;
        for at in cut_points {
            segmented.feed(&stream[from..at]);
            from = at;
        }
        segmented.feed(&stream[from..]);
        segmented.finalize();

        prop_assert_eq!(emit(&whole), emit(&segmented));
    }
}
