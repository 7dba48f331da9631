//! Command-line interface and per-input orchestration.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use ztail_core::{LineSplitter, LineWindow, PipelineConfig, StreamingPipeline, WindowConfig};

use crate::detect::detect_format;
use crate::error::CliResult;
use crate::source::open_source;

/// Print the last N lines of plain or compressed files.
#[derive(Debug, Parser)]
#[command(
    name = "ztail",
    version,
    about = "Print the last N lines of plain or compressed files",
    long_about = "Print the last N lines of each input. Compression (gzip, \
                  bzip2, xz, zip, zstd) is detected from magic bytes with a \
                  file-extension fallback; stdin is read as plain bytes when \
                  no file is given."
)]
pub struct Cli {
    /// Print the last NUM lines of each input
    #[arg(short = 'n', long = "lines", value_name = "NUM", default_value_t = 10)]
    pub lines: usize,

    /// Input files; reads stdin when none are given
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Read this entry from a zip archive instead of the first one
    #[arg(long, value_name = "NAME")]
    pub zip_entry: Option<String>,

    /// Cap the total bytes of retained line content
    #[arg(long, value_name = "BYTES")]
    pub byte_budget: Option<usize>,

    /// Per-line pre-reserve hint in bytes (performance only)
    #[arg(long, value_name = "BYTES")]
    pub line_reserve: Option<usize>,

    /// Read-chunk size in KiB
    #[arg(long, value_name = "KIB")]
    pub chunk_kb: Option<usize>,

    /// Emission block size in KiB
    #[arg(long, value_name = "KIB", default_value_t = 256)]
    pub block_kb: usize,

    /// Disable the two-thread read/split overlap
    #[arg(long)]
    pub no_threads: bool,

    /// Suppress per-file headers and log output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Process every input in order. A failing input is reported and the
    /// remaining inputs are still processed; the result is an error if any
    /// input failed.
    pub fn execute(&self) -> CliResult<()> {
        self.init_logging();

        if self.files.is_empty() {
            return self.tail_reader(io::stdin());
        }

        let headers = self.files.len() > 1 && !self.quiet;
        let mut failures = 0usize;
        for (index, path) in self.files.iter().enumerate() {
            if headers {
                if index > 0 {
                    println!();
                }
                println!("==> {} <==", path.display());
            }
            if let Err(err) = self.tail_file(path) {
                failures += 1;
                eprintln!("ztail: {}: {err:#}", path.display());
            }
        }
        if failures > 0 {
            anyhow::bail!("{failures} of {} inputs failed", self.files.len());
        }
        Ok(())
    }

    fn tail_file(&self, path: &Path) -> CliResult<()> {
        let format =
            detect_format(path).with_context(|| format!("cannot probe {}", path.display()))?;
        log::debug!("{}: detected {} input", path.display(), format.name());
        let source = open_source(path, format, self.zip_entry.as_deref())?;
        self.tail_reader(source)
    }

    fn tail_reader<R: Read + Send>(&self, source: R) -> CliResult<()> {
        let mut splitter = LineSplitter::new(LineWindow::new(self.window_config()));
        let pipeline = StreamingPipeline::new(self.pipeline_config());
        let stdout = io::stdout();
        let mut out = stdout.lock();
        pipeline.run(source, &mut splitter, &mut out)?;
        log::debug!(
            "window footprint: {} bytes",
            splitter.window().memory_footprint()
        );
        Ok(())
    }

    fn window_config(&self) -> WindowConfig {
        let mut config = WindowConfig::new(self.lines);
        if let Some(reserve) = self.line_reserve {
            config = config.line_reserve(reserve);
        }
        if let Some(budget) = self.byte_budget {
            config = config.bytes_budget(budget);
        }
        config
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default()
            .threaded(!self.no_threads)
            .emit_threshold(self.block_kb.saturating_mul(1024).max(1));
        if let Some(kb) = self.chunk_kb {
            config = config.chunk_size(kb.saturating_mul(1024).max(1));
        }
        config
    }

    fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        if !self.quiet {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or(level),
            )
            .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tail() {
        let cli = Cli::try_parse_from(["ztail"]).unwrap();
        assert_eq!(cli.lines, 10);
        assert!(cli.files.is_empty());
        assert!(!cli.no_threads);
        assert_eq!(cli.block_kb, 256);
    }

    #[test]
    fn short_and_long_line_flags() {
        let cli = Cli::try_parse_from(["ztail", "-n", "25", "app.log.gz"]).unwrap();
        assert_eq!(cli.lines, 25);
        assert_eq!(cli.files, vec![PathBuf::from("app.log.gz")]);
        let cli = Cli::try_parse_from(["ztail", "--lines", "3"]).unwrap();
        assert_eq!(cli.lines, 3);
    }

    #[test]
    fn tuning_flags_reach_the_configs() {
        let cli = Cli::try_parse_from([
            "ztail",
            "--byte-budget",
            "16",
            "--chunk-kb",
            "64",
            "--no-threads",
            "in.txt",
        ])
        .unwrap();
        let window = cli.window_config();
        assert_eq!(window.bytes_budget, 16);
        let pipeline = cli.pipeline_config();
        assert_eq!(pipeline.chunk_size, 64 * 1024);
        assert!(!pipeline.threaded);
    }

    #[test]
    fn multiple_files_are_accepted() {
        let cli = Cli::try_parse_from(["ztail", "a.log", "b.log.zst"]).unwrap();
        assert_eq!(cli.files.len(), 2);
    }
}
