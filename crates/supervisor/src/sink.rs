//! Fire-and-forget line sink for the wrapper's user-facing output.

use std::io::{self, Write};

/// Writes protocol lines to stdout, one per call.
///
/// The consumer is typically a pipe held by whatever launched us, and it can
/// go away at any time. Rust leaves SIGPIPE ignored, so a closed pipe shows
/// up as a plain write error here; those are swallowed rather than surfaced,
/// as losing a log line must never take the supervision down with it.
///
/// Structured diagnostics go through `tracing` instead; this sink is only
/// for the lines the launcher reads back.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl LogSink {
	/// Emit one line. Never fails.
	pub fn emit(self, line: &str) {
		let mut out = io::stdout().lock();
		let _ = writeln!(out, "{line}");
		let _ = out.flush();
	}
}
