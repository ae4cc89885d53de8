//! Relays the caller's termination requests to the process tree, escalating
//! on repeat.

use std::sync::Arc;

use nix::{
	errno::Errno,
	sys::signal::{kill, Signal},
	unistd::Pid,
};
use tokio::{
	select,
	signal::unix::{signal, SignalKind},
	task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
	errors::RelayError,
	intent::{ExitIntent, Tier},
	oracle::ProcessOracle,
	sink::LogSink,
};

/// How many enumerate-and-kill passes a hard shutdown makes. More than one,
/// to absorb races against processes that were mid-spawn while the previous
/// pass enumerated.
const HARD_KILL_PASSES: usize = 3;

/// Install listeners for SIGTERM and SIGINT and spawn the relay task.
///
/// This must run on the same current-thread runtime as the lifecycle engine:
/// that makes the body below single-flight, as a signal arriving while a
/// pass is underway is queued by the runtime rather than interleaved.
///
/// Rather than swapping handlers after the first request, one fixed body
/// branches on the tier recorded in [`ExitIntent`]: the first request is
/// forwarded verbatim to the workload, giving a cooperating program one
/// chance to wind down cleanly; every request after that kills all tracked
/// descendants unconditionally.
pub fn spawn(
	oracle: Arc<dyn ProcessOracle>,
	intent: ExitIntent,
	sink: LogSink,
) -> Result<JoinHandle<()>, RelayError> {
	let mut term = signal(SignalKind::terminate()).map_err(|err| RelayError::Install {
		kind: "SIGTERM",
		err,
	})?;
	let mut int = signal(SignalKind::interrupt()).map_err(|err| RelayError::Install {
		kind: "SIGINT",
		err,
	})?;

	Ok(tokio::spawn(async move {
		loop {
			let kind = select! {
				_ = term.recv() => Signal::SIGTERM,
				_ = int.recv() => Signal::SIGINT,
			};

			match intent.escalate() {
				Tier::Normal => {
					debug!(%kind, "first termination request, relaying to workload");
					sink.emit(&format!("Caught {kind}, passing it to the workload"));
					for pid in oracle.workload_processes() {
						send_signal(pid, kind);
					}
				}
				Tier::Hard => {
					debug!(%kind, "repeat termination request, killing the tree");
					sink.emit("Caught another signal, killing every process left");
					for _ in 0..HARD_KILL_PASSES {
						for pid in oracle.all_processes() {
							send_signal(pid, Signal::SIGKILL);
						}
					}
					sink.emit("--killed processes--");
				}
			}
		}
	}))
}

/// Send `signal` to `pid`.
///
/// A target that died before the signal landed is the expected race and is
/// ignored. Any other failure (say, permission) is logged and skipped, so
/// one stubborn process never aborts a shutdown pass.
pub(crate) fn send_signal(pid: Pid, signal: Signal) {
	match kill(pid, signal) {
		Ok(()) | Err(Errno::ESRCH) => {}
		Err(err) => warn!(%pid, %signal, %err, "could not signal process"),
	}
}
