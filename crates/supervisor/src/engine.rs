//! The lifecycle engine: drives a launched command and its descendants from
//! start detection through to a bounded, escalating shutdown.

use std::{sync::Arc, time::Duration};

use nix::sys::signal::Signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::{
	intent::ExitIntent,
	oracle::ProcessOracle,
	reaper::{ReapOutcome, Reaper},
	relay::send_signal,
	sink::LogSink,
};

/// How often the engine polls the reaper and the oracle.
pub const TICK: Duration = Duration::from_millis(100);

/// Ticks per graceful-termination cycle (about 60s): SIGTERM goes out on
/// the cycle's first tick and again every time the window elapses.
pub const GRACE_TICKS: u32 = 600;

/// Which polling behaviour is currently active. Owned and mutated only by
/// the engine; nothing else reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
	AwaitingStart,
	Running,
	Exited,
	Terminating,
	Done,
}

/// Drives the supervision phase machine on a fixed tick.
///
/// Single task, no locks: the only concurrent actor is the signal relay,
/// which communicates through [`ExitIntent`] and through the processes
/// themselves, and the engine re-enumerates those fresh from the oracle on
/// every tick. Nothing here blocks except the tick sleep; the reap call is
/// always non-blocking.
///
/// There is deliberately no timeout on waiting for the workload to start or
/// finish. Only the terminating phase is bounded per cycle, and even that
/// repeats until everything is gone or a hard kill arrives from outside.
pub struct LifecycleEngine {
	oracle: Arc<dyn ProcessOracle>,
	reaper: Reaper,
	sink: LogSink,
	intent: ExitIntent,
	phase: Phase,
	grace_left: Option<u32>,
	noted_intent: bool,

	/// Tick length. Overridable so tests don't run in real time.
	pub tick: Duration,
	/// Ticks per graceful-termination window.
	pub grace_ticks: u32,
}

impl LifecycleEngine {
	/// An engine awaiting the start of the workload behind `oracle`.
	#[must_use]
	pub fn new(
		oracle: Arc<dyn ProcessOracle>,
		reaper: Reaper,
		sink: LogSink,
		intent: ExitIntent,
	) -> Self {
		Self {
			oracle,
			reaper,
			sink,
			intent,
			phase: Phase::AwaitingStart,
			grace_left: None,
			noted_intent: false,
			tick: TICK,
			grace_ticks: GRACE_TICKS,
		}
	}

	/// Run the supervision loop to completion.
	///
	/// Returns the launched command's exit code if one was captured by the
	/// time nothing remained to supervise.
	pub async fn run(mut self) -> Option<i32> {
		let mut ticker = interval(self.tick);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;

			if self.reaper.reap() == ReapOutcome::Exhausted {
				// Nothing left to wait for or clean up, whatever phase we
				// were in: skip the rest of the shutdown dance. This makes
				// no claim about unmonitored processes; it only means no
				// descendant of ours could ever satisfy a poll again.
				debug!(phase = ?self.phase, "no descendants remain");
				self.sink.emit("All descendant processes have quit");
				break;
			}

			if self.step() == Phase::Done {
				break;
			}
		}

		self.reaper.exit_code()
	}

	/// Advance the phase machine by one tick. Reaping for this tick has
	/// already happened.
	fn step(&mut self) -> Phase {
		if !self.noted_intent && self.intent.requested() {
			self.noted_intent = true;
			debug!(phase = ?self.phase, "external shutdown request observed");
		}

		self.phase = match self.phase {
			Phase::AwaitingStart => {
				// The launched command itself may be a launcher stub the
				// oracle does not count as the workload.
				if self.oracle.is_workload_alive() {
					self.sink.emit("Workload process has started");
					Phase::Running
				} else {
					Phase::AwaitingStart
				}
			}
			Phase::Running => {
				if self.oracle.is_workload_alive() {
					Phase::Running
				} else {
					self.sink.emit("Workload process has exited");
					Phase::Exited
				}
			}
			// This tick's reap pass was the final collection for the
			// workload; nothing else to do before shutdown begins.
			Phase::Exited => Phase::Terminating,
			Phase::Terminating => self.terminate_step(),
			Phase::Done => Phase::Done,
		};
		self.phase
	}

	fn terminate_step(&mut self) -> Phase {
		if !self.oracle.any_monitored_alive() {
			return Phase::Done;
		}

		match self.grace_left {
			// Start of a cycle, or a window expired with survivors: ask
			// everything still monitored to leave. The send counts as the
			// cycle's first tick, so resends land exactly `grace_ticks`
			// ticks apart. Elapsed time alone never escalates to SIGKILL;
			// that only ever comes from the signal relay.
			None | Some(0) => {
				for (name, pid) in self.oracle.monitored_processes() {
					self.sink.emit(&format!("Sending SIGTERM to {name} ({pid})"));
					send_signal(pid, Signal::SIGTERM);
				}
				self.grace_left = Some(self.grace_ticks.saturating_sub(1));
			}
			Some(left) => self.grace_left = Some(left - 1),
		}
		Phase::Terminating
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Mutex,
	};

	use nix::unistd::Pid;

	use super::*;

	/// Oracle scripted by a queue of workload-aliveness answers and a fixed
	/// monitored-aliveness flag. Enumerations always come back empty, so
	/// stepping the engine never signals a real process.
	struct Script {
		workload: Mutex<Vec<bool>>,
		monitored_alive: bool,
		enumerations: AtomicUsize,
	}

	impl Script {
		fn new(workload: &[bool], monitored_alive: bool) -> Arc<Self> {
			let mut order = workload.to_vec();
			order.reverse();
			Arc::new(Self {
				workload: Mutex::new(order),
				monitored_alive,
				enumerations: AtomicUsize::new(0),
			})
		}
	}

	impl ProcessOracle for Script {
		fn is_workload_alive(&self) -> bool {
			self.workload
				.lock()
				.unwrap_or_else(|e| e.into_inner())
				.pop()
				.unwrap_or(false)
		}

		fn any_monitored_alive(&self) -> bool {
			self.monitored_alive
		}

		fn all_processes(&self) -> Vec<Pid> {
			Vec::new()
		}

		fn workload_processes(&self) -> Vec<Pid> {
			Vec::new()
		}

		fn monitored_processes(&self) -> Vec<(String, Pid)> {
			self.enumerations.fetch_add(1, Ordering::SeqCst);
			Vec::new()
		}
	}

	fn engine(oracle: Arc<Script>) -> LifecycleEngine {
		LifecycleEngine::new(
			oracle,
			Reaper::new(Pid::from_raw(1)),
			LogSink::default(),
			ExitIntent::default(),
		)
	}

	#[test]
	fn phases_progress_in_order() {
		let oracle = Script::new(&[false, false, true, true, false], false);
		let mut engine = engine(oracle);

		assert_eq!(engine.step(), Phase::AwaitingStart);
		assert_eq!(engine.step(), Phase::AwaitingStart);
		assert_eq!(engine.step(), Phase::Running);
		assert_eq!(engine.step(), Phase::Running);
		assert_eq!(engine.step(), Phase::Exited);
		assert_eq!(engine.step(), Phase::Terminating);
		// nothing monitored is alive, so shutdown completes at once
		assert_eq!(engine.step(), Phase::Done);
		assert_eq!(engine.step(), Phase::Done);
	}

	#[test]
	fn awaiting_start_has_no_timeout() {
		let oracle = Script::new(&[], false);
		let mut engine = engine(oracle);
		for _ in 0..1000 {
			assert_eq!(engine.step(), Phase::AwaitingStart);
		}
	}

	#[test]
	fn graceful_window_resends_after_expiry() {
		let oracle = Script::new(&[true, false], true);
		let mut engine = engine(oracle.clone());
		engine.grace_ticks = 2;

		assert_eq!(engine.step(), Phase::Running);
		assert_eq!(engine.step(), Phase::Exited);
		assert_eq!(engine.step(), Phase::Terminating);

		// each cycle spans exactly grace_ticks ticks from send to resend:
		// the sending tick, then grace_ticks - 1 ticks of waiting
		for cycle in 1..=3_usize {
			assert_eq!(engine.step(), Phase::Terminating);
			assert_eq!(oracle.enumerations.load(Ordering::SeqCst), cycle);
			assert_eq!(engine.step(), Phase::Terminating);
			assert_eq!(oracle.enumerations.load(Ordering::SeqCst), cycle);
		}
		assert_eq!(engine.step(), Phase::Terminating);
		assert_eq!(oracle.enumerations.load(Ordering::SeqCst), 4);
	}
}
