//! Non-blocking collection of exited descendants.

use nix::{
	errno::Errno,
	sys::wait::{waitpid, WaitPidFlag, WaitStatus},
	unistd::Pid,
};
use tracing::{debug, warn};

/// Outcome of one reaping pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReapOutcome {
	/// Every pending exit was collected; descendants remain.
	Drained,
	/// No descendants exist at all. Nothing will ever turn up again, so all
	/// remaining polling can stop.
	Exhausted,
}

/// Collects exit statuses for every process reparented to us, remembering
/// the launched command's own status when it comes through.
#[derive(Debug)]
pub struct Reaper {
	launched: Pid,
	captured: Option<i32>,
}

impl Reaper {
	/// A reaper watching for the exit of `launched`.
	#[must_use]
	pub const fn new(launched: Pid) -> Self {
		Self {
			launched,
			captured: None,
		}
	}

	/// Drain every descendant with a pending exit status, without blocking.
	///
	/// The launched command's status is captured the first time its pid is
	/// collected and never overwritten. The kernel removes a reaped pid from
	/// the wait queue, so the single write happens here or not at all; this
	/// is also the only place `captured` is written.
	pub fn reap(&mut self) -> ReapOutcome {
		loop {
			match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) => return ReapOutcome::Drained,
				Ok(status) => self.collect(&status),
				Err(Errno::ECHILD) => return ReapOutcome::Exhausted,
				Err(err) => {
					warn!(%err, "waitpid failed, ending this reap pass");
					return ReapOutcome::Drained;
				}
			}
		}
	}

	fn collect(&mut self, status: &WaitStatus) {
		let exit = match *status {
			WaitStatus::Exited(pid, code) => Some((pid, code)),
			WaitStatus::Signaled(pid, signal, _) => Some((pid, 128 + signal as i32)),
			// stops, continues, and ptrace events are not exits
			_ => None,
		};

		if let Some((pid, code)) = exit {
			debug!(%pid, code, "reaped descendant");
			if pid == self.launched && self.captured.is_none() {
				self.captured = Some(code);
			}
		}
	}

	/// The launched command's exit code, if its exit has been observed.
	#[must_use]
	pub const fn exit_code(&self) -> Option<i32> {
		self.captured
	}
}
