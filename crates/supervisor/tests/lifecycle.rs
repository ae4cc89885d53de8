#![cfg(unix)]

use std::{
	process::Command,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use gamewrap_supervisor::{
	engine::LifecycleEngine,
	intent::ExitIntent,
	launch::launch,
	oracle::ProcessOracle,
	reaper::Reaper,
	sink::LogSink,
};
use nix::{
	errno::Errno,
	sys::signal::kill,
	unistd::Pid,
};

// The engine reaps with waitpid(-1), which is process-global: tests that
// spawn children must not overlap.
static WAIT_LOCK: Mutex<()> = Mutex::new(());

fn probe_alive(pid: Pid) -> bool {
	kill(pid, None) != Err(Errno::ESRCH)
}

fn spawn_child(program: &str, args: &[&str]) -> Pid {
	let child = Command::new(program)
		.args(args)
		.spawn()
		.expect("spawn helper");
	Pid::from_raw(child.id().try_into().expect("pid fits in i32"))
}

/// Oracle that never sees a workload and tracks nothing. Records every
/// query so tests can assert what the engine asked.
#[derive(Default)]
struct NothingTracked {
	calls: boxcar::Vec<&'static str>,
}

impl ProcessOracle for NothingTracked {
	fn is_workload_alive(&self) -> bool {
		self.calls.push("is_workload_alive");
		false
	}

	fn any_monitored_alive(&self) -> bool {
		self.calls.push("any_monitored_alive");
		false
	}

	fn all_processes(&self) -> Vec<Pid> {
		self.calls.push("all_processes");
		Vec::new()
	}

	fn workload_processes(&self) -> Vec<Pid> {
		self.calls.push("workload_processes");
		Vec::new()
	}

	fn monitored_processes(&self) -> Vec<(String, Pid)> {
		self.calls.push("monitored_processes");
		Vec::new()
	}
}

/// Oracle for a workload that runs for a few polls and leaves one real
/// helper process behind to be terminated.
struct LeftoverHelper {
	helper: Pid,
	workload_polls: AtomicUsize,
	alive_polls: usize,
	enumerations: AtomicUsize,
}

impl LeftoverHelper {
	fn new(helper: Pid, alive_polls: usize) -> Arc<Self> {
		Arc::new(Self {
			helper,
			workload_polls: AtomicUsize::new(0),
			alive_polls,
			enumerations: AtomicUsize::new(0),
		})
	}
}

impl ProcessOracle for LeftoverHelper {
	fn is_workload_alive(&self) -> bool {
		self.workload_polls.fetch_add(1, Ordering::SeqCst) < self.alive_polls
	}

	fn any_monitored_alive(&self) -> bool {
		probe_alive(self.helper)
	}

	fn all_processes(&self) -> Vec<Pid> {
		self.workload_processes()
	}

	fn workload_processes(&self) -> Vec<Pid> {
		if probe_alive(self.helper) {
			vec![self.helper]
		} else {
			Vec::new()
		}
	}

	fn monitored_processes(&self) -> Vec<(String, Pid)> {
		self.enumerations.fetch_add(1, Ordering::SeqCst);
		self.workload_processes()
			.into_iter()
			.map(|pid| ("helper".to_string(), pid))
			.collect()
	}
}

#[tokio::test]
async fn forwards_exit_code_of_launched_command() {
	let _guard = WAIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());

	let pid = launch("sh", &["-c".into(), "exit 7".into()]).expect("launch sh");
	let oracle = Arc::new(NothingTracked::default());
	let mut engine = LifecycleEngine::new(
		oracle.clone(),
		Reaper::new(pid),
		LogSink::default(),
		ExitIntent::default(),
	);
	engine.tick = Duration::from_millis(5);

	// the command exits on its own, and with no descendants left the
	// engine falls through without waiting on any phase
	assert_eq!(engine.run().await, Some(7));
	// the fallthrough is an efficiency exit: no classification happened
	assert!(!oracle.calls.iter().any(|(_, c)| *c == "monitored_processes"));
}

#[tokio::test]
async fn launch_failure_is_reported_not_supervised() {
	let err = launch("/does/not/exist", &[]).expect_err("launch must fail");
	assert_eq!(err.err.kind(), std::io::ErrorKind::NotFound);
}

#[tokio::test]
async fn terminates_leftover_monitored_processes() {
	let _guard = WAIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());

	let launched = launch("sh", &["-c".into(), "exit 3".into()]).expect("launch sh");
	let helper = spawn_child("sleep", &["10"]);

	let oracle = LeftoverHelper::new(helper, 3);
	let mut engine = LifecycleEngine::new(
		oracle.clone(),
		Reaper::new(launched),
		LogSink::default(),
		ExitIntent::default(),
	);
	engine.tick = Duration::from_millis(5);

	// the workload's own exit code survives the shutdown of the helper
	assert_eq!(engine.run().await, Some(3));
	// and the helper was told to leave, and did
	assert!(!probe_alive(helper));
}

#[tokio::test]
async fn graceful_signal_is_resent_when_ignored() {
	let _guard = WAIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());

	let launched = launch("sh", &["-c".into(), "exit 0".into()]).expect("launch sh");
	// a helper that shrugs off SIGTERM and exits on its own schedule
	let helper = spawn_child("sh", &["-c", "trap '' TERM; sleep 1; exit 0"]);

	let oracle = LeftoverHelper::new(helper, 1);
	let mut engine = LifecycleEngine::new(
		oracle.clone(),
		Reaper::new(launched),
		LogSink::default(),
		ExitIntent::default(),
	);
	engine.tick = Duration::from_millis(10);
	engine.grace_ticks = 5;

	assert_eq!(engine.run().await, Some(0));
	// the stubborn helper saw at least two full termination cycles
	assert!(
		oracle.enumerations.load(Ordering::SeqCst) >= 2,
		"expected repeated SIGTERM cycles, got {}",
		oracle.enumerations.load(Ordering::SeqCst)
	);
}
