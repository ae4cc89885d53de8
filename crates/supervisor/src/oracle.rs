//! The process-classification oracle consumed by the lifecycle engine.

use nix::unistd::Pid;

/// Answers "what is still running under us, and what does it count as?".
///
/// The supervision core never classifies processes itself: discovery and
/// naming policy live behind this trait, so the engine and the signal relay
/// stay independent of how "the game" is told apart from launcher stubs and
/// scaffolding.
///
/// Implementations must compute every answer fresh on each call. Pids are
/// recycled by the OS once reaped, so nothing here may be cached across
/// ticks, and callers must not hold a returned pid past the next reap pass.
pub trait ProcessOracle: Send + Sync {
	/// Whether the actual workload, as opposed to launcher or setup
	/// helpers, is currently running.
	fn is_workload_alive(&self) -> bool;

	/// Whether any process tracked for shutdown purposes is still running.
	fn any_monitored_alive(&self) -> bool;

	/// Every live descendant of the supervisor.
	fn all_processes(&self) -> Vec<Pid>;

	/// The descendants that make up the workload proper.
	fn workload_processes(&self) -> Vec<Pid>;

	/// The descendants tracked for shutdown, with names for logging.
	fn monitored_processes(&self) -> Vec<(String, Pid)>;
}
