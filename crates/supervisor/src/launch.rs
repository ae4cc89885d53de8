//! Launching the wrapped command.

use std::{os::unix::process::CommandExt, process::Command};

use nix::unistd::Pid;
use tracing::debug;

use crate::errors::LaunchError;

/// Spawn the caller's command in its own process group.
///
/// `PYTHONPATH` is scrubbed from the inherited environment so the launcher's
/// own runtime paths don't leak into the workload.
///
/// The returned pid is the only handle kept: the `Child` is dropped on
/// purpose, because collection of this process (like every other descendant)
/// goes through the reaper, never through `Child::wait`.
pub fn launch(program: &str, args: &[String]) -> Result<Pid, LaunchError> {
	let mut command = Command::new(program);
	command.args(args).env_remove("PYTHONPATH").process_group(0);
	debug!(?command, "assembled command");

	let child = command.spawn().map_err(|err| LaunchError {
		program: program.to_string(),
		err,
	})?;

	let pid = Pid::from_raw(
		child
			.id()
			.try_into()
			.expect("kernel pids always fit in i32"),
	);
	debug!(%pid, "launched initial process");
	Ok(pid)
}
