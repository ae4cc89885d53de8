//! Error types.

use thiserror::Error;

/// Failure to install the signal relay's listeners.
#[derive(Debug, Error)]
pub enum RelayError {
	/// The OS refused to hand us a signal listener.
	#[error("installing {kind} listener: {err}")]
	Install {
		/// Which signal the listener was for.
		kind: &'static str,
		/// The underlying error.
		#[source]
		err: std::io::Error,
	},
}

/// Failure to spawn the wrapped command.
#[derive(Debug, Error)]
#[error("spawning {program}: {err}")]
pub struct LaunchError {
	/// The program that could not be started.
	pub program: String,
	/// The underlying error.
	#[source]
	pub err: std::io::Error,
}
