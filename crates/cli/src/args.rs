use clap::Parser;
use miette::{bail, Result};

/// Run a command under a process-tree supervisor and forward its exit code.
///
/// The argument layout is fixed and positional because gamewrap is spawned
/// by a launcher, not typed by people: a title for the supervisor process,
/// then how many of the following names classify processes to include and
/// to exclude, then those names, then the command to run.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct Args {
	/// Title to display on the supervisor process
	pub title: String,

	/// Number of include names at the head of the tail
	pub include_count: usize,

	/// Number of exclude names following the include names
	pub exclude_count: usize,

	/// Include names, exclude names, then the command and its arguments
	#[arg(
		trailing_var_arg = true,
		allow_hyphen_values = true,
		num_args = 1..,
	)]
	pub tail: Vec<String>,
}

/// The positional tail, cut along the declared counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
	/// Names to treat as workload even when the default policy would not.
	pub include: Vec<String>,
	/// Names to never treat as workload.
	pub exclude: Vec<String>,
	/// The command to launch, program first. Never empty.
	pub command: Vec<String>,
}

impl Args {
	/// Split the tail into classifier names and the command to run.
	pub fn into_invocation(self) -> Result<Invocation> {
		let names = self.include_count + self.exclude_count;
		if self.tail.len() <= names {
			bail!(
				"expected {names} process names followed by a command, got {} trailing arguments",
				self.tail.len()
			);
		}

		let mut tail = self.tail.into_iter();
		let include = tail.by_ref().take(self.include_count).collect();
		let exclude = tail.by_ref().take(self.exclude_count).collect();
		let command = tail.collect();
		Ok(Invocation {
			include,
			exclude,
			command,
		})
	}
}
