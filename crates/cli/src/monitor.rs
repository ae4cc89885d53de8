//! Procfs-backed process discovery and classification.
//!
//! This is the policy side of supervision: walking `/proc` to find every
//! descendant of the wrapper, and deciding which of them count as the
//! workload versus scaffolding. The supervision core only ever sees the
//! [`ProcessOracle`] view of it.

use std::collections::{HashMap, HashSet};
use std::fs;

use gamewrap_supervisor::oracle::ProcessOracle;
use nix::unistd::{getpid, Pid};
use tracing::trace;

/// The kernel caps a process name (comm) at 15 bytes plus NUL.
const TASK_COMM_LEN: usize = 15;

/// Process names that are never considered part of the workload on their
/// own: shells, Wine service processes, Steam helpers, and other
/// scaffolding that surrounds or outlives the actual program. Entries are
/// matched against comm, so they are at most 15 bytes.
const DEFAULT_EXCLUDED: &[&str] = &[
	"bash",
	"control",
	"explorer.exe",
	"gameoverlayui",
	"plugplay.exe",
	"python",
	"python3",
	"rpcss.exe",
	"rundll32.exe",
	"services.exe",
	"sh",
	"steam",
	"steamerrorrepor",
	"steamwebhelper",
	"svchost.exe",
	"tee",
	"tr",
	"wineconsole",
	"winedbg",
	"winedevice.exe",
	"wineserver",
	"zenity",
];

/// Watches the wrapper's descendants through `/proc`.
///
/// Holds no process state of its own: every query re-reads the process
/// table, because pids are recycled once reaped and membership changes
/// whenever anything forks or exits.
pub struct ProcessMonitor {
	root: Pid,
	include: HashSet<String>,
	exclude: HashSet<String>,
}

impl ProcessMonitor {
	/// A monitor rooted at the current process.
	///
	/// `include` names are treated as workload even when the default policy
	/// would exclude them; `exclude` names are never treated as workload.
	#[must_use]
	pub fn new(include: &[String], exclude: &[String]) -> Self {
		Self::rooted(getpid(), include, exclude)
	}

	fn rooted(root: Pid, include: &[String], exclude: &[String]) -> Self {
		Self {
			root,
			include: include.iter().map(|name| comm_name(name)).collect(),
			exclude: exclude
				.iter()
				.map(|name| comm_name(name))
				.chain(DEFAULT_EXCLUDED.iter().map(|name| (*name).to_string()))
				.collect(),
		}
	}

	/// Whether `name` is scaffolding rather than workload. Caller-supplied
	/// includes override both the caller's excludes and the built-in list.
	fn is_excluded(&self, name: &str) -> bool {
		self.exclude.contains(name) && !self.include.contains(name)
	}

	/// Live, non-zombie descendants, freshly read from `/proc`.
	fn descendants(&self) -> Vec<ProcEntry> {
		let entries = snapshot();
		let mut children: HashMap<Pid, Vec<usize>> = HashMap::new();
		for (ix, entry) in entries.iter().enumerate() {
			children.entry(entry.ppid).or_default().push(ix);
		}

		let mut out = Vec::new();
		// guard against cycles from pid reuse between directory reads
		let mut seen = HashSet::new();
		let mut queue = vec![self.root];
		while let Some(pid) = queue.pop() {
			for &ix in children.get(&pid).into_iter().flatten() {
				let entry = &entries[ix];
				if seen.insert(entry.pid) {
					queue.push(entry.pid);
					if !entry.zombie {
						out.push(entry.clone());
					}
				}
			}
		}
		trace!(count = out.len(), "descendant snapshot");
		out
	}
}

impl ProcessOracle for ProcessMonitor {
	fn is_workload_alive(&self) -> bool {
		self.descendants()
			.iter()
			.any(|entry| !self.is_excluded(&entry.name))
	}

	fn any_monitored_alive(&self) -> bool {
		self.is_workload_alive()
	}

	fn all_processes(&self) -> Vec<Pid> {
		self.descendants().iter().map(|entry| entry.pid).collect()
	}

	fn workload_processes(&self) -> Vec<Pid> {
		self.descendants()
			.iter()
			.filter(|entry| !self.is_excluded(&entry.name))
			.map(|entry| entry.pid)
			.collect()
	}

	fn monitored_processes(&self) -> Vec<(String, Pid)> {
		self.descendants()
			.into_iter()
			.filter(|entry| !self.is_excluded(&entry.name))
			.map(|entry| (entry.name, entry.pid))
			.collect()
	}
}

#[derive(Clone, Debug)]
struct ProcEntry {
	pid: Pid,
	name: String,
	ppid: Pid,
	zombie: bool,
}

/// Truncate a name the way the kernel truncates comm.
fn comm_name(name: &str) -> String {
	if name.len() <= TASK_COMM_LEN {
		name.to_string()
	} else {
		String::from_utf8_lossy(&name.as_bytes()[..TASK_COMM_LEN]).into_owned()
	}
}

/// One pass over `/proc`, collecting every readable process entry.
fn snapshot() -> Vec<ProcEntry> {
	let Ok(dir) = fs::read_dir("/proc") else {
		return Vec::new();
	};

	dir.flatten()
		.filter_map(|dent| dent.file_name().to_str().and_then(|n| n.parse().ok()))
		.filter_map(read_stat)
		.collect()
}

/// Parse `/proc/<pid>/stat`: `pid (comm) state ppid ...`, where comm may
/// itself contain spaces or parentheses.
fn read_stat(pid: i32) -> Option<ProcEntry> {
	let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
	let open = stat.find('(')?;
	let close = stat.rfind(')')?;
	let name = stat.get(open + 1..close)?.to_string();

	let mut fields = stat.get(close + 2..)?.split_whitespace();
	let state = fields.next()?;
	let ppid = fields.next()?.parse().ok()?;

	Some(ProcEntry {
		pid: Pid::from_raw(pid),
		name,
		ppid: Pid::from_raw(ppid),
		zombie: state == "Z",
	})
}
