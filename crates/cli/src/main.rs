#![deny(rust_2018_idioms)]

use std::{process::ExitCode, sync::Arc};

use gamewrap_supervisor::{
	engine::LifecycleEngine,
	intent::ExitIntent,
	launch::launch,
	reaper::Reaper,
	relay,
	sink::LogSink,
	subreaper,
};
use miette::{IntoDiagnostic, Result};
use tracing::debug;

mod args;
mod monitor;

use args::Args;
use monitor::ProcessMonitor;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
	if std::env::var("RUST_LOG").is_ok() {
		tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_writer(std::io::stderr)
			.try_init()
			.ok();
	}

	let args = <Args as clap::Parser>::parse();
	debug!(version = %env!("CARGO_PKG_VERSION"), ?args, "starting gamewrap");
	let invocation = args.clone().into_invocation()?;

	subreaper::register();
	set_process_title(&args.title);

	let sink = LogSink::default();
	let oracle = Arc::new(ProcessMonitor::new(&invocation.include, &invocation.exclude));
	let intent = ExitIntent::default();

	// Listeners must be live before the command is, so a termination
	// request can never arrive unhandled.
	let relay = relay::spawn(oracle.clone(), intent.clone(), sink).into_diagnostic()?;

	let (program, program_args) = invocation
		.command
		.split_first()
		.expect("invocation command is never empty");
	let pid = match launch(program, program_args) {
		Ok(pid) => pid,
		Err(err) => {
			// a command that cannot start is a startup error, not a
			// shutdown: report it and leave with the default status
			sink.emit(&format!("Failed to execute process: {err}"));
			return Ok(ExitCode::SUCCESS);
		}
	};
	sink.emit(&format!(
		"Started initial process {pid} from {}",
		invocation.command.join(" ")
	));

	let engine = LifecycleEngine::new(oracle, Reaper::new(pid), sink, intent);
	let code = engine.run().await;
	relay.abort();

	match code {
		Some(code) => {
			sink.emit(&format!("Exit with return code {code}"));
			Ok(ExitCode::from(
				u8::try_from(code & 0xff).expect("masked to one byte"),
			))
		}
		None => {
			// never observed an exit for the initial process; unexpected,
			// but not worth failing the whole launcher over
			sink.emit("No exit status was captured for the initial process, defaulting to 0");
			Ok(ExitCode::SUCCESS)
		}
	}
}

/// Rename the supervisor process so process listings show which game this
/// wrapper belongs to. Cosmetic only, so failure is a footnote.
fn set_process_title(title: &str) {
	#[cfg(target_os = "linux")]
	{
		use std::ffi::CString;

		let Ok(name) = CString::new(format!("gamewrap: {title}")) else {
			return;
		};
		if let Err(err) = nix::sys::prctl::set_name(&name) {
			debug!(%err, "could not set process title");
		}
	}

	#[cfg(not(target_os = "linux"))]
	let _ = title;
}
