//! One-shot child subreaper registration.

use tracing::warn;

/// Ask the kernel to reparent orphaned descendants to us instead of init.
///
/// Without this, a descendant whose parent dies first escapes to init and we
/// never see its exit. Registration failing is not fatal: direct children
/// are still waitable, we only lose sight of grand-orphans. The kernel does
/// not support unregistering, and no attempt is made to.
pub fn register() {
	#[cfg(target_os = "linux")]
	if let Err(err) = nix::sys::prctl::set_child_subreaper(true) {
		warn!(%err, "could not register as child subreaper, orphaned grandchildren may escape");
	}

	#[cfg(not(target_os = "linux"))]
	warn!("no child subreaper support on this platform, orphaned grandchildren may escape");
}
