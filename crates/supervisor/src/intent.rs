//! Shared record of how hard the caller has asked us to shut down.

use std::sync::{
	atomic::{AtomicU8, Ordering},
	Arc,
};

const NONE: u8 = 0;
const NORMAL: u8 = 1;
const HARD: u8 = 2;

/// The tier a termination request should be handled at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
	/// First request: pass the signal along and let the workload wind down.
	Normal,
	/// Any later request: unconditional kill, no cooperation expected.
	Hard,
}

/// Process-wide exit intent.
///
/// A single cell holding "no shutdown requested", "normal shutdown
/// requested", or "hard shutdown requested". Written only from the signal
/// relay; the lifecycle engine and kill dispatch read it. Transitions are
/// monotonic: none → normal → hard, never back down.
#[derive(Clone, Debug, Default)]
pub struct ExitIntent(Arc<AtomicU8>);

impl ExitIntent {
	/// Record one more termination request and return the tier it lands at.
	///
	/// The first call returns [`Tier::Normal`]; every subsequent call
	/// returns [`Tier::Hard`], regardless of which signal kind arrived.
	pub fn escalate(&self) -> Tier {
		let previous = self
			.0
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |tier| {
				Some(if tier == NONE { NORMAL } else { HARD })
			})
			.expect("unreachable: the update closure always yields a value");

		if previous == NONE {
			Tier::Normal
		} else {
			Tier::Hard
		}
	}

	/// Whether any shutdown request has been seen yet.
	#[must_use]
	pub fn requested(&self) -> bool {
		self.0.load(Ordering::Acquire) != NONE
	}

	/// Whether requests have escalated to unconditional kills.
	#[must_use]
	pub fn is_hard(&self) -> bool {
		self.0.load(Ordering::Acquire) == HARD
	}
}
