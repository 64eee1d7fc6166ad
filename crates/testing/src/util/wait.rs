// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Condition polling for tests.
//!
//! Asynchronous effects in this workspace settle at unpredictable points,
//! so tests poll instead of sleeping fixed amounts. [`Wait`] polls with a
//! geometrically growing pause: conditions that settle fast are observed
//! within a millisecond, slow ones don't busy-spin the test runner.

use std::thread;
use std::time::{Duration, Instant};

/// A polling policy: overall deadline plus the pause bounds.
#[derive(Debug, Clone, Copy)]
pub struct Wait {
	timeout: Duration,
	initial_pause: Duration,
	max_pause: Duration,
}

impl Default for Wait {
	fn default() -> Self {
		Self::new()
	}
}

impl Wait {
	/// Overall deadline used when none is configured.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

	pub fn new() -> Self {
		Self {
			timeout: Self::DEFAULT_TIMEOUT,
			initial_pause: Duration::from_micros(500),
			max_pause: Duration::from_millis(20),
		}
	}

	/// Replace the overall deadline.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Cap the pause between polls.
	pub fn max_pause(mut self, max_pause: Duration) -> Self {
		self.max_pause = max_pause;
		self
	}

	/// Poll until `condition` holds or the deadline passes. Returns
	/// whether the condition was observed; the condition is checked one
	/// final time at the deadline.
	pub fn until<F>(&self, condition: F) -> bool
	where
		F: Fn() -> bool,
	{
		let deadline = Instant::now() + self.timeout;
		let mut pause = self.initial_pause;
		loop {
			if condition() {
				return true;
			}
			let now = Instant::now();
			if now >= deadline {
				return condition();
			}
			thread::sleep(pause.min(deadline - now));
			pause = (pause * 2).min(self.max_pause);
		}
	}

	/// Poll like [`until`](Self::until) but panic when the deadline
	/// passes, naming `what` never happened.
	///
	/// # Panics
	/// Panics if the condition does not hold within the deadline.
	pub fn expect<F>(&self, condition: F, what: &str)
	where
		F: Fn() -> bool,
	{
		if !self.until(condition) {
			panic!("gave up after {:?}: {}", self.timeout, what);
		}
	}
}

/// Poll `condition` under the default policy, panicking with `what` when
/// it never holds.
pub fn wait_for<F>(condition: F, what: &str)
where
	F: Fn() -> bool,
{
	Wait::new().expect(condition, what);
}
