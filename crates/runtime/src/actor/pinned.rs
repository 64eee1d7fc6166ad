// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Thread-bound actor runner.
//!
//! A pinned actor acquires one pool worker for the duration of its life
//! and blocks it on the mailbox between messages. The blocking dequeue
//! uses a short timeout so group cancellation is observed promptly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::actor::cell::{ActorCell, Item, Step, STOPPED};
use crate::actor::traits::Actor;
use crate::util::lock;

/// Interval for checking cancellation while blocked on an empty mailbox.
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// The dedicated message loop of a pinned actor. Submitted to the pool by
/// `start()` and occupies its worker until the actor stops.
pub(crate) fn run_pinned<A: Actor>(cell: Arc<ActorCell<A>>) {
	let ctx = cell.context();
	let mut slot = lock(&cell.state);
	if slot.is_none() {
		*slot = Some(cell.behavior.init(&ctx));
	}
	debug!(actor = %cell.name, "pinned actor loop started");
	let mut last_activity = Instant::now();
	loop {
		if cell.lifecycle.load(std::sync::atomic::Ordering::Acquire) == STOPPED || cell.group.is_cancelled() {
			break;
		}
		match cell.mailbox.dequeue_timeout(SHUTDOWN_CHECK_INTERVAL) {
			Ok(Some(Item::Stop)) => break,
			Ok(Some(Item::Timeout(_))) => {
				// cooperative-only sentinel; the pinned loop tracks
				// idleness itself
			}
			Ok(Some(Item::Message(envelope))) => {
				last_activity = Instant::now();
				match cell.invoke(&mut slot, Some(envelope), &ctx) {
					Step::Continue => {}
					Step::Finish => break,
				}
			}
			Ok(None) => {
				if let Some(timeout) = cell.receive_timeout {
					if last_activity.elapsed() >= timeout {
						last_activity = Instant::now();
						match cell.invoke(&mut slot, None, &ctx) {
							Step::Continue => {}
							Step::Finish => break,
						}
					}
				}
			}
			Err(_) => break,
		}
	}
	cell.finish(&mut slot, &ctx);
	drop(slot);
	debug!(actor = %cell.name, "pinned actor loop finished");
}
