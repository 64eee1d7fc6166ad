// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! The ambient group of the current unit of work.
//!
//! Every job a [`Group`](crate::group::Group) submits to its pool runs
//! inside an [`AmbientScope`]: a worker-local slot that names the group the
//! job belongs to. Dataflow constructs created while the slot is occupied
//! (`when_bound` handlers, nested tasks) inherit that group. The slot's
//! lifetime strictly brackets one unit of work, so group identity never
//! leaks between unrelated jobs sharing a worker.

use std::cell::RefCell;

use crate::group::Group;

thread_local! {
	static AMBIENT_GROUP: RefCell<Option<Group>> = const { RefCell::new(None) };
}

/// The group of the unit of work currently executing on this thread, if
/// any.
pub fn current_group() -> Option<Group> {
	AMBIENT_GROUP.with(|slot| slot.borrow().clone())
}

/// Occupies the ambient slot for the duration of one unit of work and
/// restores the previous occupant on drop, so nested scopes compose.
pub(crate) struct AmbientScope {
	previous: Option<Group>,
}

impl AmbientScope {
	pub(crate) fn enter(group: &Group) -> Self {
		let previous = AMBIENT_GROUP.with(|slot| slot.borrow_mut().replace(group.clone()));
		Self {
			previous,
		}
	}
}

impl Drop for AmbientScope {
	fn drop(&mut self) {
		let previous = self.previous.take();
		AMBIENT_GROUP.with(|slot| *slot.borrow_mut() = previous);
	}
}
