// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Actor execution context.
//!
//! The context gives a handler access to its own reference (to hand to
//! other actors), the owning group, shutdown status and timer scheduling.

use std::time::Duration;

use crate::actor::reference::ActorRef;
use crate::actor::timers::{self, TimerHandle};
use crate::group::Group;

/// Context provided to an actor's handler while it executes.
pub struct ActorContext<M: Send + 'static> {
	self_ref: ActorRef<M>,
	group: Group,
}

impl<M: Send + 'static> ActorContext<M> {
	pub(crate) fn new(self_ref: ActorRef<M>, group: Group) -> Self {
		Self {
			self_ref,
			group,
		}
	}

	/// A reference to this actor, suitable for handing to peers.
	pub fn self_ref(&self) -> ActorRef<M> {
		self.self_ref.clone()
	}

	/// The group this actor belongs to.
	pub fn group(&self) -> &Group {
		&self.group
	}

	/// Whether the owning group requested shutdown.
	pub fn is_cancelled(&self) -> bool {
		self.group.is_cancelled()
	}

	/// Schedule a message to this actor after a delay. The returned
	/// handle cancels the timer.
	pub fn schedule_once(&self, delay: Duration, message: M) -> TimerHandle {
		timers::schedule_once(self.self_ref.clone(), delay, message)
	}
}

impl<M: Send + Clone + 'static> ActorContext<M> {
	/// Schedule a message to this actor repeatedly at an interval, until
	/// cancelled or the actor stops.
	pub fn schedule_repeat(&self, interval: Duration, message: M) -> TimerHandle {
		timers::schedule_repeat(self.self_ref.clone(), interval, message)
	}
}

impl<M: Send + 'static> Clone for ActorContext<M> {
	fn clone(&self) -> Self {
		Self {
			self_ref: self.self_ref.clone(),
			group: self.group.clone(),
		}
	}
}
