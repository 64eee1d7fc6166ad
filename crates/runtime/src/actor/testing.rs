// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Synchronous test harness for actor behaviors.
//!
//! The harness drives a behavior without spawning threads: messages are
//! queued and processed inline on the test thread, so state can be
//! inspected between steps. Messages the behavior sends to its own
//! reference loop back into the harness queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use conflux_core::Result;

use crate::actor::context::ActorContext;
use crate::actor::envelope::Envelope;
use crate::actor::reference::{ActorPeer, ActorRef, Lifecycle};
use crate::actor::traits::{Actor, Flow};
use crate::dataflow::variable::DataflowVariable;
use crate::group::Group;
use crate::util::lock;

struct HarnessPeer<M: Send + 'static> {
	queue: Mutex<VecDeque<Envelope<M>>>,
	termination: DataflowVariable<()>,
	name: String,
}

impl<M: Send + 'static> ActorPeer<M> for HarnessPeer<M> {
	fn deliver(&self, envelope: Envelope<M>) -> Result<()> {
		lock(&self.queue).push_back(envelope);
		Ok(())
	}

	fn start(&self) -> Result<()> {
		Ok(())
	}

	fn stop(&self) {}

	fn terminate(&self) {}

	fn set_fair(&self, _fair: bool) {}

	fn lifecycle(&self) -> Lifecycle {
		Lifecycle::Running
	}

	fn termination(&self) -> DataflowVariable<()> {
		self.termination.clone()
	}

	fn name(&self) -> &str {
		&self.name
	}
}

/// Drives an [`Actor`] synchronously for tests.
pub struct TestHarness<A: Actor> {
	behavior: A,
	state: A::State,
	ctx: ActorContext<A::Message>,
	peer: Arc<HarnessPeer<A::Message>>,
	stopped: bool,
}

impl<A: Actor> TestHarness<A> {
	pub fn new(behavior: A) -> Self {
		Self::with_group(behavior, Group::default_group().clone())
	}

	pub fn with_group(behavior: A, group: Group) -> Self {
		let peer = Arc::new(HarnessPeer {
			queue: Mutex::new(VecDeque::new()),
			termination: DataflowVariable::new(),
			name: "test-harness".to_string(),
		});
		let reference = ActorRef::new(peer.clone() as Arc<dyn ActorPeer<A::Message>>);
		let ctx = ActorContext::new(reference, group);
		let state = behavior.init(&ctx);
		Self {
			behavior,
			state,
			ctx,
			peer,
			stopped: false,
		}
	}

	/// Queue a message without processing it.
	pub fn send(&self, message: A::Message) {
		lock(&self.peer.queue).push_back(Envelope::new(message));
	}

	/// The reference handed to the behavior as its own address. Sends
	/// loop back into the harness queue.
	pub fn actor_ref(&self) -> ActorRef<A::Message> {
		self.ctx.self_ref()
	}

	/// Process the next queued message. Returns `false` when the queue
	/// is empty or the behavior already stopped.
	pub fn process_one(&mut self) -> bool {
		if self.stopped {
			return false;
		}
		let Some(envelope) = lock(&self.peer.queue).pop_front() else {
			return false;
		};
		match self.behavior.handle(&mut self.state, envelope, &self.ctx) {
			Flow::Continue => {}
			Flow::Stop => {
				self.behavior.on_stop(&mut self.state, &self.ctx);
				self.stopped = true;
			}
		}
		true
	}

	/// Process queued messages until the queue drains or the behavior
	/// stops. Returns the number processed.
	pub fn process_all(&mut self) -> usize {
		let mut processed = 0;
		while self.process_one() {
			processed += 1;
		}
		processed
	}

	pub fn pending(&self) -> usize {
		lock(&self.peer.queue).len()
	}

	pub fn is_stopped(&self) -> bool {
		self.stopped
	}

	pub fn state(&self) -> &A::State {
		&self.state
	}

	pub fn state_mut(&mut self) -> &mut A::State {
		&mut self.state
	}

	pub fn into_state(self) -> A::State {
		self.state
	}
}
