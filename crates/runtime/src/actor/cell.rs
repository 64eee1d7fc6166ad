// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Shared lifecycle and scheduling core of both actor flavors.
//!
//! A cooperative actor holds no worker while idle: `send` enqueues and, if
//! the actor is idle, submits a wake-up to the group pool. The wake-up
//! drains a burst of messages (one when fair), then releases the worker
//! and reschedules itself if the mailbox is non-empty. The state mutex
//! guarantees at most one worker runs a given actor's handler at any
//! instant. Pinned actors reuse the same cell but run their own loop (see
//! the pinned module).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use conflux_core::{Error, Result};
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::actor::context::ActorContext;
use crate::actor::envelope::Envelope;
use crate::actor::pinned;
use crate::actor::timers;
use crate::actor::reference::{ActorHandle, ActorPeer, ActorRef, Lifecycle};
use crate::actor::traits::{Actor, Flow};
use crate::dataflow::variable::DataflowVariable;
use crate::group::Group;
use crate::mailbox::Mailbox;
use crate::util::{lock, panic_message};

/// Maximum messages an unfair actor drains per wake before yielding its
/// worker.
pub(crate) const BATCH_LIMIT: usize = 64;

pub(crate) const CREATED: u8 = 0;
pub(crate) const RUNNING: u8 = 1;
pub(crate) const STOPPING: u8 = 2;
pub(crate) const STOPPED: u8 = 3;

static ACTOR_SEQ: AtomicU64 = AtomicU64::new(0);

fn lifecycle_from(raw: u8) -> Lifecycle {
	match raw {
		CREATED => Lifecycle::Created,
		RUNNING => Lifecycle::Running,
		STOPPING => Lifecycle::Stopping,
		_ => Lifecycle::Stopped,
	}
}

/// Mailbox item: user messages plus the stop and timeout sentinels.
pub(crate) enum Item<M: Send + 'static> {
	Message(Envelope<M>),
	/// Receive-timeout sentinel, valid only for the generation it was
	/// armed against.
	Timeout(u64),
	Stop,
}

/// What a single handler invocation decided.
pub(crate) enum Step {
	Continue,
	Finish,
}

pub(crate) struct ActorCell<A: Actor> {
	pub(crate) behavior: A,
	pub(crate) mailbox: Mailbox<Item<A::Message>>,
	pub(crate) state: Mutex<Option<A::State>>,
	pub(crate) lifecycle: AtomicU8,
	scheduled: AtomicBool,
	fair: AtomicBool,
	pub(crate) pinned: bool,
	pub(crate) receive_timeout: Option<Duration>,
	/// Bumped on every delivery; invalidates armed timeout sentinels.
	generation: AtomicU64,
	stop_ran: AtomicBool,
	pub(crate) group: Group,
	pub(crate) name: String,
	termination: DataflowVariable<()>,
	me: OnceCell<Weak<ActorCell<A>>>,
	self_ref: OnceCell<ActorRef<A::Message>>,
}

impl<A: Actor> ActorCell<A> {
	pub(crate) fn create(group: Group, behavior: A, pinned: bool) -> ActorHandle<A::Message> {
		let config = behavior.config();
		let name = config
			.name
			.clone()
			.unwrap_or_else(|| format!("actor-{}", ACTOR_SEQ.fetch_add(1, Ordering::Relaxed)));
		let fair = config.fair.unwrap_or_else(|| group.fair_default());
		let cell = Arc::new(ActorCell {
			behavior,
			mailbox: Mailbox::new(config.mailbox_capacity),
			state: Mutex::new(None),
			lifecycle: AtomicU8::new(CREATED),
			scheduled: AtomicBool::new(false),
			fair: AtomicBool::new(fair),
			pinned,
			receive_timeout: config.receive_timeout,
			generation: AtomicU64::new(0),
			stop_ran: AtomicBool::new(false),
			group,
			name,
			termination: DataflowVariable::new(),
			me: OnceCell::new(),
			self_ref: OnceCell::new(),
		});
		let _ = cell.me.set(Arc::downgrade(&cell));
		let reference = ActorRef::new(cell.clone() as Arc<dyn ActorPeer<A::Message>>);
		let _ = cell.self_ref.set(reference.clone());
		ActorHandle::new(reference)
	}

	fn me_arc(&self) -> Option<Arc<Self>> {
		self.me.get().and_then(Weak::upgrade)
	}

	pub(crate) fn context(&self) -> ActorContext<A::Message> {
		let reference = self.self_ref.get().expect("actor reference installed at creation").clone();
		ActorContext::new(reference, self.group.clone())
	}

	/// Run one handler invocation behind the panic boundary. `None`
	/// delivers the receive-timeout signal.
	pub(crate) fn invoke(
		&self,
		slot: &mut Option<A::State>,
		envelope: Option<Envelope<A::Message>>,
		ctx: &ActorContext<A::Message>,
	) -> Step {
		let Some(state) = slot.as_mut() else {
			return Step::Finish;
		};
		let outcome = catch_unwind(AssertUnwindSafe(|| match envelope {
			Some(envelope) => self.behavior.handle(state, envelope, ctx),
			None => self.behavior.on_timeout(state, ctx),
		}));
		match outcome {
			Ok(Flow::Continue) => Step::Continue,
			Ok(Flow::Stop) => Step::Finish,
			Err(payload) => {
				let error = Error::handler_failure(self.name.as_str(), panic_message(payload));
				self.behavior.on_failure(&error);
				Step::Finish
			}
		}
	}

	/// Final transition: one stop delivery, then `Stopped`, mailbox
	/// discarded, termination latch bound. Idempotent.
	pub(crate) fn finish(&self, slot: &mut Option<A::State>, ctx: &ActorContext<A::Message>) {
		if self.stop_ran.swap(true, Ordering::AcqRel) {
			return;
		}
		self.lifecycle.store(STOPPING, Ordering::Release);
		if let Some(state) = slot.as_mut() {
			let _ = catch_unwind(AssertUnwindSafe(|| self.behavior.on_stop(state, ctx)));
		}
		self.lifecycle.store(STOPPED, Ordering::Release);
		self.mailbox.close_and_drain();
		let _ = self.termination.bind_unique(());
		debug!(actor = %self.name, "actor stopped");
	}

	/// Schedule a wake-up unless one is already pending or running.
	fn wake(cell: &Arc<Self>) {
		if cell.pinned || cell.lifecycle.load(Ordering::Acquire) == CREATED {
			return;
		}
		if cell.scheduled.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
			let batch = cell.clone();
			if cell.group.schedule(move || Self::run_batch(batch)).is_err() {
				cell.scheduled.store(false, Ordering::Release);
			}
		}
	}

	/// Drain a burst of messages on the current worker.
	fn run_batch(cell: Arc<Self>) {
		let ctx = cell.context();
		let mut slot = lock(&cell.state);
		if slot.is_none() && cell.lifecycle.load(Ordering::Acquire) != STOPPED {
			*slot = Some(cell.behavior.init(&ctx));
		}
		let mut processed = 0usize;
		let mut finish = false;
		loop {
			if cell.lifecycle.load(Ordering::Acquire) == STOPPED || cell.group.is_cancelled() {
				finish = true;
				break;
			}
			match cell.mailbox.try_dequeue() {
				None => break,
				Some(Item::Stop) => {
					finish = true;
					break;
				}
				Some(Item::Timeout(generation)) => {
					if generation != cell.generation.load(Ordering::Acquire) {
						continue;
					}
					match cell.invoke(&mut slot, None, &ctx) {
						Step::Continue => {}
						Step::Finish => {
							finish = true;
							break;
						}
					}
				}
				Some(Item::Message(envelope)) => match cell.invoke(&mut slot, Some(envelope), &ctx) {
					Step::Continue => {
						processed += 1;
						if cell.fair.load(Ordering::Relaxed) || processed >= BATCH_LIMIT {
							break;
						}
					}
					Step::Finish => {
						finish = true;
						break;
					}
				},
			}
		}
		if finish {
			cell.finish(&mut slot, &ctx);
		}
		drop(slot);
		Self::release(&cell);
	}

	/// Hand the worker back and reschedule if messages arrived
	/// meanwhile.
	fn release(cell: &Arc<Self>) {
		cell.scheduled.store(false, Ordering::Release);
		let lifecycle = cell.lifecycle.load(Ordering::Acquire);
		if lifecycle == STOPPED {
			if !cell.stop_ran.load(Ordering::Acquire) {
				// terminated mid-flight; run the cleanup on a worker
				Self::wake(cell);
			}
			return;
		}
		if !cell.mailbox.is_empty() {
			Self::wake(cell);
		} else if let Some(timeout) = cell.receive_timeout {
			if lifecycle == RUNNING {
				Self::arm_idle_timer(cell, timeout);
			}
		}
	}

	/// Deliver a timeout sentinel if the actor is still idle in the same
	/// generation when `timeout` elapses.
	fn arm_idle_timer(cell: &Arc<Self>, timeout: Duration) {
		let generation = cell.generation.load(Ordering::Acquire);
		let weak = Arc::downgrade(cell);
		timers::schedule_callback(timeout, move || {
			let Some(cell) = weak.upgrade() else {
				return;
			};
			if cell.generation.load(Ordering::Acquire) == generation
				&& cell.lifecycle.load(Ordering::Acquire) == RUNNING
				&& cell.mailbox.is_empty()
				&& cell.mailbox.push_control(Item::Timeout(generation)).is_ok()
			{
				Self::wake(&cell);
			}
		});
	}
}

impl<A: Actor> ActorPeer<A::Message> for ActorCell<A> {
	fn deliver(&self, envelope: Envelope<A::Message>) -> Result<()> {
		match self.lifecycle.load(Ordering::Acquire) {
			CREATED | RUNNING => {}
			_ => return Err(Error::MailboxClosed),
		}
		self.generation.fetch_add(1, Ordering::AcqRel);
		self.mailbox.enqueue(Item::Message(envelope))?;
		if !self.pinned {
			if let Some(cell) = self.me_arc() {
				Self::wake(&cell);
			}
		}
		Ok(())
	}

	fn start(&self) -> Result<()> {
		if self.lifecycle.compare_exchange(CREATED, RUNNING, Ordering::AcqRel, Ordering::Acquire).is_err() {
			return Ok(());
		}
		debug!(actor = %self.name, pinned = self.pinned, "actor started");
		let Some(cell) = self.me_arc() else {
			return Ok(());
		};
		if self.pinned {
			let runner = cell.clone();
			if self.group.schedule(move || pinned::run_pinned(runner)).is_err() {
				self.lifecycle.store(STOPPED, Ordering::Release);
				self.stop_ran.store(true, Ordering::Release);
				self.mailbox.close_and_drain();
				let _ = self.termination.bind_unique(());
				return Err(Error::PoolShutdown);
			}
		} else if !self.mailbox.is_empty() {
			Self::wake(&cell);
		} else if let Some(timeout) = self.receive_timeout {
			Self::arm_idle_timer(&cell, timeout);
		}
		Ok(())
	}

	fn stop(&self) {
		// an actor that never started has no state to deliver a final
		// stop to
		if self.lifecycle.compare_exchange(CREATED, STOPPED, Ordering::AcqRel, Ordering::Acquire).is_ok() {
			self.stop_ran.store(true, Ordering::Release);
			self.mailbox.close_and_drain();
			let _ = self.termination.bind_unique(());
			return;
		}
		if self.lifecycle.compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire).is_ok() {
			let _ = self.mailbox.close_with(Item::Stop);
			if !self.pinned {
				if let Some(cell) = self.me_arc() {
					Self::wake(&cell);
				}
			}
		}
	}

	fn terminate(&self) {
		let previous = self.lifecycle.swap(STOPPED, Ordering::AcqRel);
		if previous == STOPPED {
			return;
		}
		self.mailbox.close_and_drain();
		if previous == CREATED {
			self.stop_ran.store(true, Ordering::Release);
			let _ = self.termination.bind_unique(());
			return;
		}
		if self.pinned {
			// the pinned loop observes the discarded mailbox and
			// finishes there
			return;
		}
		let Some(cell) = self.me_arc() else {
			return;
		};
		if self.scheduled.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
			let cleanup = cell.clone();
			if self.group.schedule(move || Self::run_batch(cleanup)).is_err() {
				self.scheduled.store(false, Ordering::Release);
				let ctx = self.context();
				let mut slot = lock(&self.state);
				self.finish(&mut slot, &ctx);
			}
		}
		// a batch in flight observes `Stopped` and runs the cleanup in
		// its release step
	}

	fn set_fair(&self, fair: bool) {
		self.fair.store(fair, Ordering::Relaxed);
	}

	fn lifecycle(&self) -> Lifecycle {
		lifecycle_from(self.lifecycle.load(Ordering::Acquire))
	}

	fn termination(&self) -> DataflowVariable<()> {
		self.termination.clone()
	}

	fn name(&self) -> &str {
		&self.name
	}
}
