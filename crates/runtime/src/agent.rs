// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Serializing mutator over a single owned value.
//!
//! An agent applies update functions in arrival order against its value,
//! using a cooperative actor internally. Reads are serialized behind the
//! pending updates, so a snapshot observes the value as of the read's
//! position in the queue.

use std::sync::Mutex;

use conflux_core::{Error, Result};

use crate::actor::context::ActorContext;
use crate::actor::envelope::Envelope;
use crate::actor::reference::ActorHandle;
use crate::actor::traits::{Actor, Flow};
use crate::dataflow::variable::DataflowVariable;
use crate::group::Group;
use crate::util::lock;

/// An update operation applied against the agent's value.
pub type Update<T> = Box<dyn FnOnce(&mut T) + Send + 'static>;

struct AgentBehavior<T: Send + 'static> {
	initial: Mutex<Option<T>>,
}

impl<T: Send + 'static> Actor for AgentBehavior<T> {
	type State = T;
	type Message = Update<T>;

	fn init(&self, _ctx: &ActorContext<Self::Message>) -> T {
		lock(&self.initial).take().expect("agent started once")
	}

	fn handle(&self, state: &mut T, message: Envelope<Update<T>>, _ctx: &ActorContext<Update<T>>) -> Flow {
		(message.into_payload())(state);
		Flow::Continue
	}
}

/// A serializing container for mutable state.
pub struct Agent<T: Send + 'static> {
	handle: ActorHandle<Update<T>>,
}

impl<T: Send + 'static> Clone for Agent<T> {
	fn clone(&self) -> Self {
		Self {
			handle: self.handle.clone(),
		}
	}
}

impl<T: Send + 'static> Agent<T> {
	pub fn new(group: &Group, initial: T) -> Result<Self> {
		let handle = group.spawn(AgentBehavior {
			initial: Mutex::new(Some(initial)),
		})?;
		Ok(Self {
			handle,
		})
	}

	/// Queue an update; it is applied after every update queued before
	/// it.
	pub fn send(&self, update: impl FnOnce(&mut T) + Send + 'static) -> Result<()> {
		self.handle.send(Box::new(update))
	}

	/// Queue an update and block until it has been applied.
	pub fn send_and_wait(&self, update: impl FnOnce(&mut T) + Send + 'static) -> Result<()> {
		let done = DataflowVariable::<()>::new();
		let latch = done.clone();
		self.send(move |state| {
			update(state);
			let _ = latch.bind_unique(());
		})?;
		done.get().map(|_| ())
	}

	/// A snapshot of the value, observed after all updates queued before
	/// this call have been applied.
	pub fn value(&self) -> Result<T>
	where
		T: Clone,
	{
		self.value_with(T::clone)
	}

	/// A projection of the value produced by `copy`, serialized the same
	/// way as [`value`](Self::value). Use this to hand out defensive
	/// copies of aliasable state.
	pub fn value_with<R, F>(&self, copy: F) -> Result<R>
	where
		R: Send + 'static,
		F: FnOnce(&T) -> R + Send + 'static,
	{
		let (sender, receiver) = crossbeam_channel::bounded(1);
		self.send(move |state| {
			let _ = sender.send(copy(state));
		})?;
		receiver.recv().map_err(|_| Error::MailboxClosed)
	}

	/// The lifecycle handle of the underlying actor.
	pub fn handle(&self) -> &ActorHandle<Update<T>> {
		&self.handle
	}

	/// Orderly stop; pending updates are still applied.
	pub fn stop(&self) {
		self.handle.stop();
	}
}
