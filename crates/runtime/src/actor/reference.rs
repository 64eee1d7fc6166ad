// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Handles for interacting with a running actor.
//!
//! [`ActorRef`] is the cloneable send-side address; [`ActorHandle`] adds
//! lifecycle control (start, stop, terminate, join) for the creator.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use conflux_core::{Error, Result};

use crate::actor::envelope::Envelope;
use crate::dataflow::variable::DataflowVariable;

/// Lifecycle of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
	Created,
	Running,
	Stopping,
	Stopped,
}

/// Scheduler-side surface of an actor, object-safe so references can be
/// passed around without naming the behavior type.
pub(crate) trait ActorPeer<M: Send + 'static>: Send + Sync {
	fn deliver(&self, envelope: Envelope<M>) -> Result<()>;
	fn start(&self) -> Result<()>;
	fn stop(&self);
	fn terminate(&self);
	fn set_fair(&self, fair: bool);
	fn lifecycle(&self) -> Lifecycle;
	fn termination(&self) -> DataflowVariable<()>;
	fn name(&self) -> &str;
}

/// Cloneable address of an actor.
pub struct ActorRef<M: Send + 'static> {
	peer: Arc<dyn ActorPeer<M>>,
}

impl<M: Send + 'static> Clone for ActorRef<M> {
	fn clone(&self) -> Self {
		Self {
			peer: self.peer.clone(),
		}
	}
}

impl<M: Send + 'static> ActorRef<M> {
	pub(crate) fn new(peer: Arc<dyn ActorPeer<M>>) -> Self {
		Self {
			peer,
		}
	}

	/// Deliver `message` to the actor's mailbox. Suspends the caller on
	/// a full bounded mailbox; fails with [`Error::MailboxClosed`] once
	/// the actor is stopping or stopped.
	pub fn send(&self, message: M) -> Result<()> {
		self.peer.deliver(Envelope::new(message))
	}

	/// Deliver `message` carrying `reply_to` as the reply address.
	pub fn send_with_reply(&self, message: M, reply_to: &ActorRef<M>) -> Result<()> {
		self.peer.deliver(Envelope::with_reply(message, reply_to.clone()))
	}

	pub(crate) fn deliver(&self, envelope: Envelope<M>) -> Result<()> {
		self.peer.deliver(envelope)
	}

	pub fn name(&self) -> &str {
		self.peer.name()
	}

	pub fn lifecycle(&self) -> Lifecycle {
		self.peer.lifecycle()
	}

	pub fn is_stopped(&self) -> bool {
		self.peer.lifecycle() == Lifecycle::Stopped
	}
}

impl<M: Send + 'static> fmt::Debug for ActorRef<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActorRef").field("name", &self.name()).field("lifecycle", &self.lifecycle()).finish()
	}
}

/// Lifecycle-owning handle returned by the group factories.
pub struct ActorHandle<M: Send + 'static> {
	reference: ActorRef<M>,
}

impl<M: Send + 'static> Clone for ActorHandle<M> {
	fn clone(&self) -> Self {
		Self {
			reference: self.reference.clone(),
		}
	}
}

impl<M: Send + 'static> ActorHandle<M> {
	pub(crate) fn new(reference: ActorRef<M>) -> Self {
		Self {
			reference,
		}
	}

	pub fn actor_ref(&self) -> ActorRef<M> {
		self.reference.clone()
	}

	pub fn send(&self, message: M) -> Result<()> {
		self.reference.send(message)
	}

	/// Transition the actor from `Created` to `Running`. Idempotent.
	pub fn start(&self) -> Result<()> {
		self.reference.peer.start()
	}

	/// Orderly stop: no further messages are accepted, everything
	/// already queued is handled, then a final stop delivery runs and
	/// the actor reaches `Stopped`.
	pub fn stop(&self) {
		self.reference.peer.stop();
	}

	/// Immediate stop: queued messages are discarded; the currently
	/// executing handler (if any) runs to completion.
	pub fn terminate(&self) {
		self.reference.peer.terminate();
	}

	/// Make a cooperative actor release its worker after every message.
	pub fn make_fair(&self) {
		self.reference.peer.set_fair(true);
	}

	pub fn lifecycle(&self) -> Lifecycle {
		self.reference.lifecycle()
	}

	pub fn name(&self) -> &str {
		self.reference.name()
	}

	/// Block until the actor reaches `Stopped`.
	pub fn join(&self) -> Result<()> {
		self.reference.peer.termination().get().map(|_| ())
	}

	/// Block until the actor reaches `Stopped`, failing with
	/// [`Error::Timeout`] on expiry.
	pub fn join_timeout(&self, timeout: Duration) -> Result<()> {
		match self.reference.peer.termination().get_timeout(timeout)? {
			Some(_) => Ok(()),
			None => Err(Error::Timeout),
		}
	}
}

impl<M: Send + 'static> fmt::Debug for ActorHandle<M> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActorHandle").field("name", &self.name()).field("lifecycle", &self.lifecycle()).finish()
	}
}
