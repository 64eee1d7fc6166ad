// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Message envelope: an opaque payload plus an optional reply address.

use conflux_core::{Error, Result};

use crate::actor::reference::ActorRef;

/// A message as delivered to an actor's handler.
pub struct Envelope<M: Send + 'static> {
	payload: M,
	reply_to: Option<ActorRef<M>>,
}

impl<M: Send + 'static> Envelope<M> {
	pub fn new(payload: M) -> Self {
		Self {
			payload,
			reply_to: None,
		}
	}

	pub fn with_reply(payload: M, reply_to: ActorRef<M>) -> Self {
		Self {
			payload,
			reply_to: Some(reply_to),
		}
	}

	pub fn payload(&self) -> &M {
		&self.payload
	}

	pub fn into_payload(self) -> M {
		self.payload
	}

	/// The sender's reply address, when the message carries one.
	pub fn sender(&self) -> Option<&ActorRef<M>> {
		self.reply_to.as_ref()
	}

	/// Send `message` to this message's reply address.
	///
	/// Fails with [`Error::NoReplyTo`] when the message carries none.
	pub fn reply(&self, message: M) -> Result<()> {
		match &self.reply_to {
			Some(reply_to) => reply_to.send(message),
			None => Err(Error::NoReplyTo),
		}
	}

	pub fn into_parts(self) -> (M, Option<ActorRef<M>>) {
		(self.payload, self.reply_to)
	}
}
