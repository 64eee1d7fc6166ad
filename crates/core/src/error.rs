// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! The error kinds every participant of the runtime can surface.
//!
//! Errors are `Clone` on purpose: a failure can be stored inside a dataflow
//! variable and observed by any number of readers.

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by pools, mailboxes, actors and dataflow primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// A second `bind` with a different value was attempted on a
	/// dataflow variable.
	#[error("dataflow variable is already bound")]
	AlreadyBound,

	/// A message was sent to an actor that no longer accepts messages.
	#[error("mailbox is closed")]
	MailboxClosed,

	/// `reply` was called for a message that carries no reply address.
	#[error("message has no reply address")]
	NoReplyTo,

	/// User code inside a handler or body returned an error or panicked.
	/// The owning participant transitions to `Stopped`.
	#[error("handler of `{participant}` failed: {detail}")]
	HandlerFailure {
		participant: String,
		detail: String,
	},

	/// A bounded-time wait expired. Not terminal: the awaited state is
	/// unchanged and the wait may be retried.
	#[error("wait timed out")]
	Timeout,

	/// A unit of work was submitted after the owning pool was shut down.
	#[error("pool is shut down")]
	PoolShutdown,
}

impl Error {
	/// Build a [`Error::HandlerFailure`] for the named participant.
	pub fn handler_failure(participant: impl Into<String>, detail: impl Into<String>) -> Self {
		Self::HandlerFailure {
			participant: participant.into(),
			detail: detail.into(),
		}
	}
}
