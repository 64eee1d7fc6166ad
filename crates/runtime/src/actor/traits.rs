// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Core actor trait and associated types.
//!
//! A behavior is an explicit value: a reducer over `(state, message)`.
//! Protocols with several receive points are expressed as `State` enums
//! whose variants are those points; the handler matches on the variant and
//! returns the next one.

use conflux_core::{ActorConfig, Error};
use tracing::error;

use crate::actor::context::ActorContext;
use crate::actor::envelope::Envelope;

/// What the actor wants to do after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Keep processing messages.
	Continue,
	/// Stop this actor. Its final stop delivery runs and it reaches
	/// `Stopped`.
	Stop,
}

/// The core actor abstraction.
///
/// Actors own their state exclusively, process messages one at a time and
/// communicate only by message passing. The runtime guarantees at most one
/// worker executes a given actor's handler at any instant.
///
/// # Lifecycle
///
/// 1. `init()` creates the state when the actor starts.
/// 2. `handle()` runs per message; `on_timeout()` runs when a configured
///    receive timeout expires with the mailbox empty.
/// 3. `on_stop()` is the final delivery of an orderly stop.
/// 4. `on_failure()` observes handler panics; the actor then stops.
///
/// # Example
///
/// ```ignore
/// struct Counter;
///
/// enum CounterMsg {
///     Increment,
///     Report,
/// }
///
/// impl Actor for Counter {
///     type State = i64;
///     type Message = CounterMsg;
///
///     fn init(&self, _ctx: &ActorContext<Self::Message>) -> Self::State {
///         0
///     }
///
///     fn handle(
///         &self,
///         state: &mut Self::State,
///         message: Envelope<Self::Message>,
///         _ctx: &ActorContext<Self::Message>,
///     ) -> Flow {
///         match message.into_payload() {
///             CounterMsg::Increment => *state += 1,
///             CounterMsg::Report => println!("count: {state}"),
///         }
///         Flow::Continue
///     }
/// }
/// ```
pub trait Actor: Send + Sync + 'static {
	/// The actor's internal state (owned, never shared).
	type State: Send + 'static;

	/// Messages this actor receives.
	type Message: Send + 'static;

	/// Create the initial state. Called once when the actor starts.
	fn init(&self, ctx: &ActorContext<Self::Message>) -> Self::State;

	/// Handle a single message.
	fn handle(
		&self,
		state: &mut Self::State,
		message: Envelope<Self::Message>,
		ctx: &ActorContext<Self::Message>,
	) -> Flow;

	/// Called when the configured receive timeout expires without a
	/// message arriving.
	#[allow(unused_variables)]
	fn on_timeout(&self, state: &mut Self::State, ctx: &ActorContext<Self::Message>) -> Flow {
		Flow::Continue
	}

	/// The final delivery of an orderly stop, before the actor reaches
	/// `Stopped`.
	#[allow(unused_variables)]
	fn on_stop(&self, state: &mut Self::State, ctx: &ActorContext<Self::Message>) {}

	/// Observes a handler failure. The failure never propagates to the
	/// sender; the actor stops afterwards.
	fn on_failure(&self, error: &Error) {
		error!(%error, "actor handler failed");
	}

	/// Actor configuration. Unset fields inherit group defaults.
	fn config(&self) -> ActorConfig {
		ActorConfig::default()
	}
}
