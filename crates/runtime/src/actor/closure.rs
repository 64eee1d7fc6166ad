// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Closure-based actor behavior for callers that do not want to name a
//! type.

use std::marker::PhantomData;
use std::sync::Mutex;

use conflux_core::ActorConfig;

use crate::actor::context::ActorContext;
use crate::actor::envelope::Envelope;
use crate::actor::traits::{Actor, Flow};
use crate::util::lock;

/// An [`Actor`] whose behavior is a plain handler closure over an initial
/// state value.
pub struct ClosureActor<S, M, F>
where
	S: Send + 'static,
	M: Send + 'static,
	F: Fn(&mut S, Envelope<M>, &ActorContext<M>) -> Flow + Send + Sync + 'static,
{
	initial: Mutex<Option<S>>,
	handler: F,
	config: ActorConfig,
	_message: PhantomData<fn(M)>,
}

impl<S, M, F> ClosureActor<S, M, F>
where
	S: Send + 'static,
	M: Send + 'static,
	F: Fn(&mut S, Envelope<M>, &ActorContext<M>) -> Flow + Send + Sync + 'static,
{
	pub fn new(initial: S, handler: F) -> Self {
		Self {
			initial: Mutex::new(Some(initial)),
			handler,
			config: ActorConfig::default(),
			_message: PhantomData,
		}
	}

	pub fn with_config(mut self, config: ActorConfig) -> Self {
		self.config = config;
		self
	}
}

impl<S, M, F> Actor for ClosureActor<S, M, F>
where
	S: Send + 'static,
	M: Send + 'static,
	F: Fn(&mut S, Envelope<M>, &ActorContext<M>) -> Flow + Send + Sync + 'static,
{
	type State = S;
	type Message = M;

	fn init(&self, _ctx: &ActorContext<M>) -> S {
		lock(&self.initial).take().expect("closure actor started once")
	}

	fn handle(&self, state: &mut S, message: Envelope<M>, ctx: &ActorContext<M>) -> Flow {
		(self.handler)(state, message, ctx)
	}

	fn config(&self) -> ActorConfig {
		self.config.clone()
	}
}
