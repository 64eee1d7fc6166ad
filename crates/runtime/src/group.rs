// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Unit of shared scheduling: a pool plus a fairness default.
//!
//! Groups are cheap clones of one shared inner. Every primitive (actors,
//! agents, tasks, operators, selectors) is created through a group factory
//! and scheduled on the group's pool. Shutdown cascades: a shutdown flag
//! asks participants to reach a safe stopping point, then the pool stops
//! accepting work.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use conflux_core::{GroupConfig, Result};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::actor::cell::ActorCell;
use crate::actor::closure::ClosureActor;
use crate::actor::context::ActorContext;
use crate::actor::envelope::Envelope;
use crate::actor::reference::ActorHandle;
use crate::actor::traits::{Actor, Flow};
use crate::agent::Agent;
use crate::context::AmbientScope;
use crate::dataflow::stream::DataflowStream;
use crate::dataflow::variable::DataflowVariable;
use crate::pool::{Job, Pool};

static GROUP_SEQ: AtomicU64 = AtomicU64::new(0);

struct Inner {
	name: String,
	pool: Pool,
	fair: bool,
	/// Set once at shutdown; participants poll it at their safe points.
	cancelled: AtomicBool,
}

impl Drop for Inner {
	fn drop(&mut self) {
		self.cancelled.store(true, Ordering::Release);
	}
}

/// Owner of a pool and factory for the primitives scheduled on it.
#[derive(Clone)]
pub struct Group {
	inner: Arc<Inner>,
}

impl Group {
	pub fn new(config: GroupConfig) -> Self {
		let name = config
			.name
			.clone()
			.unwrap_or_else(|| format!("group-{}", GROUP_SEQ.fetch_add(1, Ordering::Relaxed)));
		let pool = Pool::new(name.clone(), config.pool_kind, config.pool_size, config.daemon);
		debug!(group = %name, kind = ?config.pool_kind, "group created");
		Self {
			inner: Arc::new(Inner {
				name,
				pool,
				fair: config.fair,
				cancelled: AtomicBool::new(false),
			}),
		}
	}

	/// The group backing dataflow constructs created outside any pool
	/// work: a daemon fork-join pool sized to the machine.
	pub fn default_group() -> &'static Group {
		static DEFAULT: Lazy<Group> = Lazy::new(|| Group::new(GroupConfig::default().with_name("dataflow-default")));
		&DEFAULT
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn pool(&self) -> &Pool {
		&self.inner.pool
	}

	/// Fairness default inherited by cooperative actors of this group.
	pub fn fair_default(&self) -> bool {
		self.inner.fair
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::Acquire)
	}

	/// Ask participants to stop at a safe point, then shut the pool
	/// down. Actors stop between messages; operators stop after the
	/// current firing.
	pub fn shutdown(&self) {
		debug!(group = %self.inner.name, "group shutting down");
		self.inner.cancelled.store(true, Ordering::Release);
		self.inner.pool.shutdown();
	}

	/// Submit one unit of work wrapped in this group's ambient scope.
	pub fn schedule(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
		self.inner.pool.submit(self.wrap(job))
	}

	/// Like [`schedule`](Self::schedule), but runs the job inline when
	/// the pool no longer accepts work, so the job fires exactly once
	/// either way.
	pub(crate) fn schedule_or_inline(&self, job: impl FnOnce() + Send + 'static) {
		if let Err(job) = self.inner.pool.try_submit(self.wrap(job)) {
			job();
		}
	}

	fn wrap(&self, job: impl FnOnce() + Send + 'static) -> Job {
		let group = self.clone();
		Box::new(move || {
			let _ambient = AmbientScope::enter(&group);
			job();
		})
	}

	// ---- factories -------------------------------------------------

	/// A fresh unbound dataflow variable.
	pub fn variable<T: Send + Sync + 'static>(&self) -> DataflowVariable<T> {
		DataflowVariable::new()
	}

	/// A fresh unbounded stream.
	pub fn stream<T: Send + Sync + 'static>(&self) -> DataflowStream<T> {
		DataflowStream::new()
	}

	/// A stream whose writers suspend at `capacity` unread values.
	pub fn bounded_stream<T: Send + Sync + 'static>(&self, capacity: usize) -> DataflowStream<T> {
		DataflowStream::bounded(capacity)
	}

	/// Create and start a cooperative actor. It holds no worker while
	/// idle.
	pub fn spawn<A: Actor>(&self, actor: A) -> Result<ActorHandle<A::Message>> {
		let handle = self.spawn_unstarted(actor);
		handle.start()?;
		Ok(handle)
	}

	/// Create a cooperative actor without starting it.
	pub fn spawn_unstarted<A: Actor>(&self, actor: A) -> ActorHandle<A::Message> {
		ActorCell::create(self.clone(), actor, false)
	}

	/// Create and start a thread-bound actor. It occupies one pool
	/// worker for its whole life.
	pub fn spawn_pinned<A: Actor>(&self, actor: A) -> Result<ActorHandle<A::Message>> {
		let handle = self.spawn_pinned_unstarted(actor);
		handle.start()?;
		Ok(handle)
	}

	/// Create a thread-bound actor without starting it.
	pub fn spawn_pinned_unstarted<A: Actor>(&self, actor: A) -> ActorHandle<A::Message> {
		ActorCell::create(self.clone(), actor, true)
	}

	/// Create and start a cooperative actor from a plain handler
	/// closure.
	pub fn spawn_fn<S, M, F>(&self, initial: S, handler: F) -> Result<ActorHandle<M>>
	where
		S: Send + 'static,
		M: Send + 'static,
		F: Fn(&mut S, Envelope<M>, &ActorContext<M>) -> Flow + Send + Sync + 'static,
	{
		self.spawn(ClosureActor::new(initial, handler))
	}

	/// A serializing container for mutable state.
	pub fn agent<T: Send + 'static>(&self, initial: T) -> Result<Agent<T>> {
		Agent::new(self, initial)
	}
}
