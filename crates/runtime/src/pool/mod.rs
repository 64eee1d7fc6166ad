// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Worker-thread scheduler executing submitted units of work.
//!
//! A pool makes no fairness guarantee between unrelated jobs; fairness
//! between cooperating participants is the responsibility of the layers
//! above (see the cooperative actor mode).

use std::num::NonZeroUsize;
use std::time::Duration;

use conflux_core::{Error, PoolKind, PoolSize, Result};

mod fixed;
mod forkjoin;

use fixed::ThreadPool;
use forkjoin::ForkJoinPool;

/// A unit of work. Runs exactly once on some worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Idle keep-alive of surplus workers in a cached pool.
const CACHED_KEEP_ALIVE: Duration = Duration::from_secs(30);

enum Engine {
	ForkJoin(ForkJoinPool),
	Threads(ThreadPool),
}

/// A worker-thread scheduler owned by a group.
pub struct Pool {
	engine: Engine,
}

fn default_parallelism() -> usize {
	std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

impl Pool {
	pub fn new(name: String, kind: PoolKind, size: PoolSize, daemon: bool) -> Self {
		let workers = match size {
			PoolSize::Auto => None,
			PoolSize::Workers(workers) => Some(workers.max(1)),
		};
		let engine = match kind {
			PoolKind::ForkJoin => Engine::ForkJoin(ForkJoinPool::new(name, workers, daemon)),
			PoolKind::Fixed => {
				Engine::Threads(ThreadPool::fixed(name, workers.unwrap_or_else(default_parallelism), daemon))
			}
			PoolKind::Cached => {
				Engine::Threads(ThreadPool::cached(name, workers.unwrap_or(0), CACHED_KEEP_ALIVE, daemon))
			}
		};
		Self {
			engine,
		}
	}

	/// Enqueue a unit of work; it runs exactly once on some worker.
	///
	/// Fails with [`Error::PoolShutdown`] after [`shutdown`](Self::shutdown).
	pub fn submit(&self, job: Job) -> Result<()> {
		self.try_submit(job).map_err(|_| Error::PoolShutdown)
	}

	/// Like [`submit`](Self::submit), but hands a rejected job back to the
	/// caller so it can still be run inline.
	pub(crate) fn try_submit(&self, job: Job) -> std::result::Result<(), Job> {
		match &self.engine {
			Engine::ForkJoin(pool) => pool.submit(job),
			Engine::Threads(pool) => pool.submit(job),
		}
	}

	/// Change the worker count. In-flight work completes on the worker
	/// that started it.
	pub fn resize(&self, workers: usize) {
		match &self.engine {
			Engine::ForkJoin(pool) => pool.resize(workers),
			Engine::Threads(pool) => pool.resize(workers),
		}
	}

	/// Stop accepting submissions and let queued and in-flight work run
	/// to completion. Non-daemon pools join their workers before
	/// returning; daemon pools never block the caller.
	pub fn shutdown(&self) {
		match &self.engine {
			Engine::ForkJoin(pool) => pool.shutdown(),
			Engine::Threads(pool) => pool.shutdown(),
		}
	}

	pub fn worker_count(&self) -> usize {
		match &self.engine {
			Engine::ForkJoin(pool) => pool.worker_count(),
			Engine::Threads(pool) => pool.worker_count(),
		}
	}

	pub fn is_shutdown(&self) -> bool {
		match &self.engine {
			Engine::ForkJoin(pool) => pool.is_shutdown(),
			Engine::Threads(pool) => pool.is_shutdown(),
		}
	}
}

impl Drop for Pool {
	fn drop(&mut self) {
		self.shutdown();
	}
}
