// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Worker-thread engine backing the fixed and cached pool flavors.
//!
//! Workers drain one shared injector channel. The fixed flavor keeps a
//! constant worker count; the cached flavor spawns workers on demand and
//! retires the surplus after an idle keep-alive.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error};

use crate::pool::Job;
use crate::util::lock;

enum Work {
	Job(Job),
	/// Instructs exactly one worker to exit after the queue ahead of the
	/// token has drained.
	Retire,
}

struct Gate {
	/// Workers currently alive.
	live: usize,
	/// Workers the pool aims to keep; cached surplus above this retires
	/// when idle.
	target: usize,
	shutdown: bool,
}

struct Shared {
	name: String,
	daemon: bool,
	/// Idle keep-alive of surplus workers; `None` disables on-demand
	/// growth entirely (fixed flavor).
	keep_alive: Option<Duration>,
	sender: Mutex<Option<Sender<Work>>>,
	receiver: Receiver<Work>,
	gate: Mutex<Gate>,
	drained: Condvar,
	idle: AtomicUsize,
	next_worker: AtomicUsize,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Fixed or cached pool of dedicated worker threads.
pub(crate) struct ThreadPool {
	shared: Arc<Shared>,
}

impl ThreadPool {
	/// A pool holding exactly `workers` threads.
	pub(crate) fn fixed(name: String, workers: usize, daemon: bool) -> Self {
		Self::new(name, workers.max(1), None, daemon)
	}

	/// A pool growing on demand, keeping `core` threads alive and
	/// retiring the surplus after `keep_alive` idle time.
	pub(crate) fn cached(name: String, core: usize, keep_alive: Duration, daemon: bool) -> Self {
		Self::new(name, core, Some(keep_alive), daemon)
	}

	fn new(name: String, target: usize, keep_alive: Option<Duration>, daemon: bool) -> Self {
		let (sender, receiver) = unbounded();
		let pool = Self {
			shared: Arc::new(Shared {
				name,
				daemon,
				keep_alive,
				sender: Mutex::new(Some(sender)),
				receiver,
				gate: Mutex::new(Gate {
					live: 0,
					target,
					shutdown: false,
				}),
				drained: Condvar::new(),
				idle: AtomicUsize::new(0),
				next_worker: AtomicUsize::new(0),
				handles: Mutex::new(Vec::new()),
			}),
		};
		for _ in 0..target {
			pool.spawn_worker();
		}
		pool
	}

	fn spawn_worker(&self) {
		{
			let mut gate = lock(&self.shared.gate);
			if gate.shutdown {
				return;
			}
			gate.live += 1;
		}
		let shared = self.shared.clone();
		let id = shared.next_worker.fetch_add(1, Ordering::Relaxed);
		let handle = thread::Builder::new()
			.name(format!("{}-{}", shared.name, id))
			.spawn(move || run_worker(shared))
			.expect("failed to spawn pool worker");
		lock(&self.shared.handles).push(handle);
	}

	/// Hand a job to the workers. Rejected jobs are returned so the
	/// caller can decide whether to run them inline.
	pub(crate) fn submit(&self, job: Job) -> std::result::Result<(), Job> {
		let grow = {
			let sender = lock(&self.shared.sender);
			let Some(sender) = sender.as_ref() else {
				return Err(job);
			};
			let grow = self.shared.keep_alive.is_some() && self.shared.idle.load(Ordering::Acquire) == 0;
			if let Err(rejected) = sender.send(Work::Job(job)) {
				match rejected.into_inner() {
					Work::Job(job) => return Err(job),
					Work::Retire => return Ok(()),
				}
			}
			grow
		};
		if grow {
			self.spawn_worker();
		}
		Ok(())
	}

	pub(crate) fn resize(&self, workers: usize) {
		let (grow, shrink) = {
			let mut gate = lock(&self.shared.gate);
			if gate.shutdown {
				return;
			}
			let previous = gate.target;
			gate.target = workers;
			if workers > previous {
				(workers - previous, 0)
			} else {
				(0, previous - workers)
			}
		};
		for _ in 0..grow {
			self.spawn_worker();
		}
		if shrink > 0 {
			let sender = lock(&self.shared.sender);
			if let Some(sender) = sender.as_ref() {
				for _ in 0..shrink {
					let _ = sender.send(Work::Retire);
				}
			}
		}
	}

	/// Stop accepting work, let queued jobs drain, and (for non-daemon
	/// pools) join every worker.
	pub(crate) fn shutdown(&self) {
		{
			let mut gate = lock(&self.shared.gate);
			if gate.shutdown {
				return;
			}
			gate.shutdown = true;
		}
		// closing the injector lets workers finish the backlog and exit
		lock(&self.shared.sender).take();
		if !self.shared.daemon {
			{
				let mut gate = lock(&self.shared.gate);
				while gate.live > 0 {
					gate = self.shared.drained.wait(gate).expect("poisoned lock");
				}
			}
			let handles = std::mem::take(&mut *lock(&self.shared.handles));
			for handle in handles {
				let _ = handle.join();
			}
		}
		debug!(pool = %self.shared.name, "pool shut down");
	}

	pub(crate) fn worker_count(&self) -> usize {
		lock(&self.shared.gate).live
	}

	pub(crate) fn is_shutdown(&self) -> bool {
		lock(&self.shared.gate).shutdown
	}
}

fn run_worker(shared: Arc<Shared>) {
	loop {
		shared.idle.fetch_add(1, Ordering::AcqRel);
		let work = match shared.keep_alive {
			Some(keep_alive) => shared.receiver.recv_timeout(keep_alive),
			None => shared.receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
		};
		shared.idle.fetch_sub(1, Ordering::AcqRel);
		match work {
			Ok(Work::Job(job)) => {
				if catch_unwind(AssertUnwindSafe(job)).is_err() {
					error!(pool = %shared.name, "pool job panicked");
				}
			}
			Ok(Work::Retire) => break,
			Err(RecvTimeoutError::Timeout) => {
				// surplus cached worker past its keep-alive
				let surplus = {
					let gate = lock(&shared.gate);
					gate.live > gate.target
				};
				if surplus {
					break;
				}
			}
			Err(RecvTimeoutError::Disconnected) => break,
		}
	}
	let mut gate = lock(&shared.gate);
	gate.live -= 1;
	drop(gate);
	shared.drained.notify_all();
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;
	use std::time::Duration;

	use super::*;

	#[test]
	fn runs_each_job_exactly_once() {
		let pool = ThreadPool::fixed("fixed-test".into(), 2, false);
		let counter = Arc::new(AtomicUsize::new(0));
		for _ in 0..100 {
			let counter = counter.clone();
			pool.submit(Box::new(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			}))
			.ok()
			.expect("pool accepts work");
		}
		pool.shutdown();
		assert_eq!(counter.load(Ordering::SeqCst), 100);
	}

	#[test]
	fn rejects_jobs_after_shutdown() {
		let pool = ThreadPool::fixed("closed-test".into(), 1, false);
		pool.shutdown();
		assert!(pool.submit(Box::new(|| {})).is_err());
	}

	#[test]
	fn resize_changes_worker_count() {
		let pool = ThreadPool::fixed("resize-test".into(), 1, false);
		assert_eq!(pool.worker_count(), 1);
		pool.resize(3);
		assert_eq!(pool.worker_count(), 3);
		pool.resize(1);
		// retiring workers drain their tokens first
		conflux_testing::wait_for(|| pool.worker_count() == 1, "workers retire after resize down");
		pool.shutdown();
	}

	#[test]
	fn cached_pool_grows_on_demand() {
		let pool = ThreadPool::cached("cached-test".into(), 0, Duration::from_millis(50), false);
		assert_eq!(pool.worker_count(), 0);
		let counter = Arc::new(AtomicUsize::new(0));
		{
			let counter = counter.clone();
			pool.submit(Box::new(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			}))
			.ok()
			.expect("pool accepts work");
		}
		conflux_testing::wait_for(|| counter.load(Ordering::SeqCst) == 1, "job ran on a demand-spawned worker");
		// the surplus worker retires once its keep-alive expires
		conflux_testing::wait_for(|| pool.worker_count() == 0, "idle cached worker retires");
		pool.shutdown();
	}
}
