// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Work-stealing pool flavor backed by rayon.
//!
//! An in-flight gauge tracks submitted jobs so a non-daemon shutdown can
//! wait for completion deterministically. `resize` swaps in a freshly built
//! rayon pool; jobs already spawned finish on their original workers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;

use rayon::{ThreadPool as RayonPool, ThreadPoolBuilder};
use tracing::{debug, error};

use crate::pool::Job;
use crate::util::lock;

struct Gate {
	inflight: usize,
	shutdown: bool,
}

struct Inner {
	name: String,
	daemon: bool,
	pool: RwLock<Option<Arc<RayonPool>>>,
	gate: Mutex<Gate>,
	drained: Condvar,
}

impl Inner {
	fn job_done(&self) {
		let mut gate = lock(&self.gate);
		gate.inflight -= 1;
		let empty = gate.inflight == 0;
		drop(gate);
		if empty {
			self.drained.notify_all();
		}
	}
}

/// Fork-join pool flavor.
pub(crate) struct ForkJoinPool {
	inner: Arc<Inner>,
}

fn build(name: &str, workers: Option<usize>) -> Arc<RayonPool> {
	let prefix = name.to_string();
	let mut builder = ThreadPoolBuilder::new().thread_name(move |index| format!("{prefix}-{index}"));
	if let Some(workers) = workers {
		builder = builder.num_threads(workers.max(1));
	}
	Arc::new(builder.build().expect("failed to build fork-join pool"))
}

impl ForkJoinPool {
	pub(crate) fn new(name: String, workers: Option<usize>, daemon: bool) -> Self {
		let pool = build(&name, workers);
		Self {
			inner: Arc::new(Inner {
				name,
				daemon,
				pool: RwLock::new(Some(pool)),
				gate: Mutex::new(Gate {
					inflight: 0,
					shutdown: false,
				}),
				drained: Condvar::new(),
			}),
		}
	}

	pub(crate) fn submit(&self, job: Job) -> std::result::Result<(), Job> {
		{
			let mut gate = lock(&self.inner.gate);
			if gate.shutdown {
				return Err(job);
			}
			gate.inflight += 1;
		}
		let pool = {
			let slot = self.inner.pool.read().expect("poisoned lock");
			slot.clone()
		};
		let Some(pool) = pool else {
			self.inner.job_done();
			return Err(job);
		};
		let inner = self.inner.clone();
		pool.spawn(move || {
			if catch_unwind(AssertUnwindSafe(job)).is_err() {
				error!(pool = %inner.name, "pool job panicked");
			}
			inner.job_done();
		});
		Ok(())
	}

	pub(crate) fn resize(&self, workers: usize) {
		let replacement = build(&self.inner.name, Some(workers));
		let mut slot = self.inner.pool.write().expect("poisoned lock");
		if slot.is_some() {
			// dropping the previous pool lets its in-flight jobs finish
			// on the workers that started them
			*slot = Some(replacement);
		}
	}

	pub(crate) fn shutdown(&self) {
		{
			let mut gate = lock(&self.inner.gate);
			if gate.shutdown {
				return;
			}
			gate.shutdown = true;
			if !self.inner.daemon {
				while gate.inflight > 0 {
					gate = self.inner.drained.wait(gate).expect("poisoned lock");
				}
			}
		}
		let retired = self.inner.pool.write().expect("poisoned lock").take();
		if let Some(retired) = retired {
			if self.inner.daemon {
				// never block the caller on worker teardown
				thread::spawn(move || drop(retired));
			} else {
				drop(retired);
			}
		}
		debug!(pool = %self.inner.name, "pool shut down");
	}

	pub(crate) fn worker_count(&self) -> usize {
		let slot = self.inner.pool.read().expect("poisoned lock");
		slot.as_ref().map(|pool| pool.current_num_threads()).unwrap_or(0)
	}

	pub(crate) fn is_shutdown(&self) -> bool {
		lock(&self.inner.gate).shutdown
	}
}
