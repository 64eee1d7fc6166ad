// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Message timers backed by one shared scheduler thread.
//!
//! All timers of the process live in a single deadline heap drained by one
//! sleeper thread, so arming a timer never spawns a thread. Cancellation
//! removes the entry from the registry; a heap entry whose id is no longer
//! registered is skipped when its deadline surfaces. Repeating timers are
//! reinserted with a fresh deadline after each delivery and retire on
//! their own once the receiving actor stops.
//!
//! Deliveries run on the scheduler thread: a timer message aimed at a
//! full bounded mailbox delays the timers behind it.

use std::cmp;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::actor::reference::ActorRef;
use crate::util::lock;

enum TimerTask {
	Once(Box<dyn FnOnce() + Send>),
	/// Runs at each firing; returning `false` retires the timer.
	Repeat(Box<dyn FnMut() -> bool + Send>),
}

struct TimerEntry {
	task: TimerTask,
	interval: Option<Duration>,
	armed: Arc<AtomicBool>,
}

struct QueuedTimer {
	due: Instant,
	id: u64,
}

impl PartialEq for QueuedTimer {
	fn eq(&self, other: &Self) -> bool {
		self.due == other.due && self.id == other.id
	}
}

impl Eq for QueuedTimer {}

impl PartialOrd for QueuedTimer {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for QueuedTimer {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		// earliest deadline surfaces first
		other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
	}
}

struct SchedulerState {
	queue: BinaryHeap<QueuedTimer>,
	entries: HashMap<u64, TimerEntry>,
	next_id: u64,
}

struct TimerScheduler {
	state: Mutex<SchedulerState>,
	changed: Condvar,
}

static SCHEDULER: Lazy<Arc<TimerScheduler>> = Lazy::new(|| {
	let scheduler = Arc::new(TimerScheduler {
		state: Mutex::new(SchedulerState {
			queue: BinaryHeap::new(),
			entries: HashMap::new(),
			next_id: 0,
		}),
		changed: Condvar::new(),
	});
	let runner = scheduler.clone();
	thread::Builder::new()
		.name("conflux-timers".to_string())
		.spawn(move || runner.run())
		.expect("failed to spawn timer scheduler thread");
	scheduler
});

impl TimerScheduler {
	fn insert(&self, delay: Duration, interval: Option<Duration>, task: TimerTask) -> TimerHandle {
		let armed = Arc::new(AtomicBool::new(true));
		{
			let mut state = lock(&self.state);
			let id = state.next_id;
			state.next_id += 1;
			state.queue.push(QueuedTimer {
				due: Instant::now() + delay,
				id,
			});
			state.entries.insert(
				id,
				TimerEntry {
					task,
					interval,
					armed: armed.clone(),
				},
			);
			self.changed.notify_one();
			TimerHandle {
				id,
				armed,
			}
		}
	}

	fn cancel(&self, id: u64) {
		let mut state = lock(&self.state);
		// the queued deadline stays behind and is skipped when it
		// surfaces
		state.entries.remove(&id);
		self.changed.notify_one();
	}

	fn run(&self) {
		loop {
			let mut due = Vec::new();
			{
				let mut state = lock(&self.state);
				loop {
					let now = Instant::now();
					loop {
						let ready = matches!(state.queue.peek(), Some(next) if next.due <= now);
						if !ready {
							break;
						}
						let id = state.queue.pop().expect("peeked timer present").id;
						if let Some(entry) = state.entries.remove(&id) {
							due.push((id, entry));
						}
					}
					if !due.is_empty() {
						break;
					}
					match state.queue.peek().map(|next| next.due) {
						Some(deadline) => {
							let now = Instant::now();
							if deadline > now {
								let (guard, _) = self
									.changed
									.wait_timeout(state, deadline - now)
									.expect("poisoned lock");
								state = guard;
							}
						}
						None => {
							state = self.changed.wait(state).expect("poisoned lock");
						}
					}
				}
			}
			for (id, entry) in due {
				self.fire(id, entry);
			}
		}
	}

	fn fire(&self, id: u64, entry: TimerEntry) {
		let TimerEntry {
			task,
			interval,
			armed,
		} = entry;
		if !armed.load(Ordering::Acquire) {
			return;
		}
		match task {
			TimerTask::Once(run) => {
				run();
				armed.store(false, Ordering::Release);
			}
			TimerTask::Repeat(mut run) => {
				if run() && armed.load(Ordering::Acquire) {
					let mut state = lock(&self.state);
					state.queue.push(QueuedTimer {
						due: Instant::now() + interval.unwrap_or_default(),
						id,
					});
					state.entries.insert(
						id,
						TimerEntry {
							task: TimerTask::Repeat(run),
							interval,
							armed,
						},
					);
					self.changed.notify_one();
				} else {
					armed.store(false, Ordering::Release);
				}
			}
		}
	}
}

/// Handle to a scheduled timer. Cancelling prevents firings that have not
/// started yet.
#[derive(Clone)]
pub struct TimerHandle {
	id: u64,
	armed: Arc<AtomicBool>,
}

impl TimerHandle {
	/// Cancel this timer. Returns `true` when this call retired an armed
	/// timer.
	pub fn cancel(&self) -> bool {
		if self.armed.swap(false, Ordering::AcqRel) {
			SCHEDULER.cancel(self.id);
			true
		} else {
			false
		}
	}

	/// Whether the timer still has firings ahead of it.
	pub fn is_armed(&self) -> bool {
		self.armed.load(Ordering::Acquire)
	}

	pub fn id(&self) -> u64 {
		self.id
	}
}

impl std::fmt::Debug for TimerHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TimerHandle").field("id", &self.id).field("armed", &self.is_armed()).finish()
	}
}

/// Send `message` to the actor after `delay`, unless cancelled first.
pub fn schedule_once<M: Send + 'static>(actor_ref: ActorRef<M>, delay: Duration, message: M) -> TimerHandle {
	SCHEDULER.insert(
		delay,
		None,
		TimerTask::Once(Box::new(move || {
			let _ = actor_ref.send(message);
		})),
	)
}

/// Send `message` to the actor every `interval` until cancelled or the
/// actor stops accepting messages.
pub fn schedule_repeat<M: Send + Clone + 'static>(
	actor_ref: ActorRef<M>,
	interval: Duration,
	message: M,
) -> TimerHandle {
	SCHEDULER.insert(
		interval,
		Some(interval),
		TimerTask::Repeat(Box::new(move || actor_ref.send(message.clone()).is_ok())),
	)
}

/// Run `callback` once after `delay`. Used by the receive-timeout
/// machinery; the callback re-validates its generation itself.
pub(crate) fn schedule_callback(delay: Duration, callback: impl FnOnce() + Send + 'static) -> TimerHandle {
	SCHEDULER.insert(delay, None, TimerTask::Once(Box::new(callback)))
}
