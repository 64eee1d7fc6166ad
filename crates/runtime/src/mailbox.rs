// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! FIFO mailbox with optional capacity bound.
//!
//! A bounded mailbox applies backpressure by suspending the sender at
//! capacity. Per-sender order is preserved; global order across concurrent
//! senders is not. Control items (the stop sentinel) bypass the capacity
//! bound so an orderly stop can always be delivered.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use conflux_core::{Error, Result};

use crate::util::lock;

struct Queue<T> {
	items: VecDeque<T>,
	/// False once the owner stops accepting user messages.
	accepting: bool,
	/// True once queued items have been discarded; nothing is delivered
	/// after this.
	discarded: bool,
}

/// An ordered queue of messages owned by a single consumer.
pub struct Mailbox<T> {
	queue: Mutex<Queue<T>>,
	not_empty: Condvar,
	not_full: Condvar,
	capacity: Option<usize>,
}

impl<T> Mailbox<T> {
	/// A mailbox that grows without bound.
	pub fn unbounded() -> Self {
		Self::new(None)
	}

	/// A mailbox that suspends senders at `capacity` queued messages.
	pub fn bounded(capacity: usize) -> Self {
		Self::new(Some(capacity.max(1)))
	}

	pub fn new(capacity: Option<usize>) -> Self {
		Self {
			queue: Mutex::new(Queue {
				items: VecDeque::new(),
				accepting: true,
				discarded: false,
			}),
			not_empty: Condvar::new(),
			not_full: Condvar::new(),
			capacity: capacity.map(|c| c.max(1)),
		}
	}

	/// Append a message, blocking while the mailbox is at capacity.
	///
	/// Fails with [`Error::MailboxClosed`] once the owner stopped
	/// accepting messages, including while the caller is suspended.
	pub fn enqueue(&self, item: T) -> Result<()> {
		let mut queue = lock(&self.queue);
		loop {
			if !queue.accepting {
				return Err(Error::MailboxClosed);
			}
			match self.capacity {
				Some(capacity) if queue.items.len() >= capacity => {
					queue = self.not_full.wait(queue).expect("poisoned lock");
				}
				_ => break,
			}
		}
		queue.items.push_back(item);
		self.not_empty.notify_one();
		Ok(())
	}

	/// Append a control item, ignoring the capacity bound and the
	/// accepting flag. Fails only after the queue was discarded.
	pub(crate) fn push_control(&self, item: T) -> Result<()> {
		let mut queue = lock(&self.queue);
		if queue.discarded {
			return Err(Error::MailboxClosed);
		}
		queue.items.push_back(item);
		self.not_empty.notify_one();
		Ok(())
	}

	/// Atomically stop accepting user messages and append one final
	/// control item behind everything already queued.
	pub(crate) fn close_with(&self, item: T) -> Result<()> {
		let mut queue = lock(&self.queue);
		if !queue.accepting {
			return Err(Error::MailboxClosed);
		}
		queue.accepting = false;
		queue.items.push_back(item);
		self.not_empty.notify_one();
		// wake suspended senders so they observe the close
		self.not_full.notify_all();
		Ok(())
	}

	/// Stop accepting user messages; already queued items stay
	/// deliverable.
	pub fn close(&self) {
		let mut queue = lock(&self.queue);
		queue.accepting = false;
		self.not_empty.notify_all();
		self.not_full.notify_all();
	}

	/// Stop accepting and discard everything queued. Returns the number
	/// of discarded items.
	pub fn close_and_drain(&self) -> usize {
		let mut queue = lock(&self.queue);
		queue.accepting = false;
		queue.discarded = true;
		let discarded = queue.items.len();
		queue.items.clear();
		self.not_empty.notify_all();
		self.not_full.notify_all();
		discarded
	}

	/// Remove the next message, suspending the caller while the mailbox
	/// is empty.
	pub fn dequeue(&self) -> Result<T> {
		let mut queue = lock(&self.queue);
		loop {
			if let Some(item) = queue.items.pop_front() {
				self.not_full.notify_one();
				return Ok(item);
			}
			if queue.discarded || !queue.accepting {
				return Err(Error::MailboxClosed);
			}
			queue = self.not_empty.wait(queue).expect("poisoned lock");
		}
	}

	/// Like [`dequeue`](Self::dequeue) but gives up after `timeout`,
	/// returning `Ok(None)`.
	pub fn dequeue_timeout(&self, timeout: Duration) -> Result<Option<T>> {
		let deadline = Instant::now() + timeout;
		let mut queue = lock(&self.queue);
		loop {
			if let Some(item) = queue.items.pop_front() {
				self.not_full.notify_one();
				return Ok(Some(item));
			}
			if queue.discarded || !queue.accepting {
				return Err(Error::MailboxClosed);
			}
			let now = Instant::now();
			if now >= deadline {
				return Ok(None);
			}
			let (guard, _) = self.not_empty.wait_timeout(queue, deadline - now).expect("poisoned lock");
			queue = guard;
		}
	}

	/// Remove the next message without suspending.
	pub fn try_dequeue(&self) -> Option<T> {
		let mut queue = lock(&self.queue);
		let item = queue.items.pop_front();
		if item.is_some() {
			self.not_full.notify_one();
		}
		item
	}

	pub fn len(&self) -> usize {
		lock(&self.queue).items.len()
	}

	pub fn is_empty(&self) -> bool {
		lock(&self.queue).items.is_empty()
	}

	pub fn is_closed(&self) -> bool {
		!lock(&self.queue).accepting
	}

	pub fn capacity(&self) -> Option<usize> {
		self.capacity
	}
}

impl<T: Clone> Mailbox<T> {
	/// A copy of the next message without removing it.
	pub fn peek(&self) -> Option<T> {
		lock(&self.queue).items.front().cloned()
	}
}
