// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Ordered multi-value channel built from chained dataflow variables.
//!
//! Every position in the stream is a [`DataflowVariable`] cell that lazily
//! chains to its successor, so readers, operators and selectors all share
//! one uniform "asynchronous next cell" interface. Writers bind the tail
//! cell and advance; readers claim the head cell and advance, suspending on
//! the cell's variable when they outpace the writers. The bounded variant
//! gates writers on the unread count.

use std::sync::{Arc, Condvar, Mutex};

use conflux_core::Result;
use once_cell::sync::OnceCell;

use crate::dataflow::variable::DataflowVariable;
use crate::util::lock;

struct StreamCell<T> {
	variable: DataflowVariable<T>,
	next: OnceCell<Arc<StreamCell<T>>>,
}

impl<T: Send + Sync + 'static> StreamCell<T> {
	fn new() -> Self {
		Self {
			variable: DataflowVariable::new(),
			next: OnceCell::new(),
		}
	}

	fn successor(&self) -> Arc<StreamCell<T>> {
		self.next.get_or_init(|| Arc::new(StreamCell::new())).clone()
	}
}

struct Inner<T> {
	write_to: Mutex<Arc<StreamCell<T>>>,
	read_from: Mutex<Arc<StreamCell<T>>>,
	unread: Mutex<usize>,
	space: Condvar,
	capacity: Option<usize>,
}

/// An ordered sequence of values with push on one end and pull on the
/// other.
pub struct DataflowStream<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for DataflowStream<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Send + Sync + 'static> DataflowStream<T> {
	pub fn new() -> Self {
		Self::with_capacity(None)
	}

	/// A stream whose writers suspend once `capacity` values are unread.
	pub fn bounded(capacity: usize) -> Self {
		Self::with_capacity(Some(capacity.max(1)))
	}

	fn with_capacity(capacity: Option<usize>) -> Self {
		let first = Arc::new(StreamCell::new());
		Self {
			inner: Arc::new(Inner {
				write_to: Mutex::new(first.clone()),
				read_from: Mutex::new(first),
				unread: Mutex::new(0),
				space: Condvar::new(),
				capacity,
			}),
		}
	}

	/// Publish a value. Suspends the writer while a bounded stream is at
	/// capacity.
	pub fn write(&self, value: T) {
		{
			let mut unread = lock(&self.inner.unread);
			if let Some(capacity) = self.inner.capacity {
				while *unread >= capacity {
					unread = self.inner.space.wait(unread).expect("poisoned lock");
				}
			}
			*unread += 1;
		}
		let cell = {
			let mut tail = lock(&self.inner.write_to);
			let cell = tail.clone();
			*tail = cell.successor();
			cell
		};
		// the tail advanced under the lock, so this cell has one writer
		let _ = cell.variable.bind_unique(value);
	}

	/// Claim the next value, suspending until a writer publishes it.
	/// Concurrent readers claim successive positions.
	pub fn read(&self) -> Result<Arc<T>> {
		let cell = self.claim();
		let value = cell.variable.get()?;
		self.consumed();
		Ok(value)
	}

	/// Claim the next position and fire `handler` once its value is
	/// published.
	pub fn when_next<F>(&self, handler: F)
	where
		F: FnOnce(Result<Arc<T>>) + Send + 'static,
	{
		let cell = self.claim();
		let stream = self.clone();
		cell.variable.when_bound(move |outcome| {
			if outcome.is_ok() {
				stream.consumed();
			}
			handler(outcome);
		});
	}

	/// Non-consuming readiness probe: fire `probe` once the current head
	/// position holds a value. The value stays in the stream.
	pub fn when_available<F>(&self, probe: F)
	where
		F: FnOnce() + Send + 'static,
	{
		let cell = lock(&self.inner.read_from).clone();
		cell.variable.when_bound(move |_| probe());
	}

	/// Consume the head value if one is ready; never suspends.
	pub fn try_poll(&self) -> Option<Arc<T>> {
		let mut head = lock(&self.inner.read_from);
		let cell = head.clone();
		match cell.variable.try_get() {
			Ok(Some(value)) => {
				*head = cell.successor();
				drop(head);
				self.consumed();
				Some(value)
			}
			_ => None,
		}
	}

	fn claim(&self) -> Arc<StreamCell<T>> {
		let mut head = lock(&self.inner.read_from);
		let cell = head.clone();
		*head = cell.successor();
		cell
	}

	fn consumed(&self) {
		{
			let mut unread = lock(&self.inner.unread);
			let remaining = unread.saturating_sub(1);
			*unread = remaining;
		}
		self.inner.space.notify_one();
	}

	/// Published values not yet consumed.
	pub fn len(&self) -> usize {
		*lock(&self.inner.unread)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> Option<usize> {
		self.inner.capacity
	}
}

impl<T: Send + Sync + 'static> Default for DataflowStream<T> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::thread;
	use std::time::Duration;

	use conflux_testing::wait_for;

	use super::*;

	#[test]
	fn values_are_read_in_publication_order() {
		let stream = DataflowStream::new();
		stream.write(1);
		stream.write(2);
		stream.write(3);
		assert_eq!(*stream.read().unwrap(), 1);
		assert_eq!(*stream.read().unwrap(), 2);
		assert_eq!(*stream.read().unwrap(), 3);
	}

	#[test]
	fn reader_suspends_on_the_next_unbound_cell() {
		let stream = DataflowStream::new();
		let reader = {
			let stream = stream.clone();
			thread::spawn(move || *stream.read().unwrap())
		};
		thread::sleep(Duration::from_millis(20));
		stream.write(9);
		assert_eq!(reader.join().unwrap(), 9);
	}

	#[test]
	fn bounded_writer_suspends_at_capacity() {
		let stream = DataflowStream::bounded(2);
		stream.write(1);
		stream.write(2);
		let writer = {
			let stream = stream.clone();
			thread::spawn(move || stream.write(3))
		};
		thread::sleep(Duration::from_millis(50));
		assert_eq!(stream.len(), 2);
		assert_eq!(*stream.read().unwrap(), 1);
		writer.join().unwrap();
		assert_eq!(*stream.read().unwrap(), 2);
		assert_eq!(*stream.read().unwrap(), 3);
	}

	#[test]
	fn when_next_consumes_exactly_one_value() {
		let stream = DataflowStream::new();
		let seen = Arc::new(AtomicUsize::new(0));
		{
			let seen = seen.clone();
			stream.when_next(move |outcome| {
				assert_eq!(*outcome.unwrap(), 5);
				seen.fetch_add(1, Ordering::SeqCst);
			});
		}
		stream.write(5);
		stream.write(6);
		wait_for(|| seen.load(Ordering::SeqCst) == 1, "handler consumed the first value");
		assert_eq!(*stream.read().unwrap(), 6);
	}

	#[test]
	fn when_available_does_not_consume() {
		let stream = DataflowStream::new();
		let probed = Arc::new(AtomicUsize::new(0));
		{
			let probed = probed.clone();
			stream.when_available(move || {
				probed.fetch_add(1, Ordering::SeqCst);
			});
		}
		stream.write(4);
		wait_for(|| probed.load(Ordering::SeqCst) == 1, "probe fired");
		assert_eq!(stream.try_poll().map(|v| *v), Some(4));
	}

	#[test]
	fn try_poll_returns_none_on_empty_stream() {
		let stream: DataflowStream<u8> = DataflowStream::new();
		assert!(stream.try_poll().is_none());
		stream.write(1);
		assert_eq!(stream.try_poll().map(|v| *v), Some(1));
		assert!(stream.try_poll().is_none());
	}
}
