// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Single-assignment dataflow variable.
//!
//! A variable transitions from unbound to resolved exactly once. Readers
//! block on [`get`](DataflowVariable::get) or register continuations with
//! [`when_bound`](DataflowVariable::when_bound); every continuation fires
//! exactly once, on the pool of the group that was ambient when it was
//! registered. A task that fails resolves its variable with an error
//! envelope instead of a value.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use conflux_core::{Error, Result};

use crate::context;
use crate::group::Group;
use crate::util::lock;

type Waiter<T> = Box<dyn FnOnce(Result<Arc<T>>) + Send>;

enum Cell<T> {
	Unbound(Vec<(Option<Group>, Waiter<T>)>),
	Bound(Arc<T>),
	Failed(Error),
}

struct Inner<T> {
	cell: Mutex<Cell<T>>,
	resolved: Condvar,
}

/// A single-assignment cell with a wait list.
pub struct DataflowVariable<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for DataflowVariable<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

fn notify<T: Send + Sync + 'static>(group: Option<Group>, waiter: Waiter<T>, outcome: Result<Arc<T>>) {
	let group = group.unwrap_or_else(|| Group::default_group().clone());
	// runs inline when the pool is gone so the continuation still fires
	group.schedule_or_inline(move || waiter(outcome));
}

impl<T: Send + Sync + 'static> DataflowVariable<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				cell: Mutex::new(Cell::Unbound(Vec::new())),
				resolved: Condvar::new(),
			}),
		}
	}

	/// Bind the variable, failing with [`Error::AlreadyBound`] on any
	/// second resolution regardless of the value.
	pub fn bind_unique(&self, value: T) -> Result<()> {
		self.resolve(Ok(Arc::new(value)))
	}

	/// Resolve the variable with an error envelope. Readers observe the
	/// error instead of a value.
	pub fn fail(&self, error: Error) -> Result<()> {
		self.resolve(Err(error))
	}

	fn resolve(&self, outcome: Result<Arc<T>>) -> Result<()> {
		let waiters = {
			let mut cell = lock(&self.inner.cell);
			let Cell::Unbound(waiters) = &mut *cell else {
				return Err(Error::AlreadyBound);
			};
			let waiters = std::mem::take(waiters);
			*cell = match &outcome {
				Ok(value) => Cell::Bound(value.clone()),
				Err(error) => Cell::Failed(error.clone()),
			};
			self.inner.resolved.notify_all();
			waiters
		};
		for (group, waiter) in waiters {
			notify(group, waiter, outcome.clone());
		}
		Ok(())
	}

	/// Whether the variable has been resolved (with a value or an error).
	pub fn is_bound(&self) -> bool {
		!matches!(&*lock(&self.inner.cell), Cell::Unbound(_))
	}

	/// The value if already bound; never suspends.
	pub fn try_get(&self) -> Result<Option<Arc<T>>> {
		match &*lock(&self.inner.cell) {
			Cell::Unbound(_) => Ok(None),
			Cell::Bound(value) => Ok(Some(value.clone())),
			Cell::Failed(error) => Err(error.clone()),
		}
	}

	/// Block the caller until the variable resolves.
	pub fn get(&self) -> Result<Arc<T>> {
		let mut cell = lock(&self.inner.cell);
		loop {
			match &*cell {
				Cell::Bound(value) => return Ok(value.clone()),
				Cell::Failed(error) => return Err(error.clone()),
				Cell::Unbound(_) => {
					cell = self.inner.resolved.wait(cell).expect("poisoned lock");
				}
			}
		}
	}

	/// Block for up to `timeout`. Expiry returns `Ok(None)` and leaves
	/// the variable unbound.
	pub fn get_timeout(&self, timeout: Duration) -> Result<Option<Arc<T>>> {
		let deadline = Instant::now() + timeout;
		let mut cell = lock(&self.inner.cell);
		loop {
			match &*cell {
				Cell::Bound(value) => return Ok(Some(value.clone())),
				Cell::Failed(error) => return Err(error.clone()),
				Cell::Unbound(_) => {
					let now = Instant::now();
					if now >= deadline {
						return Ok(None);
					}
					let (guard, _) =
						self.inner.resolved.wait_timeout(cell, deadline - now).expect("poisoned lock");
					cell = guard;
				}
			}
		}
	}

	/// Register a continuation fired exactly once with the resolution,
	/// scheduled on the pool of the group ambient at registration (the
	/// default group outside any pool work). Resumption order across
	/// continuations is unspecified.
	pub fn when_bound<F>(&self, handler: F)
	where
		F: FnOnce(Result<Arc<T>>) + Send + 'static,
	{
		let group = context::current_group();
		let handler: Waiter<T> = Box::new(handler);
		let outcome = {
			let mut cell = lock(&self.inner.cell);
			match &mut *cell {
				Cell::Unbound(waiters) => {
					waiters.push((group, handler));
					return;
				}
				Cell::Bound(value) => Ok(value.clone()),
				Cell::Failed(error) => Err(error.clone()),
			}
		};
		notify(group, handler, outcome);
	}

	/// Derive a variable holding `transform` of this one's value.
	/// Failures propagate unchanged.
	pub fn then<U, F>(&self, transform: F) -> DataflowVariable<U>
	where
		U: Send + Sync + 'static,
		F: FnOnce(Arc<T>) -> U + Send + 'static,
	{
		let output = DataflowVariable::new();
		let target = output.clone();
		self.when_bound(move |outcome| match outcome {
			Ok(value) => {
				let _ = target.bind_unique(transform(value));
			}
			Err(error) => {
				let _ = target.fail(error);
			}
		});
		output
	}
}

impl<T: PartialEq + Send + Sync + 'static> DataflowVariable<T> {
	/// Bind the variable. A re-bind with an equal value silently
	/// succeeds; an unequal value fails with [`Error::AlreadyBound`].
	pub fn bind(&self, value: T) -> Result<()> {
		let resolved = {
			let mut cell = lock(&self.inner.cell);
			match &mut *cell {
				Cell::Unbound(waiters) => {
					let waiters = std::mem::take(waiters);
					let value = Arc::new(value);
					*cell = Cell::Bound(value.clone());
					self.inner.resolved.notify_all();
					(waiters, value)
				}
				Cell::Bound(current) => {
					return if **current == value {
						Ok(())
					} else {
						Err(Error::AlreadyBound)
					};
				}
				Cell::Failed(_) => return Err(Error::AlreadyBound),
			}
		};
		let (waiters, value) = resolved;
		for (group, waiter) in waiters {
			notify(group, waiter, Ok(value.clone()));
		}
		Ok(())
	}
}

impl<T: Send + Sync + 'static> Default for DataflowVariable<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// A variable resolving once every input variable has resolved, carrying
/// the values in input order. The first input failure fails the result.
pub fn when_all<T>(variables: &[DataflowVariable<T>]) -> DataflowVariable<Vec<Arc<T>>>
where
	T: Send + Sync + 'static,
{
	let result = DataflowVariable::new();
	if variables.is_empty() {
		let _ = result.bind_unique(Vec::new());
		return result;
	}
	let pending = Arc::new(std::sync::atomic::AtomicUsize::new(variables.len()));
	let slots: Arc<Vec<Mutex<Option<Arc<T>>>>> = Arc::new(variables.iter().map(|_| Mutex::new(None)).collect());
	for (index, variable) in variables.iter().enumerate() {
		let pending = pending.clone();
		let slots = slots.clone();
		let result = result.clone();
		variable.when_bound(move |outcome| match outcome {
			Ok(value) => {
				*lock(&slots[index]) = Some(value);
				if pending.fetch_sub(1, std::sync::atomic::Ordering::AcqRel) == 1 {
					let values = slots
						.iter()
						.map(|slot| lock(slot).take().expect("input value present"))
						.collect();
					let _ = result.bind_unique(values);
				}
			}
			Err(error) => {
				let _ = result.fail(error);
			}
		});
	}
	result
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::thread;

	use conflux_testing::wait_for;

	use super::*;

	#[test]
	fn bind_then_get_roundtrips() {
		let variable = DataflowVariable::new();
		variable.bind(7).unwrap();
		assert_eq!(*variable.get().unwrap(), 7);
	}

	#[test]
	fn rebind_with_equal_value_is_silent() {
		let variable = DataflowVariable::new();
		variable.bind(7).unwrap();
		assert_eq!(variable.bind(7), Ok(()));
		assert_eq!(variable.bind(8), Err(Error::AlreadyBound));
	}

	#[test]
	fn bind_unique_is_strict() {
		let variable = DataflowVariable::new();
		variable.bind_unique(7).unwrap();
		assert_eq!(variable.bind_unique(7), Err(Error::AlreadyBound));
	}

	#[test]
	fn get_suspends_until_bound() {
		let variable = DataflowVariable::new();
		let reader = {
			let variable = variable.clone();
			thread::spawn(move || *variable.get().unwrap())
		};
		thread::sleep(Duration::from_millis(20));
		variable.bind(42).unwrap();
		assert_eq!(reader.join().unwrap(), 42);
	}

	#[test]
	fn get_timeout_leaves_the_variable_unbound() {
		let variable: DataflowVariable<u8> = DataflowVariable::new();
		assert_eq!(variable.get_timeout(Duration::from_millis(20)).unwrap(), None);
		assert!(!variable.is_bound());
		variable.bind(1).unwrap();
		assert_eq!(*variable.get_timeout(Duration::from_millis(20)).unwrap().unwrap(), 1);
	}

	#[test]
	fn every_handler_fires_exactly_once() {
		let variable = DataflowVariable::new();
		let fired = Arc::new(AtomicUsize::new(0));
		for _ in 0..3 {
			let fired = fired.clone();
			variable.when_bound(move |outcome| {
				assert_eq!(*outcome.unwrap(), 7);
				fired.fetch_add(1, Ordering::SeqCst);
			});
		}
		variable.bind(7).unwrap();
		wait_for(|| fired.load(Ordering::SeqCst) == 3, "all handlers fired");
	}

	#[test]
	fn handler_registered_after_bind_still_fires() {
		let variable = DataflowVariable::new();
		variable.bind(5).unwrap();
		let fired = Arc::new(AtomicUsize::new(0));
		{
			let fired = fired.clone();
			variable.when_bound(move |outcome| {
				assert_eq!(*outcome.unwrap(), 5);
				fired.fetch_add(1, Ordering::SeqCst);
			});
		}
		wait_for(|| fired.load(Ordering::SeqCst) == 1, "late handler fired");
	}

	#[test]
	fn failure_envelope_reaches_readers_and_handlers() {
		let variable: DataflowVariable<u8> = DataflowVariable::new();
		let observed = Arc::new(AtomicUsize::new(0));
		{
			let observed = observed.clone();
			variable.when_bound(move |outcome| {
				assert!(outcome.is_err());
				observed.fetch_add(1, Ordering::SeqCst);
			});
		}
		variable.fail(Error::handler_failure("task", "boom")).unwrap();
		assert!(variable.get().is_err());
		wait_for(|| observed.load(Ordering::SeqCst) == 1, "failure handler fired");
	}

	#[test]
	fn then_chains_and_propagates() {
		let variable = DataflowVariable::new();
		let doubled = variable.then(|value| *value * 2);
		variable.bind(21).unwrap();
		assert_eq!(*doubled.get().unwrap(), 42);
	}
}
