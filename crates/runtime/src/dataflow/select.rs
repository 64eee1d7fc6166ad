// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Arbiters multiplexing many inputs into one consumable stream.
//!
//! The pull form ([`Select`]) lets a consumer block for whichever input
//! is ready first; the active form ([`Selector`]) drives a body once per
//! ready value, strictly sequentially. Both come in a fair flavor, which
//! rotates the scan start so no always-ready input is starved, and a
//! priority flavor, which always picks the lowest-indexed ready input.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use conflux_core::{Error, Result};
use tracing::{debug, error};

use crate::dataflow::stream::DataflowStream;
use crate::dataflow::variable::DataflowVariable;
use crate::group::Group;
use crate::util::{lock, panic_message};

const IDLE: u8 = 0;
const FIRING: u8 = 1;
const STOPPED: u8 = 2;

static SELECTOR_SEQ: AtomicUsize = AtomicUsize::new(0);

type SelectorBody<T> = Box<dyn Fn(Arc<T>, usize) -> Result<()> + Send + Sync>;
type FailureHook = Box<dyn Fn(&Error) + Send>;

/// A value drawn from one of a selector's inputs.
pub struct Selected<T> {
	pub value: Arc<T>,
	pub index: usize,
}

struct SelectCore<T: Send + Sync + 'static> {
	inputs: Vec<DataflowStream<T>>,
	priority: bool,
	rotation: AtomicUsize,
}

impl<T: Send + Sync + 'static> SelectCore<T> {
	fn new(inputs: Vec<DataflowStream<T>>, priority: bool) -> Self {
		assert!(!inputs.is_empty(), "select requires at least one input");
		Self {
			inputs,
			priority,
			rotation: AtomicUsize::new(0),
		}
	}

	/// Consume one ready value. Priority scans from index zero; fair
	/// scans from a rotating start.
	fn scan(&self) -> Option<Selected<T>> {
		let len = self.inputs.len();
		let start = if self.priority {
			0
		} else {
			self.rotation.fetch_add(1, Ordering::Relaxed) % len
		};
		for offset in 0..len {
			let index = (start + offset) % len;
			if let Some(value) = self.inputs[index].try_poll() {
				return Some(Selected {
					value,
					index,
				});
			}
		}
		None
	}

	/// Arm a one-shot wake signal on every input's current head.
	fn arm(&self) -> crossbeam_channel::Receiver<()> {
		let (sender, receiver) = crossbeam_channel::bounded(self.inputs.len());
		for input in &self.inputs {
			let sender = sender.clone();
			input.when_available(move || {
				let _ = sender.try_send(());
			});
		}
		receiver
	}
}

/// Synchronous-pull arbiter over many inputs.
pub struct Select<T: Send + Sync + 'static> {
	core: Arc<SelectCore<T>>,
}

impl<T: Send + Sync + 'static> Clone for Select<T> {
	fn clone(&self) -> Self {
		Self {
			core: self.core.clone(),
		}
	}
}

impl<T: Send + Sync + 'static> Select<T> {
	/// A fair arbiter. Panics when `inputs` is empty.
	pub fn fair(inputs: Vec<DataflowStream<T>>) -> Self {
		Self {
			core: Arc::new(SelectCore::new(inputs, false)),
		}
	}

	/// A priority arbiter resolving ties by lowest input index. Panics
	/// when `inputs` is empty.
	pub fn priority(inputs: Vec<DataflowStream<T>>) -> Self {
		Self {
			core: Arc::new(SelectCore::new(inputs, true)),
		}
	}

	/// Block until any input carries a value; consume and return it with
	/// its input index.
	pub fn select(&self) -> Selected<T> {
		loop {
			if let Some(selected) = self.core.scan() {
				return selected;
			}
			let wake = self.core.arm();
			let _ = wake.recv();
		}
	}

	/// Like [`select`](Self::select) but gives up after `timeout`,
	/// returning `None`.
	pub fn select_timeout(&self, timeout: Duration) -> Option<Selected<T>> {
		let deadline = Instant::now() + timeout;
		loop {
			if let Some(selected) = self.core.scan() {
				return Some(selected);
			}
			let now = Instant::now();
			if now >= deadline {
				return None;
			}
			let wake = self.core.arm();
			let _ = wake.recv_timeout(deadline - now);
		}
	}
}

struct SelectorInner<T: Send + Sync + 'static> {
	group: Group,
	core: SelectCore<T>,
	body: SelectorBody<T>,
	phase: AtomicU8,
	on_failure: Mutex<Option<FailureHook>>,
	completion: DataflowVariable<()>,
	name: String,
}

/// One pump pass: drain ready values sequentially, then arm wake probes
/// and release the worker.
fn pump<T: Send + Sync + 'static>(inner: &Arc<SelectorInner<T>>) {
	loop {
		if inner.phase.load(Ordering::Acquire) == STOPPED {
			return;
		}
		if inner.group.is_cancelled() {
			inner.phase.store(STOPPED, Ordering::Release);
			finish(inner);
			return;
		}
		match inner.core.scan() {
			Some(selected) => {
				if inner.phase.compare_exchange(IDLE, FIRING, Ordering::AcqRel, Ordering::Acquire).is_err() {
					// stopped between scan and firing; the value is
					// discarded
					return;
				}
				let outcome =
					catch_unwind(AssertUnwindSafe(|| (inner.body)(selected.value, selected.index)));
				match outcome {
					Ok(Ok(())) => {
						if inner
							.phase
							.compare_exchange(FIRING, IDLE, Ordering::AcqRel, Ordering::Acquire)
							.is_err()
						{
							finish(inner);
							return;
						}
					}
					Ok(Err(failure)) => {
						fail(inner, failure);
						return;
					}
					Err(payload) => {
						fail(inner, Error::handler_failure(inner.name.as_str(), panic_message(payload)));
						return;
					}
				}
			}
			None => {
				arm_pump(inner);
				return;
			}
		}
	}
}

/// The first input to become ready claims the token and re-enters the
/// pump; the other probes become no-ops.
fn arm_pump<T: Send + Sync + 'static>(inner: &Arc<SelectorInner<T>>) {
	let claimed = Arc::new(AtomicBool::new(false));
	for input in &inner.core.inputs {
		let claimed = claimed.clone();
		let inner = inner.clone();
		input.when_available(move || {
			if !claimed.swap(true, Ordering::AcqRel) {
				pump(&inner);
			}
		});
	}
}

fn fail<T: Send + Sync + 'static>(inner: &Arc<SelectorInner<T>>, failure: Error) {
	match lock(&inner.on_failure).as_ref() {
		Some(hook) => hook(&failure),
		None => error!(selector = %inner.name, error = %failure, "selector body failed"),
	}
	inner.phase.store(STOPPED, Ordering::Release);
	finish(inner);
}

fn finish<T: Send + Sync + 'static>(inner: &Arc<SelectorInner<T>>) {
	if inner.completion.bind_unique(()).is_ok() {
		debug!(selector = %inner.name, "selector stopped");
	}
}

/// Handle to a running selector.
pub struct Selector<T: Send + Sync + 'static> {
	inner: Arc<SelectorInner<T>>,
}

impl<T: Send + Sync + 'static> Clone for Selector<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Send + Sync + 'static> Selector<T> {
	/// Stop after the current firing, if one is running.
	pub fn stop(&self) {
		let previous = self.inner.phase.swap(STOPPED, Ordering::AcqRel);
		if previous == IDLE {
			finish(&self.inner);
		}
	}

	/// Install a failure hook observing body errors. Without one,
	/// failures are logged.
	pub fn on_failure<F: Fn(&Error) + Send + 'static>(&self, hook: F) {
		*lock(&self.inner.on_failure) = Some(Box::new(hook));
	}

	/// Bound once the selector has stopped.
	pub fn completion(&self) -> DataflowVariable<()> {
		self.inner.completion.clone()
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn is_stopped(&self) -> bool {
		self.inner.phase.load(Ordering::Acquire) == STOPPED
	}
}

impl Group {
	/// A fair arbiter for synchronous pulls.
	pub fn select<T: Send + Sync + 'static>(&self, inputs: Vec<DataflowStream<T>>) -> Select<T> {
		Select::fair(inputs)
	}

	/// A priority arbiter for synchronous pulls; ties resolve to the
	/// lowest input index.
	pub fn priority_select<T: Send + Sync + 'static>(&self, inputs: Vec<DataflowStream<T>>) -> Select<T> {
		Select::priority(inputs)
	}

	/// An active fair selector firing `body(value, index)` once per
	/// ready value. Panics when `inputs` is empty.
	pub fn selector<T, F>(&self, inputs: Vec<DataflowStream<T>>, body: F) -> Selector<T>
	where
		T: Send + Sync + 'static,
		F: Fn(Arc<T>, usize) -> Result<()> + Send + Sync + 'static,
	{
		self.spawn_selector(inputs, false, body)
	}

	/// An active selector preferring the lowest-indexed ready input.
	/// Panics when `inputs` is empty.
	pub fn priority_selector<T, F>(&self, inputs: Vec<DataflowStream<T>>, body: F) -> Selector<T>
	where
		T: Send + Sync + 'static,
		F: Fn(Arc<T>, usize) -> Result<()> + Send + Sync + 'static,
	{
		self.spawn_selector(inputs, true, body)
	}

	fn spawn_selector<T, F>(&self, inputs: Vec<DataflowStream<T>>, priority: bool, body: F) -> Selector<T>
	where
		T: Send + Sync + 'static,
		F: Fn(Arc<T>, usize) -> Result<()> + Send + Sync + 'static,
	{
		let inner = Arc::new(SelectorInner {
			group: self.clone(),
			core: SelectCore::new(inputs, priority),
			body: Box::new(body),
			phase: AtomicU8::new(IDLE),
			on_failure: Mutex::new(None),
			completion: DataflowVariable::new(),
			name: format!("selector-{}", SELECTOR_SEQ.fetch_add(1, Ordering::Relaxed)),
		});
		let seed = inner.clone();
		self.schedule_or_inline(move || pump(&seed));
		Selector {
			inner,
		}
	}
}
