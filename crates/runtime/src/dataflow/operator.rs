// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Multi-input/multi-output dataflow processor.
//!
//! An operator fires when every declared input carries a value. Each round
//! arms a non-consuming readiness probe on every input; once the last
//! input becomes ready, the operator claims exactly one value from each
//! and runs the body. Because values leave their streams only at that
//! claim step, a `stop()` racing an armed round leaves the streams
//! untouched. Firings of one operator are strictly sequential; between
//! operators there is arbitrary parallelism. The loop is event-driven, so
//! an operator waiting for input holds no worker.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use conflux_core::{Error, Result};
use tracing::{debug, error};

use crate::context::AmbientScope;
use crate::dataflow::stream::DataflowStream;
use crate::dataflow::variable::DataflowVariable;
use crate::group::Group;
use crate::util::{lock, panic_message};

const IDLE: u8 = 0;
const FIRING: u8 = 1;
const STOPPED: u8 = 2;

static OPERATOR_SEQ: AtomicUsize = AtomicUsize::new(0);

type Body<I, O> = Box<dyn Fn(&OperatorScope<'_, O>, Vec<Arc<I>>) -> Result<()> + Send + Sync>;
type FailureHook = Box<dyn Fn(&Error) + Send>;

/// Publication surface handed to an operator body.
pub struct OperatorScope<'a, O: Send + Sync + 'static> {
	outputs: &'a [DataflowStream<O>],
	publish: &'a Mutex<()>,
}

impl<'a, O: Send + Sync + 'static> OperatorScope<'a, O> {
	/// Publish `value` to a single output.
	///
	/// Panics on an out-of-range index, which stops the operator through
	/// the body's panic boundary.
	pub fn bind_output(&self, index: usize, value: O) {
		let output = self.outputs.get(index).expect("operator output index in range");
		output.write(value);
	}

	/// Publish the same `value` to every output, atomically with respect
	/// to other publications of this operator.
	pub fn bind_all(&self, value: O)
	where
		O: Clone,
	{
		let _guard = lock(self.publish);
		for output in self.outputs {
			output.write(value.clone());
		}
	}

	pub fn output_count(&self) -> usize {
		self.outputs.len()
	}
}

struct OperatorInner<I: Send + Sync + 'static, O: Send + Sync + 'static> {
	group: Group,
	inputs: Vec<DataflowStream<I>>,
	outputs: Vec<DataflowStream<O>>,
	body: Body<I, O>,
	phase: AtomicU8,
	publish: Mutex<()>,
	on_failure: Mutex<Option<FailureHook>>,
	completion: DataflowVariable<()>,
	name: String,
}

/// One in-flight round: the values claimed so far, by input index.
struct Round<I> {
	slots: Vec<Mutex<Option<Arc<I>>>>,
}

fn launch_round<I, O>(inner: &Arc<OperatorInner<I, O>>)
where
	I: Send + Sync + 'static,
	O: Send + Sync + 'static,
{
	if inner.phase.load(Ordering::Acquire) == STOPPED {
		return;
	}
	if inner.group.is_cancelled() {
		inner.phase.store(STOPPED, Ordering::Release);
		finish(inner);
		return;
	}
	let round = Arc::new(Round {
		slots: inner.inputs.iter().map(|_| Mutex::new(None)).collect(),
	});
	arm(inner, &round, (0..inner.inputs.len()).collect());
}

/// Watch the given inputs for readiness. Probes do not consume; the last
/// one to fire triggers the claim-and-fire step.
fn arm<I, O>(inner: &Arc<OperatorInner<I, O>>, round: &Arc<Round<I>>, indices: Vec<usize>)
where
	I: Send + Sync + 'static,
	O: Send + Sync + 'static,
{
	let pending = Arc::new(AtomicUsize::new(indices.len()));
	let _ambient = AmbientScope::enter(&inner.group);
	for index in indices {
		let operator = inner.clone();
		let round = round.clone();
		let pending = pending.clone();
		inner.inputs[index].when_available(move || {
			if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
				gather(&operator, &round);
			}
		});
	}
}

/// Claim one value from every input, then run the body. Values leave
/// their streams only here, so a stop that won the race consumes nothing.
fn gather<I, O>(inner: &Arc<OperatorInner<I, O>>, round: &Arc<Round<I>>)
where
	I: Send + Sync + 'static,
	O: Send + Sync + 'static,
{
	if inner.phase.compare_exchange(IDLE, FIRING, Ordering::AcqRel, Ordering::Acquire).is_err() {
		// stopped while the round was armed; the ready values stay in
		// their streams
		return;
	}
	if inner.group.is_cancelled() {
		inner.phase.store(STOPPED, Ordering::Release);
		finish(inner);
		return;
	}
	let mut missing = Vec::new();
	for (index, input) in inner.inputs.iter().enumerate() {
		let mut slot = lock(&round.slots[index]);
		if slot.is_none() {
			match input.try_poll() {
				Some(value) => *slot = Some(value),
				None => missing.push(index),
			}
		}
	}
	if !missing.is_empty() {
		// an outside reader drained a probed input; keep what was
		// claimed and wait for the gaps to fill again
		if inner.phase.compare_exchange(FIRING, IDLE, Ordering::AcqRel, Ordering::Acquire).is_ok() {
			arm(inner, round, missing);
		} else {
			finish(inner);
		}
		return;
	}
	let values: Vec<Arc<I>> =
		round.slots.iter().map(|slot| lock(slot).take().expect("operator input value claimed")).collect();
	let scope = OperatorScope {
		outputs: &inner.outputs,
		publish: &inner.publish,
	};
	let outcome = catch_unwind(AssertUnwindSafe(|| (inner.body)(&scope, values)));
	match outcome {
		Ok(Ok(())) => {
			if inner.phase.compare_exchange(FIRING, IDLE, Ordering::AcqRel, Ordering::Acquire).is_ok() {
				launch_round(inner);
			} else {
				finish(inner);
			}
		}
		Ok(Err(failure)) => fail(inner, failure),
		Err(payload) => fail(inner, Error::handler_failure(inner.name.as_str(), panic_message(payload))),
	}
}

fn fail<I, O>(inner: &Arc<OperatorInner<I, O>>, failure: Error)
where
	I: Send + Sync + 'static,
	O: Send + Sync + 'static,
{
	match lock(&inner.on_failure).as_ref() {
		Some(hook) => hook(&failure),
		None => error!(operator = %inner.name, error = %failure, "operator body failed"),
	}
	inner.phase.store(STOPPED, Ordering::Release);
	finish(inner);
}

fn finish<I, O>(inner: &Arc<OperatorInner<I, O>>)
where
	I: Send + Sync + 'static,
	O: Send + Sync + 'static,
{
	if inner.completion.bind_unique(()).is_ok() {
		debug!(operator = %inner.name, "operator stopped");
	}
}

/// Handle to a running operator.
pub struct Operator<I: Send + Sync + 'static, O: Send + Sync + 'static> {
	inner: Arc<OperatorInner<I, O>>,
}

impl<I: Send + Sync + 'static, O: Send + Sync + 'static> Clone for Operator<I, O> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<I: Send + Sync + 'static, O: Send + Sync + 'static> Operator<I, O> {
	/// Stop after the current firing, if one is running.
	pub fn stop(&self) {
		let previous = self.inner.phase.swap(STOPPED, Ordering::AcqRel);
		if previous == IDLE {
			finish(&self.inner);
		}
		// FIRING finishes from the running body; STOPPED already did
	}

	/// Install a failure hook observing body errors. Without one,
	/// failures are logged.
	pub fn on_failure<F: Fn(&Error) + Send + 'static>(&self, hook: F) {
		*lock(&self.inner.on_failure) = Some(Box::new(hook));
	}

	/// Bound once the operator has stopped.
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
	/// An operator firing `body` once per tuple of values, one drawn
	/// from each input, publishing through the scope.
	///
	/// Panics when `inputs` is empty.
	pub fn operator<I, O, F>(
		&self,
		inputs: Vec<DataflowStream<I>>,
		outputs: Vec<DataflowStream<O>>,
		body: F,
	) -> Operator<I, O>
	where
		I: Send + Sync + 'static,
		O: Send + Sync + 'static,
		F: Fn(&OperatorScope<'_, O>, Vec<Arc<I>>) -> Result<()> + Send + Sync + 'static,
	{
		assert!(!inputs.is_empty(), "operator requires at least one input");
		let inner = Arc::new(OperatorInner {
			group: self.clone(),
			inputs,
			outputs,
			body: Box::new(body),
			phase: AtomicU8::new(IDLE),
			publish: Mutex::new(()),
			on_failure: Mutex::new(None),
			completion: DataflowVariable::new(),
			name: format!("operator-{}", OPERATOR_SEQ.fetch_add(1, Ordering::Relaxed)),
		});
		launch_round(&inner);
		Operator {
			inner,
		}
	}

	/// An operator copying every value of `input` to all `outputs`
	/// atomically.
	pub fn splitter<T>(&self, input: DataflowStream<T>, outputs: Vec<DataflowStream<T>>) -> Operator<T, T>
	where
		T: Clone + Send + Sync + 'static,
	{
		self.operator(vec![input], outputs, |scope, mut values| {
			let value = values.pop().expect("splitter has exactly one input");
			scope.bind_all((*value).clone());
			Ok(())
		})
	}
}
