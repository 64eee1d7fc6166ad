// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! One-shot computations producing a dataflow variable.
//!
//! A task runs its body on the group pool with the group installed as
//! ambient, so dataflow constructs created inside the body default to the
//! same group. Normal return binds the result variable; a panic binds an
//! error envelope instead.

use std::panic::{catch_unwind, AssertUnwindSafe};

use conflux_core::{Error, Result};

use crate::context;
use crate::dataflow::variable::DataflowVariable;
use crate::group::Group;
use crate::util::panic_message;

impl Group {
	/// Submit `body` to the pool; the returned variable resolves with
	/// its result, or with an error envelope when the body panics.
	///
	/// Fails with [`Error::PoolShutdown`] when the group no longer
	/// accepts work.
	pub fn task<T, F>(&self, body: F) -> Result<DataflowVariable<T>>
	where
		T: Send + Sync + 'static,
		F: FnOnce() -> T + Send + 'static,
	{
		let result = DataflowVariable::new();
		let cell = result.clone();
		self.schedule(move || match catch_unwind(AssertUnwindSafe(body)) {
			Ok(value) => {
				let _ = cell.bind_unique(value);
			}
			Err(payload) => {
				let _ = cell.fail(Error::handler_failure("task", panic_message(payload)));
			}
		})?;
		Ok(result)
	}
}

/// Run `body` as a task of the ambient group, or of the default group
/// when called outside any pool work. Nested tasks therefore chain within
/// the group that started them.
pub fn task<T, F>(body: F) -> Result<DataflowVariable<T>>
where
	T: Send + Sync + 'static,
	F: FnOnce() -> T + Send + 'static,
{
	let group = context::current_group().unwrap_or_else(|| Group::default_group().clone());
	group.task(body)
}
