// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Pluggable remote-variable seam.
//!
//! The core defines no wire protocol. A transport crate implements
//! [`RemoteVariableResolver`] to expose a variable published on another
//! host as a local one, and serves lookups against a
//! [`VariableDirectory`] of locally published variables.

use dashmap::DashMap;

use conflux_core::Result;

use crate::dataflow::variable::DataflowVariable;

/// Name-addressed registry of locally published variables.
pub struct VariableDirectory<T: Send + Sync + 'static> {
	entries: DashMap<String, DataflowVariable<T>>,
}

impl<T: Send + Sync + 'static> VariableDirectory<T> {
	pub fn new() -> Self {
		Self {
			entries: DashMap::new(),
		}
	}

	/// Publish `variable` under `name` for remote consumers. Returns the
	/// previously published variable, if any.
	pub fn bind_remote(&self, name: impl Into<String>, variable: &DataflowVariable<T>) -> Option<DataflowVariable<T>> {
		self.entries.insert(name.into(), variable.clone())
	}

	pub fn lookup(&self, name: &str) -> Option<DataflowVariable<T>> {
		self.entries.get(name).map(|entry| entry.value().clone())
	}

	pub fn remove(&self, name: &str) -> Option<DataflowVariable<T>> {
		self.entries.remove(name).map(|(_, variable)| variable)
	}

	pub fn names(&self) -> Vec<String> {
		self.entries.iter().map(|entry| entry.key().clone()).collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<T: Send + Sync + 'static> Default for VariableDirectory<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// Implemented by transports that can materialize a remote variable as a
/// local one whose reads drive a network fetch.
pub trait RemoteVariableResolver<T: Send + Sync + 'static>: Send + Sync {
	fn get_remote(&self, host: &str, port: u16, name: &str) -> Result<DataflowVariable<T>>;
}
