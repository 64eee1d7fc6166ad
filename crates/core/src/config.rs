// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Configuration for groups, pools and actors.
//!
//! All knobs are plain data with `with_*` builders so they can be assembled
//! in code or deserialized from an application config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which scheduler backs a group's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
	/// Work-stealing fork-join pool.
	ForkJoin,
	/// Fixed number of dedicated worker threads draining one queue.
	Fixed,
	/// Like `Fixed` but workers are spawned on demand and retire after
	/// an idle keep-alive.
	Cached,
}

/// Worker count for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSize {
	/// Size the pool to the available parallelism.
	Auto,
	/// Exactly this many workers.
	Workers(usize),
}

impl Default for PoolSize {
	fn default() -> Self {
		Self::Auto
	}
}

/// Configuration of a group and the pool it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
	/// Name used for worker threads and tracing. Autogenerated when
	/// absent.
	pub name: Option<String>,
	/// Scheduler flavor.
	pub pool_kind: PoolKind,
	/// Worker count.
	pub pool_size: PoolSize,
	/// Daemon pools never block the caller on shutdown; non-daemon
	/// pools join their workers.
	pub daemon: bool,
	/// Default fairness for cooperative actors created from this group.
	pub fair: bool,
}

impl Default for GroupConfig {
	fn default() -> Self {
		Self {
			name: None,
			pool_kind: PoolKind::ForkJoin,
			pool_size: PoolSize::Auto,
			daemon: true,
			fair: false,
		}
	}
}

impl GroupConfig {
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_pool_kind(mut self, kind: PoolKind) -> Self {
		self.pool_kind = kind;
		self
	}

	/// Shorthand for an explicit worker count.
	pub fn with_workers(mut self, workers: usize) -> Self {
		self.pool_size = PoolSize::Workers(workers);
		self
	}

	pub fn with_pool_size(mut self, size: PoolSize) -> Self {
		self.pool_size = size;
		self
	}

	pub fn with_daemon(mut self, daemon: bool) -> Self {
		self.daemon = daemon;
		self
	}

	pub fn with_fair(mut self, fair: bool) -> Self {
		self.fair = fair;
		self
	}
}

/// Per-actor configuration. Unset fields fall back to the owning group's
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActorConfig {
	/// Name used for tracing and, for pinned actors, the worker it
	/// occupies. Autogenerated when absent.
	pub name: Option<String>,
	/// Bounded mailbox capacity; `None` means unbounded.
	pub mailbox_capacity: Option<usize>,
	/// Release the worker after every message instead of draining a
	/// burst. `None` inherits the group default.
	pub fair: Option<bool>,
	/// Deliver a timeout signal when no message arrives within this
	/// window.
	pub receive_timeout: Option<Duration>,
}

impl ActorConfig {
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
		self.mailbox_capacity = Some(capacity);
		self
	}

	pub fn with_fair(mut self, fair: bool) -> Self {
		self.fair = Some(fair);
		self
	}

	pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
		self.receive_timeout = Some(timeout);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn group_defaults() {
		let config = GroupConfig::default();
		assert_eq!(config.pool_kind, PoolKind::ForkJoin);
		assert_eq!(config.pool_size, PoolSize::Auto);
		assert!(config.daemon);
		assert!(!config.fair);
	}

	#[test]
	fn builders_chain() {
		let config = GroupConfig::default().with_name("replies").with_pool_kind(PoolKind::Fixed).with_workers(4);
		assert_eq!(config.name.as_deref(), Some("replies"));
		assert_eq!(config.pool_kind, PoolKind::Fixed);
		assert_eq!(config.pool_size, PoolSize::Workers(4));
	}

	#[test]
	fn actor_config_roundtrips_through_serde() {
		let config = ActorConfig::default()
			.with_mailbox_capacity(16)
			.with_receive_timeout(Duration::from_millis(250));
		let json = serde_json::to_string(&config).expect("serialize");
		let back: ActorConfig = serde_json::from_str(&json).expect("deserialize");
		assert_eq!(config, back);
	}
}
