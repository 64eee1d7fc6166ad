// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Conflux: a thread-based concurrency runtime.
//!
//! This crate is the user-facing facade over the workspace members. See
//! [`conflux_runtime`] for the runtime itself and [`conflux_core`] for the
//! shared error and configuration types.

pub use conflux_core::{ActorConfig, Error, GroupConfig, PoolKind, PoolSize, Result};
pub use conflux_runtime::{
	current_group, schedule_once, schedule_repeat, task, when_all, Actor, ActorContext, ActorHandle, ActorRef, Agent,
	ClosureActor, DataflowStream, DataflowVariable, Envelope, Flow, Group, Lifecycle, Mailbox, Operator,
	OperatorScope, Pool, RemoteVariableResolver, Select, Selected, Selector, TestHarness, TimerHandle,
	VariableDirectory,
};
