// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Thread-based concurrency runtime.
//!
//! Conflux composes concurrent programs from independent participants
//! communicating by message:
//!
//! - **Actors** process mailbox messages one at a time on a shared worker
//!   pool, either cooperatively (no worker while idle) or pinned to one
//!   worker.
//! - **Agents** serialize updates against a single owned value.
//! - **Dataflow variables and streams** are single-assignment cells and
//!   chains of them; **operators** fire on all-inputs-ready and
//!   **selectors** on any-input-ready.
//! - **Groups** tie it together: a unit of shared scheduling owning a
//!   pool, a fairness default and the factories for everything above.
//!
//! Everything is plain threads: no async runtime, no futures. Suspension
//! points (`get`, `read`, a full bounded mailbox) block the calling
//! thread; cooperative participants release their worker instead of
//! blocking it.
//!
//! # Example
//!
//! ```ignore
//! use conflux_core::GroupConfig;
//! use conflux_runtime::group::Group;
//!
//! let group = Group::new(GroupConfig::default());
//! let result = group.task(|| 40)?.then(|value| *value + 2);
//! assert_eq!(*result.get()?, 42);
//! ```

pub mod actor;
pub mod agent;
pub mod context;
pub mod dataflow;
pub mod group;
pub mod mailbox;
pub mod pool;
pub mod remote;
pub mod task;
mod util;

pub use actor::{
	schedule_once, schedule_repeat, Actor, ActorContext, ActorHandle, ActorRef, ClosureActor, Envelope, Flow,
	Lifecycle, TestHarness, TimerHandle,
};
pub use agent::Agent;
pub use conflux_core::{ActorConfig, Error, GroupConfig, PoolKind, PoolSize, Result};
pub use context::current_group;
pub use dataflow::{when_all, DataflowStream, DataflowVariable, Operator, OperatorScope, Select, Selected, Selector};
pub use group::Group;
pub use mailbox::Mailbox;
pub use pool::Pool;
pub use remote::{RemoteVariableResolver, VariableDirectory};
pub use task::task;
