// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Thread-based actor core.
//!
//! Two flavors share one send/receive surface:
//!
//! - **Cooperative** (the default): an idle actor holds no worker.
//!   Sending wakes it up; the wake-up drains a burst of messages on a pool
//!   worker, then releases it. Thousands of actors can share a small pool.
//! - **Pinned**: the actor acquires one pool worker for its whole life and
//!   blocks it on the mailbox between messages. Simple, at the cost of one
//!   worker per live actor.
//!
//! # Design
//!
//! 1. **Behavior as a value**: an [`Actor`] is a reducer over
//!    `(state, message)`. Receive protocols with several stages are state
//!    enums, not captured continuations.
//! 2. **Single execution**: at most one worker runs a given actor's
//!    handler at any instant.
//! 3. **Failure isolation**: a panic in a handler stops that actor and is
//!    reported through [`Actor::on_failure`]; it never reaches the sender.
//! 4. **No async**: workers are OS threads; suspension is either blocking
//!    (pinned) or releasing the worker (cooperative).
//!
//! # Example
//!
//! ```ignore
//! use conflux_runtime::group::Group;
//! use conflux_runtime::actor::Flow;
//! use conflux_core::GroupConfig;
//!
//! let group = Group::new(GroupConfig::default());
//! let counter = group.spawn_fn(0i64, |count, message, _ctx| {
//!     match message.into_payload() {
//!         1 => *count += 1,
//!         _ => {}
//!     }
//!     Flow::Continue
//! })?;
//! counter.send(1)?;
//! ```
//!
//! # Testing
//!
//! Behaviors can be driven synchronously with the
//! [`TestHarness`](testing::TestHarness), without threads:
//!
//! ```ignore
//! let mut harness = TestHarness::new(Counter);
//! harness.send(CounterMsg::Increment);
//! harness.process_all();
//! assert_eq!(*harness.state(), 1);
//! ```

pub(crate) mod cell;
pub mod closure;
pub mod context;
pub mod envelope;
pub(crate) mod pinned;
pub mod reference;
pub mod testing;
pub mod timers;
pub mod traits;

pub use closure::ClosureActor;
pub use context::ActorContext;
pub use envelope::Envelope;
pub use reference::{ActorHandle, ActorRef, Lifecycle};
pub use testing::TestHarness;
pub use timers::{schedule_once, schedule_repeat, TimerHandle};
pub use traits::{Actor, Flow};
