// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Actor lifecycle, ordering and scheduling scenarios.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use conflux_core::ActorConfig;
use conflux_runtime::{
	Actor, ActorContext, ActorRef, DataflowVariable, Envelope, Error, Flow, Group, GroupConfig, Lifecycle, PoolKind,
};
use conflux_testing::wait_for;

fn fixed_group(name: &str, workers: usize) -> Group {
	Group::new(
		GroupConfig::default()
			.with_name(name)
			.with_pool_kind(PoolKind::Fixed)
			.with_workers(workers)
			.with_daemon(false),
	)
}

#[test]
fn per_sender_fifo_is_preserved() {
	let group = fixed_group("actor-fifo", 4);
	let received = Arc::new(Mutex::new(Vec::new()));
	let handle = {
		let received = received.clone();
		group.spawn_fn((), move |_state: &mut (), message: Envelope<i64>, _ctx: &ActorContext<i64>| {
			received.lock().unwrap().push(*message.payload());
			Flow::Continue
		})
		.unwrap()
	};
	for value in 0..200 {
		handle.send(value).unwrap();
	}
	handle.stop();
	handle.join().unwrap();
	assert_eq!(*received.lock().unwrap(), (0..200).collect::<Vec<_>>());
	group.shutdown();
}

#[test]
fn no_two_workers_execute_the_same_actor() {
	let group = fixed_group("actor-serial", 4);
	let active = Arc::new(AtomicUsize::new(0));
	let overlap = Arc::new(AtomicBool::new(false));
	let handled = Arc::new(AtomicUsize::new(0));
	let handle = {
		let active = active.clone();
		let overlap = overlap.clone();
		let handled = handled.clone();
		group.spawn_fn((), move |_state: &mut (), _message: Envelope<u8>, _ctx: &ActorContext<u8>| {
			if active.fetch_add(1, Ordering::SeqCst) > 0 {
				overlap.store(true, Ordering::SeqCst);
			}
			active.fetch_sub(1, Ordering::SeqCst);
			handled.fetch_add(1, Ordering::SeqCst);
			Flow::Continue
		})
		.unwrap()
	};
	let mut senders = Vec::new();
	for _ in 0..8 {
		let reference = handle.actor_ref();
		senders.push(thread::spawn(move || {
			for _ in 0..100 {
				reference.send(0).unwrap();
			}
		}));
	}
	for sender in senders {
		sender.join().unwrap();
	}
	wait_for(|| handled.load(Ordering::SeqCst) == 800, "all messages handled");
	assert!(!overlap.load(Ordering::SeqCst), "two workers ran the same actor");
	group.shutdown();
}

#[test]
fn reply_reaches_the_sender_reference() {
	let group = fixed_group("actor-reply", 2);
	let echoed: DataflowVariable<i64> = group.variable();
	let echo = group
		.spawn_fn((), |_state: &mut (), message: Envelope<i64>, _ctx: &ActorContext<i64>| {
			let value = *message.payload();
			message.reply(value + 1).unwrap();
			Flow::Continue
		})
		.unwrap();
	let collector = {
		let echoed = echoed.clone();
		group.spawn_fn((), move |_state: &mut (), message: Envelope<i64>, _ctx: &ActorContext<i64>| {
			let _ = echoed.bind(*message.payload());
			Flow::Continue
		})
		.unwrap()
	};
	echo.actor_ref().send_with_reply(41, &collector.actor_ref()).unwrap();
	assert_eq!(*echoed.get().unwrap(), 42);
	group.shutdown();
}

#[test]
fn reply_without_address_fails() {
	let group = fixed_group("actor-noreply", 2);
	let observed: DataflowVariable<bool> = group.variable();
	let handle = {
		let observed = observed.clone();
		group.spawn_fn((), move |_state: &mut (), message: Envelope<u8>, _ctx: &ActorContext<u8>| {
			let _ = observed.bind(message.reply(1) == Err(Error::NoReplyTo));
			Flow::Continue
		})
		.unwrap()
	};
	handle.send(0).unwrap();
	assert!(*observed.get().unwrap());
	group.shutdown();
}

struct Stopper {
	stopped: Arc<AtomicBool>,
	failures: Arc<AtomicUsize>,
}

enum StopperMsg {
	Work,
	Explode,
}

impl Actor for Stopper {
	type State = usize;
	type Message = StopperMsg;

	fn init(&self, _ctx: &ActorContext<Self::Message>) -> usize {
		0
	}

	fn handle(&self, state: &mut usize, message: Envelope<StopperMsg>, _ctx: &ActorContext<StopperMsg>) -> Flow {
		match message.into_payload() {
			StopperMsg::Work => {
				*state += 1;
				Flow::Continue
			}
			StopperMsg::Explode => panic!("kaboom"),
		}
	}

	fn on_stop(&self, _state: &mut usize, _ctx: &ActorContext<StopperMsg>) {
		self.stopped.store(true, Ordering::SeqCst);
	}

	fn on_failure(&self, _error: &Error) {
		self.failures.fetch_add(1, Ordering::SeqCst);
	}
}

#[test]
fn orderly_stop_delivers_the_final_stop_and_closes_the_mailbox() {
	let group = fixed_group("actor-stop", 2);
	let stopped = Arc::new(AtomicBool::new(false));
	let handle = group
		.spawn(Stopper {
			stopped: stopped.clone(),
			failures: Arc::new(AtomicUsize::new(0)),
		})
		.unwrap();
	handle.send(StopperMsg::Work).unwrap();
	handle.stop();
	handle.join().unwrap();
	assert!(stopped.load(Ordering::SeqCst));
	assert_eq!(handle.lifecycle(), Lifecycle::Stopped);
	assert_eq!(handle.send(StopperMsg::Work), Err(Error::MailboxClosed));
	group.shutdown();
}

#[test]
fn handler_panic_stops_the_actor_and_notifies_the_failure_hook() {
	let group = fixed_group("actor-panic", 2);
	let failures = Arc::new(AtomicUsize::new(0));
	let handle = group
		.spawn(Stopper {
			stopped: Arc::new(AtomicBool::new(false)),
			failures: failures.clone(),
		})
		.unwrap();
	handle.send(StopperMsg::Explode).unwrap();
	handle.join().unwrap();
	assert_eq!(failures.load(Ordering::SeqCst), 1);
	assert_eq!(handle.send(StopperMsg::Work), Err(Error::MailboxClosed));
	group.shutdown();
}

#[test]
fn terminate_discards_queued_messages() {
	let group = fixed_group("actor-terminate", 2);
	let handled = Arc::new(AtomicUsize::new(0));
	let handle = {
		let handled = handled.clone();
		group.spawn_unstarted(conflux_runtime::ClosureActor::new(
			(),
			move |_state: &mut (), _message: Envelope<u8>, _ctx: &ActorContext<u8>| {
				handled.fetch_add(1, Ordering::SeqCst);
				Flow::Continue
			},
		))
	};
	// queued while the actor is still Created
	handle.send(1).unwrap();
	handle.send(2).unwrap();
	handle.terminate();
	handle.join().unwrap();
	assert_eq!(handled.load(Ordering::SeqCst), 0);
	assert_eq!(handle.send(3), Err(Error::MailboxClosed));
	group.shutdown();
}

#[test]
fn pinned_actor_processes_and_stops() {
	let group = fixed_group("actor-pinned", 2);
	let received = Arc::new(Mutex::new(Vec::new()));
	let handle = {
		let received = received.clone();
		group.spawn_pinned(conflux_runtime::ClosureActor::new(
			(),
			move |_state: &mut (), message: Envelope<i64>, _ctx: &ActorContext<i64>| {
				received.lock().unwrap().push(*message.payload());
				Flow::Continue
			},
		))
		.unwrap()
	};
	for value in 0..10 {
		handle.send(value).unwrap();
	}
	handle.stop();
	handle.join().unwrap();
	assert_eq!(*received.lock().unwrap(), (0..10).collect::<Vec<_>>());
	group.shutdown();
}

struct IdleWatcher {
	hits: Arc<AtomicUsize>,
}

impl Actor for IdleWatcher {
	type State = ();
	type Message = ();

	fn init(&self, _ctx: &ActorContext<()>) {}

	fn handle(&self, _state: &mut (), _message: Envelope<()>, _ctx: &ActorContext<()>) -> Flow {
		Flow::Continue
	}

	fn on_timeout(&self, _state: &mut (), _ctx: &ActorContext<()>) -> Flow {
		self.hits.fetch_add(1, Ordering::SeqCst);
		Flow::Continue
	}

	fn config(&self) -> ActorConfig {
		ActorConfig::default().with_receive_timeout(Duration::from_millis(25))
	}
}

#[test]
fn receive_timeout_fires_while_idle() {
	let group = fixed_group("actor-timeout", 2);
	let hits = Arc::new(AtomicUsize::new(0));
	let handle = group
		.spawn(IdleWatcher {
			hits: hits.clone(),
		})
		.unwrap();
	wait_for(|| hits.load(Ordering::SeqCst) >= 2, "timeout signal repeats while idle");
	handle.stop();
	handle.join().unwrap();
	group.shutdown();
}

#[test]
fn timers_deliver_and_cancel() {
	let group = fixed_group("actor-timers", 2);
	let received = Arc::new(AtomicUsize::new(0));
	let handle = {
		let received = received.clone();
		group.spawn_fn((), move |_state: &mut (), _message: Envelope<u8>, _ctx: &ActorContext<u8>| {
			received.fetch_add(1, Ordering::SeqCst);
			Flow::Continue
		})
		.unwrap()
	};
	conflux_runtime::schedule_once(handle.actor_ref(), Duration::from_millis(10), 1);
	let cancelled = conflux_runtime::schedule_once(handle.actor_ref(), Duration::from_millis(50), 2);
	assert!(cancelled.cancel());
	assert!(!cancelled.is_armed());
	wait_for(|| received.load(Ordering::SeqCst) == 1, "scheduled message delivered");
	thread::sleep(Duration::from_millis(80));
	assert_eq!(received.load(Ordering::SeqCst), 1, "cancelled timer fired");
	group.shutdown();
}

#[test]
fn repeating_timer_delivers_until_cancelled() {
	let group = fixed_group("actor-repeat", 2);
	let received = Arc::new(AtomicUsize::new(0));
	let handle = {
		let received = received.clone();
		group.spawn_fn((), move |_state: &mut (), _message: Envelope<u8>, _ctx: &ActorContext<u8>| {
			received.fetch_add(1, Ordering::SeqCst);
			Flow::Continue
		})
		.unwrap()
	};
	let ticker = conflux_runtime::schedule_repeat(handle.actor_ref(), Duration::from_millis(10), 0);
	wait_for(|| received.load(Ordering::SeqCst) >= 3, "repeating timer keeps delivering");
	assert!(ticker.cancel());
	let after_cancel = received.load(Ordering::SeqCst);
	thread::sleep(Duration::from_millis(60));
	// one in-flight delivery may still land; the stream of ticks stops
	assert!(received.load(Ordering::SeqCst) <= after_cancel + 1);
	group.shutdown();
}

enum RingMsg {
	Next(ActorRef<RingMsg>),
	Token(usize),
}

#[test]
fn ten_thousand_cooperative_actors_share_four_workers() {
	const RING: usize = 10_000;
	const LAPS: usize = 10;

	let group = fixed_group("actor-ring", 4);
	let active = Arc::new(AtomicUsize::new(0));
	let peak = Arc::new(AtomicUsize::new(0));
	let done: DataflowVariable<()> = group.variable();

	let mut handles = Vec::with_capacity(RING);
	for _ in 0..RING {
		let active = active.clone();
		let peak = peak.clone();
		let done = done.clone();
		let handle = group
			.spawn_fn(
				None::<ActorRef<RingMsg>>,
				move |next: &mut Option<ActorRef<RingMsg>>,
				      message: Envelope<RingMsg>,
				      _ctx: &ActorContext<RingMsg>| {
					match message.into_payload() {
						RingMsg::Next(reference) => *next = Some(reference),
						RingMsg::Token(hops) => {
							let now = active.fetch_add(1, Ordering::SeqCst) + 1;
							peak.fetch_max(now, Ordering::SeqCst);
							if hops == 0 {
								let _ = done.bind_unique(());
							} else if let Some(next) = next.as_ref() {
								let _ = next.send(RingMsg::Token(hops - 1));
							}
							active.fetch_sub(1, Ordering::SeqCst);
						}
					}
					Flow::Continue
				},
			)
			.unwrap();
		handles.push(handle);
	}
	for (index, handle) in handles.iter().enumerate() {
		let next = handles[(index + 1) % RING].actor_ref();
		handle.send(RingMsg::Next(next)).unwrap();
	}
	handles[0].send(RingMsg::Token(RING * LAPS)).unwrap();

	assert!(
		done.get_timeout(Duration::from_secs(60)).unwrap().is_some(),
		"ring token completed all laps"
	);
	assert!(peak.load(Ordering::SeqCst) <= 4, "more active handlers than workers");
	group.shutdown();
}
