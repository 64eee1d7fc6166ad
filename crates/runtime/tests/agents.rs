// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Agent serialization scenarios.

use std::thread;

use conflux_runtime::{Group, GroupConfig, PoolKind};

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
fn concurrent_appends_are_all_applied_exactly_once() {
	let group = fixed_group("agent-append", 4);
	let agent = group.agent(Vec::<usize>::new()).unwrap();

	let mut senders = Vec::new();
	for chunk in 0..8 {
		let agent_updates: Vec<usize> = (chunk * 125..(chunk + 1) * 125).collect();
		let agent = agent.clone();
		senders.push(thread::spawn(move || {
			for value in agent_updates {
				agent.send(move |list| list.push(value)).unwrap();
			}
		}));
	}
	for sender in senders {
		sender.join().unwrap();
	}

	let mut snapshot = agent.value().unwrap();
	snapshot.sort_unstable();
	assert_eq!(snapshot, (0..1000).collect::<Vec<_>>());
	group.shutdown();
}

#[test]
fn reads_are_serialized_behind_pending_updates() {
	let group = fixed_group("agent-read", 2);
	let agent = group.agent(0i64).unwrap();
	for _ in 0..100 {
		agent.send(|value| *value += 1).unwrap();
	}
	// the snapshot observes every update queued before the read
	assert_eq!(agent.value().unwrap(), 100);
	group.shutdown();
}

#[test]
fn send_and_wait_blocks_until_applied() {
	let group = fixed_group("agent-wait", 2);
	let agent = group.agent(String::new()).unwrap();
	agent.send_and_wait(|text| text.push_str("hello")).unwrap();
	assert_eq!(agent.value().unwrap(), "hello");
	group.shutdown();
}

#[test]
fn value_with_projects_without_exposing_state() {
	let group = fixed_group("agent-project", 2);
	let agent = group.agent(vec![3, 1, 2]).unwrap();
	let length = agent.value_with(|list| list.len()).unwrap();
	assert_eq!(length, 3);
	group.shutdown();
}

#[test]
fn stopped_agent_rejects_updates() {
	let group = fixed_group("agent-stop", 2);
	let agent = group.agent(0i64).unwrap();
	agent.send(|value| *value += 1).unwrap();
	agent.stop();
	agent.handle().join().unwrap();
	assert!(agent.send(|value| *value += 1).is_err());
	group.shutdown();
}
