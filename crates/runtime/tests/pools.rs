// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 Conflux

//! Pool behavior observed through groups.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use conflux_runtime::{Group, GroupConfig, PoolKind, PoolSize};
use conflux_testing::wait_for;

#[test]
fn fixed_pool_resizes_up_and_down() {
	let group = Group::new(
		GroupConfig::default()
			.with_name("pool-resize")
			.with_pool_kind(PoolKind::Fixed)
			.with_workers(1)
			.with_daemon(false),
	);
	assert_eq!(group.pool().worker_count(), 1);
	group.pool().resize(4);
	assert_eq!(group.pool().worker_count(), 4);
	group.pool().resize(2);
	wait_for(|| group.pool().worker_count() == 2, "surplus workers retire");
	group.shutdown();
}

#[test]
fn cached_pool_starts_empty_and_grows_on_demand() {
	let group = Group::new(
		GroupConfig::default()
			.with_name("pool-cached")
			.with_pool_kind(PoolKind::Cached)
			.with_pool_size(PoolSize::Auto)
			.with_daemon(false),
	);
	assert_eq!(group.pool().worker_count(), 0);
	let ran = Arc::new(AtomicUsize::new(0));
	{
		let ran = ran.clone();
		group.schedule(move || {
			ran.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
	}
	wait_for(|| ran.load(Ordering::SeqCst) == 1, "job ran on a demand-spawned worker");
	assert!(group.pool().worker_count() >= 1);
	group.shutdown();
}

#[test]
fn daemon_shutdown_does_not_block_on_in_flight_work() {
	let group = Group::new(
		GroupConfig::default()
			.with_name("pool-daemon")
			.with_pool_kind(PoolKind::Fixed)
			.with_workers(1)
			.with_daemon(true),
	);
	group
		.schedule(|| {
			std::thread::sleep(Duration::from_millis(300));
		})
		.unwrap();
	let started = Instant::now();
	group.shutdown();
	assert!(started.elapsed() < Duration::from_millis(150), "daemon shutdown blocked on workers");
}

#[test]
fn non_daemon_shutdown_waits_for_the_backlog() {
	let group = Group::new(
		GroupConfig::default()
			.with_name("pool-backlog")
			.with_pool_kind(PoolKind::Fixed)
			.with_workers(2)
			.with_daemon(false),
	);
	let ran = Arc::new(AtomicUsize::new(0));
	for _ in 0..50 {
		let ran = ran.clone();
		group.schedule(move || {
			ran.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
	}
	group.shutdown();
	assert_eq!(ran.load(Ordering::SeqCst), 50);
}

#[test]
fn forkjoin_group_runs_work() {
	let group = Group::new(
		GroupConfig::default()
			.with_name("pool-forkjoin")
			.with_pool_kind(PoolKind::ForkJoin)
			.with_workers(2)
			.with_daemon(false),
	);
	let ran = Arc::new(AtomicUsize::new(0));
	for _ in 0..20 {
		let ran = ran.clone();
		group.schedule(move || {
			ran.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();
	}
	group.shutdown();
	assert_eq!(ran.load(Ordering::SeqCst), 20);
}
