//! Concurrency tests for the single-redemption guarantee.
//!
//! These tests fire many redemptions of the same ticket at once on a
//! multi-threaded runtime and verify that exactly one of them flips the
//! ticket to `used`.
//!
//! Run with: `cargo test --test concurrency_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use turnstile_core::environment::SystemClock;
use turnstile_core::{
    CheckStatus, RedeemResult, RedeemStatus, ScanAction, TicketDetails, TicketId, TicketStatus,
};
use turnstile_runtime::{
    InMemoryTicketStore, LifecycleConfig, LifecycleEnvironment, RetryPolicy, TicketLifecycle,
};
use turnstile_testing::SequentialTicketIds;

fn lifecycle(config: LifecycleConfig) -> Arc<TicketLifecycle<InMemoryTicketStore>> {
    Arc::new(TicketLifecycle::with_config(
        InMemoryTicketStore::new(),
        LifecycleEnvironment::new(Arc::new(SystemClock), Arc::new(SequentialTicketIds::new())),
        config,
    ))
}

fn vip() -> TicketDetails {
    TicketDetails::new("Alice", "a@x.com", "VIP $200", "PayPal")
}

async fn redeem_storm(
    lifecycle: &Arc<TicketLifecycle<InMemoryTicketStore>>,
    ticket_id: &TicketId,
    requests: usize,
) -> Vec<RedeemResult> {
    let tasks: Vec<_> = (0..requests)
        .map(|_| {
            let lifecycle = Arc::clone(lifecycle);
            let ticket_id = ticket_id.clone();
            tokio::spawn(async move { lifecycle.redeem(&ticket_id).await })
        })
        .collect();

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("store failed"))
        .collect()
}

fn count(results: &[RedeemResult], status: RedeemStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

/// 100 concurrent redemptions of one ticket, failing fast on contention.
///
/// Verifies that:
/// - Exactly 1 redemption reports `redeemed = true`
/// - Every other one reports `used` or `busy`
/// - The history holds exactly one `redeemed` entry, plus one `checked`
///   entry per `used` result and none per `busy` result
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_redeems_admit_exactly_once() {
    let lifecycle = lifecycle(LifecycleConfig::default());
    let ticket = lifecycle.issue(vip()).await.unwrap();

    let results = redeem_storm(&lifecycle, ticket.id(), 100).await;

    let winners = results.iter().filter(|r| r.redeemed).count();
    assert_eq!(winners, 1, "exactly one redemption must win");
    assert_eq!(count(&results, RedeemStatus::Valid), 1);
    assert_eq!(
        count(&results, RedeemStatus::Used) + count(&results, RedeemStatus::Busy),
        99
    );
    assert_eq!(count(&results, RedeemStatus::Invalid), 0);

    for busy in results.iter().filter(|r| r.status == RedeemStatus::Busy) {
        assert!(busy.ticket.is_none());
        assert!(!busy.redeemed);
    }

    let stored = lifecycle.ticket(ticket.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), TicketStatus::Used);
    assert_eq!(stored.scans_with(ScanAction::Redeemed), 1);
    assert_eq!(
        stored.scans_with(ScanAction::Checked),
        count(&results, RedeemStatus::Used)
    );
    assert!(lifecycle.locks().is_empty());
}

/// With enough retries, contended callers wait their turn and see `used`.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_retrying_redeems_never_report_busy() {
    let config = LifecycleConfig {
        lock_retry: RetryPolicy::builder()
            .max_retries(50)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .build(),
        ..LifecycleConfig::default()
    };
    let lifecycle = lifecycle(config);
    let ticket = lifecycle.issue(vip()).await.unwrap();

    let results = redeem_storm(&lifecycle, ticket.id(), 32).await;

    assert_eq!(results.iter().filter(|r| r.redeemed).count(), 1);
    assert_eq!(count(&results, RedeemStatus::Busy), 0);
    assert_eq!(count(&results, RedeemStatus::Used), 31);

    let stored = lifecycle.ticket(ticket.id()).await.unwrap().unwrap();
    assert_eq!(stored.scan_history().len(), 32);
    assert_eq!(stored.scans_with(ScanAction::Redeemed), 1);
}

/// Checks racing a redemption never lose history entries or undo the flip.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_checks_racing_redeem_keep_every_entry() {
    let lifecycle = lifecycle(LifecycleConfig::default());
    let ticket = lifecycle.issue(vip()).await.unwrap();

    let checks: Vec<_> = (0..50)
        .map(|_| {
            let lifecycle = Arc::clone(&lifecycle);
            let ticket_id = ticket.id().clone();
            tokio::spawn(async move { lifecycle.check(&ticket_id).await })
        })
        .collect();
    let redeem = {
        let lifecycle = Arc::clone(&lifecycle);
        let ticket_id = ticket.id().clone();
        tokio::spawn(async move { lifecycle.redeem(&ticket_id).await })
    };

    let check_results: Vec<_> = join_all(checks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    let redeemed = redeem.await.unwrap().unwrap();

    assert!(redeemed.redeemed);
    assert!(
        check_results
            .iter()
            .all(|r| matches!(r.status, CheckStatus::Valid | CheckStatus::Used))
    );

    let stored = lifecycle.ticket(ticket.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), TicketStatus::Used);
    assert!(stored.used_at().is_some());
    assert_eq!(stored.scan_history().len(), 51);
    assert_eq!(stored.scans_with(ScanAction::Checked), 50);
    assert_eq!(stored.scans_with(ScanAction::Redeemed), 1);
}

/// Redemptions of different tickets never contend with each other.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_distinct_tickets_redeem_independently() {
    let lifecycle = lifecycle(LifecycleConfig::default());

    let mut ids = Vec::new();
    for _ in 0..20 {
        ids.push(lifecycle.issue(vip()).await.unwrap().id().clone());
    }

    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|ticket_id| {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.redeem(&ticket_id).await })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(results.iter().all(|r| r.redeemed));
    for ticket in lifecycle.store().snapshot().await {
        assert_eq!(ticket.status(), TicketStatus::Used);
    }
}
