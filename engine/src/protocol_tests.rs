//! Reservation-protocol tests.
//!
//! These cover the consistency properties the engine guarantees: ledger
//! conservation, quota caps under any interleaving, pool capacity across
//! reserve/finalize/rollback, rollback idempotency, and the
//! failure-compensates / uncertain-does-not asymmetry.

use commonware_runtime::deterministic::Runner;
use commonware_runtime::Runner as _;
use futures::join;
use tivoli_types::api::{
    FinalizeAction, FinalizeOutcome, LedgerOutcome, Payout, Rejection, ReserveOutcome,
    RollbackOutcome, SlotDisposition,
};
use tivoli_types::economy::{
    ClaimKind, ClaimStatus, Currency, LedgerSource, PoolId, Resource, StoredResult, Tier,
    SECONDS_PER_DAY,
};

use crate::mocks::{create_account_keypair, create_memory_engine};
use crate::ReserveRequest;

fn draw_request(account: &commonware_cryptography::ed25519::PublicKey) -> ReserveRequest {
    ReserveRequest {
        account: account.clone(),
        kind: ClaimKind::GachaDraw,
        pool: None,
        allowance: None,
        wager: 0,
        wager_source: LedgerSource::GachaDraw,
        wager_description: "draw".to_string(),
        bump_pity: true,
    }
}

fn item_finalize(item_id: u16, tier: Tier, conversion: u64) -> FinalizeAction {
    FinalizeAction {
        payout: Payout::Item { item_id, tier },
        slot: SlotDisposition::Consume,
        duplicate_conversion: conversion,
    }
}

#[test]
fn test_debit_beyond_balance_rejects_without_entry() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(1);

        engine
            .credit(
                &account,
                50,
                Currency::Points,
                LedgerSource::ManualAdjust,
                "seed",
                1,
            )
            .await
            .unwrap();

        let outcome = engine
            .debit(
                &account,
                100,
                Currency::Points,
                LedgerSource::LotterySpin,
                "spin",
                2,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LedgerOutcome::Rejected(Rejection::InsufficientBalance)
        );

        assert_eq!(engine.balance(&account).await.unwrap().points, 50);
        // Only the seed credit is on record.
        let entries = engine.recent_ledger(&account).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].delta, 50);
    });
}

#[test]
fn test_balance_equals_sum_of_entry_deltas() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(2);

        engine
            .credit(
                &account,
                500,
                Currency::Points,
                LedgerSource::ManualAdjust,
                "seed",
                1,
            )
            .await
            .unwrap();
        engine
            .debit(
                &account,
                120,
                Currency::Points,
                LedgerSource::LotterySpin,
                "spin",
                2,
            )
            .await
            .unwrap();
        engine
            .adjust(
                &account,
                -80,
                Currency::Points,
                LedgerSource::ManualAdjust,
                "correction",
                3,
            )
            .await
            .unwrap();
        engine
            .adjust(
                &account,
                30,
                Currency::Points,
                LedgerSource::ManualAdjust,
                "correction",
                4,
            )
            .await
            .unwrap();

        // Over-draining adjust is refused with no effect.
        let outcome = engine
            .adjust(
                &account,
                -10_000,
                Currency::Points,
                LedgerSource::ManualAdjust,
                "bad",
                5,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LedgerOutcome::Rejected(Rejection::InsufficientBalance)
        );

        let balance = engine.balance(&account).await.unwrap().points;
        let entries = engine.recent_ledger(&account).await.unwrap();
        let sum: i64 = entries
            .iter()
            .filter(|entry| entry.currency == Currency::Points)
            .map(|entry| entry.delta)
            .sum();
        assert_eq!(balance as i64, sum);
        assert_eq!(balance, 330);
        assert_eq!(entries.len(), 4);
    });
}

#[test]
fn test_quota_grants_clip_at_daily_limit() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(3);
        let limit = 500;

        let first = engine
            .grant_up_to(
                &account,
                Resource::GamePoints,
                300,
                limit,
                LedgerSource::GameReward,
                "game",
                100,
            )
            .await
            .unwrap();
        assert_eq!(first.granted, 300);

        let second = engine
            .grant_up_to(
                &account,
                Resource::GamePoints,
                300,
                limit,
                LedgerSource::GameReward,
                "game",
                200,
            )
            .await
            .unwrap();
        assert_eq!(second.granted, 200);
        assert_eq!(second.used_today, limit);

        // Cap reached: the grant clips to zero and writes no ledger entry.
        let third = engine
            .grant_up_to(
                &account,
                Resource::GamePoints,
                50,
                limit,
                LedgerSource::GameReward,
                "game",
                300,
            )
            .await
            .unwrap();
        assert_eq!(third.granted, 0);
        assert_eq!(third.balance_after, 500);
        assert_eq!(engine.recent_ledger(&account).await.unwrap().len(), 2);

        assert_eq!(
            engine
                .daily_usage(&account, Resource::GamePoints, 400)
                .await
                .unwrap(),
            limit
        );

        // Midnight rolls the counter over.
        let next_day = 300 + SECONDS_PER_DAY;
        let fresh = engine
            .grant_up_to(
                &account,
                Resource::GamePoints,
                50,
                limit,
                LedgerSource::GameReward,
                "game",
                next_day,
            )
            .await
            .unwrap();
        assert_eq!(fresh.granted, 50);
        assert_eq!(fresh.used_today, 50);
    });
}

#[test]
fn test_capacity_one_pool_admits_exactly_one_of_two_racers() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, alice) = create_account_keypair(4);
        let (_, bob) = create_account_keypair(5);

        let pool = PoolId::CodeBatch(1);
        assert!(engine.provision_pool(&pool, 1).await.unwrap());

        let request = |account: &commonware_cryptography::ed25519::PublicKey| ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::CodeClaim,
            pool: Some(pool.clone()),
            allowance: None,
            wager: 0,
            wager_source: LedgerSource::CodeClaim,
            wager_description: "code".to_string(),
            bump_pity: false,
        };

        let (first, second) = join!(
            engine.reserve(&request(&alice), 10),
            engine.reserve(&request(&bob), 10),
        );
        let outcomes = [first.unwrap(), second.unwrap()];

        let reserved = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ReserveOutcome::Reserved { .. }))
            .count();
        let exhausted = outcomes
            .iter()
            .filter(|outcome| {
                matches!(outcome, ReserveOutcome::Rejected(Rejection::PoolExhausted))
            })
            .count();
        assert_eq!(reserved, 1);
        assert_eq!(exhausted, 1);

        let pool_state = engine.pool(&pool).await.unwrap().unwrap();
        pool_state.validate_invariants().unwrap();
        assert_eq!(pool_state.available(), 0);
    });
}

#[test]
fn test_in_flight_claim_rejects_with_pending() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(6);

        let first = engine.reserve(&draw_request(&account), 10).await.unwrap();
        assert!(matches!(first, ReserveOutcome::Reserved { .. }));

        let second = engine.reserve(&draw_request(&account), 11).await.unwrap();
        assert_eq!(second, ReserveOutcome::Rejected(Rejection::Pending));
    });
}

#[test]
fn test_once_per_day_allowance() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(7);

        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::Checkin,
            pool: None,
            allowance: Some((Resource::Checkin, 1)),
            wager: 0,
            wager_source: LedgerSource::Checkin,
            wager_description: "check-in".to_string(),
            bump_pity: false,
        };

        let ReserveOutcome::Reserved { claim_id, .. } =
            engine.reserve(&request, 10).await.unwrap()
        else {
            panic!("first check-in should reserve");
        };
        let action = FinalizeAction {
            payout: Payout::Points {
                amount: 25,
                source: LedgerSource::Checkin,
            },
            slot: SlotDisposition::Consume,
            duplicate_conversion: 0,
        };
        assert!(matches!(
            engine.finalize(claim_id, &action, 11).await.unwrap(),
            FinalizeOutcome::Finalized { .. }
        ));

        // Same day: already claimed.
        let repeat = engine.reserve(&request, 12).await.unwrap();
        assert_eq!(repeat, ReserveOutcome::Rejected(Rejection::AlreadyClaimed));

        // Next day: eligible again.
        let tomorrow = engine
            .reserve(&request, 12 + SECONDS_PER_DAY)
            .await
            .unwrap();
        assert!(matches!(tomorrow, ReserveOutcome::Reserved { .. }));
    });
}

#[test]
fn test_rollback_restores_everything_and_is_idempotent() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(8);

        engine
            .credit(
                &account,
                200,
                Currency::Points,
                LedgerSource::ManualAdjust,
                "seed",
                1,
            )
            .await
            .unwrap();

        let pool = PoolId::Raffle(1);
        engine.provision_pool(&pool, 5).await.unwrap();

        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::LotterySpin,
            pool: Some(pool.clone()),
            allowance: Some((Resource::LotterySpin, 3)),
            wager: 50,
            wager_source: LedgerSource::LotterySpin,
            wager_description: "spin".to_string(),
            bump_pity: true,
        };

        let ReserveOutcome::Reserved { claim_id, pity } =
            engine.reserve(&request, 10).await.unwrap()
        else {
            panic!("reserve should succeed");
        };
        assert_eq!(pity.unwrap().rare, 1);
        assert_eq!(engine.balance(&account).await.unwrap().points, 150);
        assert_eq!(engine.pool(&pool).await.unwrap().unwrap().available(), 4);
        assert_eq!(
            engine
                .daily_usage(&account, Resource::LotterySpin, 10)
                .await
                .unwrap(),
            1
        );

        assert_eq!(
            engine.rollback(claim_id, 20).await.unwrap(),
            RollbackOutcome::RolledBack
        );

        // Pre-reservation state restored.
        assert_eq!(engine.balance(&account).await.unwrap().points, 200);
        assert_eq!(engine.pool(&pool).await.unwrap().unwrap().available(), 5);
        assert_eq!(engine.pity(&account).await.unwrap().rare, 0);
        assert_eq!(
            engine
                .daily_usage(&account, Resource::LotterySpin, 20)
                .await
                .unwrap(),
            0
        );
        let claim = engine.claim(claim_id).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Failure);

        // Second rollback is a no-op, not a double restore.
        assert_eq!(
            engine.rollback(claim_id, 21).await.unwrap(),
            RollbackOutcome::AlreadySettled
        );
        assert_eq!(engine.balance(&account).await.unwrap().points, 200);
        assert_eq!(engine.pool(&pool).await.unwrap().unwrap().available(), 5);

        // The account can reserve again.
        assert!(matches!(
            engine.reserve(&request, 30).await.unwrap(),
            ReserveOutcome::Reserved { .. }
        ));
    });
}

#[test]
fn test_duplicate_item_converts_to_shards() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(9);

        // First copy lands in holdings.
        let ReserveOutcome::Reserved { claim_id, .. } =
            engine.reserve(&draw_request(&account), 10).await.unwrap()
        else {
            panic!("reserve should succeed");
        };
        let outcome = engine
            .finalize(claim_id, &item_finalize(10, Tier::Rare, 5), 11)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::Finalized {
                duplicate: false,
                conversion: 0,
                balance_after: None,
            }
        );
        assert!(engine.holdings(&account).await.unwrap().contains(10));

        // Second copy converts.
        let ReserveOutcome::Reserved { claim_id, .. } =
            engine.reserve(&draw_request(&account), 20).await.unwrap()
        else {
            panic!("reserve should succeed");
        };
        let outcome = engine
            .finalize(claim_id, &item_finalize(10, Tier::Rare, 5), 21)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::Finalized {
                duplicate: true,
                conversion: 5,
                balance_after: None,
            }
        );

        let holdings = engine.holdings(&account).await.unwrap();
        assert_eq!(holdings.items, vec![10]);
        assert_eq!(engine.balance(&account).await.unwrap().shards, 5);
    });
}

#[test]
fn test_pity_resets_produced_and_lower_tiers_only() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(10);

        // Nine settled draws build the streak.
        for i in 0..9 {
            let ReserveOutcome::Reserved { claim_id, .. } =
                engine.reserve(&draw_request(&account), i).await.unwrap()
            else {
                panic!("reserve should succeed");
            };
            engine
                .finalize(claim_id, &item_finalize(1, Tier::Common, 1), i)
                .await
                .unwrap();
        }
        assert_eq!(engine.pity(&account).await.unwrap().rare, 9);

        // Tenth draw produces epic: epic and rare reset, legendary survives.
        let ReserveOutcome::Reserved { claim_id, pity } =
            engine.reserve(&draw_request(&account), 100).await.unwrap()
        else {
            panic!("reserve should succeed");
        };
        assert_eq!(pity.as_ref().unwrap().rare, 10);
        assert_eq!(pity.unwrap().legendary, 10);

        engine
            .finalize(claim_id, &item_finalize(20, Tier::Epic, 25), 101)
            .await
            .unwrap();

        let pity = engine.pity(&account).await.unwrap();
        assert_eq!(pity.rare, 0);
        assert_eq!(pity.epic, 0);
        assert_eq!(pity.legendary, 10);
    });
}

#[test]
fn test_uncertain_claims_are_never_compensated() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(11);

        engine
            .credit(
                &account,
                100,
                Currency::Points,
                LedgerSource::ManualAdjust,
                "seed",
                1,
            )
            .await
            .unwrap();

        let pool = PoolId::DailyCredit(0);
        engine.provision_pool(&pool, 3).await.unwrap();

        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::LotterySpin,
            pool: Some(pool.clone()),
            allowance: None,
            wager: 50,
            wager_source: LedgerSource::LotterySpin,
            wager_description: "spin".to_string(),
            bump_pity: false,
        };
        let ReserveOutcome::Reserved { claim_id, .. } =
            engine.reserve(&request, 10).await.unwrap()
        else {
            panic!("reserve should succeed");
        };

        assert!(engine.mark_uncertain(claim_id, 200, 20).await.unwrap());
        let claim = engine.claim(claim_id).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Uncertain);
        assert_eq!(claim.attempts, 1);
        assert_eq!(claim.external_amount, 200);

        // No compensation: slot stays consumed, wager stays debited.
        assert_eq!(engine.pool(&pool).await.unwrap().unwrap().available(), 2);
        assert_eq!(engine.balance(&account).await.unwrap().points, 50);

        // Rollback refuses to touch it.
        assert_eq!(
            engine.rollback(claim_id, 30).await.unwrap(),
            RollbackOutcome::AlreadySettled
        );
        assert_eq!(engine.pool(&pool).await.unwrap().unwrap().available(), 2);
        assert_eq!(engine.balance(&account).await.unwrap().points, 50);

        // New attempts for the same account/kind stay blocked.
        assert_eq!(
            engine.reserve(&request, 31).await.unwrap(),
            ReserveOutcome::Rejected(Rejection::Pending)
        );

        // It is surfaced for reconciliation.
        let parked = engine.uncertain_claims().await.unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].id, claim_id);

        // Reconciliation confirms the grant: finalize once, claim leaves the
        // uncertain index, a second finalize cannot double-grant.
        let action = FinalizeAction {
            payout: Payout::External { amount: 200 },
            slot: SlotDisposition::Consume,
            duplicate_conversion: 0,
        };
        assert!(matches!(
            engine.finalize(claim_id, &action, 40).await.unwrap(),
            FinalizeOutcome::Finalized { .. }
        ));
        assert!(engine.uncertain_claims().await.unwrap().is_empty());
        assert_eq!(
            engine.finalize(claim_id, &action, 41).await.unwrap(),
            FinalizeOutcome::Rejected(Rejection::ClaimNotPending)
        );

        // And the account is unblocked.
        assert!(matches!(
            engine.reserve(&request, 50).await.unwrap(),
            ReserveOutcome::Reserved { .. }
        ));
    });
}

#[test]
fn test_idempotency_guard_at_most_once() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();

        assert!(engine.guard_acquire("session-1", 60, 100).await.unwrap());
        // Second caller for the live key loses.
        assert!(!engine.guard_acquire("session-1", 60, 110).await.unwrap());

        engine
            .guard_complete(
                "session-1",
                StoredResult::Granted {
                    amount: 120,
                    balance_after: 320,
                },
                3_600,
                120,
            )
            .await
            .unwrap();

        // Replay fetches the stored result instead of re-executing.
        let record = engine.guard_lookup("session-1", 130).await.unwrap().unwrap();
        assert_eq!(
            record.result,
            Some(StoredResult::Granted {
                amount: 120,
                balance_after: 320,
            })
        );
        assert!(!engine.guard_acquire("session-1", 60, 140).await.unwrap());

        // Definitive business failure releases the key for a real retry.
        engine.guard_release("session-1").await.unwrap();
        assert!(engine.guard_acquire("session-1", 60, 150).await.unwrap());

        // Expiry frees an abandoned lock.
        assert!(engine.guard_acquire("session-2", 60, 100).await.unwrap());
        assert!(engine.guard_acquire("session-2", 60, 161).await.unwrap());
    });
}

#[test]
fn test_stuck_claim_sweep_candidates() {
    let executor = Runner::default();
    executor.start(|_| async move {
        let engine = create_memory_engine();
        let (_, account) = create_account_keypair(12);

        let ReserveOutcome::Reserved { claim_id, .. } =
            engine.reserve(&draw_request(&account), 100).await.unwrap()
        else {
            panic!("reserve should succeed");
        };

        // Too fresh to be stuck.
        assert!(engine.stuck_claims(99).await.unwrap().is_empty());

        let stuck = engine.stuck_claims(100).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, claim_id);

        engine.rollback(claim_id, 700).await.unwrap();
        assert!(engine.stuck_claims(1_000).await.unwrap().is_empty());
    });
}
