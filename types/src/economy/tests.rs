use super::*;
use bytes::BytesMut;
use commonware_codec::{Encode, ReadExt, Write};
use commonware_cryptography::{ed25519::PrivateKey, PrivateKeyExt, Signer};
use rand::{rngs::StdRng, SeedableRng};

fn test_account(seed: u64) -> commonware_cryptography::ed25519::PublicKey {
    let mut rng = StdRng::seed_from_u64(seed);
    PrivateKey::from_rng(&mut rng).public_key()
}

#[test]
fn currency_and_source_roundtrip() {
    for currency in [Currency::Points, Currency::Shards] {
        let encoded = currency.encode();
        assert_eq!(Currency::read(&mut &encoded[..]).unwrap(), currency);
    }
    for source in [
        LedgerSource::GameReward,
        LedgerSource::Checkin,
        LedgerSource::GachaDraw,
        LedgerSource::DuplicateConversion,
        LedgerSource::LotterySpin,
        LedgerSource::LotteryPrize,
        LedgerSource::RaffleEntry,
        LedgerSource::CodeClaim,
        LedgerSource::NewUserGrant,
        LedgerSource::Refund,
        LedgerSource::ManualAdjust,
    ] {
        let encoded = source.encode();
        assert_eq!(LedgerSource::read(&mut &encoded[..]).unwrap(), source);
    }
}

#[test]
fn balance_roundtrip() {
    let balance = BalanceState {
        points: 1_234,
        shards: 56,
    };
    let encoded = balance.encode();
    assert_eq!(BalanceState::read(&mut &encoded[..]).unwrap(), balance);
}

#[test]
fn balance_reads_legacy_format_without_shards() {
    // Balances persisted before the shard currency carried only points.
    let mut buf = BytesMut::new();
    777u64.write(&mut buf);

    let decoded = BalanceState::read(&mut buf.as_ref()).unwrap();
    assert_eq!(decoded.points, 777);
    assert_eq!(decoded.shards, 0);
}

#[test]
fn ledger_history_roundtrip() {
    let mut history = LedgerHistory::default();
    history.append(
        50,
        Currency::Points,
        LedgerSource::Checkin,
        "daily check-in".to_string(),
        50,
        1_000,
    );
    history.append(
        -20,
        Currency::Points,
        LedgerSource::LotterySpin,
        "spin cost".to_string(),
        30,
        1_060,
    );

    let encoded = history.encode();
    assert_eq!(LedgerHistory::read(&mut &encoded[..]).unwrap(), history);
}

#[test]
fn ledger_history_trims_window_and_keeps_ids_monotone() {
    let mut history = LedgerHistory::default();
    for i in 0..(LEDGER_WINDOW as u64 + 25) {
        history.append(
            1,
            Currency::Points,
            LedgerSource::GameReward,
            String::new(),
            i + 1,
            i,
        );
    }

    assert_eq!(history.entries.len(), LEDGER_WINDOW);
    assert_eq!(history.next_entry_id, LEDGER_WINDOW as u64 + 25);
    // Oldest retained entry is the one right after the trimmed prefix.
    assert_eq!(history.entries.first().unwrap().id, 25);
    assert_eq!(
        history.entries.last().unwrap().id,
        LEDGER_WINDOW as u64 + 24
    );
}

#[test]
fn ledger_entry_rejects_oversized_description() {
    let entry = LedgerEntry {
        id: 0,
        delta: 1,
        currency: Currency::Points,
        source: LedgerSource::ManualAdjust,
        description: "x".repeat(MAX_DESCRIPTION_LENGTH + 1),
        balance_after: 1,
        created_ts: 0,
    };
    let encoded = entry.encode();
    assert!(LedgerEntry::read(&mut &encoded[..]).is_err());
}

#[test]
fn pool_reserve_and_release() {
    let mut pool = Pool::new(2);
    assert_eq!(pool.available(), 2);
    assert!(pool.reserve_one());
    assert!(pool.reserve_one());
    assert!(!pool.reserve_one());
    assert_eq!(pool.available(), 0);
    pool.validate_invariants().unwrap();

    pool.release_one();
    assert_eq!(pool.available(), 1);
    pool.validate_invariants().unwrap();
}

#[test]
fn pool_invariant_detects_over_reservation() {
    let pool = Pool {
        total_capacity: 1,
        reserved_or_consumed: 2,
    };
    assert!(matches!(
        pool.validate_invariants(),
        Err(PoolInvariantError::OverReserved { .. })
    ));
}

#[test]
fn pool_id_roundtrip() {
    for pool in [
        PoolId::CodeBatch(7),
        PoolId::DailyCredit(19_000),
        PoolId::NewUserGrant(test_account(1)),
        PoolId::Raffle(3),
    ] {
        let encoded = pool.encode();
        assert_eq!(PoolId::read(&mut &encoded[..]).unwrap(), pool);
    }
}

#[test]
fn pity_bump_and_reset_semantics() {
    let mut pity = PityCounters::default();
    for _ in 0..12 {
        pity.bump();
    }
    assert_eq!(pity.get(Tier::Rare), 12);
    assert_eq!(pity.get(Tier::Legendary), 12);

    // Producing Epic resets Epic and Rare, leaves Legendary accumulating.
    pity.reset_for(Tier::Epic);
    assert_eq!(pity.rare, 0);
    assert_eq!(pity.epic, 0);
    assert_eq!(pity.legendary, 12);

    // Producing Common resets nothing.
    pity.bump();
    pity.reset_for(Tier::Common);
    assert_eq!(pity.rare, 1);
    assert_eq!(pity.legendary, 13);
}

#[test]
fn pity_revert_bump_is_exact_inverse() {
    let mut pity = PityCounters {
        rare: 3,
        epic: 7,
        legendary: 11,
    };
    let before = pity.clone();
    pity.bump();
    pity.revert_bump();
    assert_eq!(pity, before);

    // Reverting at zero saturates instead of wrapping.
    let mut zeroed = PityCounters::default();
    zeroed.revert_bump();
    assert_eq!(zeroed, PityCounters::default());
}

#[test]
fn claim_roundtrip() {
    let claim = PendingClaim {
        id: 42,
        account: test_account(2),
        pool: Some(PoolId::DailyCredit(19_321)),
        kind: ClaimKind::LotterySpin,
        status: ClaimStatus::Pending,
        wagered: 50,
        attempts: 1,
        created_ts: 1_700_000_000,
        settled_ts: 0,
        pity_bumped: false,
        counted_resource: Some(Resource::LotterySpin),
        external_amount: 0,
    };
    let encoded = claim.encode();
    assert_eq!(PendingClaim::read(&mut &encoded[..]).unwrap(), claim);
}

#[test]
fn claim_reads_legacy_format_without_pity_flag() {
    let claim = PendingClaim {
        id: 9,
        account: test_account(3),
        pool: None,
        kind: ClaimKind::Checkin,
        status: ClaimStatus::Success,
        wagered: 0,
        attempts: 1,
        created_ts: 5,
        settled_ts: 6,
        pity_bumped: true,
        counted_resource: None,
        external_amount: 99,
    };
    let mut encoded = claim.encode().to_vec();
    // Strip the trailing pity flag, counted-resource and external-amount
    // bytes to simulate an old record.
    encoded.truncate(encoded.len() - 10);

    let decoded = PendingClaim::read(&mut &encoded[..]).unwrap();
    assert!(!decoded.pity_bumped);
    assert_eq!(decoded.counted_resource, None);
    assert_eq!(decoded.external_amount, 0);
    assert_eq!(decoded.id, 9);
    assert_eq!(decoded.status, ClaimStatus::Success);
}

#[test]
fn claim_registry_lifecycle() {
    let mut registry = ClaimRegistry::default();
    let a = registry.allocate();
    let b = registry.allocate();
    assert_eq!(registry.open, vec![a, b]);

    registry.close(a);
    assert_eq!(registry.open, vec![b]);

    registry.park_uncertain(b);
    assert!(registry.open.is_empty());
    assert_eq!(registry.uncertain, vec![b]);
    // Parking twice does not duplicate.
    registry.park_uncertain(b);
    assert_eq!(registry.uncertain, vec![b]);

    registry.resolve_uncertain(b);
    assert!(registry.uncertain.is_empty());
}

#[test]
fn holdings_insert_detects_duplicates() {
    let mut holdings = Holdings::default();
    assert!(holdings.insert(30));
    assert!(holdings.insert(10));
    assert!(holdings.insert(20));
    assert!(!holdings.insert(20));
    assert_eq!(holdings.items, vec![10, 20, 30]);
}

#[test]
fn holdings_read_rejects_unsorted() {
    let mut buf = BytesMut::new();
    vec![5u16, 3u16].write(&mut buf);
    assert!(Holdings::read(&mut buf.as_ref()).is_err());
}

#[test]
fn idempotency_record_roundtrip() {
    for record in [
        IdempotencyRecord::locked(1_000),
        IdempotencyRecord {
            status: GuardStatus::Done,
            expires_ts: 2_000,
            result: Some(StoredResult::Granted {
                amount: 120,
                balance_after: 320,
            }),
        },
        IdempotencyRecord {
            status: GuardStatus::Done,
            expires_ts: 3_000,
            result: Some(StoredResult::Settled { claim_id: 17 }),
        },
    ] {
        let encoded = record.encode();
        assert_eq!(IdempotencyRecord::read(&mut &encoded[..]).unwrap(), record);
    }
}

#[test]
fn idempotency_expiry() {
    let record = IdempotencyRecord::locked(100);
    assert!(!record.expired(99));
    assert!(record.expired(100));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ledger_window_never_exceeds_bound(deltas in proptest::collection::vec(1u64..100, 0..300)) {
            let mut history = LedgerHistory::default();
            let mut balance = 0u64;
            for (i, delta) in deltas.iter().enumerate() {
                balance += delta;
                history.append(
                    *delta as i64,
                    Currency::Points,
                    LedgerSource::GameReward,
                    String::new(),
                    balance,
                    i as u64,
                );
            }
            prop_assert!(history.entries.len() <= LEDGER_WINDOW);
            prop_assert_eq!(history.next_entry_id, deltas.len() as u64);
            // Retained entries are contiguous and end at the newest id.
            for pair in history.entries.windows(2) {
                prop_assert_eq!(pair[1].id, pair[0].id + 1);
            }
        }

        #[test]
        fn holdings_stay_sorted(items in proptest::collection::vec(0u16..200, 0..100)) {
            let mut holdings = Holdings::default();
            for item in items {
                holdings.insert(item);
            }
            prop_assert!(holdings.items.windows(2).all(|pair| pair[0] < pair[1]));
        }

        #[test]
        fn pity_reset_never_touches_higher_tiers(
            bumps in 0u32..200,
            produced in prop_oneof![
                Just(Tier::Common),
                Just(Tier::Rare),
                Just(Tier::Epic),
                Just(Tier::Legendary),
            ],
        ) {
            let mut pity = PityCounters::default();
            for _ in 0..bumps {
                pity.bump();
            }
            pity.reset_for(produced);
            for tier in [Tier::Rare, Tier::Epic, Tier::Legendary] {
                if tier <= produced {
                    prop_assert_eq!(pity.get(tier), 0);
                } else {
                    prop_assert_eq!(pity.get(tier), bumps);
                }
            }
        }
    }
}
