use commonware_cryptography::ed25519::{PrivateKey, PublicKey};
use commonware_cryptography::Signer;
use rand::{rngs::StdRng, SeedableRng};
use tivoli_types::config::{
    CheckinConfig, ConversionRates, EconomyConfig, GachaConfig, ItemDef, LotteryConfig,
    NewUserConfig, PityThresholds, PrizeDef, PrizeKind, RaffleConfig, ScoreConfig, TierWeights,
};
use tivoli_types::economy::{Tier, DEFAULT_IDEMPOTENCY_TTL_SECS, DEFAULT_STUCK_CLAIM_SECS};

use crate::engine::Engine;
use crate::state::Memory;

/// Creates a deterministic account keypair for tests.
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = PrivateKey::random(&mut rng);
    let public = private.public_key();
    (private, public)
}

/// Fresh in-memory engine with the UTC day boundary.
pub fn create_memory_engine() -> Engine<Memory> {
    Engine::new(Memory::default(), 0)
}

/// A small but fully-populated catalog used across tests.
pub fn sample_config() -> EconomyConfig {
    EconomyConfig {
        day_offset_secs: 0,
        idempotency_ttl_secs: DEFAULT_IDEMPOTENCY_TTL_SECS,
        stuck_claim_secs: DEFAULT_STUCK_CLAIM_SECS,
        gacha: GachaConfig {
            draw_cost: 100,
            weights: TierWeights {
                common: 800,
                rare: 150,
                epic: 45,
                legendary: 5,
            },
            pity: PityThresholds {
                rare: 10,
                epic: 50,
                legendary: 90,
            },
            conversion: ConversionRates {
                common: 1,
                rare: 5,
                epic: 25,
                legendary: 100,
            },
            items: vec![
                ItemDef {
                    id: 1,
                    tier: Tier::Common,
                },
                ItemDef {
                    id: 2,
                    tier: Tier::Common,
                },
                ItemDef {
                    id: 10,
                    tier: Tier::Rare,
                },
                ItemDef {
                    id: 11,
                    tier: Tier::Rare,
                },
                ItemDef {
                    id: 20,
                    tier: Tier::Epic,
                },
                ItemDef {
                    id: 30,
                    tier: Tier::Legendary,
                },
            ],
        },
        lottery: LotteryConfig {
            spin_cost: 50,
            daily_budget: 2,
            daily_spin_limit: 50,
            prizes: vec![
                PrizeDef {
                    id: 1,
                    weight: 70,
                    kind: PrizeKind::Nothing,
                },
                PrizeDef {
                    id: 2,
                    weight: 25,
                    kind: PrizeKind::Points { amount: 80 },
                },
                PrizeDef {
                    id: 3,
                    weight: 5,
                    kind: PrizeKind::DirectCredit { amount: 200 },
                },
            ],
        },
        checkin: CheckinConfig { reward: 25 },
        score: ScoreConfig {
            score_divisor: 100,
            daily_point_limit: 500,
        },
        raffle: RaffleConfig {
            entry_cost: 10,
            daily_entry_limit: 5,
            prize_amount: 1_000,
        },
        new_user: NewUserConfig { grant: 300 },
    }
}
