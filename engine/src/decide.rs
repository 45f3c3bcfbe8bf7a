//! The decide step: outcome selection between reserve and finalize.
//!
//! Runs outside the store on purpose: atomic procedures must stay
//! deterministic with respect to retries, so randomness is evaluated here
//! against the counter values the reservation returned. Callers inject the
//! RNG (flows seed a `rand_chacha` generator; tests pass a fixed seed).

use rand::Rng;
use tivoli_types::config::{GachaConfig, LotteryConfig, PrizeDef, PrizeKind};
use tivoli_types::economy::{PityCounters, Tier};

/// Result of the gacha tier decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierPick {
    pub tier: Tier,
    /// A guarantee threshold raised the outcome above the random draw.
    pub forced: bool,
}

/// Highest tier whose guarantee threshold the counters have reached.
/// Precedence is strictly descending: a counter satisfying both the rare and
/// epic guarantees yields epic.
fn guaranteed_tier(config: &GachaConfig, pity: &PityCounters) -> Option<Tier> {
    for tier in [Tier::Legendary, Tier::Epic, Tier::Rare] {
        let threshold = config.pity.get(tier);
        if threshold > 0 && pity.get(tier) >= threshold {
            return Some(tier);
        }
    }
    None
}

fn random_tier(config: &GachaConfig, rng: &mut impl Rng) -> Tier {
    let total = config.weights.total();
    let mut roll = rng.gen_range(0..total);
    for tier in [Tier::Common, Tier::Rare, Tier::Epic, Tier::Legendary] {
        let weight = config.weights.get(tier) as u64;
        if roll < weight {
            return tier;
        }
        roll -= weight;
    }
    // Weights sum to `total`, so the loop always returns.
    unreachable!("tier roll exceeded weight total")
}

/// Pick the draw's tier: weighted random, overridden upward when a pity
/// threshold is met. `pity` must be the counters *after* the reservation
/// bumped them.
pub fn decide_tier(config: &GachaConfig, pity: &PityCounters, rng: &mut impl Rng) -> TierPick {
    let rolled = random_tier(config, rng);
    match guaranteed_tier(config, pity) {
        Some(guaranteed) if guaranteed > rolled => TierPick {
            tier: guaranteed,
            forced: true,
        },
        _ => TierPick {
            tier: rolled,
            forced: false,
        },
    }
}

/// Uniform pick among the catalog's items of the decided tier. Falls back to
/// the common table if the catalog has no item of that tier (validation
/// rejects such catalogs up front, so this is belt only).
pub fn decide_item(config: &GachaConfig, tier: Tier, rng: &mut impl Rng) -> u16 {
    let of_tier: Vec<_> = config
        .items
        .iter()
        .filter(|item| item.tier == tier)
        .collect();
    let candidates = if of_tier.is_empty() {
        config.items.iter().collect()
    } else {
        of_tier
    };
    candidates[rng.gen_range(0..candidates.len())].id
}

/// Weighted lottery prize pick. When the day's direct-credit budget is gone,
/// direct-credit prizes drop out of the table and the spin degrades to
/// internal prizes. The paid spin must still resolve to something.
pub fn decide_prize<'a>(
    config: &'a LotteryConfig,
    budget_available: bool,
    rng: &mut impl Rng,
) -> &'a PrizeDef {
    let candidates: Vec<_> = config
        .prizes
        .iter()
        .filter(|prize| budget_available || !matches!(prize.kind, PrizeKind::DirectCredit { .. }))
        .collect();

    let total: u64 = candidates.iter().map(|prize| prize.weight as u64).sum();
    let mut roll = rng.gen_range(0..total);
    for prize in &candidates {
        let weight = prize.weight as u64;
        if roll < weight {
            return prize;
        }
        roll -= weight;
    }
    unreachable!("prize roll exceeded weight total")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::sample_config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn threshold_forces_at_least_that_tier() {
        let config = sample_config().gacha;
        let pity = PityCounters {
            rare: config.pity.rare,
            epic: 0,
            legendary: 0,
        };

        // Whatever the roll, the outcome is at least rare.
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pick = decide_tier(&config, &pity, &mut rng);
            assert!(pick.tier >= Tier::Rare, "seed {seed} produced {:?}", pick);
        }
    }

    #[test]
    fn highest_satisfied_threshold_wins() {
        let config = sample_config().gacha;
        // Counters satisfying rare AND epic guarantees must yield epic.
        let pity = PityCounters {
            rare: config.pity.rare,
            epic: config.pity.epic,
            legendary: 0,
        };
        assert_eq!(guaranteed_tier(&config, &pity), Some(Tier::Epic));

        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pick = decide_tier(&config, &pity, &mut rng);
            assert!(pick.tier >= Tier::Epic);
        }
    }

    #[test]
    fn zero_threshold_disables_guarantee() {
        let mut config = sample_config().gacha;
        config.pity.rare = 0;
        let pity = PityCounters {
            rare: 10_000,
            epic: 0,
            legendary: 0,
        };
        assert_eq!(guaranteed_tier(&config, &pity), None);
    }

    #[test]
    fn forced_flag_only_when_roll_was_raised() {
        let config = sample_config().gacha;
        let pity = PityCounters::default();
        let mut rng = StdRng::seed_from_u64(7);
        let pick = decide_tier(&config, &pity, &mut rng);
        assert!(!pick.forced);
    }

    #[test]
    fn decide_item_respects_tier() {
        let config = sample_config().gacha;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let item = decide_item(&config, Tier::Rare, &mut rng);
            let def = config.items.iter().find(|i| i.id == item).unwrap();
            assert_eq!(def.tier, Tier::Rare);
        }
    }

    #[test]
    fn exhausted_budget_never_yields_direct_credit() {
        let config = sample_config().lottery;
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let prize = decide_prize(&config, false, &mut rng);
            assert!(!matches!(prize.kind, PrizeKind::DirectCredit { .. }));
        }
    }

    #[test]
    fn weighted_pick_reaches_every_prize() {
        let config = sample_config().lottery;
        let mut rng = StdRng::seed_from_u64(13);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2_000 {
            seen.insert(decide_prize(&config, true, &mut rng).id);
        }
        assert_eq!(seen.len(), config.prizes.len());
    }
}
