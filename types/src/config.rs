//! Catalog configuration.
//!
//! Tier weights, pity thresholds, prize tables and daily limits are static
//! read-only inputs supplied by the catalog store. They are loaded once from
//! YAML and validated up front; a bad catalog fails fast instead of
//! surfacing as a mispriced draw later.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::economy::{Tier, DEFAULT_IDEMPOTENCY_TTL_SECS, DEFAULT_STUCK_CLAIM_SECS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: u16,
    pub tier: Tier,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierWeights {
    pub common: u32,
    pub rare: u32,
    pub epic: u32,
    pub legendary: u32,
}

impl TierWeights {
    pub fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Common => self.common,
            Tier::Rare => self.rare,
            Tier::Epic => self.epic,
            Tier::Legendary => self.legendary,
        }
    }

    pub fn total(&self) -> u64 {
        self.common as u64 + self.rare as u64 + self.epic as u64 + self.legendary as u64
    }
}

/// Draws guaranteed to produce at least the tier once its counter reaches
/// the threshold. 0 disables the guarantee for that tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityThresholds {
    pub rare: u32,
    pub epic: u32,
    pub legendary: u32,
}

impl PityThresholds {
    pub fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Common => 0,
            Tier::Rare => self.rare,
            Tier::Epic => self.epic,
            Tier::Legendary => self.legendary,
        }
    }
}

/// Shards minted when a duplicate of the tier is drawn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRates {
    pub common: u64,
    pub rare: u64,
    pub epic: u64,
    pub legendary: u64,
}

impl ConversionRates {
    pub fn get(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Common => self.common,
            Tier::Rare => self.rare,
            Tier::Epic => self.epic,
            Tier::Legendary => self.legendary,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GachaConfig {
    pub draw_cost: u64,
    pub weights: TierWeights,
    pub pity: PityThresholds,
    pub conversion: ConversionRates,
    pub items: Vec<ItemDef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeKind {
    /// Consolation outcome.
    Nothing,
    /// Internal points credit.
    Points { amount: u64 },
    /// Credited by the external account service, drawn from the daily
    /// direct-credit budget pool.
    DirectCredit { amount: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeDef {
    pub id: u16,
    pub weight: u32,
    pub kind: PrizeKind,
}

fn default_daily_spin_limit() -> u64 {
    50
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryConfig {
    pub spin_cost: u64,
    /// Capacity of each day's direct-credit budget pool, in prize units.
    pub daily_budget: u64,
    /// Spins allowed per account per local day.
    #[serde(default = "default_daily_spin_limit")]
    pub daily_spin_limit: u64,
    pub prizes: Vec<PrizeDef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinConfig {
    pub reward: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Raw score units per point granted.
    pub score_divisor: u64,
    /// Daily cap on points granted from game scores.
    pub daily_point_limit: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleConfig {
    pub entry_cost: u64,
    pub daily_entry_limit: u64,
    /// Amount credited externally per winning payout.
    pub prize_amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserConfig {
    pub grant: u64,
}

fn default_idempotency_ttl() -> u64 {
    DEFAULT_IDEMPOTENCY_TTL_SECS
}

fn default_stuck_claim() -> u64 {
    DEFAULT_STUCK_CLAIM_SECS
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Shift of the local-midnight boundary relative to UTC, in seconds.
    #[serde(default)]
    pub day_offset_secs: i32,
    #[serde(default = "default_idempotency_ttl")]
    pub idempotency_ttl_secs: u64,
    #[serde(default = "default_stuck_claim")]
    pub stuck_claim_secs: u64,
    pub gacha: GachaConfig,
    pub lottery: LotteryConfig,
    pub checkin: CheckinConfig,
    pub score: ScoreConfig,
    pub raffle: RaffleConfig,
    pub new_user: NewUserConfig,
}

impl EconomyConfig {
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gacha.weights.total() == 0 {
            return Err(ConfigError::Invalid("gacha tier weights sum to zero".into()));
        }
        if self.gacha.items.is_empty() {
            return Err(ConfigError::Invalid("gacha item table is empty".into()));
        }
        for tier in [Tier::Rare, Tier::Epic, Tier::Legendary] {
            if self.gacha.weights.get(tier) > 0
                && !self.gacha.items.iter().any(|item| item.tier == tier)
            {
                return Err(ConfigError::Invalid(format!(
                    "gacha tier {tier:?} has weight but no items"
                )));
            }
        }
        // A higher tier with a guarantee must not trigger after a lower one,
        // or the lower guarantee could never fire unshadowed.
        let thresholds = [
            self.gacha.pity.rare,
            self.gacha.pity.epic,
            self.gacha.pity.legendary,
        ];
        let mut last = 0u32;
        for threshold in thresholds {
            if threshold == 0 {
                continue;
            }
            if threshold <= last {
                return Err(ConfigError::Invalid(
                    "pity thresholds must be strictly ascending by tier".into(),
                ));
            }
            last = threshold;
        }
        if self.lottery.prizes.is_empty() {
            return Err(ConfigError::Invalid("lottery prize table is empty".into()));
        }
        if self.lottery.prizes.iter().map(|p| p.weight as u64).sum::<u64>() == 0 {
            return Err(ConfigError::Invalid(
                "lottery prize weights sum to zero".into(),
            ));
        }
        if !self
            .lottery
            .prizes
            .iter()
            .any(|p| !matches!(p.kind, PrizeKind::DirectCredit { .. }))
        {
            return Err(ConfigError::Invalid(
                "lottery needs at least one non-direct-credit prize as budget fallback".into(),
            ));
        }
        if self.score.score_divisor == 0 {
            return Err(ConfigError::Invalid("score divisor must be positive".into()));
        }
        Ok(())
    }
}
