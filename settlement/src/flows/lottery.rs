use anyhow::Result;
use commonware_cryptography::ed25519::PublicKey;
use rand::Rng;
use tivoli_types::api::{
    FinalizeAction, FinalizeOutcome, Payout, Rejection, ReserveOutcome, SettleOutcome,
    SlotDisposition,
};
use tivoli_types::config::PrizeKind;
use tivoli_types::economy::{ClaimKind, LedgerSource, PoolId, Resource};
use tracing::{debug, warn};

use super::{settlement_hint, Flows};
use crate::bridge::Settlement;
use tivoli_engine::{ReserveRequest, State};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpinOutcome {
    /// Consolation: the spin resolved but won nothing.
    Nothing { claim_id: u64, prize_id: u16 },
    /// Internal points prize, already credited.
    Points {
        claim_id: u64,
        prize_id: u16,
        amount: u64,
        balance_after: u64,
    },
    /// Direct-credit prize confirmed by the external service.
    DirectCredit {
        claim_id: u64,
        prize_id: u16,
        amount: u64,
    },
    /// The external call failed definitively; the spin was compensated
    /// (cost refunded, budget slot returned). Safe to retry.
    Failed { claim_id: u64 },
    /// The external call neither confirmed nor denied. Nothing was
    /// compensated; do not retry blindly. Reconciliation owns this claim.
    Uncertain { claim_id: u64, prize_id: u16 },
    Rejected(Rejection),
}

impl<S: State, B: Settlement> Flows<S, B> {
    /// One lottery spin. The spin cost is debited at reservation; a slot of
    /// the day's direct-credit budget pool is reserved alongside so the
    /// decide step may award a direct-credit prize. When the budget is
    /// exhausted the spin degrades to internal prizes only; the paid action
    /// still resolves.
    pub async fn spin(
        &self,
        account: &PublicKey,
        now: u64,
        rng: &mut impl Rng,
    ) -> Result<SpinOutcome> {
        let budget_pool = PoolId::DailyCredit(self.day(now));
        self.engine
            .provision_pool(&budget_pool, self.config.lottery.daily_budget)
            .await?;

        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::LotterySpin,
            pool: Some(budget_pool.clone()),
            allowance: Some((Resource::LotterySpin, self.config.lottery.daily_spin_limit)),
            wager: self.config.lottery.spin_cost,
            wager_source: LedgerSource::LotterySpin,
            wager_description: "lottery spin".to_string(),
            bump_pity: false,
        };

        // Budget exhaustion does not refuse the spin; it narrows the prize
        // table to internal prizes.
        let mut budget_reserved = true;
        let outcome = match self.engine.reserve(&request, now).await? {
            ReserveOutcome::Rejected(Rejection::PoolExhausted) => {
                budget_reserved = false;
                let fallback = ReserveRequest {
                    pool: None,
                    ..request
                };
                self.engine.reserve(&fallback, now).await?
            }
            outcome => outcome,
        };
        let claim_id = match outcome {
            ReserveOutcome::Reserved { claim_id, .. } => claim_id,
            ReserveOutcome::Rejected(reason) => return Ok(SpinOutcome::Rejected(reason)),
        };

        let prize = decide_spin_prize(self, budget_reserved, rng);
        debug!(claim_id, prize_id = prize.0, "spin decided");
        let (prize_id, kind) = prize;

        match kind {
            PrizeKind::Nothing => {
                let action = FinalizeAction {
                    payout: Payout::None,
                    slot: SlotDisposition::Return,
                    duplicate_conversion: 0,
                };
                match self.engine.finalize(claim_id, &action, now).await? {
                    FinalizeOutcome::Finalized { .. } => {
                        Ok(SpinOutcome::Nothing { claim_id, prize_id })
                    }
                    FinalizeOutcome::Rejected(reason) => Ok(SpinOutcome::Rejected(reason)),
                }
            }
            PrizeKind::Points { amount } => {
                let action = FinalizeAction {
                    payout: Payout::Points {
                        amount,
                        source: LedgerSource::LotteryPrize,
                    },
                    slot: SlotDisposition::Return,
                    duplicate_conversion: 0,
                };
                match self.engine.finalize(claim_id, &action, now).await? {
                    FinalizeOutcome::Finalized { balance_after, .. } => Ok(SpinOutcome::Points {
                        claim_id,
                        prize_id,
                        amount,
                        balance_after: balance_after.unwrap_or_default(),
                    }),
                    FinalizeOutcome::Rejected(reason) => Ok(SpinOutcome::Rejected(reason)),
                }
            }
            PrizeKind::DirectCredit { amount } => {
                let hint = settlement_hint(claim_id, ClaimKind::LotterySpin);
                match self.bridge.settle(account, amount, &hint).await {
                    SettleOutcome::Success => {
                        let action = FinalizeAction {
                            payout: Payout::External { amount },
                            slot: SlotDisposition::Consume,
                            duplicate_conversion: 0,
                        };
                        match self.engine.finalize(claim_id, &action, now).await? {
                            FinalizeOutcome::Finalized { .. } => Ok(SpinOutcome::DirectCredit {
                                claim_id,
                                prize_id,
                                amount,
                            }),
                            FinalizeOutcome::Rejected(reason) => {
                                Ok(SpinOutcome::Rejected(reason))
                            }
                        }
                    }
                    SettleOutcome::Failure => {
                        // Nothing was granted externally: full compensation.
                        self.engine.rollback(claim_id, now).await?;
                        Ok(SpinOutcome::Failed { claim_id })
                    }
                    SettleOutcome::Uncertain => {
                        // The grant may have landed. Park the claim with the
                        // in-flight amount; the slot stays consumed so a
                        // confirmed grant is never double-budgeted.
                        warn!(claim_id, amount, "spin settlement uncertain");
                        self.engine.mark_uncertain(claim_id, amount, now).await?;
                        Ok(SpinOutcome::Uncertain { claim_id, prize_id })
                    }
                }
            }
        }
    }
}

fn decide_spin_prize<S: State, B: Settlement>(
    flows: &Flows<S, B>,
    budget_reserved: bool,
    rng: &mut impl Rng,
) -> (u16, PrizeKind) {
    let prize = tivoli_engine::decide::decide_prize(&flows.config.lottery, budget_reserved, rng);
    (prize.id, prize.kind.clone())
}
