use anyhow::Result;
use commonware_cryptography::ed25519::PublicKey;
use tivoli_types::api::{
    FinalizeAction, FinalizeOutcome, Payout, Rejection, ReserveOutcome, SlotDisposition,
};
use tivoli_types::economy::{
    ClaimKind, GuardStatus, LedgerSource, PoolId, Resource, StoredResult,
};
use tracing::debug;

use super::Flows;
use crate::bridge::Settlement;
use tivoli_engine::{ReserveRequest, State};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckinOutcome {
    Done { reward: u64, balance_after: u64 },
    Rejected(Rejection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScoreOutcome {
    Granted {
        granted: u64,
        balance_after: u64,
        /// The stored result of an earlier submission was returned; nothing
        /// re-executed.
        replayed: bool,
    },
    Rejected(Rejection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeClaimOutcome {
    Claimed { claim_id: u64, batch: u32 },
    Rejected(Rejection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted { amount: u64, balance_after: u64 },
    Rejected(Rejection),
}

impl<S: State, B: Settlement> Flows<S, B> {
    /// Daily check-in: once per local day, pays a fixed reward.
    pub async fn check_in(&self, account: &PublicKey, now: u64) -> Result<CheckinOutcome> {
        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::Checkin,
            pool: None,
            allowance: Some((Resource::Checkin, 1)),
            wager: 0,
            wager_source: LedgerSource::Checkin,
            wager_description: "daily check-in".to_string(),
            bump_pity: false,
        };

        let claim_id = match self.engine.reserve(&request, now).await? {
            ReserveOutcome::Reserved { claim_id, .. } => claim_id,
            ReserveOutcome::Rejected(reason) => return Ok(CheckinOutcome::Rejected(reason)),
        };

        let reward = self.config.checkin.reward;
        let action = FinalizeAction {
            payout: Payout::Points {
                amount: reward,
                source: LedgerSource::Checkin,
            },
            slot: SlotDisposition::Consume,
            duplicate_conversion: 0,
        };
        match self.engine.finalize(claim_id, &action, now).await? {
            FinalizeOutcome::Finalized { balance_after, .. } => Ok(CheckinOutcome::Done {
                reward,
                balance_after: balance_after.unwrap_or_default(),
            }),
            FinalizeOutcome::Rejected(reason) => Ok(CheckinOutcome::Rejected(reason)),
        }
    }

    /// Convert a completed game session's raw score into points, clipped by
    /// the daily cap. The session id is the idempotency key: duplicate
    /// submissions (client retries, replayed requests) return the first
    /// result instead of granting twice.
    pub async fn submit_score(
        &self,
        account: &PublicKey,
        session_id: &str,
        raw_score: u64,
        now: u64,
    ) -> Result<ScoreOutcome> {
        let key = format!("score-{session_id}");

        if let Some(record) = self.engine.guard_lookup(&key, now).await? {
            if record.status == GuardStatus::Done {
                if let Some(StoredResult::Granted {
                    amount,
                    balance_after,
                }) = record.result
                {
                    debug!(session_id, "score submission replayed");
                    return Ok(ScoreOutcome::Granted {
                        granted: amount,
                        balance_after,
                        replayed: true,
                    });
                }
            }
            return Ok(ScoreOutcome::Rejected(Rejection::GuardHeld));
        }

        if !self
            .engine
            .guard_acquire(&key, self.config.idempotency_ttl_secs, now)
            .await?
        {
            return Ok(ScoreOutcome::Rejected(Rejection::GuardHeld));
        }

        let requested = raw_score / self.config.score.score_divisor;
        let grant = match self
            .engine
            .grant_up_to(
                account,
                Resource::GamePoints,
                requested,
                self.config.score.daily_point_limit,
                LedgerSource::GameReward,
                "game session reward",
                now,
            )
            .await
        {
            Ok(grant) => grant,
            Err(err) => {
                // The grant procedure applied nothing; free the key so a
                // legitimate retry can run.
                self.engine.guard_release(&key).await?;
                return Err(err);
            }
        };

        self.engine
            .guard_complete(
                &key,
                StoredResult::Granted {
                    amount: grant.granted,
                    balance_after: grant.balance_after,
                },
                self.config.idempotency_ttl_secs,
                now,
            )
            .await?;

        Ok(ScoreOutcome::Granted {
            granted: grant.granted,
            balance_after: grant.balance_after,
            replayed: false,
        })
    }

    /// Claim one redemption code from a finite batch.
    pub async fn claim_code(
        &self,
        account: &PublicKey,
        batch: u32,
        now: u64,
    ) -> Result<CodeClaimOutcome> {
        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::CodeClaim,
            pool: Some(PoolId::CodeBatch(batch)),
            allowance: Some((Resource::CodeClaim, 1)),
            wager: 0,
            wager_source: LedgerSource::CodeClaim,
            wager_description: "redemption code".to_string(),
            bump_pity: false,
        };

        let claim_id = match self.engine.reserve(&request, now).await? {
            ReserveOutcome::Reserved { claim_id, .. } => claim_id,
            ReserveOutcome::Rejected(reason) => return Ok(CodeClaimOutcome::Rejected(reason)),
        };

        // The code text itself is catalog content; the core only accounts
        // for the inventory slot.
        let action = FinalizeAction {
            payout: Payout::None,
            slot: SlotDisposition::Consume,
            duplicate_conversion: 0,
        };
        match self.engine.finalize(claim_id, &action, now).await? {
            FinalizeOutcome::Finalized { .. } => Ok(CodeClaimOutcome::Claimed { claim_id, batch }),
            FinalizeOutcome::Rejected(reason) => Ok(CodeClaimOutcome::Rejected(reason)),
        }
    }

    /// One-shot welcome grant, backed by a capacity-1 per-account pool.
    pub async fn claim_new_user_grant(
        &self,
        account: &PublicKey,
        now: u64,
    ) -> Result<GrantOutcome> {
        let pool = PoolId::NewUserGrant(account.clone());
        self.engine.provision_pool(&pool, 1).await?;

        let request = ReserveRequest {
            account: account.clone(),
            kind: ClaimKind::NewUserGrant,
            pool: Some(pool),
            allowance: None,
            wager: 0,
            wager_source: LedgerSource::NewUserGrant,
            wager_description: "welcome grant".to_string(),
            bump_pity: false,
        };

        let claim_id = match self.engine.reserve(&request, now).await? {
            ReserveOutcome::Reserved { claim_id, .. } => claim_id,
            // The slot is consumed exactly once; a drained pool here means
            // the account already claimed its grant.
            ReserveOutcome::Rejected(Rejection::PoolExhausted) => {
                return Ok(GrantOutcome::Rejected(Rejection::AlreadyClaimed))
            }
            ReserveOutcome::Rejected(reason) => return Ok(GrantOutcome::Rejected(reason)),
        };

        let amount = self.config.new_user.grant;
        let action = FinalizeAction {
            payout: Payout::Points {
                amount,
                source: LedgerSource::NewUserGrant,
            },
            slot: SlotDisposition::Consume,
            duplicate_conversion: 0,
        };
        match self.engine.finalize(claim_id, &action, now).await? {
            FinalizeOutcome::Finalized { balance_after, .. } => Ok(GrantOutcome::Granted {
                amount,
                balance_after: balance_after.unwrap_or_default(),
            }),
            FinalizeOutcome::Rejected(reason) => Ok(GrantOutcome::Rejected(reason)),
        }
    }
}
