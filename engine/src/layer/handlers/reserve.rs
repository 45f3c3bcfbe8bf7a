use super::super::*;
use anyhow::bail;
use tivoli_types::{
    api::{
        FinalizeAction, FinalizeOutcome, LedgerOutcome, Payout, Rejection, ReserveOutcome,
        RollbackOutcome, SlotDisposition,
    },
    economy::{ClaimKind, ClaimStatus, Currency, LedgerSource, PendingClaim},
};
use tracing::debug;

/// Everything a reservation needs to check and stage atomically.
#[derive(Clone, Debug)]
pub struct ReserveRequest {
    pub account: PublicKey,
    pub kind: ClaimKind,
    /// Pool to take a slot from, when the action is pool-limited.
    pub pool: Option<PoolId>,
    /// Per-day allowance gate: (resource, daily limit). Exceeding it rejects
    /// with `AlreadyClaimed`; unlike quota grants, a reservation is refused
    /// outright rather than clipped.
    pub allowance: Option<(Resource, u64)>,
    /// Points debited up front; refunded by rollback.
    pub wager: u64,
    pub wager_source: LedgerSource,
    pub wager_description: String,
    /// Whether this action has a guarantee dimension.
    pub bump_pity: bool,
}

impl<'a, S: State> Layer<'a, S> {
    /// Atomically verify eligibility and capacity, take the slot, debit the
    /// wager and create the pending claim. All checks run before anything is
    /// staged, so a rejection leaves no trace.
    pub(crate) async fn reserve(
        &mut self,
        request: &ReserveRequest,
        now: u64,
        day_offset_secs: i32,
    ) -> Result<ReserveOutcome> {
        let account = &request.account;

        // An in-flight claim for the same account/kind blocks new attempts
        // until it settles (or the recovery sweep compensates it).
        if self
            .get(&Key::ActiveClaim(account.clone(), request.kind))
            .await?
            .is_some()
        {
            return Ok(ReserveOutcome::Rejected(Rejection::Pending));
        }

        if let Some((resource, limit)) = request.allowance {
            let used = self
                .quota_usage(account, resource, now, day_offset_secs)
                .await?;
            if used >= limit {
                return Ok(ReserveOutcome::Rejected(Rejection::AlreadyClaimed));
            }
        }

        let mut pool_state = None;
        if let Some(pool_id) = &request.pool {
            let Some(pool) = self.get_pool(pool_id).await? else {
                debug!(?pool_id, "reservation against unprovisioned pool");
                return Ok(ReserveOutcome::Rejected(Rejection::NotEligible));
            };
            if pool.available() == 0 {
                return Ok(ReserveOutcome::Rejected(Rejection::PoolExhausted));
            }
            pool_state = Some(pool);
        }

        if request.wager > 0
            && self.get_balance(account).await?.points < request.wager
        {
            return Ok(ReserveOutcome::Rejected(Rejection::InsufficientBalance));
        }

        // Checks passed; stage every effect of the reservation.
        if let Some((resource, limit)) = request.allowance {
            if !self
                .quota_consume(account, resource, 1, limit, now, day_offset_secs)
                .await?
            {
                // Guarded by the usage check above.
                return Ok(ReserveOutcome::Rejected(Rejection::AlreadyClaimed));
            }
        }

        if let (Some(pool_id), Some(mut pool)) = (&request.pool, pool_state) {
            if !pool.reserve_one() {
                return Ok(ReserveOutcome::Rejected(Rejection::PoolExhausted));
            }
            self.insert(Key::Pool(pool_id.clone()), Value::Pool(pool));
        }

        if request.wager > 0 {
            match self
                .ledger_debit(
                    account,
                    request.wager,
                    Currency::Points,
                    request.wager_source,
                    &request.wager_description,
                    now,
                )
                .await?
            {
                LedgerOutcome::Applied { .. } => {}
                LedgerOutcome::Rejected(reason) => {
                    return Ok(ReserveOutcome::Rejected(reason))
                }
            }
        }

        let pity = if request.bump_pity {
            let mut pity = self.get_pity(account).await?;
            pity.bump();
            self.insert(Key::Pity(account.clone()), Value::Pity(pity.clone()));
            Some(pity)
        } else {
            None
        };

        let mut registry = self.get_claim_registry().await?;
        let claim_id = registry.allocate();
        self.insert(Key::ClaimRegistry, Value::ClaimRegistry(registry));

        let claim = PendingClaim {
            id: claim_id,
            account: account.clone(),
            pool: request.pool.clone(),
            kind: request.kind,
            status: ClaimStatus::Pending,
            wagered: request.wager,
            attempts: 0,
            created_ts: now,
            settled_ts: 0,
            pity_bumped: request.bump_pity,
            counted_resource: request.allowance.map(|(resource, _)| resource),
            external_amount: 0,
        };
        self.insert(Key::Claim(claim_id), Value::Claim(claim));
        self.insert(
            Key::ActiveClaim(account.clone(), request.kind),
            Value::ActiveClaim(claim_id),
        );

        Ok(ReserveOutcome::Reserved { claim_id, pity })
    }

    /// Commit a decided outcome. Accepts claims in `Pending` (normal path)
    /// or `Uncertain` (reconciliation confirmed the external grant).
    pub(crate) async fn finalize(
        &mut self,
        claim_id: u64,
        action: &FinalizeAction,
        now: u64,
    ) -> Result<FinalizeOutcome> {
        let Some(mut claim) = self.get_claim(claim_id).await? else {
            return Ok(FinalizeOutcome::Rejected(Rejection::ClaimNotFound));
        };
        if !matches!(claim.status, ClaimStatus::Pending | ClaimStatus::Uncertain) {
            return Ok(FinalizeOutcome::Rejected(Rejection::ClaimNotPending));
        }

        let account = claim.account.clone();
        let mut duplicate = false;
        let mut conversion = 0;
        let mut balance_after = None;

        match &action.payout {
            Payout::None | Payout::External { .. } => {}
            Payout::Points { amount, source } => {
                if *amount > 0 {
                    match self
                        .ledger_credit(
                            &account,
                            *amount,
                            Currency::Points,
                            *source,
                            "claim payout",
                            now,
                        )
                        .await?
                    {
                        LedgerOutcome::Applied {
                            balance_after: after,
                            ..
                        } => balance_after = Some(after),
                        LedgerOutcome::Rejected(_) => unreachable!("credit cannot reject"),
                    }
                }
            }
            Payout::Item { item_id, tier } => {
                let mut holdings = self.get_holdings(&account).await?;
                if holdings.insert(*item_id) {
                    self.insert(Key::Holdings(account.clone()), Value::Holdings(holdings));
                } else {
                    // Duplicate protection: the account keeps one copy and
                    // the draw converts into the fungible secondary currency.
                    duplicate = true;
                    conversion = action.duplicate_conversion;
                    if conversion > 0 {
                        self.ledger_credit(
                            &account,
                            conversion,
                            Currency::Shards,
                            LedgerSource::DuplicateConversion,
                            "duplicate converted",
                            now,
                        )
                        .await?;
                    }
                }

                if claim.pity_bumped {
                    let mut pity = self.get_pity(&account).await?;
                    pity.reset_for(*tier);
                    self.insert(Key::Pity(account.clone()), Value::Pity(pity));
                }
            }
        }

        if matches!(action.slot, SlotDisposition::Return) {
            if let Some(pool_id) = &claim.pool {
                let Some(mut pool) = self.get_pool(pool_id).await? else {
                    bail!("pool record missing for claim {claim_id}");
                };
                pool.release_one();
                self.insert(Key::Pool(pool_id.clone()), Value::Pool(pool));
            }
        }

        claim.status = ClaimStatus::Success;
        claim.settled_ts = now;
        self.remove(Key::ActiveClaim(account.clone(), claim.kind));

        let mut registry = self.get_claim_registry().await?;
        registry.close(claim_id);
        registry.resolve_uncertain(claim_id);
        self.insert(Key::ClaimRegistry, Value::ClaimRegistry(registry));
        self.insert(Key::Claim(claim_id), Value::Claim(claim));

        Ok(FinalizeOutcome::Finalized {
            duplicate,
            conversion,
            balance_after,
        })
    }

    /// Undo a reservation: return the slot, revert the pity bump, give back
    /// the consumed allowance and refund the wager. A second call (or a call
    /// on a settled claim) is a no-op, and an `Uncertain` claim is
    /// deliberately *not* compensated here.
    pub(crate) async fn rollback(
        &mut self,
        claim_id: u64,
        now: u64,
        day_offset_secs: i32,
    ) -> Result<RollbackOutcome> {
        let Some(mut claim) = self.get_claim(claim_id).await? else {
            return Ok(RollbackOutcome::Rejected(Rejection::ClaimNotFound));
        };
        if claim.status != ClaimStatus::Pending {
            return Ok(RollbackOutcome::AlreadySettled);
        }

        let account = claim.account.clone();

        if let Some(pool_id) = &claim.pool {
            let Some(mut pool) = self.get_pool(pool_id).await? else {
                bail!("pool record missing for claim {claim_id}");
            };
            pool.release_one();
            self.insert(Key::Pool(pool_id.clone()), Value::Pool(pool));
        }

        if claim.pity_bumped {
            let mut pity = self.get_pity(&account).await?;
            pity.revert_bump();
            self.insert(Key::Pity(account.clone()), Value::Pity(pity));
        }

        if let Some(resource) = claim.counted_resource {
            // Uncount against the day the reservation was counted, which may
            // differ from today if the claim straddled midnight.
            self.quota_uncount(&account, resource, 1, claim.created_ts, day_offset_secs)
                .await?;
        }

        if claim.wagered > 0 {
            self.ledger_credit(
                &account,
                claim.wagered,
                Currency::Points,
                LedgerSource::Refund,
                "reservation rolled back",
                now,
            )
            .await?;
        }

        claim.status = ClaimStatus::Failure;
        claim.settled_ts = now;
        self.remove(Key::ActiveClaim(account.clone(), claim.kind));

        let mut registry = self.get_claim_registry().await?;
        registry.close(claim_id);
        self.insert(Key::ClaimRegistry, Value::ClaimRegistry(registry));
        self.insert(Key::Claim(claim_id), Value::Claim(claim));

        Ok(RollbackOutcome::RolledBack)
    }

    /// Park a claim whose external settlement neither confirmed nor denied.
    /// The slot stays consumed and the in-flight marker stays up, so retries
    /// for the same account/kind keep rejecting with `Pending` until
    /// reconciliation resolves the claim. `external_amount` records the grant
    /// in flight so reconciliation can retry it against the same hint.
    /// Returns whether the claim is now (still) uncertain.
    pub(crate) async fn mark_uncertain(
        &mut self,
        claim_id: u64,
        external_amount: u64,
        now: u64,
    ) -> Result<bool> {
        let Some(mut claim) = self.get_claim(claim_id).await? else {
            return Ok(false);
        };
        match claim.status {
            ClaimStatus::Pending => {
                claim.status = ClaimStatus::Uncertain;
                claim.attempts = claim.attempts.saturating_add(1);
                claim.settled_ts = now;
                claim.external_amount = external_amount;

                let mut registry = self.get_claim_registry().await?;
                registry.park_uncertain(claim_id);
                self.insert(Key::ClaimRegistry, Value::ClaimRegistry(registry));
                self.insert(Key::Claim(claim_id), Value::Claim(claim));
                Ok(true)
            }
            ClaimStatus::Uncertain => {
                claim.attempts = claim.attempts.saturating_add(1);
                claim.settled_ts = now;
                self.insert(Key::Claim(claim_id), Value::Claim(claim));
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
