use anyhow::Result;
use commonware_cryptography::ed25519::PublicKey;
use tokio::sync::Mutex;
use tivoli_types::{
    api::{FinalizeAction, FinalizeOutcome, GrantResult, LedgerOutcome, ReserveOutcome, RollbackOutcome},
    economy::{
        BalanceState, Currency, Holdings, IdempotencyRecord, LedgerEntry, LedgerSource,
        PendingClaim, PityCounters, Pool, PoolId, Resource, StoredResult,
    },
    Key, Value,
};
use tracing::debug;

use crate::layer::{Layer, ReserveRequest};
use crate::state::State;

/// Front door for every atomic procedure.
///
/// Store-side atomic scripting is emulated with one async mutex: each
/// procedure holds the lock for exactly one read-check-write, staged through
/// a [`Layer`] and applied as a single batch. Higher-level flows (reserve,
/// decide, finalize) span multiple procedures and rely on claim state, not
/// the lock, for coordination.
pub struct Engine<S: State> {
    state: Mutex<S>,
    day_offset_secs: i32,
}

impl<S: State> Engine<S> {
    pub fn new(state: S, day_offset_secs: i32) -> Self {
        Self {
            state: Mutex::new(state),
            day_offset_secs,
        }
    }

    pub fn day_offset_secs(&self) -> i32 {
        self.day_offset_secs
    }

    // Ledger

    pub async fn credit(
        &self,
        account: &PublicKey,
        amount: u64,
        currency: Currency,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<LedgerOutcome> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let outcome = layer
            .ledger_credit(account, amount, currency, source, description, now)
            .await?;
        if matches!(outcome, LedgerOutcome::Applied { .. }) {
            let changes = layer.commit();
            state.apply(changes).await?;
        }
        Ok(outcome)
    }

    pub async fn debit(
        &self,
        account: &PublicKey,
        amount: u64,
        currency: Currency,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<LedgerOutcome> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let outcome = layer
            .ledger_debit(account, amount, currency, source, description, now)
            .await?;
        if matches!(outcome, LedgerOutcome::Applied { .. }) {
            let changes = layer.commit();
            state.apply(changes).await?;
        }
        Ok(outcome)
    }

    pub async fn adjust(
        &self,
        account: &PublicKey,
        delta: i64,
        currency: Currency,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<LedgerOutcome> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let outcome = layer
            .ledger_adjust(account, delta, currency, source, description, now)
            .await?;
        if matches!(outcome, LedgerOutcome::Applied { .. }) {
            let changes = layer.commit();
            state.apply(changes).await?;
        }
        Ok(outcome)
    }

    // Daily quota

    pub async fn grant_up_to(
        &self,
        account: &PublicKey,
        resource: Resource,
        requested: u64,
        daily_limit: u64,
        source: LedgerSource,
        description: &str,
        now: u64,
    ) -> Result<GrantResult> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let result = layer
            .quota_grant_up_to(
                account,
                resource,
                requested,
                daily_limit,
                source,
                description,
                now,
                self.day_offset_secs,
            )
            .await?;
        let changes = layer.commit();
        state.apply(changes).await?;
        Ok(result)
    }

    pub async fn daily_usage(
        &self,
        account: &PublicKey,
        resource: Resource,
        now: u64,
    ) -> Result<u64> {
        let state = self.state.lock().await;
        let layer = Layer::new(&*state);
        layer
            .quota_usage(account, resource, now, self.day_offset_secs)
            .await
    }

    // Reservation protocol

    pub async fn reserve(&self, request: &ReserveRequest, now: u64) -> Result<ReserveOutcome> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let outcome = layer.reserve(request, now, self.day_offset_secs).await?;
        match &outcome {
            ReserveOutcome::Reserved { claim_id, .. } => {
                debug!(claim_id, kind = ?request.kind, "reservation created");
                let changes = layer.commit();
                state.apply(changes).await?;
            }
            ReserveOutcome::Rejected(reason) => {
                debug!(kind = ?request.kind, %reason, "reservation rejected");
            }
        }
        Ok(outcome)
    }

    pub async fn finalize(
        &self,
        claim_id: u64,
        action: &FinalizeAction,
        now: u64,
    ) -> Result<FinalizeOutcome> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let outcome = layer.finalize(claim_id, action, now).await?;
        if matches!(outcome, FinalizeOutcome::Finalized { .. }) {
            let changes = layer.commit();
            state.apply(changes).await?;
        }
        Ok(outcome)
    }

    pub async fn rollback(&self, claim_id: u64, now: u64) -> Result<RollbackOutcome> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let outcome = layer.rollback(claim_id, now, self.day_offset_secs).await?;
        if matches!(outcome, RollbackOutcome::RolledBack) {
            debug!(claim_id, "reservation rolled back");
            let changes = layer.commit();
            state.apply(changes).await?;
        }
        Ok(outcome)
    }

    pub async fn mark_uncertain(
        &self,
        claim_id: u64,
        external_amount: u64,
        now: u64,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let parked = layer.mark_uncertain(claim_id, external_amount, now).await?;
        if parked {
            let changes = layer.commit();
            state.apply(changes).await?;
        }
        Ok(parked)
    }

    // Idempotency guard

    pub async fn guard_acquire(&self, key: &str, ttl_secs: u64, now: u64) -> Result<bool> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let granted = layer.guard_acquire(key, ttl_secs, now).await?;
        if granted {
            let changes = layer.commit();
            state.apply(changes).await?;
        }
        Ok(granted)
    }

    pub async fn guard_complete(
        &self,
        key: &str,
        result: StoredResult,
        validity_secs: u64,
        now: u64,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        layer.guard_complete(key, result, validity_secs, now).await?;
        let changes = layer.commit();
        state.apply(changes).await
    }

    pub async fn guard_release(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        layer.guard_release(key).await?;
        let changes = layer.commit();
        state.apply(changes).await
    }

    pub async fn guard_lookup(&self, key: &str, now: u64) -> Result<Option<IdempotencyRecord>> {
        let state = self.state.lock().await;
        let layer = Layer::new(&*state);
        layer.guard_lookup(key, now).await
    }

    // Pool provisioning (catalog/admin surface)

    /// Create a pool if it does not exist. Returns whether it was created.
    pub async fn provision_pool(&self, pool_id: &PoolId, capacity: u64) -> Result<bool> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        if layer.get_pool(pool_id).await?.is_some() {
            return Ok(false);
        }
        layer
            .insert(Key::Pool(pool_id.clone()), Value::Pool(Pool::new(capacity)))
            .await?;
        let changes = layer.commit();
        state.apply(changes).await?;
        Ok(true)
    }

    /// Add capacity to an existing pool. Returns false when the pool is
    /// unknown.
    pub async fn restock_pool(&self, pool_id: &PoolId, additional: u64) -> Result<bool> {
        let mut state = self.state.lock().await;
        let mut layer = Layer::new(&*state);
        let Some(mut pool) = layer.get_pool(pool_id).await? else {
            return Ok(false);
        };
        pool.total_capacity = pool.total_capacity.saturating_add(additional);
        layer
            .insert(Key::Pool(pool_id.clone()), Value::Pool(pool))
            .await?;
        let changes = layer.commit();
        state.apply(changes).await?;
        Ok(true)
    }

    // Queries

    pub async fn balance(&self, account: &PublicKey) -> Result<BalanceState> {
        let state = self.state.lock().await;
        Layer::new(&*state).get_balance(account).await
    }

    pub async fn recent_ledger(&self, account: &PublicKey) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(Layer::new(&*state).get_ledger(account).await?.entries)
    }

    pub async fn claim(&self, claim_id: u64) -> Result<Option<PendingClaim>> {
        let state = self.state.lock().await;
        Layer::new(&*state).get_claim(claim_id).await
    }

    pub async fn pity(&self, account: &PublicKey) -> Result<PityCounters> {
        let state = self.state.lock().await;
        Layer::new(&*state).get_pity(account).await
    }

    pub async fn holdings(&self, account: &PublicKey) -> Result<Holdings> {
        let state = self.state.lock().await;
        Layer::new(&*state).get_holdings(account).await
    }

    pub async fn pool(&self, pool_id: &PoolId) -> Result<Option<Pool>> {
        let state = self.state.lock().await;
        Layer::new(&*state).get_pool(pool_id).await
    }

    /// Claims still `Pending` whose reservation is older than `cutoff_ts`.
    /// These are candidates for the recovery sweep (the reserving process
    /// died between reserve and finalize/rollback).
    pub async fn stuck_claims(&self, cutoff_ts: u64) -> Result<Vec<PendingClaim>> {
        let state = self.state.lock().await;
        let layer = Layer::new(&*state);
        let registry = layer.get_claim_registry().await?;

        let mut stuck = Vec::new();
        for claim_id in registry.open {
            if let Some(claim) = layer.get_claim(claim_id).await? {
                if claim.created_ts <= cutoff_ts {
                    stuck.push(claim);
                }
            }
        }
        Ok(stuck)
    }

    /// Claims parked `Uncertain`, awaiting reconciliation.
    pub async fn uncertain_claims(&self) -> Result<Vec<PendingClaim>> {
        let state = self.state.lock().await;
        let layer = Layer::new(&*state);
        let registry = layer.get_claim_registry().await?;

        let mut parked = Vec::new();
        for claim_id in registry.uncertain {
            if let Some(claim) = layer.get_claim(claim_id).await? {
                parked.push(claim);
            }
        }
        Ok(parked)
    }
}
