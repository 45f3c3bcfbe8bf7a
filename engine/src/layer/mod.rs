use anyhow::{bail, Result};
use commonware_cryptography::ed25519::PublicKey;
use std::collections::BTreeMap;
use tivoli_types::{
    economy::{
        BalanceState, ClaimRegistry, DailyCounter, Holdings, LedgerHistory, PendingClaim,
        PityCounters, Pool, PoolId, Resource,
    },
    Key, Value,
};

use crate::state::{State, Status};

mod handlers;

pub use handlers::reserve::ReserveRequest;

/// One atomic procedure's view of the store: reads fall through to committed
/// state unless staged, writes stage into `pending`. Nothing lands until
/// [`Layer::commit`] hands the batch to [`State::apply`], so a handler that
/// rejects early leaves no trace.
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),
        }
    }

    fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    fn remove(&mut self, key: Key) {
        self.pending.insert(key, Status::Delete);
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }

    // A record that decodes to the wrong variant is corrupt. Defaulting it
    // would let the next write erase an account's real state, so every
    // accessor aborts instead.

    pub(crate) async fn get_balance(&self, account: &PublicKey) -> Result<BalanceState> {
        Ok(match self.get(&Key::Balance(account.clone())).await? {
            Some(Value::Balance(balance)) => balance,
            None => BalanceState::default(),
            Some(_) => bail!("corrupt balance record"),
        })
    }

    pub(crate) async fn get_ledger(&self, account: &PublicKey) -> Result<LedgerHistory> {
        Ok(match self.get(&Key::Ledger(account.clone())).await? {
            Some(Value::Ledger(history)) => history,
            None => LedgerHistory::default(),
            Some(_) => bail!("corrupt ledger record"),
        })
    }

    pub(crate) async fn get_daily_counter(
        &self,
        account: &PublicKey,
        resource: Resource,
        day: u32,
    ) -> Result<DailyCounter> {
        Ok(
            match self
                .get(&Key::DailyCounter(account.clone(), resource, day))
                .await?
            {
                Some(Value::DailyCounter(counter)) => counter,
                None => DailyCounter::default(),
                Some(_) => bail!("corrupt daily counter record"),
            },
        )
    }

    pub(crate) async fn get_pool(&self, pool: &PoolId) -> Result<Option<Pool>> {
        Ok(match self.get(&Key::Pool(pool.clone())).await? {
            Some(Value::Pool(pool)) => Some(pool),
            None => None,
            Some(_) => bail!("corrupt pool record"),
        })
    }

    pub(crate) async fn get_pity(&self, account: &PublicKey) -> Result<PityCounters> {
        Ok(match self.get(&Key::Pity(account.clone())).await? {
            Some(Value::Pity(pity)) => pity,
            None => PityCounters::default(),
            Some(_) => bail!("corrupt pity record"),
        })
    }

    pub(crate) async fn get_claim(&self, claim_id: u64) -> Result<Option<PendingClaim>> {
        Ok(match self.get(&Key::Claim(claim_id)).await? {
            Some(Value::Claim(claim)) => Some(claim),
            None => None,
            Some(_) => bail!("corrupt claim record"),
        })
    }

    pub(crate) async fn get_claim_registry(&self) -> Result<ClaimRegistry> {
        Ok(match self.get(&Key::ClaimRegistry).await? {
            Some(Value::ClaimRegistry(registry)) => registry,
            None => ClaimRegistry::default(),
            Some(_) => bail!("corrupt claim registry record"),
        })
    }

    pub(crate) async fn get_holdings(&self, account: &PublicKey) -> Result<Holdings> {
        Ok(match self.get(&Key::Holdings(account.clone())).await? {
            Some(Value::Holdings(holdings)) => holdings,
            None => Holdings::default(),
            Some(_) => bail!("corrupt holdings record"),
        })
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}
