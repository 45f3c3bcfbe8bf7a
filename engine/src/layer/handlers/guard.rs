use super::super::*;
use tivoli_types::economy::{GuardStatus, IdempotencyRecord, StoredResult};

impl<'a, S: State> Layer<'a, S> {
    /// Create-if-absent with expiry: only the first caller for a live key
    /// gets `true`. Expired records are treated as absent.
    pub(crate) async fn guard_acquire(
        &mut self,
        key: &str,
        ttl_secs: u64,
        now: u64,
    ) -> Result<bool> {
        if let Some(Value::Idempotency(record)) =
            self.get(&Key::Idempotency(key.to_string())).await?
        {
            if !record.expired(now) {
                return Ok(false);
            }
        }

        self.insert(
            Key::Idempotency(key.to_string()),
            Value::Idempotency(IdempotencyRecord::locked(now.saturating_add(ttl_secs))),
        );
        Ok(true)
    }

    /// Store the computed result so replays within the validity window get
    /// it back without re-executing the side effect.
    pub(crate) async fn guard_complete(
        &mut self,
        key: &str,
        result: StoredResult,
        validity_secs: u64,
        now: u64,
    ) -> Result<()> {
        self.insert(
            Key::Idempotency(key.to_string()),
            Value::Idempotency(IdempotencyRecord {
                status: GuardStatus::Done,
                expires_ts: now.saturating_add(validity_secs),
                result: Some(result),
            }),
        );
        Ok(())
    }

    /// Free the key after a definitive business failure so a legitimate
    /// retry can run.
    pub(crate) async fn guard_release(&mut self, key: &str) -> Result<()> {
        self.remove(Key::Idempotency(key.to_string()));
        Ok(())
    }

    pub(crate) async fn guard_lookup(
        &self,
        key: &str,
        now: u64,
    ) -> Result<Option<IdempotencyRecord>> {
        Ok(
            match self.get(&Key::Idempotency(key.to_string())).await? {
                Some(Value::Idempotency(record)) if !record.expired(now) => Some(record),
                _ => None,
            },
        )
    }
}
