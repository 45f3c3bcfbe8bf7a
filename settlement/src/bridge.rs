//! The settlement bridge: calls out to the external account-crediting
//! service and classifies every outcome as success, failure or uncertain.
//!
//! Classification is the contract the compensation rules hang off: `Failure`
//! means the external system *guarantees* nothing was granted (safe to roll
//! back); anything ambiguous (timeout, transport fault, 5xx, unparseable
//! body) is `Uncertain` and must never be compensated.

use commonware_cryptography::ed25519::PublicKey;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tivoli_types::SettleOutcome;
use tracing::{debug, warn};
use url::Url;

/// Error type for bridge construction.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// An external account-crediting service.
pub trait Settlement {
    /// Grant `amount` to `account`, identified by `hint` for idempotent
    /// retries. Never returns a hard error: anything that is not a definite
    /// answer is `Uncertain`.
    fn settle(
        &self,
        account: &PublicKey,
        amount: u64,
        hint: &str,
    ) -> impl Future<Output = SettleOutcome> + Send;
}

impl<T: Settlement + Sync + Send> Settlement for std::sync::Arc<T> {
    async fn settle(&self, account: &PublicKey, amount: u64, hint: &str) -> SettleOutcome {
        self.as_ref().settle(account, amount, hint).await
    }
}

#[derive(Serialize)]
struct CreditRequest<'a> {
    account: String,
    amount: u64,
    hint: &'a str,
}

#[derive(Deserialize)]
struct CreditResponse {
    ok: bool,
    #[serde(default)]
    reason: String,
}

/// Production bridge: JSON POST with a bounded timeout.
pub struct HttpSettlement {
    http_client: reqwest::Client,
    credit_url: Url,
}

impl HttpSettlement {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let base: Url = base_url.parse()?;
        let credit_url = base.join("credit")?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            credit_url,
        })
    }
}

impl Settlement for HttpSettlement {
    async fn settle(&self, account: &PublicKey, amount: u64, hint: &str) -> SettleOutcome {
        let body = CreditRequest {
            account: commonware_utils::hex(account.as_ref()),
            amount,
            hint,
        };

        let response = match self
            .http_client
            .post(self.credit_url.clone())
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                // Timeout or transport fault: the request may have reached
                // the service, so nothing is guaranteed either way.
                warn!(hint, %err, "settlement call did not complete");
                return SettleOutcome::Uncertain;
            }
        };

        let status = response.status();
        if status.is_client_error() {
            // The service understood the request and refused it: nothing was
            // granted.
            debug!(hint, %status, "settlement rejected");
            return SettleOutcome::Failure;
        }
        if !status.is_success() {
            warn!(hint, %status, "settlement returned ambiguous status");
            return SettleOutcome::Uncertain;
        }

        match response.json::<CreditResponse>().await {
            Ok(credit) if credit.ok => SettleOutcome::Success,
            Ok(credit) => {
                debug!(hint, reason = %credit.reason, "settlement declined");
                SettleOutcome::Failure
            }
            Err(err) => {
                // 2xx with a body we cannot read: the grant may have landed.
                warn!(hint, %err, "settlement response unreadable");
                SettleOutcome::Uncertain
            }
        }
    }
}
