//! Wallet connection seam.
//!
//! The wallet owns the keys and the interactive sign-in flow. The relayer only
//! sees its account set and asks it to sign and submit transactions.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::near::types::{FinalExecutionOutcome, NearError, NearResult, Transaction, WalletAccount};

/// External wallet connection (browser extension, wallet selector, remote signer).
#[async_trait]
pub trait WalletConnection: Send + Sync {
    /// The current account set. Changes are published on the receiver.
    fn accounts(&self) -> watch::Receiver<Vec<WalletAccount>>;

    /// Start the interactive sign-in flow for `contract_id`.
    ///
    /// Returns once the flow has been shown. The resulting account change, if
    /// any, arrives through [`WalletConnection::accounts`].
    async fn sign_in(&self, contract_id: &str) -> NearResult<()>;

    async fn sign_out(&self) -> NearResult<()>;

    /// Sign `transaction` with the wallet's key and submit it.
    ///
    /// A user or wallet refusal must be reported as `NearError::TransactionRejected`.
    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> NearResult<FinalExecutionOutcome>;
}

/// No wallet attached. Views still work through the broker; signing does not.
#[derive(Debug)]
pub struct Disconnected {
    accounts: watch::Sender<Vec<WalletAccount>>,
}

impl Default for Disconnected {
    fn default() -> Self {
        let (accounts, _) = watch::channel(Vec::new());
        Self { accounts }
    }
}

#[async_trait]
impl WalletConnection for Disconnected {
    fn accounts(&self) -> watch::Receiver<Vec<WalletAccount>> {
        self.accounts.subscribe()
    }

    async fn sign_in(&self, _contract_id: &str) -> NearResult<()> {
        Err(NearError::WalletUnavailable(
            "no wallet connection configured".to_string(),
        ))
    }

    async fn sign_out(&self) -> NearResult<()> {
        Ok(())
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> NearResult<FinalExecutionOutcome> {
        Err(NearError::WalletUnavailable(format!(
            "cannot sign for {} without a wallet connection",
            transaction.signer_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_wallet() {
        let wallet = Disconnected::default();
        assert!(wallet.accounts().borrow().is_empty());
        assert!(matches!(
            wallet.sign_in("v1.signer").await,
            Err(NearError::WalletUnavailable(_))
        ));
        assert!(wallet.sign_out().await.is_ok());

        let tx = Transaction {
            signer_id: "alice.near".to_string(),
            receiver_id: "v1.signer".to_string(),
            actions: Vec::new(),
        };
        assert!(matches!(
            wallet.sign_and_send_transaction(tx).await,
            Err(NearError::WalletUnavailable(_))
        ));
    }
}
