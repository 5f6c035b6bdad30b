use alloy::{
    network::ReceiptResponse, primitives::TxHash,
    rpc::types::TransactionReceipt,
};

use crate::ChainError;

/// The issuer's view of a transaction that made it on chain.
#[derive(Clone, Copy, Debug)]
pub struct TxOutcome {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was included in, when the node reports it.
    pub block_number: Option<u64>,
    /// Gas consumed by the transaction.
    pub gas_used: u64,
}

/// Extension trait turning a provider receipt into a [`TxOutcome`].
pub trait ReceiptExt {
    /// Returns the [`TxOutcome`] for this receipt.
    ///
    /// # Errors
    ///
    /// May fail if the transaction was included but reverted.
    fn outcome(&self) -> Result<TxOutcome, ChainError>;
}

impl ReceiptExt for TransactionReceipt {
    fn outcome(&self) -> Result<TxOutcome, ChainError> {
        if !self.status() {
            return Err(ChainError::TransactionFailed {
                tx_hash: self.transaction_hash,
            });
        }

        Ok(TxOutcome {
            tx_hash: self.transaction_hash,
            block_number: self.block_number,
            gas_used: self.gas_used,
        })
    }
}
