use alloy::{
    primitives::{Address, TxHash},
    providers::PendingTransactionError,
    transports::TransportError,
};

/// Chain and transport level failures surfaced by
/// [`ChainClient`](crate::ChainClient) calls.
///
/// None of these are retried here. Transport retries, if any, belong to
/// the RPC client; everything else is terminal for the calling step.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The RPC transport failed.
    #[error("rpc transport error: {0}")]
    Network(#[from] TransportError),

    /// The transaction was submitted but confirmation failed.
    #[error("transaction was not confirmed: {0}")]
    Pending(#[from] PendingTransactionError),

    /// The transaction was included and reverted.
    #[error("transaction {tx_hash} reverted")]
    TransactionFailed {
        /// Hash of the reverted transaction.
        tx_hash: TxHash,
    },

    /// A view call returned data that does not decode as a single word.
    #[error("malformed return data from {field}() on {contract}")]
    BadReturnData {
        /// Contract the view call was made against.
        contract: Address,
        /// Name of the field that was read.
        field: String,
    },

    /// An argument could not be coerced to an ABI value.
    #[error("could not encode argument `{0}`")]
    InvalidArgument(String),
}
