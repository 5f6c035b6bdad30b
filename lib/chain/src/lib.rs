//! Thin chain-access layer for the chainops CLI: wallet construction,
//! contract reads, and signed transaction submission over `alloy`.

mod abi;
mod client;
mod error;
mod provider;
mod receipt;

pub use abi::{parse_arg, ContractCall};
pub use client::{ChainClient, HttpChain};
pub use error::ChainError;
pub use provider::{connect, Wallet};
pub use receipt::{ReceiptExt, TxOutcome};
