use alloy::{
    network::TransactionBuilder,
    primitives::{keccak256, Address, B256},
    providers::Provider,
    rpc::types::TransactionRequest,
};

use crate::{
    abi::ContractCall, receipt::ReceiptExt, ChainError, TxOutcome, Wallet,
};

/// Read and submit access to contracts on a chain.
///
/// This is the capability boundary of the tool: orchestration logic is
/// written against this trait and exercised in tests with an in-memory
/// implementation instead of a live network.
pub trait ChainClient {
    /// Whether bytecode is present at `address`.
    ///
    /// # Errors
    ///
    /// May fail if the RPC transport fails.
    async fn is_deployed(&self, address: Address) -> Result<bool, ChainError>;

    /// Call the nullary view `field` on `contract` and decode the
    /// returned word as an address.
    ///
    /// # Errors
    ///
    /// May fail if the RPC transport fails or the contract returns
    /// something other than a single word.
    async fn read_address(
        &self,
        contract: Address,
        field: &str,
    ) -> Result<Address, ChainError>;

    /// Sign and submit `call` against `target`, waiting for inclusion.
    ///
    /// # Errors
    ///
    /// May fail if submission fails, confirmation fails, or the
    /// transaction reverts.
    async fn submit(
        &self,
        target: Address,
        call: &ContractCall,
    ) -> Result<TxOutcome, ChainError>;
}

/// Live [`ChainClient`] over a wallet-filled HTTP provider.
#[derive(Clone, Debug)]
pub struct HttpChain {
    wallet: Wallet,
}

impl HttpChain {
    /// Wrap an existing wallet provider.
    #[must_use]
    pub fn new(wallet: Wallet) -> Self {
        Self { wallet }
    }

    /// Chain id reported by the connected node.
    ///
    /// # Errors
    ///
    /// May fail if the RPC transport fails.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.wallet.get_chain_id().await?)
    }
}

impl ChainClient for HttpChain {
    async fn is_deployed(&self, address: Address) -> Result<bool, ChainError> {
        let code = self.wallet.get_code_at(address).await?;
        Ok(!code.is_empty())
    }

    async fn read_address(
        &self,
        contract: Address,
        field: &str,
    ) -> Result<Address, ChainError> {
        let selector = keccak256(format!("{field}()").as_bytes());
        let tx = TransactionRequest::default()
            .with_to(contract)
            .with_input(selector[..4].to_vec());

        let data = self.wallet.call(tx).await?;
        if data.len() < 32 {
            return Err(ChainError::BadReturnData {
                contract,
                field: field.to_owned(),
            });
        }

        Ok(Address::from_word(B256::from_slice(&data[..32])))
    }

    async fn submit(
        &self,
        target: Address,
        call: &ContractCall,
    ) -> Result<TxOutcome, ChainError> {
        let tx = TransactionRequest::default()
            .with_to(target)
            .with_input(call.calldata()?);

        let receipt =
            self.wallet.send_transaction(tx).await?.get_receipt().await?;
        receipt.outcome()
    }
}
