//! Per-run environment derived from the global CLI options.

use std::path::Path;

use alloy::signers::local::PrivateKeySigner;
use chain::HttpChain;
use eyre::{Context, Result};
use tracing::debug;

use crate::address_book::AddressBook;

/// Everything a command needs beyond its own arguments.
pub(crate) struct Env {
    /// Live chain access bound to the operator's wallet.
    pub(crate) chain: HttpChain,
    /// Address book section for the connected chain.
    pub(crate) book: AddressBook,
}

/// Parse the operator key, connect to the node, and load the address
/// book section matching the node's chain id.
pub(crate) async fn load(
    book_path: &Path,
    rpc_url: &str,
    private_key: &str,
) -> Result<Env> {
    let signer = private_key
        .parse::<PrivateKeySigner>()
        .wrap_err("failed to parse operator private key")?;
    let operator = signer.address();

    let client = HttpChain::new(chain::connect(rpc_url, signer)?);
    let chain_id = client.chain_id().await?;
    debug!(chain_id, operator = %operator, "connected to chain");

    let book = AddressBook::load(book_path, chain_id)?;
    Ok(Env { chain: client, book })
}
