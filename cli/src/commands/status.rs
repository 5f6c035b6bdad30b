//! Read-only view of a contract's recorded and live state.

use chain::ChainClient;
use eyre::Result;
use tracing::{info, warn};

use crate::address_book::AddressBook;
use crate::commands::upgrade::{
    IMPLEMENTATION_FIELD, PENDING_IMPLEMENTATION_FIELD,
};

/// Report the address book record for `contract` and, for proxies, the
/// live implementation fields. Issues no transactions.
///
/// # Errors
///
/// May fail if a chain read fails.
pub(crate) async fn run<C: ChainClient>(
    chain: &C,
    book: &AddressBook,
    contract: &str,
) -> Result<()> {
    let Some(entry) = book.entry(contract) else {
        warn!(contract, "contract not found in address book");
        return Ok(());
    };

    info!(
        contract,
        address = %entry.address,
        proxy = entry.proxy,
        "address book entry"
    );

    if !chain.is_deployed(entry.address).await? {
        warn!(address = %entry.address, "no bytecode at the recorded address");
        return Ok(());
    }

    if entry.proxy {
        let current =
            chain.read_address(entry.address, IMPLEMENTATION_FIELD).await?;
        let pending = chain
            .read_address(entry.address, PENDING_IMPLEMENTATION_FIELD)
            .await?;
        info!(implementation = %current, pending = %pending, "live proxy state");
    }

    Ok(())
}
