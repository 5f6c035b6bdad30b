use alloy::{
    network::EthereumWallet,
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill,
            NonceFiller, WalletFiller,
        },
        Identity, ProviderBuilder, RootProvider,
    },
    signers::local::PrivateKeySigner,
};
use eyre::Context;

/// Convenience type alias that represents an Ethereum wallet -- an
/// `alloy` provider with the recommended fillers and a `WalletFiller`.
pub type Wallet = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<
                GasFiller,
                JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>,
            >,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider,
>;

/// Build a wallet-filled HTTP provider for `signer` against `rpc_url`.
///
/// # Errors
///
/// May fail if `rpc_url` is not a valid URL.
pub fn connect(rpc_url: &str, signer: PrivateKeySigner) -> eyre::Result<Wallet> {
    let rpc_url = rpc_url
        .parse()
        .wrap_err_with(|| format!("failed to parse rpc url {rpc_url}"))?;

    Ok(ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url))
}
