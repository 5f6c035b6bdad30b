//! Two-phase implementation upgrade for proxied contracts.
//!
//! The proxy stages a new implementation address through
//! `setImplementation`, and the new implementation activates itself
//! against the proxy through `acceptProxy`. Proxy state is read fresh
//! on every run, so re-running after a partial failure resumes instead
//! of re-sending what already landed.

use alloy::{dyn_abi::DynSolValue, primitives::Address};
use chain::{parse_arg, ChainClient, ContractCall};
use eyre::Result;
use tracing::{error, info, warn};

use crate::address_book::AddressBook;

/// Proxy field holding the active implementation address.
pub(crate) const IMPLEMENTATION_FIELD: &str = "implementation";
/// Proxy field holding the staged, not yet accepted, implementation.
pub(crate) const PENDING_IMPLEMENTATION_FIELD: &str = "pendingImplementation";

/// What the run does about the accept step when the proxy already
/// points at the requested implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AcceptPolicy {
    /// Submit the accept call regardless and let the implementation
    /// contract reject or no-op a redundant one.
    Always,
    /// Stop after reporting the implementation is already current.
    SkipWhenCurrent,
}

/// Terminal result of one upgrade run.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum UpgradeOutcome {
    /// No address book entry exists for the requested contract.
    NotFound,
    /// The entry exists but was not deployed behind a proxy.
    NotProxied,
    /// The recorded proxy address has no bytecode on chain.
    ProxyNotDeployed,
    /// The proxy already points at the target; nothing was submitted.
    AlreadyCurrent,
    /// The accept step ran against the target implementation.
    Upgraded {
        /// Whether a propose transaction was submitted this run.
        proposed: bool,
        /// Whether the proxy already pointed at the target beforehand.
        already_current: bool,
    },
}

/// A requested implementation swap.
#[derive(Clone, Debug)]
pub(crate) struct UpgradeRequest {
    /// Name of the contract in the address book.
    pub(crate) contract: String,
    /// Address of the new implementation contract.
    pub(crate) implementation: Address,
    /// Raw initializer arguments, expanded positionally into the
    /// accept call after the proxy address.
    pub(crate) init_args: Vec<String>,
}

/// Split a comma-delimited init string into raw arguments.
pub(crate) fn split_init_args(init: Option<&str>) -> Vec<String> {
    match init {
        Some(raw) if !raw.is_empty() => {
            raw.split(',').map(str::to_owned).collect()
        }
        _ => Vec::new(),
    }
}

/// The transition required to drive the proxy to the target, derived
/// from a fresh read of its state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Transition {
    /// A propose transaction is needed: nothing is staged yet, or a
    /// stale address is.
    propose: bool,
    /// The proxy already delegates to the target.
    already_current: bool,
}

fn plan_transition(
    current: Address,
    pending: Address,
    target: Address,
) -> Transition {
    let already_current = current == target;
    Transition { propose: !already_current && pending != target, already_current }
}

/// Drive the proxy recorded for `request.contract` to point at
/// `request.implementation`.
///
/// Preconditions are validated in order and the first failure ends the
/// run with zero transactions submitted. Propose is skipped whenever
/// the target is already staged or already current; the accept step is
/// governed by `policy`. Each submission is awaited for inclusion
/// before the next one.
///
/// # Errors
///
/// Chain and transport failures abort immediately and surface to the
/// caller unwrapped. Nothing is rolled back: a failure after a
/// submitted propose leaves the proxy staged, to be resolved by an
/// idempotent re-run.
pub(crate) async fn run<C: ChainClient>(
    chain: &C,
    book: &AddressBook,
    request: &UpgradeRequest,
    policy: AcceptPolicy,
) -> Result<UpgradeOutcome> {
    info!(
        contract = %request.contract,
        implementation = %request.implementation,
        "upgrading contract"
    );

    let Some(entry) = book.entry(&request.contract) else {
        error!(contract = %request.contract, "contract not found in address book");
        return Ok(UpgradeOutcome::NotFound);
    };

    if !entry.proxy {
        error!(
            contract = %request.contract,
            "contract was not deployed using a proxy"
        );
        return Ok(UpgradeOutcome::NotProxied);
    }

    if !chain.is_deployed(entry.address).await? {
        error!(
            proxy = %entry.address,
            "proxy is not deployed, run the initial deployment first"
        );
        return Ok(UpgradeOutcome::ProxyNotDeployed);
    }

    // Encode the accept arguments up front so a malformed one cannot
    // abort the run between the two submissions.
    let mut accept_args = vec![DynSolValue::Address(entry.address)];
    for raw in &request.init_args {
        accept_args.push(parse_arg(raw)?);
    }

    let current = chain.read_address(entry.address, IMPLEMENTATION_FIELD).await?;
    let pending =
        chain.read_address(entry.address, PENDING_IMPLEMENTATION_FIELD).await?;
    let transition = plan_transition(current, pending, request.implementation);

    if transition.already_current {
        warn!(
            proxy = %entry.address,
            implementation = %request.implementation,
            "already the current implementation for this proxy"
        );
        if policy == AcceptPolicy::SkipWhenCurrent {
            return Ok(UpgradeOutcome::AlreadyCurrent);
        }
    }

    if transition.propose {
        let propose = ContractCall::new(
            "setImplementation",
            vec![DynSolValue::Address(request.implementation)],
        );
        let sent = chain.submit(entry.address, &propose).await?;
        info!(tx = %sent.tx_hash, "staged new implementation on the proxy");
    } else if !transition.already_current {
        info!(
            implementation = %request.implementation,
            "implementation already staged, skipping propose"
        );
    }

    let accept = ContractCall::new("acceptProxy", accept_args);
    let sent = chain.submit(request.implementation, &accept).await?;
    info!(tx = %sent.tx_hash, "implementation accepted the proxy");

    // TODO: write the new implementation back to the address book entry.

    Ok(UpgradeOutcome::Upgraded {
        proposed: transition.propose,
        already_current: transition.already_current,
    })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use alloy::primitives::{address, TxHash};
    use chain::{ChainError, TxOutcome};

    use super::*;
    use crate::address_book::DeploymentRecord;

    const PROXY: Address = address!("00000000000000000000000000000000000000a1");
    const OLD_IMPL: Address =
        address!("00000000000000000000000000000000000000b1");
    const NEW_IMPL: Address =
        address!("00000000000000000000000000000000000000b2");
    const STALE_IMPL: Address =
        address!("00000000000000000000000000000000000000b3");

    /// In-memory chain that records every submission.
    struct FakeChain {
        deployed: Vec<Address>,
        fields: HashMap<(Address, String), Address>,
        fail_on: Option<&'static str>,
        submitted: RefCell<Vec<(Address, String, Vec<DynSolValue>)>>,
    }

    impl FakeChain {
        fn with_proxy_state(current: Address, pending: Address) -> Self {
            Self {
                deployed: vec![PROXY],
                fields: HashMap::from([
                    ((PROXY, IMPLEMENTATION_FIELD.to_owned()), current),
                    ((PROXY, PENDING_IMPLEMENTATION_FIELD.to_owned()), pending),
                ]),
                fail_on: None,
                submitted: RefCell::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self {
                deployed: Vec::new(),
                fields: HashMap::new(),
                fail_on: None,
                submitted: RefCell::new(Vec::new()),
            }
        }

        fn submissions(&self) -> Vec<(Address, String, Vec<DynSolValue>)> {
            self.submitted.borrow().clone()
        }
    }

    impl ChainClient for FakeChain {
        async fn is_deployed(
            &self,
            address: Address,
        ) -> Result<bool, ChainError> {
            Ok(self.deployed.contains(&address))
        }

        async fn read_address(
            &self,
            contract: Address,
            field: &str,
        ) -> Result<Address, ChainError> {
            self.fields
                .get(&(contract, field.to_owned()))
                .copied()
                .ok_or(ChainError::BadReturnData {
                    contract,
                    field: field.to_owned(),
                })
        }

        async fn submit(
            &self,
            target: Address,
            call: &ContractCall,
        ) -> Result<TxOutcome, ChainError> {
            if self.fail_on == Some(call.name.as_str()) {
                return Err(ChainError::TransactionFailed {
                    tx_hash: TxHash::ZERO,
                });
            }
            self.submitted.borrow_mut().push((
                target,
                call.name.clone(),
                call.args.clone(),
            ));
            Ok(TxOutcome {
                tx_hash: TxHash::ZERO,
                block_number: Some(1),
                gas_used: 21_000,
            })
        }
    }

    fn book_with(name: &str, record: DeploymentRecord) -> AddressBook {
        AddressBook::from_entries([(name.to_owned(), record)])
    }

    fn proxied_book() -> AddressBook {
        book_with("Controller", DeploymentRecord { address: PROXY, proxy: true })
    }

    fn request(init_args: Vec<String>) -> UpgradeRequest {
        UpgradeRequest {
            contract: "Controller".to_owned(),
            implementation: NEW_IMPL,
            init_args,
        }
    }

    #[tokio::test]
    async fn unknown_contract_reports_not_found() {
        let chain = FakeChain::empty();
        let book = AddressBook::from_entries([]);

        let outcome =
            run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
                .await
                .unwrap();

        assert_eq!(outcome, UpgradeOutcome::NotFound);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn non_proxied_contract_is_rejected() {
        let chain = FakeChain::empty();
        let book = book_with(
            "Controller",
            DeploymentRecord { address: PROXY, proxy: false },
        );

        let outcome =
            run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
                .await
                .unwrap();

        assert_eq!(outcome, UpgradeOutcome::NotProxied);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn missing_bytecode_reports_proxy_not_deployed() {
        let chain = FakeChain::empty();
        let book = proxied_book();

        let outcome =
            run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
                .await
                .unwrap();

        assert_eq!(outcome, UpgradeOutcome::ProxyNotDeployed);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn fresh_upgrade_proposes_then_accepts() {
        let chain = FakeChain::with_proxy_state(OLD_IMPL, Address::ZERO);
        let book = proxied_book();

        let outcome =
            run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
                .await
                .unwrap();

        assert_eq!(
            outcome,
            UpgradeOutcome::Upgraded { proposed: true, already_current: false }
        );
        assert_eq!(
            chain.submissions(),
            vec![
                (
                    PROXY,
                    "setImplementation".to_owned(),
                    vec![DynSolValue::Address(NEW_IMPL)]
                ),
                (
                    NEW_IMPL,
                    "acceptProxy".to_owned(),
                    vec![DynSolValue::Address(PROXY)]
                ),
            ]
        );
    }

    #[tokio::test]
    async fn staged_target_skips_propose() {
        let chain = FakeChain::with_proxy_state(OLD_IMPL, NEW_IMPL);
        let book = proxied_book();

        let outcome =
            run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
                .await
                .unwrap();

        assert_eq!(
            outcome,
            UpgradeOutcome::Upgraded { proposed: false, already_current: false }
        );
        assert_eq!(
            chain.submissions(),
            vec![(
                NEW_IMPL,
                "acceptProxy".to_owned(),
                vec![DynSolValue::Address(PROXY)]
            )]
        );
    }

    #[tokio::test]
    async fn current_target_still_accepts_under_default_policy() {
        let chain = FakeChain::with_proxy_state(NEW_IMPL, Address::ZERO);
        let book = proxied_book();

        let outcome =
            run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
                .await
                .unwrap();

        assert_eq!(
            outcome,
            UpgradeOutcome::Upgraded { proposed: false, already_current: true }
        );
        // No propose, exactly one accept.
        assert_eq!(
            chain.submissions(),
            vec![(
                NEW_IMPL,
                "acceptProxy".to_owned(),
                vec![DynSolValue::Address(PROXY)]
            )]
        );
    }

    #[tokio::test]
    async fn skip_when_current_policy_returns_early() {
        let chain = FakeChain::with_proxy_state(NEW_IMPL, Address::ZERO);
        let book = proxied_book();

        let outcome = run(
            &chain,
            &book,
            &request(vec![]),
            AcceptPolicy::SkipWhenCurrent,
        )
        .await
        .unwrap();

        assert_eq!(outcome, UpgradeOutcome::AlreadyCurrent);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn stale_pending_is_replaced() {
        let chain = FakeChain::with_proxy_state(OLD_IMPL, STALE_IMPL);
        let book = proxied_book();

        let outcome =
            run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
                .await
                .unwrap();

        assert_eq!(
            outcome,
            UpgradeOutcome::Upgraded { proposed: true, already_current: false }
        );
        let submissions = chain.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].1, "setImplementation");
    }

    #[tokio::test]
    async fn init_args_expand_positionally_after_the_proxy_address() {
        let chain = FakeChain::with_proxy_state(OLD_IMPL, Address::ZERO);
        let book = proxied_book();
        let request = request(
            split_init_args(Some(
                "0x00000000000000000000000000000000000000cc,42,true",
            )),
        );

        run(&chain, &book, &request, AcceptPolicy::Always).await.unwrap();

        let submissions = chain.submissions();
        let (target, name, args) = &submissions[1];
        assert_eq!(*target, NEW_IMPL);
        assert_eq!(name, "acceptProxy");
        assert_eq!(
            *args,
            vec![
                DynSolValue::Address(PROXY),
                DynSolValue::Address(address!(
                    "00000000000000000000000000000000000000cc"
                )),
                DynSolValue::Uint(alloy::primitives::U256::from(42), 256),
                DynSolValue::Bool(true),
            ]
        );
    }

    #[tokio::test]
    async fn malformed_init_arg_aborts_with_no_transactions() {
        let chain = FakeChain::with_proxy_state(OLD_IMPL, Address::ZERO);
        let book = proxied_book();
        let request = request(vec!["0xzz".to_owned()]);

        let err = run(&chain, &book, &request, AcceptPolicy::Always)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChainError>(),
            Some(ChainError::InvalidArgument(_))
        ));
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn propose_failure_aborts_before_accept() {
        let mut chain = FakeChain::with_proxy_state(OLD_IMPL, Address::ZERO);
        chain.fail_on = Some("setImplementation");
        let book = proxied_book();

        let err = run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChainError>(),
            Some(ChainError::TransactionFailed { .. })
        ));
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn accept_failure_leaves_the_proxy_staged() {
        let mut chain = FakeChain::with_proxy_state(OLD_IMPL, Address::ZERO);
        chain.fail_on = Some("acceptProxy");
        let book = proxied_book();

        let err = run(&chain, &book, &request(vec![]), AcceptPolicy::Always)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ChainError>(),
            Some(ChainError::TransactionFailed { .. })
        ));
        // The propose landed and is not rolled back.
        let submissions = chain.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].1, "setImplementation");
    }

    #[test]
    fn transitions_cover_all_proxy_states() {
        // Nothing staged yet.
        assert_eq!(
            plan_transition(OLD_IMPL, Address::ZERO, NEW_IMPL),
            Transition { propose: true, already_current: false }
        );
        // Target already staged by an earlier partial run.
        assert_eq!(
            plan_transition(OLD_IMPL, NEW_IMPL, NEW_IMPL),
            Transition { propose: false, already_current: false }
        );
        // A stale address is staged.
        assert_eq!(
            plan_transition(OLD_IMPL, STALE_IMPL, NEW_IMPL),
            Transition { propose: true, already_current: false }
        );
        // Target already active.
        assert_eq!(
            plan_transition(NEW_IMPL, Address::ZERO, NEW_IMPL),
            Transition { propose: false, already_current: true }
        );
    }

    #[test]
    fn init_strings_split_on_commas() {
        assert!(split_init_args(None).is_empty());
        assert!(split_init_args(Some("")).is_empty());
        assert_eq!(split_init_args(Some("a")), vec!["a"]);
        assert_eq!(split_init_args(Some("a,b,c")), vec!["a", "b", "c"]);
    }
}
