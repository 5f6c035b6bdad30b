use alloy::{
    dyn_abi::DynSolValue,
    hex,
    primitives::{keccak256, Address, U256},
};

use crate::ChainError;

/// A named state-changing operation and its ordered arguments.
///
/// Calls are shaped at runtime rather than through compile-time
/// bindings, since the operated-on contracts are identified by address
/// book entries, not by crates in this workspace.
#[derive(Clone, Debug)]
pub struct ContractCall {
    /// Solidity-level name of the operation.
    pub name: String,
    /// Ordered ABI values the operation is applied to.
    pub args: Vec<DynSolValue>,
}

impl ContractCall {
    /// Create a call to `name` with `args` expanded positionally.
    #[must_use]
    pub fn new(name: &str, args: Vec<DynSolValue>) -> Self {
        Self { name: name.to_owned(), args }
    }

    /// Canonical signature of this call, e.g. `setImplementation(address)`.
    ///
    /// # Errors
    ///
    /// May fail if an argument carries no ABI type.
    pub fn signature(&self) -> Result<String, ChainError> {
        let mut types = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let ty = arg
                .as_type()
                .ok_or_else(|| ChainError::InvalidArgument(format!("{arg:?}")))?;
            types.push(ty.sol_type_name().into_owned());
        }
        Ok(format!("{}({})", self.name, types.join(",")))
    }

    /// ABI-encoded calldata: the 4-byte selector of the canonical
    /// signature followed by the encoded argument tuple.
    ///
    /// # Errors
    ///
    /// May fail if an argument carries no ABI type.
    pub fn calldata(&self) -> Result<Vec<u8>, ChainError> {
        let selector = keccak256(self.signature()?.as_bytes());
        let mut data = selector[..4].to_vec();
        data.extend(DynSolValue::Tuple(self.args.clone()).abi_encode_params());
        Ok(data)
    }
}

/// Coerce a raw command-line argument into an ABI value by shape.
///
/// `0x` strings of 40 hex digits become addresses, other `0x` strings
/// become raw bytes, `true`/`false` become booleans, unsigned decimal
/// integers become `uint256`, and anything else passes through as a
/// string.
///
/// # Errors
///
/// May fail if a `0x` string is not valid hex or an integer does not
/// fit in 256 bits.
pub fn parse_arg(raw: &str) -> Result<DynSolValue, ChainError> {
    let raw = raw.trim();

    if let Ok(address) = raw.parse::<Address>() {
        return Ok(DynSolValue::Address(address));
    }
    if let Some(data) = raw.strip_prefix("0x") {
        let bytes = hex::decode(data)
            .map_err(|_| ChainError::InvalidArgument(raw.to_owned()))?;
        return Ok(DynSolValue::Bytes(bytes));
    }
    if raw == "true" || raw == "false" {
        return Ok(DynSolValue::Bool(raw == "true"));
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let value = U256::from_str_radix(raw, 10)
            .map_err(|_| ChainError::InvalidArgument(raw.to_owned()))?;
        return Ok(DynSolValue::Uint(value, 256));
    }

    Ok(DynSolValue::String(raw.to_owned()))
}
