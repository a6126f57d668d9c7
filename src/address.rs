use bech32::{Bech32, Hrp};
use thiserror::Error;

pub const VALOPER_SUFFIX: &str = "valoper";

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("`{input}` is neither bech32 nor hex: {reason}")]
    Undecodable { input: String, reason: String },
    #[error("Invalid bech32 prefix `{prefix}`: {reason}")]
    InvalidPrefix { prefix: String, reason: String },
    #[error("Cannot bech32 encode with prefix `{prefix}`: {reason}")]
    Encode { prefix: String, reason: String },
}

/// Account key bytes from either a bech32 address of any prefix or a hex string.
pub fn decode_key(input: &str) -> Result<Vec<u8>, AddressError> {
    match bech32::decode(input) {
        Ok((_, data)) => Ok(data),
        Err(bech_err) => hex::decode(input.trim_start_matches("0x")).map_err(|hex_err| {
            AddressError::Undecodable {
                input: input.to_owned(),
                reason: format!("{bech_err}; {hex_err}"),
            }
        }),
    }
}

pub fn encode(prefix: &str, data: &[u8]) -> Result<String, AddressError> {
    let hrp = Hrp::parse(prefix).map_err(|err| AddressError::InvalidPrefix {
        prefix: prefix.to_owned(),
        reason: err.to_string(),
    })?;
    bech32::encode::<Bech32>(hrp, data).map_err(|err| AddressError::Encode {
        prefix: prefix.to_owned(),
        reason: err.to_string(),
    })
}

/// Re-encodes a configured key under the chain's account prefix.
pub fn account_address(prefix: &str, key: &str) -> Result<String, AddressError> {
    encode(prefix, &decode_key(key)?)
}

/// The validator operator address sharing the account's key.
pub fn valoper_address(address: &str) -> Result<String, AddressError> {
    let (hrp, data) = bech32::decode(address).map_err(|err| AddressError::Undecodable {
        input: address.to_owned(),
        reason: err.to_string(),
    })?;
    encode(&format!("{hrp}{VALOPER_SUFFIX}"), &data)
}
