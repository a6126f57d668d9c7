//! Wire models for the Cosmos SDK REST endpoints and the chain registry.
//! Only the fields the snapshot needs are decoded; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub next_key: Option<String>,
    pub total: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bech32PrefixResponse {
    pub bech32_prefix: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthAccountResponse {
    pub account: AuthAccount,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthAccount {
    #[serde(rename = "@type")]
    pub type_url: String,
    /// Present for continuous, delayed, periodic and permanent-locked accounts.
    pub base_vesting_account: Option<BaseVestingAccount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BaseVestingAccount {
    pub original_vesting: Vec<Coin>,
    pub delegated_free: Vec<Coin>,
    pub delegated_vesting: Vec<Coin>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BalancesResponse {
    pub balances: Vec<Coin>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DenomMetadataResponse {
    pub metadata: DenomMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DenomMetadata {
    pub description: String,
    pub denom_units: Vec<DenomUnit>,
    pub base: String,
    pub display: String,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DenomUnit {
    pub denom: String,
    pub exponent: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RewardsResponse {
    pub rewards: Vec<ValidatorReward>,
    pub total: Vec<Coin>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidatorReward {
    pub validator_address: String,
    pub reward: Vec<Coin>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommissionResponse {
    pub commission: ValidatorCommission,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidatorCommission {
    pub commission: Vec<Coin>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DelegationsResponse {
    pub delegation_responses: Vec<DelegationResponse>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DelegationResponse {
    pub delegation: Delegation,
    pub balance: Coin,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Delegation {
    pub delegator_address: String,
    pub validator_address: String,
    pub shares: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnbondingsResponse {
    pub unbonding_responses: Vec<UnbondingDelegation>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnbondingDelegation {
    pub delegator_address: String,
    pub validator_address: String,
    pub entries: Vec<UnbondingEntry>,
}

/// One time-locked tranche. The balance carries no denom; it is always the
/// chain's bond denom.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnbondingEntry {
    pub creation_height: String,
    pub completion_time: String,
    pub initial_balance: String,
    pub balance: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StakingParamsResponse {
    pub params: StakingParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StakingParams {
    pub unbonding_time: String,
    pub bond_denom: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestBlockResponse {
    pub block: Block,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: String,
    pub time: DateTime<Utc>,
}

/// Asset catalogue published by the chain registry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssetList {
    pub chain_name: String,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Asset {
    pub description: String,
    pub denom_units: Vec<DenomUnit>,
    pub base: String,
    pub name: String,
    pub display: String,
    pub symbol: String,
    pub coingecko_id: String,
}
