use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    account::{Account, BalanceCategory, BlockStamp},
    address::{AddressError, account_address, valoper_address},
    amount::AmountError,
    api::{ApiError, LcdClient, Transport, fetch_asset_list, model::AssetList},
    config::{AccountConfig, ChainConfig},
};

pub mod loader;

pub use loader::AccountLoader;

/// Errors that abort the snapshot of a whole chain.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Cannot resolve bech32 prefix of `{chain}`: {source}")]
    Prefix {
        chain: String,
        #[source]
        source: ApiError,
    },
}

/// A loader step failure. It is reported and the snapshot carries on.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{category:?} query failed: {source}")]
    Query {
        category: BalanceCategory,
        #[source]
        source: ApiError,
    },
    #[error("{category:?} amount dropped: {source}")]
    Amount {
        category: BalanceCategory,
        #[source]
        source: AmountError,
    },
    #[error("Bond denom is unknown, unbonding delegations skipped")]
    UnknownBondDenom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderStep {
    Vesting,
    Bank,
    Distribution,
    Staking,
}

/// Outcome of one loader step: whatever merged, plus what went wrong.
#[derive(Debug)]
pub struct StepReport {
    pub step: LoaderStep,
    pub applied: usize,
    pub errors: Vec<StepError>,
}

impl StepReport {
    pub fn new(step: LoaderStep) -> Self {
        Self {
            step,
            applied: 0,
            errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Chain-level state fetched once before any account is loaded, then only read.
#[derive(Debug, Clone, Default)]
pub struct ChainContext {
    pub id: String,
    pub prefix: String,
    pub bond_denom: Option<String>,
    pub asset_list: Option<AssetList>,
    pub block: Option<BlockStamp>,
}

impl ChainContext {
    /// Resolves the prefix (fatal on failure), then the bond denom, asset list
    /// and latest block (each optional).
    pub fn prepare<T>(
        transport: &T,
        chain: &ChainConfig,
        registry_url: &str,
    ) -> Result<Self, ChainError>
    where
        T: Transport + ?Sized,
    {
        let lcd = LcdClient::new(transport, &chain.rest);
        let prefix = match &chain.bech32_prefix {
            Some(prefix) => prefix.clone(),
            None => {
                lcd.bech32_prefix()
                    .map_err(|source| ChainError::Prefix {
                        chain: chain.id.clone(),
                        source,
                    })?
                    .bech32_prefix
            }
        };

        let bond_denom = match lcd.staking_params() {
            Ok(resp) if !resp.params.bond_denom.is_empty() => Some(resp.params.bond_denom),
            Ok(_) => chain.bond_denom.clone(),
            Err(err) => {
                warn!("Cannot query staking params of `{}`: {err}", chain.id);
                chain.bond_denom.clone()
            }
        };

        let asset_list = chain.registry_name.as_deref().and_then(|name| {
            fetch_asset_list(transport, registry_url, name)
                .inspect_err(|err| warn!("Cannot fetch asset list of `{name}`: {err}"))
                .ok()
        });

        let block = match lcd.latest_block() {
            Ok(resp) => match resp.block.header.height.parse() {
                Ok(height) => Some(BlockStamp {
                    height,
                    time: resp.block.header.time,
                }),
                Err(err) => {
                    warn!("Invalid block height of `{}`: {err}", chain.id);
                    None
                }
            },
            Err(err) => {
                warn!("Cannot query latest block of `{}`: {err}", chain.id);
                None
            }
        };

        Ok(Self {
            id: chain.id.clone(),
            prefix,
            bond_denom,
            asset_list,
            block,
        })
    }

    /// The configured key re-encoded under this chain's prefix.
    pub fn account(&self, config: &AccountConfig) -> Result<Account, AddressError> {
        let address = account_address(&self.prefix, &config.address)?;
        let valoper = valoper_address(&address)?;
        Ok(Account::new(&config.name, address, valoper))
    }
}

#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    pub context: ChainContext,
    pub accounts: Vec<Account>,
}

/// Snapshots every account of one chain, sequentially and in order.
///
/// Step failures go to `on_error` and never stop the remaining steps or
/// accounts. An account whose key cannot be re-encoded is logged and left
/// out. Only an unresolvable prefix fails the chain.
pub fn snapshot_chain<'c, T, F>(
    transport: &T,
    chain: &ChainConfig,
    accounts: impl IntoIterator<Item = &'c AccountConfig>,
    registry_url: &str,
    mut on_error: F,
) -> Result<ChainSnapshot, ChainError>
where
    T: Transport + ?Sized,
    F: FnMut(&Account, &StepError),
{
    let context = ChainContext::prepare(transport, chain, registry_url)?;
    let mut accounts: Vec<Account> = accounts
        .into_iter()
        .filter_map(|config| {
            context
                .account(config)
                .inspect_err(|err| {
                    error!(
                        "Cannot derive address of account `{}` on `{}`, skipping account: {err}",
                        config.name, context.id
                    )
                })
                .ok()
        })
        .collect();
    info!(
        "Loading {} account(s) on `{}` at height {:?}",
        accounts.len(),
        context.id,
        context.block.as_ref().map(|block| block.height)
    );

    {
        let lcd = LcdClient::new(transport, &chain.rest);
        let mut loader = AccountLoader::new(&lcd, &context);
        for account in &mut accounts {
            for report in loader.load(account) {
                for err in &report.errors {
                    debug!("Account `{}` {:?} step: {err}", account.name, report.step);
                    on_error(account, err);
                }
            }
        }
    }
    Ok(ChainSnapshot { context, accounts })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::{
        account::AccountStage,
        address::{encode, valoper_address},
        api::testing::FakeTransport,
    };

    use super::*;

    const REST: &str = "http://lcd.test";
    const REGISTRY: &str = "http://registry.test";

    fn chain(prefix: Option<&str>) -> ChainConfig {
        ChainConfig {
            id: "cosmoshub-4".to_string(),
            registry_name: Some("cosmoshub".to_string()),
            rest: REST.to_string(),
            bech32_prefix: prefix.map(str::to_string),
            bond_denom: None,
            accounts: vec!["a".to_string(), "b".to_string()],
        }
    }

    fn account_config(name: &str, key: u8) -> AccountConfig {
        AccountConfig {
            name: name.to_string(),
            address: hex::encode([key; 20]),
        }
    }

    fn with_account(transport: FakeTransport, address: &str, bank: &str) -> FakeTransport {
        let valoper = valoper_address(address).unwrap();
        transport
            .with(
                &format!("{REST}/cosmos/bank/v1beta1/balances/{address}"),
                &format!(r#"{{"balances":[{{"denom":"uatom","amount":"{bank}"}}]}}"#),
            )
            .with_status(
                &format!("{REST}/cosmos/distribution/v1beta1/validators/{valoper}/commission"),
                400,
                r#"{"code":3,"message":"rpc error: validator does not exist"}"#,
            )
    }

    #[test]
    fn unresolvable_prefix_fails_the_chain() {
        let transport = FakeTransport::default();
        let accounts = [account_config("a", 1)];
        let err = snapshot_chain(&transport, &chain(None), &accounts, REGISTRY, |_, _| {})
            .unwrap_err();
        assert!(matches!(err, ChainError::Prefix { ref chain, .. } if chain == "cosmoshub-4"));
    }

    #[test]
    fn chain_state_is_fetched_once_and_shared() {
        let alice = encode("cosmos", &[1; 20]).unwrap();
        let bob = encode("cosmos", &[2; 20]).unwrap();
        let transport = FakeTransport::default()
            .with(
                &format!("{REST}/cosmos/auth/v1beta1/bech32"),
                r#"{"bech32_prefix":"cosmos"}"#,
            )
            .with(
                &format!("{REST}/cosmos/staking/v1beta1/params"),
                r#"{"params":{"unbonding_time":"1814400s","bond_denom":"uatom"}}"#,
            )
            .with(
                &format!("{REST}/cosmos/base/tendermint/v1beta1/blocks/latest"),
                r#"{"block":{"header":{"chain_id":"cosmoshub-4","height":"19000000","time":"2024-01-02T03:04:05.123456789Z"}}}"#,
            )
            .with(
                &format!("{REGISTRY}/cosmoshub/assetlist"),
                r#"{"chain_name":"cosmoshub","assets":[{"base":"uatom","display":"atom","symbol":"ATOM",
                    "denom_units":[{"denom":"uatom","exponent":0},{"denom":"atom","exponent":6}]}]}"#,
            );
        let transport = with_account(transport, &alice, "1000000");
        let transport = with_account(transport, &bob, "2500000");

        let accounts = [account_config("a", 1), account_config("b", 2)];
        let mut errors = Vec::new();
        let snapshot = snapshot_chain(&transport, &chain(None), &accounts, REGISTRY, |acc, err| {
            errors.push((acc.name.clone(), err.to_string()))
        })
        .unwrap();

        assert_eq!(transport.count(&format!("{REGISTRY}/cosmoshub/assetlist")), 1);
        assert_eq!(
            transport.count(&format!("{REST}/cosmos/base/tendermint/v1beta1/blocks/latest")),
            1
        );
        assert_eq!(snapshot.context.bond_denom.as_deref(), Some("uatom"));

        let [a, b] = &snapshot.accounts[..] else {
            panic!("expected two accounts");
        };
        assert_eq!(a.address, alice);
        assert!(a.valoper.starts_with("cosmosvaloper1"));
        assert_eq!(a.block.as_ref().unwrap().height, 19_000_000);
        assert_eq!(a.block, b.block);
        assert_eq!(a.stage, AccountStage::Done);
        assert_eq!(b.stage, AccountStage::Done);
        assert_eq!(
            a.token("uatom").unwrap().get(BalanceCategory::Bank),
            Decimal::ONE
        );
        assert_eq!(
            b.token("uatom").unwrap().get(BalanceCategory::Bank),
            Decimal::from_str("2.5").unwrap()
        );

        // auth, rewards, delegations and unbondings are not served; commission is
        // a missing validator and must not be reported
        assert_eq!(errors.len(), 6);
        assert!(errors.iter().all(|(_, err)| !err.contains("Commission")));
    }

    #[test]
    fn undecodable_key_skips_only_its_account() {
        let alice = encode("cosmos", &[1; 20]).unwrap();
        let transport = with_account(FakeTransport::default(), &alice, "1000000");
        let accounts = [
            account_config("a", 1),
            AccountConfig {
                name: "typo".to_string(),
                address: "cosmos1notavalidaddress".to_string(),
            },
        ];
        let snapshot =
            snapshot_chain(&transport, &chain(Some("cosmos")), &accounts, REGISTRY, |_, _| {})
                .unwrap();

        assert_eq!(snapshot.accounts.len(), 1);
        let loaded = &snapshot.accounts[0];
        assert_eq!(loaded.name, "a");
        assert_eq!(loaded.stage, AccountStage::Done);
        assert_eq!(
            loaded.token("uatom").unwrap().get(BalanceCategory::Bank),
            Decimal::ONE
        );
    }

    #[test]
    fn unreachable_chain_state_is_optional() {
        let transport = FakeTransport::default();
        let mut config = chain(Some("cosmos"));
        config.bond_denom = Some("uatom".to_string());
        let context = ChainContext::prepare(&transport, &config, REGISTRY).unwrap();
        assert_eq!(context.prefix, "cosmos");
        assert_eq!(context.bond_denom.as_deref(), Some("uatom"));
        assert!(context.asset_list.is_none());
        assert!(context.block.is_none());
    }
}
