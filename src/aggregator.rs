use tracing::debug;

use crate::{
    account::{Account, BalanceCategory},
    amount::{AmountError, normalize},
    api::{
        Transport,
        model::{
            AuthAccountResponse, BalancesResponse, Coin, CommissionResponse, DelegationsResponse,
            RewardsResponse, UnbondingsResponse,
        },
    },
    denom::{DenomResolver, has_prefix},
};

/// Denom prefixes that never become token entries, in any category.
pub const EXCLUDED_PREFIXES: [&str; 2] = ["gamm/pool/", "factory/"];

/// Liquidity-pool shares and token-factory denoms are not tracked.
pub fn is_excluded(denom: &str) -> bool {
    EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| has_prefix(denom, prefix))
}

/// A response that contributes `(category, coin)` pairs to an account.
pub trait BalanceSource {
    fn balances(&self) -> Vec<(BalanceCategory, Coin)>;
}

impl BalanceSource for AuthAccountResponse {
    fn balances(&self) -> Vec<(BalanceCategory, Coin)> {
        let Some(vesting) = &self.account.base_vesting_account else {
            return Vec::new();
        };
        let original = vesting
            .original_vesting
            .iter()
            .map(|coin| (BalanceCategory::OriginalVesting, coin.clone()));
        let delegated = vesting
            .delegated_vesting
            .iter()
            .map(|coin| (BalanceCategory::DelegatedVesting, coin.clone()));
        original.chain(delegated).collect()
    }
}

impl BalanceSource for BalancesResponse {
    fn balances(&self) -> Vec<(BalanceCategory, Coin)> {
        tagged(BalanceCategory::Bank, &self.balances)
    }
}

impl BalanceSource for RewardsResponse {
    fn balances(&self) -> Vec<(BalanceCategory, Coin)> {
        tagged(BalanceCategory::Rewards, &self.total)
    }
}

impl BalanceSource for CommissionResponse {
    fn balances(&self) -> Vec<(BalanceCategory, Coin)> {
        tagged(BalanceCategory::Commission, &self.commission.commission)
    }
}

impl BalanceSource for DelegationsResponse {
    fn balances(&self) -> Vec<(BalanceCategory, Coin)> {
        self.delegation_responses
            .iter()
            .map(|resp| (BalanceCategory::Delegated, resp.balance.clone()))
            .collect()
    }
}

/// Unbonding tranches report no denom, so they are keyed by the chain's
/// bond denom.
pub struct Unbondings<'r> {
    pub response: &'r UnbondingsResponse,
    pub bond_denom: &'r str,
}

impl BalanceSource for Unbondings<'_> {
    fn balances(&self) -> Vec<(BalanceCategory, Coin)> {
        self.response
            .unbonding_responses
            .iter()
            .flat_map(|unbonding| &unbonding.entries)
            .map(|entry| {
                (
                    BalanceCategory::Unbonding,
                    Coin::new(self.bond_denom, entry.balance.as_str()),
                )
            })
            .collect()
    }
}

fn tagged(category: BalanceCategory, coins: &[Coin]) -> Vec<(BalanceCategory, Coin)> {
    coins.iter().map(|coin| (category, coin.clone())).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    Excluded,
    Absent,
}

/// Result of merging one response: how many pairs landed, plus the amounts
/// that could not be parsed. A parse failure only drops its own pair.
#[derive(Debug, Default)]
pub struct MergeReport {
    pub applied: usize,
    pub errors: Vec<(BalanceCategory, AmountError)>,
}

/// Merges normalized amounts into an account's token entries for one chain.
pub struct Aggregator<'a, T: ?Sized> {
    resolver: DenomResolver<'a, T>,
}

impl<'a, T> Aggregator<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(resolver: DenomResolver<'a, T>) -> Self {
        Self { resolver }
    }

    pub fn merge(
        &mut self,
        account: &mut Account,
        category: BalanceCategory,
        coin: &Coin,
    ) -> Result<MergeOutcome, AmountError> {
        if is_excluded(&coin.denom) {
            debug!("Skipping {category:?} for excluded denom `{}`", coin.denom);
            return Ok(MergeOutcome::Excluded);
        }
        let info = self.resolver.resolve(&coin.denom);
        let Some(amount) = normalize(&coin.amount, info.exponent)? else {
            return Ok(MergeOutcome::Absent);
        };
        account.apply(&coin.denom, &info.symbol, category, amount);
        Ok(MergeOutcome::Applied)
    }

    pub fn merge_source<S>(&mut self, account: &mut Account, source: &S) -> MergeReport
    where
        S: BalanceSource + ?Sized,
    {
        let mut report = MergeReport::default();
        for (category, coin) in source.balances() {
            match self.merge(account, category, &coin) {
                Ok(MergeOutcome::Applied) => report.applied += 1,
                Ok(_) => {}
                Err(err) => report.errors.push((category, err)),
            }
        }
        report
    }
}
