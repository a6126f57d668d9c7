use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// The balance category a response contributes to. Each category owns
/// exactly one field of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceCategory {
    Bank,
    Rewards,
    Delegated,
    Unbonding,
    Commission,
    OriginalVesting,
    DelegatedVesting,
}

/// Height and time of the block every account on a chain is stamped with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStamp {
    pub height: u64,
    pub time: DateTime<Utc>,
}

/// Per-account progress through the loader steps. Every step advances the
/// stage, whether it contributed data or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountStage {
    #[default]
    Pending,
    VestingLoaded,
    BankLoaded,
    DistributionLoaded,
    StakingLoaded,
    Done,
}

impl AccountStage {
    pub fn next(self) -> Self {
        match self {
            AccountStage::Pending => AccountStage::VestingLoaded,
            AccountStage::VestingLoaded => AccountStage::BankLoaded,
            AccountStage::BankLoaded => AccountStage::DistributionLoaded,
            AccountStage::DistributionLoaded => AccountStage::StakingLoaded,
            AccountStage::StakingLoaded | AccountStage::Done => AccountStage::Done,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    denom: String,
    symbol: String,
    bank: Decimal,
    rewards: Decimal,
    delegated: Decimal,
    unbonding: Decimal,
    commission: Decimal,
    original_vesting: Decimal,
    delegated_vesting: Decimal,
}

impl Token {
    pub fn new(denom: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Adds `amount` to the field owned by `category`. Fields only grow.
    pub fn apply(&mut self, category: BalanceCategory, amount: Decimal) {
        let field = match category {
            BalanceCategory::Bank => &mut self.bank,
            BalanceCategory::Rewards => &mut self.rewards,
            BalanceCategory::Delegated => &mut self.delegated,
            BalanceCategory::Unbonding => &mut self.unbonding,
            BalanceCategory::Commission => &mut self.commission,
            BalanceCategory::OriginalVesting => &mut self.original_vesting,
            BalanceCategory::DelegatedVesting => &mut self.delegated_vesting,
        };
        *field += amount;
    }

    pub fn get(&self, category: BalanceCategory) -> Decimal {
        match category {
            BalanceCategory::Bank => self.bank,
            BalanceCategory::Rewards => self.rewards,
            BalanceCategory::Delegated => self.delegated,
            BalanceCategory::Unbonding => self.unbonding,
            BalanceCategory::Commission => self.commission,
            BalanceCategory::OriginalVesting => self.original_vesting,
            BalanceCategory::DelegatedVesting => self.delegated_vesting,
        }
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Vesting still locked and not delegated out of the schedule.
    pub fn locked_vesting(&self) -> Decimal {
        self.original_vesting - self.delegated_vesting
    }

    /// Everything the account holds or is owed in this token. Vesting is
    /// already part of the bank balance and is not added again.
    pub fn total(&self) -> Decimal {
        self.bank + self.rewards + self.delegated + self.unbonding + self.commission
    }
}

#[derive(Debug, Clone, Default)]
pub struct Account {
    pub name: String,
    pub address: String,
    pub valoper: String,
    pub block: Option<BlockStamp>,
    pub stage: AccountStage,
    tokens: BTreeMap<String, Token>,
}

impl Account {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        valoper: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            valoper: valoper.into(),
            ..Default::default()
        }
    }

    /// Adds `amount` to the token keyed by the case-folded `denom`, creating
    /// the token with `symbol` on first observation.
    pub fn apply(&mut self, denom: &str, symbol: &str, category: BalanceCategory, amount: Decimal) {
        self.tokens
            .entry(denom.to_lowercase())
            .or_insert_with(|| Token::new(denom, symbol))
            .apply(category, amount);
    }

    pub fn token(&self, denom: &str) -> Option<&Token> {
        self.tokens.get(&denom.to_lowercase())
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn advance(&mut self) {
        self.stage = self.stage.next();
    }
}
