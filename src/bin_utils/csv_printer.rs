use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    account::{Account, BalanceCategory, Token},
    snapshot::ChainSnapshot,
};

const NOT_AVAILABLE: &str = "na";

#[derive(Debug, Serialize)]
pub struct TokenRow<'a> {
    pub account_name: &'a str,
    pub account_address: &'a str,
    pub chain_id: &'a str,
    pub block_height: String,
    pub block_time: String,
    pub token: &'a str,
    pub denom: &'a str,
    pub bank: String,
    pub rewards: String,
    pub staked: String,
    pub unbonding: String,
    pub commission: String,
    pub original_vesting: String,
    pub delegated_vesting: String,
    pub locked_vesting: String,
    pub total: String,
}

fn amount(value: Decimal) -> String {
    value.normalize().to_string()
}

impl<'a> TokenRow<'a> {
    fn new(chain_id: &'a str, account: &'a Account, token: &'a Token) -> Self {
        let (block_height, block_time) = block_columns(account);
        Self {
            account_name: &account.name,
            account_address: &account.address,
            chain_id,
            block_height,
            block_time,
            token: token.symbol(),
            denom: token.denom(),
            bank: amount(token.get(BalanceCategory::Bank)),
            rewards: amount(token.get(BalanceCategory::Rewards)),
            staked: amount(token.get(BalanceCategory::Delegated)),
            unbonding: amount(token.get(BalanceCategory::Unbonding)),
            commission: amount(token.get(BalanceCategory::Commission)),
            original_vesting: amount(token.get(BalanceCategory::OriginalVesting)),
            delegated_vesting: amount(token.get(BalanceCategory::DelegatedVesting)),
            locked_vesting: amount(token.locked_vesting()),
            total: amount(token.total()),
        }
    }

    /// Placeholder row for an account without any token.
    fn empty(chain_id: &'a str, account: &'a Account) -> Self {
        let (block_height, block_time) = block_columns(account);
        let na = || NOT_AVAILABLE.to_string();
        Self {
            account_name: &account.name,
            account_address: &account.address,
            chain_id,
            block_height,
            block_time,
            token: NOT_AVAILABLE,
            denom: NOT_AVAILABLE,
            bank: na(),
            rewards: na(),
            staked: na(),
            unbonding: na(),
            commission: na(),
            original_vesting: na(),
            delegated_vesting: na(),
            locked_vesting: na(),
            total: na(),
        }
    }
}

fn block_columns(account: &Account) -> (String, String) {
    match &account.block {
        Some(block) => (block.height.to_string(), block.time.to_rfc3339()),
        None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
    }
}

pub fn print_snapshots<W>(output: &mut W, snapshots: &[ChainSnapshot]) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for snapshot in snapshots {
        let chain_id = snapshot.context.id.as_str();
        for account in &snapshot.accounts {
            let mut tokens = account.tokens().peekable();
            if tokens.peek().is_none() {
                if let Err(err) = writer.serialize(TokenRow::empty(chain_id, account)) {
                    anyhow::bail!("Failed to write to CSV: {err}")
                }
            }
            for token in tokens {
                if let Err(err) = writer.serialize(TokenRow::new(chain_id, account, token)) {
                    anyhow::bail!("Failed to write to CSV: {err}")
                }
            }
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
