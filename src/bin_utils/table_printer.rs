use std::io::Write;

use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;

use crate::{account::BalanceCategory, amount::ZERO_AMOUNT, snapshot::ChainSnapshot};

const HEADER: [&str; 10] = [
    "Chain",
    "Name",
    "Account",
    "Token",
    "Balance",
    "Rewards",
    "Staked",
    "Unbonding",
    "Commission",
    "Total",
];

/// Zero amounts are left blank to keep the table readable.
fn amount_cell(value: Decimal) -> Cell {
    let text = if value > ZERO_AMOUNT {
        value.normalize().to_string()
    } else {
        String::new()
    };
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn print_snapshots<W>(output: &mut W, snapshots: &[ChainSnapshot]) -> anyhow::Result<()>
where
    W: Write,
{
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(HEADER);

    let mut accounts = 0;
    for snapshot in snapshots {
        for account in &snapshot.accounts {
            accounts += 1;
            // name columns only on the first row of each account
            for (idx, token) in account.tokens().enumerate() {
                let (chain, name, address) = if idx == 0 {
                    (
                        snapshot.context.id.as_str(),
                        account.name.as_str(),
                        account.address.as_str(),
                    )
                } else {
                    ("", "", "")
                };
                table.add_row(vec![
                    Cell::new(chain),
                    Cell::new(name),
                    Cell::new(address),
                    Cell::new(token.symbol()),
                    amount_cell(token.get(BalanceCategory::Bank)),
                    amount_cell(token.get(BalanceCategory::Rewards)),
                    amount_cell(token.get(BalanceCategory::Delegated)),
                    amount_cell(token.get(BalanceCategory::Unbonding)),
                    amount_cell(token.get(BalanceCategory::Commission)),
                    amount_cell(token.total()),
                ]);
            }
        }
    }

    writeln!(output, "ACCOUNTS - DETAILS")?;
    writeln!(output, "{table}")?;
    writeln!(output, "Retrieved information for {accounts} accounts")?;
    Ok(())
}
