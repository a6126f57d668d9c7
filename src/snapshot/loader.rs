use tracing::{debug, info};

use crate::{
    account::{Account, BalanceCategory},
    aggregator::{Aggregator, MergeReport, Unbondings},
    api::{ApiError, LcdClient, Transport},
    denom::DenomResolver,
};

use super::{ChainContext, LoaderStep, StepError, StepReport};

/// Marker in the node's answer when the account key is not a validator.
const NO_VALIDATOR: &str = "validator does not exist";

fn is_missing_validator(err: &ApiError) -> bool {
    err.body()
        .is_some_and(|body| body.to_lowercase().contains(NO_VALIDATOR))
}

impl StepReport {
    fn absorb(&mut self, merged: MergeReport) {
        self.applied += merged.applied;
        self.errors.extend(
            merged
                .errors
                .into_iter()
                .map(|(category, source)| StepError::Amount { category, source }),
        );
    }
}

/// Runs the four loader steps of every account on one chain.
pub struct AccountLoader<'a, T: ?Sized> {
    lcd: &'a LcdClient<'a, T>,
    context: &'a ChainContext,
    aggregator: Aggregator<'a, T>,
}

impl<'a, T> AccountLoader<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(lcd: &'a LcdClient<'a, T>, context: &'a ChainContext) -> Self {
        let resolver = DenomResolver::new(lcd, context.asset_list.as_ref());
        Self {
            lcd,
            context,
            aggregator: Aggregator::new(resolver),
        }
    }

    /// Stamps the account with the chain's block and runs every step in order.
    /// The account always ends up [`Done`](crate::account::AccountStage::Done).
    pub fn load(&mut self, account: &mut Account) -> [StepReport; 4] {
        account.block = self.context.block.clone();
        let reports = [
            self.load_vesting(account),
            self.load_bank(account),
            self.load_distribution(account),
            self.load_staking(account),
        ];
        account.advance();
        reports
    }

    pub fn load_vesting(&mut self, account: &mut Account) -> StepReport {
        let mut report = StepReport::new(LoaderStep::Vesting);
        match self.lcd.auth_account(&account.address) {
            Ok(resp) => report.absorb(self.aggregator.merge_source(account, &resp)),
            Err(err) if err.status() == Some(404) => {
                info!("Account `{}` not found on `{}`", account.name, self.context.id);
            }
            Err(source) => report.errors.push(StepError::Query {
                category: BalanceCategory::OriginalVesting,
                source,
            }),
        }
        account.advance();
        report
    }

    pub fn load_bank(&mut self, account: &mut Account) -> StepReport {
        let mut report = StepReport::new(LoaderStep::Bank);
        match self.lcd.balances(&account.address) {
            Ok(pages) => {
                for page in &pages {
                    report.absorb(self.aggregator.merge_source(account, page));
                }
            }
            Err(source) => report.errors.push(StepError::Query {
                category: BalanceCategory::Bank,
                source,
            }),
        }
        account.advance();
        report
    }

    pub fn load_distribution(&mut self, account: &mut Account) -> StepReport {
        let mut report = StepReport::new(LoaderStep::Distribution);
        match self.lcd.rewards(&account.address) {
            Ok(resp) => report.absorb(self.aggregator.merge_source(account, &resp)),
            Err(source) => report.errors.push(StepError::Query {
                category: BalanceCategory::Rewards,
                source,
            }),
        }

        match self.lcd.commission(&account.valoper) {
            Ok(resp) => report.absorb(self.aggregator.merge_source(account, &resp)),
            Err(err) if is_missing_validator(&err) => {
                debug!("`{}` is not a validator, no commission", account.valoper);
            }
            Err(source) => report.errors.push(StepError::Query {
                category: BalanceCategory::Commission,
                source,
            }),
        }
        account.advance();
        report
    }

    pub fn load_staking(&mut self, account: &mut Account) -> StepReport {
        let mut report = StepReport::new(LoaderStep::Staking);
        match self.lcd.delegations(&account.address) {
            Ok(pages) => {
                for page in &pages {
                    report.absorb(self.aggregator.merge_source(account, page));
                }
            }
            Err(source) => report.errors.push(StepError::Query {
                category: BalanceCategory::Delegated,
                source,
            }),
        }

        match (
            self.lcd.unbondings(&account.address),
            self.context.bond_denom.as_deref(),
        ) {
            (Ok(pages), Some(bond_denom)) => {
                for page in &pages {
                    let unbondings = Unbondings {
                        response: page,
                        bond_denom,
                    };
                    report.absorb(self.aggregator.merge_source(account, &unbondings));
                }
            }
            (Ok(pages), None)
                if pages.iter().all(|page| page.unbonding_responses.is_empty()) => {}
            (Ok(_), None) => report.errors.push(StepError::UnknownBondDenom),
            (Err(source), _) => report.errors.push(StepError::Query {
                category: BalanceCategory::Unbonding,
                source,
            }),
        }
        account.advance();
        report
    }
}
