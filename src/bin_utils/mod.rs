//! This module could be a separate crate on its own, to bootstrap [`stake_snapshot`] within
//! the binary, but it also drives the integration tests, so it lives in the library.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use tracing::error;

use crate::{
    account::Account,
    api::Transport,
    config::Config,
    snapshot::{ChainSnapshot, StepError, snapshot_chain},
};

pub mod csv_printer;
pub mod logging;
pub mod table_printer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
}

pub struct Service<'w, T, W: 'w> {
    pub config: Config,
    pub transport: T,
    pub output: &'w mut W,
    pub format: OutputFormat,
    pub error_printer: Box<dyn FnMut(&str, &Account, &StepError)>,
}

impl<'w, T, W> Service<'w, T, W>
where
    T: Transport,
    W: Write + 'w,
{
    /// Snapshots every configured chain in order and renders the result. A
    /// chain that cannot be prepared is logged and left out.
    pub fn run(mut self) -> Result<Vec<ChainSnapshot>> {
        let mut snapshots = Vec::with_capacity(self.config.chains.len());
        for chain in &self.config.chains {
            let error_printer = &mut self.error_printer;
            let result = snapshot_chain(
                &self.transport,
                chain,
                self.config.accounts_of(chain),
                &self.config.http.registry_url,
                |account, err| error_printer(&chain.id, account, err),
            );
            match result {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => error!("Skipping chain `{}`: {err}", chain.id),
            }
        }

        match self.format {
            OutputFormat::Csv => csv_printer::print_snapshots(self.output, &snapshots)?,
            OutputFormat::Table => table_printer::print_snapshots(self.output, &snapshots)?,
        }
        Ok(snapshots)
    }
}
